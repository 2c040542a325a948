//! Tag allow-list filter.
//!
//! The filter starts empty and therefore rejects every record until at least
//! one tag has been enabled. A record passes when any of its tags is in the
//! enabled set.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::{filters::FemtoFilter, log_record::FemtoLogRecord};

#[derive(Debug, Default)]
pub struct TagFilter {
    enabled: RwLock<HashSet<String>>,
}

impl TagFilter {
    /// Create a filter with no enabled tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every tag in `tags` to the enabled set.
    pub fn enable<S: AsRef<str>>(&self, tags: &[S]) {
        let mut enabled = self.enabled.write();
        for tag in tags {
            let tag = tag.as_ref();
            if !enabled.contains(tag) {
                enabled.insert(tag.to_owned());
            }
        }
    }

    /// Remove every tag in `tags` from the enabled set.
    pub fn disable<S: AsRef<str>>(&self, tags: &[S]) {
        let mut enabled = self.enabled.write();
        for tag in tags {
            enabled.remove(tag.as_ref());
        }
    }

    /// Return `true` when `tags` shares at least one entry with the enabled set.
    pub fn passes<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        let enabled = self.enabled.read();
        !enabled.is_empty() && tags.iter().any(|tag| enabled.contains(tag.as_ref()))
    }

    /// Sorted snapshot of the enabled tags.
    pub fn enabled(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.enabled.read().iter().cloned().collect();
        tags.sort_unstable();
        tags
    }
}

impl FemtoFilter for TagFilter {
    fn should_log(&self, record: &FemtoLogRecord<'_>) -> bool {
        !record.level.is_filtered() || self.passes(record.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::FemtoLevel;
    use rstest::{fixture, rstest};

    #[fixture]
    fn filter() -> TagFilter {
        TagFilter::new()
    }

    #[rstest]
    fn empty_filter_rejects_everything(filter: TagFilter) {
        assert!(!filter.passes(&["a"]));
        assert!(!filter.passes::<&str>(&[]));
    }

    #[rstest]
    #[case(&["x", "y"], &["x"], true)]
    #[case(&["x", "y"], &["y"], true)]
    #[case(&["x", "y"], &["z"], false)]
    #[case(&[], &["x"], false)]
    fn passes_on_any_overlap(
        filter: TagFilter,
        #[case] record_tags: &[&str],
        #[case] enabled: &[&str],
        #[case] expected: bool,
    ) {
        filter.enable(enabled);
        assert_eq!(filter.passes(record_tags), expected);
    }

    #[rstest]
    fn enable_is_idempotent(filter: TagFilter) {
        filter.enable(&["a", "a"]);
        filter.enable(&["a"]);
        assert_eq!(filter.enabled(), vec!["a".to_string()]);
    }

    #[rstest]
    fn disable_ignores_unknown_tags(filter: TagFilter) {
        filter.enable(&["a", "b"]);
        filter.disable(&["c", "a"]);
        assert_eq!(filter.enabled(), vec!["b".to_string()]);
    }

    #[rstest]
    fn diagnostic_records_bypass_allow_list(filter: TagFilter) {
        let diagnostic = FemtoLogRecord::new(FemtoLevel::Diagnostic, &["hidden"], "m");
        let ordinary = FemtoLogRecord::new(FemtoLevel::Error, &["hidden"], "m");
        assert!(filter.should_log(&diagnostic));
        assert!(!filter.should_log(&ordinary));
    }
}
