//! Property tests for the tag allow-list.

use std::collections::BTreeSet;

use femtologging_mqtt::{FemtoFilter, FemtoLevel, FemtoLogRecord, TagFilter};
use proptest::prelude::*;

fn tag() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

proptest! {
    #[test]
    fn enabled_set_is_union_minus_disabled(
        first in prop::collection::vec(tag(), 0..8),
        second in prop::collection::vec(tag(), 0..8),
        removed in prop::collection::vec(tag(), 0..8),
    ) {
        let filter = TagFilter::new();
        filter.enable(first.as_slice());
        filter.enable(second.as_slice());
        filter.disable(removed.as_slice());

        let removed: BTreeSet<_> = removed.into_iter().collect();
        let expected: Vec<String> = first
            .into_iter()
            .chain(second)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|tag| !removed.contains(tag))
            .collect();
        prop_assert_eq!(filter.enabled(), expected);
    }

    #[test]
    fn records_pass_iff_a_tag_is_enabled(
        enabled in prop::collection::vec(tag(), 0..6),
        tags in prop::collection::vec(tag(), 0..4),
    ) {
        let filter = TagFilter::new();
        filter.enable(enabled.as_slice());
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let record = FemtoLogRecord::new(FemtoLevel::Warn, &tag_refs, "m");
        let expected = tags.iter().any(|t| enabled.contains(t));
        prop_assert_eq!(filter.should_log(&record), expected);

        let diagnostic = FemtoLogRecord::new(FemtoLevel::Diagnostic, &tag_refs, "m");
        prop_assert!(filter.should_log(&diagnostic));
    }
}
