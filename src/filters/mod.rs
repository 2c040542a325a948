//! Filtering components for log records.
//!
//! Provides the [`FemtoFilter`] trait and the tag allow-list used by the MQTT
//! handler.

use crate::log_record::FemtoLogRecord;

/// Trait implemented by all log filters.
///
/// Filters are `Send + Sync` so they can be shared across threads.
pub trait FemtoFilter: Send + Sync {
    /// Return `true` if `record` should be processed.
    fn should_log(&self, record: &FemtoLogRecord<'_>) -> bool;
}

pub mod tag_filter;

pub use tag_filter::TagFilter;
