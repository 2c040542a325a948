use crate::{log_record::FemtoLogRecord, mqtt_handler::ShutdownSignal};

/// Trait implemented by all log handlers.
///
/// Handlers are `Send + Sync` so a single instance can be shared between
/// the threads that produce records. Every method must return without
/// waiting on network I/O.
pub trait FemtoHandlerTrait: Send + Sync {
    /// Dispatch a log record. Failures are never reported to the caller.
    fn handle(&self, record: &FemtoLogRecord<'_>);

    /// Add `tags` to the allow-list.
    fn enable_tags(&self, tags: &[&str]);

    /// Remove `tags` from the allow-list.
    fn disable_tags(&self, tags: &[&str]);

    /// Stop background work and close the transport.
    fn complete_transfer(&self) -> ShutdownSignal;
}
