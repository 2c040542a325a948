//! Test helpers shared by unit tests and, through the `test-util` feature,
//! the integration tests under `tests/`.

pub mod recording_broker;

pub use recording_broker::{Published, RecordingBroker};
