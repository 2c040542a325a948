//! Log record representation handed to the MQTT handler.
//!
//! Records are borrowed for the duration of a single
//! [`output`](crate::FemtoMqttHandler::output) call; the handler copies
//! nothing it does not put on the wire.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::level::FemtoLevel;

#[derive(Clone, Copy, Debug)]
pub struct FemtoLogRecord<'a> {
    /// Severity of the record.
    pub level: FemtoLevel,
    /// Ordered tag path, outermost first.
    pub tags: &'a [&'a str],
    /// The log message content.
    pub message: &'a str,
    /// Time the record was created.
    pub timestamp: DateTime<Utc>,
    /// Arbitrary structured data attached by the caller.
    pub data: Option<&'a Value>,
}

impl<'a> FemtoLogRecord<'a> {
    /// Construct a record stamped with the current time and no data.
    pub fn new(level: FemtoLevel, tags: &'a [&'a str], message: &'a str) -> Self {
        Self {
            level,
            tags,
            message,
            timestamp: Utc::now(),
            data: None,
        }
    }

    /// Replace the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach structured data.
    pub fn with_data(mut self, data: &'a Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Render the `/`-joined tag path.
    pub fn tag_path(&self) -> String {
        self.tags.join("/")
    }

    /// ISO-8601 rendering of the timestamp with millisecond precision.
    pub fn iso_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl fmt::Display for FemtoLogRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.tag_path(), self.level, self.message)
    }
}
