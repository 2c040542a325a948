//! Topic and payload construction for published records.

use std::io;

use rmp_serde::Serializer;
use serde::Serialize;
use serde_json::Value;

use crate::{level::FemtoLevel, log_record::FemtoLogRecord};

use super::config::PayloadFormat;

#[derive(Serialize)]
struct SerializableRecord<'a> {
    message: &'a str,
    level: FemtoLevel,
    tag: &'a str,
    tags: &'a [&'a str],
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
}

/// Topic a record is published under.
pub fn topic_for(log_topic: &str, tag_path: &str, include_tag: bool) -> String {
    if include_tag {
        format!("{log_topic}/{tag_path}")
    } else {
        log_topic.to_owned()
    }
}

/// Serialise a record using the configured wire format.
pub fn serialise_record(
    record: &FemtoLogRecord<'_>,
    tag_path: &str,
    format: PayloadFormat,
) -> io::Result<Vec<u8>> {
    let serialisable = SerializableRecord {
        message: record.message,
        level: record.level,
        tag: tag_path,
        tags: record.tags,
        timestamp: record.iso_timestamp(),
        data: record.data,
    };
    match format {
        PayloadFormat::Json => serde_json::to_vec(&serialisable).map_err(io::Error::other),
        PayloadFormat::MessagePack => {
            let mut buf = Vec::with_capacity(128);
            serialisable
                .serialize(&mut Serializer::new(&mut buf).with_struct_map())
                .map_err(io::Error::other)?;
            Ok(buf)
        }
    }
}
