//! Tag-filtered log forwarding to an MQTT broker.
//!
//! [`FemtoMqttHandler`] accepts [`FemtoLogRecord`] values, drops those whose
//! tags are not enabled, and publishes the rest as JSON (or MessagePack)
//! messages on a configured topic. A background watchdog keeps asking the
//! broker client to reconnect while the connection is down.
//!
//! ```no_run
//! use femtologging_mqtt::{FemtoLevel, FemtoLogRecord, HandlerBuilderTrait, MqttHandlerBuilder};
//!
//! let handler = MqttHandlerBuilder::new()
//!     .with_log_topic("devices/edge-1/log")
//!     .with_broker("broker.local", 1883)
//!     .build_inner()
//!     .expect("valid configuration");
//! handler.enable_tags(&["net"]);
//! handler.output(&FemtoLogRecord::new(FemtoLevel::Warn, &["net"], "link flapped"));
//! handler.complete_transfer().wait();
//! ```

pub mod file_config;
pub mod filters;
pub mod handler;
pub mod handlers;
pub mod level;
pub mod log_record;
pub mod mqtt_handler;
mod rate_limited_warner;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use file_config::{builder_from_ini_file, builder_from_ini_str};
pub use filters::{FemtoFilter, TagFilter};
pub use handler::FemtoHandlerTrait;
pub use handlers::{BackoffOverrides, HandlerBuildError, HandlerBuilderTrait, MqttHandlerBuilder};
pub use level::{FemtoLevel, ParseLevelError};
pub use log_record::FemtoLogRecord;
pub use mqtt_handler::{
    BrokerClient, BrokerConnector, BrokerError, BrokerEvent, ConnectionState, FemtoMqttHandler,
    MqttBroker, MqttHandlerConfig, PayloadFormat, ShutdownSignal,
};
