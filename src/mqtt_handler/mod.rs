//! MQTT logging handler implementation.
//!
//! This module defines [`FemtoMqttHandler`], a handler that encodes
//! [`FemtoLogRecord`](crate::log_record::FemtoLogRecord) values as JSON (or
//! MessagePack) and publishes them to a broker topic. Records are gated by a
//! tag allow-list before anything is encoded.
//!
//! # Connection lifecycle
//!
//! A dedicated worker thread drives the `rumqttc` event loop and reports
//! `connect`, `error`, `close` and `offline` events to a [`ConnectionMonitor`].
//! After a failure the worker keeps retrying with jittered exponential backoff
//! for as long as the handler is open. Independently, a [`ReconnectWatchdog`]
//! checks the monitor every interval and asks the worker to reconnect at once
//! whenever the connection is down.
//!
//! # Shutdown
//!
//! [`FemtoMqttHandler::complete_transfer`] stops the watchdog, queues an MQTT
//! DISCONNECT and returns a [`ShutdownSignal`] that completes once the
//! disconnect has been sent. Waiting on the signal is bounded by the
//! configured shutdown timeout.

mod backoff;
mod broker;
mod client;
mod config;
mod connection;
mod handler;
mod serialise;
mod shutdown;
mod transport;
mod watchdog;
mod worker;


pub use broker::{BrokerClient, BrokerConnector, BrokerError, BrokerEvent, EventListener};
pub use client::MqttBroker;
pub use config::{
    BackoffPolicy, BrokerParams, Credentials, DEFAULT_BROKER_PORT, DEFAULT_SHUTDOWN_TIMEOUT,
    DEFAULT_WATCHDOG_INTERVAL, MqttHandlerConfig, PayloadFormat, default_client_id,
};
pub use connection::{ConnectionMonitor, ConnectionState};
pub use handler::FemtoMqttHandler;
pub use serialise::{serialise_record, topic_for};
pub use shutdown::ShutdownSignal;
pub use transport::TlsOptions;
pub use watchdog::ReconnectWatchdog;
