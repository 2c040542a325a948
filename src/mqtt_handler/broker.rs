//! Boundary between the handler and the broker client.
//!
//! The handler only ever talks to the broker through [`BrokerClient`] and
//! only ever hears from it through the [`BrokerEvent`] notifications passed to
//! the listener registered at connect time.

use std::sync::Arc;

use crossbeam_channel::Sender;
use thiserror::Error;

/// Lifecycle notifications raised by a broker client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrokerEvent {
    /// The broker accepted the connection.
    Connect,
    /// A connection attempt or an established connection failed.
    Error(String),
    /// The connection was closed.
    Close,
    /// The client gave up on the current connection and is waiting to retry.
    Offline,
}

/// Callback receiving broker lifecycle notifications.
pub type EventListener = Arc<dyn Fn(BrokerEvent) + Send + Sync>;

/// Errors reported by broker clients.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The outgoing request queue is full.
    #[error("broker request queue full")]
    QueueFull,
    /// The client has been shut down.
    #[error("broker client closed")]
    Closed,
    /// TLS setup failed.
    #[error("tls configuration failed: {0}")]
    Tls(String),
    /// Any other client-side failure.
    #[error("broker client error: {0}")]
    Client(String),
}

/// Operations the handler issues against the shared broker connection.
pub trait BrokerClient: Send + Sync + 'static {
    /// Queue a publish without waiting for it to be sent.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError>;

    /// Ask the client to attempt a reconnect as soon as possible.
    fn reconnect(&self);

    /// Close the connection gracefully and signal `done` once the client has
    /// sent its disconnect.
    fn end(&self, done: Sender<()>);
}

/// Factory establishing a [`BrokerClient`] wired to `listener`.
pub trait BrokerConnector {
    type Client: BrokerClient;

    fn connect(self, listener: EventListener) -> Result<Self::Client, BrokerError>;
}
