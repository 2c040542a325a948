//! A broker double that records every interaction for test assertions.
//!
//! Clones share state, so a test can keep one handle while the handler owns
//! the other.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::mqtt_handler::{
    BrokerClient, BrokerConnector, BrokerError, BrokerEvent, EventListener,
};

/// A publish captured by [`RecordingBroker`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Published {
    /// Decode the payload as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).expect("payload should be valid JSON")
    }
}

struct Inner {
    published: Mutex<Vec<Published>>,
    listener: Mutex<Option<EventListener>>,
    held_acks: Mutex<Vec<Sender<()>>>,
    reconnects: AtomicUsize,
    ends: AtomicUsize,
    acknowledge_end: AtomicBool,
    reject_publish: AtomicBool,
}

/// Broker client that stores publishes and counts lifecycle requests.
#[derive(Clone)]
pub struct RecordingBroker {
    inner: Arc<Inner>,
}

impl Default for RecordingBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBroker {
    /// Create a broker that acknowledges disconnects immediately.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                published: Mutex::new(Vec::new()),
                listener: Mutex::new(None),
                held_acks: Mutex::new(Vec::new()),
                reconnects: AtomicUsize::new(0),
                ends: AtomicUsize::new(0),
                acknowledge_end: AtomicBool::new(true),
                reject_publish: AtomicBool::new(false),
            }),
        }
    }

    /// A broker that never acknowledges the disconnect.
    pub fn unresponsive() -> Self {
        let broker = Self::new();
        broker.inner.acknowledge_end.store(false, Ordering::SeqCst);
        broker
    }

    /// Make every subsequent publish fail with [`BrokerError::QueueFull`].
    pub fn reject_publishes(&self) {
        self.inner.reject_publish.store(true, Ordering::SeqCst);
    }

    /// Deliver a lifecycle event to the registered listener.
    pub fn emit(&self, event: BrokerEvent) {
        let listener = self.inner.listener.lock().clone();
        if let Some(listener) = listener {
            listener(event);
        }
    }

    /// Snapshot of all publishes so far.
    pub fn published(&self) -> Vec<Published> {
        self.inner.published.lock().clone()
    }

    pub fn reconnects(&self) -> usize {
        self.inner.reconnects.load(Ordering::SeqCst)
    }

    pub fn ends(&self) -> usize {
        self.inner.ends.load(Ordering::SeqCst)
    }
}

impl BrokerClient for RecordingBroker {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        if self.inner.reject_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::QueueFull);
        }
        self.inner.published.lock().push(Published {
            topic: topic.to_owned(),
            payload,
        });
        Ok(())
    }

    fn reconnect(&self) {
        self.inner.reconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn end(&self, done: Sender<()>) {
        self.inner.ends.fetch_add(1, Ordering::SeqCst);
        if self.inner.acknowledge_end.load(Ordering::SeqCst) {
            self.emit(BrokerEvent::Close);
            let _ = done.send(());
        } else {
            self.inner.held_acks.lock().push(done);
        }
    }
}

impl BrokerConnector for RecordingBroker {
    type Client = RecordingBroker;

    fn connect(self, listener: EventListener) -> Result<Self::Client, BrokerError> {
        *self.inner.listener.lock() = Some(listener);
        Ok(self)
    }
}
