//! Public handler type exported by the crate.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crossbeam_channel::bounded;
use log::{info, warn};
use parking_lot::Mutex;

use crate::{
    filters::{FemtoFilter, TagFilter},
    handler::FemtoHandlerTrait,
    handlers::HandlerBuildError,
    log_record::FemtoLogRecord,
    rate_limited_warner::RateLimitedWarner,
};

use super::{
    broker::{BrokerClient, BrokerConnector, EventListener},
    client::MqttBroker,
    config::{MqttHandlerConfig, PayloadFormat},
    connection::{ConnectionMonitor, ConnectionState},
    serialise::{serialise_record, topic_for},
    shutdown::ShutdownSignal,
    watchdog::ReconnectWatchdog,
};

/// Handler forwarding records to an MQTT topic.
///
/// Records below [`FemtoLevel::Log`](crate::FemtoLevel::Log) are always
/// published; everything else must carry at least one enabled tag. Publishing
/// is fire-and-forget: failures are counted and reported through a
/// rate-limited warning, never to the caller.
pub struct FemtoMqttHandler<B: BrokerClient = MqttBroker> {
    broker: Arc<B>,
    monitor: Arc<ConnectionMonitor>,
    filter: TagFilter,
    watchdog: Mutex<Option<ReconnectWatchdog>>,
    log_topic: String,
    topic_include_tag: bool,
    payload_format: PayloadFormat,
    shutdown_timeout: Duration,
    warner: RateLimitedWarner,
    closed: AtomicBool,
}

impl FemtoMqttHandler<MqttBroker> {
    /// Connect to the broker described by `config.broker`.
    pub fn with_config(config: MqttHandlerConfig) -> Result<Self, HandlerBuildError> {
        let connector = config.broker.clone();
        Self::with_connector(config, connector)
    }
}

impl<B: BrokerClient> FemtoMqttHandler<B> {
    /// Construct the handler using `connector` to establish the broker client.
    ///
    /// `config.broker` is ignored; the connector carries its own parameters.
    pub fn with_connector<C>(config: MqttHandlerConfig, connector: C) -> Result<Self, HandlerBuildError>
    where
        C: BrokerConnector<Client = B>,
    {
        config.validate()?;
        let monitor = Arc::new(ConnectionMonitor::new());
        let listener: EventListener = {
            let monitor = Arc::clone(&monitor);
            Arc::new(move |event| monitor.observe(event))
        };
        let broker = Arc::new(connector.connect(listener)?);
        let watchdog = if config.watchdog_disabled {
            None
        } else {
            Some(spawn_watchdog(
                config.watchdog_interval,
                Arc::clone(&broker),
                Arc::clone(&monitor),
            ))
        };
        Ok(Self {
            broker,
            monitor,
            filter: TagFilter::new(),
            watchdog: Mutex::new(watchdog),
            log_topic: config.log_topic,
            topic_include_tag: config.topic_include_tag,
            payload_format: config.payload_format,
            shutdown_timeout: config.shutdown_timeout,
            warner: RateLimitedWarner::new(config.warn_interval),
            closed: AtomicBool::new(false),
        })
    }

    /// Filter, encode and publish a single record.
    pub fn output(&self, record: &FemtoLogRecord<'_>) {
        if !self.filter.should_log(record) {
            return;
        }
        if self.closed.load(Ordering::Acquire) {
            self.record_drop("after shutdown");
            return;
        }
        let tag_path = record.tag_path();
        let topic = topic_for(&self.log_topic, &tag_path, self.topic_include_tag);
        let payload = match serialise_record(record, &tag_path, self.payload_format) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("FemtoMqttHandler serialisation error: {err}");
                self.record_drop("due to serialisation failures");
                return;
            }
        };
        if let Err(err) = self.broker.publish(&topic, payload) {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                warn!("FemtoMqttHandler dropped {count} records: {err}");
            });
        }
    }

    fn record_drop(&self, reason: &str) {
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!("FemtoMqttHandler dropped {count} records {reason}");
        });
    }

    /// Add `tags` to the allow-list.
    pub fn enable_tags<S: AsRef<str>>(&self, tags: &[S]) {
        self.filter.enable(tags);
    }

    /// Remove `tags` from the allow-list.
    pub fn disable_tags<S: AsRef<str>>(&self, tags: &[S]) {
        self.filter.disable(tags);
    }

    /// Sorted snapshot of the enabled tags.
    pub fn enabled_tags(&self) -> Vec<String> {
        self.filter.enabled()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.monitor.state()
    }

    pub fn is_connected(&self) -> bool {
        self.monitor.is_connected()
    }

    /// Whether the reconnect watchdog is still active.
    pub fn watchdog_running(&self) -> bool {
        self.watchdog
            .lock()
            .as_ref()
            .is_some_and(ReconnectWatchdog::is_running)
    }

    /// Stop the watchdog and close the broker connection.
    ///
    /// The returned signal completes once the broker client has sent its
    /// disconnect. Calling this again is a no-op that returns a completed
    /// signal.
    pub fn complete_transfer(&self) -> ShutdownSignal {
        if self.closed.swap(true, Ordering::AcqRel) {
            return ShutdownSignal::completed();
        }
        self.monitor.mark_closing();
        if let Some(mut watchdog) = self.watchdog.lock().take() {
            watchdog.stop();
        }
        self.warner.flush(|count| {
            warn!("FemtoMqttHandler dropped {count} records in the last interval");
        });
        let (done_tx, done_rx) = bounded(1);
        self.broker.end(done_tx);
        ShutdownSignal::new(done_rx, self.shutdown_timeout)
    }
}

fn spawn_watchdog<B: BrokerClient>(
    interval: Duration,
    broker: Arc<B>,
    monitor: Arc<ConnectionMonitor>,
) -> ReconnectWatchdog {
    ReconnectWatchdog::start(interval, move || {
        if monitor.needs_reconnect() {
            info!("FemtoMqttHandler attempting reconnect");
            broker.reconnect();
        }
    })
}

impl<B: BrokerClient> FemtoHandlerTrait for FemtoMqttHandler<B> {
    fn handle(&self, record: &FemtoLogRecord<'_>) {
        self.output(record);
    }

    fn enable_tags(&self, tags: &[&str]) {
        self.filter.enable(tags);
    }

    fn disable_tags(&self, tags: &[&str]) {
        self.filter.disable(tags);
    }

    fn complete_transfer(&self) -> ShutdownSignal {
        Self::complete_transfer(self)
    }
}

impl<B: BrokerClient> Drop for FemtoMqttHandler<B> {
    fn drop(&mut self) {
        let _ = self.complete_transfer();
    }
}

impl<B: BrokerClient> std::fmt::Debug for FemtoMqttHandler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FemtoMqttHandler")
            .field("log_topic", &self.log_topic)
            .field("topic_include_tag", &self.topic_include_tag)
            .field("state", &self.monitor.state())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("pending_drops", &self.warner.pending())
            .finish()
    }
}
