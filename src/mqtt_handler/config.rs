//! Configuration structures consumed by the MQTT handler lifecycle.
//!
//! `MqttHandlerBuilder` constructs these values before passing them to
//! [`FemtoMqttHandler`](super::FemtoMqttHandler) for runtime use.

use std::time::Duration;

use crate::{handlers::HandlerBuildError, rate_limited_warner::DEFAULT_WARN_INTERVAL};

use super::transport::TlsOptions;

/// Default size of the broker client's outgoing request queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// Default MQTT broker port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;
/// Default keep-alive interval negotiated with the broker.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
/// Default interval between watchdog checks.
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(10);
/// Default bound on waiting for the broker to acknowledge a disconnect.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
/// Default base delay for exponential backoff retries.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);
/// Default maximum delay for exponential backoff retries.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(10);
/// Default duration of a healthy connection that resets backoff state.
pub const DEFAULT_BACKOFF_RESET: Duration = Duration::from_secs(30);

/// Encoding applied to published payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadFormat {
    /// UTF-8 JSON object.
    #[default]
    Json,
    /// MessagePack map with the same field names as the JSON form.
    MessagePack,
}

impl PayloadFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "msgpack" | "messagepack" => Some(Self::MessagePack),
            _ => None,
        }
    }
}

/// Exponential backoff policy for reconnection attempts.
#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub reset_after: Duration,
    /// Failure window after which jitter stops and retries settle at `cap`.
    /// `None` keeps backing off with jitter for the whole outage.
    pub deadline: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BACKOFF_BASE,
            cap: DEFAULT_BACKOFF_CAP,
            reset_after: DEFAULT_BACKOFF_RESET,
            deadline: None,
        }
    }
}

/// Username/password pair presented in the MQTT CONNECT packet.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection parameters forwarded verbatim to the broker client.
#[derive(Clone, Debug)]
pub struct BrokerParams {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    pub clean_session: bool,
    pub credentials: Option<Credentials>,
    pub tls: Option<TlsOptions>,
    /// Capacity of the client's outgoing request queue.
    pub capacity: usize,
    /// MQTT QoS used for published records (0, 1 or 2).
    pub qos: u8,
    pub backoff: BackoffPolicy,
}

impl Default for BrokerParams {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_BROKER_PORT,
            client_id: default_client_id(),
            keep_alive: DEFAULT_KEEP_ALIVE,
            clean_session: true,
            credentials: None,
            tls: None,
            capacity: DEFAULT_CHANNEL_CAPACITY,
            qos: 0,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Client identifier unique enough to avoid collisions between processes.
pub fn default_client_id() -> String {
    format!("femtologging-{}-{:08x}", std::process::id(), rand::random::<u32>())
}

/// Configuration object describing how to construct a
/// [`FemtoMqttHandler`](super::FemtoMqttHandler).
#[derive(Clone, Debug)]
pub struct MqttHandlerConfig {
    pub broker: BrokerParams,
    /// Base topic every record is published under.
    pub log_topic: String,
    /// Append the record's tag path to `log_topic`.
    pub topic_include_tag: bool,
    pub watchdog_interval: Duration,
    pub watchdog_disabled: bool,
    pub payload_format: PayloadFormat,
    pub shutdown_timeout: Duration,
    pub warn_interval: Duration,
}

impl Default for MqttHandlerConfig {
    fn default() -> Self {
        Self {
            broker: BrokerParams::default(),
            log_topic: String::new(),
            topic_include_tag: false,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            watchdog_disabled: false,
            payload_format: PayloadFormat::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl MqttHandlerConfig {
    /// Configuration publishing to `log_topic` with every other field defaulted.
    pub fn new(log_topic: impl Into<String>) -> Self {
        Self {
            log_topic: log_topic.into(),
            ..Self::default()
        }
    }

    /// Override the broker parameters.
    pub fn with_broker(mut self, broker: BrokerParams) -> Self {
        self.broker = broker;
        self
    }

    /// Reject configurations the handler cannot run with.
    pub fn validate(&self) -> Result<(), HandlerBuildError> {
        let topic = self.log_topic.trim();
        if topic.is_empty() {
            return Err(HandlerBuildError::InvalidConfig(
                "log_topic must not be empty".into(),
            ));
        }
        if topic.contains(['+', '#']) {
            return Err(HandlerBuildError::InvalidConfig(format!(
                "log_topic must not contain wildcards: {topic}"
            )));
        }
        if !self.watchdog_disabled && self.watchdog_interval.is_zero() {
            return Err(HandlerBuildError::InvalidConfig(
                "watchdog_interval must be greater than zero".into(),
            ));
        }
        if self.broker.capacity == 0 {
            return Err(HandlerBuildError::InvalidConfig(
                "capacity must be greater than zero".into(),
            ));
        }
        if self.broker.qos > 2 {
            return Err(HandlerBuildError::InvalidConfig(format!(
                "qos must be 0, 1 or 2 (got {})",
                self.broker.qos
            )));
        }
        let keep_alive = self.broker.keep_alive;
        if !keep_alive.is_zero() && keep_alive < Duration::from_secs(1) {
            return Err(HandlerBuildError::InvalidConfig(
                "keep_alive must be zero or at least one second".into(),
            ));
        }
        if self.broker.host.trim().is_empty() {
            return Err(HandlerBuildError::InvalidConfig(
                "broker host must not be empty".into(),
            ));
        }
        Ok(())
    }
}
