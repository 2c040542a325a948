//! Builder for [`FemtoMqttHandler`](crate::mqtt_handler::FemtoMqttHandler).
//!
//! Exposes the topic layout, watchdog timing, broker connection parameters,
//! TLS and reconnect backoff. Every value is validated before the handler
//! connects, so misconfiguration surfaces from `build_inner` rather than as a
//! silently failing connection later on.

use std::time::Duration;

use crate::mqtt_handler::{
    BackoffPolicy, BrokerParams, Credentials, FemtoMqttHandler, MqttBroker, MqttHandlerConfig,
    PayloadFormat, TlsOptions,
};

use super::{HandlerBuildError, HandlerBuilderTrait};

/// Overrides for the broker client's reconnect backoff timings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackoffOverrides {
    base_ms: Option<u64>,
    cap_ms: Option<u64>,
    reset_after_ms: Option<u64>,
    deadline_ms: Option<u64>,
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(HandlerBuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

impl BackoffOverrides {
    /// Create overrides with no custom values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the base jitter duration in milliseconds.
    pub fn with_base_ms(mut self, base_ms: u64) -> Self {
        self.base_ms = Some(base_ms);
        self
    }

    /// Override the cap duration in milliseconds.
    pub fn with_cap_ms(mut self, cap_ms: u64) -> Self {
        self.cap_ms = Some(cap_ms);
        self
    }

    /// Override the reset-after duration in milliseconds.
    pub fn with_reset_after_ms(mut self, reset_after_ms: u64) -> Self {
        self.reset_after_ms = Some(reset_after_ms);
        self
    }

    /// Override the deadline duration in milliseconds.
    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    fn apply(&self, policy: &mut BackoffPolicy) -> Result<(), HandlerBuildError> {
        if let Some(base) = self.base_ms {
            ensure_positive!(base, "backoff_base_ms")?;
            policy.base = Duration::from_millis(base);
        }
        if let Some(cap) = self.cap_ms {
            ensure_positive!(cap, "backoff_cap_ms")?;
            policy.cap = Duration::from_millis(cap);
        }
        if let Some(reset) = self.reset_after_ms {
            ensure_positive!(reset, "backoff_reset_after_ms")?;
            policy.reset_after = Duration::from_millis(reset);
        }
        if let Some(deadline) = self.deadline_ms {
            ensure_positive!(deadline, "backoff_deadline_ms")?;
            policy.deadline = Some(Duration::from_millis(deadline));
        }
        if policy.cap < policy.base {
            return Err(HandlerBuildError::InvalidConfig(
                "backoff_cap_ms must not be smaller than backoff_base_ms".into(),
            ));
        }
        Ok(())
    }
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`FemtoMqttHandler`] instances.
#[derive(Clone, Debug, Default)]
pub struct MqttHandlerBuilder {
    log_topic: Option<String>,
    topic_include_tag: bool,
    watchdog_interval_ms: Option<u64>,
    watchdog_disabled: bool,
    host: Option<String>,
    port: Option<u16>,
    client_id: Option<String>,
    keep_alive_secs: Option<u64>,
    clean_session: Option<bool>,
    credentials: Option<Credentials>,
    tls: Option<TlsOptions>,
    capacity: Option<usize>,
    qos: Option<u8>,
    payload_format: Option<PayloadFormat>,
    shutdown_timeout_ms: Option<u64>,
    warn_interval_ms: Option<u64>,
    backoff: BackoffOverrides,
}

impl MqttHandlerBuilder {
    /// Create a new builder with no topic configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base topic records are published under.
    pub fn with_log_topic(mut self, topic: impl Into<String>) -> Self {
        self.log_topic = Some(topic.into());
        self
    }

    /// Append each record's tag path to the base topic.
    pub fn with_topic_include_tag(mut self, include: bool) -> Self {
        self.topic_include_tag = include;
        self
    }

    /// Turn the reconnect watchdog off entirely.
    pub fn with_watchdog_disabled(mut self, disabled: bool) -> Self {
        self.watchdog_disabled = disabled;
        self
    }

    /// Configure the broker address.
    pub fn with_broker(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self
    }

    /// Authenticate with a username and password.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Connect over TLS using the native platform verifier.
    pub fn with_tls(mut self, insecure: bool) -> Self {
        self.tls = Some(TlsOptions {
            insecure_skip_verify: insecure,
        });
        self
    }

    option_setter!(
        #[doc = "Set the watchdog check interval in milliseconds."]
        with_watchdog_interval_ms,
        watchdog_interval_ms,
        u64
    );
    option_setter!(with_client_id, client_id, String);
    option_setter!(with_keep_alive_secs, keep_alive_secs, u64);
    option_setter!(with_clean_session, clean_session, bool);
    option_setter!(
        #[doc = "Set the broker client's request queue capacity."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(with_qos, qos, u8);
    option_setter!(with_payload_format, payload_format, PayloadFormat);
    option_setter!(
        #[doc = "Bound the wait for the disconnect acknowledgement."]
        with_shutdown_timeout_ms,
        shutdown_timeout_ms,
        u64
    );
    option_setter!(with_warn_interval_ms, warn_interval_ms, u64);

    /// Override backoff timings using the provided overrides.
    pub fn with_backoff(mut self, overrides: BackoffOverrides) -> Self {
        self.backoff = overrides;
        self
    }

    fn validate(&self) -> Result<(), HandlerBuildError> {
        if self.log_topic.is_none() {
            return Err(HandlerBuildError::InvalidConfig(
                "mqtt handler requires a log_topic".into(),
            ));
        }
        if let Some(capacity) = self.capacity {
            ensure_positive!(capacity, "capacity")?;
        }
        if let Some(timeout) = self.shutdown_timeout_ms {
            ensure_positive!(timeout, "shutdown_timeout_ms")?;
        }
        if let Some(interval) = self.warn_interval_ms {
            ensure_positive!(interval, "warn_interval_ms")?;
        }
        if let Some(interval) = self.watchdog_interval_ms
            && !self.watchdog_disabled
        {
            ensure_positive!(interval, "watchdog_interval_ms")?;
        }
        if let Some(port) = self.port {
            ensure_positive!(port, "port")?;
        }
        if let Some(client_id) = &self.client_id
            && client_id.trim().is_empty()
        {
            return Err(HandlerBuildError::InvalidConfig(
                "client_id must not be empty".into(),
            ));
        }
        Ok(())
    }

    fn build_broker_params(&self) -> Result<BrokerParams, HandlerBuildError> {
        let mut params = BrokerParams::default();
        if let Some(host) = &self.host {
            params.host = host.clone();
        }
        if let Some(port) = self.port {
            params.port = port;
        }
        if let Some(client_id) = &self.client_id {
            params.client_id = client_id.clone();
        }
        if let Some(secs) = self.keep_alive_secs {
            params.keep_alive = Duration::from_secs(secs);
        }
        if let Some(clean) = self.clean_session {
            params.clean_session = clean;
        }
        if let Some(capacity) = self.capacity {
            params.capacity = capacity;
        }
        if let Some(qos) = self.qos {
            params.qos = qos;
        }
        params.credentials = self.credentials.clone();
        params.tls = self.tls.clone();
        self.backoff.apply(&mut params.backoff)?;
        Ok(params)
    }

    /// Validate the builder and produce the handler configuration.
    pub fn build_config(&self) -> Result<MqttHandlerConfig, HandlerBuildError> {
        self.validate()?;
        let mut config = MqttHandlerConfig::new(self.log_topic.clone().unwrap_or_default())
            .with_broker(self.build_broker_params()?);
        config.topic_include_tag = self.topic_include_tag;
        config.watchdog_disabled = self.watchdog_disabled;
        if let Some(interval) = self.watchdog_interval_ms {
            config.watchdog_interval = Duration::from_millis(interval);
        }
        if let Some(format) = self.payload_format {
            config.payload_format = format;
        }
        if let Some(timeout) = self.shutdown_timeout_ms {
            config.shutdown_timeout = Duration::from_millis(timeout);
        }
        if let Some(interval) = self.warn_interval_ms {
            config.warn_interval = Duration::from_millis(interval);
        }
        config.validate()?;
        Ok(config)
    }
}

impl HandlerBuilderTrait for MqttHandlerBuilder {
    type Handler = FemtoMqttHandler<MqttBroker>;

    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError> {
        let config = self.build_config()?;
        FemtoMqttHandler::with_config(config)
    }
}
