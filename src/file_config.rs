//! INI configuration loading for the MQTT handler.
//!
//! A handler is described by one INI section whose keys mirror the option
//! names used by the handler's configuration surface:
//!
//! ```ini
//! [handler_mqtt]
//! logTopic = devices/edge-1/log
//! logTopicIncludeTag = true
//! watchdogIntervalMs = 10000
//! host = broker.local
//! port = 1883
//! ```
//!
//! Unknown keys are rejected so typos do not silently fall back to defaults.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

use ini::{Ini, Properties};

use crate::{
    handlers::{BackoffOverrides, HandlerBuildError, MqttHandlerBuilder},
    mqtt_handler::PayloadFormat,
};

/// Read `section` from the INI file at `path` into a builder.
pub fn builder_from_ini_file(
    path: impl AsRef<Path>,
    section: &str,
) -> Result<MqttHandlerBuilder, HandlerBuildError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => {
            HandlerBuildError::InvalidConfig(format!("{} doesn't exist", path.display()))
        }
        _ => HandlerBuildError::Io(err),
    })?;
    builder_from_ini_str(&text, section)
}

/// Parse `section` out of INI `text` into a builder.
pub fn builder_from_ini_str(
    text: &str,
    section: &str,
) -> Result<MqttHandlerBuilder, HandlerBuildError> {
    let ini = Ini::load_from_str(text)
        .map_err(|err| HandlerBuildError::InvalidConfig(format!("invalid ini: {err}")))?;
    let props = ini.section(Some(section)).ok_or_else(|| {
        HandlerBuildError::InvalidConfig(format!("missing section [{section}]"))
    })?;
    apply_section(props)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, HandlerBuildError> {
    value.trim().parse().map_err(|_| {
        HandlerBuildError::InvalidConfig(format!("{key} has an invalid value: {value:?}"))
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, HandlerBuildError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HandlerBuildError::InvalidConfig(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}

fn apply_section(props: &Properties) -> Result<MqttHandlerBuilder, HandlerBuildError> {
    let mut builder = MqttHandlerBuilder::new();
    let mut backoff = BackoffOverrides::new();
    let mut host = None;
    let mut port = None;
    let mut username = None;
    let mut password = None;
    let mut tls = false;
    let mut tls_insecure = false;

    for (key, value) in props.iter() {
        builder = match key {
            "logTopic" => builder.with_log_topic(value.trim()),
            "logTopicIncludeTag" => builder.with_topic_include_tag(parse_bool(key, value)?),
            "watchdogIntervalMs" => builder.with_watchdog_interval_ms(parse_value(key, value)?),
            "watchdogDisable" => builder.with_watchdog_disabled(parse_bool(key, value)?),
            "clientId" => builder.with_client_id(value.trim().to_owned()),
            "keepAliveSecs" => builder.with_keep_alive_secs(parse_value(key, value)?),
            "cleanSession" => builder.with_clean_session(parse_bool(key, value)?),
            "capacity" => builder.with_capacity(parse_value(key, value)?),
            "qos" => builder.with_qos(parse_value(key, value)?),
            "shutdownTimeoutMs" => builder.with_shutdown_timeout_ms(parse_value(key, value)?),
            "warnIntervalMs" => builder.with_warn_interval_ms(parse_value(key, value)?),
            "payloadFormat" => {
                let format = PayloadFormat::parse(value).ok_or_else(|| {
                    HandlerBuildError::InvalidConfig(format!(
                        "payloadFormat must be json or msgpack, got {value:?}"
                    ))
                })?;
                builder.with_payload_format(format)
            }
            "host" => {
                host = Some(value.trim().to_owned());
                builder
            }
            "port" => {
                port = Some(parse_value::<u16>(key, value)?);
                builder
            }
            "username" => {
                username = Some(value.to_owned());
                builder
            }
            "password" => {
                password = Some(value.to_owned());
                builder
            }
            "tls" => {
                tls = parse_bool(key, value)?;
                builder
            }
            "tlsInsecure" => {
                tls_insecure = parse_bool(key, value)?;
                builder
            }
            "backoffBaseMs" => {
                backoff = backoff.with_base_ms(parse_value(key, value)?);
                builder
            }
            "backoffCapMs" => {
                backoff = backoff.with_cap_ms(parse_value(key, value)?);
                builder
            }
            "backoffResetAfterMs" => {
                backoff = backoff.with_reset_after_ms(parse_value(key, value)?);
                builder
            }
            "backoffDeadlineMs" => {
                backoff = backoff.with_deadline_ms(parse_value(key, value)?);
                builder
            }
            other => {
                return Err(HandlerBuildError::InvalidConfig(format!(
                    "unknown mqtt handler option: {other}"
                )));
            }
        };
    }

    if host.is_some() || port.is_some() {
        builder = builder.with_broker(
            host.unwrap_or_else(|| "localhost".into()),
            port.unwrap_or(crate::mqtt_handler::DEFAULT_BROKER_PORT),
        );
    }
    match (username, password) {
        (Some(user), pass) => builder = builder.with_credentials(user, pass.unwrap_or_default()),
        (None, Some(_)) => {
            return Err(HandlerBuildError::InvalidConfig(
                "password given without username".into(),
            ));
        }
        (None, None) => {}
    }
    if tls {
        builder = builder.with_tls(tls_insecure);
    }
    Ok(builder.with_backoff(backoff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[handler_mqtt]
logTopic = plant/line1/log
logTopicIncludeTag = true
watchdogIntervalMs = 2500
host = broker.local
port = 8883
username = logger
password = hunter2
tls = yes
payloadFormat = msgpack
backoffDeadlineMs = 60000
"#;

    #[rstest]
    fn section_maps_onto_config() {
        let config = builder_from_ini_str(SAMPLE, "handler_mqtt")
            .expect("section parses")
            .build_config()
            .expect("config validates");
        assert_eq!(config.log_topic, "plant/line1/log");
        assert!(config.topic_include_tag);
        assert_eq!(config.watchdog_interval, Duration::from_millis(2500));
        assert_eq!(config.broker.host, "broker.local");
        assert_eq!(config.broker.port, 8883);
        assert!(config.broker.tls.is_some());
        assert_eq!(config.payload_format, PayloadFormat::MessagePack);
        assert_eq!(config.broker.backoff.deadline, Some(Duration::from_secs(60)));
        let credentials = config.broker.credentials.expect("credentials set");
        assert_eq!(credentials.username, "logger");
        assert_eq!(credentials.password, "hunter2");
    }

    #[rstest]
    fn missing_section_is_reported() {
        let err = builder_from_ini_str(SAMPLE, "handler_other").unwrap_err();
        assert!(matches!(err, HandlerBuildError::InvalidConfig(msg) if msg.contains("handler_other")));
    }

    #[rstest]
    #[case("[h]\nlogTopic = a\nbogus = 1\n", "bogus")]
    #[case("[h]\nlogTopic = a\nport = huge\n", "port")]
    #[case("[h]\nlogTopic = a\nwatchdogDisable = maybe\n", "watchdogDisable")]
    #[case("[h]\nlogTopic = a\npassword = x\n", "username")]
    fn invalid_entries_are_rejected(#[case] text: &str, #[case] needle: &str) {
        let err = builder_from_ini_str(text, "h").unwrap_err();
        assert!(
            matches!(&err, HandlerBuildError::InvalidConfig(msg) if msg.contains(needle)),
            "unexpected error: {err}"
        );
    }

    #[rstest]
    fn reads_from_disk() {
        let mut file = NamedTempFile::new().expect("create temp ini file");
        write!(file, "[mqtt]\nlogTopic = log\nwatchdogDisable = true\n").expect("write ini");
        let config = builder_from_ini_file(file.path(), "mqtt")
            .expect("file parses")
            .build_config()
            .expect("config validates");
        assert_eq!(config.log_topic, "log");
        assert!(config.watchdog_disabled);
    }

    #[rstest]
    fn missing_file_is_invalid_config() {
        let err = builder_from_ini_file("/nonexistent/femto-mqtt.ini", "mqtt").unwrap_err();
        assert!(matches!(err, HandlerBuildError::InvalidConfig(msg) if msg.contains("doesn't exist")));
    }
}
