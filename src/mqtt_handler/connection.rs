//! Connection state driven by broker lifecycle events.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use log::{error, info, warn};

use super::broker::BrokerEvent;

/// Most recently observed status of the broker connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connected = 1,
    /// Closed after an intentional shutdown.
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connected,
            2 => Self::Closed,
            _ => Self::Disconnected,
        }
    }
}

/// Shared holder of [`ConnectionState`].
///
/// The state is only ever written by [`observe`](Self::observe), which the
/// broker client invokes for each lifecycle event. Nothing here reports
/// failures outward; every event is recorded and logged.
#[derive(Debug)]
pub struct ConnectionMonitor {
    state: AtomicU8,
    closed_intentionally: AtomicBool,
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            closed_intentionally: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Whether the handler has begun an intentional shutdown.
    pub fn closed_intentionally(&self) -> bool {
        self.closed_intentionally.load(Ordering::Acquire)
    }

    /// Flag the upcoming close as deliberate.
    pub fn mark_closing(&self) {
        self.closed_intentionally.store(true, Ordering::Release);
    }

    /// True when the watchdog should nudge the client.
    pub fn needs_reconnect(&self) -> bool {
        !self.closed_intentionally() && !self.is_connected()
    }

    fn set(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Apply a broker lifecycle event.
    pub fn observe(&self, event: BrokerEvent) {
        match event {
            BrokerEvent::Connect => {
                self.set(ConnectionState::Connected);
                info!("FemtoMqttHandler connected to broker");
            }
            BrokerEvent::Error(description) => {
                self.set(ConnectionState::Disconnected);
                error!("FemtoMqttHandler broker error: {description}");
            }
            BrokerEvent::Close => {
                if self.closed_intentionally() {
                    self.set(ConnectionState::Closed);
                } else {
                    self.set(ConnectionState::Disconnected);
                }
                warn!("FemtoMqttHandler broker connection closed");
            }
            BrokerEvent::Offline => {
                self.set(ConnectionState::Disconnected);
                warn!("FemtoMqttHandler broker client offline");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtest::Logger;
    use rstest::rstest;
    use serial_test::serial;

    #[rstest]
    #[case(BrokerEvent::Error("refused".into()))]
    #[case(BrokerEvent::Close)]
    #[case(BrokerEvent::Offline)]
    fn non_connect_events_mark_disconnected(#[case] event: BrokerEvent) {
        let monitor = ConnectionMonitor::new();
        monitor.observe(BrokerEvent::Connect);
        assert!(monitor.is_connected());
        monitor.observe(event);
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        assert!(monitor.needs_reconnect());
    }

    #[test]
    fn close_after_shutdown_is_terminal() {
        let monitor = ConnectionMonitor::new();
        monitor.observe(BrokerEvent::Connect);
        monitor.mark_closing();
        monitor.observe(BrokerEvent::Close);
        assert_eq!(monitor.state(), ConnectionState::Closed);
        assert!(!monitor.needs_reconnect());
    }

    #[test]
    #[serial]
    fn events_are_logged_at_matching_levels() {
        let mut logger = Logger::start();
        while logger.pop().is_some() {}
        let monitor = ConnectionMonitor::new();
        monitor.observe(BrokerEvent::Connect);
        monitor.observe(BrokerEvent::Error("refused by monitor-test".into()));
        monitor.observe(BrokerEvent::Offline);

        let mut seen = Vec::new();
        while let Some(record) = logger.pop() {
            seen.push((record.level(), record.args().to_string()));
        }
        let level_of = |needle: &str| {
            seen.iter()
                .find(|(_, msg)| msg.contains(needle))
                .map(|(level, _)| *level)
        };
        assert_eq!(level_of("connected to broker"), Some(log::Level::Info));
        assert_eq!(level_of("refused by monitor-test"), Some(log::Level::Error));
        assert_eq!(level_of("client offline"), Some(log::Level::Warn));
    }
}
