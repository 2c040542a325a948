//! Worker thread driving the `rumqttc` event loop.
//!
//! The worker owns the [`Connection`] half of the client, translates its
//! notifications into [`BrokerEvent`]s, and decides when to try again after a
//! failure: either once the backoff delay elapses or as soon as a reconnect
//! request arrives. Retrying never stops while the client is open.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::debug;
use parking_lot::Mutex;
use rumqttc::{Connection, Event, Outgoing, Packet};

use super::{
    backoff::BackoffState,
    broker::{BrokerEvent, EventListener},
    config::BackoffPolicy,
};

/// Commands processed by the worker while it is offline.
#[derive(Debug)]
pub enum BrokerCommand {
    Reconnect,
    Shutdown,
}

/// State shared between [`MqttBroker`](super::MqttBroker) and its worker.
#[derive(Debug, Default)]
pub struct WorkerShared {
    closing: AtomicBool,
    exited: AtomicBool,
    disconnect_ack: Mutex<Option<Sender<()>>>,
}

impl WorkerShared {
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Flag the client as closing. Returns `false` if it already was.
    pub fn begin_close(&self, done: Sender<()>) -> bool {
        if self.closing.swap(true, Ordering::AcqRel) {
            return false;
        }
        *self.disconnect_ack.lock() = Some(done);
        if self.has_exited() {
            self.acknowledge();
        }
        true
    }

    fn acknowledge(&self) {
        if let Some(done) = self.disconnect_ack.lock().take() {
            let _ = done.send(());
        }
    }

    fn mark_exited(&self) {
        self.exited.store(true, Ordering::Release);
        self.acknowledge();
    }
}

enum Session {
    /// Our DISCONNECT went out; the worker is done.
    Ended,
    /// The connection failed or was closed by the broker.
    Dropped,
}

pub fn run_event_loop(
    mut connection: Connection,
    control: Receiver<BrokerCommand>,
    listener: EventListener,
    shared: Arc<WorkerShared>,
    policy: BackoffPolicy,
) {
    let mut backoff = BackoffState::new(policy);
    loop {
        if let Session::Ended = drive_session(&mut connection, &listener, &shared, &mut backoff) {
            break;
        }
        if shared.is_closing() {
            listener(BrokerEvent::Close);
            break;
        }
        listener(BrokerEvent::Offline);
        if !wait_for_retry(&control, &shared, &mut backoff) {
            listener(BrokerEvent::Close);
            break;
        }
        debug!("FemtoMqttHandler broker worker reconnecting");
    }
    shared.mark_exited();
}

fn drive_session(
    connection: &mut Connection,
    listener: &EventListener,
    shared: &WorkerShared,
    backoff: &mut BackoffState,
) -> Session {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                backoff.record_connected(Instant::now());
                listener(BrokerEvent::Connect);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                listener(BrokerEvent::Close);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                listener(BrokerEvent::Close);
                return Session::Ended;
            }
            Ok(_) => {}
            Err(err) => {
                backoff.record_disconnected(Instant::now());
                if !shared.is_closing() {
                    listener(BrokerEvent::Error(err.to_string()));
                }
                return Session::Dropped;
            }
        }
    }
    // The iterator ends once every client handle has been dropped.
    Session::Dropped
}

/// Park until the next attempt is due. Returns `false` when the worker should
/// exit instead.
fn wait_for_retry(
    control: &Receiver<BrokerCommand>,
    shared: &WorkerShared,
    backoff: &mut BackoffState,
) -> bool {
    let command = match control.recv_timeout(backoff.next_sleep(Instant::now())) {
        Ok(command) => Some(command),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => return false,
    };
    if let Some(BrokerCommand::Shutdown) = command {
        return false;
    }
    // Coalesce reconnect requests that piled up while we were waiting.
    loop {
        match control.try_recv() {
            Ok(BrokerCommand::Reconnect) => continue,
            Ok(BrokerCommand::Shutdown) | Err(TryRecvError::Disconnected) => return false,
            Err(TryRecvError::Empty) => break,
        }
    }
    !shared.is_closing()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};
    use std::time::Duration;

    fn slow_policy() -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_secs(30),
            cap: Duration::from_secs(30),
            reset_after: Duration::from_secs(30),
            deadline: None,
        }
    }

    #[test]
    fn reconnect_request_cuts_backoff_short() {
        let (tx, rx) = unbounded();
        let shared = WorkerShared::default();
        let mut backoff = BackoffState::new(slow_policy());
        tx.send(BrokerCommand::Reconnect).unwrap();
        tx.send(BrokerCommand::Reconnect).unwrap();
        let start = Instant::now();
        assert!(wait_for_retry(&rx, &shared, &mut backoff));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(rx.is_empty(), "stale reconnect requests should be drained");
    }

    #[test]
    fn shutdown_command_stops_retrying() {
        let (tx, rx) = unbounded();
        let shared = WorkerShared::default();
        let mut backoff = BackoffState::new(slow_policy());
        tx.send(BrokerCommand::Reconnect).unwrap();
        tx.send(BrokerCommand::Shutdown).unwrap();
        assert!(!wait_for_retry(&rx, &shared, &mut backoff));
    }

    #[test]
    fn dropped_control_channel_stops_retrying() {
        let (tx, rx) = unbounded::<BrokerCommand>();
        drop(tx);
        let shared = WorkerShared::default();
        let mut backoff = BackoffState::new(slow_policy());
        assert!(!wait_for_retry(&rx, &shared, &mut backoff));
    }

    #[test]
    fn close_after_exit_acknowledges_immediately() {
        let shared = WorkerShared::default();
        shared.mark_exited();
        let (done_tx, done_rx) = bounded(1);
        assert!(shared.begin_close(done_tx));
        assert!(done_rx.try_recv().is_ok());
    }

    #[test]
    fn second_close_is_rejected() {
        let shared = WorkerShared::default();
        let (first, _first_rx) = bounded(1);
        let (second, _second_rx) = bounded(1);
        assert!(shared.begin_close(first));
        assert!(!shared.begin_close(second));
    }
}
