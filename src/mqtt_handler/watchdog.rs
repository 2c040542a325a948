//! Recurring reconnect watchdog.
//!
//! The watchdog runs on its own thread and invokes a check closure once per
//! interval. It has no backoff of its own; the broker client decides how a
//! reconnect request is actually carried out.

use std::{thread, time::Duration};

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select, tick};
use log::warn;

/// Handle to a running watchdog thread.
#[derive(Debug)]
pub struct ReconnectWatchdog {
    stop_tx: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ReconnectWatchdog {
    /// Spawn a watchdog calling `check` every `interval`.
    pub fn start<F>(interval: Duration, check: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded(0);
        let handle = thread::Builder::new()
            .name("femto-mqtt-watchdog".into())
            .spawn(move || watchdog_loop(interval, stop_rx, check));
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("FemtoMqttHandler failed to spawn watchdog thread: {err}");
                None
            }
        };
        Self {
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancel the timer and wait for the thread to exit.
    ///
    /// A check already in progress completes first; none starts afterwards.
    pub fn stop(&mut self) {
        drop(self.stop_tx.take());
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("FemtoMqttHandler: watchdog thread panicked");
        }
    }
}

impl Drop for ReconnectWatchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watchdog_loop<F: FnMut()>(interval: Duration, stop_rx: Receiver<()>, mut check: F) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(stop_rx) -> _ => return,
            recv(ticker) -> _ => {
                // Both channels may be ready at once; stopping wins.
                if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                    return;
                }
                check();
            }
        }
    }
}
