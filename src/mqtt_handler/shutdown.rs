//! Completion signal returned by handler shutdown.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError, bounded};

/// Notification that the broker acknowledged the disconnect.
///
/// Obtaining the signal never blocks. Callers choose whether to poll it with
/// [`try_complete`](Self::try_complete) or wait with a bound via
/// [`wait`](Self::wait) / [`wait_timeout`](Self::wait_timeout).
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: Receiver<()>,
    timeout: Duration,
    done: bool,
}

impl ShutdownSignal {
    pub(crate) fn new(rx: Receiver<()>, timeout: Duration) -> Self {
        Self {
            rx,
            timeout,
            done: false,
        }
    }

    /// A signal that has already completed.
    pub fn completed() -> Self {
        let (_, rx) = bounded(0);
        Self {
            rx,
            timeout: Duration::ZERO,
            done: true,
        }
    }

    /// Poll for completion without blocking.
    pub fn try_complete(&mut self) -> bool {
        if !self.done {
            self.done = matches!(self.rx.try_recv(), Ok(()));
        }
        self.done
    }

    /// Wait up to the handler's shutdown timeout.
    pub fn wait(self) -> bool {
        let timeout = self.timeout;
        self.wait_timeout(timeout)
    }

    /// Wait up to `timeout` for the acknowledgement.
    pub fn wait_timeout(mut self, timeout: Duration) -> bool {
        if self.done {
            return true;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(()) => {
                self.done = true;
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Whether the broker side dropped the acknowledgement channel without
    /// completing it. A pending acknowledgement is consumed and completes the
    /// signal.
    pub fn is_abandoned(&mut self) -> bool {
        if self.done {
            return false;
        }
        match self.rx.try_recv() {
            Ok(()) => {
                self.done = true;
                false
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_signal_is_immediately_done() {
        let mut signal = ShutdownSignal::completed();
        assert!(signal.try_complete());
        assert!(ShutdownSignal::completed().wait());
    }

    #[test]
    fn completes_when_acknowledged() {
        let (tx, rx) = bounded(1);
        let mut signal = ShutdownSignal::new(rx, Duration::from_millis(100));
        assert!(!signal.try_complete());
        tx.send(()).unwrap();
        assert!(signal.try_complete());
    }

    #[test]
    fn wait_gives_up_after_timeout() {
        let (_tx, rx) = bounded(1);
        let signal = ShutdownSignal::new(rx, Duration::from_millis(20));
        assert!(!signal.wait());
    }

    #[test]
    fn dropped_sender_abandons_signal() {
        let (tx, rx) = bounded::<()>(1);
        let mut signal = ShutdownSignal::new(rx, Duration::from_millis(20));
        drop(tx);
        assert!(signal.is_abandoned());
        assert!(!signal.wait());
    }

    #[test]
    fn abandonment_check_keeps_a_queued_acknowledgement() {
        let (tx, rx) = bounded(1);
        let mut signal = ShutdownSignal::new(rx, Duration::from_millis(20));
        tx.send(()).unwrap();
        drop(tx);
        assert!(!signal.is_abandoned());
        assert!(!signal.is_abandoned());
        assert!(signal.try_complete());
        assert!(signal.wait());
    }
}
