//! The single FIFO through which a running session receives its signals.

use std::collections::VecDeque;

use tokio::sync::mpsc;

use crate::domain::signal::Signal;

/// Sending half, held by the signal bus.
pub type SignalSender = mpsc::UnboundedSender<Signal>;

/// Receiving half, owned by the session driver.
#[derive(Debug)]
pub struct SignalInbox {
    receiver: mpsc::UnboundedReceiver<Signal>,
    backlog: VecDeque<Signal>,
    closed: bool,
}

impl SignalInbox {
    /// Creates a connected sender and inbox.
    #[must_use]
    pub fn channel() -> (SignalSender, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            sender,
            Self {
                receiver,
                backlog: VecDeque::new(),
                closed: false,
            },
        )
    }

    /// Waits for the next signal in arrival order.
    ///
    /// Once every sender is gone this never completes, so a `select!` over it
    /// falls through to its other branches.
    pub async fn next(&mut self) -> Signal {
        if let Some(signal) = self.backlog.pop_front() {
            return signal;
        }
        if !self.closed {
            if let Some(signal) = self.receiver.recv().await {
                return signal;
            }
            self.closed = true;
        }
        std::future::pending().await
    }

    /// Pulls every signal sent so far into the inbox and returns how many
    /// are waiting. Signals sent after this call are not counted.
    pub fn buffer_queued(&mut self) -> usize {
        while let Ok(signal) = self.receiver.try_recv() {
            self.backlog.push_back(signal);
        }
        self.backlog.len()
    }

    /// Takes the oldest waiting signal without waiting for a new one.
    pub fn try_next(&mut self) -> Option<Signal> {
        self.backlog
            .pop_front()
            .or_else(|| self.receiver.try_recv().ok())
    }

    /// Returns `true` once every sender has been dropped and the queue drained.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
