//! Cancellation and deadline context shared by every concurrent provider call.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Carries an optional deadline and a cancel signal.
///
/// Cloning is cheap; every clone observes the same signal.
#[derive(Debug, Clone)]
pub struct QueryContext {
    deadline: Option<Instant>,
    cancel: watch::Receiver<bool>,
}

/// Owner side of a [`QueryContext`]'s cancel signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl QueryContext {
    /// A context that can be cancelled through the returned handle.
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { deadline: None, cancel: rx }, CancelHandle { tx })
    }

    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        let (ctx, _handle) = Self::new();
        ctx
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    /// Pends forever for a background context.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.clone();
        let signal = async move {
            // A dropped handle can never cancel.
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = signal => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => signal.await,
        }
    }
}
