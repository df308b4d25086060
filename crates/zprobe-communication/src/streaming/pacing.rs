//! Cancellable pacing timer
//!
//! Holds at most one scheduled action. Scheduling replaces whatever was
//! pending, and dropping or cancelling the timer guarantees the action never
//! fires, so nothing is sent on a connection that has already been closed.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Sleep};

/// Work deferred until the timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Release the next queued command
    Advance,
    /// Send `$X` after an alarm settled
    Unlock,
}

struct Pending {
    action: ScheduledAction,
    sleep: Pin<Box<Sleep>>,
}

/// Single-slot scheduled action
#[derive(Default)]
pub struct PacingTimer {
    pending: Option<Pending>,
}

impl PacingTimer {
    /// Create an idle timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay`, replacing any pending action
    pub fn schedule(&mut self, action: ScheduledAction, delay: Duration) {
        if let Some(previous) = &self.pending {
            if previous.action != action {
                tracing::debug!("{:?} replaces pending {:?}", action, previous.action);
            }
        }
        self.pending = Some(Pending {
            action,
            sleep: Box::pin(sleep(delay)),
        });
    }

    /// Cancel the pending action, returning it
    pub fn cancel(&mut self) -> Option<ScheduledAction> {
        self.pending.take().map(|p| p.action)
    }

    /// The pending action, if any
    pub fn pending(&self) -> Option<ScheduledAction> {
        self.pending.as_ref().map(|p| p.action)
    }

    /// Wait for the pending action to come due.
    ///
    /// Never completes while nothing is scheduled. Cancel safe: if the
    /// returned future is dropped early the action stays scheduled.
    pub async fn fired(&mut self) -> ScheduledAction {
        match &mut self.pending {
            Some(pending) => {
                pending.sleep.as_mut().await;
                let action = pending.action;
                self.pending = None;
                action
            }
            None => std::future::pending().await,
        }
    }
}

impl std::fmt::Debug for PacingTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacingTimer")
            .field("pending", &self.pending())
            .finish()
    }
}
