//! Exam countdown and its cancellation token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, watch};

/// Idempotent cancellation shared between the countdown task and the submit path.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self { sender: Arc::new(sender) }
    }

    /// Returns true only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        !self.sender.send_replace(true)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so `wait_for` cannot observe a closed channel.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Remaining-seconds counter driven by an external tick source.
#[derive(Debug)]
pub struct Countdown {
    remaining: Arc<AtomicU64>,
    token: CancelToken,
    on_expire: Mutex<Option<oneshot::Sender<()>>>,
}

impl Countdown {
    /// Starts at `seconds`; the receiver resolves once, when the countdown reaches zero.
    pub fn start(seconds: u64, token: CancelToken) -> (Self, oneshot::Receiver<()>) {
        let (sender, receiver) = oneshot::channel();
        let countdown = Self {
            remaining: Arc::new(AtomicU64::new(seconds)),
            token,
            on_expire: Mutex::new(Some(sender)),
        };
        (countdown, receiver)
    }

    /// Shared view of the remaining seconds.
    pub fn remaining_handle(&self) -> Arc<AtomicU64> {
        self.remaining.clone()
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Decrements by one second. Reaching zero cancels the token and fires the expiry signal,
    /// but only if this tick was the one that cancelled.
    pub fn tick(&self) -> u64 {
        if self.token.is_cancelled() {
            return self.remaining();
        }

        let previous = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| value.checked_sub(1))
            .unwrap_or(0);
        let remaining = previous.saturating_sub(1);

        if remaining == 0 && self.token.cancel() {
            let sender = self.on_expire.lock().ok().and_then(|mut slot| slot.take());
            if let Some(sender) = sender {
                let _ = sender.send(());
            }
        }
        remaining
    }
}

/// `m:ss`, e.g. `90:00` or `0:07`.
pub fn format_remaining(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
