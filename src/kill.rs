//! The process-wide kill signal (spec §3 "Kill signal", §9 design note).
//!
//! Modeled as a one-shot broadcast on top of [`tokio::sync::watch`]: once
//! set it stays set, and every observer — whether it attached before or
//! after the flip — sees `true` from that point on. This is the "native
//! atomic counter"-style simplification the spec explicitly sanctions in
//! place of the original's channel-based kill queue (spec §9): a `watch`
//! cell gives idempotent observation without sentinel proliferation.

use tokio::sync::watch;

/// The write side. Owned by whoever starts the pipeline (the supervisor's
/// caller); calling [`KillSwitch::kill`] more than once is a harmless no-op.
#[derive(Debug, Clone)]
pub struct KillSwitch {
    tx: watch::Sender<bool>,
}

/// The read side. Cheaply cloned and handed to every stage.
#[derive(Debug, Clone)]
pub struct KillObserver {
    rx: watch::Receiver<bool>,
}

impl KillSwitch {
    pub fn new() -> (Self, KillObserver) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, KillObserver { rx })
    }

    /// Set the kill flag. Idempotent: once set, stays set.
    pub fn kill(&self) {
        // A closed receiver side just means every observer already dropped,
        // which is fine - there is nothing left to notify.
        let _ = self.tx.send(true);
    }

    pub fn observer(&self) -> KillObserver {
        KillObserver {
            rx: self.tx.subscribe(),
        }
    }
}

impl KillObserver {
    /// Non-blocking check, used between loop iterations.
    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Suspends until the flag is set. If it is already set, returns
    /// immediately - this is what makes the signal safe to `select!`
    /// against regardless of when the stage started watching.
    pub async fn wait(&mut self) {
        if self.is_set() {
            return;
        }
        let _ = self.rx.wait_for(|set| *set).await;
    }
}
