//! Periodically logs the depth of each bounded channel (spec §4.7): a
//! diagnostic aid for spotting a stalled stage (a channel pinned at
//! capacity points at whatever is downstream of it not keeping up).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::kill::KillObserver;

/// Minimal trait over an `mpsc::Sender` so the monitor can report depth
/// without caring what payload type each channel carries.
pub trait DepthProbe: Send + Sync {
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
}

impl<T: Send> DepthProbe for mpsc::Sender<T> {
    fn len(&self) -> usize {
        self.max_capacity() - self.capacity()
    }

    fn capacity(&self) -> usize {
        self.max_capacity()
    }
}

/// Runs until `kill` fires, logging each probe's occupancy every `period`.
pub async fn run_queue_monitor(
    probes: Vec<(&'static str, Arc<dyn DepthProbe>)>,
    period: Duration,
    mut kill: KillObserver,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = kill.wait() => return,
            _ = ticker.tick() => {
                for (name, probe) in &probes {
                    let len = probe.len();
                    let capacity = probe.capacity();
                    if len == capacity && capacity > 0 {
                        tracing::warn!(queue = name, len, capacity, "queue at capacity");
                    } else {
                        tracing::debug!(queue = name, len, capacity, "queue depth");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kill::KillSwitch;

    #[tokio::test]
    async fn stops_promptly_once_killed() {
        let (tx, _rx) = mpsc::channel::<()>(4);
        let probes: Vec<(&'static str, Arc<dyn DepthProbe>)> = vec![("splitQ", Arc::new(tx))];
        let (switch, observer) = KillSwitch::new();
        let handle = tokio::spawn(run_queue_monitor(probes, Duration::from_secs(3600), observer));
        switch.kill();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should return promptly after kill")
            .unwrap();
    }
}
