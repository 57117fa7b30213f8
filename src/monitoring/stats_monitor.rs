//! Periodically logs pipeline throughput and ETA (spec §4.6): splits
//! produced, rows mapped, results produced vs consumed, deletion
//! progress, a result rate, a done percentage, and an estimated time
//! remaining. Sleeps 10s/5s/2s depending on how far out the ETA is,
//! mirroring the original's adaptive cadence.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::kill::KillObserver;
use crate::queues::{StatsCounters, StatsSnapshot};
use crate::util::human_time;

/// Runs until `kill` fires, logging a throughput/ETA line on an adaptive
/// cadence. `predicted_splits` is the denominator for done% and ETA
/// (spec §4.6); `results_consumed` is read live each tick so the line
/// reflects what the action driver has actually drained off `resultsQ`.
pub async fn run_stats_monitor(
    stats: Arc<StatsCounters>,
    predicted_splits: u64,
    mut kill: KillObserver,
) {
    let mut previous = stats.snapshot();
    let mut previous_at = Instant::now();
    let mut sleep_for = Duration::from_secs(2);

    loop {
        tokio::select! {
            _ = kill.wait() => return,
            _ = tokio::time::sleep(sleep_for) => {}
        }

        let current = stats.snapshot();
        let now = Instant::now();
        let elapsed = now.duration_since(previous_at).as_secs_f64().max(f64::EPSILON);
        let result_delta = current.results.saturating_sub(previous.results);
        let result_rate = result_delta as f64 / elapsed;

        let done_pct = if predicted_splits > 0 {
            (current.results as f64) / (predicted_splits as f64 / 100.0)
        } else {
            0.0
        };

        let eta = if result_rate > 0.0 && predicted_splits as u64 > current.results {
            let remaining = predicted_splits as f64 - current.results as f64;
            Some(remaining / result_rate)
        } else {
            None
        };

        let eta_display = eta.map(human_time).unwrap_or_else(|| "unknown".to_string());
        tracing::info!(
            splits = current.splits,
            mapped = current.mapped,
            results = current.results,
            results_consumed = current.results_consumed,
            deleted = current.deleted,
            delete_scheduled = current.delete_scheduled,
            result_rate = result_rate,
            done_pct = done_pct,
            eta = %eta_display,
            "pipeline progress",
        );

        sleep_for = next_sleep(eta);
        previous = current;
        previous_at = now;
    }
}

/// Spec §4.6: 10s when ETA > 2 min, 5s when > 1 min, else 2s.
fn next_sleep(eta_seconds: Option<f64>) -> Duration {
    match eta_seconds {
        Some(eta) if eta > 120.0 => Duration::from_secs(10),
        Some(eta) if eta > 60.0 => Duration::from_secs(5),
        _ => Duration::from_secs(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kill::KillSwitch;

    #[tokio::test]
    async fn stops_promptly_once_killed() {
        let stats = StatsCounters::new();
        stats.splits.fetch_add(5, Ordering::Relaxed);
        let (switch, observer) = KillSwitch::new();
        let handle = tokio::spawn(run_stats_monitor(stats, 100, observer));
        switch.kill();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should return promptly after kill")
            .unwrap();
    }

    #[test]
    fn adaptive_sleep_matches_thresholds() {
        assert_eq!(next_sleep(Some(300.0)), Duration::from_secs(10));
        assert_eq!(next_sleep(Some(90.0)), Duration::from_secs(5));
        assert_eq!(next_sleep(Some(30.0)), Duration::from_secs(2));
        assert_eq!(next_sleep(None), Duration::from_secs(2));
    }
}
