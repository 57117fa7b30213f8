//! The worker stage (spec §4.3): N long-lived sessions pulling tasks off
//! the shared `workerQ`, executing them, and pushing parsed results (or
//! mutation counters) onto `resultsQ`.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, Mutex};

use crate::config::{ConnectionSettings, RuntimeSettings};
use crate::kill::KillObserver;
use crate::pipeline::{parse_row, ParsedValue, PipelineResult, TaskKind, WorkerTask};
use crate::queues::{Item, StatsCounters};
use crate::session::SessionFactory;

/// How a worker's loop ended, so the supervisor knows whether to spawn a
/// replacement (spec §4.4, §4.9).
#[derive(Debug)]
pub enum WorkerExit {
    /// This worker dequeued the sentinel, waited for every select task
    /// already dispatched to finish, and forwarded it. The supervisor
    /// still replaces it (spec §4.4 makes no exception for this case),
    /// which is what leaves a live worker ready for any mutation task a
    /// delete-rows/update-rows driver enqueues afterward.
    SentinelForwarded,
    /// `workerQ` closed without this worker ever seeing the sentinel
    /// itself - another worker already forwarded it.
    ChannelClosed,
    /// Could not open a session; supervisor spawns a replacement.
    ConnectFailure(String),
    /// A query execution failed; supervisor spawns a replacement.
    QueryFailure(String),
    /// `kill` fired mid-loop.
    Killed,
}

/// Picks one host from a comma-separated list uniformly at random, or
/// returns the input unchanged if it names a single host (spec §4.3
/// step 2).
pub fn pick_host(host_spec: &str) -> String {
    let hosts: Vec<&str> = host_spec.split(',').map(str::trim).filter(|h| !h.is_empty()).collect();
    if hosts.len() <= 1 {
        return host_spec.trim().to_string();
    }
    let idx = rand::rng().random_range(0..hosts.len());
    hosts[idx].to_string()
}

/// Runs one worker to completion. `worker_rx` is shared across the whole
/// pool behind a mutex since `tokio::sync::mpsc` is single-consumer.
pub async fn run_worker(
    settings: Arc<RuntimeSettings>,
    conn: Arc<ConnectionSettings>,
    factory: Arc<dyn SessionFactory>,
    worker_rx: Arc<Mutex<mpsc::Receiver<Item<WorkerTask>>>>,
    results_tx: mpsc::Sender<Item<PipelineResult>>,
    stats: Arc<StatsCounters>,
    mut kill: KillObserver,
) -> WorkerExit {
    let jitter_bound = settings.startup_jitter_bound();
    if jitter_bound > 0 {
        let delay = rand::rng().random_range(0..jitter_bound);
        tokio::select! {
            _ = kill.wait() => return WorkerExit::Killed,
            _ = tokio::time::sleep(Duration::from_secs(delay)) => {}
        }
    }

    let host = pick_host(&conn.host);
    let pinned_conn = conn.with_host(host);
    let session = match factory.connect(&pinned_conn, &settings.keyspace).await {
        Ok(session) => session,
        Err(e) => return WorkerExit::ConnectFailure(e.to_string()),
    };

    loop {
        if kill.is_set() {
            return WorkerExit::Killed;
        }

        let task = {
            let mut rx = worker_rx.lock().await;
            tokio::select! {
                _ = kill.wait() => return WorkerExit::Killed,
                maybe_item = rx.recv() => maybe_item,
            }
        };

        let item = match task {
            Some(item) => item,
            None => return WorkerExit::ChannelClosed,
        };

        let worker_task = match item {
            Item::EndOfStream => {
                wait_for_selects_to_drain(&stats, &mut kill).await;
                let _ = results_tx.send(Item::EndOfStream).await;
                return WorkerExit::SentinelForwarded;
            }
            Item::Data(task) => task,
        };

        match execute_task(&*session, &worker_task, &settings, &results_tx, &stats).await {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!(split = %worker_task.split, error = %e, "query failed, worker exiting");
                return WorkerExit::QueryFailure(e.to_string());
            }
        }
    }
}

async fn execute_task(
    session: &dyn crate::session::Session,
    task: &WorkerTask,
    settings: &RuntimeSettings,
    results_tx: &mpsc::Sender<Item<PipelineResult>>,
    stats: &Arc<StatsCounters>,
) -> crate::Result<()> {
    let rows = match session.execute(&task.query).await {
        Ok(rows) => rows,
        Err(e) => {
            if task.kind == TaskKind::Select {
                stats.selects_completed.fetch_add(1, Ordering::Relaxed);
            }
            return Err(e);
        }
    };

    match task.kind {
        TaskKind::Select => {
            for row in rows {
                if let Some(value) = parse_row(
                    task.parser,
                    &row,
                    &settings.key,
                    settings.extra_key.as_deref(),
                ) {
                    let result = PipelineResult {
                        split: task.split,
                        value,
                    };
                    if results_tx.send(Item::Data(result)).await.is_err() {
                        break;
                    }
                    stats.results.fetch_add(1, Ordering::Relaxed);
                }
            }
            stats.selects_completed.fetch_add(1, Ordering::Relaxed);
        }
        TaskKind::Delete | TaskKind::Update => {
            stats.deleted.fetch_add(1, Ordering::Relaxed);
        }
    }
    Ok(())
}

/// Blocks until every select task the mapper has dispatched so far
/// (`mapped`, frozen by the time the sentinel itself is dequeued) has
/// finished executing. Called before forwarding `resultsQ`'s sentinel so
/// a sibling worker's in-flight row can never land on `resultsQ` after it
/// (invariant 3).
async fn wait_for_selects_to_drain(stats: &Arc<StatsCounters>, kill: &mut KillObserver) {
    loop {
        let mapped = stats.mapped.load(Ordering::Relaxed);
        let completed = stats.selects_completed.load(Ordering::Relaxed);
        if completed >= mapped {
            return;
        }
        tokio::select! {
            _ = kill.wait() => return,
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
    }
}

/// Counts a parsed value as a bare `i64`, used by the count-rows driver.
pub fn as_count(value: &ParsedValue) -> i64 {
    match value {
        ParsedValue::Count(n) => *n,
        ParsedValue::Row(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_host_returned_unchanged() {
        assert_eq!(pick_host("cassandra1.example.com"), "cassandra1.example.com");
    }

    #[test]
    fn comma_separated_hosts_pick_one_of_them() {
        let chosen = pick_host("a,b,c");
        assert!(["a", "b", "c"].contains(&chosen.as_str()));
    }
}
