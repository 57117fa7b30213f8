//! The mapper stage (spec §4.2): takes the single per-run [`MapperTask`]
//! work assignment, then turns every split off `splitQ` into a concrete
//! [`WorkerTask`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{Result, TriremeError};
use crate::kill::KillObserver;
use crate::queues::{Item, StatsCounters};
use crate::token::TokenRange;

use super::{MapperTask, TaskKind, WorkerTask};

/// How long the mapper waits for its work assignment before giving up
/// (spec §4.2, §4.9).
const ASSIGNMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Renders `token(key[, extraKey]) >= lo and token(key[, extraKey]) < hi
/// [and filter]` (spec §6 "Query shape emitted").
pub fn render_token_predicate(key: &str, extra_key: Option<&str>, split: TokenRange) -> String {
    let token_expr = match extra_key {
        Some(extra) => format!("token({}, {})", key, extra),
        None => format!("token({})", key),
    };
    format!("{} >= {} and {} < {}", token_expr, split.lo, token_expr, split.hi)
}

/// Renders the complete mapper-task query template against one split.
pub fn render_query(task: &MapperTask, split: TokenRange, filter_string: Option<&str>) -> String {
    let predicate = render_token_predicate(&task.key, task.extra_key.as_deref(), split);
    match filter_string {
        Some(filter) => format!("{} where {} and {}", task.query_template, predicate, filter),
        None => format!("{} where {}", task.query_template, predicate),
    }
}

/// Waits up to [`ASSIGNMENT_TIMEOUT`] for the one mapper task this run
/// will ever receive, then renders every split into a worker task until
/// the sentinel arrives, forwarding exactly one sentinel onward.
pub async fn run_mapper(
    mut assignment_rx: mpsc::Receiver<MapperTask>,
    filter_string: Option<String>,
    mut split_rx: mpsc::Receiver<Item<TokenRange>>,
    worker_tx: mpsc::Sender<Item<WorkerTask>>,
    stats: Arc<StatsCounters>,
    mut kill: KillObserver,
) -> Result<()> {
    let task = tokio::time::timeout(ASSIGNMENT_TIMEOUT, assignment_rx.recv())
        .await
        .map_err(|_| TriremeError::Timeout)?
        .ok_or(TriremeError::Timeout)?;

    loop {
        tokio::select! {
            _ = kill.wait() => return Ok(()),
            maybe_item = split_rx.recv() => {
                let Some(item) = maybe_item else {
                    // Splitter dropped its sender without a sentinel (killed).
                    return Ok(());
                };
                match item {
                    Item::EndOfStream => {
                        let _ = worker_tx.send(Item::EndOfStream).await;
                        return Ok(());
                    }
                    Item::Data(split) => {
                        let query = render_query(&task, split, filter_string.as_deref());
                        let worker_task = WorkerTask {
                            query,
                            split,
                            kind: TaskKind::Select,
                            parser: task.parser,
                        };
                        if worker_tx.send(Item::Data(worker_task)).await.is_err() {
                            return Ok(());
                        }
                        stats.mapped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
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
    use crate::pipeline::ParserKind;

    #[tokio::test]
    async fn renders_one_worker_task_per_split_then_sentinel() {
        let (assignment_tx, assignment_rx) = mpsc::channel(1);
        let (split_tx, split_rx) = mpsc::channel(16);
        let (worker_tx, mut worker_rx) = mpsc::channel(16);
        let stats = StatsCounters::new();
        let (_switch, observer) = KillSwitch::new();

        assignment_tx
            .send(MapperTask {
                query_template: "select count(*) from ks.tb".into(),
                key: "id".into(),
                extra_key: None,
                parser: ParserKind::Count,
            })
            .await
            .unwrap();

        split_tx
            .send(Item::Data(TokenRange::new(0, 10)))
            .await
            .unwrap();
        split_tx.send(Item::EndOfStream).await.unwrap();

        run_mapper(assignment_rx, None, split_rx, worker_tx, stats.clone(), observer)
            .await
            .unwrap();

        let first = worker_rx.recv().await.unwrap();
        match first {
            Item::Data(task) => {
                assert!(task.query.contains("token(id) >= 0 and token(id) < 10"));
                assert_eq!(task.kind, TaskKind::Select);
            }
            Item::EndOfStream => panic!("expected data before sentinel"),
        }
        assert!(worker_rx.recv().await.unwrap().is_sentinel());
        assert_eq!(stats.mapped.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn missing_assignment_times_out() {
        let (_assignment_tx, assignment_rx) = mpsc::channel::<MapperTask>(1);
        let (_split_tx, split_rx) = mpsc::channel(16);
        let (worker_tx, _worker_rx) = mpsc::channel(16);
        let stats = StatsCounters::new();
        let (_switch, observer) = KillSwitch::new();

        // Drop the assignment sender immediately so recv() resolves to
        // None right away rather than waiting the full timeout.
        drop(_assignment_tx);

        let result = run_mapper(assignment_rx, None, split_rx, worker_tx, stats, observer).await;
        assert!(matches!(result, Err(TriremeError::Timeout)));
    }
}
