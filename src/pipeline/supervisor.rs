//! The supervisor (spec §4.4): starts the monitors, the splitter, the
//! mapper, and the worker pool, then keeps the pool at full strength by
//! replacing every worker that exits - for any reason short of `kill`
//! already being set - until `kill` fires. Spec §4.4's "remove it and
//! spawn a replacement" makes no exception for a worker that exits after
//! cleanly forwarding the select-phase sentinel: replacing it too is
//! what leaves `workerQ` a live consumer for any mutation task a
//! delete-rows/update-rows driver enqueues afterward (spec §4.5).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::config::{ConnectionSettings, RuntimeSettings};
use crate::kill::{KillObserver, KillSwitch};
use crate::monitoring::{run_queue_monitor, run_stats_monitor};
use crate::monitoring::queue_monitor::DepthProbe;
use crate::pipeline::mapper::run_mapper;
use crate::pipeline::splitter::run_splitter;
use crate::pipeline::worker::{run_worker, WorkerExit};
use crate::pipeline::{MapperTask, PipelineResult, WorkerTask};
use crate::queues::{Item, StatsCounters};
use crate::session::SessionFactory;

/// Everything an action driver needs to drive and consume a running
/// pipeline: the one-shot mapper assignment, the results stream, a
/// handle to feed mutation tasks back onto `workerQ`, the kill switch,
/// and the shared stats counters.
pub struct PipelineHandles {
    pub assignment_tx: mpsc::Sender<MapperTask>,
    pub results_rx: mpsc::Receiver<Item<PipelineResult>>,
    pub worker_tx: mpsc::Sender<Item<WorkerTask>>,
    pub kill: KillSwitch,
    pub stats: Arc<StatsCounters>,
    pub join_handle: tokio::task::JoinHandle<()>,
}

/// Wires up and starts every stage, returning immediately with handles
/// the caller (an action driver) uses to drive and consume the run.
pub fn run_pipeline(
    settings: Arc<RuntimeSettings>,
    conn: Arc<ConnectionSettings>,
    factory: Arc<dyn SessionFactory>,
) -> PipelineHandles {
    let (kill, supervisor_kill_observer) = KillSwitch::new();
    let stats = StatsCounters::new();

    let (assignment_tx, assignment_rx) = mpsc::channel::<MapperTask>(settings.capacities.mapper_q);
    let (split_tx, split_rx) = mpsc::channel(settings.capacities.split_q);
    let (worker_tx, worker_rx) = mpsc::channel(settings.capacities.worker_q);
    let (results_tx, results_rx) = mpsc::channel(settings.capacities.results_q);
    let worker_rx = Arc::new(Mutex::new(worker_rx));

    spawn_monitors(
        settings.predicted_split_count(),
        &stats,
        &split_tx,
        &worker_tx,
        &results_tx,
        &kill,
    );

    let settings_for_splitter = settings.clone();
    let stats_for_splitter = stats.clone();
    let kill_observer_for_splitter = kill.observer();

    tokio::spawn(async move {
        if let Err(e) = run_splitter(
            settings_for_splitter.min_token,
            settings_for_splitter.max_token,
            settings_for_splitter.split_exponent,
            split_tx,
            stats_for_splitter,
            kill_observer_for_splitter,
        )
        .await
        {
            tracing::error!(error = %e, "splitter exited with an error");
        }
    });

    let filter_string_for_mapper = settings.filter_string.clone();
    let worker_tx_for_mapper = worker_tx.clone();
    let stats_for_mapper = stats.clone();
    let kill_observer_for_mapper = kill.observer();

    tokio::spawn(async move {
        if let Err(e) = run_mapper(
            assignment_rx,
            filter_string_for_mapper,
            split_rx,
            worker_tx_for_mapper,
            stats_for_mapper,
            kill_observer_for_mapper,
        )
        .await
        {
            tracing::error!(error = %e, "mapper exited with an error");
        }
    });

    let join_handle = tokio::spawn(supervise_workers(
        settings.clone(),
        conn,
        factory,
        worker_rx,
        results_tx,
        stats.clone(),
        kill.clone(),
        supervisor_kill_observer,
    ));

    PipelineHandles {
        assignment_tx,
        results_rx,
        worker_tx,
        kill,
        stats,
        join_handle,
    }
}

fn spawn_monitors(
    predicted_splits: u64,
    stats: &Arc<StatsCounters>,
    split_tx: &mpsc::Sender<Item<crate::token::TokenRange>>,
    worker_tx: &mpsc::Sender<Item<WorkerTask>>,
    results_tx: &mpsc::Sender<Item<PipelineResult>>,
    kill: &KillSwitch,
) {
    tokio::spawn(run_stats_monitor(
        stats.clone(),
        predicted_splits,
        kill.observer(),
    ));

    let probes: Vec<(&'static str, Arc<dyn DepthProbe>)> = vec![
        ("splitQ", Arc::new(split_tx.clone())),
        ("workerQ", Arc::new(worker_tx.clone())),
        ("resultsQ", Arc::new(results_tx.clone())),
    ];
    tokio::spawn(run_queue_monitor(probes, Duration::from_secs(5), kill.observer()));
}

async fn supervise_workers(
    settings: Arc<RuntimeSettings>,
    conn: Arc<ConnectionSettings>,
    factory: Arc<dyn SessionFactory>,
    worker_rx: Arc<Mutex<mpsc::Receiver<Item<WorkerTask>>>>,
    results_tx: mpsc::Sender<Item<PipelineResult>>,
    stats: Arc<StatsCounters>,
    kill: KillSwitch,
    mut kill_observer: KillObserver,
) {
    let mut workers: JoinSet<WorkerExit> = JoinSet::new();
    for _ in 0..settings.workers {
        spawn_one_worker(
            &mut workers,
            settings.clone(),
            conn.clone(),
            factory.clone(),
            worker_rx.clone(),
            results_tx.clone(),
            stats.clone(),
            kill.observer(),
        );
    }

    loop {
        tokio::select! {
            _ = kill_observer.wait() => break,
            joined = workers.join_next() => {
                match joined {
                    // Every exit is replaced immediately below, so the set
                    // only empties out here if it started at zero workers.
                    None => break,
                    Some(Err(_panic)) => {
                        tracing::warn!("worker task panicked, spawning replacement");
                        spawn_one_worker(
                            &mut workers, settings.clone(), conn.clone(), factory.clone(),
                            worker_rx.clone(), results_tx.clone(), stats.clone(), kill.observer(),
                        );
                    }
                    // A `Killed` exit means `kill` is already set - the
                    // `kill_observer.wait()` arm above is about to win this
                    // same select, so spawning a replacement here would
                    // just spawn a worker that immediately re-exits Killed
                    // and keeps this branch busy instead of letting the
                    // loop break.
                    Some(Ok(WorkerExit::Killed)) => {}
                    Some(Ok(exit)) => {
                        tracing::debug!(?exit, "worker exited, spawning replacement");
                        spawn_one_worker(
                            &mut workers, settings.clone(), conn.clone(), factory.clone(),
                            worker_rx.clone(), results_tx.clone(), stats.clone(), kill.observer(),
                        );
                    }
                }
            }
        }
    }

    // Drain remaining workers so their sessions close promptly rather
    // than being dropped mid-query.
    while workers.join_next().await.is_some() {}
}

#[allow(clippy::too_many_arguments)]
fn spawn_one_worker(
    workers: &mut JoinSet<WorkerExit>,
    settings: Arc<RuntimeSettings>,
    conn: Arc<ConnectionSettings>,
    factory: Arc<dyn SessionFactory>,
    worker_rx: Arc<Mutex<mpsc::Receiver<Item<WorkerTask>>>>,
    results_tx: mpsc::Sender<Item<PipelineResult>>,
    stats: Arc<StatsCounters>,
    kill_observer: KillObserver,
) {
    workers.spawn(run_worker(
        settings,
        conn,
        factory,
        worker_rx,
        results_tx,
        stats,
        kill_observer,
    ));
}
