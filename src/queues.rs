//! Bounded channels, sentinels, and stats counters (spec §3, §5, §9).
//!
//! Every inter-stage channel carries `Item<T>`, a tagged variant rather
//! than the original's type-abused boolean sentinel (spec §9 design
//! note: "represent task/result element as a tagged variant `Item |
//! EndOfStream`"). Stats are modeled as plain atomic counters - spec §9
//! explicitly allows this as "an equivalent and simpler substitute" for
//! the original's stats-queues-as-counters trick, and it is the more
//! idiomatic Rust rendering.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An element flowing through a pipeline channel: either real data, or
/// the one-shot end-of-stream marker (spec invariant 2: a sentinel is
/// re-emitted exactly once on each downstream channel before a stage
/// exits).
#[derive(Debug, Clone)]
pub enum Item<T> {
    Data(T),
    EndOfStream,
}

impl<T> Item<T> {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Item::EndOfStream)
    }
}

/// Bounded channel capacities, configurable but defaulted to values the
/// original project shipped with (`trireme/datastructures.py`'s
/// `settings.*_q_size` imports).
#[derive(Debug, Clone, Copy)]
pub struct ChannelCapacities {
    pub split_q: usize,
    pub worker_q: usize,
    pub mapper_q: usize,
    pub results_q: usize,
}

impl Default for ChannelCapacities {
    fn default() -> Self {
        Self {
            split_q: 1000,
            worker_q: 500,
            mapper_q: 1,
            results_q: 1000,
        }
    }
}

/// Event counters for the stats monitor (spec §4.6) and the queue
/// monitor's diagnostics (spec §4.7). Each field corresponds to one of
/// the original's `stats_queue_*` counters.
#[derive(Debug, Default)]
pub struct StatsCounters {
    pub splits: AtomicU64,
    pub mapped: AtomicU64,
    pub results: AtomicU64,
    pub results_consumed: AtomicU64,
    pub deleted: AtomicU64,
    pub delete_scheduled: AtomicU64,
    /// Select tasks that have finished executing (successfully or not),
    /// regardless of how many rows they produced. The worker that
    /// dequeues `workerQ`'s sentinel waits for this to catch up with
    /// `mapped` before forwarding `resultsQ`'s own sentinel, so a
    /// sibling's still-in-flight row can never arrive after it.
    pub selects_completed: AtomicU64,
}

/// A point-in-time reading of every counter, used by the stats monitor
/// to compute deltas between ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsSnapshot {
    pub splits: u64,
    pub mapped: u64,
    pub results: u64,
    pub results_consumed: u64,
    pub deleted: u64,
    pub delete_scheduled: u64,
    pub selects_completed: u64,
}

impl StatsCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            splits: self.splits.load(Ordering::Relaxed),
            mapped: self.mapped.load(Ordering::Relaxed),
            results: self.results.load(Ordering::Relaxed),
            results_consumed: self.results_consumed.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            delete_scheduled: self.delete_scheduled.load(Ordering::Relaxed),
            selects_completed: self.selects_completed.load(Ordering::Relaxed),
        }
    }
}
