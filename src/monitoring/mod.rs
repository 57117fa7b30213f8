//! Background observers that periodically report on a running pipeline
//! (spec §4.6 "stats monitor", §4.7 "queue monitor") without participating
//! in the data path itself.

pub mod queue_monitor;
pub mod stats_monitor;

pub use queue_monitor::run_queue_monitor;
pub use stats_monitor::run_stats_monitor;
