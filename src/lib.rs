// Trireme - parallel token-range scanner and mutator for Cassandra-compatible
// wide-column stores.
//
// The pipeline (splitter -> mapper -> worker pool -> action driver) lives in
// `pipeline` and `actions`; `session` is the collaborator interface to the
// target database; everything else is the ambient stack that plumbs it
// together (config, CLI, logging, stats).

pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod kill;
pub mod monitoring;
pub mod pipeline;
pub mod queues;
pub mod session;
pub mod token;
pub mod util;

pub use error::{Result, TriremeError};

/// Crate version, surfaced in the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
