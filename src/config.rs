//! Immutable runtime configuration threaded by reference through every
//! pipeline stage (spec §3 "Runtime settings"), mirroring the teacher's
//! single `Config`/`DatabaseConfig` struct built once in `main` and
//! passed down to subsystems.

use std::path::PathBuf;

use crate::queues::ChannelCapacities;
use crate::token::{MAX_TOKEN, MIN_TOKEN};

/// Everything an action driver and the pipeline it starts need to know
/// about *what* to scan - independent of *how* to connect.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub keyspace: String,
    pub table: String,
    pub key: String,
    pub extra_key: Option<String>,
    pub filter_string: Option<String>,
    pub split_exponent: u32,
    pub min_token: i64,
    pub max_token: i64,
    pub workers: usize,
    /// Upper bound, in seconds, for a worker's random startup jitter.
    /// `None` means "use the default of `workers * 2`" (spec §4.3).
    pub worker_max_startup_delay: Option<u64>,
    pub capacities: ChannelCapacities,
}

impl RuntimeSettings {
    pub fn predicted_split_count(&self) -> u64 {
        crate::token::SplitGenerator::predicted_count(
            self.min_token,
            self.max_token,
            self.split_exponent,
        )
    }

    /// Startup jitter bound in seconds (spec §4.3): only meaningful when
    /// more than 10 workers are in play, defaulting to `workers * 2`.
    pub fn startup_jitter_bound(&self) -> u64 {
        if self.workers <= 10 {
            return 0;
        }
        self.worker_max_startup_delay
            .unwrap_or(self.workers as u64 * 2)
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            keyspace: String::new(),
            table: String::new(),
            key: String::new(),
            extra_key: None,
            filter_string: None,
            split_exponent: 18,
            min_token: MIN_TOKEN,
            max_token: MAX_TOKEN,
            workers: 1,
            worker_max_startup_delay: None,
            capacities: ChannelCapacities::default(),
        }
    }
}

/// TLS material for an optionally-encrypted, optionally-mTLS connection
/// (spec §6 collaborator interface).
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    pub ca_cert: Option<PathBuf>,
    pub certificate: Option<PathBuf>,
    pub key: Option<PathBuf>,
    /// `true` selects TLS 1.0 (`--ssl-use-tls-v1`); otherwise TLS 1.2.
    pub use_tls_v1: bool,
}

/// Everything needed to open a session against the target cluster.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Comma-separated list of hosts, or a single host (spec §4.3 step 2).
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub datacenter: Option<String>,
    pub tls: Option<TlsSettings>,
}

impl ConnectionSettings {
    /// Returns a copy pinned to one concrete host, used once a worker has
    /// resolved its host via [`crate::pipeline::worker::pick_host`].
    pub fn with_host(&self, host: String) -> Self {
        Self {
            host,
            ..self.clone()
        }
    }
}
