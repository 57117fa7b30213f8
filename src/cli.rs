//! Command-line surface (spec §6): one positional subcommand plus
//! `host keyspace table key`, and the flags that configure a run.
//!
//! Grounded in `clap`'s derive API, the way the wider example pack's CLI
//! tools parse subcommand + flags into a typed struct - the teacher's
//! own binaries (`src/main.rs`, this file's previous contents) take no
//! arguments at all, so this is generalized from the pack rather than
//! the teacher.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parallel token-range scanner and mutator for Cassandra-compatible
/// wide-column stores.
#[derive(Debug, Parser)]
#[command(name = "trireme", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub action: Action,

    /// Cassandra host, or a comma-separated list to pick from at random
    /// per worker.
    pub host: String,
    /// Keyspace to scan.
    pub keyspace: String,
    /// Table to scan.
    pub table: String,
    /// Primary key column used in the `token(...)` predicate.
    pub key: String,

    /// Extra key, for compound partition keys.
    #[arg(long = "extra-key")]
    pub extra_key: Option<String>,
    /// Column to set, for `update-rows`.
    #[arg(long = "update-key")]
    pub update_key: Option<String>,
    /// Value to set `update-key` to, for `update-rows`.
    #[arg(long = "update-value")]
    pub update_value: Option<String>,
    /// Column to check for null, for `find-nulls`.
    #[arg(long = "value-column")]
    pub value_column: Option<String>,
    /// Additional CQL filter ANDed onto the token predicate.
    #[arg(long = "filter-string")]
    pub filter_string: Option<String>,

    /// Split exponent: each split is `10^split` tokens wide.
    #[arg(long, default_value_t = 18)]
    pub split: u32,
    /// Number of worker connections.
    #[arg(long, default_value_t = 1)]
    pub workers: usize,
    /// Lower bound of the token range to scan.
    #[arg(long = "min-token")]
    pub min_token: Option<i64>,
    /// Upper bound of the token range to scan.
    #[arg(long = "max-token")]
    pub max_token: Option<i64>,

    /// Cassandra port.
    #[arg(long, default_value_t = 9042)]
    pub port: u16,
    /// Cassandra username.
    #[arg(long, default_value = "cassandra")]
    pub user: String,
    /// Cassandra password.
    #[arg(long, default_value = "cassandra")]
    pub password: String,
    /// Datacenter to pin load balancing to.
    #[arg(long)]
    pub datacenter: Option<String>,

    /// CA certificate used to validate the server's certificate.
    #[arg(long = "ssl-ca-cert")]
    pub ssl_ca_cert: Option<PathBuf>,
    /// Client certificate, for mTLS.
    #[arg(long = "ssl-certificate")]
    pub ssl_certificate: Option<PathBuf>,
    /// Client private key, for mTLS.
    #[arg(long = "ssl-key")]
    pub ssl_key: Option<PathBuf>,
    /// Negotiate TLS 1.0 instead of TLS 1.2.
    #[arg(long = "ssl-use-tls-v1")]
    pub ssl_use_tls_v1: bool,

    /// Enable DEBUG-level logging.
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Action {
    /// Count every row in the table.
    #[command(name = "count-rows")]
    CountRows,
    /// Print every row in the table.
    #[command(name = "print-rows")]
    PrintRows,
    /// Set one column to a fixed value on every matched row.
    #[command(name = "update-rows")]
    UpdateRows,
    /// Delete every matched row, after confirmation.
    #[command(name = "delete-rows")]
    DeleteRows,
    /// Find rows where `--value-column` is null.
    #[command(name = "find-nulls")]
    FindNulls,
    /// Narrow toward the widest partition via repeated count passes.
    #[command(name = "find-wide-partitions")]
    FindWidePartitions,
}

impl Cli {
    /// Whether TLS material was supplied at all, i.e. the connection
    /// should be wrapped in TLS (spec §6: "transport is optionally TLS").
    pub fn wants_tls(&self) -> bool {
        self.ssl_ca_cert.is_some()
            || self.ssl_certificate.is_some()
            || self.ssl_key.is_some()
            || self.ssl_use_tls_v1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_count_invocation() {
        let cli = Cli::parse_from([
            "trireme",
            "count-rows",
            "cass1.example.com",
            "ks",
            "tb",
            "id",
        ]);
        assert!(matches!(cli.action, Action::CountRows));
        assert_eq!(cli.split, 18);
        assert_eq!(cli.workers, 1);
        assert_eq!(cli.port, 9042);
        assert_eq!(cli.user, "cassandra");
        assert!(!cli.wants_tls());
    }

    #[test]
    fn parses_delete_with_extra_key_and_filter() {
        let cli = Cli::parse_from([
            "trireme",
            "delete-rows",
            "cass1,cass2",
            "ks",
            "tb",
            "id",
            "--extra-key",
            "ts",
            "--filter-string",
            "status = 'stale'",
            "--workers",
            "16",
        ]);
        assert!(matches!(cli.action, Action::DeleteRows));
        assert_eq!(cli.extra_key.as_deref(), Some("ts"));
        assert_eq!(cli.filter_string.as_deref(), Some("status = 'stale'"));
        assert_eq!(cli.workers, 16);
    }

    #[test]
    fn ssl_flags_enable_tls() {
        let cli = Cli::parse_from([
            "trireme",
            "count-rows",
            "host",
            "ks",
            "tb",
            "id",
            "--ssl-use-tls-v1",
        ]);
        assert!(cli.wants_tls());
    }
}
