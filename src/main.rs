//! Trireme CLI entry point: parses arguments, builds the immutable
//! runtime/connection settings, and dispatches to one action driver
//! (spec §6 "CLI surface", §4.5 "Action drivers").
//!
//! Mirrors the teacher's `src/main.rs` shape - initialize logging once,
//! build a config struct, hand it to the subsystem that does the real
//! work - scaled down to a single-shot CLI run instead of a long-lived
//! server.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trireme::actions::{count, delete, find_nulls, find_wide_partitions, print, update, ActionContext};
use trireme::cli::{Action, Cli};
use trireme::config::{ConnectionSettings, RuntimeSettings, TlsSettings};
use trireme::session::factory::CqlSessionFactory;
use trireme::token::{MAX_TOKEN, MIN_TOKEN};
use trireme::TriremeError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(TriremeError::ConfirmationDeclined) => {
            tracing::info!("aborted: confirmation declined");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "trireme exited with an error");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

async fn run(cli: Cli) -> trireme::Result<()> {
    let settings = Arc::new(build_runtime_settings(&cli));
    let conn = Arc::new(build_connection_settings(&cli)?);

    tracing::info!(
        action = ?cli.action,
        host = %conn.host,
        keyspace = %settings.keyspace,
        table = %settings.table,
        workers = settings.workers,
        predicted_splits = settings.predicted_split_count(),
        "starting run",
    );

    let ctx = ActionContext {
        settings,
        conn,
        factory: Arc::new(CqlSessionFactory),
    };

    match cli.action {
        Action::CountRows => {
            let total = count::run(&ctx).await?;
            println!("total rows: {}", total);
        }
        Action::PrintRows => {
            let printed = print::run(&ctx).await?;
            tracing::info!(printed, "done");
        }
        Action::DeleteRows => {
            let outcome = delete::run(&ctx).await?;
            if outcome.declined {
                return Err(TriremeError::ConfirmationDeclined);
            }
            println!(
                "matched {} rows, deleted {}",
                outcome.matched_rows, outcome.deletes_issued
            );
        }
        Action::UpdateRows => {
            let update_key = cli
                .update_key
                .as_deref()
                .ok_or_else(|| TriremeError::InvalidArgument("--update-key is required".into()))?;
            let update_value = cli
                .update_value
                .as_deref()
                .ok_or_else(|| TriremeError::InvalidArgument("--update-value is required".into()))?;
            let outcome = update::run(&ctx, update_key, update_value).await?;
            if outcome.declined {
                return Err(TriremeError::ConfirmationDeclined);
            }
            println!(
                "matched {} rows, updated {}",
                outcome.matched_rows, outcome.updates_issued
            );
        }
        Action::FindNulls => {
            let value_column = cli
                .value_column
                .as_deref()
                .ok_or_else(|| TriremeError::InvalidArgument("--value-column is required".into()))?;
            let matches = find_nulls::run(&ctx, value_column).await?;
            println!("{} rows with a null {}", matches.len(), value_column);
            for m in matches {
                println!("  {:?}", m.key_value);
            }
        }
        Action::FindWidePartitions => {
            let rounds = find_wide_partitions::run(&ctx).await?;
            for (i, round) in rounds.iter().enumerate() {
                println!(
                    "round {}: split={} hottest={} count={}",
                    i, round.exponent, round.range, round.count
                );
            }
        }
    }

    Ok(())
}

fn build_runtime_settings(cli: &Cli) -> RuntimeSettings {
    RuntimeSettings {
        keyspace: cli.keyspace.clone(),
        table: cli.table.clone(),
        key: cli.key.clone(),
        extra_key: cli.extra_key.clone(),
        filter_string: cli.filter_string.clone(),
        split_exponent: cli.split,
        min_token: cli.min_token.unwrap_or(MIN_TOKEN),
        max_token: cli.max_token.unwrap_or(MAX_TOKEN),
        workers: cli.workers,
        worker_max_startup_delay: None,
        capacities: Default::default(),
    }
}

fn build_connection_settings(cli: &Cli) -> trireme::Result<ConnectionSettings> {
    let tls = if cli.wants_tls() {
        Some(TlsSettings {
            ca_cert: cli.ssl_ca_cert.clone(),
            certificate: cli.ssl_certificate.clone(),
            key: cli.ssl_key.clone(),
            use_tls_v1: cli.ssl_use_tls_v1,
        })
    } else {
        None
    };

    Ok(ConnectionSettings {
        host: cli.host.clone(),
        port: cli.port,
        user: cli.user.clone(),
        password: cli.password.clone(),
        datacenter: cli.datacenter.clone(),
        tls,
    })
}
