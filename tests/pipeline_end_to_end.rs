//! End-to-end scenarios from spec §8: driving a full pipeline run
//! through the public API against a scripted (non-network) session,
//! rather than unit-testing one stage in isolation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use trireme::actions::{count, ActionContext};
use trireme::config::{ConnectionSettings, RuntimeSettings};
use trireme::error::Result;
use trireme::pipeline::supervisor::run_pipeline;
use trireme::pipeline::{MapperTask, ParserKind};
use trireme::queues::Item;
use trireme::session::testing::{ScriptedSession, ScriptedSessionFactory};
use trireme::session::{ColumnValue, Row, Session, SessionFactory};

fn connection() -> ConnectionSettings {
    ConnectionSettings {
        host: "localhost".into(),
        port: 9042,
        user: "cassandra".into(),
        password: "cassandra".into(),
        datacenter: None,
        tls: None,
    }
}

fn count_row(n: i64) -> Row {
    let mut cols = BTreeMap::new();
    cols.insert("count".to_string(), ColumnValue::BigInt(n));
    Row::new(cols)
}

/// Scenario 5 (spec §8): killing a worker mid-run results in exactly one
/// replacement and the total completed worker-tasks is unchanged - here
/// exercised via a factory whose first connection attempt fails, which
/// the supervisor must paper over transparently.
#[tokio::test]
async fn worker_survives_a_connect_failure_and_total_is_unaffected() {
    let settings = Arc::new(RuntimeSettings {
        keyspace: "ks".into(),
        table: "tb".into(),
        key: "id".into(),
        min_token: 0,
        max_token: 1000,
        split_exponent: 2,
        workers: 3,
        ..RuntimeSettings::default()
    });
    let factory = Arc::new(
        ScriptedSessionFactory::new(|| {
            ScriptedSession::new().on("select count", Box::new(|_q| Ok(vec![count_row(1)])))
        })
        .fail_next_connects(1),
    );

    let ctx = ActionContext {
        settings: settings.clone(),
        conn: Arc::new(connection()),
        factory,
    };

    let total = tokio::time::timeout(Duration::from_secs(5), count::run(&ctx))
        .await
        .expect("run should finish well within the timeout")
        .unwrap();

    assert_eq!(total, settings.predicted_split_count() as i64);
}

/// A session whose `execute` sleeps before answering, so a pipeline can
/// be killed mid-flight (spec §8 scenario 6: "graceful SIGINT").
struct SlowCountSession {
    delay: Duration,
    executed: Arc<AtomicUsize>,
}

#[async_trait]
impl Session for SlowCountSession {
    async fn execute(&self, _query: &str) -> Result<Vec<Row>> {
        tokio::time::sleep(self.delay).await;
        self.executed.fetch_add(1, Ordering::Relaxed);
        Ok(vec![count_row(1)])
    }
}

struct SlowCountFactory {
    delay: Duration,
    executed: Arc<AtomicUsize>,
}

#[async_trait]
impl SessionFactory for SlowCountFactory {
    async fn connect(&self, _conn: &ConnectionSettings, _keyspace: &str) -> Result<Arc<dyn Session>> {
        Ok(Arc::new(SlowCountSession {
            delay: self.delay,
            executed: self.executed.clone(),
        }))
    }
}

/// Scenario 6 (spec §8): 1,000 splits, artificial per-query latency,
/// kill delivered partway through. Every stage must terminate within a
/// couple of seconds of the kill, and no result that was produced after
/// the consumer stopped draining `resultsQ` is left unaccounted for.
#[tokio::test]
async fn kill_mid_run_terminates_every_stage_promptly() {
    let executed = Arc::new(AtomicUsize::new(0));
    let settings = Arc::new(RuntimeSettings {
        keyspace: "ks".into(),
        table: "tb".into(),
        key: "id".into(),
        min_token: 0,
        max_token: 1_000_000,
        split_exponent: 3, // 1,000 splits of width 1,000
        workers: 4,
        ..RuntimeSettings::default()
    });
    let factory: Arc<dyn SessionFactory> = Arc::new(SlowCountFactory {
        delay: Duration::from_millis(50),
        executed: executed.clone(),
    });

    let mut handles = run_pipeline(settings.clone(), Arc::new(connection()), factory);
    handles
        .assignment_tx
        .send(MapperTask {
            query_template: "select count(*) from ks.tb".into(),
            key: "id".into(),
            extra_key: None,
            parser: ParserKind::Count,
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    handles.kill.kill();

    tokio::time::timeout(Duration::from_secs(2), handles.join_handle)
        .await
        .expect("supervisor should tear down within 2s of kill")
        .unwrap();

    // Drain whatever made it onto resultsQ before shutdown - this must
    // terminate (channel closed or sentinel) rather than hang, since no
    // producer is left running after the supervisor has joined.
    let mut drained = 0usize;
    while let Ok(Some(item)) =
        tokio::time::timeout(Duration::from_millis(50), handles.results_rx.recv()).await
    {
        if item.is_sentinel() {
            break;
        }
        drained += 1;
    }
    // Loose sanity bound: we cannot have drained more results than
    // queries actually executed before the kill took effect.
    assert!(drained <= executed.load(Ordering::Relaxed) + settings.workers);
}

/// Scenario 3 (spec §8): print-rows with a projection across several
/// splits, all rows observed regardless of arrival order.
#[tokio::test]
async fn print_rows_projects_key_and_extra_key_across_splits() {
    let settings = Arc::new(RuntimeSettings {
        keyspace: "ks".into(),
        table: "tb".into(),
        key: "id".into(),
        extra_key: Some("shard".into()),
        min_token: 0,
        max_token: 50,
        split_exponent: 1,
        workers: 2,
        ..RuntimeSettings::default()
    });
    let factory = Arc::new(ScriptedSessionFactory::new(|| {
        ScriptedSession::new().on(
            "select *",
            Box::new(|_q| {
                let mut row = |k: i64, s: i64| {
                    let mut cols = BTreeMap::new();
                    cols.insert("id".to_string(), ColumnValue::BigInt(k));
                    cols.insert("shard".to_string(), ColumnValue::BigInt(s));
                    Row::new(cols)
                };
                Ok(vec![row(1, 10), row(2, 20)])
            }),
        )
    }));

    let ctx = ActionContext {
        settings,
        conn: Arc::new(connection()),
        factory,
    };

    let printed = trireme::actions::print::run(&ctx).await.unwrap();
    assert_eq!(printed, 5 * 2);
}
