//! `count-rows` (spec §4.5): sums `count(*)` across every split.

use crate::pipeline::{MapperTask, ParsedValue, ParserKind};
use crate::queues::Item;

use super::{shutdown_and_wait, ActionContext};

/// Runs the count across the whole configured token range and returns
/// the total. Concurrent writes can shift the true count mid-scan (spec
/// §1 non-goal "does not guarantee exact row counts under concurrent
/// writes"); this returns whatever the scan observed.
pub async fn run(ctx: &ActionContext) -> crate::Result<i64> {
    let task = MapperTask {
        query_template: format!(
            "select count(*) from {}.{}",
            ctx.settings.keyspace, ctx.settings.table
        ),
        key: ctx.settings.key.clone(),
        extra_key: ctx.settings.extra_key.clone(),
        parser: ParserKind::Count,
    };

    let mut handles = ctx.start(task).await?;

    let mut total: i64 = 0;
    loop {
        match handles.results_rx.recv().await {
            Some(Item::Data(result)) => {
                if let ParsedValue::Count(n) = result.value {
                    total += n;
                }
                handles.stats.results_consumed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            Some(Item::EndOfStream) | None => break,
        }
    }

    shutdown_and_wait(handles).await;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionSettings, RuntimeSettings};
    use crate::session::testing::{ScriptedSession, ScriptedSessionFactory};
    use crate::session::ColumnValue;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn count_row(n: i64) -> crate::session::Row {
        let mut cols = BTreeMap::new();
        cols.insert("count".to_string(), ColumnValue::BigInt(n));
        crate::session::Row::new(cols)
    }

    #[tokio::test]
    async fn sums_count_across_splits() {
        let settings = Arc::new(RuntimeSettings {
            keyspace: "ks".into(),
            table: "tb".into(),
            key: "id".into(),
            min_token: 0,
            max_token: 100,
            split_exponent: 1,
            workers: 2,
            ..RuntimeSettings::default()
        });
        let conn = Arc::new(ConnectionSettings {
            host: "localhost".into(),
            port: 9042,
            user: "cassandra".into(),
            password: "cassandra".into(),
            datacenter: None,
            tls: None,
        });
        let factory = Arc::new(ScriptedSessionFactory::new(|| {
            ScriptedSession::new().on("select count", Box::new(|_q| Ok(vec![count_row(3)])))
        }));

        let ctx = ActionContext {
            settings,
            conn,
            factory,
        };

        let total = run(&ctx).await.unwrap();
        assert_eq!(total, 3 * 10);
    }

    #[tokio::test]
    async fn empty_table_counts_zero() {
        let settings = Arc::new(RuntimeSettings {
            keyspace: "ks".into(),
            table: "tb".into(),
            key: "id".into(),
            min_token: 0,
            max_token: 100,
            split_exponent: 1,
            workers: 2,
            ..RuntimeSettings::default()
        });
        let conn = Arc::new(ConnectionSettings {
            host: "localhost".into(),
            port: 9042,
            user: "cassandra".into(),
            password: "cassandra".into(),
            datacenter: None,
            tls: None,
        });
        let factory = Arc::new(ScriptedSessionFactory::new(|| {
            ScriptedSession::new().on("select count", Box::new(|_q| Ok(vec![count_row(0)])))
        }));

        let ctx = ActionContext {
            settings,
            conn,
            factory,
        };

        assert_eq!(run(&ctx).await.unwrap(), 0);
    }
}
