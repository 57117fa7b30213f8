//! `print-rows` (spec §4.5): streams the row projection to stdout.

use crate::pipeline::{MapperTask, ParsedValue, ParserKind};
use crate::queues::Item;

use super::{shutdown_and_wait, ActionContext};

/// Prints every projected row (`{key: v}` or `{key: v, extraKey: v2}`)
/// until the sentinel, then shuts the pipeline down. Returns the number
/// of rows printed.
pub async fn run(ctx: &ActionContext) -> crate::Result<u64> {
    let task = MapperTask {
        query_template: format!(
            "select * from {}.{}",
            ctx.settings.keyspace, ctx.settings.table
        ),
        key: ctx.settings.key.clone(),
        extra_key: ctx.settings.extra_key.clone(),
        parser: ParserKind::RowProjection,
    };

    let mut handles = ctx.start(task).await?;

    let mut printed = 0u64;
    loop {
        match handles.results_rx.recv().await {
            Some(Item::Data(result)) => {
                if let ParsedValue::Row(columns) = result.value {
                    let rendered = columns
                        .iter()
                        .map(|(name, value)| format!("{}={:?}", name, value))
                        .collect::<Vec<_>>()
                        .join(", ");
                    println!("[{}] {}", result.split, rendered);
                    printed += 1;
                }
                handles.stats.results_consumed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            Some(Item::EndOfStream) | None => break,
        }
    }

    shutdown_and_wait(handles).await;
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionSettings, RuntimeSettings};
    use crate::session::testing::{ScriptedSession, ScriptedSessionFactory};
    use crate::session::ColumnValue;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn two_rows(k1: i64, k2: i64, e1: i64, e2: i64) -> Vec<crate::session::Row> {
        let row = |k: i64, e: i64| {
            let mut cols = BTreeMap::new();
            cols.insert("id".to_string(), ColumnValue::BigInt(k));
            cols.insert("extra".to_string(), ColumnValue::BigInt(e));
            crate::session::Row::new(cols)
        };
        vec![row(k1, e1), row(k2, e2)]
    }

    #[tokio::test]
    async fn prints_all_rows_across_splits() {
        let settings = Arc::new(RuntimeSettings {
            keyspace: "ks".into(),
            table: "tb".into(),
            key: "id".into(),
            extra_key: Some("extra".into()),
            min_token: 0,
            max_token: 50,
            split_exponent: 1,
            workers: 3,
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
            ScriptedSession::new().on(
                "select *",
                Box::new(|_q| Ok(two_rows(1, 2, 10, 20))),
            )
        }));

        let ctx = ActionContext {
            settings,
            conn,
            factory,
        };

        let printed = run(&ctx).await.unwrap();
        assert_eq!(printed, 5 * 2);
    }
}
