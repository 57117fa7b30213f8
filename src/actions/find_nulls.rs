//! `find-nulls` (spec §9 "supplemented features"): scans a table for
//! rows where a given column is null - something Cassandra itself
//! cannot filter for server-side, so it has to be done by scanning and
//! checking each row client-side. The original tool's equivalent
//! (`find_null_cells`) was left an unfinished stub; this finishes it.

use std::sync::Arc;

use crate::config::RuntimeSettings;
use crate::pipeline::{MapperTask, ParsedValue, ParserKind};
use crate::queues::Item;
use crate::session::ColumnValue;

use super::{shutdown_and_wait, ActionContext};

/// A row whose `value_column` was found to be null.
#[derive(Debug, Clone)]
pub struct NullMatch {
    pub key_value: ColumnValue,
}

/// Scans `select key, value_column from ks.tb` across every split and
/// returns the keys of rows where `value_column` is null.
pub async fn run(ctx: &ActionContext, value_column: &str) -> crate::Result<Vec<NullMatch>> {
    // `value_column` rides along as the row projection's "extra" column
    // so the existing projection parser picks it up alongside the key.
    let scoped_settings = Arc::new(RuntimeSettings {
        extra_key: Some(value_column.to_string()),
        ..(*ctx.settings).clone()
    });
    let scoped_ctx = ActionContext {
        settings: scoped_settings,
        conn: ctx.conn.clone(),
        factory: ctx.factory.clone(),
    };

    let task = MapperTask {
        query_template: format!(
            "select {}, {} from {}.{}",
            ctx.settings.key, value_column, ctx.settings.keyspace, ctx.settings.table
        ),
        key: ctx.settings.key.clone(),
        extra_key: Some(value_column.to_string()),
        parser: ParserKind::RowProjection,
    };

    let mut handles = scoped_ctx.start(task).await?;

    let mut matches = Vec::new();
    loop {
        match handles.results_rx.recv().await {
            Some(Item::Data(result)) => {
                handles
                    .stats
                    .results_consumed
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                if let ParsedValue::Row(columns) = result.value {
                    let is_null = columns
                        .get(value_column)
                        .map(ColumnValue::is_null)
                        .unwrap_or(false);
                    if is_null {
                        if let Some(key_value) = columns.get(&ctx.settings.key) {
                            matches.push(NullMatch {
                                key_value: key_value.clone(),
                            });
                        }
                    }
                }
            }
            Some(Item::EndOfStream) | None => break,
        }
    }

    shutdown_and_wait(handles).await;
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionSettings;
    use crate::session::testing::{ScriptedSession, ScriptedSessionFactory};
    use std::collections::BTreeMap;

    fn row(id: i64, email: Option<&str>) -> crate::session::Row {
        let mut cols = BTreeMap::new();
        cols.insert("id".to_string(), ColumnValue::BigInt(id));
        cols.insert(
            "email".to_string(),
            match email {
                Some(e) => ColumnValue::Text(e.to_string()),
                None => ColumnValue::Null,
            },
        );
        crate::session::Row::new(cols)
    }

    #[tokio::test]
    async fn reports_only_rows_with_null_value_column() {
        let settings = Arc::new(RuntimeSettings {
            keyspace: "ks".into(),
            table: "tb".into(),
            key: "id".into(),
            min_token: 0,
            max_token: 10,
            split_exponent: 1,
            workers: 1,
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
                "select id, email",
                Box::new(|_q| Ok(vec![row(1, Some("a@example.com")), row(2, None)])),
            )
        }));

        let ctx = ActionContext {
            settings,
            conn,
            factory,
        };

        let matches = run(&ctx, "email").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].key_value, ColumnValue::BigInt(2));
    }
}
