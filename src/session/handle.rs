//! One live MySQL session per browser session, and the fixed operation set
//! the console drives against it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::query::{
    StatementClassifier, contains_pattern, parse_use, quote_identifier, quote_literal,
    quote_qualified, quote_string, split_statements,
};
use crate::query::{QueryOutcome, StatementRowset};
use crate::session::ConnectionParams;
use crate::session::backend::{ExecSummary, RawRowset, SqlConnector, SqlSession};
use crate::{MyBridgeError, Result};

/// Handle lifecycle. `Disconnected` is terminal; handles are discarded, not
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unconnected,
    Connecting,
    Connected,
    Disconnected,
}

/// One column of a `DESCRIBE` result, normalized for the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    pub key_role: String,
    pub default: Value,
    pub extra: String,
}

/// Pagination, sorting and filtering for `fetch_rows`.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub page_size: u64,
    pub offset: u64,
    pub sort_column: Option<String>,
    pub sort_direction: Option<String>,
    pub filter_column: Option<String>,
    pub filter_value: Option<String>,
}

/// One page of rows plus the filtered total.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPage {
    pub rows: Vec<Map<String, Value>>,
    pub total_matching: u64,
}

struct HandleInner {
    state: Lifecycle,
    session: Option<Box<dyn SqlSession>>,
}

impl HandleInner {
    fn session_mut(&mut self) -> Result<&mut Box<dyn SqlSession>> {
        match self.state {
            Lifecycle::Connected => self.session.as_mut().ok_or(MyBridgeError::NotConnected),
            _ => Err(MyBridgeError::NotConnected),
        }
    }
}

/// Owns exactly one underlying database session.
///
/// Operations hold the inner lock across their database round trip, so a
/// handle is never re-entered while an operation is in flight.
pub struct ConnectionHandle {
    params: ConnectionParams,
    connector: Arc<dyn SqlConnector>,
    inner: Mutex<HandleInner>,
}

impl ConnectionHandle {
    pub fn new(params: ConnectionParams, connector: Arc<dyn SqlConnector>) -> Self {
        Self {
            params,
            connector,
            inner: Mutex::new(HandleInner {
                state: Lifecycle::Unconnected,
                session: None,
            }),
        }
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        self.inner.lock().await.state
    }

    /// Open the underlying session. On failure no resource is retained and
    /// the handle returns to `Unconnected`.
    pub async fn connect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            Lifecycle::Unconnected => {}
            Lifecycle::Connecting | Lifecycle::Connected => {
                return Err(MyBridgeError::Protocol(
                    "connection already established".to_string(),
                ));
            }
            Lifecycle::Disconnected => {
                return Err(MyBridgeError::Protocol(
                    "handle is closed and cannot be reused".to_string(),
                ));
            }
        }
        inner.state = Lifecycle::Connecting;
        match self.connector.open(&self.params, None).await {
            Ok(session) => {
                inner.session = Some(session);
                inner.state = Lifecycle::Connected;
                debug!(host = %self.params.host, "database session established");
                Ok(())
            }
            Err(e) => {
                inner.session = None;
                inner.state = Lifecycle::Unconnected;
                Err(MyBridgeError::Connection(e.to_string()))
            }
        }
    }

    /// Idempotent: releases the session if one is held, then stays terminal.
    pub async fn disconnect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.state = Lifecycle::Disconnected;
        if let Some(session) = inner.session.take() {
            session
                .close()
                .await
                .map_err(|e| MyBridgeError::operation("Failed to disconnect", e))?;
        }
        Ok(())
    }

    pub async fn list_databases(&self) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().await;
        let rowset = inner
            .session_mut()?
            .query("SHOW DATABASES")
            .await
            .map_err(|e| MyBridgeError::operation("Failed to get databases", e))?;
        Ok(first_column(rowset))
    }

    pub async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let sql = format!("SHOW TABLES FROM {}", quote_identifier(database));
        let mut inner = self.inner.lock().await;
        let rowset = inner
            .session_mut()?
            .query(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to get tables", e))?;
        Ok(first_column(rowset))
    }

    pub async fn describe_table(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>> {
        let sql = format!("DESCRIBE {}", quote_qualified(database, table));
        let mut inner = self.inner.lock().await;
        let rowset = inner
            .session_mut()?
            .query(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to get table structure", e))?;
        Ok(rowset
            .into_objects()
            .into_iter()
            .map(|row| ColumnDescriptor {
                name: text_field(&row, "Field"),
                column_type: text_field(&row, "Type"),
                nullable: text_field(&row, "Null").eq_ignore_ascii_case("YES"),
                key_role: key_role(&text_field(&row, "Key")),
                default: row.get("Default").cloned().unwrap_or(Value::Null),
                extra: text_field(&row, "Extra"),
            })
            .collect())
    }

    pub async fn list_indexes(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Vec<Map<String, Value>>> {
        let sql = format!("SHOW INDEX FROM {}", quote_qualified(database, table));
        let mut inner = self.inner.lock().await;
        let rowset = inner
            .session_mut()?
            .query(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to get table indexes", e))?;
        Ok(rowset.into_objects())
    }

    pub async fn list_constraints(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Vec<Map<String, Value>>> {
        let sql = format!(
            "SELECT kcu.CONSTRAINT_NAME, tc.CONSTRAINT_TYPE, kcu.COLUMN_NAME, \
             kcu.REFERENCED_TABLE_NAME, kcu.REFERENCED_COLUMN_NAME \
             FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
             JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
             ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME AND kcu.TABLE_SCHEMA = tc.TABLE_SCHEMA \
             WHERE kcu.TABLE_SCHEMA = {} AND kcu.TABLE_NAME = {} \
             ORDER BY kcu.ORDINAL_POSITION",
            quote_string(database),
            quote_string(table)
        );
        let mut inner = self.inner.lock().await;
        let rowset = inner
            .session_mut()?
            .query(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to get table constraints", e))?;
        Ok(rowset.into_objects())
    }

    /// Paginated, optionally sorted and filtered rows plus the total row
    /// count under the same filter.
    pub async fn fetch_rows(
        &self,
        database: &str,
        table: &str,
        page: &PageRequest,
    ) -> Result<RowPage> {
        let target = quote_qualified(database, table);

        let where_clause = match (&page.filter_column, &page.filter_value) {
            (Some(column), Some(value)) if !value.is_empty() => format!(
                " WHERE {} LIKE {}",
                quote_identifier(column),
                quote_string(&contains_pattern(value))
            ),
            _ => String::new(),
        };

        let order_clause = match &page.sort_column {
            Some(column) if !column.is_empty() => format!(
                " ORDER BY {} {}",
                quote_identifier(column),
                normalize_direction(page.sort_direction.as_deref())
            ),
            _ => String::new(),
        };

        let count_sql = format!("SELECT COUNT(*) AS total FROM {target}{where_clause}");
        let data_sql = format!(
            "SELECT * FROM {target}{where_clause}{order_clause} LIMIT {} OFFSET {}",
            page.page_size, page.offset
        );

        let mut inner = self.inner.lock().await;
        let session = inner.session_mut()?;
        let count = session
            .query(&count_sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to get table data", e))?;
        let total_matching = count.scalar().map(value_as_u64).unwrap_or(0);
        let rowset = session
            .query(&data_sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to get table data", e))?;
        Ok(RowPage {
            rows: rowset.into_objects(),
            total_matching,
        })
    }

    /// Execute free-form query text: one or more `;`-separated statements,
    /// strictly in source order, on one (optionally database-scoped) session.
    /// `USE <db>` switches the context for the remainder of the batch.
    pub async fn run_statement(
        &self,
        database: Option<&str>,
        text: &str,
    ) -> Result<QueryOutcome> {
        let statements = split_statements(text);
        if statements.is_empty() {
            return Err(MyBridgeError::Validation("Query text is empty".to_string()));
        }

        let mut inner = self.inner.lock().await;
        // Connection check first: no session may be opened for a dead handle
        inner.session_mut()?;

        let mut scoped: Option<Box<dyn SqlSession>> = match database {
            Some(db) => Some(
                self.connector
                    .open(&self.params, Some(db))
                    .await
                    .map_err(|e| MyBridgeError::operation("Query execution failed", e))?,
            ),
            None => None,
        };

        let result = Self::execute_batch(
            &self.connector,
            &self.params,
            &mut inner,
            &mut scoped,
            &statements,
        )
        .await;

        if let Some(session) = scoped.take() {
            if let Err(e) = session.close().await {
                warn!("failed to close scoped session: {e}");
            }
        }
        result
    }

    async fn execute_batch(
        connector: &Arc<dyn SqlConnector>,
        params: &ConnectionParams,
        inner: &mut HandleInner,
        scoped: &mut Option<Box<dyn SqlSession>>,
        statements: &[String],
    ) -> Result<QueryOutcome> {
        let mut rowsets: Vec<StatementRowset> = Vec::new();
        let mut affected_rows: u64 = 0;
        let mut insert_id: Option<u64> = None;
        let mut write_count = 0usize;
        let mut switched: Option<String> = None;

        for (idx, statement) in statements.iter().enumerate() {
            let position = idx + 1;

            if let Some(db) = parse_use(statement) {
                let replacement =
                    connector
                        .open(params, Some(&db))
                        .await
                        .map_err(|e| MyBridgeError::Statement {
                            statement: statement.clone(),
                            position,
                            message: format!("Cannot use database '{db}': {e}"),
                        })?;
                if let Some(old) = scoped.replace(replacement) {
                    if let Err(e) = old.close().await {
                        warn!("failed to close scoped session: {e}");
                    }
                }
                switched = Some(db);
                continue;
            }

            let session: &mut dyn SqlSession = match scoped.as_mut() {
                Some(s) => s.as_mut(),
                None => inner.session_mut()?.as_mut(),
            };

            if StatementClassifier::is_read(statement) {
                let rowset =
                    session
                        .query(statement)
                        .await
                        .map_err(|e| MyBridgeError::Statement {
                            statement: statement.clone(),
                            position,
                            message: e.to_string(),
                        })?;
                let row_count = rowset.rows.len();
                let columns = rowset.columns.clone();
                rowsets.push(StatementRowset {
                    statement: statement.clone(),
                    columns,
                    data: rowset.into_objects(),
                    row_count,
                });
            } else {
                let summary =
                    session
                        .execute(statement)
                        .await
                        .map_err(|e| MyBridgeError::Statement {
                            statement: statement.clone(),
                            position,
                            message: e.to_string(),
                        })?;
                affected_rows += summary.affected_rows;
                if summary.last_insert_id.is_some() {
                    insert_id = summary.last_insert_id;
                }
                write_count += 1;
            }
        }

        if !rowsets.is_empty() {
            if statements.len() == 1 {
                let only = rowsets.remove(0);
                return Ok(QueryOutcome::Rowset {
                    columns: only.columns,
                    data: only.data,
                    row_count: only.row_count,
                });
            }
            let row_count = rowsets.iter().map(|r| r.row_count).sum();
            return Ok(QueryOutcome::MultiRowset {
                data: rowsets,
                row_count,
            });
        }

        let message = match (&switched, write_count) {
            (Some(db), 0) => format!("Database changed to '{db}'"),
            _ if statements.len() == 1 => "Query executed successfully".to_string(),
            _ => format!("{} statements executed successfully", statements.len()),
        };
        Ok(QueryOutcome::Mutation {
            affected_rows,
            insert_id,
            message,
        })
    }

    /// Single-row update keyed by one column. An empty change set performs
    /// nothing and reports success.
    pub async fn update_row(
        &self,
        database: &str,
        table: &str,
        key_column: &str,
        key_value: &Value,
        changes: &Map<String, Value>,
    ) -> Result<String> {
        let mut inner = self.inner.lock().await;
        let session = inner.session_mut()?;
        if changes.is_empty() {
            return Ok("No changes to apply".to_string());
        }
        let assignments = changes
            .iter()
            .map(|(column, value)| format!("{} = {}", quote_identifier(column), quote_literal(value)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            quote_qualified(database, table),
            assignments,
            quote_identifier(key_column),
            quote_literal(key_value)
        );
        session
            .execute(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to update row", e))?;
        Ok("Row updated successfully".to_string())
    }

    /// Fast bulk clear; falls back to an unconditional delete once if the
    /// truncate is blocked (typically by referential constraints).
    pub async fn delete_all_rows(&self, database: &str, table: &str) -> Result<u64> {
        let target = quote_qualified(database, table);
        let mut inner = self.inner.lock().await;
        let session = inner.session_mut()?;
        match session.execute(&format!("TRUNCATE TABLE {target}")).await {
            Ok(summary) => Ok(summary.affected_rows),
            Err(truncate_err) => {
                warn!("truncate blocked, falling back to delete: {truncate_err}");
                let summary = session
                    .execute(&format!("DELETE FROM {target}"))
                    .await
                    .map_err(|e| MyBridgeError::operation("Failed to delete table data", e))?;
                Ok(summary.affected_rows)
            }
        }
    }

    pub async fn delete_rows(
        &self,
        database: &str,
        table: &str,
        key_column: &str,
        key_values: &[Value],
    ) -> Result<u64> {
        if key_values.is_empty() {
            return Err(MyBridgeError::Validation(
                "No rows selected for deletion".to_string(),
            ));
        }
        let list = key_values
            .iter()
            .map(quote_literal)
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            quote_qualified(database, table),
            quote_identifier(key_column),
            list
        );
        let mut inner = self.inner.lock().await;
        let summary = inner
            .session_mut()?
            .execute(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to delete selected rows", e))?;
        Ok(summary.affected_rows)
    }

    pub async fn create_database(&self, name: &str) -> Result<()> {
        let sql = format!("CREATE DATABASE {}", quote_identifier(name));
        let mut inner = self.inner.lock().await;
        inner
            .session_mut()?
            .execute(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to create database", e))?;
        Ok(())
    }

    pub async fn drop_database(&self, name: &str) -> Result<()> {
        let sql = format!("DROP DATABASE {}", quote_identifier(name));
        let mut inner = self.inner.lock().await;
        inner
            .session_mut()?
            .execute(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to drop database", e))?;
        Ok(())
    }

    /// DDL that needs the target database selected runs on a short-lived
    /// scoped session, closed on every exit path.
    pub async fn create_table(&self, database: &str, ddl: &str) -> Result<()> {
        self.execute_scoped(database, ddl, "Failed to create table")
            .await
    }

    pub async fn alter_table(&self, database: &str, table: &str, statement: &str) -> Result<()> {
        let context = format!("Failed to alter table '{table}'");
        self.execute_scoped(database, statement, &context).await
    }

    pub async fn drop_table(&self, database: &str, table: &str) -> Result<()> {
        let sql = format!("DROP TABLE {}", quote_qualified(database, table));
        let mut inner = self.inner.lock().await;
        inner
            .session_mut()?
            .execute(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to drop table", e))?;
        Ok(())
    }

    pub async fn row_count(
        &self,
        database: &str,
        table: &str,
        where_clause: Option<&str>,
    ) -> Result<u64> {
        let mut sql = format!(
            "SELECT COUNT(*) AS count FROM {}",
            quote_qualified(database, table)
        );
        if let Some(predicate) = where_clause {
            if !predicate.trim().is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(predicate);
            }
        }
        let mut inner = self.inner.lock().await;
        let rowset = inner
            .session_mut()?
            .query(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to get row count", e))?;
        Ok(rowset.scalar().map(value_as_u64).unwrap_or(0))
    }

    /// The table's DDL as the server prints it.
    pub async fn show_create_table(&self, database: &str, table: &str) -> Result<String> {
        let sql = format!("SHOW CREATE TABLE {}", quote_qualified(database, table));
        let mut inner = self.inner.lock().await;
        let rowset = inner
            .session_mut()?
            .query(&sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to get table definition", e))?;
        let create = rowset
            .rows
            .first()
            .and_then(|row| row.get(1))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MyBridgeError::operation("Failed to get table definition", "empty response")
            })?;
        Ok(create.to_string())
    }

    /// Raw rowset access for the export encoder; connection-checked like
    /// every other operation.
    pub async fn query_raw(&self, sql: &str) -> Result<RawRowset> {
        let mut inner = self.inner.lock().await;
        inner.session_mut()?.query(sql).await
    }

    pub async fn execute_raw(&self, sql: &str) -> Result<ExecSummary> {
        let mut inner = self.inner.lock().await;
        inner.session_mut()?.execute(sql).await
    }

    async fn execute_scoped(&self, database: &str, sql: &str, context: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.session_mut()?;
        let mut scoped = self
            .connector
            .open(&self.params, Some(database))
            .await
            .map_err(|e| MyBridgeError::operation(context, e))?;
        let result = scoped.execute(sql).await;
        if let Err(e) = scoped.close().await {
            warn!("failed to close scoped session: {e}");
        }
        result.map_err(|e| MyBridgeError::operation(context, e))?;
        Ok(())
    }
}

fn first_column(rowset: RawRowset) -> Vec<String> {
    rowset
        .rows
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .map(|value| value_as_text(&value))
        .collect()
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_as_u64(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

fn text_field(row: &Map<String, Value>, key: &str) -> String {
    row.get(key).and_then(Value::as_str).unwrap_or("").to_string()
}

fn key_role(key: &str) -> String {
    match key {
        "PRI" => "PRIMARY",
        "UNI" => "UNIQUE",
        "MUL" => "INDEX",
        other => other,
    }
    .to_string()
}

fn normalize_direction(direction: Option<&str>) -> &'static str {
    match direction {
        Some(d) if d.eq_ignore_ascii_case("DESC") => "DESC",
        _ => "ASC",
    }
}
