//! The SQL engine as an opaque capability.
//!
//! Everything above this seam works in terms of `execute(sql) -> rows | error`;
//! the production implementation lives in [`super::mysql`], tests supply a
//! scripted replacement.

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::session::ConnectionParams;

/// Columns and row values of one result set, in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRowset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawRowset {
    /// Re-shape positional rows into column-keyed objects, preserving the
    /// server's column order via the `columns` vector.
    pub fn into_objects(self) -> Vec<serde_json::Map<String, Value>> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .cloned()
                    .zip(row)
                    .collect::<serde_json::Map<String, Value>>()
            })
            .collect()
    }

    /// First value of the first row, if any.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Counters from a non-returning statement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExecSummary {
    pub affected_rows: u64,
    pub last_insert_id: Option<u64>,
}

/// One live database session. Exclusively owned by its handle; never shared.
#[async_trait]
pub trait SqlSession: Send {
    /// Run a statement expected to produce a rowset.
    async fn query(&mut self, sql: &str) -> Result<RawRowset>;

    /// Run a statement for its side effect; returns the driver's counters.
    async fn execute(&mut self, sql: &str) -> Result<ExecSummary>;

    /// Release the underlying transport resource.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Factory for sessions; `database` selects an initial schema for scoped
/// secondary sessions (DDL, batch context switches).
#[async_trait]
pub trait SqlConnector: Send + Sync {
    async fn open(
        &self,
        params: &ConnectionParams,
        database: Option<&str>,
    ) -> Result<Box<dyn SqlSession>>;
}
