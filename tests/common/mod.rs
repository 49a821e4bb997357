//! Shared scripted SQL backend for integration tests.
//!
//! The mock records every statement it is handed (tagged with the database
//! context of the session that ran it) and replies from a canned table keyed
//! by exact SQL text. Unstubbed queries return an empty rowset; unstubbed
//! executes return zeroed counters.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use mybridge::session::{
    ConnectionHandle, ConnectionParams, ExecSummary, RawRowset, SqlConnector, SqlSession,
};
use mybridge::{MyBridgeError, Result};

#[derive(Clone, Debug)]
pub enum Canned {
    Rows(RawRowset),
    Exec(ExecSummary),
    Fail(String),
}

#[derive(Default)]
pub struct MockState {
    canned: HashMap<String, Canned>,
    pub log: Vec<String>,
    pub open_log: Vec<Option<String>>,
    pub closed: usize,
    pub fail_open_all: Option<String>,
    pub fail_open_db: HashMap<String, String>,
}

#[derive(Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stub_rows(&self, sql: &str, columns: &[&str], rows: Vec<Vec<Value>>) {
        self.state.lock().canned.insert(
            sql.to_string(),
            Canned::Rows(RawRowset {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            }),
        );
    }

    pub fn stub_exec(&self, sql: &str, affected_rows: u64, last_insert_id: Option<u64>) {
        self.state.lock().canned.insert(
            sql.to_string(),
            Canned::Exec(ExecSummary {
                affected_rows,
                last_insert_id,
            }),
        );
    }

    pub fn stub_fail(&self, sql: &str, message: &str) {
        self.state
            .lock()
            .canned
            .insert(sql.to_string(), Canned::Fail(message.to_string()));
    }

    pub fn fail_all_opens(&self, message: &str) {
        self.state.lock().fail_open_all = Some(message.to_string());
    }

    pub fn fail_open_database(&self, database: &str, message: &str) {
        self.state
            .lock()
            .fail_open_db
            .insert(database.to_string(), message.to_string());
    }

    /// Every statement the backend saw, in order, `[db]`-prefixed when run on
    /// a database-scoped session.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    /// The `database` argument of every `open` call, in order.
    pub fn opens(&self) -> Vec<Option<String>> {
        self.state.lock().open_log.clone()
    }

    pub fn closed_sessions(&self) -> usize {
        self.state.lock().closed
    }
}

#[async_trait]
impl SqlConnector for MockConnector {
    async fn open(
        &self,
        _params: &ConnectionParams,
        database: Option<&str>,
    ) -> Result<Box<dyn SqlSession>> {
        let mut state = self.state.lock();
        if let Some(message) = &state.fail_open_all {
            return Err(MyBridgeError::Driver(message.clone()));
        }
        if let Some(db) = database {
            if let Some(message) = state.fail_open_db.get(db) {
                return Err(MyBridgeError::Driver(message.clone()));
            }
        }
        state.open_log.push(database.map(String::from));
        Ok(Box::new(MockSession {
            state: self.state.clone(),
            database: database.map(String::from),
        }))
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
    database: Option<String>,
}

impl MockSession {
    fn record(&self, state: &mut MockState, sql: &str) {
        let entry = match &self.database {
            Some(db) => format!("[{db}] {sql}"),
            None => sql.to_string(),
        };
        state.log.push(entry);
    }
}

#[async_trait]
impl SqlSession for MockSession {
    async fn query(&mut self, sql: &str) -> Result<RawRowset> {
        let mut state = self.state.lock();
        self.record(&mut state, sql);
        match state.canned.get(sql) {
            Some(Canned::Rows(rowset)) => Ok(rowset.clone()),
            Some(Canned::Fail(message)) => Err(MyBridgeError::Driver(message.clone())),
            Some(Canned::Exec(_)) | None => Ok(RawRowset::default()),
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<ExecSummary> {
        let mut state = self.state.lock();
        self.record(&mut state, sql);
        match state.canned.get(sql) {
            Some(Canned::Exec(summary)) => Ok(*summary),
            Some(Canned::Fail(message)) => Err(MyBridgeError::Driver(message.clone())),
            Some(Canned::Rows(_)) | None => Ok(ExecSummary::default()),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.lock().closed += 1;
        Ok(())
    }
}

pub fn test_params() -> ConnectionParams {
    serde_json::from_str(r#"{"host": "db.test", "user": "root", "password": "pw"}"#)
        .expect("valid test params")
}

pub fn make_handle(connector: Arc<MockConnector>) -> ConnectionHandle {
    ConnectionHandle::new(test_params(), connector)
}

pub async fn connected_handle(connector: Arc<MockConnector>) -> ConnectionHandle {
    let handle = make_handle(connector);
    handle.connect().await.expect("mock connect");
    handle
}
