//! Command dispatch: resolve the session's handle, invoke the operation,
//! translate the result or error into an outbound event.
//!
//! Dispatch is stateless between messages; all state lives in the registry
//! and the handles. Each inbound message is processed to completion before
//! its reply is emitted, so a session's handle is never re-entered.

use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::MyBridgeError;
use crate::export::ExportEncoder;
use crate::protocol::{ClientMessage, ConnectPayload, ServerMessage, TableDataResponse};
use crate::session::{
    ConnectionHandle, CredentialCache, PageRequest, SessionRegistry, SqlConnector,
};

pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    credentials: Arc<CredentialCache>,
    connector: Arc<dyn SqlConnector>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SessionRegistry>,
        credentials: Arc<CredentialCache>,
        connector: Arc<dyn SqlConnector>,
    ) -> Self {
        Self {
            registry,
            credentials,
            connector,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Process one inbound command and produce its reply event. Every error
    /// becomes an event; nothing escapes to the session loop.
    pub async fn dispatch(&self, session_id: Uuid, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::ConnectDatabase(payload) => {
                self.handle_connect(session_id, payload).await
            }
            ClientMessage::DisconnectDatabase => {
                self.registry.unbind(&session_id).await;
                ServerMessage::DisconnectionSuccess {
                    message: "Database disconnected successfully".to_string(),
                }
            }
            ClientMessage::Logout => {
                self.registry.unbind(&session_id).await;
                self.credentials.forget(&session_id);
                ServerMessage::LogoutSuccess {
                    message: "Logged out successfully".to_string(),
                }
            }
            ClientMessage::GetCachedCredentials => ServerMessage::CachedCredentials {
                params: self
                    .credentials
                    .get_cached(&session_id)
                    .map(|params| params.redacted()),
            },
            ClientMessage::GetDatabases => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle.list_databases().await {
                    Ok(databases) => ServerMessage::DatabasesList(databases),
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::GetTables(database) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle.list_tables(&database).await {
                    Ok(tables) => ServerMessage::TablesList { database, tables },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::GetTableStructure { database, table } => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle.describe_table(&database, &table).await {
                    Ok(structure) => ServerMessage::TableStructure {
                        database,
                        table,
                        structure,
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::GetTableIndexes { database, table } => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle.list_indexes(&database, &table).await {
                    Ok(indexes) => ServerMessage::TableIndexes {
                        database,
                        table,
                        indexes,
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::GetTableConstraints { database, table } => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle.list_constraints(&database, &table).await {
                    Ok(constraints) => ServerMessage::TableConstraints {
                        database,
                        table,
                        constraints,
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::GetTableData(req) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                let page = PageRequest {
                    page_size: req.limit,
                    offset: req.offset,
                    sort_column: req.sort_column.clone(),
                    sort_direction: req.sort_direction.clone(),
                    filter_column: req.search_column.clone(),
                    filter_value: req.search_value.clone(),
                };
                match handle.fetch_rows(&req.database, &req.table, &page).await {
                    Ok(result) => ServerMessage::TableData(TableDataResponse {
                        database: req.database,
                        table: req.table,
                        data: result.rows,
                        total: result.total_matching,
                        limit: req.limit,
                        offset: req.offset,
                        sort_column: req.sort_column,
                        sort_direction: req.sort_direction,
                        search_column: req.search_column,
                        search_value: req.search_value,
                    }),
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::ExecuteQuery { database, query } => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle.run_statement(database.as_deref(), &query).await {
                    Ok(result) => ServerMessage::QueryResult { query, result },
                    Err(e) => ServerMessage::QueryExecutionError {
                        database,
                        query,
                        message: e.to_string(),
                    },
                }
            }
            ClientMessage::CreateDatabase(name) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle.create_database(&name).await {
                    Ok(()) => ServerMessage::DatabaseCreated {
                        message: format!("Database '{name}' created successfully"),
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::DropDatabase(name) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle.drop_database(&name).await {
                    Ok(()) => ServerMessage::DatabaseDropped {
                        message: format!("Database '{name}' dropped successfully"),
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::CreateTable(req) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle
                    .create_table(&req.database, &req.create_query)
                    .await
                {
                    Ok(()) => ServerMessage::TableCreated {
                        message: "Table created successfully".to_string(),
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::AlterTable(req) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle
                    .alter_table(&req.database, &req.table, &req.alter_query)
                    .await
                {
                    Ok(()) => ServerMessage::TableAltered {
                        message: format!("Table '{}' altered successfully", req.table),
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::DropTable { database, table } => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle.drop_table(&database, &table).await {
                    Ok(()) => ServerMessage::TableDropped {
                        message: format!("Table '{table}' dropped successfully"),
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::UpdateRow(req) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle
                    .update_row(
                        &req.database,
                        &req.table,
                        &req.primary_key_column,
                        &req.primary_key_value,
                        &req.update_data,
                    )
                    .await
                {
                    Ok(message) => ServerMessage::RowUpdated { message },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::DeleteAllData { database, table } => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle.delete_all_rows(&database, &table).await {
                    Ok(_) => ServerMessage::DataDeleted {
                        message: format!("All data from '{table}' deleted successfully"),
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::DeleteSelectedData(req) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                let Some(column) = req.target_column else {
                    return error_event(MyBridgeError::Validation(
                        "No target column for deletion".to_string(),
                    ));
                };
                match handle
                    .delete_rows(&req.database, &req.table, &column, &req.target_values)
                    .await
                {
                    Ok(affected) => ServerMessage::DataDeleted {
                        message: format!("{affected} row(s) deleted from '{}'", req.table),
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::ExportDatabase(req) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                let encoder = ExportEncoder::new(&handle);
                match encoder.export_database(&req.database, &req.options).await {
                    Ok(artifact) => ServerMessage::DatabaseExported {
                        content: artifact.content_string(),
                        filename: artifact.filename,
                        size: artifact.size,
                        is_zip: artifact.is_zip,
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::ExportTable(req) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                let encoder = ExportEncoder::new(&handle);
                match encoder
                    .export_table(&req.database, &req.table, &req.options)
                    .await
                {
                    Ok(artifact) => ServerMessage::TableExported {
                        content: artifact.content_string(),
                        filename: artifact.filename,
                        size: artifact.size,
                    },
                    Err(e) => error_event(e),
                }
            }
            ClientMessage::GetRowCount(req) => {
                let handle = match self.require_handle(&session_id) {
                    Ok(handle) => handle,
                    Err(reply) => return reply,
                };
                match handle
                    .row_count(&req.database, &req.table, req.where_clause.as_deref())
                    .await
                {
                    Ok(count) => ServerMessage::RowCountResult {
                        database: req.database,
                        table: req.table,
                        count,
                        where_clause: req.where_clause,
                    },
                    Err(e) => error_event(e),
                }
            }
        }
    }

    /// Transport-level session end: tear down the handle and drop cached
    /// credentials. No entry survives its session.
    pub async fn session_closed(&self, session_id: Uuid) {
        if self.registry.unbind(&session_id).await {
            info!("session {session_id} ended, connection released");
        }
        self.credentials.forget(&session_id);
    }

    async fn handle_connect(&self, session_id: Uuid, payload: ConnectPayload) -> ServerMessage {
        let handle = Arc::new(ConnectionHandle::new(
            payload.params.clone(),
            self.connector.clone(),
        ));
        if let Err(e) = handle.connect().await {
            error!("database connection error for session {session_id}: {e}");
            return ServerMessage::ConnectionError {
                message: e.to_string(),
            };
        }
        if let Err(e) = self.registry.bind(session_id, handle.clone()).await {
            if let Err(close_err) = handle.disconnect().await {
                warn!("failed to release rejected handle: {close_err}");
            }
            return ServerMessage::ConnectionError {
                message: e.to_string(),
            };
        }
        if payload.remember {
            self.credentials.set_cached(session_id, payload.params);
        }
        info!("database connected for session {session_id}");
        ServerMessage::ConnectionSuccess {
            message: "Successfully connected to database".to_string(),
            connection_id: session_id.to_string(),
        }
    }

    fn require_handle(
        &self,
        session_id: &Uuid,
    ) -> std::result::Result<Arc<ConnectionHandle>, ServerMessage> {
        self.registry
            .lookup(session_id)
            .ok_or_else(|| error_event(MyBridgeError::NotConnected))
    }
}

fn error_event(err: MyBridgeError) -> ServerMessage {
    ServerMessage::Error {
        message: err.to_string(),
    }
}
