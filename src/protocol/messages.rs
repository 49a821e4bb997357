//! The named-event vocabulary spoken with the browser console.
//!
//! Each frame is `{"event": <name>, "data": <payload>}`; events that carry
//! nothing omit `data`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::QueryOutcome;
use crate::session::{ColumnDescriptor, ConnectionParams};

/// Inbound commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectDatabase(ConnectPayload),
    DisconnectDatabase,
    GetDatabases,
    GetTables(String),
    GetTableStructure {
        database: String,
        table: String,
    },
    GetTableData(TableDataRequest),
    GetTableIndexes {
        database: String,
        table: String,
    },
    GetTableConstraints {
        database: String,
        table: String,
    },
    ExecuteQuery {
        #[serde(default)]
        database: Option<String>,
        query: String,
    },
    CreateDatabase(String),
    DropDatabase(String),
    CreateTable(CreateTableRequest),
    AlterTable(AlterTableRequest),
    DropTable {
        database: String,
        table: String,
    },
    UpdateRow(UpdateRowRequest),
    DeleteAllData {
        database: String,
        table: String,
    },
    DeleteSelectedData(DeleteSelectedRequest),
    ExportDatabase(ExportDatabaseRequest),
    ExportTable(ExportTableRequest),
    GetRowCount(RowCountRequest),
    GetCachedCredentials,
    Logout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectPayload {
    #[serde(flatten)]
    pub params: ConnectionParams,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDataRequest {
    pub database: String,
    pub table: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub sort_column: Option<String>,
    #[serde(default)]
    pub sort_direction: Option<String>,
    #[serde(default)]
    pub search_column: Option<String>,
    #[serde(default)]
    pub search_value: Option<String>,
}

fn default_limit() -> u64 {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub database: String,
    pub create_query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlterTableRequest {
    pub database: String,
    pub table: String,
    pub alter_query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRowRequest {
    pub database: String,
    pub table: String,
    pub primary_key_column: String,
    pub primary_key_value: Value,
    pub update_data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSelectedRequest {
    pub database: String,
    pub table: String,
    #[serde(default)]
    pub target_column: Option<String>,
    #[serde(default)]
    pub target_values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDatabaseRequest {
    pub database: String,
    #[serde(default)]
    pub options: DatabaseExportOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTableRequest {
    pub database: String,
    pub table: String,
    #[serde(default)]
    pub options: TableExportOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowCountRequest {
    pub database: String,
    pub table: String,
    #[serde(default)]
    pub where_clause: Option<String>,
}

/// Database export layout. The three layout flags compose independently;
/// any combination producing more than one output document selects a ZIP
/// archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseExportOptions {
    pub include_data: bool,
    pub selected_tables: Option<Vec<String>>,
    pub single_file: bool,
    pub split_schema_and_data: bool,
    pub file_per_table: bool,
}

impl Default for DatabaseExportOptions {
    fn default() -> Self {
        Self {
            include_data: true,
            selected_tables: None,
            single_file: true,
            split_schema_and_data: false,
            file_per_table: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableExportOptions {
    pub include_data: bool,
    pub where_clause: Option<String>,
    pub selected_rows: Option<Vec<usize>>,
}

impl Default for TableExportOptions {
    fn default() -> Self {
        Self {
            include_data: true,
            where_clause: None,
            selected_rows: None,
        }
    }
}

/// Outbound events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    ConnectionSuccess {
        message: String,
        connection_id: String,
    },
    ConnectionError {
        message: String,
    },
    DisconnectionSuccess {
        message: String,
    },
    DatabasesList(Vec<String>),
    TablesList {
        database: String,
        tables: Vec<String>,
    },
    TableStructure {
        database: String,
        table: String,
        structure: Vec<ColumnDescriptor>,
    },
    TableData(TableDataResponse),
    TableIndexes {
        database: String,
        table: String,
        indexes: Vec<Map<String, Value>>,
    },
    TableConstraints {
        database: String,
        table: String,
        constraints: Vec<Map<String, Value>>,
    },
    QueryResult {
        query: String,
        result: QueryOutcome,
    },
    QueryExecutionError {
        database: Option<String>,
        query: String,
        message: String,
    },
    DatabaseCreated {
        message: String,
    },
    DatabaseDropped {
        message: String,
    },
    TableCreated {
        message: String,
    },
    TableAltered {
        message: String,
    },
    TableDropped {
        message: String,
    },
    RowUpdated {
        message: String,
    },
    DataDeleted {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    DatabaseExported {
        filename: String,
        content: String,
        size: usize,
        is_zip: bool,
    },
    TableExported {
        filename: String,
        content: String,
        size: usize,
    },
    #[serde(rename_all = "camelCase")]
    RowCountResult {
        database: String,
        table: String,
        count: u64,
        where_clause: Option<String>,
    },
    CachedCredentials {
        params: Option<ConnectionParams>,
    },
    LogoutSuccess {
        message: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDataResponse {
    pub database: String,
    pub table: String,
    pub data: Vec<Map<String, Value>>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub sort_column: Option<String>,
    pub sort_direction: Option<String>,
    pub search_column: Option<String>,
    pub search_value: Option<String>,
}
