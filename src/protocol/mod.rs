pub mod codec;
pub mod messages;

pub use codec::{ClientFrame, EventCodec};
pub use messages::{
    AlterTableRequest, ClientMessage, ConnectPayload, CreateTableRequest, DatabaseExportOptions,
    DeleteSelectedRequest, ExportDatabaseRequest, ExportTableRequest, RowCountRequest,
    ServerMessage, TableDataRequest, TableDataResponse, TableExportOptions, UpdateRowRequest,
};
