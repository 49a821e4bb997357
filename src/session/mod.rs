// Module for session management
pub mod backend;
pub mod credentials;
pub mod handle;
pub mod mysql;
pub mod params;
pub mod registry;

pub use backend::{ExecSummary, RawRowset, SqlConnector, SqlSession};
pub use credentials::CredentialCache;
pub use handle::{ColumnDescriptor, ConnectionHandle, Lifecycle, PageRequest, RowPage};
pub use mysql::MySqlConnector;
pub use params::{ConnectionParams, TlsParams};
pub use registry::SessionRegistry;
