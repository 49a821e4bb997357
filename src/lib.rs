pub mod config;
pub mod dispatch;
pub mod export;
pub mod protocol;
pub mod query;
pub mod session;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MyBridgeError {
    #[error("No active database connection")]
    NotConnected,

    #[error("Failed to connect to database: {0}")]
    Connection(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Statement {position} failed ({statement}): {message}")]
    Statement {
        statement: String,
        position: usize,
        message: String,
    },

    #[error("{context}: {message}")]
    Operation { context: String, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    Driver(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MyBridgeError>;

impl MyBridgeError {
    /// Wrap an underlying failure with an operation-specific prefix.
    pub fn operation(context: &str, err: impl std::fmt::Display) -> Self {
        MyBridgeError::Operation {
            context: context.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<mysql_async::Error> for MyBridgeError {
    fn from(err: mysql_async::Error) -> Self {
        MyBridgeError::Driver(err.to_string())
    }
}
