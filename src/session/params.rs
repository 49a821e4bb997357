use serde::{Deserialize, Serialize};

/// Connection parameters supplied by the `connect_database` event.
///
/// Immutable once a handle has been constructed from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParams {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<TlsParams>,
}

/// TLS material forwarded verbatim to the driver's TLS negotiation.
/// PEM text blobs, never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default = "default_true", rename = "rejectUnauthorized")]
    pub reject_unauthorized: bool,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_true() -> bool {
    true
}

impl ConnectionParams {
    /// Copy safe to echo back to the client: the password is elided.
    pub fn redacted(&self) -> ConnectionParams {
        ConnectionParams {
            password: String::new(),
            ssl: self.ssl.clone(),
            ..self.clone()
        }
    }
}
