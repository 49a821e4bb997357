//! `mysql_async`-backed implementation of the SQL capability traits.

use async_trait::async_trait;
use mysql_async::consts::ColumnType;
use mysql_async::prelude::*;
use mysql_async::{ClientIdentity, Conn, OptsBuilder, PathOrBuf, Row, SslOpts};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::session::backend::{ExecSummary, RawRowset, SqlConnector, SqlSession};
use crate::session::{ConnectionParams, TlsParams};
use crate::{MyBridgeError, Result};

pub struct MySqlConnector {
    connect_timeout: Duration,
}

impl MySqlConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn build_opts(params: &ConnectionParams, database: Option<&str>) -> OptsBuilder {
        let mut opts = OptsBuilder::default()
            .ip_or_hostname(params.host.clone())
            .tcp_port(params.port)
            .user(Some(params.user.clone()))
            .pass(Some(params.password.clone()));
        if let Some(db) = database {
            opts = opts.db_name(Some(db.to_string()));
        }
        if let Some(tls) = &params.ssl {
            opts = opts.ssl_opts(Some(Self::build_ssl_opts(tls)));
        }
        opts
    }

    fn build_ssl_opts(tls: &TlsParams) -> SslOpts {
        let mut ssl = SslOpts::default();
        if !tls.reject_unauthorized {
            ssl = ssl
                .with_danger_accept_invalid_certs(true)
                .with_danger_skip_domain_validation(true);
        }
        if let Some(ca) = &tls.ca {
            ssl = ssl.with_root_certs(vec![PathOrBuf::buf(ca.clone().into_bytes())]);
        }
        if let (Some(cert), Some(key)) = (&tls.cert, &tls.key) {
            ssl = ssl.with_client_identity(Some(ClientIdentity::new(
                PathOrBuf::buf(cert.clone().into_bytes()),
                PathOrBuf::buf(key.clone().into_bytes()),
            )));
        }
        ssl
    }
}

#[async_trait]
impl SqlConnector for MySqlConnector {
    async fn open(
        &self,
        params: &ConnectionParams,
        database: Option<&str>,
    ) -> Result<Box<dyn SqlSession>> {
        debug!(
            host = %params.host,
            port = params.port,
            database = database.unwrap_or(""),
            tls = params.ssl.is_some(),
            "opening mysql session"
        );
        let opts = Self::build_opts(params, database);
        let conn = tokio::time::timeout(self.connect_timeout, Conn::new(opts))
            .await
            .map_err(|_| {
                MyBridgeError::Driver(format!(
                    "connection to {}:{} timed out",
                    params.host, params.port
                ))
            })??;
        Ok(Box::new(MySqlSession { conn }))
    }
}

struct MySqlSession {
    conn: Conn,
}

#[async_trait]
impl SqlSession for MySqlSession {
    async fn query(&mut self, sql: &str) -> Result<RawRowset> {
        let mut result = self.conn.query_iter(sql).await?;
        let meta: Vec<(String, bool)> = result
            .columns()
            .map(|cols| {
                cols.iter()
                    .map(|col| {
                        (
                            col.name_str().into_owned(),
                            col.column_type() == ColumnType::MYSQL_TYPE_JSON,
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        let raw_rows: Vec<Row> = result.collect().await?;

        let mut rows = Vec::with_capacity(raw_rows.len());
        for row in raw_rows {
            let mut values = Vec::with_capacity(meta.len());
            for (idx, (_, is_json)) in meta.iter().enumerate() {
                let value = row
                    .as_ref(idx)
                    .map(|v| value_to_json(v, *is_json))
                    .unwrap_or(Value::Null);
                values.push(value);
            }
            rows.push(values);
        }
        Ok(RawRowset {
            columns: meta.into_iter().map(|(name, _)| name).collect(),
            rows,
        })
    }

    async fn execute(&mut self, sql: &str) -> Result<ExecSummary> {
        self.conn.query_drop(sql).await?;
        Ok(ExecSummary {
            affected_rows: self.conn.affected_rows(),
            last_insert_id: self.conn.last_insert_id(),
        })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.disconnect().await?;
        Ok(())
    }
}

/// Convert a driver value into the JSON shape the event vocabulary carries:
/// null, number, string, formatted date/time, or (for JSON columns) the
/// parsed nested document.
fn value_to_json(value: &mysql_async::Value, is_json: bool) -> Value {
    use mysql_async::Value as V;
    match value {
        V::NULL => Value::Null,
        V::Bytes(bytes) => {
            if is_json {
                if let Ok(parsed) = serde_json::from_slice::<Value>(bytes) {
                    return parsed;
                }
            }
            match std::str::from_utf8(bytes) {
                Ok(text) => Value::String(text.to_string()),
                Err(_) => Value::String(format!("0x{}", hex::encode(bytes))),
            }
        }
        V::Int(i) => Value::from(*i),
        V::UInt(u) => Value::from(*u),
        V::Float(f) => serde_json::Number::from_f64(f64::from(*f))
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        V::Double(d) => serde_json::Number::from_f64(*d)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(d.to_string())),
        V::Date(year, month, day, hour, minute, second, micros) => {
            if *micros > 0 {
                Value::String(format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
                ))
            } else {
                Value::String(format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                ))
            }
        }
        V::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let total_hours = u32::from(*days) * 24 + u32::from(*hours);
            if *micros > 0 {
                Value::String(format!(
                    "{sign}{total_hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
                ))
            } else {
                Value::String(format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_to_json_scalars() {
        use mysql_async::Value as V;
        assert_eq!(value_to_json(&V::NULL, false), Value::Null);
        assert_eq!(value_to_json(&V::Int(-3), false), json!(-3));
        assert_eq!(value_to_json(&V::UInt(7), false), json!(7));
        assert_eq!(
            value_to_json(&V::Bytes(b"hello".to_vec()), false),
            json!("hello")
        );
    }

    #[test]
    fn test_value_to_json_parses_json_columns() {
        use mysql_async::Value as V;
        let doc = br#"{"a": [1, 2]}"#.to_vec();
        assert_eq!(value_to_json(&V::Bytes(doc), true), json!({"a": [1, 2]}));
        // Non-JSON columns keep the raw text even when it looks like JSON
        assert_eq!(
            value_to_json(&V::Bytes(b"[1]".to_vec()), false),
            json!("[1]")
        );
    }

    #[test]
    fn test_value_to_json_dates() {
        use mysql_async::Value as V;
        assert_eq!(
            value_to_json(&V::Date(2025, 8, 7, 14, 30, 0, 0), false),
            json!("2025-08-07 14:30:00")
        );
        assert_eq!(
            value_to_json(&V::Time(true, 1, 2, 3, 4, 0), false),
            json!("-26:03:04")
        );
    }

    #[test]
    fn test_value_to_json_binary_falls_back_to_hex() {
        use mysql_async::Value as V;
        assert_eq!(
            value_to_json(&V::Bytes(vec![0xff, 0x00]), false),
            json!("0xff00")
        );
    }
}
