use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of `run_statement`, discriminated on the wire by `type`.
///
/// A batch that produced at least one rowset reports as `SELECT` (single
/// statement) or `MULTI_SELECT` (several statements); otherwise the
/// accumulated mutation counters are reported as `MODIFY`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum QueryOutcome {
    #[serde(rename = "SELECT", rename_all = "camelCase")]
    Rowset {
        columns: Vec<String>,
        data: Vec<serde_json::Map<String, Value>>,
        row_count: usize,
    },
    #[serde(rename = "MULTI_SELECT", rename_all = "camelCase")]
    MultiRowset {
        data: Vec<StatementRowset>,
        row_count: usize,
    },
    #[serde(rename = "MODIFY", rename_all = "camelCase")]
    Mutation {
        affected_rows: u64,
        insert_id: Option<u64>,
        message: String,
    },
}

/// One rowset inside a multi-statement batch, tagged with the statement that
/// produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatementRowset {
    pub statement: String,
    pub columns: Vec<String>,
    pub data: Vec<serde_json::Map<String, Value>>,
    pub row_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_discriminants() {
        let rowset = QueryOutcome::Rowset {
            columns: vec!["id".into()],
            data: vec![],
            row_count: 0,
        };
        let encoded = serde_json::to_value(&rowset).unwrap();
        assert_eq!(encoded["type"], "SELECT");
        assert_eq!(encoded["rowCount"], 0);

        let mutation = QueryOutcome::Mutation {
            affected_rows: 3,
            insert_id: Some(7),
            message: "ok".into(),
        };
        let encoded = serde_json::to_value(&mutation).unwrap();
        assert_eq!(encoded["type"], "MODIFY");
        assert_eq!(encoded["affectedRows"], 3);
        assert_eq!(encoded["insertId"], 7);

        let multi = QueryOutcome::MultiRowset {
            data: vec![StatementRowset {
                statement: "SELECT 1".into(),
                columns: vec!["1".into()],
                data: vec![],
                row_count: 0,
            }],
            row_count: 0,
        };
        let encoded = serde_json::to_value(&multi).unwrap();
        assert_eq!(encoded["type"], "MULTI_SELECT");
        assert_eq!(encoded["data"][0]["statement"], "SELECT 1");
    }

    #[test]
    fn test_outcome_round_trip() {
        let original = QueryOutcome::Rowset {
            columns: vec!["name".into()],
            data: vec![{
                let mut row = serde_json::Map::new();
                row.insert("name".into(), json!("alice"));
                row
            }],
            row_count: 1,
        };
        let text = serde_json::to_string(&original).unwrap();
        let back: QueryOutcome = serde_json::from_str(&text).unwrap();
        assert_eq!(back, original);
    }
}
