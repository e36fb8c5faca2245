//! SQL API v2 request and response bodies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use warehouse_sink::SqlValue;

/// Body of `POST /api/v2/statements`.
#[derive(Debug, Clone, Serialize)]
pub struct StatementRequest {
    pub statement: String,
    /// Server-side timeout in seconds (0 = account default)
    pub timeout: u64,
    pub database: String,
    pub schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, Binding>,
}

/// One positional bind value, keyed by its 1-based index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Textual value; `None` binds NULL
    pub value: Option<String>,
}

/// Build the `bindings` object for positional parameters.
pub fn bindings(params: &[SqlValue]) -> BTreeMap<String, Binding> {
    params
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let binding = match value {
                SqlValue::Text(s) => Binding {
                    kind: "TEXT",
                    value: Some(s.clone()),
                },
                SqlValue::Bool(b) => Binding {
                    kind: "BOOLEAN",
                    value: Some(b.to_string()),
                },
                SqlValue::Null(ty) => Binding {
                    kind: match ty {
                        sync_core::ColumnType::String => "TEXT",
                        sync_core::ColumnType::Boolean => "BOOLEAN",
                    },
                    value: None,
                },
            };
            ((i + 1).to_string(), binding)
        })
        .collect()
}

/// Response to a statement submission or status poll.
///
/// Successful, in-progress and failed statements share this shape; only the
/// fields needed to drive the request and report the outcome are decoded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub sql_state: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub statement_handle: Option<String>,
    #[serde(default)]
    pub stats: Option<DmlStats>,
}

/// Row counts reported for DML statements.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmlStats {
    #[serde(default)]
    pub num_rows_inserted: u64,
    #[serde(default)]
    pub num_rows_updated: u64,
    #[serde(default)]
    pub num_rows_deleted: u64,
}

impl StatementResponse {
    /// Rows inserted, updated or deleted.
    pub fn rows_affected(&self) -> u64 {
        self.stats
            .as_ref()
            .map(|s| s.num_rows_inserted + s.num_rows_updated + s.num_rows_deleted)
            .unwrap_or(0)
    }

    /// Human-readable failure description.
    pub fn describe(&self) -> String {
        let message = self.message.as_deref().unwrap_or("no message");
        match (&self.code, &self.sql_state) {
            (Some(code), Some(state)) => format!("{message} (code {code}, SQL state {state})"),
            (Some(code), None) => format!("{message} (code {code})"),
            _ => message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::ColumnType;

    #[test]
    fn test_bindings_are_typed_and_positional() {
        let params = vec![
            SqlValue::Text("o1".into()),
            SqlValue::Bool(true),
            SqlValue::Null(ColumnType::Boolean),
        ];
        let json = serde_json::to_value(bindings(&params)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "1": {"type": "TEXT", "value": "o1"},
                "2": {"type": "BOOLEAN", "value": "true"},
                "3": {"type": "BOOLEAN", "value": null},
            })
        );
    }

    #[test]
    fn test_request_omits_unset_fields() {
        let request = StatementRequest {
            statement: "SELECT 1".into(),
            timeout: 0,
            database: "META".into(),
            schema: "PUBLIC".into(),
            warehouse: None,
            role: Some("SYNC_ROLE".into()),
            bindings: BTreeMap::new(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["role"], "SYNC_ROLE");
        assert!(json.get("warehouse").is_none());
        assert!(json.get("bindings").is_none());
    }

    #[test]
    fn test_response_decoding() {
        let body = r#"{
            "resultSetMetaData": {"numRows": 1},
            "statementHandle": "01a2-b3",
            "message": "Statement executed successfully.",
            "stats": {"numRowsInserted": 1, "numRowsUpdated": 0}
        }"#;
        let response: StatementResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.statement_handle.as_deref(), Some("01a2-b3"));
        assert_eq!(response.rows_affected(), 1);

        let error = r#"{"code": "002003", "sqlState": "42S02", "message": "Table 'CASOS_USO' does not exist"}"#;
        let response: StatementResponse = serde_json::from_str(error).unwrap();
        assert_eq!(response.rows_affected(), 0);
        assert_eq!(
            response.describe(),
            "Table 'CASOS_USO' does not exist (code 002003, SQL state 42S02)"
        );
    }
}
