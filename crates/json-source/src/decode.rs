//! JSON decoding into snapshot records

use crate::error::SourceLoadError;
use serde_json::Value;
use sync_core::{Record, ScalarValue, Snapshot};

/// Decode raw snapshot bytes into a [`Snapshot`].
///
/// `source` names the snapshot and `resource` is used in error messages.
/// The top level must be an array; every element must be an object whose
/// values are strings, booleans, numbers, or null. Numbers are kept as their
/// JSON text.
pub fn decode_snapshot(
    source: &str,
    resource: &str,
    bytes: &[u8],
) -> Result<Snapshot, SourceLoadError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| SourceLoadError::Malformed {
        resource: resource.to_string(),
        source: e,
    })?;

    let elements = match value {
        Value::Array(elements) => elements,
        other => {
            return Err(SourceLoadError::NotAnArray {
                resource: resource.to_string(),
                found: json_kind(&other),
            });
        }
    };

    let mut records = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        let obj = match element {
            Value::Object(obj) => obj,
            other => {
                return Err(SourceLoadError::NotAnObject {
                    resource: resource.to_string(),
                    index,
                    found: json_kind(&other),
                });
            }
        };

        let mut record = Record::new();
        for (column, val) in obj {
            let scalar = match val {
                Value::Null => ScalarValue::Null,
                Value::Bool(b) => ScalarValue::Bool(b),
                Value::String(s) => ScalarValue::Text(s),
                Value::Number(n) => ScalarValue::Text(n.to_string()),
                nested @ (Value::Array(_) | Value::Object(_)) => {
                    return Err(SourceLoadError::NestedValue {
                        resource: resource.to_string(),
                        index,
                        column,
                        found: json_kind(&nested),
                    });
                }
            };
            record.insert(column, scalar);
        }
        records.push(record);
    }

    tracing::debug!("Decoded {} records from {}", records.len(), resource);

    Ok(Snapshot::new(source, records))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_flat_objects() {
        let json = br#"[
            {"id_origen": "o1", "nombre_origen": "X", "activo": "true", "id_caso_uso": "c1"},
            {"id_origen": "o2", "activo": false, "nombre_origen": null, "orden": 3}
        ]"#;

        let snapshot = decode_snapshot("origenes", "origenes.json", json).unwrap();
        assert_eq!(snapshot.source, "origenes");
        assert_eq!(snapshot.len(), 2);

        let first = &snapshot.records[0];
        assert_eq!(first.get("activo"), Some(&ScalarValue::text("true")));
        assert_eq!(first.len(), 4);

        let second = &snapshot.records[1];
        assert_eq!(second.get("activo"), Some(&ScalarValue::Bool(false)));
        assert_eq!(second.get("nombre_origen"), Some(&ScalarValue::Null));
        assert_eq!(second.get("orden"), Some(&ScalarValue::text("3")));
        assert_eq!(second.get("id_caso_uso"), None);
    }

    #[test]
    fn test_decode_empty_array() {
        let snapshot = decode_snapshot("s", "s.json", b"[]").unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_malformed_json() {
        let err = decode_snapshot("s", "s.json", b"[{\"id\": ").unwrap_err();
        assert!(matches!(err, SourceLoadError::Malformed { .. }));
        assert_eq!(err.resource(), "s.json");
    }

    #[test]
    fn test_top_level_must_be_array() {
        // Wrapping the records in an object keyed by table name is rejected
        let err = decode_snapshot("s", "s.json", br#"{"origenes": []}"#).unwrap_err();
        assert!(matches!(err, SourceLoadError::NotAnArray { found: "object", .. }));
    }

    #[test]
    fn test_elements_must_be_objects() {
        let err = decode_snapshot("s", "s.json", br#"[{"id": "a"}, "b"]"#).unwrap_err();
        assert!(matches!(
            err,
            SourceLoadError::NotAnObject { index: 1, found: "string", .. }
        ));
    }

    #[test]
    fn test_nested_values_rejected() {
        let err = decode_snapshot("s", "s.json", br#"[{"id": "a", "tags": ["x"]}]"#).unwrap_err();
        assert!(matches!(
            err,
            SourceLoadError::NestedValue { index: 0, ref column, found: "array", .. } if column == "tags"
        ));
    }
}
