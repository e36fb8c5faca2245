//! Statement parameter binding

use sync_core::ColumnType;
use tokio_postgres::types::ToSql;
use warehouse_sink::SqlValue;

/// Owned parameter, kept `Send` so it can be held across an await.
pub type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// Convert statement values into tokio-postgres parameters.
///
/// NULLs are bound as `Option::None` of the column's Rust type, so the
/// `$n::text` / `$n::boolean` casts in the rendered SQL always line up.
pub fn bind_params(values: &[SqlValue]) -> Vec<BoxedParam> {
    values
        .iter()
        .map(|value| -> BoxedParam {
            match value {
                SqlValue::Text(s) => Box::new(s.clone()),
                SqlValue::Bool(b) => Box::new(*b),
                SqlValue::Null(ColumnType::String) => Box::new(None::<String>),
                SqlValue::Null(ColumnType::Boolean) => Box::new(None::<bool>),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use tokio_postgres::types::{IsNull, Type};

    fn encode(param: &BoxedParam, ty: &Type) -> (IsNull, Vec<u8>) {
        let mut buf = BytesMut::new();
        let is_null = param.to_sql_checked(ty, &mut buf).unwrap();
        (is_null, buf.to_vec())
    }

    #[test]
    fn test_text_and_bool() {
        let params = bind_params(&[SqlValue::Text("o1".into()), SqlValue::Bool(true)]);
        assert_eq!(params.len(), 2);

        let (is_null, bytes) = encode(&params[0], &Type::TEXT);
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(bytes, b"o1");

        let (is_null, bytes) = encode(&params[1], &Type::BOOL);
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(bytes, vec![1]);
    }

    #[test]
    fn test_typed_nulls() {
        let params = bind_params(&[
            SqlValue::Null(ColumnType::String),
            SqlValue::Null(ColumnType::Boolean),
        ]);

        let (is_null, _) = encode(&params[0], &Type::TEXT);
        assert!(matches!(is_null, IsNull::Yes));
        let (is_null, _) = encode(&params[1], &Type::BOOL);
        assert!(matches!(is_null, IsNull::Yes));

        // A boolean NULL does not accept a text slot
        let mut buf = BytesMut::new();
        assert!(params[1].to_sql_checked(&Type::TEXT, &mut buf).is_err());
    }
}
