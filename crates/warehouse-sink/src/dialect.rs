//! SQL dialects.
//!
//! Renders [`Statement`]s into SQL text with positional placeholders and a
//! parallel list of parameters. Identifiers are emitted unquoted; the
//! registry only admits `[A-Za-z_][A-Za-z0-9_]*` names, and record columns
//! are checked against the registry before a statement is built.

use crate::statement::{CreateMode, MergeStatement, Statement};
use crate::value::SqlValue;
use sync_core::{ColumnType, TableSpec};

/// Warehouse SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Snowflake (`?` placeholders bound through the SQL API)
    #[default]
    Snowflake,
    /// PostgreSQL 15+ (`$n` placeholders, MERGE support)
    PostgreSQL,
}

/// SQL text plus the parameters bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Dialect {
    /// Get the dialect name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Snowflake => "snowflake",
            Self::PostgreSQL => "postgresql",
        }
    }

    /// Native type for a declared column type.
    pub fn native_type(&self, column_type: ColumnType) -> &'static str {
        match (self, column_type) {
            (Self::Snowflake, ColumnType::String) => "STRING",
            (Self::PostgreSQL, ColumnType::String) => "TEXT",
            (_, ColumnType::Boolean) => "BOOLEAN",
        }
    }

    /// Placeholder for the 1-based parameter `index` of the given type.
    pub fn placeholder(&self, index: usize, column_type: ColumnType) -> String {
        match self {
            Self::Snowflake => "?".to_string(),
            Self::PostgreSQL => format!(
                "${index}::{}",
                self.native_type(column_type).to_lowercase()
            ),
        }
    }

    /// Column list and constraints of a table, one item per line.
    pub fn table_definition(&self, spec: &TableSpec) -> String {
        let mut items: Vec<String> = spec
            .columns
            .iter()
            .map(|c| {
                let not_null = if !c.nullable || spec.is_key_column(&c.name) {
                    " NOT NULL"
                } else {
                    ""
                };
                format!("{} {}{}", c.name, self.native_type(c.column_type), not_null)
            })
            .collect();

        items.push(format!("PRIMARY KEY ({})", spec.key.join(", ")));

        for fk in &spec.foreign_keys {
            items.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                fk.columns.join(", "),
                fk.references,
                fk.referenced_columns.join(", ")
            ));
        }

        items
            .iter()
            .map(|item| format!("    {item}"))
            .collect::<Vec<_>>()
            .join(",\n")
    }

    /// DDL creating (or replacing) a table.
    pub fn create_table_sql(&self, spec: &TableSpec, mode: CreateMode) -> String {
        let body = self.table_definition(spec);
        match (self, mode) {
            (_, CreateMode::IfNotExists) => {
                format!("CREATE TABLE IF NOT EXISTS {} (\n{}\n)", spec.table, body)
            }
            (Self::Snowflake, CreateMode::Replace) => {
                format!("CREATE OR REPLACE TABLE {} (\n{}\n)", spec.table, body)
            }
            // No CREATE OR REPLACE TABLE; sent as one batch
            (Self::PostgreSQL, CreateMode::Replace) => format!(
                "DROP TABLE IF EXISTS {} CASCADE;\nCREATE TABLE {} (\n{}\n)",
                spec.table, spec.table, body
            ),
        }
    }

    /// MERGE for one record.
    pub fn merge_sql(&self, merge: &MergeStatement) -> RenderedStatement {
        let projection: Vec<String> = merge
            .columns
            .iter()
            .zip(&merge.values)
            .enumerate()
            .map(|(i, (column, value))| {
                format!("{} AS {}", self.placeholder(i + 1, value.column_type()), column)
            })
            .collect();

        let on: Vec<String> = merge
            .key
            .iter()
            .map(|k| format!("target.{k} = incoming.{k}"))
            .collect();

        let updates: Vec<String> = merge
            .update_columns()
            .map(|c| format!("{c} = incoming.{c}"))
            .collect();

        let insert_values: Vec<String> = merge
            .columns
            .iter()
            .map(|c| format!("incoming.{c}"))
            .collect();

        let mut sql = format!(
            "MERGE INTO {} AS target\nUSING (SELECT {}) AS incoming\nON {}\n",
            merge.table,
            projection.join(", "),
            on.join(" AND ")
        );
        if !updates.is_empty() {
            sql.push_str(&format!(
                "WHEN MATCHED THEN UPDATE SET {}\n",
                updates.join(", ")
            ));
        }
        sql.push_str(&format!(
            "WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
            merge.columns.join(", "),
            insert_values.join(", ")
        ));

        RenderedStatement {
            sql,
            params: merge.values.clone(),
        }
    }

    /// Render any statement.
    pub fn render(&self, statement: &Statement) -> RenderedStatement {
        match statement {
            Statement::CreateTable { spec, mode } => RenderedStatement {
                sql: self.create_table_sql(spec, *mode),
                params: Vec::new(),
            },
            Statement::Merge(merge) => self.merge_sql(merge),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snowflake" => Ok(Self::Snowflake),
            "postgresql" | "postgres" => Ok(Self::PostgreSQL),
            _ => Err(format!(
                "Invalid dialect: '{s}'. Expected 'snowflake' or 'postgresql'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::{ColumnDefinition, ForeignKey};

    fn origenes() -> TableSpec {
        TableSpec::new("origenes", "origenes")
            .column(ColumnDefinition::new("id_origen", ColumnType::String))
            .column(ColumnDefinition::new("nombre_origen", ColumnType::String))
            .column(ColumnDefinition::new("activo", ColumnType::Boolean))
            .column(ColumnDefinition::new("id_caso_uso", ColumnType::String))
            .key(["id_origen"])
            .foreign_key(ForeignKey::new(
                ["id_caso_uso"],
                "casos_uso",
                ["id_caso_uso"],
            ))
    }

    fn record_merge() -> MergeStatement {
        MergeStatement::new(
            "origenes",
            vec!["id_origen".into()],
            vec![
                ("id_origen".into(), SqlValue::Text("o1".into())),
                ("nombre_origen".into(), SqlValue::Text("X".into())),
                ("activo".into(), SqlValue::Bool(true)),
            ],
        )
    }

    #[test]
    fn test_create_if_not_exists_snowflake() {
        let sql = Dialect::Snowflake.create_table_sql(&origenes(), CreateMode::IfNotExists);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS origenes (\n\
             \x20   id_origen STRING NOT NULL,\n\
             \x20   nombre_origen STRING,\n\
             \x20   activo BOOLEAN,\n\
             \x20   id_caso_uso STRING,\n\
             \x20   PRIMARY KEY (id_origen),\n\
             \x20   FOREIGN KEY (id_caso_uso) REFERENCES casos_uso (id_caso_uso)\n\
             )"
        );
    }

    #[test]
    fn test_replace_per_dialect() {
        let snowflake = Dialect::Snowflake.create_table_sql(&origenes(), CreateMode::Replace);
        assert!(snowflake.starts_with("CREATE OR REPLACE TABLE origenes ("));

        let postgres = Dialect::PostgreSQL.create_table_sql(&origenes(), CreateMode::Replace);
        assert!(postgres.starts_with("DROP TABLE IF EXISTS origenes CASCADE;\nCREATE TABLE origenes ("));
        assert!(postgres.contains("id_origen TEXT NOT NULL"));
    }

    #[test]
    fn test_merge_snowflake() {
        let rendered = Dialect::Snowflake.merge_sql(&record_merge());
        assert_eq!(
            rendered.sql,
            "MERGE INTO origenes AS target\n\
             USING (SELECT ? AS id_origen, ? AS nombre_origen, ? AS activo) AS incoming\n\
             ON target.id_origen = incoming.id_origen\n\
             WHEN MATCHED THEN UPDATE SET nombre_origen = incoming.nombre_origen, activo = incoming.activo\n\
             WHEN NOT MATCHED THEN INSERT (id_origen, nombre_origen, activo) \
             VALUES (incoming.id_origen, incoming.nombre_origen, incoming.activo)"
        );
        assert_eq!(rendered.params.len(), 3);
        assert_eq!(rendered.params[2], SqlValue::Bool(true));
    }

    #[test]
    fn test_merge_values_never_inlined() {
        let merge = MergeStatement::new(
            "origenes",
            vec!["id_origen".into()],
            vec![
                ("id_origen".into(), SqlValue::Text("o'1".into())),
                (
                    "nombre_origen".into(),
                    SqlValue::Text("x'); DROP TABLE origenes; --".into()),
                ),
            ],
        );
        let rendered = Dialect::Snowflake.merge_sql(&merge);
        assert!(!rendered.sql.contains("DROP TABLE"));
        assert!(!rendered.sql.contains("o'1"));
    }

    #[test]
    fn test_merge_composite_key_is_conjunction() {
        let merge = MergeStatement::new(
            "pairs",
            vec!["a".into(), "b".into()],
            vec![
                ("a".into(), SqlValue::Text("1".into())),
                ("b".into(), SqlValue::Text("2".into())),
                ("label".into(), SqlValue::Null(ColumnType::String)),
            ],
        );
        let rendered = Dialect::PostgreSQL.merge_sql(&merge);
        assert!(rendered
            .sql
            .contains("ON target.a = incoming.a AND target.b = incoming.b\n"));
        assert!(rendered
            .sql
            .contains("USING (SELECT $1::text AS a, $2::text AS b, $3::text AS label)"));
        assert!(rendered.sql.contains("UPDATE SET label = incoming.label\n"));
    }

    #[test]
    fn test_merge_key_only_record_has_no_update_clause() {
        let merge = MergeStatement::new(
            "pairs",
            vec!["a".into()],
            vec![("a".into(), SqlValue::Text("1".into()))],
        );
        let rendered = Dialect::Snowflake.merge_sql(&merge);
        assert!(!rendered.sql.contains("WHEN MATCHED"));
        assert!(rendered.sql.ends_with("WHEN NOT MATCHED THEN INSERT (a) VALUES (incoming.a)"));
    }

    #[test]
    fn test_postgres_boolean_placeholder() {
        assert_eq!(
            Dialect::PostgreSQL.placeholder(2, ColumnType::Boolean),
            "$2::boolean"
        );
        assert_eq!(Dialect::Snowflake.placeholder(2, ColumnType::Boolean), "?");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("snowflake".parse::<Dialect>().unwrap(), Dialect::Snowflake);
        assert_eq!("Postgres".parse::<Dialect>().unwrap(), Dialect::PostgreSQL);
        assert_eq!("postgresql".parse::<Dialect>().unwrap(), Dialect::PostgreSQL);
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Dialect::Snowflake.to_string(), "snowflake");
        assert_eq!(Dialect::PostgreSQL.to_string(), "postgresql");
    }
}
