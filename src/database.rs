//! Bridge between [`Table`] and a relational store.
//!
//! The driver itself stays outside this crate. A [`Connection`] hands back
//! query results as a [`ResultSet`] of raw driver values, which are narrowed
//! by their reported column type and loaded into a table one column at a
//! time. Writing goes the other way: one `INSERT` per row, issued through
//! [`Connection::execute`]. Batching, transactions and retries are the
//! connection's business.

use crate::errors::{TableError, TableResult};
use crate::table::Table;
use crate::types::{RawValue, Value};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Name and database type of a result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub type_name: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Row-major query result as produced by a driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<RawValue>>,
}

/// One named output field with all of its values.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub type_name: String,
    pub values: Vec<RawValue>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<RawValue>) {
        self.rows.push(row);
    }

    /// Pivots the rows into one [`Field`] per column.
    pub fn into_fields(self) -> TableResult<Vec<Field>> {
        let expected = self.columns.len();
        let mut fields: Vec<Field> = self
            .columns
            .into_iter()
            .map(|meta| Field {
                name: meta.name,
                type_name: meta.type_name,
                values: Vec::with_capacity(self.rows.len()),
            })
            .collect();

        for row in self.rows {
            if row.len() != expected {
                return Err(TableError::InvalidResultSet {
                    expected,
                    actual: row.len(),
                });
            }
            for (field, value) in fields.iter_mut().zip(row) {
                field.values.push(value);
            }
        }

        Ok(fields)
    }
}

impl Table {
    /// Loads fields into a new table, narrowing each value by the field's
    /// reported type name.
    pub fn from_fields(fields: impl IntoIterator<Item = Field>) -> Table {
        let mut table = Table::new();
        for field in fields {
            let type_name = field.type_name;
            let values = field
                .values
                .into_iter()
                .map(|raw| Value::from_raw(&type_name, raw))
                .collect();
            table.add_column(field.name, values);
        }
        table
    }
}

/// The driver-facing side of the bridge.
pub trait Connection {
    type Error: std::error::Error + Send + Sync + 'static;

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet, Self::Error>;

    /// Runs a statement and returns the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, Self::Error>;

    fn close(self) -> Result<(), Self::Error>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Bind parameter style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// `?` (SQLite, MySQL)
    #[default]
    Question,
    /// `$1, $2, ...` (PostgreSQL)
    Numbered,
}

impl Dialect {
    pub fn placeholders(&self, count: usize) -> Vec<String> {
        match self {
            Dialect::Question => (0..count).map(|_| "?".to_string()).collect(),
            Dialect::Numbered => (1..=count).map(|i| format!("${}", i)).collect(),
        }
    }
}

const MAX_IDENTIFIER_LEN: usize = 64;

// Bare names must be plain words. Quoted names may hold anything but NUL.
fn validate_identifier(name: &str, quoted: bool) -> TableResult<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && !name.contains('\0')
        && (quoted
            || (!name.starts_with(|c: char| c.is_ascii_digit())
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')));
    if valid {
        Ok(())
    } else {
        Err(TableError::invalid_identifier(name))
    }
}

fn relation_identifier(relation: &str, quote: bool) -> TableResult<String> {
    let parts: Vec<&str> = relation.split('.').collect();
    if parts.len() > 2 {
        return Err(TableError::invalid_identifier(relation));
    }
    for part in &parts {
        validate_identifier(part, quote).map_err(|_| TableError::invalid_identifier(relation))?;
    }
    Ok(parts
        .iter()
        .map(|part| quote_identifier(part, quote))
        .collect::<Vec<_>>()
        .join("."))
}

fn quote_identifier(name: &str, quote: bool) -> String {
    if quote {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

/// Builds `INSERT INTO relation (columns) VALUES (placeholders)`.
pub fn insert_statement(
    relation: &str,
    columns: &[String],
    dialect: Dialect,
    quote_identifiers: bool,
) -> TableResult<String> {
    if columns.is_empty() {
        return Err(TableError::EmptyTable);
    }

    let relation = relation_identifier(relation, quote_identifiers)?;
    let mut names = Vec::with_capacity(columns.len());
    for column in columns {
        validate_identifier(column, quote_identifiers)?;
        names.push(quote_identifier(column, quote_identifiers));
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        relation,
        names.join(", "),
        dialect.placeholders(columns.len()).join(", ")
    ))
}

/// A table-aware wrapper around a [`Connection`].
#[derive(Debug)]
pub struct Database<C: Connection> {
    conn: C,
    dialect: Dialect,
    quote_identifiers: bool,
}

impl<C: Connection> Database<C> {
    pub fn new(conn: C) -> Self {
        Self::with_dialect(conn, Dialect::default())
    }

    pub fn with_dialect(conn: C, dialect: Dialect) -> Self {
        Self {
            conn,
            dialect,
            quote_identifiers: false,
        }
    }

    /// Wraps relation and column names in double quotes when building
    /// statements. Quoted names may contain any character except NUL (an
    /// embedded `"` is doubled), so columns such as `count(*)` can be written
    /// back. Without quoting, names must be letters, digits and underscores.
    pub fn with_identifier_quoting(mut self, enabled: bool) -> Self {
        self.quote_identifiers = enabled;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Runs a query and loads the result into a table.
    pub fn query(&mut self, sql: &str, params: &[Value]) -> TableResult<Table> {
        let result = self.conn.query(sql, params).map_err(TableError::driver)?;
        let table = Table::from_fields(result.into_fields()?);
        debug!(
            "Query returned {} columns and {} rows",
            table.column_count(),
            table.row_count()
        );
        Ok(table)
    }

    /// Writes every row of `table` into `relation`, one statement per row,
    /// with values in the table's column order. Returns the number of rows
    /// written. Stops at the first failing row.
    pub fn insert(&mut self, relation: &str, table: &Table) -> TableResult<usize> {
        if table.column_count() == 0 {
            return Err(TableError::EmptyTable);
        }

        let columns = table.column_names();
        let sql = insert_statement(relation, &columns, self.dialect, self.quote_identifiers)?;
        debug!("Inserting {} rows into {}", table.row_count(), relation);

        let mut params = Vec::with_capacity(columns.len());
        for index in 0..table.row_count() {
            let row = table.get_row(index)?;
            params.extend(
                columns
                    .iter()
                    .map(|column| row.get(column).cloned().unwrap_or_default()),
            );

            trace!("{} {:?}", sql, params);
            self.conn.execute(&sql, &params).map_err(TableError::driver)?;
            params.clear();
        }

        Ok(table.row_count())
    }

    pub fn close(self) -> TableResult<()> {
        self.conn.close().map_err(TableError::driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("mock failure: {0}")]
    struct MockError(String);

    #[derive(Debug, Default)]
    struct MockConnection {
        result: ResultSet,
        executed: Vec<(String, Vec<Value>)>,
        fail_after: Option<usize>,
    }

    impl Connection for MockConnection {
        type Error = MockError;

        fn query(&mut self, _sql: &str, _params: &[Value]) -> Result<ResultSet, MockError> {
            Ok(self.result.clone())
        }

        fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, MockError> {
            if self.fail_after == Some(self.executed.len()) {
                return Err(MockError("duplicate key".to_string()));
            }
            self.executed.push((sql.to_string(), params.to_vec()));
            Ok(1)
        }
    }

    fn users_result() -> ResultSet {
        let mut result = ResultSet::new(vec![
            ColumnMeta::new("id", "INTEGER"),
            ColumnMeta::new("name", "VARCHAR"),
            ColumnMeta::new("balance", "DOUBLE"),
            ColumnMeta::new("avatar", "BYTEA"),
        ]);
        result.push_row(vec![
            RawValue::Int(1),
            RawValue::Bytes(b"alice".to_vec()),
            RawValue::Float(10.5),
            RawValue::Bytes(vec![0xff]),
        ]);
        result.push_row(vec![
            RawValue::Int(2),
            RawValue::Null,
            RawValue::Float(0.0),
            RawValue::Null,
        ]);
        result
    }

    #[test]
    fn test_query_builds_table() {
        let _ = env_logger::builder().is_test(true).try_init();
        let conn = MockConnection {
            result: users_result(),
            ..Default::default()
        };
        let mut db = Database::new(conn);

        let table = db.query("SELECT * FROM users", &[]).unwrap();
        assert_eq!(table.column_names(), vec!["id", "name", "balance", "avatar"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get_value(0, "name").unwrap(), &Value::from("alice"));
        assert_eq!(table.get_value(0, "balance").unwrap(), &Value::Float(10.5));
        assert_eq!(table.get_value(0, "avatar").unwrap(), &Value::Other(vec![0xff]));
        assert_eq!(table.get_value(1, "name").unwrap(), &Value::Null);
    }

    #[test]
    fn test_ragged_result_set_is_rejected() {
        let mut result = ResultSet::new(vec![ColumnMeta::new("id", "INT")]);
        result.push_row(vec![RawValue::Int(1), RawValue::Int(2)]);

        assert!(matches!(
            result.into_fields(),
            Err(TableError::InvalidResultSet { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_insert_issues_one_statement_per_row() {
        let table = Table::from_columns([
            ("id", vec![Value::Int(1), Value::Int(2)]),
            ("name", vec![Value::from("a"), Value::Null]),
        ]);
        let mut db = Database::new(MockConnection::default());

        let written = db.insert("users", &table).unwrap();
        assert_eq!(written, 2);

        let executed = &db.connection().executed;
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].0, "INSERT INTO users (id, name) VALUES (?, ?)");
        assert_eq!(executed[0].1, vec![Value::Int(1), Value::from("a")]);
        assert_eq!(executed[1].1, vec![Value::Int(2), Value::Null]);
    }

    #[test]
    fn test_insert_numbered_and_quoted() {
        let table = Table::from_columns([
            ("id", vec![Value::Int(1)]),
            ("score", vec![Value::Int(5)]),
        ]);
        let mut db = Database::with_dialect(MockConnection::default(), Dialect::Numbered)
            .with_identifier_quoting(true);

        db.insert("public.scores", &table).unwrap();
        assert_eq!(
            db.connection().executed[0].0,
            r#"INSERT INTO "public"."scores" ("id", "score") VALUES ($1, $2)"#
        );
    }

    #[test]
    fn test_insert_empty_table() {
        let mut db = Database::new(MockConnection::default());
        assert!(matches!(
            db.insert("users", &Table::new()),
            Err(TableError::EmptyTable)
        ));

        // columns but no rows: nothing to write
        let table = Table::from_columns([("id", Vec::new())]);
        assert_eq!(db.insert("users", &table).unwrap(), 0);
        assert!(db.connection().executed.is_empty());
    }

    #[test]
    fn test_insert_rejects_bad_identifiers() {
        let table = Table::from_columns([("id", vec![Value::Int(1)])]);
        let mut db = Database::new(MockConnection::default());

        assert!(matches!(
            db.insert("users; DROP TABLE users", &table),
            Err(TableError::InvalidIdentifier(_))
        ));

        let table = Table::from_columns([("1st", vec![Value::Int(1)])]);
        assert!(matches!(
            db.insert("users", &table),
            Err(TableError::InvalidIdentifier(name)) if name == "1st"
        ));
        assert!(db.connection().executed.is_empty());
    }

    #[test]
    fn test_quoted_identifiers_allow_any_name() {
        let table = Table::from_columns([
            ("count(*)", vec![Value::Int(3)]),
            ("say \"hi\"", vec![Value::from("x")]),
        ]);
        let mut db = Database::new(MockConnection::default()).with_identifier_quoting(true);

        db.insert("my table", &table).unwrap();
        assert_eq!(
            db.connection().executed[0].0,
            r#"INSERT INTO "my table" ("count(*)", "say ""hi""") VALUES (?, ?)"#
        );

        // the same names are still rejected unquoted
        let mut db = Database::new(MockConnection::default());
        assert!(matches!(
            db.insert("stats", &table),
            Err(TableError::InvalidIdentifier(name)) if name == "count(*)"
        ));
    }

    #[test]
    fn test_quoted_identifiers_still_checked() {
        let mut db = Database::new(MockConnection::default()).with_identifier_quoting(true);

        let table = Table::from_columns([("", vec![Value::Int(1)])]);
        assert!(matches!(
            db.insert("users", &table),
            Err(TableError::InvalidIdentifier(_))
        ));

        let table = Table::from_columns([("a".repeat(65), vec![Value::Int(1)])]);
        assert!(matches!(
            db.insert("users", &table),
            Err(TableError::InvalidIdentifier(_))
        ));
        assert!(db.connection().executed.is_empty());
    }

    #[test]
    fn test_insert_stops_at_first_failure() {
        let table =
            Table::from_columns([("id", vec![Value::Int(1), Value::Int(2), Value::Int(3)])]);
        let conn = MockConnection {
            fail_after: Some(1),
            ..Default::default()
        };
        let mut db = Database::new(conn);

        let err = db.insert("users", &table).unwrap_err();
        assert!(matches!(err, TableError::Driver(_)));
        assert!(err.to_string().contains("duplicate key"));
        assert_eq!(db.connection().executed.len(), 1);
    }

    #[test]
    fn test_query_then_insert_roundtrip() {
        let conn = MockConnection {
            result: users_result(),
            ..Default::default()
        };
        let mut db = Database::new(conn);

        let table = db.query("SELECT * FROM users", &[]).unwrap();
        let active = table.filter_rows(|row| !matches!(row.get("name"), Some(Value::Null)));
        db.insert("active_users", &active).unwrap();

        let executed = &db.connection().executed;
        assert_eq!(executed.len(), 1);
        assert_eq!(
            executed[0].1,
            vec![
                Value::Int(1),
                Value::from("alice"),
                Value::Float(10.5),
                Value::Other(vec![0xff]),
            ]
        );
        db.close().unwrap();
    }
}
