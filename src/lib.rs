//! In-memory columnar tables with row access, filtering and joins, plus a
//! thin bridge for loading query results and writing rows back.

pub mod database;
pub mod errors;
pub mod join;
pub mod predicate;
pub mod row;
pub mod table;
pub mod types;

pub use database::{insert_statement, ColumnMeta, Connection, Database, Dialect, Field, ResultSet};
pub use errors::{TableError, TableResult};
pub use join::{CollisionPolicy, JoinOptions, JoinType};
pub use predicate::ColumnPredicate;
pub use row::Row;
pub use table::{Column, Table};
pub use types::{RawValue, Value, ValueKind};
