use crate::errors::{TableError, TableResult};
use crate::predicate::ColumnPredicate;
use crate::row::Row;
use crate::types::Value;
use ahash::AHashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// A named column and its cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// In-memory column-oriented table.
///
/// Columns are kept in first-insertion order next to a name -> position
/// lookup, so iteration and export order is deterministic. All columns are
/// expected to have the same length; [`Table::add_column`] does not enforce
/// this, keeping the columns aligned is the caller's job.
///
/// Filters and joins always return a new table that owns its data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Column>", into = "Vec<Column>")]
pub struct Table {
    columns: Vec<Column>,
    index: AHashMap<String, usize>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table by adding the given columns one after another.
    pub fn from_columns<N, I>(columns: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Vec<Value>)>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.add_column(name, values);
        }
        table
    }

    /// Inserts a column, or replaces the values of an existing one in place.
    ///
    /// The length of `values` is not reconciled with the other columns.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Value>) {
        let name = name.into();
        if !self.columns.is_empty() && values.len() != self.row_count() {
            warn!(
                "Column '{}' has {} values but table has {} rows",
                name,
                values.len(),
                self.row_count()
            );
        }

        match self.index.get(&name) {
            Some(&position) => self.columns[position].values = values,
            None => {
                self.index.insert(name.clone(), self.columns.len());
                self.columns.push(Column::new(name, values));
            }
        }
    }

    /// Removes a column if it exists. Missing columns are ignored.
    pub fn remove_column(&mut self, name: &str) -> Option<Vec<Value>> {
        let position = self.index.remove(name)?;
        let column = self.columns.remove(position);

        // Later columns moved down by one
        for idx in self.index.values_mut() {
            if *idx > position {
                *idx -= 1;
            }
        }

        Some(column.values)
    }

    pub fn get_column(&self, name: &str) -> TableResult<&[Value]> {
        self.index
            .get(name)
            .map(|&position| self.columns[position].values.as_slice())
            .ok_or_else(|| TableError::column_not_found(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows, taken from the first column. A table without columns
    /// has no rows.
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Materializes the row at `index`.
    pub fn get_row(&self, index: usize) -> TableResult<Row> {
        if index >= self.row_count() {
            return Err(TableError::IndexOutOfRange {
                index,
                len: self.row_count(),
            });
        }

        let mut row = Row::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = column
                .values
                .get(index)
                .ok_or(TableError::IndexOutOfRange {
                    index,
                    len: self.row_count(),
                })?;
            row.insert(column.name.clone(), value.clone());
        }
        Ok(row)
    }

    pub fn get_value(&self, index: usize, column: &str) -> TableResult<&Value> {
        let values = self.get_column(column)?;
        values.get(index).ok_or(TableError::IndexOutOfRange {
            index,
            len: values.len(),
        })
    }

    /// Iterates over all rows in order.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.row_count()).map(move |index| self.row_at(index))
    }

    // Cells past the end of a short column read as null.
    fn row_at(&self, index: usize) -> Row {
        let mut row = Row::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = column.values.get(index).cloned().unwrap_or_default();
            row.insert(column.name.clone(), value);
        }
        row
    }

    /// Appends a row. Every existing column must have an entry in `record`;
    /// presence is checked for all columns before any column is touched, so
    /// a failed call leaves the table unchanged. Fields that do not name a
    /// column are ignored.
    pub fn add_row(&mut self, record: impl Into<Row>) -> TableResult<()> {
        let mut record = record.into();

        if let Some(missing) = self.columns.iter().find(|c| !record.contains(&c.name)) {
            return Err(TableError::missing_field(&missing.name));
        }

        for column in &mut self.columns {
            let value = record.data.remove(&column.name).unwrap_or_default();
            column.values.push(value);
        }
        Ok(())
    }

    /// Returns a new table holding the rows for which `predicate` is true, in
    /// their original order.
    pub fn filter_rows<F>(&self, predicate: F) -> Table
    where
        F: Fn(&Row) -> bool,
    {
        let keep: Vec<usize> = (0..self.row_count())
            .filter(|&index| predicate(&self.row_at(index)))
            .collect();

        debug!("Filter kept {} of {} rows", keep.len(), self.row_count());
        self.take_rows(&keep)
    }

    /// Filters on a single column with a declarative predicate.
    pub fn filter_where(&self, column: &str, predicate: &ColumnPredicate) -> TableResult<Table> {
        let values = self.get_column(column)?;
        let keep: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, value)| predicate.evaluate(value))
            .map(|(index, _)| index)
            .collect();

        debug!("Filter on '{}' kept {} of {} rows", column, keep.len(), self.row_count());
        Ok(self.take_rows(&keep))
    }

    // Copies the given rows, in the given order, into a new table with the
    // same columns.
    pub(crate) fn take_rows(&self, indices: &[usize]) -> Table {
        let mut table = Table::new();
        for column in &self.columns {
            let values = indices
                .iter()
                .map(|&index| column.values.get(index).cloned().unwrap_or_default())
                .collect();
            table.push_column(Column::new(column.name.clone(), values));
        }
        table
    }

    // Appends a column known not to exist yet.
    pub(crate) fn push_column(&mut self, column: Column) {
        self.index.insert(column.name.clone(), self.columns.len());
        self.columns.push(column);
    }

    /// Serializes the table as a JSON list of columns.
    pub fn to_json(&self) -> TableResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> TableResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl From<Vec<Column>> for Table {
    fn from(columns: Vec<Column>) -> Self {
        let mut table = Table::new();
        for column in columns {
            table.add_column(column.name, column.values);
        }
        table
    }
}

impl From<Table> for Vec<Column> {
    fn from(table: Table) -> Self {
        table.columns
    }
}
