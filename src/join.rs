use crate::errors::{TableError, TableResult};
use crate::table::{Column, Table};
use crate::types::Value;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
}

impl FromStr for JoinType {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" => Ok(JoinType::Left),
            "right" => Ok(JoinType::Right),
            "outer" => Ok(JoinType::Outer),
            _ => Err(TableError::UnsupportedJoinType(s.to_string())),
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Outer => "outer",
        };
        write!(f, "{}", name)
    }
}

/// What to do when a non-key column name exists in both tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Rename the right-hand column by prepending the prefix.
    Prefix(String),
    /// Fail with [`TableError::ColumnCollision`].
    Reject,
    /// Keep a single column; the right-hand value wins whenever a right row
    /// takes part in the output row.
    Overwrite,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        CollisionPolicy::Prefix("right_".to_string())
    }
}

/// Join settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinOptions {
    pub collision: CollisionPolicy,
    /// Whether a null key matches another null key.
    pub null_keys_match: bool,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            collision: CollisionPolicy::default(),
            null_keys_match: true,
        }
    }
}

impl JoinOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collision(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    pub fn null_keys_match(mut self, enabled: bool) -> Self {
        self.null_keys_match = enabled;
        self
    }

    pub fn from_json(json: &str) -> TableResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn keys_match(&self, left: &Value, right: &Value) -> bool {
        if !self.null_keys_match && (left.is_null() || right.is_null()) {
            return false;
        }
        left == right
    }
}

/// Where an output column takes its cells from.
#[derive(Debug, Clone, Copy)]
enum Source {
    Left(usize),
    Right(usize),
    /// The join key: left value when a left row is present, right otherwise.
    Key { left: usize, right: usize },
    /// A collided column under [`CollisionPolicy::Overwrite`].
    Merged { left: usize, right: usize },
}

/// One output row: the left and right row indices it is built from.
type Pair = (Option<usize>, Option<usize>);

impl Table {
    /// Joins two tables on a column with default [`JoinOptions`].
    pub fn join(&self, other: &Table, on: &str, how: JoinType) -> TableResult<Table> {
        self.join_with(other, on, how, &JoinOptions::default())
    }

    /// Nested-loop equality join.
    ///
    /// The output holds the left columns in order followed by the right
    /// columns except `on`. Rows are emitted left-major for inner, left and
    /// outer joins (outer appends unmatched left rows, then unmatched right
    /// rows); a right join scans the right table as the primary axis. Keys
    /// that occur several times on both sides produce one row per pair.
    pub fn join_with(
        &self,
        other: &Table,
        on: &str,
        how: JoinType,
        options: &JoinOptions,
    ) -> TableResult<Table> {
        let left_keys = self
            .get_column(on)
            .map_err(|_| TableError::join_column_missing(on))?;
        let right_keys = other
            .get_column(on)
            .map_err(|_| TableError::join_column_missing(on))?;

        let layout = plan_columns(self, other, on, &options.collision)?;
        let pairs = match_pairs(left_keys, right_keys, how, options);

        debug!(
            "{} join on '{}': {} x {} rows -> {} rows",
            how,
            on,
            left_keys.len(),
            right_keys.len(),
            pairs.len()
        );

        let mut result = Table::new();
        for (name, source) in layout {
            let values = pairs
                .iter()
                .map(|&(l, r)| cell(self, other, source, l, r))
                .collect();
            result.push_column(Column::new(name, values));
        }
        Ok(result)
    }
}

fn plan_columns(
    left: &Table,
    right: &Table,
    on: &str,
    policy: &CollisionPolicy,
) -> TableResult<Vec<(String, Source)>> {
    let left_columns = left.columns();
    let right_columns = right.columns();
    let right_position = |name: &str| right_columns.iter().position(|c| c.name == name);

    let mut layout = Vec::with_capacity(left_columns.len() + right_columns.len());
    for (l, column) in left_columns.iter().enumerate() {
        let source = match right_position(&column.name) {
            Some(r) if column.name == on => Source::Key { left: l, right: r },
            Some(r) if *policy == CollisionPolicy::Overwrite => {
                Source::Merged { left: l, right: r }
            }
            _ => Source::Left(l),
        };
        layout.push((column.name.clone(), source));
    }

    for (r, column) in right_columns.iter().enumerate() {
        if column.name == on {
            continue;
        }
        if !left.has_column(&column.name) {
            layout.push((column.name.clone(), Source::Right(r)));
            continue;
        }

        match policy {
            CollisionPolicy::Overwrite => {}
            CollisionPolicy::Reject => return Err(TableError::column_collision(&column.name)),
            CollisionPolicy::Prefix(prefix) => {
                let renamed = format!("{}{}", prefix, column.name);
                let taken = left.has_column(&renamed)
                    || right.has_column(&renamed)
                    || layout.iter().any(|(name, _)| *name == renamed);
                if taken {
                    return Err(TableError::column_collision(&renamed));
                }
                layout.push((renamed, Source::Right(r)));
            }
        }
    }

    Ok(layout)
}

fn match_pairs(left: &[Value], right: &[Value], how: JoinType, options: &JoinOptions) -> Vec<Pair> {
    let mut pairs = Vec::new();

    match how {
        JoinType::Inner => {
            for (i, left_value) in left.iter().enumerate() {
                for (j, right_value) in right.iter().enumerate() {
                    if options.keys_match(left_value, right_value) {
                        pairs.push((Some(i), Some(j)));
                    }
                }
            }
        }
        JoinType::Left => {
            for (i, left_value) in left.iter().enumerate() {
                let mut found_match = false;
                for (j, right_value) in right.iter().enumerate() {
                    if options.keys_match(left_value, right_value) {
                        pairs.push((Some(i), Some(j)));
                        found_match = true;
                    }
                }
                if !found_match {
                    pairs.push((Some(i), None));
                }
            }
        }
        JoinType::Right => {
            for (j, right_value) in right.iter().enumerate() {
                let mut found_match = false;
                for (i, left_value) in left.iter().enumerate() {
                    if options.keys_match(left_value, right_value) {
                        pairs.push((Some(i), Some(j)));
                        found_match = true;
                    }
                }
                if !found_match {
                    pairs.push((None, Some(j)));
                }
            }
        }
        JoinType::Outer => {
            let mut used_left = vec![false; left.len()];
            let mut used_right = vec![false; right.len()];

            for (i, left_value) in left.iter().enumerate() {
                for (j, right_value) in right.iter().enumerate() {
                    if options.keys_match(left_value, right_value) {
                        pairs.push((Some(i), Some(j)));
                        used_left[i] = true;
                        used_right[j] = true;
                    }
                }
            }

            pairs.extend(
                used_left
                    .iter()
                    .enumerate()
                    .filter(|(_, used)| !**used)
                    .map(|(i, _)| (Some(i), None)),
            );
            pairs.extend(
                used_right
                    .iter()
                    .enumerate()
                    .filter(|(_, used)| !**used)
                    .map(|(j, _)| (None, Some(j))),
            );
        }
    }

    pairs
}

fn cell(left: &Table, right: &Table, source: Source, l: Option<usize>, r: Option<usize>) -> Value {
    let left_value = |column: usize| l.and_then(|i| left.columns()[column].values.get(i).cloned());
    let right_value =
        |column: usize| r.and_then(|j| right.columns()[column].values.get(j).cloned());

    let value = match source {
        Source::Left(column) => left_value(column),
        Source::Right(column) => right_value(column),
        Source::Key { left: lc, right: rc } => left_value(lc).or_else(|| right_value(rc)),
        Source::Merged { left: lc, right: rc } => right_value(rc).or_else(|| left_value(lc)),
    };
    value.unwrap_or_default()
}
