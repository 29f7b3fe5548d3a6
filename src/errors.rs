use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    // Column errors
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
    #[error("Row index {index} out of range for table with {len} rows")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Missing value for column: {0}")]
    MissingField(String),

    // Join errors
    #[error("Join column '{0}' does not exist in one of the tables")]
    JoinColumnMissing(String),
    #[error("Unsupported join type: {0}")]
    UnsupportedJoinType(String),
    #[error("Column '{0}' exists in both tables")]
    ColumnCollision(String),

    // Bridge errors
    #[error("Table has no columns")]
    EmptyTable,
    #[error("Invalid result set: expected {expected} values per row, got {actual}")]
    InvalidResultSet { expected: usize, actual: usize },
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type TableResult<T> = Result<T, TableError>;

// Common constructors
impl TableError {
    pub fn column_not_found(column_name: &str) -> Self {
        TableError::ColumnNotFound(column_name.to_string())
    }

    pub fn missing_field(column_name: &str) -> Self {
        TableError::MissingField(column_name.to_string())
    }

    pub fn join_column_missing(column_name: &str) -> Self {
        TableError::JoinColumnMissing(column_name.to_string())
    }

    pub fn column_collision(column_name: &str) -> Self {
        TableError::ColumnCollision(column_name.to_string())
    }

    pub fn invalid_identifier(name: &str) -> Self {
        TableError::InvalidIdentifier(name.to_string())
    }

    pub fn driver<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TableError::Driver(Box::new(err))
    }
}
