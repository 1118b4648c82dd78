//! Error types for relmap

use thiserror::Error;

/// Result type alias for relmap operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for mapping, statement generation and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Invalid mapping definition
    #[error("Configuration error: {0}")]
    Config(String),

    /// A literal template segment contains the placeholder character
    #[error("Illegal character '?' found in SQL literal: {0:?}")]
    PlaceholderInLiteral(String),

    /// Malformed SQL template (hole/argument mismatch, stray braces)
    #[error("Template error: {0}")]
    Template(String),

    /// `SqlExpr::join` called with no expressions
    #[error("Cannot join an empty list of SQL expressions")]
    EmptyJoin,

    /// Input data names a property the mapping does not declare
    #[error("Unknown property '{property}' for table '{table}'")]
    UnknownProperty { table: String, property: String },

    /// A column required by a property is absent from a row
    #[error("Missing column '{column}' for property '{property}'")]
    MissingColumn { property: String, column: String },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Query execution error
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Reading a mapping file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a missing column error
    pub fn missing_column(property: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            property: property.into(),
            column: column.into(),
        }
    }

    /// Create an unknown property error
    pub fn unknown_property(table: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            table: table.into(),
            property: property.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    #[cfg(feature = "postgres")]
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{constraint}: {message}")),
                "23503" => return Self::ForeignKeyViolation(format!("{constraint}: {message}")),
                "23514" => return Self::CheckViolation(format!("{constraint}: {message}")),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for OrmError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
