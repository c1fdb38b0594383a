//! Store error type

use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// Error reported by the database engine
    Database(duckdb::Error),
    /// Operation needs a table the store does not hold
    MissingTable(String),
    /// Writing a table dump failed
    Dump(csv::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "database error: {e}"),
            Self::MissingTable(t) => write!(f, "table {t} does not exist"),
            Self::Dump(e) => write!(f, "dump error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
            Self::MissingTable(_) => None,
            Self::Dump(e) => Some(e),
        }
    }
}

impl From<duckdb::Error> for StoreError {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e)
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        Self::Dump(e)
    }
}
