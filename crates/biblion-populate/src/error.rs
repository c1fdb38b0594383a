//! Error type for population calls

use biblion_core::SourceError;
use biblion_store::StoreError;

/// Failure of one population call.
///
/// Every variant leaves the store as of the last committed batch.
#[derive(Debug)]
pub enum PopulateError {
    /// No configured source serves this table
    TableUnavailable(String),
    UnknownColumn { table: String, column: String },
    /// Row selection condition that does not parse
    BadCondition(String),
    /// Append target exists with different columns
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    Cancelled,
    Source(SourceError),
    Store(StoreError),
}

impl std::fmt::Display for PopulateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TableUnavailable(t) => write!(f, "no configured source provides table {t}"),
            Self::UnknownColumn { table, column } => write!(f, "table {table} has no column {column}"),
            Self::BadCondition(s) => write!(f, "cannot parse row condition: {s:?}"),
            Self::SchemaMismatch {
                table,
                expected,
                found,
            } => write!(
                f,
                "schema mismatch on {table}: expected ({}), found ({})",
                expected.join(", "),
                found.join(", ")
            ),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Source(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "store: {e}"),
        }
    }
}

impl std::error::Error for PopulateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Source(e) => Some(e),
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SourceError> for PopulateError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

impl From<StoreError> for PopulateError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
