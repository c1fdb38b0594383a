//! Biblion Store - persistent relational store
//!
//! An embedded, file-backed DuckDB database that receives materialized
//! relations. Writes go through scoped [`Batch`] transactions: a batch
//! either commits as a whole or leaves the store untouched.

pub mod error;
pub mod normalize;
pub mod report;
pub mod store;
pub mod value;

// Re-exports for convenience
pub use error::StoreError;
pub use report::{PopulationLogEntry, Ranked, Ranking, RankingKind, WorkCounts};
pub use store::{Batch, Store, create_table_sql};
pub use value::sql_type;
