//! Biblion ROR - organization-registry adapter
//!
//! Serves a Research Organization Registry data dump (a zip archive holding
//! one JSON array of organizations) as the `organizations` relation and its
//! alias, relationship and link child relations. Both the v1 and v2 record
//! layouts of the registry are accepted.

pub mod record;
pub mod schema;
pub mod source;

// Re-exports for convenience
pub use record::Organization;
pub use schema::{TABLES, Table};
pub use source::RorSource;

/// Source name used in skipped-record events and logs
pub const SOURCE_NAME: &str = "ror";
