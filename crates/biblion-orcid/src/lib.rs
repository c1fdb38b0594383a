//! Biblion ORCID - researcher-summary adapter
//!
//! Serves ORCID public data summaries (a gzip-compressed stream of
//! `record:record` documents) as the `persons` relation and its child
//! relations: external identifiers, keywords, researcher URLs, employments,
//! educations and works.

pub mod parser;
pub mod schema;
pub mod source;

// Re-exports for convenience
pub use parser::{Affiliation, Person, parse_record};
pub use schema::{TABLES, Table};
pub use source::OrcidSource;

/// Source name used in skipped-record events and logs
pub const SOURCE_NAME: &str = "orcid";

/// Local names of the elements holding one researcher each
pub const RECORD_ELEMENTS: &[&str] = &["record"];
