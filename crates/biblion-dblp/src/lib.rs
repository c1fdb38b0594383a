//! Biblion DBLP - publication-dump adapter
//!
//! Serves the DBLP XML dump (gzip-compressed, ISO 8859-1 character entities
//! declared in its DTD) as the `dblp_publications` relation with its author
//! and link child relations.

pub mod entities;
pub mod parser;
pub mod schema;
pub mod source;

// Re-exports for convenience
pub use parser::{Publication, parse_publication};
pub use schema::{TABLES, Table};
pub use source::DblpSource;

/// Source name used in skipped-record events and logs
pub const SOURCE_NAME: &str = "dblp";

/// Record element names, one per publication type
pub const RECORD_ELEMENTS: &[&str] = &[
    "article",
    "inproceedings",
    "proceedings",
    "book",
    "incollection",
    "phdthesis",
    "mastersthesis",
    "www",
    "data",
];
