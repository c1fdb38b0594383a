//! Biblion Crossref - work-archive adapter
//!
//! Serves Crossref metadata snapshots (a tar archive of gzip-compressed JSON
//! members, each holding an `items` array of works) as the `works` relation
//! and its child relations.
//!
//! # Example
//!
//! ```no_run
//! use biblion_core::{Cursor, ScanHint, Step, VirtualSource};
//! use biblion_crossref::CrossrefSource;
//!
//! let source = CrossrefSource::open("crossref-2024.tar");
//! let mut cursor = source.open_cursor("works", &ScanHint::all().key_prefix("10.1000/")).unwrap();
//! while cursor.advance().unwrap() == Step::Row {
//!     println!("{}", cursor.column(0));
//! }
//! ```

pub mod flatten;
pub mod index;
pub mod record;
pub mod schema;
pub mod source;

// Re-exports for convenience
pub use index::PrefixIndex;
pub use record::Work;
pub use schema::{TABLES, Table};
pub use source::CrossrefSource;

/// Source name used in skipped-record events and logs
pub const SOURCE_NAME: &str = "crossref";
