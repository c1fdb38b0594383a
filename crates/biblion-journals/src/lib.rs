//! Biblion Journals - journal registry adapters
//!
//! Two headed CSV registries, each served as one relation keyed by print
//! ISSN: the DOAJ open-access journal list (`open_access_journals`) and the
//! Crossref journal title list (`journal_names`).

pub mod csv_table;
pub mod doaj;
pub mod titles;

// Re-exports for convenience
pub use csv_table::{CsvColumn, CsvSource, CsvTableDef, Field};

/// `12345678` -> `1234-5678`; other forms are trimmed and upper-cased.
pub fn normalize_issn(raw: &str) -> String {
    let s = raw.trim().to_ascii_uppercase();
    if s.len() == 8 && s.is_ascii() {
        format!("{}-{}", &s[..4], &s[4..])
    } else {
        s
    }
}
