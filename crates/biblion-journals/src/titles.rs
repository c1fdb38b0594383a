//! Crossref journal title list

use std::path::PathBuf;
use std::sync::LazyLock;

use biblion_core::TableSchema;

use crate::csv_table::{CsvColumn, CsvSource, CsvTableDef, Field};

pub const SOURCE_NAME: &str = "journal_titles";

/// Column layout of `journal_names`
pub static JOURNAL_NAMES: CsvTableDef = CsvTableDef {
    source: SOURCE_NAME,
    table: "journal_names",
    columns: &[
        CsvColumn {
            name: "issn_print",
            headers: &["pissn"],
            field: Field::Issn,
        },
        CsvColumn {
            name: "issn_electronic",
            headers: &["eissn"],
            field: Field::Issn,
        },
        CsvColumn {
            name: "title",
            headers: &["JournalTitle"],
            field: Field::Text,
        },
        CsvColumn {
            name: "crossref_id",
            headers: &["JournalID"],
            field: Field::Integer,
        },
        CsvColumn {
            name: "publisher",
            headers: &["Publisher"],
            field: Field::Text,
        },
        CsvColumn {
            name: "additional_issns",
            headers: &["additionalIssns"],
            field: Field::Text,
        },
        CsvColumn {
            name: "doi",
            headers: &["doi"],
            field: Field::Text,
        },
    ],
};

static TABLES: LazyLock<Vec<TableSchema>> = LazyLock::new(|| vec![JOURNAL_NAMES.schema()]);

/// Journal title list served as `journal_names`.
pub fn source(path: impl Into<PathBuf>) -> CsvSource {
    CsvSource::new(&JOURNAL_NAMES, &TABLES, path.into())
}
