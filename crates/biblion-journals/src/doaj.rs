//! DOAJ open-access journal list

use std::path::PathBuf;
use std::sync::LazyLock;

use biblion_core::TableSchema;

use crate::csv_table::{CsvColumn, CsvSource, CsvTableDef, Field};

pub const SOURCE_NAME: &str = "doaj";

/// Column layout of `open_access_journals`
pub static OPEN_ACCESS_JOURNALS: CsvTableDef = CsvTableDef {
    source: SOURCE_NAME,
    table: "open_access_journals",
    columns: &[
        CsvColumn {
            name: "issn_print",
            headers: &["Journal ISSN (print version)", "pissn"],
            field: Field::Issn,
        },
        CsvColumn {
            name: "issn_electronic",
            headers: &["Journal EISSN (online version)", "eissn"],
            field: Field::Issn,
        },
        CsvColumn {
            name: "title",
            headers: &["Journal title"],
            field: Field::Text,
        },
        CsvColumn {
            name: "alternative_title",
            headers: &["Alternative title"],
            field: Field::Text,
        },
        CsvColumn {
            name: "url",
            headers: &["Journal URL"],
            field: Field::Text,
        },
        CsvColumn {
            name: "publisher",
            headers: &["Publisher"],
            field: Field::Text,
        },
        CsvColumn {
            name: "country",
            headers: &["Country of publisher"],
            field: Field::Text,
        },
        CsvColumn {
            name: "languages",
            headers: &["Languages in which the journal accepts manuscripts"],
            field: Field::Text,
        },
        CsvColumn {
            name: "license",
            headers: &["Journal license"],
            field: Field::Text,
        },
        CsvColumn {
            name: "apc",
            headers: &["APC", "Journal article processing charges (APCs)"],
            field: Field::Flag,
        },
        CsvColumn {
            name: "seal",
            headers: &["DOAJ Seal"],
            field: Field::Flag,
        },
        CsvColumn {
            name: "added_on",
            headers: &["Added on Date"],
            field: Field::Text,
        },
    ],
};

static TABLES: LazyLock<Vec<TableSchema>> = LazyLock::new(|| vec![OPEN_ACCESS_JOURNALS.schema()]);

/// DOAJ journal CSV served as `open_access_journals`.
pub fn source(path: impl Into<PathBuf>) -> CsvSource {
    CsvSource::new(&OPEN_ACCESS_JOURNALS, &TABLES, path.into())
}
