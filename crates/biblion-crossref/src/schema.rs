//! Relations served by the work archive

use std::fmt;
use std::sync::LazyLock;

use biblion_core::{ColumnDef, ColumnType, TableSchema};

/// Work-archive relations, in [`TABLES`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Works,
    WorkAuthors,
    AuthorAffiliations,
    WorkReferences,
    WorkSubjects,
    WorkFunders,
    WorkLicenses,
    WorkUpdates,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Works,
        Table::WorkAuthors,
        Table::AuthorAffiliations,
        Table::WorkReferences,
        Table::WorkSubjects,
        Table::WorkFunders,
        Table::WorkLicenses,
        Table::WorkUpdates,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Works => "works",
            Self::WorkAuthors => "work_authors",
            Self::AuthorAffiliations => "author_affiliations",
            Self::WorkReferences => "work_references",
            Self::WorkSubjects => "work_subjects",
            Self::WorkFunders => "work_funders",
            Self::WorkLicenses => "work_licenses",
            Self::WorkUpdates => "work_updates",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == s)
    }

    pub fn schema(self) -> &'static TableSchema {
        &TABLES[self as usize]
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn child(table: Table, columns: Vec<ColumnDef>) -> TableSchema {
    TableSchema::child(table.name(), Table::Works.name(), columns)
}

pub static TABLES: LazyLock<Vec<TableSchema>> = LazyLock::new(|| {
    use ColumnDef as C;
    vec![
        TableSchema::new(
            Table::Works.name(),
            vec![
                C::text("doi"),
                C::integer("container_id"),
                C::new("source_ref", ColumnType::BlobRef),
                C::text("title"),
                C::text("subtitle"),
                C::text("type"),
                C::text("publisher"),
                C::integer("published_year"),
                C::integer("published_month"),
                C::integer("published_day"),
                C::text("abstract"),
                C::text("volume"),
                C::text("issue"),
                C::text("page"),
                C::text("issn_print"),
                C::text("issn_electronic"),
                C::text("language"),
                C::integer("references_count"),
                C::integer("is_referenced_by_count"),
            ],
        ),
        child(
            Table::WorkAuthors,
            vec![
                C::text("work_doi"),
                C::integer("seq"),
                C::text("given"),
                C::text("family"),
                C::text("name"),
                C::text("orcid"),
                C::text("sequence"),
            ],
        ),
        child(
            Table::AuthorAffiliations,
            vec![
                C::text("work_doi"),
                C::integer("author_seq"),
                C::integer("seq"),
                C::text("name"),
                C::text("ror_id"),
            ],
        ),
        child(
            Table::WorkReferences,
            vec![
                C::text("work_doi"),
                C::integer("seq"),
                C::text("key"),
                C::text("doi"),
                C::text("article_title"),
                C::text("journal_title"),
                C::text("author"),
                C::text("year"),
                C::text("volume"),
                C::text("first_page"),
                C::text("issn"),
                C::text("unstructured"),
            ],
        ),
        child(
            Table::WorkSubjects,
            vec![C::text("work_doi"), C::integer("seq"), C::text("name")],
        ),
        child(
            Table::WorkFunders,
            vec![
                C::text("work_doi"),
                C::integer("seq"),
                C::text("doi"),
                C::text("name"),
                C::text("awards"),
            ],
        ),
        child(
            Table::WorkLicenses,
            vec![
                C::text("work_doi"),
                C::integer("seq"),
                C::text("url"),
                C::integer("start_year"),
                C::integer("delay_in_days"),
                C::text("content_version"),
            ],
        ),
        child(
            Table::WorkUpdates,
            vec![
                C::text("work_doi"),
                C::integer("seq"),
                C::text("updated_doi"),
                C::text("update_type"),
                C::integer("year"),
            ],
        ),
    ]
});
