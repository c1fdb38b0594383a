//! Relations served by the researcher summaries

use std::fmt;
use std::sync::LazyLock;

use biblion_core::{ColumnDef, TableSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Persons,
    ExternalIdentifiers,
    Keywords,
    ResearcherUrls,
    Employments,
    Educations,
    Works,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Persons,
        Table::ExternalIdentifiers,
        Table::Keywords,
        Table::ResearcherUrls,
        Table::Employments,
        Table::Educations,
        Table::Works,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Persons => "persons",
            Self::ExternalIdentifiers => "person_external_identifiers",
            Self::Keywords => "person_keywords",
            Self::ResearcherUrls => "person_researcher_urls",
            Self::Employments => "person_employments",
            Self::Educations => "person_educations",
            Self::Works => "person_works",
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

/// Employment and education rows share one layout.
fn affiliation_columns() -> Vec<ColumnDef> {
    use ColumnDef as C;
    vec![
        C::text("orcid"),
        C::integer("seq"),
        C::text("organization_name"),
        C::text("department"),
        C::text("role_title"),
        C::integer("start_year"),
        C::integer("end_year"),
        C::text("city"),
        C::text("country"),
        C::text("organization_identifier"),
        C::text("identifier_source"),
    ]
}

pub static TABLES: LazyLock<Vec<TableSchema>> = LazyLock::new(|| {
    use ColumnDef as C;
    let child = |t: Table, columns| TableSchema::child(t.name(), Table::Persons.name(), columns);
    vec![
        TableSchema::new(
            Table::Persons.name(),
            vec![
                C::text("orcid"),
                C::text("given_names"),
                C::text("family_name"),
                C::text("credit_name"),
                C::text("biography"),
            ],
        ),
        child(
            Table::ExternalIdentifiers,
            vec![
                C::text("orcid"),
                C::integer("seq"),
                C::text("type"),
                C::text("value"),
                C::text("url"),
            ],
        ),
        child(
            Table::Keywords,
            vec![C::text("orcid"), C::integer("seq"), C::text("keyword")],
        ),
        child(
            Table::ResearcherUrls,
            vec![
                C::text("orcid"),
                C::integer("seq"),
                C::text("name"),
                C::text("url"),
            ],
        ),
        child(Table::Employments, affiliation_columns()),
        child(Table::Educations, affiliation_columns()),
        child(
            Table::Works,
            vec![
                C::text("orcid"),
                C::integer("seq"),
                C::text("doi"),
                C::text("title"),
            ],
        ),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_follow_enum_order() {
        assert_eq!(TABLES.len(), Table::ALL.len());
        for t in Table::ALL {
            assert_eq!(t.schema().name, t.name());
            assert_eq!(t.schema().key_column().name, "orcid");
        }
    }

    #[test]
    fn employment_and_education_match() {
        assert_eq!(
            Table::Employments.schema().columns,
            Table::Educations.schema().columns
        );
    }
}
