//! Relations served by the organization registry

use std::fmt;
use std::sync::LazyLock;

use biblion_core::{ColumnDef, TableSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Organizations,
    Aliases,
    Relationships,
    Links,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Organizations,
        Table::Aliases,
        Table::Relationships,
        Table::Links,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Aliases => "organization_aliases",
            Self::Relationships => "organization_relationships",
            Self::Links => "organization_links",
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

pub static TABLES: LazyLock<Vec<TableSchema>> = LazyLock::new(|| {
    use ColumnDef as C;
    let parent = Table::Organizations.name();
    vec![
        TableSchema::new(
            parent,
            vec![
                C::text("ror_id"),
                C::text("name"),
                C::text("status"),
                C::text("type"),
                C::integer("established"),
                C::text("country_code"),
                C::text("country_name"),
                C::text("city"),
                C::real("latitude"),
                C::real("longitude"),
                C::text("wikidata"),
                C::text("isni"),
                C::text("grid"),
                C::text("fundref"),
            ],
        ),
        TableSchema::child(
            Table::Aliases.name(),
            parent,
            vec![C::text("ror_id"), C::integer("seq"), C::text("alias")],
        ),
        TableSchema::child(
            Table::Relationships.name(),
            parent,
            vec![
                C::text("ror_id"),
                C::integer("seq"),
                C::text("relation_type"),
                C::text("related_ror_id"),
                C::text("label"),
            ],
        ),
        TableSchema::child(
            Table::Links.name(),
            parent,
            vec![C::text("ror_id"), C::integer("seq"), C::text("url")],
        ),
    ]
});
