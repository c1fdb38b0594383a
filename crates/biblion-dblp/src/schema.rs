//! Relations served by the publication dump

use std::fmt;
use std::sync::LazyLock;

use biblion_core::{ColumnDef, TableSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Publications,
    Authors,
    Links,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Publications, Table::Authors, Table::Links];

    pub fn name(self) -> &'static str {
        match self {
            Self::Publications => "dblp_publications",
            Self::Authors => "dblp_authors",
            Self::Links => "dblp_links",
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
    let parent = Table::Publications.name();
    vec![
        TableSchema::new(
            parent,
            vec![
                C::text("key"),
                C::text("type"),
                C::text("mdate"),
                C::text("title"),
                C::integer("year"),
                C::text("venue"),
                C::text("volume"),
                C::text("number"),
                C::text("pages"),
                C::text("publisher"),
                C::text("doi"),
            ],
        ),
        TableSchema::child(
            Table::Authors.name(),
            parent,
            vec![
                C::text("publication_key"),
                C::integer("seq"),
                C::text("name"),
                C::text("orcid"),
            ],
        ),
        TableSchema::child(
            Table::Links.name(),
            parent,
            vec![C::text("publication_key"), C::integer("seq"), C::text("url")],
        ),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_follow_enum_order() {
        for t in Table::ALL {
            assert_eq!(t.schema().name, t.name());
            assert_eq!(Table::from_name(t.name()), Some(t));
        }
        assert_eq!(Table::Links.schema().parent.as_deref(), Some("dblp_publications"));
    }
}
