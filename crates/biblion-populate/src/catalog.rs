//! Registry of the configured virtual sources

use biblion_core::{TableSchema, VirtualSource};
use biblion_store::create_table_sql;

use crate::config::SourcesConfig;
use crate::error::PopulateError;

/// Every configured source, looked up by table name.
///
/// The planner and linker only see [`VirtualSource`]s through this; no code
/// path here knows which corpus a table comes from.
#[derive(Default)]
pub struct Catalog {
    sources: Vec<Box<dyn VirtualSource>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// One source per configured path. Paths are not opened until a table
    /// is scanned, so a missing file only fails the jobs that read it.
    pub fn from_config(config: &SourcesConfig) -> Self {
        let mut catalog = Self::new();
        if let Some(p) = &config.crossref {
            catalog.add(biblion_crossref::CrossrefSource::open(p));
        }
        if let Some(p) = &config.orcid {
            catalog.add(biblion_orcid::OrcidSource::open(p));
        }
        if let Some(p) = &config.dblp {
            catalog.add(biblion_dblp::DblpSource::open(p));
        }
        if let Some(p) = &config.ror {
            catalog.add(biblion_ror::RorSource::open(p));
        }
        if let Some(p) = &config.doaj {
            catalog.add(biblion_journals::doaj::source(p));
        }
        if let Some(p) = &config.journal_titles {
            catalog.add(biblion_journals::titles::source(p));
        }
        log::debug!(
            "Catalog: {} sources, {} tables",
            catalog.sources.len(),
            catalog.tables().count()
        );
        catalog
    }

    pub fn add(&mut self, source: impl VirtualSource + 'static) {
        if let Some(dup) = source.tables().iter().find(|t| self.find(&t.name).is_some()) {
            log::warn!(
                "Table {} of source {} is already served; the first source wins",
                dup.name,
                source.name()
            );
        }
        self.sources.push(Box::new(source));
    }

    pub fn with(mut self, source: impl VirtualSource + 'static) -> Self {
        self.add(source);
        self
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn VirtualSource> {
        self.sources.iter().map(|s| s.as_ref())
    }

    /// `(source name, schema)` of every available table.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableSchema)> {
        self.sources
            .iter()
            .flat_map(|s| s.tables().iter().map(move |t| (s.name(), t)))
    }

    /// Source serving `table`, with its schema.
    pub fn find(&self, table: &str) -> Option<(&dyn VirtualSource, &TableSchema)> {
        self.sources
            .iter()
            .find_map(|s| s.schema(table).map(|t| (s.as_ref(), t)))
    }

    pub fn resolve(&self, table: &str) -> Result<(&dyn VirtualSource, &TableSchema), PopulateError> {
        self.find(table)
            .ok_or_else(|| PopulateError::TableUnavailable(table.to_string()))
    }

    /// `CREATE TABLE` statements for every available table.
    pub fn schema_ddl(&self) -> Vec<String> {
        self.tables().map(|(_, t)| format!("{};", create_table_sql(t))).collect()
    }
}
