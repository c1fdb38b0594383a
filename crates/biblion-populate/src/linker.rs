//! Identifier linker: exact-match lookups from one relation into another.
//!
//! A [`LinkIndex`] maps the key column of a referenced virtual relation to
//! one of its value columns. It is built by a single projected scan the
//! first time a job references the relation and lives in that job's
//! [`LinkCache`]. Caches are never shared between jobs.
//!
//! When the referenced relation repeats a key, the first row in source order
//! wins and later lookups of that key report [`Lookup::Ambiguous`].

use biblion_core::{ColumnType, Cursor, ScanHint, Step, TableSchema, Value};
use rustc_hash::FxHashMap;

use crate::catalog::Catalog;
use crate::error::PopulateError;

/// Referenced relation and the two columns a link reads from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkTarget {
    pub table: String,
    pub key_column: String,
    pub value_column: String,
}

impl LinkTarget {
    pub fn new(table: &str, key_column: &str, value_column: &str) -> Self {
        Self {
            table: table.to_string(),
            key_column: key_column.to_string(),
            value_column: value_column.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Resolved(Value),
    Unresolved,
    /// Key repeated in the referenced relation; carries the first match
    Ambiguous(Value),
}

/// What to do with a row whose link does not resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkPolicy {
    /// Write the row with a null link column
    #[default]
    NullFill,
    /// Leave the row out
    DropRow,
    /// Null-fill and log a warning
    Warn,
}

/// Per-row link signal, reported in the population report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    UnresolvedLink { output: String, key: String },
    AmbiguousLink { output: String, key: String, matches: u32 },
}

impl std::fmt::Display for LinkEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedLink { output, key } => write!(f, "{output}: no match for {key}"),
            Self::AmbiguousLink {
                output,
                key,
                matches,
            } => write!(f, "{output}: {matches} matches for {key}, kept the first"),
        }
    }
}

/// One link column of a population request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    /// Column of the source table holding the reference
    pub column: String,
    pub target: LinkTarget,
    /// Destination column receiving the looked-up value
    pub output: String,
    pub policy: LinkPolicy,
}

impl LinkSpec {
    pub fn new(column: &str, target: LinkTarget, output: &str) -> Self {
        Self {
            column: column.to_string(),
            target,
            output: output.to_string(),
            policy: LinkPolicy::default(),
        }
    }

    pub fn policy(mut self, policy: LinkPolicy) -> Self {
        self.policy = policy;
        self
    }
}

struct Entry {
    value: Value,
    matches: u32,
}

/// Exact-match index over one referenced relation.
pub struct LinkIndex {
    entries: FxHashMap<String, Entry>,
    value_type: ColumnType,
    duplicates: u64,
}

impl LinkIndex {
    /// Drain `cursor`, keying column `key` to column `value`.
    ///
    /// Rows with a null key are not indexed.
    pub fn build(
        cursor: &mut dyn Cursor,
        key: usize,
        value: usize,
    ) -> Result<Self, PopulateError> {
        let value_type = cursor.schema().columns[value].ty;
        let mut entries: FxHashMap<String, Entry> = FxHashMap::default();
        let mut duplicates = 0;
        while cursor.advance()? == Step::Row {
            let Some(k) = cursor.column(key).key_text() else {
                continue;
            };
            match entries.get_mut(&k) {
                Some(e) => {
                    e.matches += 1;
                    duplicates += 1;
                }
                None => {
                    let v = cursor.column(value).clone();
                    entries.insert(k, Entry { value: v, matches: 1 });
                }
            }
        }
        let skipped = cursor.take_skipped();
        if !skipped.is_empty() {
            log::warn!(
                "{}: {} records skipped while indexing",
                cursor.schema().name,
                skipped.len()
            );
        }
        Ok(Self {
            entries,
            value_type,
            duplicates,
        })
    }

    pub fn lookup(&self, key: &str) -> Lookup {
        match self.entries.get(key) {
            None => Lookup::Unresolved,
            Some(e) if e.matches > 1 => Lookup::Ambiguous(e.value.clone()),
            Some(e) => Lookup::Resolved(e.value.clone()),
        }
    }

    /// Number of matches for `key` in the referenced relation.
    pub fn matches(&self, key: &str) -> u32 {
        self.entries.get(key).map_or(0, |e| e.matches)
    }

    pub fn value_type(&self) -> ColumnType {
        self.value_type
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows whose key was already indexed.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }
}

/// Job-owned cache of link indexes, built lazily.
#[derive(Default)]
pub struct LinkCache {
    indexes: FxHashMap<LinkTarget, LinkIndex>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `target`, scanning the relation on first use.
    pub fn index(
        &mut self,
        catalog: &Catalog,
        target: &LinkTarget,
    ) -> Result<&LinkIndex, PopulateError> {
        if !self.indexes.contains_key(target) {
            let index = build_index(catalog, target)?;
            self.indexes.insert(target.clone(), index);
        }
        self.indexes
            .get(target)
            .ok_or_else(|| PopulateError::TableUnavailable(target.table.clone()))
    }

    /// Look up `key` in `target`. A null key is unresolved.
    pub fn resolve(
        &mut self,
        catalog: &Catalog,
        target: &LinkTarget,
        key: &Value,
    ) -> Result<Lookup, PopulateError> {
        let index = self.index(catalog, target)?;
        Ok(key
            .key_text()
            .map_or(Lookup::Unresolved, |k| index.lookup(&k)))
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

pub(crate) fn column_index(schema: &TableSchema, name: &str) -> Result<usize, PopulateError> {
    schema
        .column_index(name)
        .ok_or_else(|| PopulateError::UnknownColumn {
            table: schema.name.clone(),
            column: name.to_string(),
        })
}

fn build_index(catalog: &Catalog, target: &LinkTarget) -> Result<LinkIndex, PopulateError> {
    let (source, schema) = catalog.resolve(&target.table)?;
    let key = column_index(schema, &target.key_column)?;
    let value = column_index(schema, &target.value_column)?;

    log::info!(
        "Indexing {}.{} -> {}",
        target.table,
        target.key_column,
        target.value_column
    );
    let mut cursor = source.open_cursor(&target.table, &ScanHint::all().columns(vec![key, value]))?;
    let index = LinkIndex::build(cursor.as_mut(), key, value)?;
    if index.duplicates() > 0 {
        log::warn!(
            "{}.{}: {} duplicate keys, first match wins",
            target.table,
            target.key_column,
            index.duplicates()
        );
    }
    log::debug!("Indexed {} keys of {}", index.len(), target.table);
    Ok(index)
}

#[cfg(test)]
mod tests {
    use biblion_core::{ColumnDef, HintUse, SkippedRecord, SourceError, VirtualSource};

    use super::*;

    /// In-memory relation for linker tests.
    struct Rows {
        schema: TableSchema,
        rows: Vec<Vec<Value>>,
        pos: usize,
    }

    impl Cursor for Rows {
        fn schema(&self) -> &TableSchema {
            &self.schema
        }

        fn advance(&mut self) -> Result<Step, SourceError> {
            self.pos += 1;
            Ok(if self.pos <= self.rows.len() {
                Step::Row
            } else {
                Step::EndOfStream
            })
        }

        fn column(&self, idx: usize) -> &Value {
            &self.rows[self.pos - 1][idx]
        }

        fn take_skipped(&mut self) -> Vec<SkippedRecord> {
            Vec::new()
        }

        fn hint_use(&self) -> HintUse {
            HintUse::NONE
        }
    }

    struct Orgs(Vec<TableSchema>);

    impl VirtualSource for Orgs {
        fn name(&self) -> &str {
            "orgs"
        }

        fn tables(&self) -> &[TableSchema] {
            &self.0
        }

        fn open_cursor(&self, _table: &str, _hint: &ScanHint) -> Result<Box<dyn Cursor>, SourceError> {
            Ok(Box::new(Rows {
                schema: self.0[0].clone(),
                rows: vec![
                    vec![Value::text("r1"), Value::text("First")],
                    vec![Value::text("r2"), Value::text("Second")],
                    vec![Value::Null, Value::text("Nameless")],
                    vec![Value::text("r1"), Value::text("Shadow")],
                ],
                pos: 0,
            }))
        }
    }

    fn catalog() -> Catalog {
        let schema = TableSchema::new("orgs", vec![ColumnDef::text("id"), ColumnDef::text("name")]);
        Catalog::new().with(Orgs(vec![schema]))
    }

    fn target() -> LinkTarget {
        LinkTarget::new("orgs", "id", "name")
    }

    #[test]
    fn first_match_wins() {
        let catalog = catalog();
        let mut cache = LinkCache::new();
        let index = cache.index(&catalog, &target()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.duplicates(), 1);
        assert_eq!(index.matches("r1"), 2);
        assert_eq!(index.value_type(), ColumnType::Text);

        for _ in 0..3 {
            assert_eq!(
                cache.resolve(&catalog, &target(), &Value::text("r1")).unwrap(),
                Lookup::Ambiguous(Value::text("First"))
            );
        }
        assert_eq!(
            cache.resolve(&catalog, &target(), &Value::text("r2")).unwrap(),
            Lookup::Resolved(Value::text("Second"))
        );
    }

    #[test]
    fn misses_and_null_keys() {
        let catalog = catalog();
        let mut cache = LinkCache::new();
        assert_eq!(
            cache.resolve(&catalog, &target(), &Value::text("r9")).unwrap(),
            Lookup::Unresolved
        );
        assert_eq!(
            cache.resolve(&catalog, &target(), &Value::Null).unwrap(),
            Lookup::Unresolved
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn bad_targets() {
        let catalog = catalog();
        let mut cache = LinkCache::new();
        assert!(matches!(
            cache.index(&catalog, &LinkTarget::new("nowhere", "id", "name")),
            Err(PopulateError::TableUnavailable(_))
        ));
        assert!(matches!(
            cache.index(&catalog, &LinkTarget::new("orgs", "id", "label")),
            Err(PopulateError::UnknownColumn { column, .. }) if column == "label"
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn event_messages() {
        let e = LinkEvent::AmbiguousLink {
            output: "org".into(),
            key: "r1".into(),
            matches: 2,
        };
        assert_eq!(e.to_string(), "org: 2 matches for r1, kept the first");
    }
}
