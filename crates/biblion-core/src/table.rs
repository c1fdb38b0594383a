//! Virtual table engine: value model, table schemas, scan hints and the
//! cursor/source traits every format adapter implements.
//!
//! A [`VirtualSource`] lists the tables it can serve and opens forward-only
//! [`Cursor`]s over them. Cursors are single-pass: a second scan means a
//! second `open_cursor` call, which re-opens the underlying file from the
//! start. Dropping a cursor releases its file handle.

use std::fmt;

use crate::error::{SkippedRecord, SourceError};

/// A single column value. Absence is always `Null`, never an empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
}

impl Value {
    /// Text value, with empty or whitespace-only input mapped to `Null`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Self::Null
        } else {
            Self::Text(s)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(x) => Some(*x),
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Whether this is a text value beginning with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.as_str().is_some_and(|s| s.starts_with(prefix))
    }

    /// Text form used as a lookup key; integers are keyed by their decimal form.
    pub fn key_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s.clone()),
            Self::Integer(n) => Some(n.to_string()),
            Self::Real(x) => Some(x.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(x) => write!(f, "{x}"),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::text(s.as_str())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Real(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Integer(i64::from(b))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Canonical column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    /// Opaque reference for re-fetching the source record; stored as text
    BlobRef,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::BlobRef => "blobref",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn real(name: &str) -> Self {
        Self::new(name, ColumnType::Real)
    }
}

/// Ordered column list of one relation.
///
/// `key` indexes the column holding the relation's identifier: the primary
/// key of a main table, or the parent's key for a child table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub key: usize,
    pub parent: Option<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
            key: 0,
            parent: None,
        }
    }

    /// Child table whose first column carries the parent's key.
    pub fn child(name: impl Into<String>, parent: &str, columns: Vec<ColumnDef>) -> Self {
        Self {
            parent: Some(parent.to_string()),
            ..Self::new(name, columns)
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn key_column(&self) -> &ColumnDef {
        &self.columns[self.key]
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Half-open row window `[offset, offset + limit)` over the rows a cursor
/// would deliver after key-prefix filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowRange {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl RowRange {
    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }

    pub fn first(n: u64) -> Self {
        Self::new(0, Some(n))
    }

    pub fn end(&self) -> Option<u64> {
        self.limit.map(|l| self.offset.saturating_add(l))
    }

    pub fn contains(&self, n: u64) -> bool {
        n >= self.offset && self.end().is_none_or(|e| n < e)
    }

    /// Whether no row at position `n` or later can be in range.
    pub fn is_past(&self, n: u64) -> bool {
        self.end().is_some_and(|e| n >= e)
    }
}

/// Container sample: of a source split into containers (archive members),
/// read only those whose ordinal `n` has `n % every == phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub every: u32,
    pub phase: u32,
}

impl Sample {
    pub fn every(n: u32) -> Self {
        Self {
            every: n.max(1),
            phase: 0,
        }
    }

    pub fn phase(mut self, phase: u32) -> Self {
        self.phase = phase % self.every;
        self
    }

    pub fn keeps(&self, container: u32) -> bool {
        container % self.every.max(1) == self.phase
    }
}

/// Advisory pushdown hints for [`VirtualSource::open_cursor`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanHint {
    /// Column indexes the caller will read; others may be left `Null`
    pub columns: Option<Vec<usize>>,
    /// Only rows whose key column starts with this prefix
    pub key_prefix: Option<String>,
    pub rows: Option<RowRange>,
    /// Only containers this sample keeps; unsplit sources ignore it
    pub sample: Option<Sample>,
}

impl ScanHint {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: Vec<usize>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn rows(mut self, range: RowRange) -> Self {
        self.rows = Some(range);
        self
    }

    pub fn sample(mut self, sample: Sample) -> Self {
        self.sample = Some(sample);
        self
    }
}

/// Which hints a cursor guarantees to have applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HintUse {
    pub key_prefix: bool,
    pub rows: bool,
    pub sample: bool,
}

impl HintUse {
    pub const NONE: Self = Self {
        key_prefix: false,
        rows: false,
        sample: false,
    };
    pub const ALL: Self = Self {
        key_prefix: true,
        rows: true,
        sample: true,
    };
}

/// Result of [`Cursor::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Row,
    EndOfStream,
}

pub type Row = Vec<Value>;

/// Forward-only handle over one relation's rows, in source file order.
pub trait Cursor {
    fn schema(&self) -> &TableSchema;

    /// Move to the next row. Blocks on disk reads and decompression.
    fn advance(&mut self) -> Result<Step, SourceError>;

    /// Value of column `idx` in the current row. Pure: repeated calls without
    /// advancing return the same value. `Null` before the first row.
    fn column(&self, idx: usize) -> &Value;

    /// Drain the skipped-record events observed since the last call.
    fn take_skipped(&mut self) -> Vec<SkippedRecord>;

    fn hint_use(&self) -> HintUse;
}

/// Capability set of one corpus: its tables and a way to scan them.
pub trait VirtualSource: Send + Sync {
    fn name(&self) -> &str;

    fn tables(&self) -> &[TableSchema];

    fn schema(&self, table: &str) -> Option<&TableSchema> {
        self.tables().iter().find(|t| t.name == table)
    }

    /// Open a fresh cursor. Never reads the source eagerly.
    fn open_cursor(&self, table: &str, hint: &ScanHint) -> Result<Box<dyn Cursor>, SourceError>;
}

/// Per-column "compute or leave null" switch derived from a projection hint.
///
/// The key column is always computed so prefix filtering keeps working.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMask {
    wanted: Option<Vec<bool>>,
}

impl ColumnMask {
    pub fn all() -> Self {
        Self { wanted: None }
    }

    pub fn for_hint(schema: &TableSchema, hint: &ScanHint) -> Self {
        let Some(cols) = &hint.columns else {
            return Self::all();
        };
        let mut wanted = vec![false; schema.width()];
        for &c in cols {
            if let Some(w) = wanted.get_mut(c) {
                *w = true;
            }
        }
        if let Some(w) = wanted.get_mut(schema.key) {
            *w = true;
        }
        Self {
            wanted: Some(wanted),
        }
    }

    pub fn wants(&self, idx: usize) -> bool {
        self.wanted
            .as_ref()
            .is_none_or(|w| w.get(idx).copied().unwrap_or(false))
    }
}

/// Builds one row column by column, skipping unrequested columns.
///
/// Columns are pushed in schema order; the closure runs only when the mask
/// asks for that position.
pub struct RowBuilder<'m> {
    mask: &'m ColumnMask,
    values: Row,
}

impl<'m> RowBuilder<'m> {
    pub fn new(mask: &'m ColumnMask, width: usize) -> Self {
        Self {
            mask,
            values: Vec::with_capacity(width),
        }
    }

    pub fn push<V: Into<Value>>(&mut self, f: impl FnOnce() -> V) -> &mut Self {
        let idx = self.values.len();
        let value = if self.mask.wants(idx) {
            f().into()
        } else {
            Value::Null
        };
        self.values.push(value);
        self
    }

    pub fn finish(self) -> Row {
        self.values
    }
}
