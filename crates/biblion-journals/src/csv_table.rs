//! One-relation sources over headed CSV files.
//!
//! A [`CsvTableDef`] names each output column, the CSV header(s) it is read
//! from and how the cell is decoded. Headers are resolved once per cursor;
//! a header missing from the file leaves its column `Null`.

use std::path::{Path, PathBuf};

use biblion_core::{
    ColumnDef, ColumnMask, Cursor, CsvRecords, FlatCursor, RecordLocation, Row, ScanHint,
    SourceError, TableSchema, Value, VirtualSource,
};
use csv::StringRecord;

use crate::normalize_issn;

/// How a cell becomes a value. Empty cells are always `Null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Text,
    /// ISSN, normalised to `NNNN-NNNC`
    Issn,
    /// `Yes`/`No` (or `true`/`false`) as 1/0
    Flag,
    Integer,
}

impl Field {
    fn decode(self, cell: &str) -> Result<Value, String> {
        let cell = cell.trim();
        if cell.is_empty() {
            return Ok(Value::Null);
        }
        match self {
            Self::Text => Ok(Value::text(cell)),
            Self::Issn => Ok(Value::text(normalize_issn(cell))),
            Self::Flag => match cell.to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" => Ok(Value::Integer(1)),
                "no" | "n" | "false" => Ok(Value::Integer(0)),
                _ => Err(format!("invalid yes/no value {cell:?}")),
            },
            Self::Integer => cell
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("invalid integer {cell:?}")),
        }
    }

    fn column_def(self, name: &str) -> ColumnDef {
        match self {
            Self::Text | Self::Issn => ColumnDef::text(name),
            Self::Flag | Self::Integer => ColumnDef::integer(name),
        }
    }
}

#[derive(Debug)]
pub struct CsvColumn {
    pub name: &'static str,
    /// Accepted header spellings, first match wins
    pub headers: &'static [&'static str],
    pub field: Field,
}

#[derive(Debug)]
pub struct CsvTableDef {
    pub source: &'static str,
    pub table: &'static str,
    pub columns: &'static [CsvColumn],
}

impl CsvTableDef {
    /// Schema keyed by the first column.
    pub fn schema(&self) -> TableSchema {
        TableSchema::new(
            self.table,
            self.columns.iter().map(|c| c.field.column_def(c.name)).collect(),
        )
    }
}

/// Map each output column to its CSV field position.
fn resolve_headers<R: std::io::Read>(def: &CsvTableDef, records: &CsvRecords<R>) -> Vec<Option<usize>> {
    def.columns
        .iter()
        .map(|c| {
            let idx = c.headers.iter().find_map(|h| records.header_index(h));
            if idx.is_none() {
                log::warn!("{}: no {:?} header, column {} will be empty", def.source, c.headers[0], c.name);
            }
            idx
        })
        .collect()
}

fn flatten(
    def: &CsvTableDef,
    fields: &[Option<usize>],
    record: &StringRecord,
    mask: &ColumnMask,
) -> Result<Row, String> {
    let mut row = Vec::with_capacity(def.columns.len());
    for (i, (col, field)) in def.columns.iter().zip(fields).enumerate() {
        let value = match field {
            Some(f) if mask.wants(i) => {
                let cell = record.get(*f).unwrap_or_default();
                col.field.decode(cell).map_err(|e| format!("{}: {e}", col.name))?
            }
            _ => Value::Null,
        };
        row.push(value);
    }
    Ok(row)
}

/// A headed CSV file served as one relation.
#[derive(Debug)]
pub struct CsvSource {
    def: &'static CsvTableDef,
    tables: &'static [TableSchema],
    path: PathBuf,
}

impl CsvSource {
    pub fn new(def: &'static CsvTableDef, tables: &'static [TableSchema], path: PathBuf) -> Self {
        Self { def, tables, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VirtualSource for CsvSource {
    fn name(&self) -> &str {
        self.def.source
    }

    fn tables(&self) -> &[TableSchema] {
        self.tables
    }

    fn open_cursor(&self, table: &str, hint: &ScanHint) -> Result<Box<dyn Cursor>, SourceError> {
        let (def, tables) = (self.def, self.tables);
        let schema = tables
            .iter()
            .find(|t| t.name == table)
            .ok_or_else(|| SourceError::UnknownTable {
                source: def.source.to_string(),
                table: table.to_string(),
            })?;
        let records = CsvRecords::open(&self.path, def.source)?;
        let fields = resolve_headers(def, &records);
        let mask = ColumnMask::for_hint(schema, hint);
        let cursor = FlatCursor::new(
            schema,
            def.source,
            records,
            hint,
            move |record: StringRecord, _loc: &RecordLocation, out: &mut Vec<Row>| {
                out.push(flatten(def, &fields, &record, &mask)?);
                Ok(())
            },
        );
        Ok(Box::new(cursor))
    }
}
