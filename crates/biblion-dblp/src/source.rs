//! Publication-dump virtual source

use std::path::{Path, PathBuf};

use biblion_core::{
    ColumnMask, Cursor, FlatCursor, RecordLocation, Row, RowBuilder, ScanHint, SourceError,
    TableSchema, VirtualSource, XmlRecords, open_gzip,
};

use crate::parser::{Publication, parse_publication};
use crate::schema::{TABLES, Table};
use crate::{RECORD_ELEMENTS, SOURCE_NAME};

/// Append the rows `publ` contributes to `table`.
pub fn flatten(table: Table, publ: &Publication, mask: &ColumnMask, out: &mut Vec<Row>) {
    let key = publ.key.as_str();
    let width = table.schema().width();

    match table {
        Table::Publications => {
            let mut b = RowBuilder::new(mask, width);
            b.push(|| key)
                .push(|| publ.kind.as_str())
                .push(|| publ.mdate.as_deref())
                .push(|| publ.title.as_deref())
                .push(|| publ.year)
                .push(|| publ.venue.as_deref())
                .push(|| publ.volume.as_deref())
                .push(|| publ.number.as_deref())
                .push(|| publ.pages.as_deref())
                .push(|| publ.publisher.as_deref())
                .push(|| publ.doi());
            out.push(b.finish());
        }
        Table::Authors => {
            for (seq, a) in publ.authors.iter().enumerate() {
                let mut b = RowBuilder::new(mask, width);
                b.push(|| key)
                    .push(|| seq)
                    .push(|| a.name.as_str())
                    .push(|| a.orcid.as_deref());
                out.push(b.finish());
            }
        }
        Table::Links => {
            for (seq, url) in publ.links.iter().enumerate() {
                let mut b = RowBuilder::new(mask, width);
                b.push(|| key).push(|| seq).push(|| url.as_str());
                out.push(b.finish());
            }
        }
    }
}

/// DBLP dump served as virtual relations.
#[derive(Debug, Clone)]
pub struct DblpSource {
    path: PathBuf,
}

impl DblpSource {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VirtualSource for DblpSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn tables(&self) -> &[TableSchema] {
        &TABLES
    }

    fn open_cursor(&self, table: &str, hint: &ScanHint) -> Result<Box<dyn Cursor>, SourceError> {
        let table = Table::from_name(table).ok_or_else(|| SourceError::UnknownTable {
            source: SOURCE_NAME.to_string(),
            table: table.to_string(),
        })?;
        let reader = open_gzip(&self.path)?;
        log::debug!("{SOURCE_NAME}: scanning {} for {}", self.path.display(), table.schema().name);
        let stream = XmlRecords::new(reader, &self.path, RECORD_ELEMENTS);
        let mask = ColumnMask::for_hint(table.schema(), hint);
        let cursor = FlatCursor::new(
            table.schema(),
            SOURCE_NAME,
            stream,
            hint,
            move |xml: Vec<u8>, _loc: &RecordLocation, out: &mut Vec<Row>| {
                let publ = parse_publication(&xml).map_err(|e| format!("{e:#}"))?;
                flatten(table, &publ, &mask, out);
                Ok(())
            },
        );
        Ok(Box::new(cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SAMPLE_ARTICLE;
    use biblion_core::Value;

    fn rows(table: Table, hint: &ScanHint) -> Vec<Row> {
        let publ = parse_publication(SAMPLE_ARTICLE.as_bytes()).unwrap();
        let mask = ColumnMask::for_hint(table.schema(), hint);
        let mut out = Vec::new();
        flatten(table, &publ, &mask, &mut out);
        out
    }

    #[test]
    fn publication_row() {
        let out = rows(Table::Publications, &ScanHint::all());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 11);
        assert_eq!(out[0][1], Value::text("article"));
        assert_eq!(out[0][4], Value::Integer(1974));
        assert_eq!(out[0][9], Value::Null);
        assert_eq!(out[0][10], Value::text("10.1145/361604.361612"));
    }

    #[test]
    fn author_and_link_rows() {
        let authors = rows(Table::Authors, &ScanHint::all());
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[1][1], Value::Integer(1));
        assert_eq!(authors[1][3], Value::Null);

        let links = rows(Table::Links, &ScanHint::all().columns(vec![0]));
        assert_eq!(links.len(), 2);
        assert_eq!(links[0][0], Value::text("journals/cacm/Knuth74"));
        assert_eq!(links[0][2], Value::Null);
    }
}
