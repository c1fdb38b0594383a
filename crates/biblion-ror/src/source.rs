//! Organization-registry virtual source

use std::path::{Path, PathBuf};

use biblion_core::{
    ColumnMask, Cursor, FlatCursor, JsonArrayRecords, RecordLocation, Row, RowBuilder, ScanHint,
    SourceError, TableSchema, VirtualSource, open_zip_entry,
};

use crate::SOURCE_NAME;
use crate::record::Organization;
use crate::schema::{TABLES, Table};

/// Append the rows `org` contributes to `table`.
pub fn flatten(
    table: Table,
    org: &Organization,
    mask: &ColumnMask,
    out: &mut Vec<Row>,
) -> Result<(), String> {
    let id = org.key().ok_or("organization has no id")?;
    let width = table.schema().width();

    match table {
        Table::Organizations => {
            let ids = &org.external_ids;
            let mut b = RowBuilder::new(mask, width);
            b.push(|| id)
                .push(|| org.display_name())
                .push(|| org.status.as_deref())
                .push(|| org.type_list())
                .push(|| org.established)
                .push(|| org.country_code())
                .push(|| org.country_name())
                .push(|| org.city())
                .push(|| org.latitude())
                .push(|| org.longitude())
                .push(|| ids.get("wikidata"))
                .push(|| ids.get("isni"))
                .push(|| ids.get("grid"))
                .push(|| ids.get("fundref"));
            out.push(b.finish());
        }
        Table::Aliases => {
            for (seq, alias) in org.aliases().into_iter().enumerate() {
                let mut b = RowBuilder::new(mask, width);
                b.push(|| id).push(|| seq).push(|| alias);
                out.push(b.finish());
            }
        }
        Table::Relationships => {
            for (seq, r) in org.relationships.iter().enumerate() {
                let mut b = RowBuilder::new(mask, width);
                b.push(|| id)
                    .push(|| seq)
                    .push(|| r.kind.as_deref())
                    .push(|| r.id.as_deref())
                    .push(|| r.label.as_deref());
                out.push(b.finish());
            }
        }
        Table::Links => {
            for (seq, link) in org.links.iter().enumerate() {
                let mut b = RowBuilder::new(mask, width);
                b.push(|| id).push(|| seq).push(|| link.url());
                out.push(b.finish());
            }
        }
    }
    Ok(())
}

/// Registry dump served as virtual relations.
#[derive(Debug, Clone)]
pub struct RorSource {
    path: PathBuf,
}

impl RorSource {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VirtualSource for RorSource {
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
        let (entry, reader) = open_zip_entry(&self.path, ".json")?;
        log::debug!("{SOURCE_NAME}: reading {entry} from {}", self.path.display());
        let stream = JsonArrayRecords::new(reader, &self.path).in_member(entry);
        let mask = ColumnMask::for_hint(table.schema(), hint);
        let cursor = FlatCursor::new(
            table.schema(),
            SOURCE_NAME,
            stream,
            hint,
            move |bytes: Vec<u8>, _loc: &RecordLocation, out: &mut Vec<Row>| {
                let org = Organization::from_slice(&bytes).map_err(|e| format!("organization JSON: {e}"))?;
                flatten(table, &org, &mask, out)
            },
        );
        Ok(Box::new(cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SAMPLE_V1, SAMPLE_V2};
    use biblion_core::Value;

    fn rows(sample: &str, table: Table) -> Vec<Row> {
        let org = Organization::from_slice(sample.as_bytes()).unwrap();
        let mask = ColumnMask::all();
        let mut out = Vec::new();
        flatten(table, &org, &mask, &mut out).unwrap();
        out
    }

    #[test]
    fn organization_rows() {
        let v2 = rows(SAMPLE_V2, Table::Organizations);
        assert_eq!(v2[0].len(), 14);
        assert_eq!(v2[0][4], Value::Integer(1764));
        assert_eq!(v2[0][9], Value::Real(-71.41));
        assert_eq!(v2[0][12], Value::text("grid.40263.33"));

        let v1 = rows(SAMPLE_V1, Table::Organizations);
        assert_eq!(v1[0][4], Value::Null);
        assert_eq!(v1[0][6], Value::text("Netherlands"));
        assert_eq!(v1[0][10], Value::Null);
    }

    #[test]
    fn child_rows() {
        assert_eq!(rows(SAMPLE_V2, Table::Aliases).len(), 2);
        let rel = rows(SAMPLE_V2, Table::Relationships);
        assert_eq!(rel[0][2], Value::text("child"));
        assert_eq!(rel[0][3], Value::text("https://ror.org/01aw9fv09"));
        assert!(rows(SAMPLE_V1, Table::Relationships).is_empty());
        assert_eq!(rows(SAMPLE_V1, Table::Links)[0][2], Value::text("http://www.uva.nl/en/home"));
    }

    #[test]
    fn missing_id_is_error() {
        let org = Organization::from_slice(br#"{"name": "Nameless"}"#).unwrap();
        let mut out = Vec::new();
        assert!(flatten(Table::Organizations, &org, &ColumnMask::all(), &mut out).is_err());
    }
}
