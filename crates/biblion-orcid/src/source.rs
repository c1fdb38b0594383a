//! Researcher-summary virtual source

use std::path::{Path, PathBuf};

use biblion_core::{
    ColumnMask, Cursor, FlatCursor, RecordLocation, Row, RowBuilder, ScanHint, SourceError,
    TableSchema, VirtualSource, XmlRecords, open_gzip,
};

use crate::parser::{Affiliation, Person, parse_record};
use crate::schema::{TABLES, Table};
use crate::{RECORD_ELEMENTS, SOURCE_NAME};

/// Append the rows `person` contributes to `table`.
pub fn flatten(table: Table, person: &Person, mask: &ColumnMask, out: &mut Vec<Row>) {
    let orcid = person.orcid.as_str();
    let width = table.schema().width();
    let row = || RowBuilder::new(mask, width);

    match table {
        Table::Persons => {
            let mut b = row();
            b.push(|| orcid)
                .push(|| person.given_names.as_deref())
                .push(|| person.family_name.as_deref())
                .push(|| person.credit_name.as_deref())
                .push(|| person.biography.as_deref());
            out.push(b.finish());
        }
        Table::ExternalIdentifiers => {
            for (seq, id) in person.external_ids.iter().enumerate() {
                let mut b = row();
                b.push(|| orcid)
                    .push(|| seq)
                    .push(|| id.kind.as_deref())
                    .push(|| id.value.as_deref())
                    .push(|| id.url.as_deref());
                out.push(b.finish());
            }
        }
        Table::Keywords => {
            for (seq, k) in person.keywords.iter().enumerate() {
                let mut b = row();
                b.push(|| orcid).push(|| seq).push(|| k.as_str());
                out.push(b.finish());
            }
        }
        Table::ResearcherUrls => {
            for (seq, u) in person.researcher_urls.iter().enumerate() {
                let mut b = row();
                b.push(|| orcid)
                    .push(|| seq)
                    .push(|| u.name.as_deref())
                    .push(|| u.url.as_deref());
                out.push(b.finish());
            }
        }
        Table::Employments => affiliation_rows(orcid, &person.employments, mask, width, out),
        Table::Educations => affiliation_rows(orcid, &person.educations, mask, width, out),
        Table::Works => {
            for (seq, w) in person.works.iter().enumerate() {
                let mut b = row();
                b.push(|| orcid)
                    .push(|| seq)
                    .push(|| w.doi.as_deref())
                    .push(|| w.title.as_deref());
                out.push(b.finish());
            }
        }
    }
}

fn affiliation_rows(
    orcid: &str,
    entries: &[Affiliation],
    mask: &ColumnMask,
    width: usize,
    out: &mut Vec<Row>,
) {
    for (seq, a) in entries.iter().enumerate() {
        let mut b = RowBuilder::new(mask, width);
        b.push(|| orcid)
            .push(|| seq)
            .push(|| a.organization_name.as_deref())
            .push(|| a.department.as_deref())
            .push(|| a.role_title.as_deref())
            .push(|| a.start_year)
            .push(|| a.end_year)
            .push(|| a.city.as_deref())
            .push(|| a.country.as_deref())
            .push(|| a.organization_identifier.as_deref())
            .push(|| a.identifier_source.as_deref());
        out.push(b.finish());
    }
}

/// ORCID summaries file served as virtual relations.
#[derive(Debug, Clone)]
pub struct OrcidSource {
    path: PathBuf,
}

impl OrcidSource {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VirtualSource for OrcidSource {
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
                let person = parse_record(&xml).map_err(|e| format!("{e:#}"))?;
                flatten(table, &person, &mask, out);
                Ok(())
            },
        );
        Ok(Box::new(cursor))
    }
}
