//! CSV row stream with a header line.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ErrorKind, StringRecord};

use crate::container::open_source;
use crate::cursor::{Pulled, RecordStream};
use crate::error::{RecordLocation, SkippedRecord, SourceError};

/// Rows of a headed CSV file; each data row is one record.
///
/// Rows whose field count differs from the header, or that are not valid
/// UTF-8, are reported as skipped.
pub struct CsvRecords<R: Read> {
    reader: csv::Reader<R>,
    path: PathBuf,
    source: String,
    headers: StringRecord,
    ordinal: u64,
}

impl CsvRecords<File> {
    pub fn open(path: &Path, source: &str) -> Result<Self, SourceError> {
        let file = open_source(path)?;
        Self::new(file, path, source)
    }
}

impl<R: Read> CsvRecords<R> {
    pub fn new(inner: R, path: &Path, source: &str) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(inner);
        let headers = reader
            .headers()
            .map_err(|e| csv_fatal(path, e))?
            .clone();
        Ok(Self {
            reader,
            path: path.to_path_buf(),
            source: source.to_string(),
            headers,
            ordinal: 0,
        })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Position of a header, compared case-insensitively and ignoring
    /// surrounding whitespace.
    pub fn header_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }
}

fn csv_fatal(path: &Path, e: csv::Error) -> SourceError {
    match e.into_kind() {
        ErrorKind::Io(io) => SourceError::from_read(path, io),
        other => SourceError::corrupt(path, format!("CSV header: {other:?}")),
    }
}

impl<R: Read> RecordStream for CsvRecords<R> {
    type Record = StringRecord;

    fn pull(&mut self) -> Result<Option<Pulled<StringRecord>>, SourceError> {
        let mut record = StringRecord::new();
        let result = self.reader.read_record(&mut record);
        let loc = RecordLocation::new(0, self.ordinal);
        match result {
            Ok(false) => Ok(None),
            Ok(true) => {
                self.ordinal += 1;
                if record.len() != self.headers.len() {
                    let reason = format!(
                        "expected {} fields, found {}",
                        self.headers.len(),
                        record.len()
                    );
                    return Ok(Some(Pulled::Skipped(SkippedRecord::new(&self.source, loc, reason))));
                }
                Ok(Some(Pulled::Record(record, loc)))
            }
            Err(e) => match e.into_kind() {
                ErrorKind::Io(io) => Err(SourceError::from_read(&self.path, io)),
                other => {
                    self.ordinal += 1;
                    let reason = format!("invalid CSV row: {other:?}");
                    Ok(Some(Pulled::Skipped(SkippedRecord::new(&self.source, loc, reason))))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull_all(data: &str) -> (Vec<Vec<String>>, usize) {
        let mut s = CsvRecords::new(data.as_bytes(), Path::new("t.csv"), "test").unwrap();
        let (mut rows, mut skipped) = (Vec::new(), 0);
        while let Some(p) = s.pull().unwrap() {
            match p {
                Pulled::Record(r, _) => rows.push(r.iter().map(str::to_string).collect()),
                Pulled::Skipped(_) => skipped += 1,
            }
        }
        (rows, skipped)
    }

    #[test]
    fn rows_and_quoted_fields() {
        let (rows, skipped) = pull_all("a,b\n1,\"x, y\"\n2,z\n");
        assert_eq!(skipped, 0);
        assert_eq!(rows, vec![vec!["1", "x, y"], vec!["2", "z"]]);
    }

    #[test]
    fn ragged_row_is_skipped() {
        let (rows, skipped) = pull_all("a,b\n1,2\n3\n4,5,6\n7,8\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let s = CsvRecords::new("Title, ISSN \n".as_bytes(), Path::new("t.csv"), "test").unwrap();
        assert_eq!(s.header_index("issn"), Some(1));
        assert_eq!(s.header_index("missing"), None);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = CsvRecords::open(Path::new("/nonexistent/j.csv"), "test").err().unwrap();
        assert!(err.is_unavailable());
    }
}
