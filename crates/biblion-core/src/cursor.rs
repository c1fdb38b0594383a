//! Generic cursor over a stream of raw records that flatten into rows.
//!
//! Adapters supply a [`RecordStream`] (container + record splitting) and a
//! flatten function (decode one record into zero or more rows of the scanned
//! table). [`FlatCursor`] turns that pair into a [`Cursor`], applying the
//! key-prefix and row-range hints and containing per-record failures.

use std::collections::VecDeque;

use crate::error::{RecordLocation, SkippedRecord, SourceError};
use crate::table::{Cursor, HintUse, Row, RowRange, ScanHint, Step, TableSchema, Value};

/// One unit pulled from a record stream.
pub enum Pulled<T> {
    Record(T, RecordLocation),
    /// The container layer could not extract this record
    Skipped(SkippedRecord),
}

/// Single-pass source of raw records, in file order.
pub trait RecordStream {
    type Record;

    /// Next record, or `Ok(None)` once the stream is exhausted.
    fn pull(&mut self) -> Result<Option<Pulled<Self::Record>>, SourceError>;
}

static NULL: Value = Value::Null;

/// Cursor built from a record stream and a flatten function.
///
/// The flatten function receives one decoded-or-raw record and appends the
/// rows it yields for the scanned table. An `Err(reason)` discards every row
/// of that record and queues one [`SkippedRecord`].
pub struct FlatCursor<S, F> {
    schema: &'static TableSchema,
    source: String,
    stream: Option<S>,
    flatten: F,
    pending: VecDeque<Row>,
    current: Option<Row>,
    key_prefix: Option<String>,
    rows: Option<RowRange>,
    used: HintUse,
    /// Rows that passed the prefix filter so far
    matched: u64,
    skipped: Vec<SkippedRecord>,
    scratch: Vec<Row>,
}

impl<S, F> FlatCursor<S, F>
where
    S: RecordStream,
    F: FnMut(S::Record, &RecordLocation, &mut Vec<Row>) -> Result<(), String>,
{
    pub fn new(
        schema: &'static TableSchema,
        source: impl Into<String>,
        stream: S,
        hint: &ScanHint,
        flatten: F,
    ) -> Self {
        Self {
            schema,
            source: source.into(),
            stream: Some(stream),
            flatten,
            pending: VecDeque::new(),
            current: None,
            key_prefix: hint.key_prefix.clone(),
            rows: hint.rows,
            used: HintUse {
                sample: false,
                ..HintUse::ALL
            },
            matched: 0,
            skipped: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Mark the container sample as applied by the stream.
    pub fn sampled(mut self) -> Self {
        self.used.sample = true;
        self
    }

    fn skip(&mut self, event: SkippedRecord) {
        log::warn!("{event}");
        self.skipped.push(event);
    }

    /// Drop the stream, releasing the file handle.
    fn finish(&mut self) -> Step {
        self.stream = None;
        self.pending.clear();
        self.current = None;
        Step::EndOfStream
    }

    fn next_row(&mut self) -> Result<Option<Row>, SourceError> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            let Some(stream) = self.stream.as_mut() else {
                return Ok(None);
            };
            match stream.pull()? {
                None => return Ok(None),
                Some(Pulled::Skipped(mut event)) => {
                    // container readers leave the source name to the cursor
                    if event.source.is_empty() {
                        event.source.clone_from(&self.source);
                    }
                    self.skip(event)
                }
                Some(Pulled::Record(record, location)) => {
                    self.scratch.clear();
                    match (self.flatten)(record, &location, &mut self.scratch) {
                        Ok(()) => self.pending.extend(self.scratch.drain(..)),
                        Err(reason) => {
                            let event = SkippedRecord::new(self.source.clone(), location, reason);
                            self.skip(event);
                        }
                    }
                }
            }
        }
    }
}

impl<S, F> Cursor for FlatCursor<S, F>
where
    S: RecordStream,
    F: FnMut(S::Record, &RecordLocation, &mut Vec<Row>) -> Result<(), String>,
{
    fn schema(&self) -> &TableSchema {
        self.schema
    }

    fn advance(&mut self) -> Result<Step, SourceError> {
        loop {
            if self.rows.is_some_and(|r| r.is_past(self.matched)) {
                return Ok(self.finish());
            }
            let Some(row) = self.next_row()? else {
                return Ok(self.finish());
            };
            if let Some(prefix) = &self.key_prefix {
                if !row[self.schema.key].starts_with(prefix) {
                    continue;
                }
            }
            let n = self.matched;
            self.matched += 1;
            if self.rows.is_some_and(|r| !r.contains(n)) {
                continue;
            }
            self.current = Some(row);
            return Ok(Step::Row);
        }
    }

    fn column(&self, idx: usize) -> &Value {
        self.current
            .as_ref()
            .and_then(|row| row.get(idx))
            .unwrap_or(&NULL)
    }

    fn take_skipped(&mut self) -> Vec<SkippedRecord> {
        std::mem::take(&mut self.skipped)
    }

    fn hint_use(&self) -> HintUse {
        self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnDef;
    use std::sync::LazyLock;

    static SCHEMA: LazyLock<TableSchema> = LazyLock::new(|| {
        TableSchema::new("items", vec![ColumnDef::text("id"), ColumnDef::integer("n")])
    });

    /// Records are `Some(id)` for good input, `None` for a container-level skip
    struct VecStream {
        items: std::vec::IntoIter<Option<&'static str>>,
        ordinal: u64,
    }

    impl RecordStream for VecStream {
        type Record = &'static str;

        fn pull(&mut self) -> Result<Option<Pulled<&'static str>>, SourceError> {
            let Some(item) = self.items.next() else {
                return Ok(None);
            };
            let loc = RecordLocation::new(0, self.ordinal);
            self.ordinal += 1;
            Ok(Some(match item {
                Some(s) => Pulled::Record(s, loc),
                None => Pulled::Skipped(SkippedRecord::new("test", loc, "unreadable")),
            }))
        }
    }

    fn cursor(
        items: Vec<Option<&'static str>>,
        hint: &ScanHint,
    ) -> FlatCursor<VecStream, impl FnMut(&'static str, &RecordLocation, &mut Vec<Row>) -> Result<(), String>>
    {
        let stream = VecStream {
            items: items.into_iter(),
            ordinal: 0,
        };
        FlatCursor::new(&SCHEMA, "test", stream, hint, |rec: &'static str, loc: &RecordLocation, out: &mut Vec<Row>| {
            if rec == "bad" {
                return Err("bad record".to_string());
            }
            out.push(vec![Value::text(rec), Value::Integer(loc.ordinal as i64)]);
            Ok(())
        })
    }

    fn drain(c: &mut impl Cursor) -> Vec<String> {
        let mut ids = Vec::new();
        while c.advance().unwrap() == Step::Row {
            ids.push(c.column(0).to_string());
        }
        ids
    }

    #[test]
    fn counts_rows_and_skips() {
        let mut c = cursor(vec![Some("a"), Some("bad"), None, Some("b")], &ScanHint::all());
        assert_eq!(drain(&mut c), vec!["a", "b"]);
        let skipped = c.take_skipped();
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].location.ordinal, 1);
        assert!(c.take_skipped().is_empty());
    }

    #[test]
    fn prefix_then_range() {
        let items = vec![Some("x1"), Some("y1"), Some("x2"), Some("x3"), Some("x4")];
        let hint = ScanHint::all().key_prefix("x").rows(RowRange::new(1, Some(2)));
        let mut c = cursor(items, &hint);
        assert_eq!(drain(&mut c), vec!["x2", "x3"]);
    }

    #[test]
    fn column_is_stable_and_null_outside_rows() {
        let mut c = cursor(vec![Some("a")], &ScanHint::all());
        assert!(c.column(0).is_null());
        assert_eq!(c.advance().unwrap(), Step::Row);
        assert_eq!(c.column(0), &Value::text("a"));
        assert_eq!(c.column(0), &Value::text("a"));
        assert!(c.column(9).is_null());
        assert_eq!(c.advance().unwrap(), Step::EndOfStream);
        assert_eq!(c.advance().unwrap(), Step::EndOfStream);
        assert!(c.column(0).is_null());
    }

    #[test]
    fn limit_releases_stream_early() {
        let mut c = cursor(vec![Some("a"), Some("b"), Some("c")], &ScanHint::all().rows(RowRange::first(1)));
        assert_eq!(drain(&mut c), vec!["a"]);
        assert!(c.stream.is_none());
    }
}
