//! Population planner/executor.
//!
//! A [`PopulationRequest`] names a destination table and the virtual table
//! feeding it. The planner scans that table once, with the request's
//! restrictions pushed down as hints, applies what the cursor left undone
//! along with the row conditions, and writes the resulting rows through
//! store batches of `batch_size` rows.
//!
//! Rows are buffered outside the transaction and written in one short
//! batch, so a batch transaction never spans a source read. A source error
//! or cancellation discards the buffered rows and leaves the store as of the
//! last committed batch. Under `create-or-replace` the first batch also
//! drops and recreates the destination.

use std::fmt;
use std::time::{Duration, Instant};

use biblion_core::{
    CancelToken, ColumnDef, Cursor, HintUse, Row, RowRange, Sample, ScanHint, SkippedRecord, Step,
    TableSchema, Value, VirtualSource, fmt_num, report_rows,
};
use biblion_store::{PopulationLogEntry, Store, StoreError, sql_type};
use indicatif::ProgressBar;

use crate::catalog::Catalog;
use crate::error::PopulateError;
use crate::linker::{LinkCache, LinkEvent, LinkPolicy, LinkSpec, Lookup, column_index};
use crate::selection::Condition;

/// Default rows per committed batch
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Discard prior contents, atomically with the first batch
    #[default]
    CreateOrReplace,
    Append,
}

impl WriteMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateOrReplace => "create-or-replace",
            Self::Append => "append",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "create-or-replace" | "replace" => Some(Self::CreateOrReplace),
            "append" => Some(Self::Append),
            _ => None,
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One population: where rows go, where they come from, and which rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRequest {
    pub destination: String,
    pub source_table: String,
    /// Source columns to keep, in output order; all when `None`
    pub columns: Option<Vec<String>>,
    pub key_prefix: Option<String>,
    /// Rows must satisfy every condition
    pub conditions: Vec<Condition>,
    /// Window over the rows left after the prefix and the conditions
    pub rows: Option<RowRange>,
    pub sample: Option<Sample>,
    pub mode: WriteMode,
    pub links: Vec<LinkSpec>,
}

impl PopulationRequest {
    pub fn new(destination: &str, source_table: &str) -> Self {
        Self {
            destination: destination.to_string(),
            source_table: source_table.to_string(),
            columns: None,
            key_prefix: None,
            conditions: Vec::new(),
            rows: None,
            sample: None,
            mode: WriteMode::default(),
            links: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = Some(prefix.to_string());
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn rows(mut self, range: RowRange) -> Self {
        self.rows = Some(range);
        self
    }

    /// Read only the containers `sample` keeps.
    pub fn sample(mut self, sample: Sample) -> Self {
        self.sample = Some(sample);
        self
    }

    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn link(mut self, link: LinkSpec) -> Self {
        self.links.push(link);
        self
    }
}

/// Outcome of one completed population.
#[derive(Debug, Default)]
pub struct PopulationReport {
    pub destination: String,
    /// Rows delivered by the cursor, before re-applied filters
    pub rows_read: u64,
    pub rows_written: u64,
    pub batches: u64,
    pub skipped: Vec<SkippedRecord>,
    pub link_events: Vec<LinkEvent>,
    pub elapsed: Duration,
}

impl PopulationReport {
    pub fn unresolved_links(&self) -> usize {
        self.link_events
            .iter()
            .filter(|e| matches!(e, LinkEvent::UnresolvedLink { .. }))
            .count()
    }

    pub fn ambiguous_links(&self) -> usize {
        self.link_events
            .iter()
            .filter(|e| matches!(e, LinkEvent::AmbiguousLink { .. }))
            .count()
    }
}

/// A resolved request: which cursor columns feed which output columns.
struct Plan<'c> {
    source: &'c dyn VirtualSource,
    key: usize,
    /// Source column per output column
    projected: Vec<usize>,
    /// Source column per link
    link_columns: Vec<usize>,
    /// Source column per condition
    condition_columns: Vec<usize>,
    scan_columns: Vec<usize>,
    destination: TableSchema,
}

fn describe(columns: impl Iterator<Item = (String, String)>) -> Vec<String> {
    columns.map(|(name, ty)| format!("{name} {ty}")).collect()
}

/// Drives cursors into the store.
pub struct Planner<'a> {
    catalog: &'a Catalog,
    store: &'a Store,
    batch_size: usize,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a Catalog, store: &'a Store) -> Self {
        Self {
            catalog,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn batch_size(mut self, rows: usize) -> Self {
        self.batch_size = rows.max(1);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    pub fn store(&self) -> &Store {
        self.store
    }

    fn plan(&self, req: &PopulationRequest) -> Result<Plan<'a>, PopulateError> {
        let (source, schema) = self.catalog.resolve(&req.source_table)?;

        let projected = match &req.columns {
            Some(names) => names
                .iter()
                .map(|n| column_index(schema, n))
                .collect::<Result<Vec<_>, _>>()?,
            None => (0..schema.width()).collect(),
        };

        let mut columns: Vec<ColumnDef> = projected.iter().map(|&i| schema.columns[i].clone()).collect();
        let mut link_columns = Vec::with_capacity(req.links.len());
        for link in &req.links {
            link_columns.push(column_index(schema, &link.column)?);
            let (_, target) = self.catalog.resolve(&link.target.table)?;
            let value = column_index(target, &link.target.value_column)?;
            columns.push(ColumnDef::new(link.output.clone(), target.columns[value].ty));
        }

        let condition_columns = req
            .conditions
            .iter()
            .map(|c| column_index(schema, &c.column))
            .collect::<Result<Vec<_>, _>>()?;

        let mut scan_columns = projected.clone();
        scan_columns.extend(&link_columns);
        scan_columns.extend(&condition_columns);
        scan_columns.push(schema.key);
        scan_columns.sort_unstable();
        scan_columns.dedup();

        let mut destination = TableSchema::new(req.destination.clone(), columns);
        destination.key = projected.iter().position(|&i| i == schema.key).unwrap_or(0);

        Ok(Plan {
            source,
            key: schema.key,
            projected,
            link_columns,
            condition_columns,
            scan_columns,
            destination,
        })
    }

    /// Append needs the stored columns to match the planned ones exactly.
    fn check_append(&self, dest: &TableSchema, found: &[(String, String)]) -> Result<(), PopulateError> {
        let expected = describe(
            dest.columns
                .iter()
                .map(|c| (c.name.clone(), sql_type(c.ty).to_string())),
        );
        let found = describe(found.iter().cloned());
        if expected != found {
            return Err(PopulateError::SchemaMismatch {
                table: dest.name.clone(),
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Open the scan cursor and work out which restrictions are left to us.
    fn open(
        &self,
        req: &PopulationRequest,
        plan: &Plan<'_>,
    ) -> Result<(Box<dyn Cursor>, HintUse), PopulateError> {
        let mut hint = ScanHint::all().columns(plan.scan_columns.clone());
        hint.key_prefix = req.key_prefix.clone();
        // the window counts rows that pass the conditions, which only we test
        hint.rows = req.rows.filter(|_| req.conditions.is_empty());
        hint.sample = req.sample;

        let mut cursor = plan.source.open_cursor(&req.source_table, &hint)?;
        let mut used = cursor.hint_use();
        used.rows &= hint.rows.is_some();
        if hint.key_prefix.is_some() && used.rows && !used.key_prefix {
            // the cursor windowed rows we still have to prefix-filter
            log::debug!("{}: reopening without row window", req.source_table);
            drop(cursor);
            hint.rows = None;
            cursor = plan.source.open_cursor(&req.source_table, &hint)?;
            used = HintUse {
                rows: false,
                ..cursor.hint_use()
            };
        }
        if req.sample.is_some() && !used.sample {
            log::warn!(
                "{}: source is not split into containers, sample ignored",
                req.source_table
            );
        }
        Ok((cursor, used))
    }

    /// Populate with a hidden progress line.
    pub fn populate(
        &self,
        req: &PopulationRequest,
        cancel: &CancelToken,
    ) -> Result<PopulationReport, PopulateError> {
        self.populate_with_progress(req, cancel, &ProgressBar::hidden())
    }

    pub fn populate_with_progress(
        &self,
        req: &PopulationRequest,
        cancel: &CancelToken,
        pb: &ProgressBar,
    ) -> Result<PopulationReport, PopulateError> {
        let start = Instant::now();
        let plan = self.plan(req)?;

        // Link indexes come first: their failures must precede any write.
        let mut links = LinkCache::new();
        for link in &req.links {
            links.index(self.catalog, &link.target)?;
        }

        let existing = self.store.table_columns(&req.destination)?;
        if let (WriteMode::Append, Some(found)) = (req.mode, &existing) {
            self.check_append(&plan.destination, found)?;
        }
        let mut writer = BatchWriter {
            store: self.store,
            destination: &plan.destination,
            replace: req.mode == WriteMode::CreateOrReplace,
            prepared: req.mode == WriteMode::Append && existing.is_some(),
            pending: Vec::with_capacity(self.batch_size.min(100_000)),
            written: 0,
            batches: 0,
        };

        log::info!(
            "Populating {} from {} ({})",
            req.destination,
            req.source_table,
            req.mode
        );
        let (mut cursor, used) = self.open(req, &plan)?;
        let prefix = req.key_prefix.as_deref().filter(|_| !used.key_prefix);
        let window = req.rows.filter(|_| !used.rows);

        let mut report = PopulationReport {
            destination: req.destination.clone(),
            ..Default::default()
        };
        let mut in_window = 0u64;
        loop {
            if cancel.is_cancelled() {
                log::warn!(
                    "{}: cancelled, {} buffered rows discarded",
                    req.destination,
                    writer.pending.len()
                );
                return Err(PopulateError::Cancelled);
            }
            let step = cursor.advance()?;
            report.skipped.extend(cursor.take_skipped());
            if step == Step::EndOfStream {
                break;
            }
            report.rows_read += 1;

            if let Some(p) = prefix {
                if !cursor.column(plan.key).starts_with(p) {
                    continue;
                }
            }
            let selected = req
                .conditions
                .iter()
                .zip(&plan.condition_columns)
                .all(|(c, &col)| c.matches(cursor.column(col)));
            if !selected {
                continue;
            }
            if let Some(w) = window {
                let n = in_window;
                in_window += 1;
                if w.is_past(n) {
                    break;
                }
                if !w.contains(n) {
                    continue;
                }
            }

            let Some(row) = self.build_row(req, &plan, cursor.as_ref(), &mut links, &mut report.link_events)?
            else {
                continue;
            };
            writer.pending.push(row);
            if writer.pending.len() >= self.batch_size {
                writer.flush()?;
            }
            report_rows(pb, report.rows_read, writer.written + writer.pending.len() as u64);
        }
        drop(cursor);
        writer.finish()?;

        for (link, &col) in req.links.iter().zip(&plan.link_columns) {
            if let Some(pos) = plan.projected.iter().position(|&i| i == col) {
                self.store
                    .create_index(&req.destination, &plan.destination.columns[pos].name)?;
            }
            self.store.create_index(&req.destination, &link.output)?;
        }

        report.rows_written = writer.written;
        report.batches = writer.batches;
        report.elapsed = start.elapsed();
        self.store.record_population(&PopulationLogEntry {
            destination: req.destination.clone(),
            source_table: req.source_table.clone(),
            mode: req.mode.name().to_string(),
            rows: report.rows_written,
        })?;

        pb.finish_with_message(format!("{} rows", fmt_num(report.rows_written)));
        log::info!(
            "{}: {} rows in {} batches, {} skipped, {} unresolved links ({:.1}s)",
            req.destination,
            fmt_num(report.rows_written),
            report.batches,
            report.skipped.len(),
            report.unresolved_links(),
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }

    /// Output row for the cursor's current row; `None` when a link policy
    /// drops it.
    fn build_row(
        &self,
        req: &PopulationRequest,
        plan: &Plan<'_>,
        cursor: &dyn Cursor,
        links: &mut LinkCache,
        events: &mut Vec<LinkEvent>,
    ) -> Result<Option<Row>, PopulateError> {
        let mut row: Row = Vec::with_capacity(plan.destination.width());
        row.extend(plan.projected.iter().map(|&i| cursor.column(i).clone()));

        for (link, &col) in req.links.iter().zip(&plan.link_columns) {
            let key = cursor.column(col);
            let value = match links.resolve(self.catalog, &link.target, key)? {
                Lookup::Resolved(v) => v,
                Lookup::Ambiguous(v) => {
                    let key = key.to_string();
                    let matches = links.index(self.catalog, &link.target)?.matches(&key);
                    let event = LinkEvent::AmbiguousLink {
                        output: link.output.clone(),
                        key,
                        matches,
                    };
                    note(link.policy, &event);
                    events.push(event);
                    v
                }
                // a null reference has nothing to resolve
                Lookup::Unresolved if key.is_null() => Value::Null,
                Lookup::Unresolved => {
                    let event = LinkEvent::UnresolvedLink {
                        output: link.output.clone(),
                        key: key.to_string(),
                    };
                    note(link.policy, &event);
                    events.push(event);
                    if link.policy == LinkPolicy::DropRow {
                        return Ok(None);
                    }
                    Value::Null
                }
            };
            row.push(value);
        }
        Ok(Some(row))
    }
}

fn note(policy: LinkPolicy, event: &LinkEvent) {
    if policy == LinkPolicy::Warn {
        log::warn!("{event}");
    } else {
        log::debug!("{event}");
    }
}

/// Buffers rows and writes them one batch transaction at a time.
struct BatchWriter<'s> {
    store: &'s Store,
    destination: &'s TableSchema,
    replace: bool,
    /// Destination already has its final shape
    prepared: bool,
    pending: Vec<Row>,
    written: u64,
    batches: u64,
}

impl BatchWriter<'_> {
    fn flush(&mut self) -> Result<(), StoreError> {
        let name = &self.destination.name;
        let mut batch = self.store.begin_batch()?;
        if !self.prepared {
            if self.replace {
                batch.drop_table(name)?;
            }
            batch.create_table(self.destination)?;
        }
        for row in &self.pending {
            batch.insert_row(name, row)?;
        }
        batch.commit()?;

        self.prepared = true;
        self.written += self.pending.len() as u64;
        self.batches += 1;
        log::debug!("{name}: batch {} committed ({} rows)", self.batches, self.pending.len());
        self.pending.clear();
        Ok(())
    }

    /// Write what is left. An empty result still creates the table.
    fn finish(&mut self) -> Result<(), StoreError> {
        if !self.pending.is_empty() || !self.prepared {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use biblion_core::{ColumnType, SourceError};

    use super::*;
    use crate::linker::LinkTarget;

    /// Ten rows keyed `k0`..`k9`, ignoring every hint.
    struct Plain(Vec<TableSchema>);

    struct PlainCursor {
        schema: TableSchema,
        row: Row,
        n: i64,
    }

    impl Cursor for PlainCursor {
        fn schema(&self) -> &TableSchema {
            &self.schema
        }

        fn advance(&mut self) -> Result<Step, SourceError> {
            if self.n == 10 {
                return Ok(Step::EndOfStream);
            }
            self.row = vec![Value::text(format!("k{}", self.n)), Value::Integer(self.n)];
            self.n += 1;
            Ok(Step::Row)
        }

        fn column(&self, idx: usize) -> &Value {
            &self.row[idx]
        }

        fn take_skipped(&mut self) -> Vec<SkippedRecord> {
            Vec::new()
        }

        fn hint_use(&self) -> HintUse {
            HintUse::NONE
        }
    }

    impl VirtualSource for Plain {
        fn name(&self) -> &str {
            "plain"
        }

        fn tables(&self) -> &[TableSchema] {
            &self.0
        }

        fn open_cursor(&self, _table: &str, _hint: &ScanHint) -> Result<Box<dyn Cursor>, SourceError> {
            Ok(Box::new(PlainCursor {
                schema: self.0[0].clone(),
                row: Vec::new(),
                n: 0,
            }))
        }
    }

    fn catalog() -> Catalog {
        Catalog::new().with(Plain(vec![TableSchema::new(
            "plain",
            vec![ColumnDef::text("key"), ColumnDef::integer("n")],
        )]))
    }

    fn keys(store: &Store, table: &str) -> Vec<String> {
        store
            .query(&format!("SELECT key FROM {table} ORDER BY n"))
            .unwrap()
            .into_iter()
            .map(|r| r[0].to_string())
            .collect()
    }

    #[test]
    fn window_reapplied_when_cursor_ignores_it() {
        let catalog = catalog();
        let store = Store::open_in_memory().unwrap();
        let req = PopulationRequest::new("out", "plain").rows(RowRange::new(3, Some(2)));
        let report = Planner::new(&catalog, &store)
            .populate(&req, &CancelToken::new())
            .unwrap();
        assert_eq!(keys(&store, "out"), vec!["k3", "k4"]);
        assert_eq!(report.rows_read, 6);
        assert_eq!(report.rows_written, 2);
    }

    #[test]
    fn prefix_reapplied_before_window() {
        let catalog = catalog();
        let store = Store::open_in_memory().unwrap();
        // only k1 matches "k1"; a window over unfiltered rows would miss it
        let req = PopulationRequest::new("out", "plain")
            .key_prefix("k1")
            .rows(RowRange::first(1));
        Planner::new(&catalog, &store)
            .populate(&req, &CancelToken::new())
            .unwrap();
        assert_eq!(keys(&store, "out"), vec!["k1"]);
    }

    #[test]
    fn conditions_apply_before_window() {
        let catalog = catalog();
        let store = Store::open_in_memory().unwrap();
        let req = PopulationRequest::new("out", "plain")
            .columns(&["key"])
            .filter("n >= 4".parse().unwrap())
            .filter("key != 'k5'".parse().unwrap())
            .rows(RowRange::first(2));
        let report = Planner::new(&catalog, &store)
            .populate(&req, &CancelToken::new())
            .unwrap();
        assert_eq!(report.rows_written, 2);
        // n is scanned for the condition but not stored
        assert_eq!(store.table_columns("out").unwrap().unwrap().len(), 1);
        let rows = store.query("SELECT key FROM out ORDER BY key").unwrap();
        let keys: Vec<String> = rows.into_iter().map(|r| r[0].to_string()).collect();
        assert_eq!(keys, vec!["k4", "k6"]);
    }

    #[test]
    fn condition_on_unknown_column() {
        let catalog = catalog();
        let store = Store::open_in_memory().unwrap();
        let req = PopulationRequest::new("out", "plain").filter("year > 3".parse().unwrap());
        let err = Planner::new(&catalog, &store)
            .populate(&req, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, PopulateError::UnknownColumn { .. }));
        assert!(store.table_columns("out").unwrap().is_none());
    }

    #[test]
    fn sample_ignored_by_unsplit_source() {
        let catalog = catalog();
        let store = Store::open_in_memory().unwrap();
        let req = PopulationRequest::new("out", "plain").sample(Sample::every(4).phase(1));
        let report = Planner::new(&catalog, &store)
            .populate(&req, &CancelToken::new())
            .unwrap();
        assert_eq!(report.rows_written, 10);
    }

    #[test]
    fn batches_and_projection() {
        let catalog = catalog();
        let store = Store::open_in_memory().unwrap();
        let req = PopulationRequest::new("out", "plain").columns(&["n"]);
        let report = Planner::new(&catalog, &store)
            .batch_size(4)
            .populate(&req, &CancelToken::new())
            .unwrap();
        assert_eq!(report.batches, 3);
        assert_eq!(
            store.table_columns("out").unwrap().unwrap(),
            vec![("n".to_string(), "BIGINT".to_string())]
        );
    }

    #[test]
    fn empty_result_still_creates_table() {
        let catalog = catalog();
        let store = Store::open_in_memory().unwrap();
        let req = PopulationRequest::new("out", "plain").key_prefix("zzz");
        let report = Planner::new(&catalog, &store)
            .populate(&req, &CancelToken::new())
            .unwrap();
        assert_eq!(report.rows_written, 0);
        assert_eq!(report.batches, 1);
        assert_eq!(store.row_count("out").unwrap(), 0);
    }

    #[test]
    fn append_rejects_other_columns() {
        let catalog = catalog();
        let store = Store::open_in_memory().unwrap();
        let planner = Planner::new(&catalog, &store);
        planner
            .populate(&PopulationRequest::new("out", "plain"), &CancelToken::new())
            .unwrap();

        let req = PopulationRequest::new("out", "plain")
            .columns(&["key"])
            .mode(WriteMode::Append);
        let err = planner.populate(&req, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, PopulateError::SchemaMismatch { .. }));
        assert_eq!(store.row_count("out").unwrap(), 10);
    }

    #[test]
    fn cancelled_before_first_row() {
        let catalog = catalog();
        let store = Store::open_in_memory().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = Planner::new(&catalog, &store)
            .populate(&PopulationRequest::new("out", "plain"), &cancel)
            .unwrap_err();
        assert!(matches!(err, PopulateError::Cancelled));
        assert!(store.table_columns("out").unwrap().is_none());
    }

    #[test]
    fn link_columns_take_target_type() {
        let catalog = catalog();
        let store = Store::open_in_memory().unwrap();
        let req = PopulationRequest::new("out", "plain")
            .columns(&["key"])
            .link(LinkSpec::new("key", LinkTarget::new("plain", "key", "n"), "self_n"));
        let report = Planner::new(&catalog, &store)
            .populate(&req, &CancelToken::new())
            .unwrap();
        assert!(report.link_events.is_empty());
        let cols = store.table_columns("out").unwrap().unwrap();
        assert_eq!(cols[1], ("self_n".to_string(), sql_type(ColumnType::Integer).to_string()));
        let rows = store.query("SELECT self_n FROM out WHERE key = 'k7'").unwrap();
        assert_eq!(rows[0][0], Value::Integer(7));
    }

    #[test]
    fn mode_names() {
        assert_eq!(WriteMode::from_name("append"), Some(WriteMode::Append));
        assert_eq!(WriteMode::CreateOrReplace.to_string(), "create-or-replace");
        assert_eq!(WriteMode::from_name("merge"), None);
    }
}
