//! Store summaries and the population log
//!
//! Besides per-table row counts, a store holding populated work tables can
//! rank the authors, references, subjects and organizations that occur most
//! often, and dump its whole contents as tab-separated text.

use std::io;

use biblion_core::{ColumnDef, TableSchema, Value};
use comfy_table::{Cell, CellAlignment, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::error::StoreError;
use crate::store::Store;
use crate::value::quote_ident;

pub const POPULATION_LOG: &str = "population_log";

fn log_schema() -> TableSchema {
    TableSchema::new(
        POPULATION_LOG,
        vec![
            ColumnDef::text("destination"),
            ColumnDef::text("source_table"),
            ColumnDef::text("mode"),
            ColumnDef::integer("row_count"),
            ColumnDef::text("populated_at"),
        ],
    )
}

/// One completed population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationLogEntry {
    pub destination: String,
    pub source_table: String,
    pub mode: String,
    pub rows: u64,
}

impl Store {
    /// Append `entry` to the population log, stamped with the current time.
    pub fn record_population(&self, entry: &PopulationLogEntry) -> Result<(), StoreError> {
        let row = [
            Value::from(entry.destination.as_str()),
            Value::from(entry.source_table.as_str()),
            Value::from(entry.mode.as_str()),
            Value::Integer(entry.rows as i64),
            Value::Text(chrono::Utc::now().to_rfc3339()),
        ];
        let mut batch = self.begin_batch()?;
        batch.ensure_table(&log_schema())?;
        batch.insert_row(POPULATION_LOG, &row)?;
        batch.commit()
    }

    /// Logged populations, oldest first.
    pub fn population_log(&self) -> Result<Vec<PopulationLogEntry>, StoreError> {
        if !self.table_exists(POPULATION_LOG)? {
            return Ok(Vec::new());
        }
        let rows = self.query(
            "SELECT destination, source_table, mode, row_count FROM population_log ORDER BY rowid",
        )?;
        Ok(rows
            .into_iter()
            .map(|r| PopulationLogEntry {
                destination: r[0].as_str().unwrap_or_default().to_string(),
                source_table: r[1].as_str().unwrap_or_default().to_string(),
                mode: r[2].as_str().unwrap_or_default().to_string(),
                rows: r[3].as_i64().unwrap_or_default() as u64,
            })
            .collect())
    }

    /// Names of every table, sorted.
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let names = self.query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'main' AND table_type = 'BASE TABLE' ORDER BY table_name",
        )?;
        Ok(names
            .iter()
            .filter_map(|r| r[0].as_str())
            .map(str::to_string)
            .collect())
    }

    /// Row count of every table, by name.
    pub fn table_counts(&self) -> Result<Vec<(String, u64)>, StoreError> {
        let names = self.table_names()?;
        let mut counts = Vec::with_capacity(names.len());
        for name in names {
            let rows = self.row_count(&name)?;
            counts.push((name, rows));
        }
        Ok(counts)
    }

    fn count_of(&self, sql: &str) -> Result<u64, StoreError> {
        let rows = self.query(sql)?;
        let n = rows.first().and_then(|r| r.first()).and_then(Value::as_i64);
        Ok(n.unwrap_or_default() as u64)
    }

    /// Counts over the populated author and reference tables.
    pub fn work_counts(&self) -> Result<WorkCounts, StoreError> {
        let authors = self.table_exists("work_authors")?;
        let references = self.table_exists("work_references")?;
        Ok(WorkCounts {
            distinct_orcids: authors
                .then(|| self.count_of("SELECT count(DISTINCT orcid) FROM work_authors"))
                .transpose()?,
            works_with_authors: authors
                .then(|| self.count_of("SELECT count(DISTINCT work_doi) FROM work_authors"))
                .transpose()?,
            references_with_doi: references
                .then(|| self.count_of("SELECT count(*) FROM work_references WHERE doi IS NOT NULL"))
                .transpose()?,
        })
    }

    /// [`table_counts`](Store::table_counts) rendered as a table, followed
    /// by the [`work_counts`](Store::work_counts) that apply.
    pub fn counts_report(&self) -> Result<String, StoreError> {
        let counts = self.table_counts()?;
        let mut table = styled(["Table", "Rows"]);
        for (name, rows) in &counts {
            table.add_row(vec![
                Cell::new(name),
                Cell::new(biblion_core::fmt_num(*rows)).set_alignment(CellAlignment::Right),
            ]);
        }
        let mut out = table.to_string();

        let extra = self.work_counts()?.labelled();
        if !extra.is_empty() {
            let mut table = styled(["Count", "Value"]);
            for (label, n) in extra {
                table.add_row(vec![
                    Cell::new(label),
                    Cell::new(biblion_core::fmt_num(n)).set_alignment(CellAlignment::Right),
                ]);
            }
            out.push('\n');
            out.push_str(&table.to_string());
        }
        Ok(out)
    }

    /// The `limit` most frequent labels of every ranking whose table is
    /// populated. Ties are broken by label.
    pub fn rankings(&self, limit: usize) -> Result<Vec<Ranking>, StoreError> {
        let mut out = Vec::new();
        for kind in RankingKind::ALL {
            if !self.table_exists(kind.table())? {
                continue;
            }
            let rows = self.query(&format!(
                "{} ORDER BY n DESC, label LIMIT {limit}",
                kind.grouped_sql()
            ))?;
            let entries = rows
                .into_iter()
                .map(|r| Ranked {
                    label: r[0].to_string(),
                    count: r[1].as_i64().unwrap_or_default() as u64,
                })
                .collect();
            out.push(Ranking { kind, entries });
        }
        Ok(out)
    }

    /// [`rankings`](Store::rankings) rendered as titled tables.
    pub fn rankings_report(&self, limit: usize) -> Result<String, StoreError> {
        let mut out = String::new();
        for ranking in self.rankings(limit)? {
            let mut table = styled([ranking.kind.label_header(), "Works"]);
            for entry in &ranking.entries {
                table.add_row(vec![
                    Cell::new(&entry.label),
                    Cell::new(biblion_core::fmt_num(entry.count)).set_alignment(CellAlignment::Right),
                ]);
            }
            out.push_str(ranking.kind.title());
            out.push('\n');
            out.push_str(&table.to_string());
            out.push('\n');
        }
        Ok(out)
    }

    /// Write every table to `out`: a `TABLE <name>` line, then one
    /// tab-separated line per row. Nulls are written as empty fields.
    pub fn dump_tables<W: io::Write>(&self, out: W) -> Result<(), StoreError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_writer(out);
        for name in self.table_names()? {
            writer.write_record([format!("TABLE {name}")])?;
            for row in self.query(&format!("SELECT * FROM {}", quote_ident(&name)))? {
                writer.write_record(row.iter().map(|v| match v {
                    Value::Null => String::new(),
                    v => v.to_string(),
                }))?;
            }
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

fn styled<const N: usize>(header: [&str; N]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header.map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

/// Counts over populated work tables; `None` where the table is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkCounts {
    pub distinct_orcids: Option<u64>,
    pub works_with_authors: Option<u64>,
    pub references_with_doi: Option<u64>,
}

impl WorkCounts {
    fn labelled(&self) -> Vec<(&'static str, u64)> {
        [
            ("distinct author ORCIDs", self.distinct_orcids),
            ("works with authors", self.works_with_authors),
            ("references with DOI", self.references_with_doi),
        ]
        .into_iter()
        .filter_map(|(label, n)| n.map(|n| (label, n)))
        .collect()
    }
}

/// What a [`Ranking`] counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingKind {
    /// Author ORCIDs by authored works
    Authors,
    /// Referenced DOIs by citing works
    CitedReferences,
    /// Subjects by works
    Subjects,
    /// Affiliation names by works
    Organizations,
}

impl RankingKind {
    pub const ALL: [RankingKind; 4] = [
        RankingKind::Authors,
        RankingKind::CitedReferences,
        RankingKind::Subjects,
        RankingKind::Organizations,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Authors => "Authors with most works",
            Self::CitedReferences => "Most cited references",
            Self::Subjects => "Most treated subjects",
            Self::Organizations => "Organizations with most works",
        }
    }

    fn label_header(self) -> &'static str {
        match self {
            Self::Authors => "ORCID",
            Self::CitedReferences => "DOI",
            Self::Subjects => "Subject",
            Self::Organizations => "Organization",
        }
    }

    fn table(self) -> &'static str {
        match self {
            Self::Authors => "work_authors",
            Self::CitedReferences => "work_references",
            Self::Subjects => "work_subjects",
            Self::Organizations => "author_affiliations",
        }
    }

    /// `label, n` grouped, unordered.
    fn grouped_sql(self) -> &'static str {
        match self {
            Self::Authors => {
                "SELECT orcid AS label, count(*) AS n FROM work_authors \
                 WHERE orcid IS NOT NULL GROUP BY orcid"
            }
            Self::CitedReferences => {
                "SELECT doi AS label, count(*) AS n FROM work_references \
                 WHERE doi IS NOT NULL GROUP BY doi"
            }
            // a work listing a subject twice still counts once
            Self::Subjects => {
                "SELECT name AS label, count(DISTINCT work_doi) AS n FROM work_subjects \
                 WHERE name IS NOT NULL GROUP BY name"
            }
            Self::Organizations => {
                "SELECT name AS label, count(DISTINCT work_doi) AS n FROM author_affiliations \
                 WHERE name IS NOT NULL GROUP BY name"
            }
        }
    }
}

/// A label and the number of works it occurs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub kind: RankingKind,
    pub entries: Vec<Ranked>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(destination: &str, rows: u64) -> PopulationLogEntry {
        PopulationLogEntry {
            destination: destination.to_string(),
            source_table: "works".to_string(),
            mode: "append".to_string(),
            rows,
        }
    }

    #[test]
    fn log_round_trip() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.population_log().unwrap().is_empty());
        store.record_population(&entry("works", 5)).unwrap();
        store.record_population(&entry("works2", 0)).unwrap();
        assert_eq!(store.population_log().unwrap(), vec![entry("works", 5), entry("works2", 0)]);

        let stamp = store.query("SELECT populated_at FROM population_log").unwrap();
        let stamp = stamp[0][0].as_str().unwrap().to_string();
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }

    #[test]
    fn counts_cover_every_table() {
        let store = Store::open_in_memory().unwrap();
        store.record_population(&entry("works", 5)).unwrap();
        let mut batch = store.begin_batch().unwrap();
        batch
            .execute("CREATE TABLE works (doi VARCHAR); INSERT INTO works VALUES ('a'), ('b')")
            .unwrap();
        batch.commit().unwrap();

        assert_eq!(
            store.table_counts().unwrap(),
            vec![("population_log".to_string(), 1), ("works".to_string(), 2)]
        );
        let report = store.counts_report().unwrap();
        assert!(report.contains("population_log"));
        assert!(report.contains("Rows"));
        assert!(!report.contains("ORCIDs"));
    }

    fn populated() -> Store {
        let store = Store::open_in_memory().unwrap();
        let mut batch = store.begin_batch().unwrap();
        batch
            .execute(
                "CREATE TABLE work_authors (work_doi VARCHAR, orcid VARCHAR); \
                 INSERT INTO work_authors VALUES \
                   ('10.1/a', '0000-0001'), ('10.1/b', '0000-0001'), ('10.1/b', '0000-0002'), \
                   ('10.1/c', NULL), ('10.1/c', '0000-0003'), ('10.1/d', '0000-0002'); \
                 CREATE TABLE work_references (work_doi VARCHAR, doi VARCHAR); \
                 INSERT INTO work_references VALUES \
                   ('10.1/a', '10.9/x'), ('10.1/b', '10.9/x'), ('10.1/c', '10.9/y'), ('10.1/c', NULL); \
                 CREATE TABLE work_subjects (work_doi VARCHAR, name VARCHAR); \
                 INSERT INTO work_subjects VALUES \
                   ('10.1/a', 'Optics'), ('10.1/a', 'Optics'), ('10.1/b', 'Algebra'), ('10.1/c', 'Algebra')",
            )
            .unwrap();
        batch.commit().unwrap();
        store
    }

    #[test]
    fn work_counts_skip_absent_tables() {
        let store = populated();
        assert_eq!(
            store.work_counts().unwrap(),
            WorkCounts {
                distinct_orcids: Some(3),
                works_with_authors: Some(4),
                references_with_doi: Some(3),
            }
        );
        let report = store.counts_report().unwrap();
        assert!(report.contains("distinct author ORCIDs"));
        assert!(report.contains("references with DOI"));

        let empty = Store::open_in_memory().unwrap();
        assert_eq!(empty.work_counts().unwrap(), WorkCounts::default());
    }

    #[test]
    fn rankings_order_by_count_then_label() {
        let store = populated();
        let rankings = store.rankings(2).unwrap();
        // no author_affiliations table, no organization ranking
        let kinds: Vec<_> = rankings.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RankingKind::Authors, RankingKind::CitedReferences, RankingKind::Subjects]
        );

        let ranked = |kind: RankingKind| -> Vec<(String, u64)> {
            rankings
                .iter()
                .find(|r| r.kind == kind)
                .unwrap()
                .entries
                .iter()
                .map(|e| (e.label.clone(), e.count))
                .collect()
        };
        assert_eq!(
            ranked(RankingKind::Authors),
            vec![("0000-0001".to_string(), 2), ("0000-0002".to_string(), 2)]
        );
        assert_eq!(
            ranked(RankingKind::CitedReferences),
            vec![("10.9/x".to_string(), 2), ("10.9/y".to_string(), 1)]
        );
        assert_eq!(
            ranked(RankingKind::Subjects),
            vec![("Algebra".to_string(), 2), ("Optics".to_string(), 1)]
        );

        let report = store.rankings_report(2).unwrap();
        assert!(report.contains("Most cited references"));
        assert!(report.contains("10.9/x"));
        assert!(!report.contains("Organizations"));
    }

    #[test]
    fn dump_lists_every_table() {
        let store = Store::open_in_memory().unwrap();
        let mut batch = store.begin_batch().unwrap();
        batch
            .execute(
                "CREATE TABLE b (k VARCHAR, n BIGINT); INSERT INTO b VALUES ('x', NULL); \
                 CREATE TABLE a (k VARCHAR); INSERT INTO a VALUES ('one two')",
            )
            .unwrap();
        batch.commit().unwrap();

        let mut out = Vec::new();
        store.dump_tables(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "TABLE a\none two\nTABLE b\nx\t\n");
    }
}
