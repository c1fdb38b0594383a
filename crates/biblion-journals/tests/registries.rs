//! Cursor behaviour over the journal CSV registries

use std::path::Path;

use biblion_core::{Cursor, ScanHint, Step, Value, VirtualSource};
use biblion_journals::{doaj, titles};

const DOAJ_CSV: &str = "\
Journal title,Journal URL,Alternative title,Journal ISSN (print version),Journal EISSN (online version),Publisher,Country of publisher,Languages in which the journal accepts manuscripts,Journal license,APC,DOAJ Seal,Added on Date
Acta Ceramica,https://acta.example.org,,1234-5678,2345-6789,Ceramic Press,Netherlands,English,CC BY,No,Yes,2019-05-01T10:00:00Z
Broken Row,https://broken.example.org
Open Pots,https://pots.example.org,Pots,,3456-7890,Clay Ltd,Germany,\"English, German\",CC BY-SA,Yes,No,2021-01-01T00:00:00Z
";

const TITLES_CSV: &str = "\
JournalTitle,JournalID,Publisher,pissn,eissn,additionalIssns,doi
Acta Ceramica,12345,Ceramic Press,12345678,23456789,,10.5555/acta
Journal of Glaze,notanumber,Glaze Society,99990000,,,
Journal of Kilns,777,Kiln House,11112222,,33334444,
";

fn drain(cursor: &mut Box<dyn Cursor>) -> Vec<Vec<Value>> {
    let width = cursor.schema().width();
    let mut rows = Vec::new();
    while cursor.advance().unwrap() == Step::Row {
        rows.push((0..width).map(|i| cursor.column(i).clone()).collect());
    }
    rows
}

fn write(dir: &Path, name: &str, data: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

#[test]
fn doaj_rows_and_short_row_skip() {
    let dir = tempfile::tempdir().unwrap();
    let source = doaj::source(write(dir.path(), "doaj.csv", DOAJ_CSV));
    assert_eq!(source.name(), "doaj");

    let mut cursor = source.open_cursor("open_access_journals", &ScanHint::all()).unwrap();
    let rows = drain(&mut cursor);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], Value::text("1234-5678"));
    assert_eq!(rows[0][9], Value::Integer(0));
    assert_eq!(rows[0][10], Value::Integer(1));
    assert_eq!(rows[1][0], Value::Null);
    assert_eq!(rows[1][7], Value::text("English, German"));

    let skipped = cursor.take_skipped();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].source, "doaj");
}

#[test]
fn titles_normalise_issn_and_skip_bad_id() {
    let dir = tempfile::tempdir().unwrap();
    let source = titles::source(write(dir.path(), "titleFile.csv", TITLES_CSV));

    let mut cursor = source.open_cursor("journal_names", &ScanHint::all()).unwrap();
    let rows = drain(&mut cursor);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], Value::text("1234-5678"));
    assert_eq!(rows[0][3], Value::Integer(12345));
    assert_eq!(rows[1][5], Value::text("33334444"));

    let skipped = cursor.take_skipped();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].reason.contains("crossref_id"));
}

#[test]
fn key_prefix_on_issn() {
    let dir = tempfile::tempdir().unwrap();
    let source = titles::source(write(dir.path(), "titleFile.csv", TITLES_CSV));
    let hint = ScanHint::all().key_prefix("1111-");
    let rows = drain(&mut source.open_cursor("journal_names", &hint).unwrap());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][2], Value::text("Journal of Kilns"));
}

#[test]
fn wrong_table_name() {
    let source = doaj::source("/nonexistent/doaj.csv");
    assert!(source.open_cursor("journal_names", &ScanHint::all()).is_err());
}
