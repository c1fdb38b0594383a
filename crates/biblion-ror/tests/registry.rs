//! Cursor behaviour over a zipped registry dump

use std::io::Write;
use std::path::{Path, PathBuf};

use biblion_core::{Cursor, ScanHint, Step, Value, VirtualSource};
use biblion_ror::RorSource;

const ORGS: &str = r#"[
  {"id": "https://ror.org/05gq02987", "names": [{"value": "Brown University", "types": ["ror_display"]}], "status": "active", "types": ["education"], "established": 1764, "links": [], "relationships": []},
  {"id": "https://ror.org/0broken00", "names": [{"value": "Broken", "types": ["ror_display"]}], "established": "soon"},
  {"id": "https://ror.org/04dkp9463", "name": "University of Amsterdam", "aliases": ["UvA"], "acronyms": [], "types": ["Education"], "country": {"country_code": "NL", "country_name": "Netherlands"}, "links": ["http://www.uva.nl"], "external_ids": {}}
]"#;

fn write_dump(dir: &Path, method: zip::CompressionMethod) -> PathBuf {
    let path = dir.join("ror-data.zip");
    let mut zw = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    let opts = zip::write::SimpleFileOptions::default().compression_method(method);
    zw.start_file("README.txt", opts).unwrap();
    zw.write_all(b"registry dump").unwrap();
    zw.start_file("v1.45-2024-05-01-ror-data.json", opts).unwrap();
    zw.write_all(ORGS.as_bytes()).unwrap();
    zw.finish().unwrap();
    path
}

fn drain(cursor: &mut Box<dyn Cursor>) -> Vec<Vec<Value>> {
    let width = cursor.schema().width();
    let mut rows = Vec::new();
    while cursor.advance().unwrap() == Step::Row {
        rows.push((0..width).map(|i| cursor.column(i).clone()).collect());
    }
    rows
}

#[test]
fn deflated_entry_with_bad_record() {
    let dir = tempfile::tempdir().unwrap();
    let source = RorSource::open(write_dump(dir.path(), zip::CompressionMethod::Deflated));

    let mut cursor = source.open_cursor("organizations", &ScanHint::all()).unwrap();
    let rows = drain(&mut cursor);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], Value::text("Brown University"));
    assert_eq!(rows[1][5], Value::text("NL"));

    let skipped = cursor.take_skipped();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].location.ordinal, 1);
    assert_eq!(
        skipped[0].location.member.as_deref(),
        Some("v1.45-2024-05-01-ror-data.json")
    );
}

#[test]
fn broken_element_mid_array_is_one_skip() {
    let orgs = r#"[
  {"id": "https://ror.org/05gq02987", "names": [{"value": "Brown University", "types": ["ror_display"]}]},
  {"id": "https://ror.org/0cut00000", "names": [{"value": }], "links": ["x"]},
  {"id": "https://ror.org/04dkp9463", "name": "University of Amsterdam"}
]"#;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ror-data.zip");
    let mut zw = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    let opts = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    zw.start_file("ror-data.json", opts).unwrap();
    zw.write_all(orgs.as_bytes()).unwrap();
    zw.finish().unwrap();

    let mut cursor = RorSource::open(&path)
        .open_cursor("organizations", &ScanHint::all())
        .unwrap();
    let ids: Vec<String> = drain(&mut cursor).iter().map(|r| r[0].to_string()).collect();
    assert_eq!(ids, vec!["https://ror.org/05gq02987", "https://ror.org/04dkp9463"]);
    let skipped = cursor.take_skipped();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].location.ordinal, 1);
}

#[test]
fn stored_entry_alias_rows() {
    let dir = tempfile::tempdir().unwrap();
    let source = RorSource::open(write_dump(dir.path(), zip::CompressionMethod::Stored));

    let mut cursor = source
        .open_cursor("organization_aliases", &ScanHint::all())
        .unwrap();
    let rows = drain(&mut cursor);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], Value::text("https://ror.org/04dkp9463"));
    assert_eq!(rows[0][2], Value::text("UvA"));
}

#[test]
fn not_a_zip_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ror.zip");
    std::fs::write(&path, b"this is not a zip archive").unwrap();
    let err = RorSource::open(&path)
        .open_cursor("organizations", &ScanHint::all())
        .err()
        .unwrap();
    assert!(err.is_corrupt());
}
