//! Container stream readers: plain files, gzip streams, zip entries.
//!
//! Record splitting lives in the submodules: [`tar`] walks archive members,
//! [`xml`] and [`json`] cut a decoded stream into records, [`csv`] yields rows.
//! Everything here is sequential and single-pass.

pub mod csv;
pub mod json;
pub mod tar;
pub mod xml;

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::{DeflateDecoder, MultiGzDecoder};

use crate::error::SourceError;

/// Read buffer size (256KB) for file and decoder layers
pub const BUF_SIZE: usize = 256 * 1024;

/// Buffered reader over a decompressed gzip file.
pub type GzipReader = BufReader<MultiGzDecoder<BufReader<File>>>;

/// Open a source file for reading.
pub fn open_source(path: &Path) -> Result<File, SourceError> {
    File::open(path).map_err(|e| SourceError::unavailable(path, e))
}

/// Open a gzip file (single or multi-member) as a buffered decompressed stream.
///
/// Framing errors surface on the first read as `InvalidData`/`InvalidInput`;
/// map them with [`SourceError::from_read`].
pub fn open_gzip(path: &Path) -> Result<GzipReader, SourceError> {
    let file = open_source(path)?;
    let decoder = MultiGzDecoder::new(BufReader::with_capacity(BUF_SIZE, file));
    Ok(BufReader::with_capacity(BUF_SIZE, decoder))
}

/// Streaming reader over one zip entry's uncompressed bytes.
pub type ZipEntryReader = BufReader<Box<dyn Read + Send>>;

/// Open the first zip entry whose name ends with `suffix`.
///
/// The central directory is validated up front; the entry is then read
/// straight from its data offset so the reader owns the file handle.
/// Returns the entry name with the reader.
pub fn open_zip_entry(path: &Path, suffix: &str) -> Result<(String, ZipEntryReader), SourceError> {
    let file = open_source(path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| SourceError::corrupt(path, format!("zip: {e}")))?;

    let mut found = None;
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| SourceError::corrupt(path, format!("zip entry {i}: {e}")))?;
        if entry.is_file() && entry.name().ends_with(suffix) {
            found = Some((
                entry.name().to_string(),
                entry.compression(),
                entry.data_start(),
                entry.compressed_size(),
            ));
            break;
        }
    }
    let Some((name, method, start, size)) = found else {
        return Err(SourceError::corrupt(path, format!("zip has no *{suffix} entry")));
    };

    let mut inner = archive.into_inner();
    inner
        .seek(SeekFrom::Start(start))
        .map_err(|e| SourceError::from_read(path, e))?;
    let body = inner.take(size);
    let reader: Box<dyn Read + Send> = match method {
        zip::CompressionMethod::Stored => Box::new(body),
        zip::CompressionMethod::Deflated => Box::new(DeflateDecoder::new(body)),
        other => {
            return Err(SourceError::corrupt(
                path,
                format!("zip entry {name}: unsupported compression {other:?}"),
            ));
        }
    };
    log::debug!("{}: streaming zip entry {name} ({size} bytes)", path.display());
    Ok((name, BufReader::with_capacity(BUF_SIZE, reader)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Write};

    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = open_gzip(Path::new("/nonexistent/biblion/x.gz")).unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn gzip_multi_member() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.gz");
        let mut bytes = gzip(b"first\n");
        bytes.extend(gzip(b"second\n"));
        std::fs::write(&path, bytes).unwrap();

        let lines: Vec<String> = open_gzip(&path).unwrap().lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn gzip_bad_magic_is_corrupt_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gz");
        std::fs::write(&path, b"this is not gzip at all").unwrap();

        let mut reader = open_gzip(&path).unwrap();
        let mut out = String::new();
        let err = reader.read_to_string(&mut out).unwrap_err();
        assert!(SourceError::from_read(&path, err).is_corrupt());
    }

    fn write_zip(path: &Path, entries: &[(&str, &[u8], zip::CompressionMethod)]) {
        let file = File::create(path).unwrap();
        let mut zw = zip::ZipWriter::new(file);
        for (name, data, method) in entries {
            let opts = zip::write::SimpleFileOptions::default().compression_method(*method);
            zw.start_file(*name, opts).unwrap();
            zw.write_all(data).unwrap();
        }
        zw.finish().unwrap();
    }

    #[test]
    fn zip_entry_deflated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.zip");
        write_zip(
            &path,
            &[
                ("README.txt", b"readme", zip::CompressionMethod::Stored),
                ("v1-data.json", b"[1, 2, 3]", zip::CompressionMethod::Deflated),
            ],
        );
        let (name, mut reader) = open_zip_entry(&path, ".json").unwrap();
        assert_eq!(name, "v1-data.json");
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "[1, 2, 3]");
    }

    #[test]
    fn zip_entry_stored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.zip");
        write_zip(&path, &[("a.json", b"[]", zip::CompressionMethod::Stored)]);
        let (_, mut reader) = open_zip_entry(&path, ".json").unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn zip_without_entry_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n.zip");
        write_zip(&path, &[("a.txt", b"x", zip::CompressionMethod::Stored)]);
        assert!(open_zip_entry(&path, ".json").err().unwrap().is_corrupt());
    }

    #[test]
    fn not_a_zip_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.zip");
        std::fs::write(&path, b"garbage garbage garbage").unwrap();
        assert!(open_zip_entry(&path, ".json").err().unwrap().is_corrupt());
    }
}
