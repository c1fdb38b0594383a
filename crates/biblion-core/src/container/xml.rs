//! XML record splitter.
//!
//! Streams a document and captures every outermost element whose local name
//! is in the record set, re-serialised into an owned buffer. Adapters parse
//! the captured bytes with their own `Reader<&[u8]>` loops.
//!
//! Record boundaries follow the record element's own tags only: a record
//! ends at the end tag carrying its name, whatever happened inside it, and a
//! new start tag of the same name means the open record was never closed.
//! Either way the damage stays in one record, which the adapter's parser
//! rejects as a skipped record. Record elements therefore may not nest in
//! themselves.

use std::borrow::Cow;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};

use crate::cursor::{Pulled, RecordStream};
use crate::error::{RecordLocation, SkippedRecord, SourceError};

pub struct XmlRecords<R: BufRead> {
    reader: Reader<R>,
    path: PathBuf,
    records: &'static [&'static str],
    buf: Vec<u8>,
    /// Start tag that interrupted the previous record
    pending: Option<BytesStart<'static>>,
    ordinal: u64,
}

impl<R: BufRead> XmlRecords<R> {
    pub fn new(inner: R, path: &Path, records: &'static [&'static str]) -> Self {
        let mut reader = Reader::from_reader(inner);
        // mismatched tags inside a record are the record parser's problem
        reader.config_mut().check_end_names = false;
        Self {
            reader,
            path: path.to_path_buf(),
            records,
            buf: Vec::with_capacity(8 * 1024),
            pending: None,
            ordinal: 0,
        }
    }

    fn location(&mut self) -> RecordLocation {
        let loc = RecordLocation::new(0, self.ordinal);
        self.ordinal += 1;
        loc
    }

    fn capture_from(&mut self, start: BytesStart<'static>) -> Result<Pulled<Vec<u8>>, SourceError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let captured = capture(&mut self.reader, &self.path, start)?;
        let loc = self.location();
        Ok(match captured {
            Captured::Complete(bytes) => Pulled::Record(bytes, loc),
            Captured::Interrupted(next) => {
                self.pending = Some(next);
                // the source name is filled in by the cursor
                Pulled::Skipped(SkippedRecord::new(
                    "",
                    loc,
                    format!("<{name}> not closed before the next <{name}>"),
                ))
            }
        })
    }
}

fn is_record(records: &[&str], local: &[u8]) -> bool {
    records.iter().any(|r| r.as_bytes() == local)
}

/// Map a reader error: I/O from the decompression layer keeps its class,
/// everything else is broken XML framing.
fn xml_error(path: &Path, pos: u64, e: quick_xml::Error) -> SourceError {
    match e {
        quick_xml::Error::Io(io) => SourceError::from_read(path, io::Error::new(io.kind(), io.to_string())),
        other => SourceError::corrupt(path, format!("XML error at byte {pos}: {other}")),
    }
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> SourceError {
    SourceError::corrupt(path, format!("XML re-serialisation: {e}"))
}

enum Captured {
    Complete(Vec<u8>),
    /// A start tag of the same name arrived first; carries that tag
    Interrupted(BytesStart<'static>),
}

/// Copy events from `start` through the end tag of the same name.
fn capture<R: BufRead>(
    reader: &mut Reader<R>,
    path: &Path,
    start: BytesStart<'static>,
) -> Result<Captured, SourceError> {
    let record_name = start.local_name().as_ref().to_vec();
    let mut writer = Writer::new(Vec::with_capacity(4 * 1024));
    writer
        .write_event(Event::Start(start))
        .map_err(|e| write_error(path, e))?;

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(path, reader.buffer_position(), e))?;
        let closes = match &event {
            Event::Start(e) if e.local_name().as_ref() == record_name.as_slice() => {
                return Ok(Captured::Interrupted(e.clone().into_owned()));
            }
            Event::End(e) => e.local_name().as_ref() == record_name.as_slice(),
            Event::Eof => {
                return Err(SourceError::corrupt(
                    path,
                    format!(
                        "unexpected end of file inside <{}>",
                        String::from_utf8_lossy(&record_name)
                    ),
                ));
            }
            _ => false,
        };
        writer
            .write_event(event)
            .map_err(|e| write_error(path, e))?;
        if closes {
            return Ok(Captured::Complete(writer.into_inner()));
        }
    }
}

impl<R: BufRead> RecordStream for XmlRecords<R> {
    type Record = Vec<u8>;

    fn pull(&mut self) -> Result<Option<Pulled<Vec<u8>>>, SourceError> {
        if let Some(start) = self.pending.take() {
            return self.capture_from(start).map(Some);
        }
        let records = self.records;
        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| xml_error(&self.path, self.reader.buffer_position(), e))?;
            match event {
                Event::Start(e) if is_record(records, e.local_name().as_ref()) => {
                    let start = e.into_owned();
                    return self.capture_from(start).map(Some);
                }
                Event::Empty(e) if is_record(records, e.local_name().as_ref()) => {
                    let mut writer = Writer::new(Vec::new());
                    writer
                        .write_event(Event::Empty(e))
                        .map_err(|err| write_error(&self.path, err))?;
                    let bytes = writer.into_inner();
                    let loc = self.location();
                    return Ok(Some(Pulled::Record(bytes, loc)));
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

// ============================================================
// Helpers for parsing captured records
// ============================================================

/// Resolver for named entities beyond the five XML predefined ones.
pub type EntityResolver = fn(&str) -> Option<&'static str>;

/// Resolve only the XML predefined entities.
pub fn predefined_entities(name: &str) -> Option<&'static str> {
    resolve_predefined_entity(name)
}

/// Concatenated text of the element just opened, through its end tag,
/// including text of nested elements. Result is trimmed.
pub fn read_text(reader: &mut Reader<&[u8]>, entities: EntityResolver) -> quick_xml::Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Text(e) => text.push_str(&e.unescape_with(entities)?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e.into_inner())),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text.trim().to_string())
}

/// Skip the element just opened, through its end tag.
pub fn skip_element(reader: &mut Reader<&[u8]>) -> quick_xml::Result<()> {
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(()),
            Event::End(_) => depth -= 1,
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}

/// Unescaped value of attribute `name`, if present.
pub fn attribute<'a>(e: &'a BytesStart<'_>, name: &[u8]) -> quick_xml::Result<Option<Cow<'a, str>>> {
    match e.try_get_attribute(name)? {
        Some(attr) => Ok(Some(Cow::Owned(attr.unescape_value()?.into_owned()))),
        None => Ok(None),
    }
}
