//! JSON array splitter: yields the raw bytes of each top-level element.
//!
//! Only string, escape and nesting state is tracked; element contents are
//! validated later by the adapter's decoder.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::cursor::{Pulled, RecordStream};
use crate::error::{RecordLocation, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Elements,
    Done,
}

pub struct JsonArrayRecords<R: BufRead> {
    reader: R,
    path: PathBuf,
    member: Option<String>,
    state: State,
    ordinal: u64,
}

impl<R: BufRead> JsonArrayRecords<R> {
    pub fn new(reader: R, path: &Path) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            member: None,
            state: State::Start,
            ordinal: 0,
        }
    }

    /// Tag record locations with the archive member the array came from.
    pub fn in_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Next byte that is not whitespace (or a BOM at the start), unconsumed.
    fn peek_significant(&mut self) -> Result<Option<u8>, SourceError> {
        loop {
            let available = match self.reader.fill_buf() {
                Ok(b) => b,
                Err(e) => return Err(SourceError::from_read(&self.path, e)),
            };
            if available.is_empty() {
                return Ok(None);
            }
            if self.state == State::Start && available.starts_with(b"\xEF\xBB\xBF") {
                self.reader.consume(3);
                continue;
            }
            let skip = available
                .iter()
                .take_while(|b| b.is_ascii_whitespace())
                .count();
            if skip < available.len() {
                let b = available[skip];
                self.reader.consume(skip);
                return Ok(Some(b));
            }
            let n = available.len();
            self.reader.consume(n);
        }
    }

    /// Bytes of one element, up to (not including) the `,` or `]` ending it.
    fn read_element(&mut self) -> Result<Vec<u8>, SourceError> {
        let mut out = Vec::new();
        let mut depth = 0u32;
        let mut in_string = false;
        let mut escaped = false;
        loop {
            let available = match self.reader.fill_buf() {
                Ok(b) => b,
                Err(e) => return Err(SourceError::from_read(&self.path, e)),
            };
            if available.is_empty() {
                return Err(SourceError::corrupt(&self.path, "unterminated JSON array"));
            }
            let mut used = 0;
            let mut done = false;
            for &b in available {
                if in_string {
                    if escaped {
                        escaped = false;
                    } else if b == b'\\' {
                        escaped = true;
                    } else if b == b'"' {
                        in_string = false;
                    }
                } else {
                    match b {
                        b'"' => in_string = true,
                        b'{' | b'[' => depth += 1,
                        b'}' | b']' if depth == 0 => {
                            done = true;
                            break;
                        }
                        b'}' | b']' => depth -= 1,
                        b',' if depth == 0 => {
                            done = true;
                            break;
                        }
                        _ => {}
                    }
                }
                used += 1;
            }
            out.extend_from_slice(&available[..used]);
            self.reader.consume(used);
            if done {
                return Ok(out);
            }
        }
    }
}

/// Offset of the value of `key` in the top-level object of `doc`.
///
/// Only string and nesting state is tracked, so the value itself may be
/// malformed; callers split or decode it separately.
pub fn top_level_field(doc: &[u8], key: &str) -> Option<usize> {
    let mut depth = 0u32;
    let mut i = 0;
    while i < doc.len() {
        match doc[i] {
            b'"' => {
                let start = i + 1;
                let end = string_end(doc, start)?;
                i = end + 1;
                if depth == 1 && &doc[start..end] == key.as_bytes() {
                    let colon = skip_whitespace(doc, i);
                    if doc.get(colon) == Some(&b':') {
                        return Some(skip_whitespace(doc, colon + 1));
                    }
                }
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the quote closing the string whose contents start at `from`.
fn string_end(doc: &[u8], from: usize) -> Option<usize> {
    let mut escaped = false;
    for (i, &b) in doc.iter().enumerate().skip(from) {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'"' {
            return Some(i);
        }
    }
    None
}

fn skip_whitespace(doc: &[u8], from: usize) -> usize {
    from + doc[from.min(doc.len())..]
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count()
}

impl<R: BufRead> RecordStream for JsonArrayRecords<R> {
    type Record = Vec<u8>;

    fn pull(&mut self) -> Result<Option<Pulled<Vec<u8>>>, SourceError> {
        loop {
            match self.state {
                State::Done => return Ok(None),
                State::Start => match self.peek_significant()? {
                    Some(b'[') => {
                        self.reader.consume(1);
                        self.state = State::Elements;
                    }
                    Some(b) => {
                        return Err(SourceError::corrupt(
                            &self.path,
                            format!("expected JSON array, found {:?}", b as char),
                        ));
                    }
                    None => return Err(SourceError::corrupt(&self.path, "empty JSON document")),
                },
                State::Elements => match self.peek_significant()? {
                    None => return Err(SourceError::corrupt(&self.path, "unterminated JSON array")),
                    Some(b']') => {
                        self.reader.consume(1);
                        self.state = State::Done;
                    }
                    Some(b',') => self.reader.consume(1),
                    Some(_) => {
                        let bytes = self.read_element()?;
                        let loc = match &self.member {
                            Some(m) => RecordLocation::in_member(0, self.ordinal, m.clone()),
                            None => RecordLocation::new(0, self.ordinal),
                        };
                        self.ordinal += 1;
                        return Ok(Some(Pulled::Record(bytes, loc)));
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn split(json: &[u8]) -> Result<Vec<String>, SourceError> {
        // tiny buffer so elements straddle refills
        let reader = BufReader::with_capacity(4, json);
        let mut s = JsonArrayRecords::new(reader, Path::new("t.json"));
        let mut out = Vec::new();
        while let Some(Pulled::Record(bytes, _)) = s.pull()? {
            out.push(String::from_utf8(bytes).unwrap().trim().to_string());
        }
        Ok(out)
    }

    #[test]
    fn splits_objects() {
        let got = split(br#" [ {"a": [1, 2], "b": "x,]}"}, {"c": {"d": "\"}"}} ] "#).unwrap();
        assert_eq!(got, vec![r#"{"a": [1, 2], "b": "x,]}"}"#, r#"{"c": {"d": "\"}"}}"#]);
    }

    #[test]
    fn scalars_and_bom() {
        let got = split(b"\xEF\xBB\xBF[1, \"two\", null]").unwrap();
        assert_eq!(got, vec!["1", "\"two\"", "null"]);
    }

    #[test]
    fn empty_array() {
        assert!(split(b"[]").unwrap().is_empty());
        assert!(split(b"  [ \n ]  ").unwrap().is_empty());
    }

    #[test]
    fn malformed_element_still_splits() {
        let got = split(br#"[{"ok": 1}, {"broken": }, {"ok": 2}]"#).unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[1], r#"{"broken": }"#);
    }

    #[test]
    fn unterminated_is_corrupt() {
        assert!(split(br#"[{"a": 1}, {"b": "#).unwrap_err().is_corrupt());
    }

    #[test]
    fn finds_top_level_field() {
        let doc = br#"{"status": "ok", "message": {"items": 1}, "k\"ey": 2, "items" : [{"a": "items"}]}"#;
        let at = top_level_field(doc, "items").unwrap();
        assert!(doc[at..].starts_with(br#"[{"a""#));
        assert_eq!(top_level_field(br#"{"a": "items"}"#, "items"), None);
        assert_eq!(top_level_field(br#"{"items"#, "items"), None);
    }

    #[test]
    fn splits_array_at_field() {
        let doc = br#"{"items": [{"n": 1}, {"n": }, {"n": 3}]}"#;
        let at = top_level_field(doc, "items").unwrap();
        let mut s = JsonArrayRecords::new(&doc[at..], Path::new("m.json"));
        let mut n = 0;
        while let Some(Pulled::Record(..)) = s.pull().unwrap() {
            n += 1;
        }
        assert_eq!(n, 3);
    }

    #[test]
    fn not_an_array_is_corrupt() {
        assert!(split(br#"{"a": 1}"#).unwrap_err().is_corrupt());
    }
}
