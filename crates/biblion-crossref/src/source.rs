//! Work-archive virtual source

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use biblion_core::{
    ColumnMask, Cursor, FlatCursor, JsonArrayRecords, Pulled, RecordLocation, RecordStream, Row,
    Sample, ScanHint, SkippedRecord, SourceError, TableSchema, TarMembers, VirtualSource, top_level_field,
};
use flate2::read::GzDecoder;
use rustc_hash::FxHashSet;
use serde::de::IgnoredAny;
use serde_json::value::RawValue;

use crate::SOURCE_NAME;
use crate::flatten::flatten;
use crate::index::PrefixIndex;
use crate::record::{Item, Work};
use crate::schema::{TABLES, Table};

/// Items of one member, each decoded on its own.
pub(crate) type MemberItems = Vec<Result<Box<RawValue>, String>>;

/// Decode one archive member body, `{"items": [...]}`, into its raw items.
///
/// `.gz` members are decompressed first; anything else is read as plain JSON.
/// The `items` array is split element by element, so a malformed item is
/// reported alone while its neighbours still decode. The whole member fails
/// only when decompression fails or the array framing itself is broken.
pub(crate) fn decode_member(name: &str, body: &[u8]) -> Result<MemberItems, String> {
    let json = if name.ends_with(".gz") {
        let mut out = Vec::with_capacity(body.len() * 4);
        GzDecoder::new(body)
            .read_to_end(&mut out)
            .map_err(|e| format!("gzip: {e}"))?;
        out
    } else {
        body.to_vec()
    };

    let Some(at) = top_level_field(&json, "items") else {
        // no items at all is fine for a well-formed member
        serde_json::from_slice::<IgnoredAny>(&json).map_err(|e| format!("member JSON: {e}"))?;
        return Ok(Vec::new());
    };
    let mut elements = JsonArrayRecords::new(&json[at..], Path::new(name));
    let mut items = Vec::new();
    while let Some(pulled) = elements.pull().map_err(|e| format!("member JSON: {e}"))? {
        if let Pulled::Record(bytes, _) = pulled {
            items.push(
                serde_json::from_slice::<Box<RawValue>>(&bytes).map_err(|e| format!("item JSON: {e}")),
            );
        }
    }
    Ok(items)
}

/// Items of every member, in archive order.
///
/// Members listed in `skip`, or left out by the sample, are passed over
/// without reading their bodies.
pub struct MemberStream {
    members: TarMembers<BufReader<File>>,
    skip: FxHashSet<u32>,
    sample: Option<Sample>,
    queue: VecDeque<Pulled<Item>>,
    ordinal: u64,
}

impl MemberStream {
    pub fn open(path: &Path, skip: FxHashSet<u32>, sample: Option<Sample>) -> Result<Self, SourceError> {
        Ok(Self {
            members: TarMembers::open(path)?,
            skip,
            sample,
            queue: VecDeque::new(),
            ordinal: 0,
        })
    }
}

impl RecordStream for MemberStream {
    type Record = Item;

    fn pull(&mut self) -> Result<Option<Pulled<Item>>, SourceError> {
        loop {
            if let Some(pulled) = self.queue.pop_front() {
                return Ok(Some(pulled));
            }
            let Some(member) = self.members.next_member()? else {
                return Ok(None);
            };
            if self.skip.contains(&member.index) {
                log::trace!("{}: member {} pruned by prefix index", SOURCE_NAME, member.name);
                continue;
            }
            if self.sample.is_some_and(|s| !s.keeps(member.index)) {
                continue;
            }
            let body = self.members.read_body()?;
            match decode_member(&member.name, &body) {
                Ok(items) => {
                    for (position, item) in items.into_iter().enumerate() {
                        let loc = RecordLocation::in_member(member.index, self.ordinal, member.name.clone());
                        self.ordinal += 1;
                        self.queue.push_back(match item {
                            Ok(raw) => Pulled::Record(Item { raw, position }, loc),
                            Err(reason) => Pulled::Skipped(SkippedRecord::new(SOURCE_NAME, loc, reason)),
                        });
                    }
                }
                Err(reason) => {
                    let loc = RecordLocation::in_member(member.index, self.ordinal, member.name);
                    self.ordinal += 1;
                    return Ok(Some(Pulled::Skipped(SkippedRecord::new(SOURCE_NAME, loc, reason))));
                }
            }
        }
    }
}

/// Crossref snapshot served as virtual relations.
#[derive(Debug)]
pub struct CrossrefSource {
    path: PathBuf,
    index: Option<PrefixIndex>,
}

impl CrossrefSource {
    /// Source over the archive at `path`. Loads the DOI-prefix index sidecar
    /// when one is present and matches the archive; the archive itself is
    /// not touched until a cursor is opened.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let index = PrefixIndex::load_for(&path);
        Self { path, index }
    }

    pub fn with_index(mut self, index: PrefixIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> Option<&PrefixIndex> {
        self.index.as_ref()
    }
}

impl VirtualSource for CrossrefSource {
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
        let skip = match (&self.index, &hint.key_prefix) {
            (Some(index), Some(prefix)) => index.excluded_members(prefix),
            _ => FxHashSet::default(),
        };
        if !skip.is_empty() {
            log::debug!("{SOURCE_NAME}: prefix index prunes {} members", skip.len());
        }
        let stream = MemberStream::open(&self.path, skip, hint.sample)?;
        let mask = ColumnMask::for_hint(table.schema(), hint);
        let cursor = FlatCursor::new(
            table.schema(),
            SOURCE_NAME,
            stream,
            hint,
            move |item: Item, loc: &RecordLocation, out: &mut Vec<Row>| {
                let work = Work::from_raw(&item.raw)?;
                flatten(table, &work, &item, loc, &mask, out)
            },
        )
        .sampled();
        Ok(Box::new(cursor))
    }
}
