//! Sequential tar member walker.
//!
//! Headers are decoded with [`tar::Header`], but the block stream is driven
//! here so the walker owns its reader and can skip a member body without
//! touching it. GNU long names and pax `path` records are honoured.
//!
//! `tar::Archive::entries` hands out an iterator borrowing the archive and
//! can only start at offset zero, so a cursor that owns its archive and
//! resumes across calls cannot hold one.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::container::{BUF_SIZE, open_source};
use crate::error::SourceError;

const BLOCK: u64 = 512;
/// Largest body buffer reserved up front
const PREALLOC_LIMIT: u64 = 8 << 20;

/// A regular-file member header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarMember {
    /// Ordinal among regular-file members, from 0
    pub index: u32,
    pub name: String,
    pub size: u64,
}

/// Forward-only walk over the regular-file members of a tar stream.
pub struct TarMembers<R> {
    reader: R,
    path: PathBuf,
    next_index: u32,
    /// Unread body bytes of the current member
    body_left: u64,
    /// Padding after the current member's body
    pad_left: u64,
    done: bool,
}

impl TarMembers<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = open_source(path)?;
        Ok(Self::new(BufReader::with_capacity(BUF_SIZE, file), path))
    }
}

impl<R: Read> TarMembers<R> {
    pub fn new(reader: R, path: &Path) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            next_index: 0,
            body_left: 0,
            pad_left: 0,
            done: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Advance to the next regular-file member, skipping whatever is left of
    /// the current one. `Ok(None)` at the end-of-archive marker.
    pub fn next_member(&mut self) -> Result<Option<TarMember>, SourceError> {
        if self.done {
            return Ok(None);
        }
        self.skip_bytes(self.body_left + self.pad_left)?;
        self.body_left = 0;
        self.pad_left = 0;

        let mut long_name: Option<String> = None;
        loop {
            let mut block = [0u8; BLOCK as usize];
            if !self.read_block(&mut block)? {
                self.done = true;
                return Ok(None);
            }
            if block.iter().all(|&b| b == 0) {
                self.done = true;
                return Ok(None);
            }

            let header = tar::Header::from_byte_slice(&block);
            self.verify_checksum(header, &block)?;
            let size = header
                .entry_size()
                .map_err(|e| SourceError::corrupt(&self.path, format!("tar header size: {e}")))?;
            let padding = padded(size) - size;
            let kind = header.entry_type();

            if kind.is_gnu_longname() {
                let data = self.read_exact_vec(size)?;
                self.skip_bytes(padding)?;
                let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                long_name = Some(String::from_utf8_lossy(&data[..end]).into_owned());
                continue;
            }
            if kind.is_pax_local_extensions() {
                let data = self.read_exact_vec(size)?;
                self.skip_bytes(padding)?;
                if let Some(name) = pax_path(&data) {
                    long_name = Some(name);
                }
                continue;
            }
            if !kind.is_file() {
                // directories, links, global pax headers
                self.skip_bytes(size + padding)?;
                long_name = None;
                continue;
            }

            let name = match long_name.take() {
                Some(n) => n,
                None => String::from_utf8_lossy(&header.path_bytes()).into_owned(),
            };
            self.body_left = size;
            self.pad_left = padding;
            let index = self.next_index;
            self.next_index += 1;
            return Ok(Some(TarMember { index, name, size }));
        }
    }

    /// Read the whole body of the current member.
    pub fn read_body(&mut self) -> Result<Vec<u8>, SourceError> {
        let data = self.read_exact_vec(self.body_left)?;
        self.body_left = 0;
        Ok(data)
    }

    fn verify_checksum(&self, header: &tar::Header, block: &[u8]) -> Result<(), SourceError> {
        let stored = header
            .cksum()
            .map_err(|e| SourceError::corrupt(&self.path, format!("tar header checksum: {e}")))?;
        let computed: u32 = block
            .iter()
            .enumerate()
            .map(|(i, &b)| if (148..156).contains(&i) { u32::from(b' ') } else { u32::from(b) })
            .sum();
        if stored != computed {
            return Err(SourceError::corrupt(
                &self.path,
                format!("tar header checksum mismatch (stored {stored}, computed {computed})"),
            ));
        }
        Ok(())
    }

    /// Fill one block. `Ok(false)` on a clean end of input at a block boundary.
    fn read_block(&mut self, block: &mut [u8]) -> Result<bool, SourceError> {
        let mut filled = 0;
        while filled < block.len() {
            match self.reader.read(&mut block[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => {
                    return Err(SourceError::corrupt(&self.path, "truncated tar header block"));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(SourceError::from_read(&self.path, e)),
            }
        }
        Ok(true)
    }

    fn read_exact_vec(&mut self, len: u64) -> Result<Vec<u8>, SourceError> {
        // sizes come from possibly corrupt headers; let the vector grow
        let mut data = Vec::with_capacity(len.min(PREALLOC_LIMIT) as usize);
        let got = (&mut self.reader)
            .take(len)
            .read_to_end(&mut data)
            .map_err(|e| SourceError::from_read(&self.path, e))?;
        if (got as u64) < len {
            return Err(SourceError::corrupt(
                &self.path,
                format!("truncated tar member: expected {len} bytes, got {got}"),
            ));
        }
        Ok(data)
    }

    fn skip_bytes(&mut self, len: u64) -> Result<(), SourceError> {
        if len == 0 {
            return Ok(());
        }
        let got = io::copy(&mut (&mut self.reader).take(len), &mut io::sink())
            .map_err(|e| SourceError::from_read(&self.path, e))?;
        if got < len {
            return Err(SourceError::corrupt(&self.path, "truncated tar member"));
        }
        Ok(())
    }
}

fn padded(size: u64) -> u64 {
    size.div_ceil(BLOCK) * BLOCK
}

fn pax_path(data: &[u8]) -> Option<String> {
    tar::PaxExtensions::new(data)
        .filter_map(Result::ok)
        .find(|ext| ext.key() == Ok("path"))
        .and_then(|ext| ext.value().ok().map(str::to_string))
}
