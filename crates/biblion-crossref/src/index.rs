//! DOI-prefix member index.
//!
//! Maps each archive member to the set of DOI registrant prefixes
//! (`10.1000/`) of the works it holds. With a key-prefix hint, members whose
//! prefixes cannot match are skipped without being decompressed. The index
//! lives in a JSON sidecar next to the archive, `<archive>.prefixes.json`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use biblion_core::{SourceError, TarMembers};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::SOURCE_NAME;
use crate::record::doi_prefix;
use crate::source::decode_member;

/// On-disk form, sorted for stable output
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    /// Archive size in bytes when the index was built
    archive_len: u64,
    members: BTreeMap<u32, BTreeSet<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixIndex {
    archive_len: u64,
    members: FxHashMap<u32, FxHashSet<String>>,
}

/// Sidecar path for an archive: `works.tar` -> `works.tar.prefixes.json`
pub fn sidecar_path(archive: &Path) -> PathBuf {
    let mut name = archive.file_name().unwrap_or_default().to_os_string();
    name.push(".prefixes.json");
    archive.with_file_name(name)
}

/// A member may hold matching rows when one of its registrant prefixes
/// starts with the wanted key prefix, or the wanted prefix extends it.
fn compatible(member_prefix: &str, wanted: &str) -> bool {
    member_prefix.starts_with(wanted) || wanted.starts_with(member_prefix)
}

impl PrefixIndex {
    /// Scan the whole archive once, collecting each member's prefixes.
    ///
    /// Members that fail to decode, or hold an undecodable item, are left out
    /// of the index, so they are never pruned.
    pub fn build(archive: &Path) -> Result<Self, SourceError> {
        #[derive(Deserialize)]
        struct DoiOnly {
            #[serde(rename = "DOI", default)]
            doi: Option<String>,
        }

        let archive_len = archive_len(archive)?;
        let mut members = TarMembers::open(archive)?;
        let mut index = FxHashMap::default();
        while let Some(member) = members.next_member()? {
            let body = members.read_body()?;
            let items = match decode_member(&member.name, &body) {
                Ok(items) => items,
                Err(reason) => {
                    log::warn!("{SOURCE_NAME}: not indexing {}: {reason}", member.name);
                    continue;
                }
            };
            let dois: Result<Vec<Option<String>>, String> = items
                .iter()
                .map(|item| {
                    let raw = item.as_ref().map_err(String::clone)?;
                    serde_json::from_str::<DoiOnly>(raw.get())
                        .map(|w| w.doi)
                        .map_err(|e| e.to_string())
                })
                .collect();
            // a member with unreadable items still owes its skip events
            let dois = match dois {
                Ok(dois) => dois,
                Err(reason) => {
                    log::warn!("{SOURCE_NAME}: not indexing {}: {reason}", member.name);
                    continue;
                }
            };
            let prefixes: FxHashSet<String> = dois
                .into_iter()
                .flatten()
                .filter_map(|doi| doi_prefix(doi.trim()).map(str::to_string))
                .collect();
            index.insert(member.index, prefixes);
        }
        log::info!("{SOURCE_NAME}: indexed {} members of {}", index.len(), archive.display());
        Ok(Self {
            archive_len,
            members: index,
        })
    }

    /// Load an index from a sidecar file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let file: IndexFile = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        Ok(Self {
            archive_len: file.archive_len,
            members: file
                .members
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().collect()))
                .collect(),
        })
    }

    /// Load the sidecar of `archive` if present and built for an archive of
    /// the same size. Problems are logged, never fatal.
    pub fn load_for(archive: &Path) -> Option<Self> {
        let sidecar = sidecar_path(archive);
        if !sidecar.exists() {
            return None;
        }
        let index = match Self::load(&sidecar) {
            Ok(index) => index,
            Err(e) => {
                log::warn!("{SOURCE_NAME}: ignoring {}: {e}", sidecar.display());
                return None;
            }
        };
        match std::fs::metadata(archive) {
            Ok(m) if m.len() == index.archive_len => {
                log::debug!("{SOURCE_NAME}: loaded prefix index {}", sidecar.display());
                Some(index)
            }
            Ok(_) => {
                log::warn!("{SOURCE_NAME}: {} is stale, ignoring", sidecar.display());
                None
            }
            Err(_) => None,
        }
    }

    /// Save as JSON.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let file = IndexFile {
            archive_len: self.archive_len,
            members: self
                .members
                .iter()
                .map(|(k, v)| (*k, v.iter().cloned().collect()))
                .collect(),
        };
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &file)?;
        log::info!("Saved prefix index for {} members to {}", self.members.len(), path.display());
        Ok(())
    }

    /// Save next to the archive it was built from.
    pub fn save_for(&self, archive: &Path) -> std::io::Result<PathBuf> {
        let path = sidecar_path(archive);
        self.save(&path)?;
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn prefixes(&self, member: u32) -> Option<&FxHashSet<String>> {
        self.members.get(&member)
    }

    /// Members that cannot hold a DOI starting with `wanted`.
    pub fn excluded_members(&self, wanted: &str) -> FxHashSet<u32> {
        self.members
            .iter()
            .filter(|(_, prefixes)| !prefixes.iter().any(|p| compatible(p, wanted)))
            .map(|(m, _)| *m)
            .collect()
    }
}

fn archive_len(path: &Path) -> Result<u64, SourceError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| SourceError::unavailable(path, e))
}
