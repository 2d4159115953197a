use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use percent_encoding::percent_decode_str;
use std::hash::{Hash, Hasher};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    File,
}

/// One remote file or directory, as reported by a listing.
///
/// Entries are identified by their address alone: two entries with the same
/// address describe the same remote object, whatever else they carry.
#[derive(Debug, Clone)]
pub struct FileEntry {
    address: Url,
    kind: EntryKind,
    modified: Option<NaiveDateTime>,
    size: u64,
}

impl FileEntry {
    pub fn directory(address: Url) -> Self {
        Self {
            address,
            kind: EntryKind::Directory,
            modified: None,
            size: 0,
        }
    }

    pub fn file(address: Url, modified: NaiveDateTime, size: u64) -> Self {
        Self {
            address,
            kind: EntryKind::File,
            modified: Some(modified),
            size,
        }
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Last modification time; always `None` for directories.
    pub fn modified(&self) -> Option<NaiveDateTime> {
        self.modified
    }

    /// Length in bytes; always 0 for directories.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last non-empty path segment of the address, percent-decoded.
    pub fn name(&self) -> String {
        self.address
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl PartialEq for FileEntry {
    fn eq(&self, other: &Self) -> bool {
        self.address.as_str() == other.address.as_str()
    }
}

impl Eq for FileEntry {}

impl Hash for FileEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.as_str().hash(state);
    }
}

/// Resolves a bare entry name against a directory address the way a relative
/// reference would: without a trailing slash the directory's own last segment
/// is replaced. The name always becomes exactly one encoded segment.
pub fn resolve_child(directory: &Url, name: &str) -> Result<Url> {
    let mut child = directory
        .join("./")
        .map_err(|e| Error::invalid_address(directory.as_str(), e.to_string()))?;
    child
        .path_segments_mut()
        .map_err(|()| Error::invalid_address(directory.as_str(), "address cannot have a path"))?
        .pop_if_empty()
        .push(name);
    Ok(child)
}
