//! Content availability stores: an in-memory set and a JSON content list.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use shared_types::{ContentId, Params};
use tracing::debug;

use crate::error::StoreError;
use crate::ports::outbound::ContentStore;

// ============================================================================
// MemoryContentStore - set of held content addresses
// ============================================================================

/// In-memory set of content addresses this provider holds.
///
/// A request is served when its payload CID is held or, failing that, when
/// its piece CID is.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    cids: RwLock<HashSet<ContentId>>,
}

impl MemoryContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `cids`.
    pub fn with_content<I, C>(cids: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ContentId>,
    {
        Self {
            cids: RwLock::new(cids.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns `false` if `cid` was already held.
    pub fn insert(&self, cid: impl Into<ContentId>) -> bool {
        self.cids.write().insert(cid.into())
    }

    /// Returns `false` if `cid` was not held.
    pub fn remove(&self, cid: &ContentId) -> bool {
        self.cids.write().remove(cid)
    }

    pub fn contains(&self, cid: &ContentId) -> bool {
        self.cids.read().contains(cid)
    }

    pub fn len(&self) -> usize {
        self.cids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cids.read().is_empty()
    }

    fn replace(&self, cids: HashSet<ContentId>) {
        *self.cids.write() = cids;
    }
}

impl ContentStore for MemoryContentStore {
    fn has(&self, params: &Params) -> Result<bool, StoreError> {
        let cids = self.cids.read();
        if cids.contains(&params.payload_cid) {
            return Ok(true);
        }
        Ok(params
            .piece_cid
            .as_ref()
            .is_some_and(|piece| cids.contains(piece)))
    }
}

// ============================================================================
// JsonFileContentStore - content list loaded from disk
// ============================================================================

/// Content store backed by a JSON array of content-address strings.
///
/// ```json
/// ["bafy...payload1", "bafy...payload2"]
/// ```
///
/// Blank entries are ignored.
#[derive(Debug)]
pub struct JsonFileContentStore {
    path: PathBuf,
    inner: MemoryContentStore,
}

impl JsonFileContentStore {
    /// Load the content list at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let cids = read_content_list(&path)?;
        debug!(path = %path.display(), entries = cids.len(), "Loaded content list");

        Ok(Self {
            path,
            inner: MemoryContentStore::with_content(cids),
        })
    }

    /// Re-read the file, replacing the held set. Returns the new entry count.
    pub fn reload(&self) -> Result<usize, StoreError> {
        let cids = read_content_list(&self.path)?;
        let count = cids.len();
        self.inner.replace(cids);
        debug!(path = %self.path.display(), entries = count, "Reloaded content list");
        Ok(count)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ContentStore for JsonFileContentStore {
    fn has(&self, params: &Params) -> Result<bool, StoreError> {
        self.inner.has(params)
    }
}

fn read_content_list(path: &Path) -> Result<HashSet<ContentId>, StoreError> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let entries: Vec<String> =
        serde_json::from_str(&content).map_err(|e| StoreError::Parse(e.to_string()))?;

    Ok(entries
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(ContentId::from)
        .collect())
}
