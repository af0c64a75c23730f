//! Blob store for the ledger workbook, its SQLite snapshot and the label table
//!
//! The store is a flat key -> bytes namespace. A missing object is not an
//! error: it means nothing has been uploaded yet. Reads are memoized per key
//! for the life of a [`CachedStore`]; writes go through and drop the memo for
//! the written key.
//!
//! There is no concurrency control: the last writer wins.

use miette::Diagnostic;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::core::config::Config;

/// Storage failures other than "object not found"
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("failed to access stored object '{key}'")]
    #[diagnostic(code(submat::store::io))]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object key '{0}'")]
    #[diagnostic(
        code(submat::store::key),
        help("object keys are plain file names without path separators")
    )]
    InvalidKey(String),
}

/// Byte-oriented object storage
pub trait BlobStore {
    /// Fetch an object; `Ok(None)` when it does not exist yet
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Create or overwrite an object
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Size of an object in bytes, if present
    fn size(&self, key: &str) -> Result<Option<u64>, StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.size(key)?.is_some())
    }
}

/// Filesystem-backed store: one file per key under a root directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key == ".." {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

impl BlobStore for FsStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io_err)?;

        // Write to a sibling file first so readers never see a torn object
        let tmp = self.root.join(format!(".{}.partial", key));
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }

    fn size(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let path = self.path_for(key)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Memoizing wrapper around any [`BlobStore`]
///
/// Both hits and misses are remembered, so a second `get` of an absent key
/// does not touch the backing store either.
pub struct CachedStore<S: BlobStore> {
    inner: S,
    memo: RefCell<HashMap<String, Option<Vec<u8>>>>,
}

impl<S: BlobStore> CachedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop the memoized value for one key
    pub fn invalidate(&self, key: &str) {
        if self.memo.borrow_mut().remove(key).is_some() {
            debug!(key, "memo invalidated");
        }
    }

    /// Drop every memoized value
    pub fn clear(&self) {
        self.memo.borrow_mut().clear();
    }

    /// Whether a value (or a remembered miss) is currently memoized
    pub fn is_memoized(&self, key: &str) -> bool {
        self.memo.borrow().contains_key(key)
    }
}

impl<S: BlobStore> BlobStore for CachedStore<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(hit) = self.memo.borrow().get(key) {
            debug!(key, "memo hit");
            return Ok(hit.clone());
        }
        let value = self.inner.get(key)?;
        debug!(key, present = value.is_some(), "loaded from store");
        self.memo.borrow_mut().insert(key.to_string(), value.clone());
        Ok(value)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.inner.put(key, bytes)?;
        debug!(key, bytes = bytes.len(), "saved to store");
        self.invalidate(key);
        Ok(())
    }

    fn size(&self, key: &str) -> Result<Option<u64>, StoreError> {
        self.inner.size(key)
    }
}

/// The three named objects the toolkit works with
pub struct Store<S: BlobStore = FsStore> {
    blobs: CachedStore<S>,
    pub workbook_key: String,
    pub snapshot_key: String,
    pub label_key: String,
}

impl Store<FsStore> {
    /// Open the filesystem store described by a config
    pub fn from_config(config: &Config, default_root: &Path) -> Self {
        let root = config
            .store_dir
            .clone()
            .unwrap_or_else(|| default_root.to_path_buf());
        Self::with_backend(FsStore::new(root), config)
    }
}

impl<S: BlobStore> Store<S> {
    pub fn with_backend(backend: S, config: &Config) -> Self {
        Self {
            blobs: CachedStore::new(backend),
            workbook_key: config.workbook_key(),
            snapshot_key: config.snapshot_key(),
            label_key: config.label_key(),
        }
    }

    pub fn blobs(&self) -> &CachedStore<S> {
        &self.blobs
    }

    pub fn load_workbook(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.blobs.get(&self.workbook_key)
    }

    pub fn save_workbook(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs.put(&self.workbook_key, bytes)
    }

    pub fn load_snapshot(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.blobs.get(&self.snapshot_key)
    }

    pub fn save_snapshot(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs.put(&self.snapshot_key, bytes)
    }

    pub fn load_labels(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.blobs.get(&self.label_key)
    }

    pub fn save_labels(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs.put(&self.label_key, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    /// Counts backend reads so memoization can be observed
    struct CountingStore {
        inner: FsStore,
        reads: Cell<usize>,
    }

    impl BlobStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.reads.set(self.reads.get() + 1);
            self.inner.get(key)
        }
        fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
            self.inner.put(key, bytes)
        }
        fn size(&self, key: &str) -> Result<Option<u64>, StoreError> {
            self.inner.size(key)
        }
    }

    #[test]
    fn test_missing_object_is_none() {
        let tmp = tempdir().unwrap();
        let store = FsStore::new(tmp.path());
        assert!(store.get("nothing.csv").unwrap().is_none());
        assert!(store.size("nothing.csv").unwrap().is_none());
    }

    #[test]
    fn test_put_then_get() {
        let tmp = tempdir().unwrap();
        let store = FsStore::new(tmp.path().join("nested"));
        store.put("a.bin", b"hello").unwrap();
        assert_eq!(store.get("a.bin").unwrap().as_deref(), Some(&b"hello"[..]));
        assert_eq!(store.size("a.bin").unwrap(), Some(5));
    }

    #[test]
    fn test_rejects_path_keys() {
        let tmp = tempdir().unwrap();
        let store = FsStore::new(tmp.path());
        assert!(matches!(
            store.get("../escape"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_cached_store_memoizes_hits_and_misses() {
        let tmp = tempdir().unwrap();
        let cached = CachedStore::new(CountingStore {
            inner: FsStore::new(tmp.path()),
            reads: Cell::new(0),
        });

        assert!(cached.get("k").unwrap().is_none());
        assert!(cached.get("k").unwrap().is_none());
        assert_eq!(cached.inner().reads.get(), 1);
        assert!(cached.is_memoized("k"));
    }

    #[test]
    fn test_cached_store_put_invalidates() {
        let tmp = tempdir().unwrap();
        let cached = CachedStore::new(CountingStore {
            inner: FsStore::new(tmp.path()),
            reads: Cell::new(0),
        });

        assert!(cached.get("k").unwrap().is_none());
        cached.put("k", b"v1").unwrap();
        assert!(!cached.is_memoized("k"));
        assert_eq!(cached.get("k").unwrap().as_deref(), Some(&b"v1"[..]));
        assert_eq!(cached.inner().reads.get(), 2);
    }

    #[test]
    fn test_explicit_invalidate_sees_external_write() {
        let tmp = tempdir().unwrap();
        let cached = CachedStore::new(FsStore::new(tmp.path()));
        cached.put("k", b"old").unwrap();
        assert_eq!(cached.get("k").unwrap().as_deref(), Some(&b"old"[..]));

        // Another writer replaces the object behind the memo
        FsStore::new(tmp.path()).put("k", b"new").unwrap();
        assert_eq!(cached.get("k").unwrap().as_deref(), Some(&b"old"[..]));

        cached.invalidate("k");
        assert_eq!(cached.get("k").unwrap().as_deref(), Some(&b"new"[..]));
    }
}
