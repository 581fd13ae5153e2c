//! Persistent key/value store shared by the registry, index, and blob caches.
//!
//! Three logical namespaces share one on-disk root. `add` is insert-if-absent:
//! the first writer for a key wins and later writers lose the race silently,
//! which makes concurrent populate paths safe without external locking.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by cache store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cache key must not be empty")]
    EmptyKey,
}

/// Logical partitions of the store.
///
/// Each namespace maps to its own subdirectory so that model-registry blobs,
/// borehole indices, and binary scene payloads never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Registry,
    Index,
    Blob,
}

impl Namespace {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Index => "index",
            Self::Blob => "blob",
        }
    }
}

/// Disk-backed cache store with per-key insert-if-absent atomicity.
///
/// Entries are plain files under `<root>/<namespace>/`. Writes land in a
/// temporary file first and are published with a hard link, so readers never
/// observe partial contents and two concurrent writers resolve to exactly one
/// surviving value.
pub struct DiskStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl DiskStore {
    /// Opens the store rooted at `root`, creating the namespace directories.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directories cannot be created.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        for ns in [Namespace::Registry, Namespace::Index, Namespace::Blob] {
            fs::create_dir_all(root.join(ns.as_str()))?;
        }
        Ok(Self { root, tmp_counter: AtomicU64::new(0) })
    }

    /// Retrieves the value stored under `key`, or `None` on a miss.
    ///
    /// Read failures are treated as misses and logged; query operations must
    /// still produce a well-formed response when the store degrades.
    #[must_use]
    pub fn get(&self, ns: Namespace, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(ns, key);
        match fs::read(&path) {
            Ok(data) => Some(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(namespace = ns.as_str(), key = key, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Inserts `data` under `key` if the key is absent.
    ///
    /// Returns `Ok(true)` when this call created the entry and `Ok(false)`
    /// when an existing value was kept. The existing value is never
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyKey`] for an empty key and
    /// [`StoreError::Io`] for filesystem failures other than a lost race.
    pub fn add(&self, ns: Namespace, key: &str, data: &[u8]) -> Result<bool, StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        let path = self.entry_path(ns, key);
        if path.exists() {
            return Ok(false);
        }

        let tmp = self.tmp_path(ns, key);
        fs::write(&tmp, data)?;

        // Publishing via hard link is the atomicity point: exactly one of
        // any number of concurrent writers observes success.
        let created = match fs::hard_link(&tmp, &path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => false,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
        };
        let _ = fs::remove_file(&tmp);

        debug!(
            namespace = ns.as_str(),
            key = key,
            bytes = data.len(),
            created = created,
            "cache add"
        );
        Ok(created)
    }

    /// Number of entries currently stored in the namespace.
    #[must_use]
    pub fn entry_count(&self, ns: Namespace) -> usize {
        let dir = self.root.join(ns.as_str());
        fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| {
                        e.file_name().to_str().is_some_and(|name| !name.starts_with('.'))
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, ns: Namespace, key: &str) -> PathBuf {
        self.root.join(ns.as_str()).join(sanitize_key(key))
    }

    fn tmp_path(&self, ns: Namespace, key: &str) -> PathBuf {
        let serial = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let name = format!(".tmp-{}-{}-{}", std::process::id(), serial, sanitize_key(key));
        self.root.join(ns.as_str()).join(name)
    }
}

/// Maps an arbitrary key to a stable, collision-free file name.
///
/// Alphanumerics, `.`, `_`, and `-` pass through; every other byte becomes
/// `%XX`, so distinct keys always yield distinct names.
fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                out.push(char::from(b));
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
