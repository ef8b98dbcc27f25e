//! Per-repository advisory locks.
//!
//! libgit2 does not serialize concurrent writers touching the same index and
//! HEAD, so two mutations racing on one repository can interleave their
//! staging and commit steps. The gateway keeps one mutex per canonical git
//! directory and holds it for the whole of every mutation. Inspection never
//! takes a lock.
//!
//! The locks only coordinate callers inside this process; other processes
//! writing to the same repository are not excluded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Arena of mutexes keyed by canonical repository path.
///
/// Thread-safe: can be shared across threads via Clone (uses Arc internally).
#[derive(Clone, Default)]
pub struct RepoLocks {
    inner: Arc<RwLock<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl RepoLocks {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the mutex for `key`, creating it on first use.
    pub fn lock_for(&self, key: &Path) -> Arc<Mutex<()>> {
        if let Some(lock) = self.inner.read().get(key) {
            return lock.clone();
        }

        self.inner
            .write()
            .entry(key.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<F, T>(&self, key: &Path, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let lock = self.lock_for(key);
        let _guard = lock.lock();
        f()
    }

    /// Number of repositories that have been locked at least once.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if no repository has been locked yet.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
