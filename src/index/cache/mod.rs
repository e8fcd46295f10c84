
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use super::store::VectorIndex;

/// Process-wide cache of loaded vector indexes, keyed by resolved path pair.
///
/// Loading is expensive and the index is immutable, so at most one load per
/// distinct path pair happens per cache lifetime. Owned explicitly by the
/// application shell rather than hidden in a global, so tests can reset it.
#[derive(Debug, Default)]
pub struct IndexCache {
    entries: Mutex<HashMap<(PathBuf, PathBuf), Arc<VectorIndex>>>,
    loads: AtomicUsize,
}

impl IndexCache {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index for the given path pair, reusing a previous load for
    /// identical paths.
    #[inline]
    pub fn load_cached(
        &self,
        vectors_path: &Path,
        chunks_path: &Path,
    ) -> crate::Result<Arc<VectorIndex>> {
        let key = (resolve(vectors_path), resolve(chunks_path));

        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(index) = entries.get(&key) {
            debug!("Index cache hit for {}", key.0.display());
            return Ok(Arc::clone(index));
        }

        // Holding the lock through the load keeps concurrent callers from
        // reading the same files twice.
        let index = Arc::new(VectorIndex::load(vectors_path, chunks_path)?);
        self.loads.fetch_add(1, Ordering::SeqCst);
        entries.insert(key, Arc::clone(&index));

        Ok(index)
    }

    /// Number of actual disk loads performed (instrumentation hook)
    #[inline]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Drop all cached indexes; the next load re-reads from disk.
    #[inline]
    pub fn reset(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

// Symlink-resolved when possible so distinct spellings of the same path
// share an entry. Falls back to the literal path for files that do not
// exist yet (the load itself reports those).
fn resolve(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
