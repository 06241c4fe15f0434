//! On-disk cache of gzip-compressed structure files.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Suffix of every cached structure file.
pub const CACHE_SUFFIX: &str = ".ent.gz";

/// A directory of `<id>.ent.gz` files shared by every source caching in it.
///
/// The set of downloaded identifiers is rebuilt from the directory listing when
/// the directory is opened, so the cache survives restarts without an index
/// file. Writers of one identifier are serialized through [`Self::with_writer`].
#[derive(Debug)]
pub struct CacheDirectory {
    path: PathBuf,
    downloaded: RwLock<HashSet<String>>,
    writers: DashMap<String, Arc<Mutex<()>>>,
}

impl CacheDirectory {
    /// Open `path`, creating it if needed, and seed the downloaded set from the
    /// files found there. Failures only leave the cache empty.
    pub fn open(path: &Path) -> Self {
        let directory = Self {
            path: path.to_path_buf(),
            downloaded: RwLock::new(HashSet::new()),
            writers: DashMap::new(),
        };
        directory.rescan();
        directory
    }

    /// Replace the downloaded set with the cache files currently on disk.
    pub fn rescan(&self) {
        if let Err(e) = std::fs::create_dir_all(&self.path) {
            warn!(
                "Failed to create cache directory {}: {e}",
                self.path.display()
            );
        }

        let found = match std::fs::read_dir(&self.path) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    name.strip_suffix(CACHE_SUFFIX)
                        .filter(|stem| !stem.is_empty())
                        .map(|stem| stem.to_string())
                })
                .collect::<HashSet<String>>(),
            Err(e) => {
                warn!("Failed to list cache directory {}: {e}", self.path.display());
                HashSet::new()
            }
        };
        debug!(
            "Found {} cached structures in {}",
            found.len(),
            self.path.display()
        );
        *self.downloaded.write() = found;
    }

    /// The directory itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` while holding the writer lock of `id`.
    ///
    /// The lock entry is dropped again once no other caller waits on it.
    pub fn with_writer<T>(&self, id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self
            .writers
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock();
            f()
        };
        drop(lock);
        self.writers
            .remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Number of identifiers with a live writer lock.
    pub fn writer_count(&self) -> usize {
        self.writers.len()
    }
}

/// One source's view of a [`CacheDirectory`] plus its failure blacklist.
///
/// Downloads are visible to every source over the same directory; the
/// blacklist belongs to the source and lives in memory only.
#[derive(Debug)]
pub struct StructureCache {
    directory: Arc<CacheDirectory>,
    blacklisted: RwLock<HashSet<String>>,
}

impl StructureCache {
    /// Cache over a directory opened for this cache alone.
    pub fn new(path: &Path) -> Self {
        Self::shared(Arc::new(CacheDirectory::open(path)))
    }

    /// Cache over a directory other caches may use too.
    pub fn shared(directory: Arc<CacheDirectory>) -> Self {
        Self {
            directory,
            blacklisted: RwLock::new(HashSet::new()),
        }
    }

    /// The directory this cache reads and writes.
    pub fn directory(&self) -> &Arc<CacheDirectory> {
        &self.directory
    }

    /// Whether a usable file for `id` is in the cache directory.
    pub fn has_cached(&self, id: &str) -> bool {
        self.directory.downloaded.read().contains(id)
    }

    /// Location of the cache file for `id`, whether or not it exists yet.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.directory.path.join(format!("{id}{CACHE_SUFFIX}"))
    }

    /// Record that the file for `id` was stored and parsed successfully.
    pub fn mark_downloaded(&self, id: &str) {
        self.directory.downloaded.write().insert(id.to_string());
    }

    /// Drop a cache entry whose file turned out to be unusable.
    pub fn evict(&self, id: &str) {
        self.directory.downloaded.write().remove(id);
        let path = self.path_for(id);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove {}: {e}", path.display());
            }
        }
    }

    /// Whether `id` failed earlier in this process.
    pub fn is_blacklisted(&self, id: &str) -> bool {
        self.blacklisted.read().contains(id)
    }

    /// Refuse `id` for the rest of the process.
    pub fn blacklist(&self, id: &str) {
        self.blacklisted.write().insert(id.to_string());
    }

    /// Number of identifiers with a usable cache file.
    pub fn downloaded_count(&self) -> usize {
        self.directory.downloaded.read().len()
    }

    /// Number of identifiers refused by this cache.
    pub fn blacklisted_count(&self) -> usize {
        self.blacklisted.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_scan_seeds_downloaded_set() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1ubq.ent.gz"), b"").unwrap();
        std::fs::write(dir.path().join("4hhb.ent.gz"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::write(dir.path().join("2abc.ent.gz.part"), b"").unwrap();

        let cache = StructureCache::new(dir.path());
        assert!(cache.has_cached("1ubq"));
        assert!(cache.has_cached("4hhb"));
        assert!(!cache.has_cached("2abc"), "Partial downloads must not count");
        assert_eq!(cache.downloaded_count(), 2);
        assert_eq!(cache.path_for("1ubq"), dir.path().join("1ubq.ent.gz"));
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let cache = StructureCache::new(&nested);
        assert!(nested.is_dir());
        assert_eq!(cache.downloaded_count(), 0);
    }

    #[test]
    fn test_rescan_forgets_removed_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1crn.ent.gz"), b"").unwrap();

        let cache = StructureCache::new(dir.path());
        cache.mark_downloaded("9xyz");
        cache.blacklist("8bad");
        cache.directory().rescan();

        assert!(cache.has_cached("1crn"));
        assert!(!cache.has_cached("9xyz"));
        // The blacklist is kept for the lifetime of the process
        assert!(cache.is_blacklisted("8bad"));
    }

    #[test]
    fn test_shared_directory_separate_blacklists() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Arc::new(CacheDirectory::open(dir.path()));
        let first = StructureCache::shared(directory.clone());
        let second = StructureCache::shared(directory);

        first.mark_downloaded("1ubq");
        first.blacklist("8bad");
        assert!(second.has_cached("1ubq"));
        assert!(!second.is_blacklisted("8bad"));
    }

    #[test]
    fn test_evict_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1ubq.ent.gz"), b"garbage").unwrap();
        let cache = StructureCache::new(dir.path());

        cache.evict("1ubq");
        assert!(!cache.has_cached("1ubq"));
        assert!(!dir.path().join("1ubq.ent.gz").exists());
    }

    #[test]
    fn test_writers_are_exclusive_and_released() {
        let dir = tempfile::tempdir().unwrap();
        let directory = CacheDirectory::open(dir.path());
        let inside = AtomicUsize::new(0);
        let overlaps = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    directory.with_writer("1abc", || {
                        if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(directory.writer_count(), 0, "Idle writer locks must be dropped");
    }
}
