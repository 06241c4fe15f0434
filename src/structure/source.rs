//! Structure sources: one backend plus cache, blacklist and writer locks.

use super::cache::{CacheDirectory, StructureCache};
use super::fetch::{CancelToken, Interactome3dClient, ModelKind, RemoteFetcher, RetryPolicy};
use super::parser::StructureParser;
use super::{divided_pdb_path, normalize_pdb_id, SourceKind, Structure};
use crate::error::StructureError;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File names tried, in order, inside a user-supplied directory.
const USER_FILE_PATTERNS: [&str; 6] = [
    "{id}.ent.gz",
    "{id}.pdb.gz",
    "{id}.cif.gz",
    "{id}.pdb",
    "{id}.ent",
    "{id}.cif",
];

/// Where and how a [`StructureSource`] obtains structure files.
pub enum Backend {
    /// wwPDB archive mirror reached over HTTP; downloads land in the cache
    RemotePdb {
        mirror: String,
        fetcher: Arc<dyn RemoteFetcher>,
    },
    /// wwPDB archive mirror on the local filesystem
    LocalPdbMirror { root: PathBuf },
    /// Interactome3D web service; the returned text lands in the cache
    Interactome3d {
        base_url: String,
        client: Arc<dyn Interactome3dClient>,
    },
    /// Directory of structure files named after their identifier
    UserDirectory { root: PathBuf },
}

impl Backend {
    /// The family this backend belongs to.
    pub fn kind(&self) -> SourceKind {
        match self {
            Backend::RemotePdb { .. } => SourceKind::RemotePdb,
            Backend::LocalPdbMirror { .. } => SourceKind::LocalPdbMirror,
            Backend::Interactome3d { .. } => SourceKind::Interactome3d,
            Backend::UserDirectory { .. } => SourceKind::UserDirectory,
        }
    }

    /// Validate `id` for this backend and return the form used as cache key.
    pub fn normalize(&self, id: &str) -> Result<String, StructureError> {
        match self {
            Backend::RemotePdb { .. } | Backend::LocalPdbMirror { .. } => normalize_pdb_id(id),
            Backend::Interactome3d { .. } => {
                ModelKind::from_identifier(id)?;
                Ok(id.to_string())
            }
            Backend::UserDirectory { .. } => {
                if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
                    Err(StructureError::MalformedIdentifier(id.to_string()))
                } else {
                    Ok(id.to_string())
                }
            }
        }
    }

    /// Whether fetched files are kept in the cache directory.
    fn uses_cache(&self) -> bool {
        matches!(
            self,
            Backend::RemotePdb { .. } | Backend::Interactome3d { .. }
        )
    }
}

/// Hands out parsed structures by identifier from one backend.
///
/// Identifiers that failed once are blacklisted and fail immediately afterwards;
/// identifiers found in the cache are read from disk and never fetched again.
/// Requests for the same identifier are serialized across every source sharing
/// the cache directory.
pub struct StructureSource {
    backend: Backend,
    cache: StructureCache,
    parser: Arc<dyn StructureParser>,
    retry: RetryPolicy,
}

impl StructureSource {
    /// Source with a cache directory of its own.
    pub fn new(
        backend: Backend,
        cache_dir: &Path,
        parser: Arc<dyn StructureParser>,
        retry: RetryPolicy,
    ) -> Self {
        Self::shared(
            backend,
            Arc::new(CacheDirectory::open(cache_dir)),
            parser,
            retry,
        )
    }

    /// Source caching in a directory other sources may write to as well.
    pub fn shared(
        backend: Backend,
        directory: Arc<CacheDirectory>,
        parser: Arc<dyn StructureParser>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            cache: StructureCache::shared(directory),
            parser,
            retry,
        }
    }

    /// The family of the backend.
    pub fn kind(&self) -> SourceKind {
        self.backend.kind()
    }

    /// The cache and blacklist of this source.
    pub fn cache(&self) -> &StructureCache {
        &self.cache
    }

    /// Return the parsed structure for `id`, fetching and caching it if needed.
    ///
    /// Any fetch or parse failure blacklists the identifier for the rest of the
    /// process. Malformed identifiers and cancellation fail without blacklisting.
    pub fn get_structure(&self, id: &str, cancel: &CancelToken) -> Result<Structure, StructureError> {
        let id = self.backend.normalize(id)?;
        if self.cache.is_blacklisted(&id) {
            debug!("Skipping blacklisted structure {id}");
            return Err(StructureError::unavailable(&id, "failed earlier in this session"));
        }
        cancel.check()?;

        self.cache
            .directory()
            .with_writer(&id, || self.load(&id, cancel))
    }

    /// Fetch-or-read and parse `id`; runs under the writer lock of `id`.
    fn load(&self, id: &str, cancel: &CancelToken) -> Result<Structure, StructureError> {
        // Another request may have failed while we waited
        if self.cache.is_blacklisted(id) {
            return Err(StructureError::unavailable(id, "failed earlier in this session"));
        }

        let path = match self.materialize(id, cancel) {
            Ok(path) => path,
            Err(StructureError::Cancelled) => return Err(StructureError::Cancelled),
            Err(e @ StructureError::StructureUnavailable { .. }) => {
                warn!("{e}");
                self.cache.blacklist(id);
                return Err(e);
            }
            Err(e) => {
                warn!("Failed to retrieve structure {id} from {}: {e}", self.kind());
                self.cache.blacklist(id);
                return Err(StructureError::unavailable(id, e));
            }
        };

        match self.parser.parse(&path) {
            Ok(pdb) => {
                if self.backend.uses_cache() {
                    self.cache.mark_downloaded(id);
                }
                Ok(Arc::new(pdb))
            }
            Err(reason) => {
                warn!("Failed to parse structure {id}: {reason}");
                if self.backend.uses_cache() {
                    self.cache.evict(id);
                }
                self.cache.blacklist(id);
                Err(StructureError::unavailable(id, reason))
            }
        }
    }

    /// Make sure a file for `id` exists on disk and return its path.
    fn materialize(&self, id: &str, cancel: &CancelToken) -> Result<PathBuf, StructureError> {
        match &self.backend {
            Backend::RemotePdb { mirror, fetcher } => {
                let target = self.cache.path_for(id);
                if self.cache.has_cached(id) {
                    return Ok(target);
                }
                let url = format!(
                    "{}/{}",
                    mirror.trim_end_matches('/'),
                    divided_pdb_path(id)?
                );
                info!("Downloading {id} from {url}");
                self.retry.run(cancel, |_| {
                    let stream = fetcher.open(&url)?;
                    store_compressed(id, MultiGzDecoder::new(stream), &target)
                })?;
                Ok(target)
            }
            Backend::Interactome3d { base_url, client } => {
                let target = self.cache.path_for(id);
                if self.cache.has_cached(id) {
                    return Ok(target);
                }
                let kind = ModelKind::from_identifier(id)?;
                info!("Fetching Interactome3D {} model {id}", kind.query_type());
                let text = self
                    .retry
                    .run(cancel, |_| client.fetch_model(base_url, id, kind))?;
                if text.trim().is_empty() {
                    return Err(StructureError::unavailable(id, "empty model returned"));
                }
                store_compressed(id, text.as_bytes(), &target)?;
                Ok(target)
            }
            Backend::LocalPdbMirror { root } => {
                let path = root.join(divided_pdb_path(id)?);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(StructureError::unavailable(
                        id,
                        format!("{} not found in local mirror", path.display()),
                    ))
                }
            }
            Backend::UserDirectory { root } => USER_FILE_PATTERNS
                .iter()
                .map(|pattern| root.join(pattern.replace("{id}", id)))
                .find(|path| path.is_file())
                .ok_or_else(|| {
                    StructureError::unavailable(
                        id,
                        format!("no structure file in {}", root.display()),
                    )
                }),
        }
    }
}

/// Stream `content` into a gzip file at `target`, going through a `.part` file
/// so a failed transfer never leaves a truncated cache entry behind.
fn store_compressed<R: Read>(id: &str, mut content: R, target: &Path) -> Result<(), StructureError> {
    let partial = target.with_extension("gz.part");
    let result = (|| -> std::io::Result<()> {
        let file = File::create(&partial)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        std::io::copy(&mut content, &mut encoder)?;
        encoder.finish()?.flush()?;
        std::fs::rename(&partial, target)
    })();

    result.map_err(|e| {
        if partial.exists() {
            let _ = std::fs::remove_file(&partial);
        }
        StructureError::unavailable(id, format!("failed to store download: {e}"))
    })
}
