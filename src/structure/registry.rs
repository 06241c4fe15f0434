//! One shared structure source per backend and cache directory.

use super::fetch::{
    HttpFetcher, Interactome3dClient, Interactome3dWebClient, RemoteFetcher, RetryPolicy,
};
use super::cache::CacheDirectory;
use super::parser::{PdbtbxParser, StructureParser};
use super::source::{Backend, StructureSource};
use super::SourceKind;
use crate::config::RemoteSettings;
use crate::error::StructureError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Shared collaborators handed to every source the registry constructs.
#[derive(Clone)]
pub struct Collaborators {
    /// Downloads from PDB mirrors
    pub fetcher: Arc<dyn RemoteFetcher>,
    /// Talks to the Interactome3D service
    pub interactome3d: Arc<dyn Interactome3dClient>,
    /// Parses every fetched or local file
    pub parser: Arc<dyn StructureParser>,
    /// Retry discipline of remote calls
    pub retry: RetryPolicy,
}

impl Collaborators {
    /// HTTP-backed collaborators configured from `settings`.
    pub fn from_settings(settings: &RemoteSettings) -> Result<Self, StructureError> {
        Ok(Self {
            fetcher: Arc::new(HttpFetcher::new(settings)?),
            interactome3d: Arc::new(Interactome3dWebClient::new(settings)?),
            parser: Arc::new(PdbtbxParser),
            retry: RetryPolicy::from_settings(settings),
        })
    }
}

type RegistryKey = (SourceKind, String, PathBuf);

/// Hands out exactly one [`StructureSource`] per (kind, location, cache directory).
///
/// Callers asking for the same backend share its cache and blacklist, so a
/// structure is downloaded once and a broken one is learned once. Sources over
/// the same cache directory share one [`CacheDirectory`], and with it the
/// downloaded set and the per-identifier writer locks.
pub struct StructureRegistry {
    collaborators: Collaborators,
    sources: Mutex<HashMap<RegistryKey, Arc<StructureSource>>>,
    directories: Mutex<HashMap<PathBuf, Arc<CacheDirectory>>>,
}

impl StructureRegistry {
    /// Empty registry building sources from `collaborators`.
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            sources: Mutex::new(HashMap::new()),
            directories: Mutex::new(HashMap::new()),
        }
    }

    /// Return the source for `kind` at `location` (a mirror URL, service URL or
    /// local root), creating and configuring it on first request.
    pub fn get(&self, kind: SourceKind, location: &str, cache_dir: &Path) -> Arc<StructureSource> {
        let key = (kind, location.to_string(), cache_dir.to_path_buf());
        let mut sources = self.sources.lock();
        sources
            .entry(key)
            .or_insert_with(|| {
                debug!(
                    "Creating {kind} source for {location} caching in {}",
                    cache_dir.display()
                );
                Arc::new(StructureSource::shared(
                    self.backend(kind, location),
                    self.directory(cache_dir),
                    self.collaborators.parser.clone(),
                    self.collaborators.retry,
                ))
            })
            .clone()
    }

    /// All sources created so far, in no particular order.
    pub fn sources(&self) -> Vec<Arc<StructureSource>> {
        self.sources.lock().values().cloned().collect()
    }

    /// Number of sources created so far.
    pub fn len(&self) -> usize {
        self.sources.lock().len()
    }

    /// Whether no source was created yet.
    pub fn is_empty(&self) -> bool {
        self.sources.lock().is_empty()
    }

    /// Forget every source. Sources still held by callers keep working.
    ///
    /// Cache directories are kept, so old and new sources still share writer locks.
    pub fn clear(&self) {
        self.sources.lock().clear();
    }

    /// The shared state of `path`, rescanned for every new source.
    fn directory(&self, path: &Path) -> Arc<CacheDirectory> {
        let mut directories = self.directories.lock();
        match directories.get(path) {
            Some(directory) => {
                directory.rescan();
                directory.clone()
            }
            None => {
                let directory = Arc::new(CacheDirectory::open(path));
                directories.insert(path.to_path_buf(), directory.clone());
                directory
            }
        }
    }

    fn backend(&self, kind: SourceKind, location: &str) -> Backend {
        match kind {
            SourceKind::RemotePdb => Backend::RemotePdb {
                mirror: location.to_string(),
                fetcher: self.collaborators.fetcher.clone(),
            },
            SourceKind::LocalPdbMirror => Backend::LocalPdbMirror {
                root: PathBuf::from(location),
            },
            SourceKind::Interactome3d => Backend::Interactome3d {
                base_url: location.to_string(),
                client: self.collaborators.interactome3d.clone(),
            },
            SourceKind::UserDirectory => Backend::UserDirectory {
                root: PathBuf::from(location),
            },
        }
    }
}
