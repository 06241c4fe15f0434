//! Process-wide state of the pipeline, created once and passed to every query.

use crate::config::Settings;
use crate::error::StructureError;
use crate::interface::{EvidenceProvider, InterfaceMapper};
use crate::resolver::{ContactGeometry, ContactResolver, SurfaceBurialGeometry};
use crate::structure::{Collaborators, SourceKind, StructureRegistry, StructureSource};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Owns the structure registry and one [`ContactResolver`] per source.
///
/// Queries sharing a context share downloads, blacklists and computed contacts;
/// separate contexts share nothing.
pub struct PipelineContext {
    settings: Settings,
    registry: StructureRegistry,
    geometry: Arc<dyn ContactGeometry>,
    resolvers: Mutex<HashMap<(SourceKind, String, PathBuf), Arc<ContactResolver>>>,
}

impl PipelineContext {
    /// Context talking to the real remote services configured in `settings`.
    pub fn new(settings: Settings) -> Result<Self, StructureError> {
        let collaborators = Collaborators::from_settings(&settings.remote)?;
        let geometry = Arc::new(SurfaceBurialGeometry::from_settings(&settings.geometry));
        Ok(Self::with_collaborators(settings, collaborators, geometry))
    }

    /// Context over explicit collaborators and geometry.
    pub fn with_collaborators(
        settings: Settings,
        collaborators: Collaborators,
        geometry: Arc<dyn ContactGeometry>,
    ) -> Self {
        Self {
            settings,
            registry: StructureRegistry::new(collaborators),
            geometry,
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    /// The settings the context was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The structure registry of this context.
    pub fn registry(&self) -> &StructureRegistry {
        &self.registry
    }

    /// Default location of a source kind: the configured URL for remote kinds,
    /// nothing for local ones.
    pub fn default_location(&self, kind: SourceKind) -> Option<&str> {
        match kind {
            SourceKind::RemotePdb => Some(self.settings.remote.pdb_mirror.as_str()),
            SourceKind::Interactome3d => Some(self.settings.remote.interactome3d_url.as_str()),
            SourceKind::LocalPdbMirror | SourceKind::UserDirectory => None,
        }
    }

    /// The shared source for `kind` at `location`, caching in the configured directory.
    pub fn source(&self, kind: SourceKind, location: &str) -> Arc<StructureSource> {
        self.registry
            .get(kind, location, &self.settings.cache.directory)
    }

    /// The shared resolver over the source for `kind` at `location`.
    pub fn resolver(&self, kind: SourceKind, location: &str) -> Arc<ContactResolver> {
        let key = (
            kind,
            location.to_string(),
            self.settings.cache.directory.clone(),
        );
        self.resolvers
            .lock()
            .entry(key)
            .or_insert_with(|| {
                Arc::new(ContactResolver::new(
                    self.source(kind, location),
                    self.geometry.clone(),
                ))
            })
            .clone()
    }

    /// Mapper backed by contacts computed from structures of `kind` at `location`.
    pub fn geometry_mapper(&self, kind: SourceKind, location: &str) -> InterfaceMapper {
        let resolver = self.resolver(kind, location);
        match kind {
            SourceKind::Interactome3d => {
                InterfaceMapper::new(EvidenceProvider::Interactome3d(resolver))
            }
            _ => InterfaceMapper::new(EvidenceProvider::PdbGeometry(resolver)),
        }
    }

    /// Drop every resolver and source. Handles still held elsewhere keep working.
    pub fn shutdown(&self) {
        let resolvers = std::mem::take(&mut *self.resolvers.lock());
        debug!(
            "Releasing {} resolvers and {} structure sources",
            resolvers.len(),
            self.registry.len()
        );
        self.registry.clear();
    }
}
