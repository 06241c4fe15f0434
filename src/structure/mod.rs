//! Retrieval of parsed 3-D structures from interchangeable backends.
//!
//! A [`StructureSource`] hands out structures by identifier, backed by an on-disk
//! [`StructureCache`] and a per-process blacklist of identifiers that failed to
//! fetch or parse. The [`StructureRegistry`] makes sure every caller asking for
//! the same backend shares one source, so downloads and failures are learned once.
pub mod cache;
pub mod chains;
pub mod fetch;
pub mod parser;
pub mod registry;
pub mod source;

pub use cache::{CacheDirectory, StructureCache};
pub use chains::{ChainExt, ResidueExt};
pub use fetch::{CancelToken, RetryPolicy};
pub use parser::{PdbtbxParser, StructureParser};
pub use registry::{Collaborators, StructureRegistry};
pub use source::{Backend, StructureSource};

use crate::error::StructureError;
use pdbtbx::PDB;
use std::sync::Arc;

/// A parsed structure shared read-only between the source and its readers.
pub type Structure = Arc<PDB>;

/// Backend families a [`StructureSource`] can be built on.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// PDB archive mirror reached over HTTP
    RemotePdb,
    /// PDB archive mirror on a local filesystem
    LocalPdbMirror,
    /// Interactome3D models and templates
    Interactome3d,
    /// Plain directory of user-supplied structure files
    UserDirectory,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SourceKind::RemotePdb => write!(f, "remote-pdb"),
            SourceKind::LocalPdbMirror => write!(f, "local-pdb-mirror"),
            SourceKind::Interactome3d => write!(f, "interactome3d"),
            SourceKind::UserDirectory => write!(f, "user-directory"),
        }
    }
}

/// Check a 4-character PDB code and return it in lower case.
pub fn normalize_pdb_id(id: &str) -> Result<String, StructureError> {
    let id = id.trim();
    if id.len() == 4 && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(id.to_ascii_lowercase())
    } else {
        Err(StructureError::MalformedIdentifier(id.to_string()))
    }
}

/// Relative path of a PDB entry in the `divided` layout of the wwPDB archive,
/// e.g. `data/structures/divided/pdb/ub/pdb1ubq.ent.gz`.
pub fn divided_pdb_path(id: &str) -> Result<String, StructureError> {
    let id = normalize_pdb_id(id)?;
    let bucket = &id[1..3];
    Ok(format!("data/structures/divided/pdb/{bucket}/pdb{id}.ent.gz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divided_layout() {
        assert_eq!(
            divided_pdb_path("1UBQ").unwrap(),
            "data/structures/divided/pdb/ub/pdb1ubq.ent.gz"
        );
        assert_eq!(
            divided_pdb_path("4hhb").unwrap(),
            "data/structures/divided/pdb/hh/pdb4hhb.ent.gz"
        );
    }

    #[test]
    fn test_malformed_pdb_ids() {
        for bad in ["", "1ub", "1ubq2", "1u/q", "../x"] {
            assert_eq!(
                normalize_pdb_id(bad),
                Err(StructureError::MalformedIdentifier(bad.to_string())),
                "Accepted {bad:?}"
            );
        }
    }
}
