#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

//! # Interfacemap Library
//!
//! Structures are retrieved through a [`StructureSource`] shared via the
//! [`StructureRegistry`], their interface residues are memoized per chain pair
//! by a [`ContactResolver`], and an [`InterfaceMapper`] intersects them with the
//! amino-acid positions of a query protein. A [`PipelineContext`] owns all the
//! shared state of one process.

pub mod align;
pub mod config;
pub mod context;
pub mod error;
pub mod interface;
pub mod resolver;
pub mod structure;
mod utils;

// Re-export key public types
pub use align::{LocalAlignment, PositionMap, SequenceAligner, DEFAULT_GAP_COST};
pub use config::{load_settings, save_settings, Settings};
pub use context::PipelineContext;
pub use error::{ConfigError, InterfaceError, StructureError};
pub use interface::{
    map_isoform_to_chain, AAPosition, ChainMapping, EvidenceProvider, InterfaceAnnotation,
    InterfaceMapper, InterfacePositions, MappingDirection, Molecule, MoleculeKind, ProviderKind,
    StructureCoordinate, StructureRef,
};
pub use resolver::{
    ContactGeometry, ContactKey, ContactResolver, Partner, ResidueAtInterface,
    SurfaceBurialGeometry,
};
pub use structure::{
    Backend, CacheDirectory, CancelToken, ChainExt, ResidueExt, RetryPolicy, SourceKind,
    Structure, StructureCache, StructureParser, StructureRegistry, StructureSource,
};
pub use utils::{parse_groups, write_df_to_file, DataFrameFileType};
