//! EPPIC interface classifications, read from already structured records.

use crate::error::InterfaceError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Classification tag of an interface judged biologically relevant.
pub const BIOLOGICAL: &str = "bio";

/// Which EPPIC residues count as interface residues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EppicSelection {
    /// Residues in the interface core or rim
    #[default]
    CoreOrRim,
    /// Residues in the interface core only
    CoreOnly,
}

/// Buried-fraction thresholds for EPPIC residues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EppicPolicy {
    /// Threshold applied to core-or-rim selection
    pub core_or_rim: f64,
    /// Threshold applied to core-only selection
    pub core_only: f64,
    /// Which threshold is in use
    pub selection: EppicSelection,
}

impl Default for EppicPolicy {
    fn default() -> Self {
        Self {
            core_or_rim: 0.70,
            core_only: 0.95,
            selection: EppicSelection::default(),
        }
    }
}

impl EppicPolicy {
    /// Buried fraction a residue must exceed under the current selection.
    pub fn threshold(&self) -> f64 {
        match self.selection {
            EppicSelection::CoreOrRim => self.core_or_rim,
            EppicSelection::CoreOnly => self.core_only,
        }
    }

    /// Residues of a biological interface whose buried fraction exceeds the threshold.
    pub fn interface_residues<'a>(
        &self,
        interface: &'a EppicInterface,
    ) -> impl Iterator<Item = &'a EppicResidue> + 'a {
        let threshold = self.threshold();
        let biological = interface.is_biological();
        interface
            .residues
            .iter()
            .filter(move |r| biological && r.buried_fraction > threshold)
    }
}

/// One interface of an EPPIC analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EppicInterface {
    /// First chain of the interface
    pub chain_a: String,
    /// Second chain of the interface
    pub chain_b: String,
    /// `bio` or `xtal`
    pub classification: String,
    /// Residues of both chains at the interface
    #[serde(default)]
    pub residues: Vec<EppicResidue>,
}

impl EppicInterface {
    /// Whether EPPIC judged the interface biologically relevant.
    pub fn is_biological(&self) -> bool {
        self.classification.eq_ignore_ascii_case(BIOLOGICAL)
    }

    /// Whether the interface joins chain `a` and chain `b`, in either order.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.chain_a == a && self.chain_b == b) || (self.chain_a == b && self.chain_b == a)
    }
}

/// One residue of an EPPIC interface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EppicResidue {
    /// Chain of the residue
    pub chain: String,
    /// Author residue number with insertion code
    pub position: String,
    /// Fraction of the residue surface buried by the interface, 0 to 1
    pub buried_fraction: f64,
}

/// Source of EPPIC analyses by structure identifier.
pub trait EppicRepository: Send + Sync {
    /// Interfaces of `structure_id`; empty when the structure was never analysed.
    fn interfaces(&self, structure_id: &str) -> Result<Vec<EppicInterface>, InterfaceError>;
}

/// Directory of `<structure id>.json` files, each an array of interfaces.
#[derive(Debug, Clone)]
pub struct JsonEppicRepository {
    root: PathBuf,
}

impl JsonEppicRepository {
    /// Repository reading the files under `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl EppicRepository for JsonEppicRepository {
    fn interfaces(&self, structure_id: &str) -> Result<Vec<EppicInterface>, InterfaceError> {
        let path = self
            .root
            .join(format!("{}.json", structure_id.to_ascii_lowercase()));
        if !path.is_file() {
            debug!("No EPPIC analysis for {structure_id}");
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|e| InterfaceError::Evidence {
            provider: "EPPIC",
            reason: format!("{}: {e}", path.display()),
        })
    }
}
