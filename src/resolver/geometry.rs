//! Residue-level contact geometry computed from atomic coordinates.

use crate::config::GeometrySettings;
use crate::error::StructureError;
use crate::structure::ResidueExt;
use pdbtbx::*;
use rayon::prelude::*;
use rust_sasa::{calculate_sasa_internal, Atom as SASAAtom};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Residue identifier (`"<position>:<chain>"`) to the chains or ligands it touches.
pub type ContactMap = HashMap<String, HashSet<String>>;

/// Format the residue identifier used as key of a [`ContactMap`].
pub fn residue_key(position: &str, chain: &str) -> String {
    format!("{position}:{chain}")
}

/// Computes which residues of a structure lie at an interface.
///
/// Implementations receive every pair of a batch at once so that per-structure
/// work (neighbour trees, isolated-chain surfaces) is done a single time.
pub trait ContactGeometry: Send + Sync {
    /// Residues of either chain of each pair in contact with the other chain.
    fn chain_contacts(
        &self,
        id: &str,
        structure: &PDB,
        pairs: &[(String, String)],
    ) -> Result<ContactMap, StructureError>;

    /// Residues of `chains` in contact with any copy of the ligand `ligand`.
    fn ligand_contacts(
        &self,
        id: &str,
        structure: &PDB,
        chains: &[String],
        ligand: &str,
    ) -> Result<ContactMap, StructureError>;
}

/// Geometry based on buried surface for chain pairs and atom distances for ligands.
///
/// A residue is at a chain/chain interface when its solvent-accessible surface
/// shrinks by more than `min_buried_area` once the partner chain is present.
#[derive(Debug, Clone)]
pub struct SurfaceBurialGeometry {
    /// Probe radius of the surface calculation (Å)
    pub probe_radius: f32,
    /// Sphere points per atom
    pub n_points: usize,
    /// Surface a residue must lose to the partner (Å²)
    pub min_buried_area: f32,
    /// Heavy-atom distance to a ligand (Å)
    pub ligand_cutoff: f64,
}

impl Default for SurfaceBurialGeometry {
    fn default() -> Self {
        Self::from_settings(&GeometrySettings::default())
    }
}

/// Heavy atom of a polymer residue, ready for the surface calculation.
struct SurfaceAtom {
    chain: String,
    residue: String,
    serial: usize,
    position: (f64, f64, f64),
    radius: f32,
}

impl SurfaceAtom {
    fn to_sasa(&self) -> SASAAtom {
        SASAAtom {
            position: nalgebra::Point3::new(
                self.position.0 as f32,
                self.position.1 as f32,
                self.position.2 as f32,
            ),
            radius: self.radius,
            id: self.serial,
            parent_id: None,
        }
    }
}

/// Residue names of standard nucleotides.
const NUCLEOTIDES: [&str; 10] = ["A", "C", "G", "U", "I", "DA", "DC", "DG", "DT", "DI"];

/// Polymer residues are amino acids and nucleotides; everything else is a ligand or water.
fn is_polymer(x: &AtomConformerResidueChainModel) -> bool {
    let residue = x.residue();
    residue.one_letter().is_some()
        || residue
            .name()
            .is_some_and(|name| NUCLEOTIDES.contains(&name.trim()))
}

fn is_heavy(atom: &Atom) -> bool {
    atom.element().is_some_and(|e| e != &Element::H)
}

fn first_model(id: &str, structure: &PDB) -> Result<usize, StructureError> {
    structure
        .models()
        .next()
        .map(|m| m.serial_number())
        .ok_or_else(|| StructureError::GeometryComputation {
            id: id.to_string(),
            reason: "structure has no models".to_string(),
        })
}

impl SurfaceBurialGeometry {
    /// Geometry with the parameters of `settings`.
    pub fn from_settings(settings: &GeometrySettings) -> Self {
        Self {
            probe_radius: settings.probe_radius,
            n_points: settings.n_points,
            min_buried_area: settings.min_buried_area,
            ligand_cutoff: settings.ligand_cutoff,
        }
    }

    /// Heavy polymer atoms of the first model grouped by chain.
    fn surface_atoms(
        &self,
        id: &str,
        structure: &PDB,
    ) -> Result<HashMap<String, Vec<SurfaceAtom>>, StructureError> {
        let model = first_model(id, structure)?;
        let mut by_chain: HashMap<String, Vec<SurfaceAtom>> = HashMap::new();
        for x in structure
            .atoms_with_hierarchy()
            .filter(|x| x.model().serial_number() == model)
            .filter(|x| is_heavy(x.atom()) && is_polymer(x))
        {
            let Some(radius) = x
                .atom()
                .element()
                .and_then(|e| e.atomic_radius().van_der_waals)
            else {
                continue;
            };
            by_chain
                .entry(x.chain().id().to_string())
                .or_default()
                .push(SurfaceAtom {
                    chain: x.chain().id().to_string(),
                    residue: x.residue().label(),
                    serial: x.atom().serial_number(),
                    position: x.atom().pos(),
                    radius: radius as f32,
                });
        }
        Ok(by_chain)
    }

    /// Per-residue accessible surface of the given atoms, keyed by residue identifier.
    fn residue_sasa(&self, atoms: &[&SurfaceAtom]) -> HashMap<String, f32> {
        let sasa_atoms = atoms.iter().map(|a| a.to_sasa()).collect::<Vec<_>>();
        let atom_sasa =
            calculate_sasa_internal(&sasa_atoms, Some(self.probe_radius), Some(self.n_points));

        let mut per_residue: HashMap<String, f32> = HashMap::new();
        for (atom, sasa) in atoms.iter().zip(atom_sasa) {
            *per_residue
                .entry(residue_key(&atom.residue, &atom.chain))
                .or_insert(0.0) += sasa;
        }
        per_residue
    }
}

impl ContactGeometry for SurfaceBurialGeometry {
    fn chain_contacts(
        &self,
        id: &str,
        structure: &PDB,
        pairs: &[(String, String)],
    ) -> Result<ContactMap, StructureError> {
        let by_chain = self.surface_atoms(id, structure)?;
        let chains = pairs
            .iter()
            .flat_map(|(a, b)| [a, b])
            .filter(|c| by_chain.contains_key(c.as_str()))
            .collect::<HashSet<&String>>();
        debug!(
            "Computing surfaces of {} chains and {} pairs in {id}",
            chains.len(),
            pairs.len()
        );

        // Surfaces of the isolated chains are shared by all the pairs they appear in
        let isolated = chains
            .par_iter()
            .map(|chain| {
                let atoms = by_chain[chain.as_str()].iter().collect::<Vec<_>>();
                ((*chain).clone(), self.residue_sasa(&atoms))
            })
            .collect::<HashMap<String, HashMap<String, f32>>>();

        let buried = pairs
            .par_iter()
            .filter_map(|(a, b)| {
                let (atoms_a, atoms_b) = (by_chain.get(a)?, by_chain.get(b)?);
                let complex = atoms_a.iter().chain(atoms_b.iter()).collect::<Vec<_>>();
                let in_complex = self.residue_sasa(&complex);

                let mut contacts = Vec::new();
                for (chain, partner) in [(a, b), (b, a)] {
                    for (residue, alone) in &isolated[chain] {
                        let together = in_complex.get(residue).copied().unwrap_or(0.0);
                        if alone - together > self.min_buried_area {
                            trace!("{residue} loses {:.1} A^2 to chain {partner}", alone - together);
                            contacts.push((residue.clone(), partner.clone()));
                        }
                    }
                }
                Some(contacts)
            })
            .flatten()
            .collect::<Vec<(String, String)>>();

        let mut result = ContactMap::new();
        for (residue, partner) in buried {
            result.entry(residue).or_default().insert(partner);
        }
        Ok(result)
    }

    fn ligand_contacts(
        &self,
        id: &str,
        structure: &PDB,
        chains: &[String],
        ligand: &str,
    ) -> Result<ContactMap, StructureError> {
        let model = first_model(id, structure)?;
        let tree = structure.create_hierarchy_rtree();
        let max_dist_squared = self.ligand_cutoff * self.ligand_cutoff;

        let mut result = ContactMap::new();
        for x in structure
            .atoms_with_hierarchy()
            .filter(|x| x.model().serial_number() == model && is_heavy(x.atom()))
            .filter(|x| !is_polymer(x) && x.residue().name() == Some(ligand))
        {
            for y in tree
                .locate_within_distance(x.atom().pos(), max_dist_squared)
                .filter(|y| y.model().serial_number() == model && is_heavy(y.atom()))
                .filter(|y| is_polymer(y) && chains.iter().any(|c| c == y.chain().id()))
            {
                result
                    .entry(residue_key(&y.residue().label(), y.chain().id()))
                    .or_default()
                    .insert(ligand.to_string());
            }
        }
        debug!(
            "Found {} residues in contact with {ligand} in {id}",
            result.len()
        );
        Ok(result)
    }
}
