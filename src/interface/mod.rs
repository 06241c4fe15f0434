//! Interface evidence for the amino-acid positions of a query protein.
//!
//! An [`InterfaceMapper`] asks one evidence provider which residues of a
//! structure sit at the interface between two molecules, and intersects that set
//! with the structure coordinates of the candidate [`AAPosition`]s. Matching
//! positions are annotated in place and collected per side of the interaction.
pub mod dsysmap;
pub mod eppic;

pub use dsysmap::{DsysmapRecord, DsysmapRepository, DsysmapResidue, DsysmapTable};
pub use eppic::{
    EppicInterface, EppicPolicy, EppicRepository, EppicResidue, EppicSelection,
    JsonEppicRepository,
};

use crate::align::{aligned_positions, SequenceAligner};
use crate::error::InterfaceError;
use crate::resolver::{ContactResolver, ResidueAtInterface};
use crate::structure::{CancelToken, ChainExt};
use parking_lot::Mutex;
use pdbtbx::PDB;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// What kind of molecule an interaction partner is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoleculeKind {
    /// Protein, identified by its accession
    Protein,
    /// DNA or RNA chain
    NucleicAcid,
    /// Small molecule; the identifier is its residue name in the structure
    Ligand,
}

/// One side of an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Molecule {
    /// Protein accession, nucleic-acid identifier or ligand code
    pub id: String,
    /// What the molecule is
    pub kind: MoleculeKind,
}

impl Molecule {
    /// Protein with the given accession.
    pub fn protein(accession: &str) -> Self {
        Self {
            id: accession.to_string(),
            kind: MoleculeKind::Protein,
        }
    }

    /// Nucleic acid with the given identifier.
    pub fn nucleic_acid(id: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: MoleculeKind::NucleicAcid,
        }
    }

    /// Ligand named by its residue name, e.g. `ATP`.
    pub fn ligand(code: &str) -> Self {
        Self {
            id: code.to_string(),
            kind: MoleculeKind::Ligand,
        }
    }

    /// Whether the molecule is a protein.
    pub fn is_protein(&self) -> bool {
        self.kind == MoleculeKind::Protein
    }
}

/// A stretch of a protein observed as one chain of a structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainMapping {
    /// Structure holding the chain
    pub structure_id: String,
    /// Accession of the protein (or identifier of the nucleic acid) in the chain
    pub accession: String,
    /// Chain identifier in the structure
    pub chain: String,
    /// First covered protein position, 1-based
    pub start: usize,
    /// Last covered protein position, inclusive
    pub end: usize,
}

impl ChainMapping {
    /// Whether protein position `position` lies in the covered stretch.
    pub fn covers(&self, position: usize) -> bool {
        self.start <= position && position <= self.end
    }
}

/// A structure together with the chains hosting each molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureRef {
    /// Identifier understood by the structure source
    pub structure_id: String,
    /// Chains of the structure and the molecules they hold
    pub mappings: Vec<ChainMapping>,
}

impl StructureRef {
    /// Structure `structure_id` with its chain mappings.
    pub fn new(structure_id: &str, mappings: Vec<ChainMapping>) -> Self {
        Self {
            structure_id: structure_id.to_string(),
            mappings,
        }
    }

    /// Chains hosting `accession` in this structure, in mapping order.
    pub fn chains_of(&self, accession: &str) -> Vec<String> {
        let mut chains = Vec::new();
        for mapping in &self.mappings {
            if mapping.structure_id == self.structure_id
                && mapping.accession == accession
                && !chains.contains(&mapping.chain)
            {
                chains.push(mapping.chain.clone());
            }
        }
        chains
    }
}

/// A residue of a structure, as found in the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructureCoordinate {
    /// Structure holding the residue
    pub structure_id: String,
    /// Chain of the residue
    pub chain: String,
    /// Author residue number with insertion code
    pub position: String,
}

/// The evidence providers an [`InterfaceMapper`] can consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    /// Contacts computed from PDB structures
    PdbGeometry,
    /// Contacts computed from Interactome3D models
    Interactome3d,
    /// EPPIC interface analyses
    Eppic,
    /// DSysMap contacts
    Dsysmap,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ProviderKind::PdbGeometry => write!(f, "PDB"),
            ProviderKind::Interactome3d => write!(f, "Interactome3D"),
            ProviderKind::Eppic => write!(f, "EPPIC"),
            ProviderKind::Dsysmap => write!(f, "DSysMap"),
        }
    }
}

/// Where and against what a position was found at an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceAnnotation {
    /// Structure the evidence comes from
    pub structure_id: String,
    /// Chain of the interface residue
    pub chain: String,
    /// Author residue number of the interface residue
    pub pdb_position: String,
    /// Identifier of the molecule on the other side
    pub partner: String,
    /// Provider that reported the residue
    pub provider: ProviderKind,
}

/// A mapped amino-acid position of a query protein.
///
/// Positions are shared between the providers of one query; structure
/// coordinates and interface annotations only ever accumulate.
#[derive(Debug)]
pub struct AAPosition {
    /// Accession of the query protein
    pub accession: String,
    /// 1-based position in the isoform sequence
    pub position: usize,
    coordinates: Mutex<BTreeSet<StructureCoordinate>>,
    annotations: Mutex<BTreeSet<InterfaceAnnotation>>,
}

impl AAPosition {
    /// Position `position` of `accession`, with no coordinates yet.
    pub fn new(accession: &str, position: usize) -> Arc<Self> {
        Arc::new(Self {
            accession: accession.to_string(),
            position,
            coordinates: Mutex::new(BTreeSet::new()),
            annotations: Mutex::new(BTreeSet::new()),
        })
    }

    /// Record a structure residue this position maps to. Duplicates are ignored.
    pub fn add_coordinate(&self, coordinate: StructureCoordinate) {
        self.coordinates.lock().insert(coordinate);
    }

    /// Structure residues this position maps to, sorted.
    pub fn coordinates(&self) -> Vec<StructureCoordinate> {
        self.coordinates.lock().iter().cloned().collect()
    }

    /// Record an annotation. Returns `false` if it was already present.
    pub fn annotate(&self, annotation: InterfaceAnnotation) -> bool {
        self.annotations.lock().insert(annotation)
    }

    /// Interface annotations recorded so far, sorted.
    pub fn annotations(&self) -> Vec<InterfaceAnnotation> {
        self.annotations.lock().iter().cloned().collect()
    }

    /// Whether any provider placed this position at an interface.
    pub fn is_at_interface(&self) -> bool {
        !self.annotations.lock().is_empty()
    }
}

/// Which protein of the interaction the candidate positions belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingDirection {
    /// The query protein is protein A of the interaction
    AIsInteractor,
    /// The query protein is protein B of the interaction
    BIsInteractor,
}

/// Positions found at an interface, per side of the interaction.
#[derive(Debug, Default)]
pub struct InterfacePositions {
    /// Positions of protein A
    pub a_side: Vec<Arc<AAPosition>>,
    /// Positions of protein B
    pub b_side: Vec<Arc<AAPosition>>,
}

impl InterfacePositions {
    /// Add `position` to the side given by `direction`, once.
    pub fn add(&mut self, direction: MappingDirection, position: &Arc<AAPosition>) {
        let side = match direction {
            MappingDirection::AIsInteractor => &mut self.a_side,
            MappingDirection::BIsInteractor => &mut self.b_side,
        };
        if !side.iter().any(|p| Arc::ptr_eq(p, position)) {
            side.push(position.clone());
        }
    }

    /// Number of positions on both sides.
    pub fn len(&self) -> usize {
        self.a_side.len() + self.b_side.len()
    }

    /// Whether no position was found on either side.
    pub fn is_empty(&self) -> bool {
        self.a_side.is_empty() && self.b_side.is_empty()
    }
}

/// A source of interface residues.
pub enum EvidenceProvider {
    /// Contacts computed from experimental PDB structures
    PdbGeometry(Arc<ContactResolver>),
    /// Contacts computed from Interactome3D models
    Interactome3d(Arc<ContactResolver>),
    /// Precomputed EPPIC interface analyses
    Eppic {
        /// Where the analyses are read from
        repository: Arc<dyn EppicRepository>,
        /// Which residues of a biological interface count
        policy: EppicPolicy,
    },
    /// Precomputed DSysMap contacts
    Dsysmap(Arc<dyn DsysmapRepository>),
}

impl EvidenceProvider {
    /// Which provider this is.
    pub fn kind(&self) -> ProviderKind {
        match self {
            EvidenceProvider::PdbGeometry(_) => ProviderKind::PdbGeometry,
            EvidenceProvider::Interactome3d(_) => ProviderKind::Interactome3d,
            EvidenceProvider::Eppic { .. } => ProviderKind::Eppic,
            EvidenceProvider::Dsysmap(_) => ProviderKind::Dsysmap,
        }
    }

    /// Whether the provider can say anything about a partner of this kind.
    fn accepts(&self, partner: &Molecule) -> bool {
        match self {
            EvidenceProvider::PdbGeometry(_) => true,
            _ => partner.is_protein(),
        }
    }

    /// Residues on the chains of `protein_a` at its interface with `protein_b`.
    fn interface_residues(
        &self,
        protein_a: &Molecule,
        protein_b: &Molecule,
        structure: &StructureRef,
        cancel: &CancelToken,
    ) -> Result<HashSet<(String, String)>, InterfaceError> {
        let id = structure.structure_id.as_str();
        let chains_a = structure.chains_of(&protein_a.id);
        if chains_a.is_empty() {
            return Ok(HashSet::new());
        }
        let on_a = |residues: Vec<ResidueAtInterface>| {
            residues
                .into_iter()
                .filter(|r| chains_a.contains(&r.chain))
                .map(|r| (r.chain, r.position))
                .collect::<HashSet<(String, String)>>()
        };

        let residues = match self {
            EvidenceProvider::PdbGeometry(resolver) | EvidenceProvider::Interactome3d(resolver) => {
                match protein_b.kind {
                    MoleculeKind::Ligand => {
                        on_a(resolver.get_ligand_contacts(id, &chains_a, &protein_b.id, cancel))
                    }
                    MoleculeKind::Protein | MoleculeKind::NucleicAcid => {
                        let chains_b = structure.chains_of(&protein_b.id);
                        on_a(resolver.get_contacts(id, &chains_a, &chains_b, cancel))
                    }
                }
            }
            EvidenceProvider::Eppic { repository, policy } => {
                let chains_b = structure.chains_of(&protein_b.id);
                let mut residues = HashSet::new();
                for interface in repository.interfaces(id)? {
                    let relevant = chains_a
                        .iter()
                        .any(|a| chains_b.iter().any(|b| interface.joins(a, b)));
                    if !relevant {
                        continue;
                    }
                    residues.extend(
                        policy
                            .interface_residues(&interface)
                            .filter(|r| chains_a.contains(&r.chain))
                            .map(|r| (r.chain.clone(), r.position.clone())),
                    );
                }
                residues
            }
            EvidenceProvider::Dsysmap(repository) => repository
                .contacts(&protein_a.id, &protein_b.id, id)?
                .into_iter()
                .filter(|r| chains_a.contains(&r.chain))
                .map(|r| (r.chain, r.position))
                .collect(),
        };
        Ok(residues)
    }
}

/// Intersects candidate positions with the interface residues of one provider.
pub struct InterfaceMapper {
    provider: EvidenceProvider,
}

impl InterfaceMapper {
    /// Mapper consulting `provider`.
    pub fn new(provider: EvidenceProvider) -> Self {
        Self { provider }
    }

    /// Kind of the underlying provider.
    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    /// Annotate every candidate of `protein_a` whose structure coordinate lies at
    /// the interface with `protein_b`, and add it to the side of `found` given by
    /// `direction`. Returns the number of positions annotated.
    ///
    /// Finding nothing is a normal outcome. Evidence that cannot be read is an error.
    #[allow(clippy::too_many_arguments)]
    pub fn search_interfaces(
        &self,
        direction: MappingDirection,
        protein_a: &Molecule,
        protein_b: &Molecule,
        structure: &StructureRef,
        candidates: &[Arc<AAPosition>],
        found: &mut InterfacePositions,
        cancel: &CancelToken,
    ) -> Result<usize, InterfaceError> {
        if candidates.is_empty() {
            return Ok(0);
        }
        if !protein_a.is_protein() || !self.provider.accepts(protein_b) {
            debug!(
                "{} has no evidence for {:?} with {:?}",
                self.kind(),
                protein_a.kind,
                protein_b.kind
            );
            return Ok(0);
        }

        let residues = self
            .provider
            .interface_residues(protein_a, protein_b, structure, cancel)?;
        trace!(
            "{} reports {} interface residues of {} in {}",
            self.kind(),
            residues.len(),
            protein_a.id,
            structure.structure_id
        );
        if residues.is_empty() {
            return Ok(0);
        }

        let mut matched = 0;
        for candidate in candidates {
            let mut hit = false;
            for coordinate in candidate.coordinates() {
                if coordinate.structure_id != structure.structure_id
                    || !residues.contains(&(coordinate.chain.clone(), coordinate.position.clone()))
                {
                    continue;
                }
                candidate.annotate(InterfaceAnnotation {
                    structure_id: coordinate.structure_id,
                    chain: coordinate.chain,
                    pdb_position: coordinate.position,
                    partner: protein_b.id.clone(),
                    provider: self.kind(),
                });
                hit = true;
            }
            if hit {
                found.add(direction, candidate);
                matched += 1;
            }
        }
        debug!(
            "{} placed {matched} of {} positions of {} at the interface with {} in {}",
            self.kind(),
            candidates.len(),
            protein_a.id,
            protein_b.id,
            structure.structure_id
        );
        Ok(matched)
    }
}

/// Give each candidate of `mapping.accession` the residue of `mapping.chain` it
/// aligns to. Returns the number of candidates that received a coordinate.
///
/// The covered part of `isoform` is aligned against the sequence observed in
/// the chain; positions aligned to a gap, or outside the covered range, are skipped.
pub fn map_isoform_to_chain(
    aligner: &SequenceAligner,
    isoform: &str,
    structure: &PDB,
    mapping: &ChainMapping,
    candidates: &[Arc<AAPosition>],
) -> usize {
    let Some(chain) = structure.chains().find(|c| c.id() == mapping.chain) else {
        debug!("Chain {} not found in {}", mapping.chain, mapping.structure_id);
        return 0;
    };
    let end = mapping.end.min(isoform.len());
    if mapping.start == 0 || mapping.start > end {
        return 0;
    }
    let offset = mapping.start - 1;
    let Some(covered) = isoform.get(offset..end) else {
        return 0;
    };

    let observed = chain.pdb_seq();
    let chain_seq = observed.iter().map(|(aa, _)| *aa).collect::<String>();
    let positions = aligner.align(covered, &chain_seq).position_map();
    // The alignment skips residues outside its alphabet on both sides
    let query_residues = aligned_positions(covered);
    let chain_residues = aligned_positions(&chain_seq);

    let mut mapped = 0;
    for candidate in candidates
        .iter()
        .filter(|c| c.accession == mapping.accession && mapping.covers(c.position))
    {
        let Ok(query) = query_residues.binary_search(&(candidate.position - offset)) else {
            trace!("{} is not an aligned residue", candidate.position);
            continue;
        };
        let Some(target) = positions.get(query + 1) else {
            continue;
        };
        let Some((_, label)) = chain_residues
            .get(target - 1)
            .and_then(|raw| observed.get(raw - 1))
        else {
            continue;
        };
        candidate.add_coordinate(StructureCoordinate {
            structure_id: mapping.structure_id.clone(),
            chain: mapping.chain.clone(),
            position: label.clone(),
        });
        mapped += 1;
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::{resolver, TableGeometry};
    use crate::structure::parser::tests::DIMER_PDB;
    use crate::structure::{PdbtbxParser, StructureParser};
    use std::sync::atomic::Ordering;

    fn complex() -> StructureRef {
        StructureRef::new(
            "1abc",
            vec![
                ChainMapping {
                    structure_id: "1abc".to_string(),
                    accession: "P1".to_string(),
                    chain: "A".to_string(),
                    start: 1,
                    end: 100,
                },
                ChainMapping {
                    structure_id: "1abc".to_string(),
                    accession: "P2".to_string(),
                    chain: "B".to_string(),
                    start: 1,
                    end: 100,
                },
            ],
        )
    }

    fn candidate(position: usize, pdb_position: &str) -> Arc<AAPosition> {
        let aa = AAPosition::new("P1", position);
        aa.add_coordinate(StructureCoordinate {
            structure_id: "1abc".to_string(),
            chain: "A".to_string(),
            position: pdb_position.to_string(),
        });
        aa
    }

    fn table() -> Vec<(&'static str, &'static str)> {
        vec![("10:A", "B"), ("11:A", "B"), ("20:B", "A"), ("50:A", "ATP")]
    }

    #[test]
    fn test_candidates_intersect_contacts() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = Arc::new(TableGeometry::new(table()));
        let mapper = InterfaceMapper::new(EvidenceProvider::PdbGeometry(Arc::new(resolver(
            dir.path(),
            geometry.clone(),
        ))));
        let candidates = vec![candidate(5, "10"), candidate(6, "12"), candidate(7, "20")];
        let mut found = InterfacePositions::default();

        let matched = mapper
            .search_interfaces(
                MappingDirection::BIsInteractor,
                &Molecule::protein("P1"),
                &Molecule::protein("P2"),
                &complex(),
                &candidates,
                &mut found,
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(matched, 1);
        assert_eq!(
            candidates[0].annotations(),
            vec![InterfaceAnnotation {
                structure_id: "1abc".to_string(),
                chain: "A".to_string(),
                pdb_position: "10".to_string(),
                partner: "P2".to_string(),
                provider: ProviderKind::PdbGeometry,
            }]
        );
        assert!(!candidates[1].is_at_interface());
        // Residue 20 is at the interface, but on chain B
        assert!(!candidates[2].is_at_interface());
        assert!(found.a_side.is_empty());
        assert_eq!(found.b_side.len(), 1);
        assert!(Arc::ptr_eq(&found.b_side[0], &candidates[0]));
    }

    #[test]
    fn test_empty_candidates_short_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = Arc::new(TableGeometry::new(table()));
        let resolver = Arc::new(resolver(dir.path(), geometry.clone()));
        let mapper = InterfaceMapper::new(EvidenceProvider::PdbGeometry(resolver.clone()));
        let mut found = InterfacePositions::default();

        let matched = mapper
            .search_interfaces(
                MappingDirection::AIsInteractor,
                &Molecule::protein("P1"),
                &Molecule::protein("P2"),
                &complex(),
                &[],
                &mut found,
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(matched, 0);
        assert!(found.is_empty());
        assert_eq!(geometry.chain_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.source().cache().blacklisted_count(), 0);
    }

    #[test]
    fn test_ligand_partner() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = Arc::new(TableGeometry::new(table()));
        let resolver = Arc::new(resolver(dir.path(), geometry.clone()));
        let candidates = vec![candidate(1, "50"), candidate(2, "10")];
        let cancel = CancelToken::new();

        // Only the structure-geometry provider handles non-protein partners
        let mut found = InterfacePositions::default();
        let i3d = InterfaceMapper::new(EvidenceProvider::Interactome3d(resolver.clone()));
        let matched = i3d
            .search_interfaces(
                MappingDirection::AIsInteractor,
                &Molecule::protein("P1"),
                &Molecule::ligand("ATP"),
                &complex(),
                &candidates,
                &mut found,
                &cancel,
            )
            .unwrap();
        assert_eq!(matched, 0);
        assert_eq!(geometry.ligand_calls.load(Ordering::SeqCst), 0);

        let pdb = InterfaceMapper::new(EvidenceProvider::PdbGeometry(resolver));
        let matched = pdb
            .search_interfaces(
                MappingDirection::AIsInteractor,
                &Molecule::protein("P1"),
                &Molecule::ligand("ATP"),
                &complex(),
                &candidates,
                &mut found,
                &cancel,
            )
            .unwrap();
        assert_eq!(matched, 1);
        assert_eq!(candidates[0].annotations()[0].partner, "ATP");
        assert_eq!(found.a_side.len(), 1);
    }

    struct FixedEppic(Vec<EppicInterface>);

    impl EppicRepository for FixedEppic {
        fn interfaces(&self, _: &str) -> Result<Vec<EppicInterface>, InterfaceError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_eppic_provider() {
        let residue = |position: &str, buried_fraction: f64| EppicResidue {
            chain: "A".to_string(),
            position: position.to_string(),
            buried_fraction,
        };
        let interfaces = vec![
            EppicInterface {
                chain_a: "B".to_string(),
                chain_b: "A".to_string(),
                classification: "bio".to_string(),
                residues: vec![residue("10", 0.99), residue("12", 0.5)],
            },
            EppicInterface {
                chain_a: "A".to_string(),
                chain_b: "B".to_string(),
                classification: "xtal".to_string(),
                residues: vec![residue("12", 1.0)],
            },
        ];
        let mapper = InterfaceMapper::new(EvidenceProvider::Eppic {
            repository: Arc::new(FixedEppic(interfaces)),
            policy: EppicPolicy::default(),
        });
        let candidates = vec![candidate(5, "10"), candidate(6, "12")];
        let mut found = InterfacePositions::default();

        let matched = mapper
            .search_interfaces(
                MappingDirection::AIsInteractor,
                &Molecule::protein("P1"),
                &Molecule::protein("P2"),
                &complex(),
                &candidates,
                &mut found,
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(matched, 1);
        assert_eq!(candidates[0].annotations()[0].provider, ProviderKind::Eppic);
        assert!(!candidates[1].is_at_interface());
    }

    #[test]
    fn test_dsysmap_provider() {
        let table = DsysmapTable::new(vec![DsysmapRecord {
            protein_a: "P1".to_string(),
            protein_b: "P2".to_string(),
            structure_id: "1ABC".to_string(),
            residues: vec![DsysmapResidue {
                chain: "A".to_string(),
                position: "12".to_string(),
            }],
        }]);
        let mapper = InterfaceMapper::new(EvidenceProvider::Dsysmap(Arc::new(table)));
        let candidates = vec![candidate(5, "10"), candidate(6, "12")];
        let mut found = InterfacePositions::default();

        let matched = mapper
            .search_interfaces(
                MappingDirection::AIsInteractor,
                &Molecule::protein("P1"),
                &Molecule::protein("P2"),
                &complex(),
                &candidates,
                &mut found,
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(matched, 1);
        assert!(candidates[1].is_at_interface());

        // Running the same provider again adds nothing new
        mapper
            .search_interfaces(
                MappingDirection::AIsInteractor,
                &Molecule::protein("P1"),
                &Molecule::protein("P2"),
                &complex(),
                &candidates,
                &mut found,
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(candidates[1].annotations().len(), 1);
        assert_eq!(found.a_side.len(), 1);
    }

    fn dimer() -> PDB {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dimer.pdb");
        std::fs::write(&path, DIMER_PDB).unwrap();
        PdbtbxParser.parse(&path).unwrap()
    }

    #[test]
    fn test_map_isoform_to_chain() {
        let pdb = dimer();

        // Chain A holds "AAA" numbered 1-3, covering isoform positions 4-6
        let mapping = ChainMapping {
            structure_id: "dimer".to_string(),
            accession: "P1".to_string(),
            chain: "A".to_string(),
            start: 4,
            end: 6,
        };
        let candidates = vec![
            AAPosition::new("P1", 2),
            AAPosition::new("P1", 5),
            AAPosition::new("P2", 5),
        ];
        let mapped = map_isoform_to_chain(
            &SequenceAligner::default(),
            "WWWAAAWWW",
            &pdb,
            &mapping,
            &candidates,
        );

        assert_eq!(mapped, 1);
        assert!(candidates[0].coordinates().is_empty());
        assert_eq!(
            candidates[1].coordinates(),
            vec![StructureCoordinate {
                structure_id: "dimer".to_string(),
                chain: "A".to_string(),
                position: "2".to_string(),
            }]
        );
        assert!(candidates[2].coordinates().is_empty());
    }

    #[test]
    fn test_isoform_mapping_skips_unknown_residues() {
        let pdb = dimer();
        let mapping = ChainMapping {
            structure_id: "dimer".to_string(),
            accession: "P1".to_string(),
            chain: "A".to_string(),
            start: 1,
            end: 5,
        };
        let candidates = (1..=5)
            .map(|position| AAPosition::new("P1", position))
            .collect::<Vec<_>>();
        let mapped = map_isoform_to_chain(
            &SequenceAligner::default(),
            "XAAAW",
            &pdb,
            &mapping,
            &candidates,
        );

        let residue = |i: usize| {
            candidates[i]
                .coordinates()
                .into_iter()
                .map(|c| c.position)
                .collect::<Vec<String>>()
        };
        assert_eq!(mapped, 3);
        assert!(residue(0).is_empty(), "X has no structure residue");
        assert_eq!(residue(1), vec!["1"]);
        assert_eq!(residue(2), vec!["2"]);
        assert_eq!(residue(3), vec!["3"]);
        assert!(residue(4).is_empty());
    }
}
