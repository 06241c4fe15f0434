//! Memoized interface residues per structure and per chain (or chain/ligand) pair.
pub mod geometry;

pub use geometry::{residue_key, ContactGeometry, ContactMap, SurfaceBurialGeometry};

use crate::structure::{CancelToken, StructureSource};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Something a residue can be in contact with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partner {
    /// A chain, by identifier
    Chain(String),
    /// Every copy of a ligand, by residue name
    Ligand(String),
}

impl std::fmt::Display for Partner {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Partner::Chain(label) => write!(f, "chain {label}"),
            Partner::Ligand(label) => write!(f, "ligand {label}"),
        }
    }
}

/// A pair of entities whose contacts have been computed.
///
/// Entities are stored in sorted order, so a pair and its reverse share one slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactKey(Partner, Partner);

impl ContactKey {
    /// Key of the pair `a`/`b`, in either order.
    pub fn new(a: Partner, b: Partner) -> Self {
        if a <= b {
            ContactKey(a, b)
        } else {
            ContactKey(b, a)
        }
    }

    /// Key of two chains.
    pub fn chains(a: &str, b: &str) -> Self {
        Self::new(Partner::Chain(a.to_string()), Partner::Chain(b.to_string()))
    }

    /// Key of a chain and a ligand.
    pub fn ligand(chain: &str, ligand: &str) -> Self {
        Self::new(
            Partner::Chain(chain.to_string()),
            Partner::Ligand(ligand.to_string()),
        )
    }

    /// Both entities, in sorted order.
    pub fn entities(&self) -> (&Partner, &Partner) {
        (&self.0, &self.1)
    }
}

/// A residue found in contact with another chain or a ligand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueAtInterface {
    /// Structure holding the residue
    pub structure_id: String,
    /// Author residue number with insertion code, as in the structure file
    pub position: String,
    /// Chain of the residue
    pub chain: String,
}

impl ResidueAtInterface {
    /// Build from a `"<position>:<chain>"` residue key.
    fn from_key(structure_id: &str, key: &str) -> Option<Self> {
        let (position, chain) = key.split_once(':')?;
        Some(Self {
            structure_id: structure_id.to_string(),
            position: position.to_string(),
            chain: chain.to_string(),
        })
    }
}

/// What is known about the contacts of one structure.
#[derive(Debug, Default)]
struct StructureContacts {
    partners: HashMap<String, HashSet<Partner>>,
    computed: HashSet<ContactKey>,
    by_pair: HashMap<ContactKey, BTreeSet<ResidueAtInterface>>,
}

impl StructureContacts {
    /// Merge a geometry result. Only associations belonging to one of the
    /// requested pairs are kept; every requested pair becomes computed.
    fn merge(
        &mut self,
        structure_id: &str,
        contacts: ContactMap,
        requested: &[ContactKey],
        wrap: fn(String) -> Partner,
    ) {
        let requested_set = requested.iter().collect::<HashSet<&ContactKey>>();
        for (key, partners) in contacts {
            let Some(residue) = ResidueAtInterface::from_key(structure_id, &key) else {
                warn!("Ignoring malformed residue identifier {key:?} for {structure_id}");
                continue;
            };
            for partner in partners.into_iter().map(wrap) {
                let pair =
                    ContactKey::new(Partner::Chain(residue.chain.clone()), partner.clone());
                if !requested_set.contains(&pair) {
                    continue;
                }
                self.by_pair.entry(pair).or_default().insert(residue.clone());
                self.partners.entry(key.clone()).or_default().insert(partner);
            }
        }
        self.computed.extend(requested.iter().cloned());
    }

    /// Residues of `side` touching a partner in `others`.
    fn touching(
        &self,
        structure_id: &str,
        side: &[String],
        others: &HashSet<Partner>,
    ) -> Vec<ResidueAtInterface> {
        self.partners
            .iter()
            .filter(|(_, partners)| !partners.is_disjoint(others))
            .filter_map(|(key, _)| ResidueAtInterface::from_key(structure_id, key))
            .filter(|residue| side.contains(&residue.chain))
            .collect()
    }
}

/// Interface residues of the structures of one [`StructureSource`], computed
/// on demand and kept for the lifetime of the resolver.
///
/// Failures to obtain a structure or to compute its geometry are logged and
/// answered with no contacts. Nothing is recorded for a failed computation, so
/// a later call tries again; structures that cannot be fetched are remembered
/// by the source's blacklist instead.
pub struct ContactResolver {
    source: Arc<StructureSource>,
    geometry: Arc<dyn ContactGeometry>,
    structures: DashMap<String, Arc<Mutex<StructureContacts>>>,
}

impl ContactResolver {
    /// Resolver computing contacts of structures from `source` with `geometry`.
    pub fn new(source: Arc<StructureSource>, geometry: Arc<dyn ContactGeometry>) -> Self {
        Self {
            source,
            geometry,
            structures: DashMap::new(),
        }
    }

    /// The source structures are read from.
    pub fn source(&self) -> &Arc<StructureSource> {
        &self.source
    }

    fn state(&self, id: &str) -> Arc<Mutex<StructureContacts>> {
        self.structures
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Whether contacts between `a` and `b` have been computed for `id`.
    pub fn is_computed(&self, id: &str, a: &Partner, b: &Partner) -> bool {
        self.structures.get(id).is_some_and(|state| {
            state
                .lock()
                .computed
                .contains(&ContactKey::new(a.clone(), b.clone()))
        })
    }

    /// Residues of `chains_a` touching a chain of `chains_b`, and residues of
    /// `chains_b` touching a chain of `chains_a`.
    ///
    /// All pairs not computed yet are handed to the geometry in a single call.
    pub fn get_contacts(
        &self,
        id: &str,
        chains_a: &[String],
        chains_b: &[String],
        cancel: &CancelToken,
    ) -> Vec<ResidueAtInterface> {
        let state = self.state(id);
        let mut contacts = state.lock();

        let mut pending = Vec::new();
        let mut pending_pairs = Vec::new();
        for a in chains_a {
            for b in chains_b.iter().filter(|b| *b != a) {
                let key = ContactKey::chains(a, b);
                if !contacts.computed.contains(&key) && !pending.contains(&key) {
                    pending.push(key);
                    pending_pairs.push((a.clone(), b.clone()));
                }
            }
        }

        if !pending.is_empty() {
            debug!("Computing {} chain pairs of {id}", pending.len());
            let result = self.source.get_structure(id, cancel).and_then(|structure| {
                self.geometry.chain_contacts(id, &structure, &pending_pairs)
            });
            match result {
                Ok(map) => contacts.merge(id, map, &pending, Partner::Chain),
                Err(e) => warn!("No chain contacts for {id}: {e}"),
            }
        }

        let to_partners = |chains: &[String]| {
            chains
                .iter()
                .map(|c| Partner::Chain(c.clone()))
                .collect::<HashSet<Partner>>()
        };
        let mut residues = contacts.touching(id, chains_a, &to_partners(chains_b));
        residues.extend(contacts.touching(id, chains_b, &to_partners(chains_a)));
        residues.sort();
        residues.dedup();
        residues
    }

    /// Residues of `chains` in contact with the ligand `ligand`.
    pub fn get_ligand_contacts(
        &self,
        id: &str,
        chains: &[String],
        ligand: &str,
        cancel: &CancelToken,
    ) -> Vec<ResidueAtInterface> {
        let state = self.state(id);
        let mut contacts = state.lock();

        let pending = chains
            .iter()
            .map(|chain| ContactKey::ligand(chain, ligand))
            .filter(|key| !contacts.computed.contains(key))
            .collect::<Vec<ContactKey>>();

        if !pending.is_empty() {
            let pending_chains = pending
                .iter()
                .filter_map(|key| match key.entities() {
                    (Partner::Chain(chain), _) | (_, Partner::Chain(chain)) => Some(chain.clone()),
                    _ => None,
                })
                .collect::<Vec<String>>();
            debug!("Computing contacts of {ligand} with {} chains of {id}", pending_chains.len());
            let result = self.source.get_structure(id, cancel).and_then(|structure| {
                self.geometry
                    .ligand_contacts(id, &structure, &pending_chains, ligand)
            });
            match result {
                Ok(map) => contacts.merge(id, map, &pending, Partner::Ligand),
                Err(e) => warn!("No contacts with {ligand} for {id}: {e}"),
            }
        }

        let mut residues = contacts.touching(
            id,
            chains,
            &HashSet::from([Partner::Ligand(ligand.to_string())]),
        );
        residues.sort();
        residues
    }

    /// Residues at the interface between chains `a` and `b`, computing the pair on a miss.
    pub fn get_residues_at_interface(
        &self,
        id: &str,
        a: &str,
        b: &str,
        cancel: &CancelToken,
    ) -> Vec<ResidueAtInterface> {
        let key = ContactKey::chains(a, b);
        if !self.is_computed(id, &key.0, &key.1) {
            self.get_contacts(id, &[a.to_string()], &[b.to_string()], cancel);
        }
        self.structures
            .get(id)
            .and_then(|state| {
                state
                    .lock()
                    .by_pair
                    .get(&key)
                    .map(|residues| residues.iter().cloned().collect())
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::StructureError;
    use crate::structure::registry::tests::offline_collaborators;
    use crate::structure::{SourceKind, StructureRegistry};
    use pdbtbx::PDB;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Answers from a fixed residue table and counts its invocations.
    #[derive(Default)]
    pub(crate) struct TableGeometry {
        pub(crate) chain_calls: AtomicUsize,
        pub(crate) ligand_calls: AtomicUsize,
        pub(crate) fail: AtomicBool,
        pub(crate) table: Vec<(&'static str, &'static str)>,
    }

    impl TableGeometry {
        pub(crate) fn new(table: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                table,
                ..Default::default()
            }
        }

        fn answer(&self, id: &str) -> Result<ContactMap, StructureError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StructureError::GeometryComputation {
                    id: id.to_string(),
                    reason: "surface calculation diverged".to_string(),
                });
            }
            let mut map = ContactMap::new();
            for (residue, partner) in &self.table {
                map.entry(residue.to_string())
                    .or_default()
                    .insert(partner.to_string());
            }
            Ok(map)
        }
    }

    impl ContactGeometry for TableGeometry {
        fn chain_contacts(
            &self,
            id: &str,
            _structure: &PDB,
            _pairs: &[(String, String)],
        ) -> Result<ContactMap, StructureError> {
            self.chain_calls.fetch_add(1, Ordering::SeqCst);
            self.answer(id)
        }

        fn ligand_contacts(
            &self,
            id: &str,
            _structure: &PDB,
            _chains: &[String],
            _ligand: &str,
        ) -> Result<ContactMap, StructureError> {
            self.ligand_calls.fetch_add(1, Ordering::SeqCst);
            self.answer(id)
        }
    }

    /// A resolver over a user directory holding `1abc.pdb`, parsed by a spy.
    pub(crate) fn resolver(
        dir: &std::path::Path,
        geometry: Arc<TableGeometry>,
    ) -> ContactResolver {
        std::fs::write(dir.join("1abc.pdb"), b"").unwrap();
        let registry = StructureRegistry::new(offline_collaborators(Arc::default()));
        let source = registry.get(
            SourceKind::UserDirectory,
            &dir.to_string_lossy(),
            &dir.join("cache"),
        );
        ContactResolver::new(source, geometry)
    }

    fn chains(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|c| c.to_string()).collect()
    }

    fn positions(residues: &[ResidueAtInterface]) -> Vec<String> {
        residues
            .iter()
            .map(|r| format!("{}:{}", r.position, r.chain))
            .collect()
    }

    fn sample_table() -> Vec<(&'static str, &'static str)> {
        vec![
            ("10:A", "B"),
            ("11:A", "C"),
            ("12:A", "D"),
            ("20:B", "A"),
            ("30:C", "A"),
            ("40:D", "E"),
            ("50:A", "ATP"),
        ]
    }

    #[test]
    fn test_pairs_are_batched() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = Arc::new(TableGeometry::new(sample_table()));
        let resolver = resolver(dir.path(), geometry.clone());
        let cancel = CancelToken::new();

        let residues = resolver.get_contacts("1abc", &chains(&["A"]), &chains(&["B", "C"]), &cancel);
        assert_eq!(geometry.chain_calls.load(Ordering::SeqCst), 1);
        for pair in [("A", "B"), ("A", "C"), ("C", "A")] {
            assert!(
                resolver.is_computed(
                    "1abc",
                    &Partner::Chain(pair.0.into()),
                    &Partner::Chain(pair.1.into())
                ),
                "Pair {pair:?} not computed"
            );
        }
        assert_eq!(positions(&residues), vec!["10:A", "11:A", "20:B", "30:C"]);

        // A second query over the same pairs is answered from memory
        resolver.get_contacts("1abc", &chains(&["B"]), &chains(&["A"]), &cancel);
        assert_eq!(geometry.chain_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_contacts_outside_requested_chains_are_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = Arc::new(TableGeometry::new(sample_table()));
        let resolver = resolver(dir.path(), geometry.clone());
        let cancel = CancelToken::new();

        let residues = resolver.get_contacts("1abc", &chains(&["A"]), &chains(&["B"]), &cancel);
        assert_eq!(positions(&residues), vec!["10:A", "20:B"]);

        let residues = resolver.get_residues_at_interface("1abc", "A", "C", &cancel);
        assert_eq!(positions(&residues), vec!["11:A", "30:C"]);
        assert_eq!(geometry.chain_calls.load(Ordering::SeqCst), 2);

        // D-E was never requested, so it was not recorded
        assert!(resolver
            .get_residues_at_interface("1abc", "B", "A", &cancel)
            .iter()
            .all(|r| r.chain == "A" || r.chain == "B"));
        assert_eq!(geometry.chain_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_same_chain_pairs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = Arc::new(TableGeometry::new(sample_table()));
        let resolver = resolver(dir.path(), geometry.clone());

        let residues = resolver.get_contacts("1abc", &chains(&["A"]), &chains(&["A"]), &CancelToken::new());
        assert!(residues.is_empty());
        assert_eq!(geometry.chain_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ligand_contacts() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = Arc::new(TableGeometry::new(sample_table()));
        let resolver = resolver(dir.path(), geometry.clone());
        let cancel = CancelToken::new();

        let residues = resolver.get_ligand_contacts("1abc", &chains(&["A", "B"]), "ATP", &cancel);
        assert_eq!(positions(&residues), vec!["50:A"]);
        resolver.get_ligand_contacts("1abc", &chains(&["A"]), "ATP", &cancel);
        assert_eq!(geometry.ligand_calls.load(Ordering::SeqCst), 1);
        assert_eq!(geometry.chain_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_geometry_failure_is_retried_later() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = Arc::new(TableGeometry::new(sample_table()));
        geometry.fail.store(true, Ordering::SeqCst);
        let resolver = resolver(dir.path(), geometry.clone());
        let cancel = CancelToken::new();

        assert!(resolver
            .get_contacts("1abc", &chains(&["A"]), &chains(&["B"]), &cancel)
            .is_empty());
        assert!(!resolver.is_computed(
            "1abc",
            &Partner::Chain("A".into()),
            &Partner::Chain("B".into())
        ));

        geometry.fail.store(false, Ordering::SeqCst);
        let residues = resolver.get_contacts("1abc", &chains(&["A"]), &chains(&["B"]), &cancel);
        assert_eq!(positions(&residues), vec!["10:A", "20:B"]);
        assert_eq!(geometry.chain_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_structure_yields_no_contacts() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = Arc::new(TableGeometry::new(sample_table()));
        let resolver = resolver(dir.path(), geometry.clone());

        let residues = resolver.get_contacts("9zzz", &chains(&["A"]), &chains(&["B"]), &CancelToken::new());
        assert!(residues.is_empty());
        assert_eq!(geometry.chain_calls.load(Ordering::SeqCst), 0);
        assert!(resolver.source().cache().is_blacklisted("9zzz"));
    }
}
