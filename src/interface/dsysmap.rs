//! DSysMap residue contacts, looked up by protein pair and structure.

use crate::error::InterfaceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Interface residues of `protein_a` facing `protein_b` in one structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DsysmapRecord {
    /// Protein whose residues are listed
    pub protein_a: String,
    /// Interaction partner
    pub protein_b: String,
    /// Structure the contacts were taken from
    pub structure_id: String,
    /// Residues of `protein_a` in contact with `protein_b`
    pub residues: Vec<DsysmapResidue>,
}

/// One residue of a DSysMap interface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DsysmapResidue {
    /// Chain of the residue
    pub chain: String,
    /// Author residue number with insertion code
    pub position: String,
}

/// Source of DSysMap contacts.
pub trait DsysmapRepository: Send + Sync {
    /// Residues of `protein_a` at its interface with `protein_b` in `structure_id`.
    fn contacts(
        &self,
        protein_a: &str,
        protein_b: &str,
        structure_id: &str,
    ) -> Result<Vec<DsysmapResidue>, InterfaceError>;
}

type LookupKey = (String, String, String);

/// In-memory table of DSysMap records.
#[derive(Debug, Clone, Default)]
pub struct DsysmapTable {
    records: HashMap<LookupKey, Vec<DsysmapResidue>>,
}

impl DsysmapTable {
    /// Index `records` by protein pair and lowercase structure identifier.
    pub fn new(records: Vec<DsysmapRecord>) -> Self {
        let mut table = Self::default();
        for record in records {
            table
                .records
                .entry((
                    record.protein_a,
                    record.protein_b,
                    record.structure_id.to_ascii_lowercase(),
                ))
                .or_default()
                .extend(record.residues);
        }
        table
    }

    /// Load a JSON array of records.
    pub fn from_json_file(path: &Path) -> Result<Self, InterfaceError> {
        let text = std::fs::read_to_string(path)?;
        let records = serde_json::from_str(&text).map_err(|e| InterfaceError::Evidence {
            provider: "DSysMap",
            reason: format!("{}: {e}", path.display()),
        })?;
        Ok(Self::new(records))
    }

    /// Number of distinct (protein A, protein B, structure) entries.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DsysmapRepository for DsysmapTable {
    fn contacts(
        &self,
        protein_a: &str,
        protein_b: &str,
        structure_id: &str,
    ) -> Result<Vec<DsysmapResidue>, InterfaceError> {
        let key = (
            protein_a.to_string(),
            protein_b.to_string(),
            structure_id.to_ascii_lowercase(),
        );
        Ok(self.records.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_directional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsysmap.json");
        std::fs::write(
            &path,
            r#"[{"protein_a": "P04637", "protein_b": "Q00987", "structure_id": "1YCR",
                 "residues": [{"chain": "B", "position": "19"}, {"chain": "B", "position": "23"}]}]"#,
        )
        .unwrap();

        let table = DsysmapTable::from_json_file(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.contacts("P04637", "Q00987", "1ycr").unwrap().len(), 2);
        assert!(table.contacts("Q00987", "P04637", "1ycr").unwrap().is_empty());
        assert!(table.contacts("P04637", "Q00987", "4hhb").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsysmap.json");
        std::fs::write(&path, "[{\"protein_a\": \"P04637\"}]").unwrap();
        assert!(matches!(
            DsysmapTable::from_json_file(&path),
            Err(InterfaceError::Evidence { provider: "DSysMap", .. })
        ));
    }
}
