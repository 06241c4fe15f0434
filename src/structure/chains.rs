//! Sequence helpers over pdbtbx residues and chains.

use pdbtbx::*;

/// Sequence-level view of a pdbtbx residue.
pub trait ResidueExt {
    /// The residue one-letter code, or `None` if it's not an amino acid.
    fn one_letter(&self) -> Option<char>;

    /// Author residue number with its insertion code, e.g. `52` or `52A`.
    fn label(&self) -> String;
}

impl ResidueExt for Residue {
    fn one_letter(&self) -> Option<char> {
        let aa_code = match self.name()?.to_uppercase().as_str() {
            "ALA" => 'A',
            "ARG" => 'R',
            "ASN" => 'N',
            "ASP" => 'D',
            "CYS" => 'C',
            "GLN" => 'Q',
            "GLU" => 'E',
            "GLY" => 'G',
            "HIS" => 'H',
            "ILE" => 'I',
            "LEU" => 'L',
            "LYS" => 'K',
            "MET" | "MSE" => 'M', // selenomethionine
            "PHE" => 'F',
            "PRO" => 'P',
            "SER" => 'S',
            "THR" => 'T',
            "TRP" => 'W',
            "TYR" => 'Y',
            "VAL" => 'V',
            _ => return None,
        };
        Some(aa_code)
    }

    fn label(&self) -> String {
        let (resi, insertion) = self.id();
        format!("{resi}{}", insertion.unwrap_or(""))
    }
}

/// Sequence-level view of a pdbtbx chain.
pub trait ChainExt {
    /// Amino-acid residues of the chain as (one-letter code, residue label) pairs.
    fn pdb_seq(&self) -> Vec<(char, String)>;

    /// The observed amino-acid sequence of the chain.
    fn one_letter_seq(&self) -> String {
        self.pdb_seq().iter().map(|(aa, _)| *aa).collect()
    }
}

impl ChainExt for Chain {
    fn pdb_seq(&self) -> Vec<(char, String)> {
        self.residues()
            .filter_map(|res| res.one_letter().map(|aa| (aa, res.label())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::parser::tests::DIMER_PDB;
    use crate::structure::{PdbtbxParser, StructureParser};

    #[test]
    fn test_pdb_seq_skips_ligands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dimer.pdb");
        std::fs::write(&path, DIMER_PDB).unwrap();

        let pdb = PdbtbxParser.parse(&path).unwrap();
        let chain_a = pdb.chains().find(|c| c.id() == "A").unwrap();
        assert_eq!(chain_a.one_letter_seq(), "AAA");
        assert_eq!(
            chain_a
                .pdb_seq()
                .into_iter()
                .map(|(_, label)| label)
                .collect::<Vec<String>>(),
            vec!["1", "2", "3"]
        );
    }
}
