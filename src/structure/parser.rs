//! Parsing of structure files with pdbtbx.

use flate2::read::MultiGzDecoder;
use pdbtbx::*;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, error, warn};

/// Turns a structure file on disk into a parsed model.
pub trait StructureParser: Send + Sync {
    /// Parse the file at `path`, which may be gzip-compressed. Errors are
    /// reported as a single human-readable reason.
    fn parse(&self, path: &Path) -> Result<PDB, String>;
}

/// [`StructureParser`] backed by [`pdbtbx`], reading PDB or mmCIF, plain or gzipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdbtbxParser;

impl PdbtbxParser {
    fn options(format: Format) -> ReadOptions {
        let mut options = ReadOptions::default();
        options
            .set_format(format)
            .set_only_atomic_coords(true)
            .set_level(StrictnessLevel::Loose);
        options
    }
}

impl StructureParser for PdbtbxParser {
    fn parse(&self, path: &Path) -> Result<PDB, String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let result = if let Some(inner) = name.strip_suffix(".gz") {
            let format = if inner.ends_with(".cif") {
                Format::Mmcif
            } else {
                Format::Pdb
            };
            let file = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
            Self::options(format).read_raw(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Self::options(Format::Auto).read(path.to_string_lossy())
        };

        match result {
            Ok((pdb, warnings)) => {
                for e in &warnings {
                    match e.level() {
                        ErrorLevel::BreakingError | ErrorLevel::InvalidatingError => error!("{e}"),
                        _ => warn!("{e}"),
                    }
                }
                debug!(
                    "Parsed {} with {} chains and {} atoms",
                    path.display(),
                    pdb.chain_count(),
                    pdb.atom_count()
                );
                Ok(pdb)
            }
            Err(errors) => Err(errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<String>>()
                .join("; ")),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    /// Two short chains facing each other plus an ATP-like ligand next to chain A.
    pub(crate) const DIMER_PDB: &str = include_str!("../../test-data/dimer.pdb");

    pub(crate) fn write_gz(path: &Path, text: &str) {
        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_parse_plain_and_gzipped() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("dimer.pdb");
        let gz = dir.path().join("dimer.ent.gz");
        std::fs::write(&plain, DIMER_PDB).unwrap();
        write_gz(&gz, DIMER_PDB);

        let from_plain = PdbtbxParser.parse(&plain).unwrap();
        let from_gz = PdbtbxParser.parse(&gz).unwrap();
        assert_eq!(from_plain.chain_count(), 2);
        assert_eq!(from_plain.atom_count(), from_gz.atom_count());
    }

    #[test]
    fn test_parse_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PdbtbxParser.parse(&dir.path().join("none.ent.gz")).is_err());
    }
}
