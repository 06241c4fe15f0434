//! Pipeline settings, read from and written to TOML files.

use crate::error::ConfigError;
use crate::interface::eppic::EppicPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default RCSB mirror following the `divided/pdb` directory layout.
pub const DEFAULT_PDB_MIRROR: &str = "https://files.wwpdb.org/pub/pdb";
/// Default Interactome3D web service.
pub const DEFAULT_INTERACTOME3D_URL: &str = "https://interactome3d.irbbarcelona.org/api";

/// All tunables of the pipeline. Every section has defaults so partial files are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Where structure files are kept
    pub cache: CacheSettings,
    /// Remote services and the retry discipline
    pub remote: RemoteSettings,
    /// Default contact geometry
    pub geometry: GeometrySettings,
    /// Thresholds applied to EPPIC evidence
    pub eppic: EppicPolicy,
}

/// On-disk structure cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// Directory holding `<id>.ent.gz` files
    pub directory: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: std::env::temp_dir().join("interfacemap").join("structures"),
        }
    }
}

/// Remote structure services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteSettings {
    /// Base URL of a wwPDB mirror
    pub pdb_mirror: String,
    /// Base URL of the Interactome3D web service
    pub interactome3d_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Total attempts for a transient failure, the first one included
    pub max_attempts: u32,
    /// Fixed delay between attempts in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            pdb_mirror: DEFAULT_PDB_MIRROR.to_string(),
            interactome3d_url: DEFAULT_INTERACTOME3D_URL.to_string(),
            timeout_secs: 120,
            max_attempts: 2,
            retry_delay_ms: 5000,
        }
    }
}

impl RemoteSettings {
    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay between two attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Parameters of the default contact geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeometrySettings {
    /// Probe radius r (smaller r detects more surface details and reports a larger surface)
    pub probe_radius: f32,
    /// Number of points on the sphere for sampling
    pub n_points: usize,
    /// Minimum loss of accessible surface (Å²) for a residue to count as buried by the partner
    pub min_buried_area: f32,
    /// Heavy-atom distance (Å) for a residue to be in contact with a ligand
    pub ligand_cutoff: f64,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            probe_radius: 1.4,
            n_points: 100,
            min_buried_area: 1.0,
            ligand_cutoff: 4.0,
        }
    }
}

/// Read settings from a TOML file.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

/// Write settings to a TOML file.
pub fn save_settings<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(settings)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_file() {
        let settings: Settings = toml::from_str(
            r#"
            [remote]
            max_attempts = 4

            [eppic]
            core_only = 0.9
            "#,
        )
        .unwrap();

        assert_eq!(settings.remote.max_attempts, 4);
        assert_eq!(settings.remote.pdb_mirror, DEFAULT_PDB_MIRROR);
        assert_eq!(settings.eppic.core_only, 0.9);
        assert_eq!(settings.eppic.core_or_rim, 0.70);
        assert_eq!(settings.geometry, GeometrySettings::default());
    }

    #[test]
    fn test_settings_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.cache.directory = dir.path().join("cache");
        settings.geometry.ligand_cutoff = 4.5;
        save_settings(&path, &settings).unwrap();

        assert_eq!(load_settings(&path).unwrap(), settings);
    }
}
