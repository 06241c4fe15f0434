//! Chain-group parsing and table output shared by the command line.

use anyhow::{bail, Context, Result};
use polars::prelude::*;
use std::{collections::HashSet, path::Path};

/// Parse the chain groups from the input string.
/// Only checks the first two fields separated by `/`.
/// If one of the groups is unspecified, all remaining chains from `all_chains` are used.
pub fn parse_groups(
    all_chains: &HashSet<String>,
    groups: &str,
) -> Result<(HashSet<String>, HashSet<String>)> {
    let sel_vec: Vec<&str> = groups.split('/').collect();
    if sel_vec.len() < 2 {
        bail!("Invalid chain groups format '{groups}'! Use '/' for all-to-all comparisons.")
    }
    let to_set = |field: &str| -> HashSet<String> {
        field
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    };
    let mut group_a = to_set(sel_vec[0]);
    let mut group_b = to_set(sel_vec[1]);

    // If both groups are empty, perform all-to-all comparisons
    if group_a.is_empty() && group_b.is_empty() {
        return Ok((all_chains.clone(), all_chains.clone()));
    }

    // If one side is empty, use all remaining chains
    if group_a.is_empty() {
        group_a = all_chains.difference(&group_b).cloned().collect();
    } else if group_b.is_empty() {
        group_b = all_chains.difference(&group_a).cloned().collect();
    }

    if group_a.is_empty() || group_b.is_empty() {
        bail!("Empty chain groups in '{groups}'!")
    }
    Ok((group_a, group_b))
}

/// Write a DataFrame to `file_path`, replacing its extension with the one of `file_type`.
pub fn write_df_to_file(df: &mut DataFrame, file_path: &Path, file_type: DataFrameFileType) -> Result<()> {
    let output = file_path.with_extension(file_type.to_string());
    let mut file = std::fs::File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    match file_type {
        DataFrameFileType::Csv => {
            CsvWriter::new(&mut file).finish(df)?;
        }
        DataFrameFileType::Parquet => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
        DataFrameFileType::Json => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::Json)
                .finish(df)?;
        }
        DataFrameFileType::NDJson => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::JsonLines)
                .finish(df)?;
        }
    }
    Ok(())
}

/// File format for writing DataFrames.
#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum DataFrameFileType {
    /// Comma-separated values
    Csv,
    /// Parquet columnar storage
    Parquet,
    /// Standard JSON
    Json,
    /// Newline-delimited JSON
    NDJson,
}

impl std::fmt::Display for DataFrameFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DataFrameFileType::Csv => write!(f, "csv"),
            DataFrameFileType::Parquet => write!(f, "parquet"),
            DataFrameFileType::Json => write!(f, "json"),
            DataFrameFileType::NDJson => write!(f, "ndjson"),
        }
    }
}
