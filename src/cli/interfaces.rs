use anyhow::{Context, Result};
use clap::Parser;
use interfacemap::{
    parse_groups, write_df_to_file, CancelToken, DataFrameFileType, PipelineContext,
    ResidueAtInterface, SourceKind,
};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, trace, warn};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// Structure identifier
    id: String,

    /// Where to retrieve the structure from
    #[arg(short, long, value_enum, default_value_t = SourceKind::RemotePdb)]
    source: SourceKind,

    /// Mirror URL, service URL or local directory of the source.
    /// Defaults to the configured URL for remote sources
    #[arg(short, long)]
    location: Option<String>,

    /// Group chains for interfaces:
    /// e.g. A,B/C,D
    /// where residues of chains A and B facing chains C and D are reported, and vice versa.
    /// If only one group is provided, all remaining chains will be considered as the other group.
    #[arg(short, long, default_value_t = String::from("/"))]
    groups: String,

    /// Report residues of the first group in contact with this ligand instead
    #[arg(long)]
    ligand: Option<String>,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Name of the output file
    #[arg(short = 'f', long = "filename", default_value_t = String::from("interfaces"))]
    filename: String,

    /// Output file type
    #[arg(short = 't', long, default_value_t = DataFrameFileType::Csv)]
    output_format: DataFrameFileType,
}

fn residues_to_df(residues: &[ResidueAtInterface], partner: impl Fn(&ResidueAtInterface) -> String) -> Result<DataFrame> {
    Ok(df!(
        "structure" => residues.iter().map(|r| r.structure_id.to_owned()).collect::<Vec<String>>(),
        "chain" => residues.iter().map(|r| r.chain.to_owned()).collect::<Vec<String>>(),
        "position" => residues.iter().map(|r| r.position.to_owned()).collect::<Vec<String>>(),
        "partner" => residues.iter().map(partner).collect::<Vec<String>>(),
    )?)
}

pub(crate) fn run(args: &Args, ctx: &PipelineContext) -> Result<()> {
    trace!("{args:?}");
    let location = super::fetch::location(ctx, args.source, &args.location)?;
    let resolver = ctx.resolver(args.source, &location);
    let cancel = CancelToken::new();

    let structure = resolver
        .source()
        .get_structure(&args.id, &cancel)
        .with_context(|| format!("Failed to load {}", args.id))?;
    let all_chains = structure
        .chains()
        .map(|c| c.id().to_string())
        .collect::<HashSet<String>>();
    let (group_a, group_b) = parse_groups(&all_chains, &args.groups)?;
    let mut group_a = group_a.into_iter().collect::<Vec<String>>();
    let mut group_b = group_b.into_iter().collect::<Vec<String>>();
    group_a.sort();
    group_b.sort();
    debug!("Chain groups {group_a:?} and {group_b:?}");

    let mut df = match &args.ligand {
        Some(ligand) => {
            let residues = resolver.get_ligand_contacts(&args.id, &group_a, ligand, &cancel);
            info!("Found {} residues in contact with {ligand}", residues.len());
            residues_to_df(&residues, |_| ligand.clone())?
        }
        None => {
            let residues = resolver.get_contacts(&args.id, &group_a, &group_b, &cancel);
            info!("Found {} interface residues", residues.len());
            // Report the other group as partner of each residue
            residues_to_df(&residues, |r| {
                let other = if group_a.contains(&r.chain) { &group_b } else { &group_a };
                other.join(",")
            })?
        }
    };
    if df.height() == 0 {
        warn!("No interface residues found in {}", args.id);
    }

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let output_file = args.output.join(&args.filename);
    write_df_to_file(&mut df, &output_file, args.output_format)?;
    info!(
        "Results saved to {}",
        output_file.with_extension(args.output_format.to_string()).display()
    );
    Ok(())
}
