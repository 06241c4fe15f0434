use anyhow::{bail, Result};
use clap::Parser;
use interfacemap::{CancelToken, ChainExt, PipelineContext, SourceKind};
use tracing::{error, info, trace};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// Structure identifiers, e.g. PDB codes
    #[arg(required = true)]
    ids: Vec<String>,

    /// Where to retrieve the structures from
    #[arg(short, long, value_enum, default_value_t = SourceKind::RemotePdb)]
    source: SourceKind,

    /// Mirror URL, service URL or local directory of the source.
    /// Defaults to the configured URL for remote sources
    #[arg(short, long)]
    location: Option<String>,
}

/// Resolve the backend location given on the command line or in the settings.
pub(crate) fn location(ctx: &PipelineContext, source: SourceKind, given: &Option<String>) -> Result<String> {
    match given.as_deref().or_else(|| ctx.default_location(source)) {
        Some(location) => Ok(location.to_string()),
        None => bail!("A --location is required for {source} sources"),
    }
}

pub(crate) fn run(args: &Args, ctx: &PipelineContext) -> Result<()> {
    trace!("{args:?}");
    let location = location(ctx, args.source, &args.location)?;
    let source = ctx.source(args.source, &location);
    let cancel = CancelToken::new();

    let mut failed = 0;
    for id in &args.ids {
        let structure = match source.get_structure(id, &cancel) {
            Ok(structure) => structure,
            Err(e) => {
                error!("{e}");
                failed += 1;
                continue;
            }
        };
        info!(
            "Loaded {id} with {} chains and {} atoms",
            structure.chain_count(),
            structure.atom_count()
        );
        println!("Structure: {id}");
        for chain in structure.chains() {
            println!("{}: {}", chain.id(), chain.one_letter_seq());
        }
        println!();
    }

    if failed == args.ids.len() {
        bail!("None of the {} structures could be retrieved", failed);
    }
    Ok(())
}
