use anyhow::{bail, Result};
use clap::Parser;
use interfacemap::{SequenceAligner, DEFAULT_GAP_COST};
use tracing::trace;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// Query sequence, e.g. an isoform fragment
    query: String,

    /// Target sequence, e.g. the sequence observed in a structure chain
    target: String,

    /// Linear gap cost
    #[arg(short, long, default_value_t = DEFAULT_GAP_COST)]
    gap_cost: i32,
}

pub(crate) fn run(args: &Args) -> Result<()> {
    trace!("{args:?}");
    if args.gap_cost < 0 {
        bail!("The gap cost must not be negative");
    }

    let alignment = SequenceAligner::new(args.gap_cost).align(&args.query, &args.target);
    if alignment.is_empty() {
        println!("No local alignment with a positive score");
        return Ok(());
    }

    println!("Score: {}", alignment.score);
    println!(
        "Query:  {}-{}  {}",
        alignment.query_start + 1,
        alignment.query_end,
        alignment.aligned_query
    );
    println!(
        "Target: {}-{}  {}",
        alignment.target_start + 1,
        alignment.target_end,
        alignment.aligned_target
    );
    println!("Identity: {:.1}%", alignment.identity() * 100.0);
    Ok(())
}
