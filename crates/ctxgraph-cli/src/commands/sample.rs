//! Random subgraph sampling command

use std::path::PathBuf;

use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::{load_world, Cli};
use ctxgraph_core::SampleOptions;

#[derive(Args)]
pub struct SampleArgs {
    /// Percentage of world nodes to sample
    #[arg(short, long, default_value = "50")]
    pub nodes: u32,

    /// Percentage of available edges among sampled nodes to keep
    #[arg(short, long, default_value = "100")]
    pub edges: u32,

    /// Percentage of sampled nodes to anonymize into unknowns
    #[arg(short, long, default_value = "0")]
    pub unknowns: u32,

    /// Labels that must be part of the sample (comma-separated)
    #[arg(short, long)]
    pub mandatory: Option<String>,

    /// RNG seed for reproducible samples
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the sampled graph here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &SampleArgs, cli: &Cli) -> anyhow::Result<()> {
    let world = load_world(cli)?;

    let mut options = SampleOptions::new(args.nodes, args.edges).unknown_percent(args.unknowns);
    if let Some(mandatory) = &args.mandatory {
        for label in mandatory.split(',').filter(|l| !l.is_empty()) {
            options = options.mandatory_node(label.trim());
        }
    }

    let subgraph = match args.seed {
        Some(seed) => {
            world.generate_random_subgraph_with(&options, &mut StdRng::seed_from_u64(seed))?
        }
        None => world.generate_random_subgraph(&options)?,
    };

    let dot = ctxgraph_dot::to_dot(&subgraph, "sample");
    match &args.output {
        Some(path) => {
            std::fs::write(path, dot)?;
            tracing::info!("wrote sample to {}", path.display());
        }
        None => println!("{dot}"),
    }
    Ok(())
}
