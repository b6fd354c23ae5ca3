//! Ctxgraph CLI - query and transform DOT-format context graphs

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod output;

use commands::{info, match_cmd, paths, sample, sweep};

#[derive(Parser)]
#[command(name = "ctxgraph")]
#[command(author, version, about = "Temporal context graph engine with pattern matching")]
pub struct Cli {
    /// World graph in DOT format
    #[arg(short, long, global = true, default_value = "graph.dot")]
    pub graph: PathBuf,

    /// Output format: plain, json
    #[arg(short, long, default_value = "plain", global = true)]
    pub format: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enumerate paths between two nodes
    Paths(paths::PathsArgs),
    /// Match a pattern graph against the world graph
    Match(match_cmd::MatchArgs),
    /// Sample a random subgraph for use as a pattern
    Sample(sample::SampleArgs),
    /// Drop expired edges into the archive
    Sweep(sweep::SweepArgs),
    /// Show summary information about the graph
    Info,
}

/// Load the world graph named by `--graph`.
pub fn load_world(cli: &Cli) -> anyhow::Result<ctxgraph_core::GraphStore> {
    let graph = ctxgraph_dot::read_file(&cli.graph)?;
    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "loaded world graph from {}",
        cli.graph.display()
    );
    Ok(graph)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Logs go to stderr; stdout carries only command output.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting ctxgraph CLI");

    match &cli.command {
        Commands::Paths(args) => paths::run(args, &cli)?,
        Commands::Match(args) => match_cmd::run(args, &cli)?,
        Commands::Sample(args) => sample::run(args, &cli)?,
        Commands::Sweep(args) => sweep::run(args, &cli)?,
        Commands::Info => info::run(&cli)?,
    }

    Ok(())
}
