//! Expiration sweep command

use clap::Args;
use serde::Serialize;

use crate::output::{emit, OutputFormat};
use crate::{load_world, Cli};

#[derive(Args)]
pub struct SweepArgs {
    /// Write the swept graph back to the input file
    #[arg(short, long)]
    pub write: bool,
}

#[derive(Serialize)]
struct SweepReport {
    live_edges: usize,
    archived_edges: usize,
}

pub fn run(args: &SweepArgs, cli: &Cli) -> anyhow::Result<()> {
    let mut graph = load_world(cli)?;
    let before = graph.edge_count();
    graph.sweep_expired();

    let report = SweepReport {
        live_edges: graph.edge_count(),
        archived_edges: before - graph.edge_count(),
    };

    if args.write {
        ctxgraph_dot::write_file(&graph, &cli.graph, "world")?;
        tracing::info!("rewrote {}", cli.graph.display());
    }

    let format = OutputFormat::from(cli.format.as_str());
    emit(&report, format, || {
        format!(
            "{} live edge(s), {} archived",
            report.live_edges, report.archived_edges
        )
    });
    Ok(())
}
