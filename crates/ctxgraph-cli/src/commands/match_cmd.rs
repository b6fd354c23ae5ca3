//! Pattern matching command

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::output::{emit, OutputFormat};
use crate::{load_world, Cli};
use ctxgraph_agent::Agent;
use ctxgraph_core::{GraphStore, MatchQuery, MatchedEdge};

#[derive(Args)]
pub struct MatchArgs {
    /// Pattern graphs in DOT format; repeated patterns are answered
    /// from the match cache
    #[arg(required = true)]
    pub patterns: Vec<PathBuf>,

    /// Restrict matching to the pattern's temporal scope
    #[arg(long)]
    pub real_time: bool,

    /// With --real-time, let an expired pattern match archived history
    #[arg(long)]
    pub match_in_past: bool,
}

#[derive(Serialize)]
struct MatchReport {
    pattern: String,
    solutions: Vec<Vec<MatchedEdge>>,
}

pub fn run(args: &MatchArgs, cli: &Cli) -> anyhow::Result<()> {
    let mut world = load_world(cli)?;

    let mut query = MatchQuery::new();
    if args.real_time {
        query = query.real_time();
    }
    if args.match_in_past {
        query = query.match_in_past();
    }

    let mut agent = Agent::new();
    let mut reports = Vec::with_capacity(args.patterns.len());
    for path in &args.patterns {
        let pattern = ctxgraph_dot::read_file(path)?;
        tracing::debug!(
            edges = pattern.edge_count(),
            "loaded pattern from {}",
            path.display()
        );

        let results = agent.match_context(&mut world, &pattern, &query)?;
        reports.push(MatchReport {
            pattern: path.display().to_string(),
            solutions: results.iter().map(solution_edges).collect(),
        });
    }

    let format = OutputFormat::from(cli.format.as_str());
    emit(&reports, format, || {
        reports
            .iter()
            .map(render_plain)
            .collect::<Vec<_>>()
            .join("\n")
    });
    Ok(())
}

fn solution_edges(graph: &GraphStore) -> Vec<MatchedEdge> {
    let mut edges: Vec<MatchedEdge> = graph
        .edges()
        .map(|(_, e)| MatchedEdge {
            label: e.label.clone(),
            source: graph.node_label(e.source).to_string(),
            destination: graph.node_label(e.destination).to_string(),
        })
        .collect();
    edges.sort();
    edges
}

fn render_plain(report: &MatchReport) -> String {
    if report.solutions.is_empty() {
        return format!("{}: no match", report.pattern);
    }
    let body = report
        .solutions
        .iter()
        .enumerate()
        .map(|(i, solution)| {
            let edges = solution
                .iter()
                .map(|e| format!("  {} -> {} [{}]", e.source, e.destination, e.label))
                .collect::<Vec<_>>()
                .join("\n");
            format!("solution {} ({} edges):\n{}", i + 1, solution.len(), edges)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}:\n{}", report.pattern, body)
}
