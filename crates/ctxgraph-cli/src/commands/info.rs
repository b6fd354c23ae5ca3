//! Graph summary command

use serde::Serialize;

use crate::output::{emit, OutputFormat};
use crate::{load_world, Cli};

#[derive(Serialize)]
struct InfoReport {
    nodes: usize,
    edges: usize,
    components: usize,
    fingerprint: String,
}

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let graph = load_world(cli)?;
    let report = InfoReport {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        components: graph.connected_components().len(),
        fingerprint: graph.edge_text_representation(),
    };

    let format = OutputFormat::from(cli.format.as_str());
    emit(&report, format, || {
        format!(
            "{} node(s), {} edge(s), {} component(s)\nfingerprint: {}",
            report.nodes, report.edges, report.components, report.fingerprint
        )
    });
    Ok(())
}
