//! Path enumeration commands

use clap::Args;
use serde::Serialize;

use crate::output::{emit, OutputFormat};
use crate::{load_world, Cli};

#[derive(Args)]
pub struct PathsArgs {
    /// Source node label
    pub source: String,

    /// Destination node label
    pub destination: String,

    /// Regex the concatenated edge labels must match; restricts the
    /// output to matching edge sequences
    #[arg(short, long)]
    pub regex: Option<String>,

    /// With --regex, print only the first (longest-candidate) match
    #[arg(long)]
    pub best: bool,
}

#[derive(Serialize)]
struct PathReport {
    paths: Vec<Vec<String>>,
}

pub fn run(args: &PathsArgs, cli: &Cli) -> anyhow::Result<()> {
    let mut graph = load_world(cli)?;
    let format = OutputFormat::from(cli.format.as_str());

    match &args.regex {
        None => {
            let found = graph.find_paths(&args.source, &args.destination);
            let paths: Vec<Vec<String>> = found
                .iter()
                .map(|p| p.iter().map(|n| graph.node_label(*n).to_string()).collect())
                .collect();
            emit(&PathReport { paths: paths.clone() }, format, || {
                if paths.is_empty() {
                    format!("no path from {} to {}", args.source, args.destination)
                } else {
                    paths
                        .iter()
                        .map(|p| p.join(" -> "))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            });
        }
        Some(regex) => {
            let (Some(src), Some(dst)) = (
                graph.resolve(&args.source),
                graph.resolve(&args.destination),
            ) else {
                anyhow::bail!("unknown node: {} or {}", args.source, args.destination);
            };
            let combos: Vec<Vec<ctxgraph_core::EdgeId>> = if args.best {
                graph
                    .find_best_path_matching_regex(regex, src, dst)?
                    .into_iter()
                    .collect()
            } else {
                graph
                    .find_all_paths_matching_regex(regex, src, dst)?
                    .into_iter()
                    .collect()
            };
            let paths: Vec<Vec<String>> = combos
                .iter()
                .map(|combo| {
                    combo
                        .iter()
                        .filter_map(|id| graph.edge(*id))
                        .map(|e| e.label.clone())
                        .collect()
                })
                .collect();
            emit(&PathReport { paths: paths.clone() }, format, || {
                if paths.is_empty() {
                    format!("no path matching /{regex}/")
                } else {
                    paths
                        .iter()
                        .map(|labels| labels.join(" "))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            });
        }
    }
    Ok(())
}
