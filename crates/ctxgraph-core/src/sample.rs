//! Random subgraph extraction
//!
//! Builds small connected subgraphs of a world graph, for use as match
//! patterns: grow a node set along the neighbour frontier, connect it with
//! a random spanning tree, top the tree up with extra edges, and finally
//! anonymize a share of the nodes into unknowns.

use crate::edge::EdgeId;
use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::store::GraphStore;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

/// Parameters for [`GraphStore::generate_random_subgraph`]. Percentages
/// are relative to the world graph's node count and to the edge count
/// available within the chosen node subset, respectively.
#[derive(Debug, Clone, Default)]
pub struct SampleOptions {
    node_percent: u32,
    edge_percent: u32,
    unknown_percent: u32,
    mandatory_nodes: BTreeSet<String>,
}

impl SampleOptions {
    pub fn new(node_percent: u32, edge_percent: u32) -> Self {
        Self {
            node_percent,
            edge_percent,
            unknown_percent: 0,
            mandatory_nodes: BTreeSet::new(),
        }
    }

    /// Relabel this share of the sampled nodes to `?0`, `?1`, ...
    pub fn unknown_percent(mut self, percent: u32) -> Self {
        self.unknown_percent = percent;
        self
    }

    /// Force these labels into the sample before random growth.
    pub fn mandatory_node(mut self, label: &str) -> Self {
        self.mandatory_nodes.insert(label.to_string());
        self
    }
}

impl GraphStore {
    /// Sample a connected random subgraph; see [`SampleOptions`].
    pub fn generate_random_subgraph(&self, options: &SampleOptions) -> Result<GraphStore> {
        self.generate_random_subgraph_with(options, &mut rand::thread_rng())
    }

    pub fn generate_random_subgraph_with<R: Rng>(
        &self,
        options: &SampleOptions,
        rng: &mut R,
    ) -> Result<GraphStore> {
        if self.node_count() == 0 {
            return Err(Error::EmptyGraph("cannot sample an empty graph".into()));
        }

        let chosen = self.grow_node_set(options, rng)?;
        let mut pool = self.edges_within(&chosen);
        let expected_edges = options.edge_percent as usize * pool.len() / 100;

        let mut picked = self.random_spanning_tree(&chosen, rng);
        let tree: BTreeSet<EdgeId> = picked.iter().copied().collect();
        pool.retain(|id| !tree.contains(id));

        // Top the tree up with extra edges among the chosen nodes.
        while picked.len() < expected_edges && !pool.is_empty() {
            let index = rng.gen_range(0..pool.len());
            picked.push(pool.swap_remove(index));
        }

        let mut subgraph = GraphStore::new();
        for id in picked {
            let Some(edge) = self.edge(id) else {
                continue;
            };
            let (label, source, destination) = (
                edge.label.clone(),
                self.node_label(edge.source).to_string(),
                self.node_label(edge.destination).to_string(),
            );
            subgraph.add_edge(&label, &source, &destination);
        }

        subgraph.convert_nodes_to_unknown_with(options.unknown_percent, rng);
        Ok(subgraph)
    }

    /// Relabel a random share of the live nodes to `?0`, `?1`, ...
    pub fn convert_nodes_to_unknown(&mut self, percent: u32) {
        self.convert_nodes_to_unknown_with(percent, &mut rand::thread_rng());
    }

    pub fn convert_nodes_to_unknown_with<R: Rng>(&mut self, percent: u32, rng: &mut R) {
        let total = self.node_count();
        let count = percent as usize * total / 100;
        let mut labels: Vec<String> = self
            .nodes()
            .map(|(_, node)| node.label.clone())
            .collect();
        labels.shuffle(rng);
        for (i, label) in labels.iter().take(count).enumerate() {
            self.replace_node(label, &format!("?{i}"));
        }
    }

    fn grow_node_set<R: Rng>(
        &self,
        options: &SampleOptions,
        rng: &mut R,
    ) -> Result<Vec<NodeId>> {
        let expected = options.node_percent as usize * self.node_count() / 100;
        let mut mandatory = options.mandatory_nodes.iter();

        let root = match mandatory.next() {
            Some(label) => self
                .resolve(label)
                .ok_or_else(|| Error::NodeNotFound(label.clone()))?,
            None => {
                let all: Vec<NodeId> = self.nodes().map(|(id, _)| id).collect();
                all[rng.gen_range(0..all.len())]
            }
        };

        let mut chosen = vec![root];
        let mut frontier: BTreeSet<NodeId> = self.all_neighbours(root);

        while chosen.len() < expected {
            let next = match mandatory.next() {
                Some(label) => self
                    .resolve(label)
                    .ok_or_else(|| Error::NodeNotFound(label.clone()))?,
                None => {
                    let candidates: Vec<NodeId> = frontier
                        .iter()
                        .copied()
                        .filter(|id| !chosen.contains(id))
                        .collect();
                    let Some(picked) = candidates.choose(rng).copied() else {
                        break;
                    };
                    picked
                }
            };
            frontier.remove(&next);
            if chosen.contains(&next) {
                continue;
            }
            chosen.push(next);
            frontier.extend(self.neighbours(next, &[] as &[NodeId], &chosen));
        }
        Ok(chosen)
    }

    /// All edges whose endpoints both lie in `nodes`, either direction.
    fn edges_within(&self, nodes: &[NodeId]) -> Vec<EdgeId> {
        let mut out = Vec::new();
        for &n1 in nodes {
            for &n2 in nodes {
                out.extend_from_slice(self.edges_between(n1, n2));
            }
        }
        out
    }

    /// Random spanning tree over `nodes` via randomized depth-first
    /// search: at each step a uniformly random unvisited neighbour, then a
    /// uniformly random edge among those connecting the pair either way.
    fn random_spanning_tree<R: Rng>(&self, nodes: &[NodeId], rng: &mut R) -> Vec<EdgeId> {
        let mut tree = Vec::new();
        if nodes.is_empty() {
            return tree;
        }
        let root = nodes[rng.gen_range(0..nodes.len())];
        let mut visited: BTreeSet<NodeId> = BTreeSet::from([root]);
        self.spanning_dfs(root, nodes, rng, &mut visited, &mut tree);
        tree
    }

    fn spanning_dfs<R: Rng>(
        &self,
        current: NodeId,
        nodes: &[NodeId],
        rng: &mut R,
        visited: &mut BTreeSet<NodeId>,
        tree: &mut Vec<EdgeId>,
    ) {
        let mut neighbours: Vec<NodeId> =
            self.neighbours(current, nodes, visited).into_iter().collect();
        while !neighbours.is_empty() {
            let index = rng.gen_range(0..neighbours.len());
            let next = neighbours.swap_remove(index);
            if visited.contains(&next) {
                continue;
            }

            let mut connecting: Vec<EdgeId> = Vec::new();
            connecting.extend_from_slice(self.edges_between(current, next));
            connecting.extend_from_slice(self.edges_between(next, current));
            let Some(edge) = connecting.choose(rng).copied() else {
                continue;
            };
            tree.push(edge);
            visited.insert(next);
            self.spanning_dfs(next, nodes, rng, visited, tree);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ring(n: u32) -> GraphStore {
        let mut cg = GraphStore::new();
        for i in 0..n {
            let label = format!("n{i}");
            let next = format!("n{}", (i + 1) % n);
            cg.add_edge(&format!("e{i}"), &label, &next);
        }
        cg
    }

    #[test]
    fn test_sampling_empty_graph_fails() {
        let cg = GraphStore::new();
        let mut rng = StdRng::seed_from_u64(7);
        let err = cg.generate_random_subgraph_with(&SampleOptions::new(50, 100), &mut rng);
        assert!(matches!(err, Err(Error::EmptyGraph(_))));
    }

    #[test]
    fn test_missing_mandatory_node_fails() {
        let cg = ring(6);
        let mut rng = StdRng::seed_from_u64(7);
        let options = SampleOptions::new(50, 100).mandatory_node("ghost");
        assert!(matches!(
            cg.generate_random_subgraph_with(&options, &mut rng),
            Err(Error::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_subgraph_nodes_and_edges_come_from_world() {
        let cg = ring(10);
        let mut rng = StdRng::seed_from_u64(42);
        let sub = cg
            .generate_random_subgraph_with(&SampleOptions::new(50, 100), &mut rng)
            .unwrap();

        assert!(sub.node_count() <= 5 + 1);
        for (_, edge) in sub.edges() {
            let source = sub.node_label(edge.source);
            let destination = sub.node_label(edge.destination);
            assert!(cg.find_edge(&edge.label, source, destination).is_some());
        }
    }

    #[test]
    fn test_subgraph_is_connected() {
        let cg = ring(12);
        let mut rng = StdRng::seed_from_u64(3);
        let sub = cg
            .generate_random_subgraph_with(&SampleOptions::new(50, 100), &mut rng)
            .unwrap();

        assert!(!sub.is_empty());
        assert_eq!(sub.connected_components().len(), 1);
    }

    #[test]
    fn test_mandatory_node_is_included() {
        let cg = ring(10);
        let mut rng = StdRng::seed_from_u64(11);
        let options = SampleOptions::new(40, 100).mandatory_node("n3");
        let sub = cg.generate_random_subgraph_with(&options, &mut rng).unwrap();

        assert!(sub.resolve("n3").is_some());
    }

    #[test]
    fn test_unknown_relabeling() {
        let mut cg = ring(10);
        let mut rng = StdRng::seed_from_u64(5);
        cg.convert_nodes_to_unknown_with(50, &mut rng);

        let unknowns = cg.nodes().filter(|(_, n)| n.is_unknown()).count();
        assert_eq!(unknowns, 5);
        assert!(cg.resolve("?0").is_some());
        assert_eq!(cg.edge_count(), 10);
    }

    #[test]
    fn test_sampled_pattern_matches_its_world() {
        let cg = ring(8);
        let mut rng = StdRng::seed_from_u64(21);
        let options = SampleOptions::new(50, 100).unknown_percent(50);
        let pattern = cg.generate_random_subgraph_with(&options, &mut rng).unwrap();

        let mut world = cg.clone();
        let matches = world
            .maximum_match(&pattern, &crate::MatchQuery::new())
            .unwrap();
        let best = matches.iter().next().unwrap();
        assert_eq!(best.len(), pattern.edge_count());
    }
}
