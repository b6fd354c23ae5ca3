//! Path enumeration and regex-constrained path search
//!
//! Walks are cycle-safe per edge, not per node: a walk may revisit a node
//! but never traverses the same edge twice, so loops contribute exactly one
//! extra pass. Discovered paths are cached per endpoint pair and spliced
//! into later walks without recursion.

use crate::edge::EdgeId;
use crate::error::Result;
use crate::node::NodeId;
use crate::store::{compile_anchored, GraphStore};
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Cache of discovered node sequences keyed by `(source, destination)`.
#[derive(Debug, Clone, Default)]
pub struct PathCache {
    map: HashMap<(NodeId, NodeId), BTreeSet<Vec<NodeId>>>,
}

impl PathCache {
    pub fn get(&self, source: NodeId, destination: NodeId) -> Option<&BTreeSet<Vec<NodeId>>> {
        self.map.get(&(source, destination))
    }

    /// Replace the whole entry for an endpoint pair.
    pub fn store_all(&mut self, source: NodeId, destination: NodeId, paths: BTreeSet<Vec<NodeId>>) {
        self.map.insert((source, destination), paths);
    }

    /// Insert one path; returns true when it was not cached before.
    pub fn insert_path(&mut self, source: NodeId, destination: NodeId, path: Vec<NodeId>) -> bool {
        self.map.entry((source, destination)).or_default().insert(path)
    }

    /// Every cached path starting at `source`, regardless of destination.
    pub fn paths_from(&self, source: NodeId) -> Vec<&Vec<NodeId>> {
        self.map
            .iter()
            .filter(|((s, _), _)| *s == source)
            .flat_map(|(_, paths)| paths.iter())
            .collect()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.values().map(BTreeSet::len).sum()
    }
}

/// True when the path repeats its own leading two-node cycle later on;
/// such extensions only re-run a loop already represented by a shorter
/// cached path and would grow the fixpoint forever.
fn repeats_leading_cycle(path: &[NodeId]) -> bool {
    if path.len() < 4 {
        return false;
    }
    (2..path.len() - 1).any(|i| path[i] == path[0] && path[i + 1] == path[1])
}

impl GraphStore {
    /// All node sequences from `source` to `destination`, longest first.
    ///
    /// Returns an empty vector when either endpoint is missing or no walk
    /// connects them; absence is never an error.
    pub fn find_paths(&mut self, source: &str, destination: &str) -> Vec<Vec<NodeId>> {
        let (Some(src), Some(dst)) = (self.resolve(source), self.resolve(destination)) else {
            return Vec::new();
        };
        self.find_paths_between(src, dst)
    }

    pub(crate) fn find_paths_between(&mut self, source: NodeId, destination: NodeId) -> Vec<Vec<NodeId>> {
        let mut found: BTreeSet<Vec<NodeId>> = BTreeSet::new();
        let mut visited: HashSet<EdgeId> = HashSet::new();
        let mut prefix = vec![source];
        self.walk(source, destination, &mut prefix, &mut visited, &mut found);

        tracing::debug!(
            "find_paths {} -> {}: {} path(s)",
            self.node_label(source),
            self.node_label(destination),
            found.len()
        );

        self.path_cache.store_all(source, destination, found.clone());

        let mut out: Vec<Vec<NodeId>> = found.into_iter().collect();
        out.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        out
    }

    fn walk(
        &self,
        current: NodeId,
        target: NodeId,
        prefix: &mut Vec<NodeId>,
        visited: &mut HashSet<EdgeId>,
        found: &mut BTreeSet<Vec<NodeId>>,
    ) {
        // Parallel edges reach the same node sequence once per step.
        let mut seen_destinations: BTreeSet<NodeId> = BTreeSet::new();

        // Splice cached suffixes in without recursing below them.
        if let Some(cached) = self.path_cache.get(current, target) {
            for suffix in cached {
                if suffix.len() < 2 {
                    continue;
                }
                let mut solution = prefix.clone();
                solution.extend_from_slice(&suffix[1..]);
                seen_destinations.insert(suffix[1]);
                found.insert(solution);
            }
        }

        for id in self.children(current) {
            let Some(edge) = self.edges.get(id) else {
                continue;
            };
            let next = edge.destination;
            if !seen_destinations.insert(next) {
                continue;
            }
            if visited.contains(id) {
                continue;
            }

            if next == target {
                let mut solution = prefix.clone();
                solution.push(target);
                found.insert(solution);
            }

            visited.insert(*id);
            prefix.push(next);
            self.walk(next, target, prefix, visited, found);
            prefix.pop();
            visited.remove(id);
        }
    }

    /// Precompute every walk between every reachable pair of nodes.
    ///
    /// Dynamic-programming fixpoint: seed the cache with all direct edges,
    /// then keep prepending direct edges to cached paths of the current
    /// length until a full pass adds nothing new. Cyclic graphs terminate
    /// because extensions repeating their leading cycle are discarded.
    pub fn precompute_roads(&mut self) {
        let pairs: Vec<(NodeId, NodeId)> = self
            .pair_index
            .iter()
            .filter(|(_, edges)| !edges.is_empty())
            .map(|(pair, _)| *pair)
            .collect();

        for (src, dst) in &pairs {
            self.path_cache.insert_path(*src, *dst, vec![*src, *dst]);
        }

        let mut current_len = 2;
        let mut added = true;
        while added {
            added = false;
            for (src, dst) in &pairs {
                let extensions: Vec<Vec<NodeId>> = self
                    .path_cache
                    .paths_from(*dst)
                    .into_iter()
                    .filter(|p| p.len() == current_len && (src != dst || *dst != p[1]))
                    .map(|p| {
                        let mut extended = Vec::with_capacity(p.len() + 1);
                        extended.push(*src);
                        extended.extend_from_slice(p);
                        extended
                    })
                    .filter(|p| !repeats_leading_cycle(p))
                    .collect();

                for path in extensions {
                    let last = *path.last().unwrap_or(dst);
                    if self.path_cache.insert_path(*src, last, path) {
                        added = true;
                    }
                }
            }
            current_len += 1;
        }

        tracing::debug!("precompute_roads cached {} path(s)", self.path_cache.len());
    }

    /// The single best (longest-candidate-first) edge sequence between two
    /// nodes whose concatenated labels fully match `pattern`, or `None`.
    ///
    /// Hits and misses are both cached by `(pattern, source, destination)`;
    /// the cache lives until the next topology mutation.
    pub fn find_best_path_matching_regex(
        &mut self,
        pattern: &str,
        source: NodeId,
        destination: NodeId,
    ) -> Result<Option<Vec<EdgeId>>> {
        let key = (pattern.to_string(), source, destination);
        if let Some(cached) = self.regex_cache.get(&key) {
            return Ok(if cached.is_empty() {
                None
            } else {
                Some(cached.clone())
            });
        }

        let re = compile_anchored(pattern)?;
        let roads = self.find_paths_between(source, destination);

        let mut solution: Vec<EdgeId> = Vec::new();
        for road in &roads {
            let mut stack = Vec::new();
            if self.match_road_first(&re, road, 1, "", &mut stack) {
                solution = stack;
                break;
            }
        }

        self.regex_cache.insert(key, solution.clone());
        Ok(if solution.is_empty() {
            None
        } else {
            Some(solution)
        })
    }

    /// Every edge combination over every candidate walk whose concatenated
    /// labels fully match `pattern`.
    pub fn find_all_paths_matching_regex(
        &mut self,
        pattern: &str,
        source: NodeId,
        destination: NodeId,
    ) -> Result<BTreeSet<Vec<EdgeId>>> {
        let re = compile_anchored(pattern)?;
        let roads = self.find_paths_between(source, destination);

        let mut solutions = BTreeSet::new();
        for road in &roads {
            let mut stack = Vec::new();
            self.match_road_all(&re, road, 1, "", &mut stack, &mut solutions);
        }
        Ok(solutions)
    }

    /// Backtrack over the parallel edges of each hop; stop at the first
    /// fully matching combination. On success `stack` holds the edges.
    fn match_road_first(
        &self,
        re: &Regex,
        road: &[NodeId],
        hop: usize,
        partial: &str,
        stack: &mut Vec<EdgeId>,
    ) -> bool {
        if hop == road.len() {
            return re.is_match(partial);
        }
        for id in self.edges_between(road[hop - 1], road[hop]) {
            let Some(edge) = self.edges.get(id) else {
                continue;
            };
            let mut labels = partial.to_string();
            labels.push_str(&edge.label);
            stack.push(*id);
            if self.match_road_first(re, road, hop + 1, &labels, stack) {
                return true;
            }
            stack.pop();
        }
        false
    }

    fn match_road_all(
        &self,
        re: &Regex,
        road: &[NodeId],
        hop: usize,
        partial: &str,
        stack: &mut Vec<EdgeId>,
        solutions: &mut BTreeSet<Vec<EdgeId>>,
    ) {
        if hop == road.len() {
            if re.is_match(partial) {
                solutions.insert(stack.clone());
            }
            return;
        }
        for id in self.edges_between(road[hop - 1], road[hop]) {
            let Some(edge) = self.edges.get(id) else {
                continue;
            };
            let mut labels = partial.to_string();
            labels.push_str(&edge.label);
            stack.push(*id);
            self.match_road_all(re, road, hop + 1, &labels, stack, solutions);
            stack.pop();
        }
    }
}
