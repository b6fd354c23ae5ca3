//! The graph store: node arena, edge table, adjacency indices
//!
//! Nodes live in an arena and are addressed by [`NodeId`]; edges hold ids,
//! never references, so transient match state and relabeling cannot alias
//! into the store (see the consistency module for removal and relabeling).

use crate::contains::Contains;
use crate::edge::{never_expires, Edge, EdgeId, ValidityWindow};
use crate::error::Result;
use crate::node::{Node, NodeId, NodeKind};
use crate::paths::PathCache;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// An expired edge preserved for historical ("match in the past") queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedEdge {
    pub label: String,
    pub source: String,
    pub destination: String,
    pub window: ValidityWindow,
}

/// In-memory, temporally-aware labeled multigraph.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    pub(crate) nodes: Vec<Node>,
    pub(crate) node_ids: BTreeMap<String, NodeId>,
    pub(crate) edges: BTreeMap<EdgeId, Edge>,
    next_edge: u32,
    pub(crate) outgoing: HashMap<NodeId, Vec<EdgeId>>,
    pub(crate) incoming: HashMap<NodeId, Vec<EdgeId>>,
    pub(crate) pair_index: HashMap<(NodeId, NodeId), Vec<EdgeId>>,
    pub(crate) label_index: HashMap<String, Vec<EdgeId>>,
    pub(crate) archive: Vec<ArchivedEdge>,
    pub(crate) path_cache: PathCache,
    pub(crate) regex_cache: HashMap<(String, NodeId, NodeId), Vec<EdgeId>>,
    valid_until: Option<DateTime<Utc>>,
    window: Option<ValidityWindow>,
    allow_duplicates: Option<bool>,
    fixed_expiry: bool,
    fixed_window: bool,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────

    /// Allow two live edges with the same `(label, source, destination)`.
    /// Defaults to true; with duplicates disallowed, re-adding a triple
    /// merges into the existing edge as an extra expiration timestamp.
    pub fn allow_duplicate_edges(&mut self, allow: bool) {
        self.allow_duplicates = Some(allow);
    }

    /// Pin the store-level expiry instead of deriving it from edges.
    pub fn set_forced_expiry(&mut self, expire_at: DateTime<Utc>, fixed: bool) {
        self.valid_until = Some(expire_at);
        self.fixed_expiry = fixed;
    }

    /// Pin the store-level validity window instead of intersecting edges.
    pub fn set_forced_window(&mut self, window: ValidityWindow, fixed: bool) {
        self.window = Some(window);
        self.fixed_window = fixed;
    }

    /// Earliest of the live edges' latest expirations (unless pinned).
    pub fn valid_until(&self) -> DateTime<Utc> {
        self.valid_until.unwrap_or_else(never_expires)
    }

    /// Intersection of the live edges' validity windows (unless pinned).
    pub fn validity_window(&self) -> ValidityWindow {
        self.window.unwrap_or_default()
    }

    fn duplicates_allowed(&self) -> bool {
        self.allow_duplicates.unwrap_or(true)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Insertion
    // ─────────────────────────────────────────────────────────────────────

    /// Look up or create the arena node for `label`.
    pub fn intern_node(&mut self, label: &str) -> NodeId {
        if let Some(id) = self.node_ids.get(label) {
            return *id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(label));
        self.node_ids.insert(label.to_string(), id);
        id
    }

    /// Insert a never-expiring, permanently valid edge.
    pub fn add_edge(&mut self, label: &str, source: &str, destination: &str) -> EdgeId {
        self.add_edge_timed(
            label,
            source,
            destination,
            never_expires(),
            ValidityWindow::permanent(),
        )
    }

    /// Insert an edge with an expiration timestamp and a validity window.
    ///
    /// Endpoints are interned by label. A duplicate triple is merged into
    /// the existing edge when duplicates are disallowed. Store-level expiry
    /// and window are folded unless pinned.
    pub fn add_edge_timed(
        &mut self,
        label: &str,
        source: &str,
        destination: &str,
        expire_at: DateTime<Utc>,
        window: ValidityWindow,
    ) -> EdgeId {
        let src = self.intern_node(source);
        let dst = self.intern_node(destination);

        if !self.fixed_expiry && expire_at < self.valid_until() {
            self.valid_until = Some(expire_at);
        }
        if !self.fixed_window {
            let mut merged = self.validity_window();
            merged.restrict(&window);
            self.window = Some(merged);
        }

        if !self.duplicates_allowed() {
            if let Some(existing) = self.find_edge(label, source, destination) {
                if let Some(edge) = self.edges.get_mut(&existing) {
                    edge.add_expiration(expire_at);
                }
                return existing;
            }
        }

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        let edge = Edge::new(label, src, dst, expire_at, window);
        self.outgoing.entry(src).or_default().push(id);
        self.incoming.entry(dst).or_default().push(id);
        self.pair_index.entry((src, dst)).or_default().push(id);
        self.label_index
            .entry(label.to_string())
            .or_default()
            .push(id);
        self.edges.insert(id, edge);
        self.invalidate_caches();
        id
    }

    /// Turn an existing node into a regex pattern node.
    pub fn mark_node_regex(&mut self, label: &str) -> bool {
        match self.node_ids.get(label) {
            Some(id) => {
                self.nodes[id.index()].kind = NodeKind::RegexPattern;
                true
            }
            None => false,
        }
    }

    /// Add one more expiration timestamp to a live edge.
    pub fn edge_add_expiration(&mut self, id: EdgeId, expire_at: DateTime<Utc>) -> bool {
        match self.edges.get_mut(&id) {
            Some(edge) => {
                edge.add_expiration(expire_at);
                true
            }
            None => false,
        }
    }

    /// Flag an edge's label as a regex over concatenated path labels.
    pub fn mark_edge_regex(&mut self, id: EdgeId) -> bool {
        match self.edges.get_mut(&id) {
            Some(edge) => {
                edge.regex_label = true;
                true
            }
            None => false,
        }
    }

    /// Drop every path and regex-path cache entry. Called by every
    /// topology-mutating operation; staleness is a correctness bug, not a
    /// performance tradeoff.
    pub(crate) fn invalidate_caches(&mut self) {
        self.path_cache.clear();
        self.regex_cache.clear();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────

    pub fn resolve(&self, label: &str) -> Option<NodeId> {
        self.node_ids.get(label).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_label(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].label
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.node_ids.is_empty()
    }

    /// Iterate live nodes in label order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.node_ids.values().map(|id| (*id, &self.nodes[id.index()]))
    }

    /// Iterate live edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().map(|(id, e)| (*id, e))
    }

    /// True iff at least one edge runs `n1 -> n2`.
    pub fn is_adjacent(&self, n1: NodeId, n2: NodeId) -> bool {
        self.pair_index
            .get(&(n1, n2))
            .is_some_and(|edges| !edges.is_empty())
    }

    /// Every edge `n1 -> n2`, parallel edges included.
    pub fn edges_between(&self, n1: NodeId, n2: NodeId) -> &[EdgeId] {
        self.pair_index
            .get(&(n1, n2))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edges_by_label(&self, label: &str) -> &[EdgeId] {
        self.label_index
            .get(label)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Outgoing edges of `node`.
    pub fn children(&self, node: NodeId) -> &[EdgeId] {
        self.outgoing.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming edges of `node`.
    pub fn parents(&self, node: NodeId) -> &[EdgeId] {
        self.incoming.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First live edge equal to the `(label, source, destination)` triple.
    pub fn find_edge(&self, label: &str, source: &str, destination: &str) -> Option<EdgeId> {
        let src = self.resolve(source)?;
        let dst = self.resolve(destination)?;
        self.edges_by_label(label)
            .iter()
            .find(|id| {
                self.edges
                    .get(id)
                    .is_some_and(|e| e.source == src && e.destination == dst)
            })
            .copied()
    }

    /// Live nodes a pattern names explicitly (concrete or regex).
    pub fn labeled_nodes(&self) -> BTreeSet<NodeId> {
        self.nodes()
            .filter(|(_, n)| n.is_labeled())
            .map(|(id, _)| id)
            .collect()
    }

    /// World nodes with no counterpart label in `pattern` — the pool an
    /// unknown pattern node may bind to.
    pub fn possible_unknown_nodes(&self, pattern: &GraphStore) -> BTreeSet<NodeId> {
        let claimed: BTreeSet<&str> = pattern
            .labeled_nodes()
            .into_iter()
            .map(|id| pattern.node_label(id))
            .collect();
        self.nodes()
            .filter(|(_, n)| !claimed.contains(n.label.as_str()))
            .map(|(id, _)| id)
            .collect()
    }

    /// Nodes in `self` matching a (possibly regex) node of another graph:
    /// a concrete node matches the equally-labeled node, a regex node every
    /// node whose label the regex fully matches.
    pub fn find_nodes_matching(&self, node: &Node) -> Result<Vec<NodeId>> {
        if !node.is_regex() {
            return Ok(self.resolve(&node.label).into_iter().collect());
        }
        let re = compile_anchored(&node.label)?;
        Ok(self
            .nodes()
            .filter(|(_, n)| re.is_match(&n.label))
            .map(|(id, _)| id)
            .collect())
    }

    /// Distinct neighbours of `node` in either direction, filtered to the
    /// `members` set (when non-empty) and away from the `excluded` set.
    pub fn neighbours<M, E>(&self, node: NodeId, members: &M, excluded: &E) -> BTreeSet<NodeId>
    where
        M: Contains<NodeId> + ?Sized,
        E: Contains<NodeId> + ?Sized,
    {
        let mut neighs: BTreeSet<NodeId> = BTreeSet::new();
        for id in self.children(node) {
            if let Some(e) = self.edges.get(id) {
                neighs.insert(e.destination);
            }
        }
        for id in self.parents(node) {
            if let Some(e) = self.edges.get(id) {
                neighs.insert(e.source);
            }
        }
        neighs.remove(&node);
        neighs
            .into_iter()
            .filter(|n| {
                !excluded.contains_item(n)
                    && (members.is_empty_set() || members.contains_item(n))
            })
            .collect()
    }

    /// Neighbours without a membership or exclusion filter.
    pub fn all_neighbours(&self, node: NodeId) -> BTreeSet<NodeId> {
        let none: &[NodeId] = &[];
        self.neighbours(node, &none, &none)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Whole-graph queries
    // ─────────────────────────────────────────────────────────────────────

    /// Edge groups of the weakly connected components.
    pub fn connected_components(&self) -> Vec<Vec<EdgeId>> {
        let mut visited_nodes: BTreeSet<NodeId> = BTreeSet::new();
        let mut components = Vec::new();

        for (start, _) in self.nodes() {
            if !visited_nodes.insert(start) {
                continue;
            }

            let mut component = Vec::new();
            let mut visited_edges: BTreeSet<EdgeId> = BTreeSet::new();
            let mut queue: VecDeque<NodeId> = VecDeque::new();
            queue.push_back(start);

            while let Some(current) = queue.pop_front() {
                let touching = self
                    .children(current)
                    .iter()
                    .chain(self.parents(current).iter());
                for id in touching {
                    if !visited_edges.insert(*id) {
                        continue;
                    }
                    component.push(*id);
                    if let Some(edge) = self.edges.get(id) {
                        for next in [edge.source, edge.destination] {
                            if visited_nodes.insert(next) {
                                queue.push_back(next);
                            }
                        }
                    }
                }
            }

            if !component.is_empty() {
                components.push(component);
            }
        }

        components
    }

    /// True when every edge triple of `self` also exists in `big`.
    pub fn is_included_in(&self, big: &GraphStore) -> bool {
        self.edges.values().all(|edge| {
            big.find_edge(
                &edge.label,
                self.node_label(edge.source),
                self.node_label(edge.destination),
            )
            .is_some()
        })
    }

    /// Order-independent structural fingerprint: sorted edge labels joined
    /// by `~`. Two stores with the same edge-label multiset collide, which
    /// is exactly the coarse equality the match cache wants.
    pub fn edge_text_representation(&self) -> String {
        let mut labels: Vec<&str> = self.edges.values().map(|e| e.label.as_str()).collect();
        labels.sort_unstable();
        labels.join("~")
    }

    /// Drop all nodes, edges, indices, caches and the archive.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.node_ids.clear();
        self.edges.clear();
        self.outgoing.clear();
        self.incoming.clear();
        self.pair_index.clear();
        self.label_index.clear();
        self.archive.clear();
        self.invalidate_caches();
    }
}

impl std::fmt::Display for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for edge in self.edges.values() {
            writeln!(
                f,
                "{} -> [{}, {}]",
                edge.label,
                self.node_label(edge.source),
                self.node_label(edge.destination)
            )?;
        }
        Ok(())
    }
}

/// Compile a regex that must match the whole subject, mirroring the
/// full-match semantics the matching rules are defined in.
pub(crate) fn compile_anchored(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})$"))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_single_edge_insertion() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");

        assert_eq!(cg.edge_count(), 1);
        assert_eq!(cg.node_count(), 2);
        let (_, edge) = cg.edges().next().unwrap();
        assert_eq!(edge.label, "e");
        assert_eq!(cg.node_label(edge.source), "1");
        assert_eq!(cg.node_label(edge.destination), "2");
    }

    #[test]
    fn test_nodes_dedup_by_label() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg.add_edge("e1", "2", "3");
        assert_eq!(cg.node_count(), 3);
        assert_eq!(cg.resolve("2"), Some(cg.intern_node("2")));
    }

    #[test]
    fn test_duplicate_edge_merges_expirations() {
        let mut cg = GraphStore::new();
        cg.allow_duplicate_edges(false);
        let first = cg.add_edge_timed("e", "1", "2", ts(100), ValidityWindow::permanent());
        let second = cg.add_edge_timed("e", "1", "2", ts(200), ValidityWindow::permanent());

        assert_eq!(first, second);
        assert_eq!(cg.edge_count(), 1);
        let edge = cg.edge(first).unwrap();
        assert_eq!(edge.expiration_count(), 2);
        assert_eq!(edge.last_expiration(), ts(200));
    }

    #[test]
    fn test_duplicates_allowed_by_default() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg.add_edge("e", "1", "2");
        assert_eq!(cg.edge_count(), 2);
    }

    #[test]
    fn test_adjacency_and_pair_index() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg.add_edge("e1", "1", "2");
        cg.add_edge("e2", "2", "3");

        let n1 = cg.resolve("1").unwrap();
        let n2 = cg.resolve("2").unwrap();
        let n3 = cg.resolve("3").unwrap();
        assert!(cg.is_adjacent(n1, n2));
        assert!(!cg.is_adjacent(n2, n1));
        assert_eq!(cg.edges_between(n1, n2).len(), 2);
        assert_eq!(cg.children(n2).len(), 1);
        assert_eq!(cg.parents(n3).len(), 1);
    }

    #[test]
    fn test_store_validity_folds_from_edges() {
        let mut cg = GraphStore::new();
        cg.add_edge_timed("e", "1", "2", ts(500), ValidityWindow::new(ts(0), ts(1000)));
        cg.add_edge_timed("e1", "2", "3", ts(300), ValidityWindow::new(ts(100), ts(2000)));

        assert_eq!(cg.valid_until(), ts(300));
        assert_eq!(cg.validity_window(), ValidityWindow::new(ts(100), ts(1000)));
    }

    #[test]
    fn test_forced_validity_is_pinned() {
        let mut cg = GraphStore::new();
        cg.set_forced_expiry(ts(900), true);
        cg.add_edge_timed("e", "1", "2", ts(300), ValidityWindow::permanent());
        assert_eq!(cg.valid_until(), ts(900));
    }

    #[test]
    fn test_labeled_nodes_exclude_unknowns() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "?");
        cg.add_edge("e1", "?", "3");
        cg.add_edge("e2", "3", "?1");

        let labels: Vec<&str> = cg
            .labeled_nodes()
            .into_iter()
            .map(|id| cg.node_label(id))
            .collect();
        assert_eq!(labels, vec!["1", "3"]);
    }

    #[test]
    fn test_possible_unknown_nodes() {
        let mut world = GraphStore::new();
        world.add_edge("e", "1", "2");
        world.add_edge("e1", "2", "3");
        world.add_edge("e2", "3", "4");

        let mut pattern = GraphStore::new();
        pattern.add_edge("e", "1", "?");
        pattern.add_edge("e1", "?", "3");

        let pool: Vec<&str> = world
            .possible_unknown_nodes(&pattern)
            .into_iter()
            .map(|id| world.node_label(id))
            .collect();
        assert_eq!(pool, vec!["2", "4"]);
    }

    #[test]
    fn test_find_nodes_matching_regex() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "server_1", "server_2");
        cg.add_edge("e1", "server_2", "client");

        let mut probe = Node::new("server_.*");
        probe.kind = NodeKind::RegexPattern;
        let hits = cg.find_nodes_matching(&probe).unwrap();
        assert_eq!(hits.len(), 2);

        let miss = cg.find_nodes_matching(&Node::new("absent")).unwrap();
        assert!(miss.is_empty());
    }

    #[test]
    fn test_neighbours_filtering() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg.add_edge("e1", "3", "1");
        cg.add_edge("e2", "1", "1");

        let n1 = cg.resolve("1").unwrap();
        let n2 = cg.resolve("2").unwrap();
        let n3 = cg.resolve("3").unwrap();

        // Self-loops never count as neighbours.
        assert_eq!(
            cg.all_neighbours(n1),
            BTreeSet::from([n2, n3])
        );

        let members = vec![n2];
        let excluded: Vec<NodeId> = Vec::new();
        assert_eq!(cg.neighbours(n1, &members, &excluded), BTreeSet::from([n2]));

        let everyone: Vec<NodeId> = Vec::new();
        let excluded = vec![n2];
        assert_eq!(cg.neighbours(n1, &everyone, &excluded), BTreeSet::from([n3]));
    }

    #[test]
    fn test_connected_components() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg.add_edge("e1", "2", "3");
        cg.add_edge("e2", "9", "10");

        let mut sizes: Vec<usize> = cg
            .connected_components()
            .iter()
            .map(|c| c.len())
            .collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);
    }

    #[test]
    fn test_inclusion_and_fingerprint() {
        let mut big = GraphStore::new();
        big.add_edge("e", "1", "2");
        big.add_edge("e1", "2", "3");

        let mut small = GraphStore::new();
        small.add_edge("e1", "2", "3");
        assert!(small.is_included_in(&big));

        small.add_edge("ex", "5", "6");
        assert!(!small.is_included_in(&big));

        let mut reordered = GraphStore::new();
        reordered.add_edge("e1", "2", "3");
        reordered.add_edge("e", "1", "2");
        assert_eq!(
            big.edge_text_representation(),
            reordered.edge_text_representation()
        );
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut cg = GraphStore::new();
        cg.clear();
        assert!(cg.is_empty());

        cg.add_edge("e", "1", "2");
        cg.clear();
        assert!(cg.is_empty());
        assert_eq!(cg.edges_by_label("e").len(), 0);
    }
}
