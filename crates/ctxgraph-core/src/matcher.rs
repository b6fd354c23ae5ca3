//! Maximum subgraph matching
//!
//! Finds the largest assignments of a pattern graph onto the world graph.
//! Pattern nodes may be concrete labels, unknowns (`?`-prefixed or empty,
//! bindable to any non-pattern world node), or regex patterns; pattern
//! edges may carry regex labels matched against whole label-concatenated
//! world paths.
//!
//! All transient search state lives in [`MatchState`] side tables keyed by
//! id, never on the graph itself, so a failed or interrupted search leaves
//! both graphs untouched.

use crate::edge::{Edge, EdgeId};
use crate::error::Result;
use crate::node::NodeId;
use crate::store::{compile_anchored, GraphStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ───────────────────────── Query ─────────────────────────

/// Options for a maximum-match run.
///
/// ```
/// use ctxgraph_core::MatchQuery;
///
/// let query = MatchQuery::new().real_time().match_in_past();
/// assert!(query.is_real_time());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchQuery {
    real_time: bool,
    match_in_past: bool,
}

impl MatchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the world to edges alive (or archived) within the
    /// pattern's validity window before matching.
    pub fn real_time(mut self) -> Self {
        self.real_time = true;
        self
    }

    /// With [`real_time`](Self::real_time), let an already-expired pattern
    /// match against archived history instead of returning nothing.
    pub fn match_in_past(mut self) -> Self {
        self.match_in_past = true;
        self
    }

    pub fn is_real_time(&self) -> bool {
        self.real_time
    }

    pub fn is_match_in_past(&self) -> bool {
        self.match_in_past
    }
}

// ───────────────────────── Results ─────────────────────────

/// One matched world edge, identified by its label triple. Triples stay
/// meaningful even when the match ran against a temporal snapshot whose
/// ids are not the caller's.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchedEdge {
    pub label: String,
    pub source: String,
    pub destination: String,
}

/// Every best solution; each solution is a sorted edge list.
pub type MatchSet = BTreeSet<Vec<MatchedEdge>>;

// ───────────────────────── Search state ─────────────────────────

#[derive(Debug, Default)]
struct MatchState {
    /// World nodes claimed by some pattern node.
    assigned: BTreeSet<NodeId>,
    /// Pattern node to the world node it is bound to.
    correspondent: BTreeMap<NodeId, NodeId>,
    /// World edges claimed by some concrete pattern edge.
    in_use: BTreeSet<EdgeId>,
    /// Edges of the solution under construction, duplicates included.
    solution: Vec<EdgeId>,
    best: BTreeSet<BTreeSet<EdgeId>>,
    max_size: usize,
}

/// Log of one binding, replayed backwards on backtrack.
#[derive(Debug, Default)]
struct Binding {
    used: Option<EdgeId>,
    assigned: Vec<NodeId>,
    correspondents: Vec<NodeId>,
}

impl MatchState {
    fn bind_node(&mut self, binding: &mut Binding, pattern_node: NodeId, world_node: NodeId) {
        if self.assigned.insert(world_node) {
            binding.assigned.push(world_node);
        }
        if let std::collections::btree_map::Entry::Vacant(slot) =
            self.correspondent.entry(pattern_node)
        {
            slot.insert(world_node);
            binding.correspondents.push(pattern_node);
        }
    }

    fn bind_edge(&mut self, binding: &mut Binding, world_edge: EdgeId) {
        self.in_use.insert(world_edge);
        binding.used = Some(world_edge);
    }

    fn rollback(&mut self, binding: Binding) {
        if let Some(edge) = binding.used {
            self.in_use.remove(&edge);
        }
        for node in binding.assigned {
            self.assigned.remove(&node);
        }
        for node in binding.correspondents {
            self.correspondent.remove(&node);
        }
    }

    /// An endpoint pair is admissible when it contradicts no existing
    /// binding: bound pattern nodes must map to exactly these world nodes,
    /// claimed world nodes must already correspond to these pattern nodes,
    /// and loops only pair with loops.
    fn admissible(&self, psrc: NodeId, pdst: NodeId, wsrc: NodeId, wdst: NodeId) -> bool {
        if psrc == pdst && wsrc != wdst {
            return false;
        }
        if wsrc == wdst && psrc != pdst {
            return false;
        }
        if let Some(bound) = self.correspondent.get(&psrc) {
            if *bound != wsrc {
                return false;
            }
        } else if self.assigned.contains(&wsrc) {
            return false;
        }
        if let Some(bound) = self.correspondent.get(&pdst) {
            if *bound != wdst {
                return false;
            }
        } else if self.assigned.contains(&wdst) {
            return false;
        }
        true
    }

    fn record(&mut self) {
        let size = self.solution.len();
        let solution: BTreeSet<EdgeId> = self.solution.iter().copied().collect();
        match size.cmp(&self.max_size) {
            std::cmp::Ordering::Less => {}
            std::cmp::Ordering::Equal => {
                self.best.insert(solution);
            }
            std::cmp::Ordering::Greater => {
                self.max_size = size;
                self.best.clear();
                self.best.insert(solution);
            }
        }
    }
}

// ───────────────────────── Engine ─────────────────────────

impl GraphStore {
    /// All maximum matches of `pattern` in this graph.
    ///
    /// Solutions are returned as label triples sorted within each
    /// solution; parallel duplicate edges of the world appear once each.
    /// A zero-edge pattern matches trivially with the empty solution.
    pub fn maximum_match(&mut self, pattern: &GraphStore, query: &MatchQuery) -> Result<MatchSet> {
        if query.is_real_time() {
            return match self.temporal_world(pattern, query.is_match_in_past()) {
                None => Ok(MatchSet::new()),
                Some(mut world) => world.maximum_match(pattern, &MatchQuery::new()),
            };
        }

        let best = self.search_maximum(pattern)?;
        Ok(best
            .into_iter()
            .map(|solution| self.materialize(&solution))
            .collect())
    }

    /// Like [`maximum_match`](Self::maximum_match) but returns each best
    /// solution as a standalone graph, preserving per-edge expirations and
    /// validity windows.
    pub fn maximum_match_graphs(
        &mut self,
        pattern: &GraphStore,
        query: &MatchQuery,
    ) -> Result<Vec<GraphStore>> {
        if query.is_real_time() {
            return match self.temporal_world(pattern, query.is_match_in_past()) {
                None => Ok(Vec::new()),
                Some(mut world) => world.maximum_match_graphs(pattern, &MatchQuery::new()),
            };
        }

        let best = self.search_maximum(pattern)?;
        let mut graphs = Vec::with_capacity(best.len());
        for solution in best {
            let mut graph = GraphStore::new();
            for id in solution {
                let Some(edge) = self.edge(id) else {
                    continue;
                };
                let (label, window) = (edge.label.clone(), edge.window);
                let expiry = edge.first_expiration();
                let source = self.node_label(edge.source).to_string();
                let destination = self.node_label(edge.destination).to_string();
                graph.add_edge_timed(&label, &source, &destination, expiry, window);
            }
            graphs.push(graph);
        }
        Ok(graphs)
    }

    fn search_maximum(&mut self, pattern: &GraphStore) -> Result<BTreeSet<BTreeSet<EdgeId>>> {
        let unknown_pool = self.possible_unknown_nodes(pattern);
        let mut state = MatchState::default();

        // Propagation: fully concrete pattern edges with exactly one
        // candidate are bound up front and never backtracked over. Edges
        // with regex labels or unknown/regex endpoints always go through
        // the search, even when a single candidate exists.
        let mut pending: Vec<(EdgeId, bool, usize)> = Vec::new();
        for (pid, pedge) in pattern.edges() {
            if Self::needs_path_search(pattern, pedge) {
                pending.push((pid, true, 0));
                continue;
            }
            let candidates = self.concrete_candidates(pattern, pedge, &unknown_pool)?;
            if Self::is_complex(pattern, pedge) {
                pending.push((pid, false, candidates.len()));
                continue;
            }
            if candidates.len() == 1 {
                let world = candidates[0];
                let Some(wedge) = self.edge(world) else {
                    continue;
                };
                let (wsrc, wdst) = (wedge.source, wedge.destination);
                let mut binding = Binding::default();
                state.bind_node(&mut binding, pedge.source, wsrc);
                state.bind_node(&mut binding, pedge.destination, wdst);
                state.bind_edge(&mut binding, world);
                state.solution.push(world);
            } else {
                pending.push((pid, false, candidates.len()));
            }
        }

        // Most-constrained first; regex edges always last, since they are
        // resolved through path search rather than candidate lists.
        pending.sort_by_key(|(_, regex, count)| (*regex, *count));
        let order: Vec<EdgeId> = pending.into_iter().map(|(pid, _, _)| pid).collect();

        let mut edge_candidates: BTreeMap<EdgeId, Vec<EdgeId>> = BTreeMap::new();
        let mut node_candidates: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for &pid in &order {
            let Some(pedge) = pattern.edge(pid) else {
                continue;
            };
            if Self::needs_path_search(pattern, pedge) {
                for pnode in [pedge.source, pedge.destination] {
                    if node_candidates.contains_key(&pnode) {
                        continue;
                    }
                    let node = pattern.node(pnode);
                    let candidates = if node.is_unknown() {
                        unknown_pool.iter().copied().collect()
                    } else {
                        self.find_nodes_matching(node)?
                    };
                    node_candidates.insert(pnode, candidates);
                }
            } else {
                let candidates = self.concrete_candidates(pattern, pedge, &unknown_pool)?;
                edge_candidates.insert(pid, candidates);
            }
        }

        tracing::debug!(
            propagated = state.solution.len(),
            searched = order.len(),
            "maximum_match search"
        );

        self.search_step(pattern, &order, 0, &edge_candidates, &node_candidates, &mut state)?;
        Ok(state.best)
    }

    fn search_step(
        &mut self,
        pattern: &GraphStore,
        order: &[EdgeId],
        index: usize,
        edge_candidates: &BTreeMap<EdgeId, Vec<EdgeId>>,
        node_candidates: &BTreeMap<NodeId, Vec<NodeId>>,
        state: &mut MatchState,
    ) -> Result<()> {
        if index == order.len() {
            state.record();
            return Ok(());
        }
        let Some(pedge) = pattern.edge(order[index]) else {
            return self.search_step(pattern, order, index + 1, edge_candidates, node_candidates, state);
        };
        let (psrc, pdst) = (pedge.source, pedge.destination);

        if Self::needs_path_search(pattern, pedge) {
            let label = pedge.label.clone();
            let sources: Vec<NodeId> = match state.correspondent.get(&psrc) {
                Some(bound) => vec![*bound],
                None => node_candidates.get(&psrc).cloned().unwrap_or_default(),
            };
            let destinations: Vec<NodeId> = match state.correspondent.get(&pdst) {
                Some(bound) => vec![*bound],
                None => node_candidates.get(&pdst).cloned().unwrap_or_default(),
            };
            for wsrc in sources {
                for &wdst in &destinations {
                    if !state.admissible(psrc, pdst, wsrc, wdst) {
                        continue;
                    }
                    let Some(path) = self.find_best_path_matching_regex(&label, wsrc, wdst)? else {
                        continue;
                    };
                    let mut binding = Binding::default();
                    state.bind_node(&mut binding, psrc, wsrc);
                    state.bind_node(&mut binding, pdst, wdst);
                    let hops = path.len();
                    state.solution.extend(path);
                    self.search_step(pattern, order, index + 1, edge_candidates, node_candidates, state)?;
                    state.solution.truncate(state.solution.len() - hops);
                    state.rollback(binding);
                }
            }
        } else {
            let candidates = edge_candidates.get(&order[index]).cloned().unwrap_or_default();
            for world in candidates {
                if state.in_use.contains(&world) {
                    continue;
                }
                let Some(wedge) = self.edge(world) else {
                    continue;
                };
                let (wsrc, wdst) = (wedge.source, wedge.destination);
                if !state.admissible(psrc, pdst, wsrc, wdst) {
                    continue;
                }
                let mut binding = Binding::default();
                state.bind_node(&mut binding, psrc, wsrc);
                state.bind_node(&mut binding, pdst, wdst);
                state.bind_edge(&mut binding, world);
                state.solution.push(world);
                self.search_step(pattern, order, index + 1, edge_candidates, node_candidates, state)?;
                state.solution.pop();
                state.rollback(binding);
            }
        }

        // Also try leaving this pattern edge unmatched, but only when the
        // remaining edges could still beat the current maximum.
        if order.len() - index + state.solution.len() > state.max_size {
            self.search_step(pattern, order, index + 1, edge_candidates, node_candidates, state)?;
        }
        Ok(())
    }

    /// True when the pattern edge needs path-level matching instead of a
    /// direct edge candidate scan.
    fn needs_path_search(_pattern: &GraphStore, pedge: &Edge) -> bool {
        pedge.regex_label
    }

    /// True when the pattern edge cannot be propagated eagerly.
    fn is_complex(pattern: &GraphStore, pedge: &Edge) -> bool {
        if pedge.regex_label {
            return true;
        }
        [pedge.source, pedge.destination].into_iter().any(|id| {
            let node = pattern.node(id);
            node.is_regex() || node.is_unknown()
        })
    }

    /// World edges a concrete pattern edge could bind to: label equality,
    /// endpoint labels matched literally, by regex node, or against the
    /// unknown pool.
    fn concrete_candidates(
        &self,
        pattern: &GraphStore,
        pedge: &Edge,
        unknown_pool: &BTreeSet<NodeId>,
    ) -> Result<Vec<EdgeId>> {
        let psrc = pattern.node(pedge.source);
        let pdst = pattern.node(pedge.destination);
        let src_regex = if psrc.is_regex() {
            Some(compile_anchored(&psrc.label)?)
        } else {
            None
        };
        let dst_regex = if pdst.is_regex() {
            Some(compile_anchored(&pdst.label)?)
        } else {
            None
        };
        let loop_pattern = pedge.source == pedge.destination;

        let mut out = Vec::new();
        for &id in self.edges_by_label(&pedge.label) {
            let Some(edge) = self.edge(id) else {
                continue;
            };
            if loop_pattern != (edge.source == edge.destination) {
                continue;
            }
            let src_ok = if psrc.is_unknown() {
                unknown_pool.contains(&edge.source)
            } else if let Some(re) = &src_regex {
                re.is_match(self.node_label(edge.source))
            } else {
                self.node_label(edge.source) == psrc.label
            };
            if !src_ok {
                continue;
            }
            let dst_ok = if pdst.is_unknown() {
                unknown_pool.contains(&edge.destination)
            } else if let Some(re) = &dst_regex {
                re.is_match(self.node_label(edge.destination))
            } else {
                self.node_label(edge.destination) == pdst.label
            };
            if dst_ok {
                out.push(id);
            }
        }
        Ok(out)
    }

    /// Snapshot of this graph restricted to the pattern's temporal scope.
    ///
    /// For a live pattern the snapshot keeps edges that outlive the
    /// pattern and overlap its validity window. For an expired pattern it
    /// is `None`, unless matching in the past is allowed, in which case
    /// live and archived edges overlapping the window are both included.
    fn temporal_world(&mut self, pattern: &GraphStore, match_in_past: bool) -> Option<GraphStore> {
        self.sweep_expired();

        let now = chrono::Utc::now();
        let window = pattern.validity_window();
        let expiry = pattern.valid_until();
        let mut world = GraphStore::new();

        if expiry <= now {
            if !match_in_past {
                tracing::debug!("pattern expired and matching in the past is disabled");
                return None;
            }
            let live: Vec<(String, String, String)> = self
                .edges
                .values()
                .filter(|edge| edge.window.intersects(&window))
                .map(|edge| {
                    (
                        edge.label.clone(),
                        self.node_label(edge.source).to_string(),
                        self.node_label(edge.destination).to_string(),
                    )
                })
                .collect();
            for (label, source, destination) in live {
                world.add_edge(&label, &source, &destination);
            }
            for archived in self.archived_edges() {
                if archived.window.intersects(&window) {
                    world.add_edge(&archived.label, &archived.source, &archived.destination);
                }
            }
        } else {
            let live: Vec<(String, String, String)> = self
                .edges
                .values()
                .filter(|edge| expiry <= edge.last_expiration() && edge.window.intersects(&window))
                .map(|edge| {
                    (
                        edge.label.clone(),
                        self.node_label(edge.source).to_string(),
                        self.node_label(edge.destination).to_string(),
                    )
                })
                .collect();
            for (label, source, destination) in live {
                world.add_edge(&label, &source, &destination);
            }
        }
        Some(world)
    }

    fn materialize(&self, solution: &BTreeSet<EdgeId>) -> Vec<MatchedEdge> {
        let mut out: Vec<MatchedEdge> = solution
            .iter()
            .filter_map(|id| self.edge(*id))
            .map(|edge| MatchedEdge {
                label: edge.label.clone(),
                source: self.node_label(edge.source).to_string(),
                destination: self.node_label(edge.destination).to_string(),
            })
            .collect();
        out.sort();
        out
    }
}
