//! Expiration sweep, node removal and relabeling
//!
//! Expired edges are not destroyed: the sweep copies their label triple
//! and validity window into the archive so temporal queries can still match
//! against history. Explicit removal deletes outright.

use crate::edge::EdgeId;
use crate::node::{Node, NodeId};
use crate::store::{ArchivedEdge, GraphStore};
use chrono::Utc;
use std::collections::HashMap;

impl GraphStore {
    /// Drop past expiration timestamps from every live edge and archive
    /// the edges left with none. Endpoints with no remaining incident
    /// edges leave the live node set.
    pub fn sweep_expired(&mut self) {
        let now = Utc::now();
        let expired: Vec<EdgeId> = self
            .edges
            .iter_mut()
            .filter_map(|(id, edge)| {
                edge.refresh_expirations(now);
                if !edge.has_expirations() {
                    Some(*id)
                } else {
                    None
                }
            })
            .collect();
        if expired.is_empty() {
            return;
        }

        tracing::debug!(count = expired.len(), "sweeping expired edges");
        for id in expired {
            let Some(edge) = self.edges.remove(&id) else {
                continue;
            };
            let archived = ArchivedEdge {
                label: edge.label.clone(),
                source: self.node_label(edge.source).to_string(),
                destination: self.node_label(edge.destination).to_string(),
                window: edge.window,
            };
            self.archive.push(archived);
            self.unlink_edge(id, edge.source, edge.destination, &edge.label);
            self.drop_if_isolated(edge.source);
            self.drop_if_isolated(edge.destination);
        }
        self.invalidate_caches();
    }

    /// Remove a node and every edge touching it. Removed edges are gone
    /// for good, not archived.
    pub fn remove_node(&mut self, label: &str) {
        let Some(node) = self.resolve(label) else {
            return;
        };
        let incident: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|(_, e)| e.source == node || e.destination == node)
            .map(|(id, _)| *id)
            .collect();
        for id in incident {
            if let Some(edge) = self.edges.remove(&id) {
                self.unlink_edge(id, edge.source, edge.destination, &edge.label);
            }
        }
        self.node_ids.remove(label);
        self.outgoing.remove(&node);
        self.incoming.remove(&node);
        self.invalidate_caches();
    }

    /// Re-link every edge touching `old_label` onto a node labeled
    /// `new_label`, creating it if needed, and retire the old node.
    /// No-ops when the old node does not exist or the labels are equal.
    pub fn replace_node(&mut self, old_label: &str, new_label: &str) {
        let Some(old) = self.resolve(old_label) else {
            return;
        };

        match self.resolve(new_label) {
            None => {
                // Rename in place; the arena slot keeps its id.
                self.node_ids.remove(old_label);
                self.nodes[old.index()] = Node::new(new_label);
                self.node_ids.insert(new_label.to_string(), old);
            }
            Some(new) if new != old => {
                for edge in self.edges.values_mut() {
                    if edge.source == old {
                        edge.source = new;
                    }
                    if edge.destination == old {
                        edge.destination = new;
                    }
                }
                self.node_ids.remove(old_label);
                self.rebuild_adjacency();
            }
            Some(_) => return,
        }
        self.invalidate_caches();
    }

    pub fn archived_edges(&self) -> &[ArchivedEdge] {
        &self.archive
    }

    fn unlink_edge(&mut self, id: EdgeId, source: NodeId, destination: NodeId, label: &str) {
        if let Some(out) = self.outgoing.get_mut(&source) {
            out.retain(|e| *e != id);
        }
        if let Some(inc) = self.incoming.get_mut(&destination) {
            inc.retain(|e| *e != id);
        }
        if let Some(pair) = self.pair_index.get_mut(&(source, destination)) {
            pair.retain(|e| *e != id);
        }
        if let Some(labeled) = self.label_index.get_mut(label) {
            labeled.retain(|e| *e != id);
        }
    }

    fn drop_if_isolated(&mut self, node: NodeId) {
        let has_out = self.outgoing.get(&node).is_some_and(|v| !v.is_empty());
        let has_in = self.incoming.get(&node).is_some_and(|v| !v.is_empty());
        if has_out || has_in {
            return;
        }
        self.outgoing.remove(&node);
        self.incoming.remove(&node);
        let label = self.node_label(node).to_string();
        self.node_ids.remove(&label);
    }

    fn rebuild_adjacency(&mut self) {
        let mut outgoing: HashMap<NodeId, Vec<EdgeId>> = HashMap::new();
        let mut incoming: HashMap<NodeId, Vec<EdgeId>> = HashMap::new();
        let mut pair_index: HashMap<(NodeId, NodeId), Vec<EdgeId>> = HashMap::new();
        for (id, edge) in &self.edges {
            outgoing.entry(edge.source).or_default().push(*id);
            incoming.entry(edge.destination).or_default().push(*id);
            pair_index
                .entry((edge.source, edge.destination))
                .or_default()
                .push(*id);
        }
        self.outgoing = outgoing;
        self.incoming = incoming;
        self.pair_index = pair_index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::ValidityWindow;
    use chrono::Duration;

    #[test]
    fn test_sweep_archives_expired_edges() {
        let mut cg = GraphStore::new();
        cg.add_edge_timed(
            "gone",
            "1",
            "2",
            Utc::now() - Duration::minutes(5),
            ValidityWindow::permanent(),
        );
        cg.add_edge("kept", "2", "3");

        cg.sweep_expired();

        assert_eq!(cg.edge_count(), 1);
        assert!(cg.find_edge("kept", "2", "3").is_some());
        assert_eq!(cg.archived_edges().len(), 1);
        let archived = &cg.archived_edges()[0];
        assert_eq!(archived.label, "gone");
        assert_eq!(archived.source, "1");
        assert_eq!(archived.destination, "2");
        // "1" lost its only edge; "2" is still held by the live edge.
        assert!(cg.resolve("1").is_none());
        assert!(cg.resolve("2").is_some());
    }

    #[test]
    fn test_sweep_keeps_edge_with_future_timestamp() {
        let mut cg = GraphStore::new();
        let eid = cg.add_edge_timed(
            "e",
            "1",
            "2",
            Utc::now() - Duration::minutes(5),
            ValidityWindow::permanent(),
        );
        cg.edge_add_expiration(eid, Utc::now() + Duration::hours(1));

        cg.sweep_expired();

        assert_eq!(cg.edge_count(), 1);
        // The stale timestamp is dropped, the future one survives.
        assert_eq!(cg.edge(eid).unwrap().expiration_count(), 1);
        assert!(cg.archived_edges().is_empty());
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let mut cg = GraphStore::new();
        cg.add_edge_timed(
            "e",
            "1",
            "2",
            Utc::now() - Duration::minutes(5),
            ValidityWindow::permanent(),
        );
        cg.sweep_expired();
        cg.sweep_expired();
        assert_eq!(cg.archived_edges().len(), 1);
        assert!(cg.is_empty());
    }

    #[test]
    fn test_remove_node_cascades_to_edges() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg.add_edge("e1", "2", "3");
        cg.add_edge("e2", "3", "4");

        cg.remove_node("2");

        assert!(cg.resolve("2").is_none());
        assert_eq!(cg.edge_count(), 1);
        assert!(cg.find_edge("e2", "3", "4").is_some());
        assert!(cg.archived_edges().is_empty());

        let n3 = cg.resolve("3").unwrap();
        let n4 = cg.resolve("4").unwrap();
        assert!(cg.is_adjacent(n3, n4));
    }

    #[test]
    fn test_remove_missing_node_is_a_noop() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg.remove_node("ghost");
        assert_eq!(cg.edge_count(), 1);
    }

    #[test]
    fn test_replace_node_renames_in_place() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");

        cg.replace_node("1", "?0");

        assert!(cg.resolve("1").is_none());
        let unk = cg.resolve("?0").unwrap();
        assert!(cg.node(unk).is_unknown());
        assert!(cg.find_edge("e", "?0", "2").is_some());
    }

    #[test]
    fn test_replace_node_merges_into_existing() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg.add_edge("e1", "3", "4");

        cg.replace_node("1", "3");

        assert!(cg.resolve("1").is_none());
        assert!(cg.find_edge("e", "3", "2").is_some());
        assert!(cg.find_edge("e1", "3", "4").is_some());
        let n3 = cg.resolve("3").unwrap();
        assert_eq!(cg.children(n3).len(), 2);
    }

    #[test]
    fn test_mutations_clear_path_caches() {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg.add_edge("e1", "2", "3");
        cg.find_paths("1", "3");
        assert!(!cg.path_cache.is_empty());

        cg.remove_node("2");
        assert!(cg.path_cache.is_empty());

        cg.add_edge("e", "1", "2");
        cg.find_paths("1", "2");
        assert!(!cg.path_cache.is_empty());
        cg.replace_node("1", "9");
        assert!(cg.path_cache.is_empty());
    }
}
