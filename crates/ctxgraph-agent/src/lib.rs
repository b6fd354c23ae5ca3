//! Ctxgraph Agent - caching client over the match engine
//!
//! An agent holds a set of interesting patterns and remembers, per
//! pattern, the match graphs the engine produced. A later query against a
//! context that still contains the same edges is answered from the cache
//! without running the engine again. Cache entries are keyed by a
//! structural fingerprint: the sorted concatenation of edge labels, so two
//! graphs with the same edge multiset share a key.

use ctxgraph_core::{GraphStore, MatchQuery, Result};
use std::collections::BTreeMap;

struct CachedMatch {
    pattern: GraphStore,
    results: Vec<GraphStore>,
}

// Ordered by fingerprint so scans over the cache are deterministic.
#[derive(Default)]
pub struct Agent {
    patterns: Vec<GraphStore>,
    cache: BTreeMap<String, CachedMatch>,
}

impl Agent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pattern(&mut self, pattern: GraphStore) {
        self.patterns.push(pattern);
    }

    pub fn add_patterns(&mut self, patterns: impl IntoIterator<Item = GraphStore>) {
        self.patterns.extend(patterns);
    }

    pub fn patterns(&self) -> &[GraphStore] {
        &self.patterns
    }

    /// The cached match graphs for the first cached pattern, in
    /// fingerprint order, whose edges are all present in `context`.
    pub fn previous_match(&self, context: &GraphStore) -> Option<&[GraphStore]> {
        self.cache
            .values()
            .find(|entry| entry.pattern.is_included_in(context))
            .map(|entry| entry.results.as_slice())
    }

    /// Store the engine's output for a pattern.
    pub fn remember(&mut self, pattern: &GraphStore, results: Vec<GraphStore>) {
        let key = pattern.edge_text_representation();
        self.cache.insert(
            key,
            CachedMatch {
                pattern: pattern.clone(),
                results,
            },
        );
    }

    /// Match `pattern` against `world`, answering from the cache when the
    /// pattern's edges are still contained in `world`.
    pub fn match_context(
        &mut self,
        world: &mut GraphStore,
        pattern: &GraphStore,
        query: &MatchQuery,
    ) -> Result<Vec<GraphStore>> {
        let key = pattern.edge_text_representation();
        if let Some(entry) = self.cache.get(&key) {
            if entry.pattern.is_included_in(world) {
                tracing::debug!(%key, "answering match from cache");
                return Ok(entry.results.clone());
            }
        }

        let results = world.maximum_match_graphs(pattern, query)?;
        self.remember(pattern, results.clone());
        Ok(results)
    }

    /// Run every registered pattern against `world`, cache-first.
    pub fn match_all(
        &mut self,
        world: &mut GraphStore,
        query: &MatchQuery,
    ) -> Result<Vec<Vec<GraphStore>>> {
        let patterns = self.patterns.clone();
        patterns
            .iter()
            .map(|pattern| self.match_context(world, pattern, query))
            .collect()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> GraphStore {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg.add_edge("e1", "2", "3");
        cg
    }

    fn pattern() -> GraphStore {
        let mut cg = GraphStore::new();
        cg.add_edge("e", "1", "2");
        cg
    }

    #[test]
    fn test_match_populates_cache() {
        let mut agent = Agent::new();
        let mut w = world();

        let results = agent
            .match_context(&mut w, &pattern(), &MatchQuery::new())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].find_edge("e", "1", "2").is_some());
        assert!(agent.previous_match(&w).is_some());
    }

    #[test]
    fn test_cache_hit_skips_engine() {
        let mut agent = Agent::new();
        let mut w = world();
        agent
            .match_context(&mut w, &pattern(), &MatchQuery::new())
            .unwrap();

        // Plant a sentinel result; a cache hit must return it verbatim.
        let mut sentinel = GraphStore::new();
        sentinel.add_edge("sentinel", "a", "b");
        agent.remember(&pattern(), vec![sentinel]);

        let results = agent
            .match_context(&mut w, &pattern(), &MatchQuery::new())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].find_edge("sentinel", "a", "b").is_some());
    }

    #[test]
    fn test_cache_miss_when_pattern_left_world() {
        let mut agent = Agent::new();
        let mut w = world();
        agent
            .match_context(&mut w, &pattern(), &MatchQuery::new())
            .unwrap();

        w.remove_node("1");
        // The cached pattern is no longer included in the world, so the
        // engine runs again and finds nothing bindable.
        let results = agent
            .match_context(&mut w, &pattern(), &MatchQuery::new())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_empty());
    }

    #[test]
    fn test_previous_match_picks_lowest_fingerprint() {
        let mut agent = Agent::new();
        let mut w = world();

        let mut pat_a = GraphStore::new();
        pat_a.add_edge("e", "1", "2");
        let mut result_a = GraphStore::new();
        result_a.add_edge("from_a", "x", "y");
        agent.remember(&pat_a, vec![result_a]);

        let mut pat_b = GraphStore::new();
        pat_b.add_edge("e1", "2", "3");
        let mut result_b = GraphStore::new();
        result_b.add_edge("from_b", "x", "y");
        agent.remember(&pat_b, vec![result_b]);

        // Both patterns are contained in the world; "e" sorts before "e1".
        let results = agent.previous_match(&w).unwrap();
        assert!(results[0].find_edge("from_a", "x", "y").is_some());

        w.remove_node("1");
        let results = agent.previous_match(&w).unwrap();
        assert!(results[0].find_edge("from_b", "x", "y").is_some());
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let mut g1 = GraphStore::new();
        g1.add_edge("b", "1", "2");
        g1.add_edge("a", "2", "3");
        let mut g2 = GraphStore::new();
        g2.add_edge("a", "9", "8");
        g2.add_edge("b", "8", "7");

        assert_eq!(
            g1.edge_text_representation(),
            g2.edge_text_representation()
        );
    }

    #[test]
    fn test_match_all_runs_every_pattern() {
        let mut agent = Agent::new();
        let mut second = GraphStore::new();
        second.add_edge("e1", "2", "?");
        agent.add_patterns([pattern(), second]);

        let mut w = world();
        let results = agent.match_all(&mut w, &MatchQuery::new()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0][0].find_edge("e", "1", "2").is_some());
        assert!(results[1][0].find_edge("e1", "2", "3").is_some());
    }
}
