use std::collections::HashMap;
use std::collections::hash_map::Entry;

use graph_core::EdgeId;
use ngram_graph::{Graph, StoreError};

use crate::{Reply, Scorer, normalize};

/// Memoized per-edge lookups, shared by the information scorers.
#[derive(Debug, Default)]
struct EdgeCache {
    logprob: HashMap<EdgeId, f64>,
    has_space: HashMap<EdgeId, bool>,
}

impl EdgeCache {
    fn logprob(&mut self, graph: &Graph, edge: EdgeId) -> Result<f64, StoreError> {
        match self.logprob.entry(edge) {
            Entry::Occupied(e) => Ok(*e.get()),
            Entry::Vacant(e) => Ok(*e.insert(graph.edge_logprob(edge)?)),
        }
    }

    fn has_space(&mut self, graph: &Graph, edge: EdgeId) -> Result<bool, StoreError> {
        match self.has_space.entry(edge) {
            Entry::Occupied(e) => Ok(*e.get()),
            Entry::Vacant(e) => Ok(*e.insert(graph.has_space(edge)?)),
        }
    }

    /// Negative total log2 probability of a walk.
    fn information(&mut self, graph: &Graph, edges: &[EdgeId]) -> Result<f64, StoreError> {
        let mut info = 0.0;
        for &edge in edges {
            info -= self.logprob(graph, edge)?;
        }
        Ok(info)
    }

    fn clear(&mut self) {
        self.logprob.clear();
        self.has_space.clear();
    }
}

/// Damp the information of long replies: above 16 words the score is
/// divided by `sqrt(n - 1)`.
pub fn length_penalty(info: f64, n_words: i64) -> f64 {
    if n_words > 16 {
        info / ((n_words - 1) as f64).sqrt()
    } else {
        info
    }
}

/// The default scorer: information content with a length penalty.
#[derive(Debug, Default)]
pub struct CobeScorer {
    cache: EdgeCache,
}

impl CobeScorer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scorer for CobeScorer {
    fn score(&mut self, reply: &Reply, graph: &Graph) -> Result<f64, StoreError> {
        let edges = reply.edge_ids();
        let mut info = self.cache.information(graph, edges)?;

        // Every walk carries order - 1 boundary edges at each end. Each space
        // between tokens counts as a word of its own.
        let mut n_words = edges.len() as i64 - 2 * (graph.order() as i64 - 1);
        for &edge in edges {
            if self.cache.has_space(graph, edge)? {
                n_words += 1;
            }
        }

        // Scored as if walked in both directions.
        info *= 2.0;

        Ok(normalize(length_penalty(info, n_words)))
    }

    fn end(&mut self, _reply: &Reply) {
        self.cache.clear();
    }
}

/// Information content with no length penalty.
#[derive(Debug, Default)]
pub struct InformationScorer {
    cache: EdgeCache,
}

impl InformationScorer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scorer for InformationScorer {
    fn score(&mut self, reply: &Reply, graph: &Graph) -> Result<f64, StoreError> {
        let info = self.cache.information(graph, reply.edge_ids())?;
        Ok(normalize(info))
    }

    fn end(&mut self, _reply: &Reply) {
        self.cache.clear();
    }
}

/// Rewards longer walks.
#[derive(Debug, Default, Clone, Copy)]
pub struct LengthScorer;

impl Scorer for LengthScorer {
    fn score(&mut self, reply: &Reply, _graph: &Graph) -> Result<f64, StoreError> {
        Ok(normalize(reply.edge_ids().len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::learn;
    use graph_core::NodeId;

    fn reply(edges: Vec<EdgeId>) -> Reply {
        Reply::new(Vec::new(), Vec::new(), NodeId(1), edges)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn penalty_regimes() {
        assert_eq!(length_penalty(8.0, 4), 8.0);
        assert_eq!(length_penalty(8.0, 16), 8.0);
        assert!(close(length_penalty(8.0, 17), 2.0));
        assert!(close(length_penalty(8.0, 32), 8.0 / 31f64.sqrt()));
        assert!(close(length_penalty(8.0, 40), 8.0 / 39f64.sqrt()));
    }

    #[test]
    fn very_long_replies_keep_the_sqrt_penalty() {
        // Past 32 words the penalty still shrinks slowly with length.
        let p33 = length_penalty(8.0, 33);
        let p100 = length_penalty(8.0, 100);
        assert!(close(p33, 8.0 / 32f64.sqrt()));
        assert!(close(p100, 8.0 / 99f64.sqrt()));
        assert!(p100 > 8.0 / 100.0);
    }

    #[test]
    fn single_path_has_no_information() {
        let graph = Graph::init_in_memory(3, "Cobe").unwrap();
        let r = reply(learn(&graph, "a b c"));
        assert_eq!(CobeScorer::new().score(&r, &graph).unwrap(), 0.0);
        assert_eq!(InformationScorer::new().score(&r, &graph).unwrap(), 0.0);
    }

    #[test]
    fn branching_adds_information() {
        let graph = Graph::init_in_memory(3, "Cobe").unwrap();
        let abc = learn(&graph, "a b c");
        learn(&graph, "a b d");
        let r = reply(abc);

        // Only [B a b] -> [a b c] is uncertain: log2(1) - log2(2) = -1.
        // Cobe doubles it: normalize(2) = 2/3.
        assert!(close(CobeScorer::new().score(&r, &graph).unwrap(), 2.0 / 3.0));
        assert!(close(InformationScorer::new().score(&r, &graph).unwrap(), 0.5));
    }

    #[test]
    fn length_scorer_counts_edges() {
        let graph = Graph::init_in_memory(3, "Cobe").unwrap();
        let r = reply(learn(&graph, "a b c"));
        assert!(close(LengthScorer.score(&r, &graph).unwrap(), 6.0 / 7.0));
    }

    #[test]
    fn end_clears_cache() {
        let graph = Graph::init_in_memory(3, "Cobe").unwrap();
        let abc = learn(&graph, "a b c");
        let r = reply(abc);
        let mut scorer = CobeScorer::new();

        assert_eq!(scorer.score(&r, &graph).unwrap(), 0.0);
        assert!(!scorer.cache.logprob.is_empty());

        // New knowledge is invisible to a warm cache until `end`.
        learn(&graph, "a b d");
        assert_eq!(scorer.score(&r, &graph).unwrap(), 0.0);
        scorer.end(&r);
        assert!(scorer.cache.logprob.is_empty());
        assert!(close(scorer.score(&r, &graph).unwrap(), 2.0 / 3.0));
    }

    #[test]
    fn default_group_is_cobe() {
        let graph = Graph::init_in_memory(3, "Cobe").unwrap();
        let abc = learn(&graph, "a b c");
        learn(&graph, "a b d");
        let r = reply(abc);
        let mut group = crate::ScorerGroup::default();
        assert!(close(group.score(&r, &graph).unwrap(), 2.0 / 3.0));
    }
}
