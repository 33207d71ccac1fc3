//! Ranking candidate replies.
//!
//! A [`Scorer`] maps a [`Reply`] to a score, normally in `[0, 1)`. Scorers
//! are combined in a [`ScorerGroup`] with signed weights: a negative weight
//! inverts a scorer (`1 - s`) so it penalizes the trait it measures.
//!
//! The default group holds one [`CobeScorer`], which rewards replies that
//! carry a lot of information under the learned transition frequencies.

mod reply;
mod scorers;

use ngram_graph::{Graph, StoreError};

pub use reply::Reply;
pub use scorers::{CobeScorer, InformationScorer, LengthScorer, length_penalty};

/// Scores candidate replies.
pub trait Scorer {
    /// Score one candidate. Higher is better.
    fn score(&mut self, reply: &Reply, graph: &Graph) -> Result<f64, StoreError>;

    /// Called once with the chosen reply; clears per-reply caches.
    fn end(&mut self, _reply: &Reply) {}
}

/// Map `[0, inf)` onto `[0, 1)`, monotonically. Negative scores pass through
/// unchanged; they mark a reply as unscorable.
pub fn normalize(score: f64) -> f64 {
    if score < 0.0 {
        return score;
    }
    1.0 - 1.0 / (1.0 + score)
}

/// A weighted ensemble of scorers.
pub struct ScorerGroup {
    scorers: Vec<(f64, Box<dyn Scorer>)>,
    total_weight: f64,
}

impl ScorerGroup {
    /// An empty group. Scores 0.0 until a scorer is added.
    pub fn new() -> Self {
        ScorerGroup {
            scorers: Vec::new(),
            total_weight: 0.0,
        }
    }

    /// Add a scorer. A negative weight reverses its impact.
    pub fn add_scorer(&mut self, weight: f64, scorer: Box<dyn Scorer>) {
        self.scorers.push((weight, scorer));
        self.total_weight = self.scorers.iter().map(|(w, _)| w.abs()).sum();
    }

    /// Builder form of [`add_scorer`](Self::add_scorer).
    pub fn with_scorer(mut self, weight: f64, scorer: impl Scorer + 'static) -> Self {
        self.add_scorer(weight, Box::new(scorer));
        self
    }

    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }
}

impl Default for ScorerGroup {
    fn default() -> Self {
        ScorerGroup::new().with_scorer(1.0, CobeScorer::new())
    }
}

impl Scorer for ScorerGroup {
    fn score(&mut self, reply: &Reply, graph: &Graph) -> Result<f64, StoreError> {
        if self.total_weight == 0.0 {
            return Ok(0.0);
        }

        let mut score = 0.0;
        for (weight, scorer) in &mut self.scorers {
            let mut s = scorer.score(reply, graph)?;
            if *weight < 0.0 {
                s = 1.0 - s;
            }
            score += weight.abs() * s;
        }
        Ok(score / self.total_weight)
    }

    fn end(&mut self, reply: &Reply) {
        for (_, scorer) in &mut self.scorers {
            scorer.end(reply);
        }
    }
}

impl std::fmt::Debug for ScorerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerGroup")
            .field("scorers", &self.scorers.len())
            .field("total_weight", &self.total_weight)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use graph_core::NodeId;

    fn reply(edges: Vec<graph_core::EdgeId>) -> Reply {
        Reply::new(Vec::new(), Vec::new(), NodeId(1), edges)
    }

    #[test]
    fn normalize_maps_into_unit_interval() {
        assert_eq!(normalize(0.0), 0.0);
        assert_eq!(normalize(1.0), 0.5);
        assert!(normalize(1e9) < 1.0);

        let mut last = 0.0;
        for i in 0..100 {
            let n = normalize(i as f64 * 0.37);
            assert!(n >= last);
            assert!((0.0..1.0).contains(&n));
            last = n;
        }
    }

    #[test]
    fn normalize_passes_negatives() {
        assert_eq!(normalize(-1.0), -1.0);
        assert_eq!(normalize(-0.25), -0.25);
    }

    #[test]
    fn empty_group_scores_zero() {
        let graph = Graph::init_in_memory(2, "Cobe").unwrap();
        let mut group = ScorerGroup::new();
        assert!(group.is_empty());
        assert_eq!(group.score(&reply(Vec::new()), &graph).unwrap(), 0.0);
    }

    #[test]
    fn negative_weight_inverts() {
        let graph = Graph::init_in_memory(3, "Cobe").unwrap();
        let edges = testing::learn(&graph, "a b c");
        let r = reply(edges);

        let mut plain = ScorerGroup::new().with_scorer(2.0, LengthScorer);
        let mut inverted = ScorerGroup::new().with_scorer(-2.0, LengthScorer);
        let s = plain.score(&r, &graph).unwrap();
        let t = inverted.score(&r, &graph).unwrap();
        assert!((s + t - 1.0).abs() < 1e-12);

        let mut both = ScorerGroup::new()
            .with_scorer(1.0, LengthScorer)
            .with_scorer(-1.0, LengthScorer);
        assert!((both.score(&r, &graph).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn weights_are_normalized() {
        let graph = Graph::init_in_memory(3, "Cobe").unwrap();
        let r = reply(testing::learn(&graph, "a b c"));

        let mut one = ScorerGroup::new().with_scorer(1.0, LengthScorer);
        let mut ten = ScorerGroup::new().with_scorer(10.0, LengthScorer);
        let a = one.score(&r, &graph).unwrap();
        let b = ten.score(&r, &graph).unwrap();
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn reply_text_renders_spaces_from_edges() {
        let graph = Graph::init_in_memory(3, "Cobe").unwrap();
        let r = reply(testing::learn(&graph, "a b c"));
        assert_eq!(r.text(&graph).unwrap(), "a b c");
        // cached
        assert_eq!(r.text(&graph).unwrap(), "a b c");
    }

    #[test]
    fn reply_text_propagates_unknown_edge() {
        let graph = Graph::init_in_memory(3, "Cobe").unwrap();
        let r = reply(vec![graph_core::EdgeId(42)]);
        assert!(matches!(r.text(&graph), Err(StoreError::UnknownEdge(_))));
    }
}
