//! Reply generation: pivots, bidirectional random walks, and time-boxed
//! candidate selection.
//!
//! 1. **Pivot** on the known tokens of the input (see [`filter_pivots`],
//!    [`conflate_stems`], and [`babble`]).
//! 2. **Search**: draw a pivot, pick a random node it leads, and walk
//!    forward and backward from that node to the boundary. Half-walks are
//!    cached per node and recombined, so one draw can finish several replies
//!    ([`CandidateSearch`]).
//! 3. **Score** every full reply with a [`Scorer`], once per distinct edge
//!    sequence, and keep the best.
//! 4. **Stop** when the [`GenerationLimit`] is reached. The limit is checked
//!    after each candidate, never in the middle of one, so the first
//!    candidate is always considered.

mod pivots;
mod search;

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use cobe_scoring::{Reply, Scorer};
use graph_core::{ContextSlot, EdgeId, TokenId};
use ngram_graph::{Graph, StoreError};

pub use pivots::{BABBLE_TOKENS, Pivot, babble, conflate_stems, filter_pivots};
pub use search::{Candidate, CandidateSearch};

/// Controls how long the reply loop keeps producing candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationLimit {
    /// Stop once the given time has elapsed.
    Timeout(Duration),
    /// Stop after the given number of iterations. An iteration is one
    /// candidate, or one draw that produced none.
    Iterations(usize),
    /// Stop when either limit is reached.
    Both {
        timeout: Duration,
        max_iterations: usize,
    },
}

impl Default for GenerationLimit {
    fn default() -> Self {
        GenerationLimit::Timeout(Duration::from_millis(500))
    }
}

impl GenerationLimit {
    fn reached(&self, started: Instant, iterations: usize) -> bool {
        match self {
            GenerationLimit::Timeout(d) => started.elapsed() >= *d,
            GenerationLimit::Iterations(n) => iterations >= *n,
            GenerationLimit::Both {
                timeout,
                max_iterations,
            } => started.elapsed() >= *timeout || iterations >= *max_iterations,
        }
    }
}

/// The input a reply answers.
#[derive(Debug, Clone, Default)]
pub struct ReplyInput {
    pub tokens: Vec<String>,
    pub token_ids: Vec<TokenId>,
}

/// Generate the best-scoring reply grown from `pivots`.
///
/// Returns `None` when no candidate was produced: the pivot set is empty,
/// the store has never learned a chain, or every candidate was longer than
/// `max_length` characters. Otherwise calls [`Scorer::end`] with the winner
/// and returns it.
pub fn generate_reply<R: Rng + ?Sized>(
    graph: &Graph,
    input: &ReplyInput,
    pivots: &BTreeSet<Pivot>,
    scorer: &mut dyn Scorer,
    limit: &GenerationLimit,
    max_length: Option<usize>,
    rng: &mut R,
) -> Result<Option<Reply>, StoreError> {
    if pivots.is_empty() {
        return Ok(None);
    }
    let boundary = vec![ContextSlot::Boundary; graph.order()];
    let Some(end) = graph.find_node_id(&boundary)? else {
        return Ok(None);
    };

    let pivots: Vec<Pivot> = pivots.iter().cloned().collect();
    let mut search = CandidateSearch::new(graph, end);
    let mut scores: HashMap<Vec<EdgeId>, f64> = HashMap::new();
    let mut best: Option<Reply> = None;
    let mut best_score = -1.0;
    let mut produced = 0usize;
    let mut iterations = 0usize;
    let started = Instant::now();

    'generate: loop {
        let candidates = search.draw(&pivots, rng)?;
        if candidates.is_empty() {
            iterations += 1;
            if limit.reached(started, iterations) {
                break;
            }
            continue;
        }

        for Candidate { edges, pivot_node } in candidates {
            iterations += 1;
            let reply = Reply::new(
                input.tokens.clone(),
                input.token_ids.clone(),
                pivot_node,
                edges,
            );

            let too_long = match max_length {
                Some(max) => reply.text(graph)?.chars().count() > max,
                None => false,
            };
            if !too_long {
                produced += 1;
                let score = match scores.entry(reply.edge_ids().to_vec()) {
                    // already seen
                    Entry::Occupied(_) => -1.0,
                    Entry::Vacant(slot) => *slot.insert(scorer.score(&reply, graph)?),
                };
                if score > best_score {
                    best_score = score;
                    best = Some(reply);
                }
            }

            if limit.reached(started, iterations) {
                break 'generate;
            }
        }
    }

    debug!(
        produced,
        unique = scores.len(),
        best_score,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generated replies"
    );

    if let Some(reply) = &best {
        scorer.end(reply);
    }
    Ok(best)
}

#[cfg(test)]
pub(crate) mod testing {
    use graph_core::{ChainToken, ContextSlot, EdgeId, NodeId};
    use markov_chain::transitions;
    use ngram_graph::Graph;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    pub fn make_rng(s: u64) -> SmallRng {
        SmallRng::seed_from_u64(s)
    }

    /// Learn whitespace-separated words and return the edges walked.
    pub fn learn(graph: &Graph, text: &str) -> Vec<EdgeId> {
        let mut tokens = Vec::new();
        for (i, word) in text.split(' ').enumerate() {
            if i > 0 {
                tokens.push(ChainToken::Space);
            }
            tokens.push(ChainToken::Token(graph.get_or_create_token(word, None).unwrap()));
        }

        let mut edges = Vec::new();
        for step in transitions(&tokens, graph.order()) {
            let prev = graph.get_node_id(step.prev.slots()).unwrap();
            let next = graph.get_node_id(step.next.slots()).unwrap();
            edges.push(graph.add_edge(prev, next, step.has_space).unwrap());
        }
        edges
    }

    pub fn end_node(graph: &Graph) -> NodeId {
        graph
            .find_node_id(&vec![ContextSlot::Boundary; graph.order()])
            .unwrap()
            .unwrap()
    }
}
