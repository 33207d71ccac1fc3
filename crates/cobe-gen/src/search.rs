use std::collections::HashMap;

use rand::Rng;

use graph_core::{Direction, EdgeId, NodeId};
use ngram_graph::{Graph, StoreError};

use crate::Pivot;

/// A full walk from the start boundary to the end boundary, and the node it
/// was grown from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Candidate {
    pub edges: Vec<EdgeId>,
    pub pivot_node: NodeId,
}

/// Grows full replies from random pivot nodes.
///
/// Every walk found from a node is kept: forward walks as suffixes, backward
/// walks (reversed) as prefixes. Since a node is a full context, any prefix
/// into it joins any suffix out of it, so each new half-walk pairs with every
/// opposite half seen before at the same node.
#[derive(Debug)]
pub struct CandidateSearch<'g> {
    graph: &'g Graph,
    end: NodeId,
    next_cache: HashMap<NodeId, Vec<Vec<EdgeId>>>,
    prev_cache: HashMap<NodeId, Vec<Vec<EdgeId>>>,
}

impl<'g> CandidateSearch<'g> {
    /// `end` is the all-boundary node both walks stop at.
    pub fn new(graph: &'g Graph, end: NodeId) -> Self {
        CandidateSearch {
            graph,
            end,
            next_cache: HashMap::new(),
            prev_cache: HashMap::new(),
        }
    }

    /// Draw one pivot, walk both ways from a node it leads, and return the
    /// full replies that completes. Empty when the pivot leads no node or a
    /// walk dead-ends without a cached partner.
    pub fn draw<R: Rng + ?Sized>(
        &mut self,
        pivots: &[Pivot],
        rng: &mut R,
    ) -> Result<Vec<Candidate>, StoreError> {
        if pivots.is_empty() {
            return Ok(Vec::new());
        }
        let Some(token) = pivots[rng.random_range(0..pivots.len())].choose(rng) else {
            return Ok(Vec::new());
        };
        let Some(node) = self.graph.random_node_with_leading_token(token, rng)? else {
            return Ok(Vec::new());
        };

        let next = self
            .graph
            .search_random_walk(node, self.end, Direction::Forward, rng)?;
        let prev = self
            .graph
            .search_random_walk(node, self.end, Direction::Backward, rng)?;

        let mut out = Vec::new();
        if let Some(suffix) = next {
            for prefix in self.prev_cache.get(&node).into_iter().flatten() {
                out.push(join(prefix, &suffix, node));
            }
            remember(self.next_cache.entry(node).or_default(), suffix);
        }
        if let Some(mut prefix) = prev {
            prefix.reverse();
            for suffix in self.next_cache.get(&node).into_iter().flatten() {
                out.push(join(&prefix, suffix, node));
            }
            remember(self.prev_cache.entry(node).or_default(), prefix);
        }
        Ok(out)
    }
}

fn join(prefix: &[EdgeId], suffix: &[EdgeId], pivot_node: NodeId) -> Candidate {
    let mut edges = Vec::with_capacity(prefix.len() + suffix.len());
    edges.extend_from_slice(prefix);
    edges.extend_from_slice(suffix);
    Candidate { edges, pivot_node }
}

fn remember(cache: &mut Vec<Vec<EdgeId>>, walk: Vec<EdgeId>) {
    if !cache.contains(&walk) {
        cache.push(walk);
    }
}
