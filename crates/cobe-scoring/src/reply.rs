use std::cell::OnceCell;

use graph_core::{EdgeId, NodeId, TokenId};
use ngram_graph::{Graph, StoreError};

/// One candidate reply: a full walk from the start boundary to the end
/// boundary, plus the input it answers.
#[derive(Debug, Clone)]
pub struct Reply {
    tokens: Vec<String>,
    token_ids: Vec<TokenId>,
    pivot_node: NodeId,
    edge_ids: Vec<EdgeId>,
    text: OnceCell<String>,
}

impl Reply {
    pub fn new(
        tokens: Vec<String>,
        token_ids: Vec<TokenId>,
        pivot_node: NodeId,
        edge_ids: Vec<EdgeId>,
    ) -> Self {
        Reply {
            tokens,
            token_ids,
            pivot_node,
            edge_ids,
            text: OnceCell::new(),
        }
    }

    /// The input tokens this reply answers.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Known ids among the input tokens.
    pub fn token_ids(&self) -> &[TokenId] {
        &self.token_ids
    }

    /// The node the walk was grown from.
    pub fn pivot_node(&self) -> NodeId {
        self.pivot_node
    }

    pub fn edge_ids(&self) -> &[EdgeId] {
        &self.edge_ids
    }

    /// Render the reply, caching the result.
    ///
    /// Each edge contributes the trailing token of its source context,
    /// followed by a space when the edge crossed whitespace.
    pub fn text(&self, graph: &Graph) -> Result<&str, StoreError> {
        if let Some(text) = self.text.get() {
            return Ok(text);
        }

        let mut text = String::new();
        for &edge in &self.edge_ids {
            let (word, has_space) = graph.edge_text(edge)?;
            text.push_str(&word);
            if has_space {
                text.push(' ');
            }
        }
        Ok(self.text.get_or_init(|| text))
    }
}
