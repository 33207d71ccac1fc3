//! Choosing the tokens a reply is grown from.

use std::collections::BTreeSet;

use rand::Rng;

use graph_core::TokenId;
use ngram_graph::{Graph, StoreError};

/// How many random tokens to try when no input token is recognized.
pub const BABBLE_TOKENS: usize = 5;

/// One member of a pivot set.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Pivot {
    /// A single known token.
    Token(TokenId),
    /// Every token sharing one stem. Drawing it picks one member.
    StemClass(Vec<TokenId>),
}

impl Pivot {
    /// Pick the token to search from.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<TokenId> {
        match self {
            Pivot::Token(id) => Some(*id),
            Pivot::StemClass(ids) if ids.is_empty() => None,
            Pivot::StemClass(ids) => Some(ids[rng.random_range(0..ids.len())]),
        }
    }
}

/// Known input tokens to pivot on: word tokens if there are any, otherwise
/// every known token.
pub fn filter_pivots(graph: &Graph, token_ids: &[TokenId]) -> Result<BTreeSet<Pivot>, StoreError> {
    let mut ids = graph.filter_word_tokens(token_ids)?;
    if ids.is_empty() {
        ids = graph.filter_known_tokens(token_ids)?;
    }
    Ok(ids.into_iter().map(Pivot::Token).collect())
}

/// Replace input tokens with the full class of tokens sharing their stem.
///
/// A stem class supersedes the individual ids it contains.
pub fn conflate_stems(
    graph: &Graph,
    pivots: &mut BTreeSet<Pivot>,
    tokens: &[String],
    stemmer: &dyn Fn(&str) -> String,
) -> Result<(), StoreError> {
    for token in tokens {
        let ids = graph.token_ids_with_stem(&stemmer(token))?;
        if ids.is_empty() {
            continue;
        }
        for id in &ids {
            pivots.remove(&Pivot::Token(*id));
        }
        pivots.insert(Pivot::StemClass(ids));
    }
    Ok(())
}

/// Sample [`BABBLE_TOKENS`] random tokens from the store. Empty only when
/// the store holds no tokens besides the end token.
pub fn babble<R: Rng + ?Sized>(graph: &Graph, rng: &mut R) -> Result<BTreeSet<Pivot>, StoreError> {
    let mut pivots = BTreeSet::new();
    for _ in 0..BABBLE_TOKENS {
        if let Some(id) = graph.random_token(rng)? {
            pivots.insert(Pivot::Token(id));
        }
    }
    Ok(pivots)
}
