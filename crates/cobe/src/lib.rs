//! Cobe conversational engine: learns text into an n-gram transition graph
//! stored in SQLite and replies by random walks through it.
//!
//! This is the facade crate that wires the lower-level components together:
//! - [`graph_core`]: identifier types and context slots
//! - [`ngram_graph`]: the SQLite graph store
//! - [`markov_chain`]: context windows for learning
//! - [`cobe_tokenizer`]: tokenizers and stemmers
//! - [`cobe_scoring`]: reply scorers
//! - [`cobe_gen`]: reply generation
//!
//! # Quick Start
//!
//! ```
//! use cobe::{Brain, GenerationLimit, InitOptions};
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let mut brain = Brain::in_memory(InitOptions::default(), SmallRng::seed_from_u64(42)).unwrap();
//! brain.learn("The cat sat on the mat.").unwrap();
//! brain.set_limit(GenerationLimit::Iterations(10));
//! let reply = brain.reply("Tell me about the cat.").unwrap();
//! assert_eq!(reply, "The cat sat on the mat.");
//! ```

mod error;

use std::fs;
use std::path::Path;

use rand::Rng;
use tracing::{debug, info, warn};

use cobe_gen::{ReplyInput, babble, conflate_stems, filter_pivots, generate_reply};
use cobe_tokenizer::{CobeStemmer, Stemmer, Tokenizer, is_space};
use graph_core::ChainToken;
use markov_chain::transitions;
use ngram_graph::{Durability, Graph};

pub use cobe_gen::GenerationLimit;
pub use cobe_scoring::{CobeScorer, InformationScorer, LengthScorer, Scorer, ScorerGroup};
pub use cobe_tokenizer::TokenizerKind;
pub use error::BrainError;
pub use ngram_graph::{GraphStats, StoreError};

/// Returned when nothing in the brain can answer.
pub const FALLBACK_REPLY: &str = "I don't know enough to answer you yet!";

/// Inputs shorter than this many non-blank tokens are not learned.
pub const MIN_LEARN_TOKENS: usize = 3;

/// Settings fixed when a brain is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitOptions {
    /// Context width of every node.
    pub order: usize,
    pub tokenizer: TokenizerKind,
}

impl Default for InitOptions {
    fn default() -> Self {
        InitOptions {
            order: 3,
            tokenizer: TokenizerKind::Cobe,
        }
    }
}

/// A learning, replying brain backed by one SQLite file.
///
/// Generic over the PRNG type `R`; seed it for reproducible replies.
pub struct Brain<R: Rng> {
    graph: Graph,
    tokenizer_kind: TokenizerKind,
    tokenizer: Box<dyn Tokenizer>,
    stemmer: Option<CobeStemmer>,
    scorer: ScorerGroup,
    limit: GenerationLimit,
    max_length: Option<usize>,
    batch: bool,
    rng: R,
}

impl<R: Rng> Brain<R> {
    /// Open the brain at `path`, creating a default one if the file does not
    /// exist.
    pub fn open(path: impl AsRef<Path>, rng: R) -> Result<Self, BrainError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "creating new brain");
            return Brain::init(path, InitOptions::default(), rng);
        }
        Brain::from_graph(Graph::open_path(path)?, rng)
    }

    /// Create a new brain at `path`. Fails if the file already exists.
    pub fn init(path: impl AsRef<Path>, options: InitOptions, rng: R) -> Result<Self, BrainError> {
        let path = path.as_ref();
        if path.exists() {
            return Err(BrainError::BrainExists(path.to_path_buf()));
        }
        let graph = Graph::init_path(path, options.order, options.tokenizer.name())?;
        Brain::from_graph(graph, rng)
    }

    /// A brain that lives only in memory.
    pub fn in_memory(options: InitOptions, rng: R) -> Result<Self, BrainError> {
        let graph = Graph::init_in_memory(options.order, options.tokenizer.name())?;
        Brain::from_graph(graph, rng)
    }

    /// Wrap an open graph, configuring the tokenizer and stemmer from its
    /// `info` table.
    pub fn from_graph(graph: Graph, rng: R) -> Result<Self, BrainError> {
        let tokenizer_kind = match graph.get_info_text("tokenizer")? {
            Some(name) => name.parse::<TokenizerKind>().unwrap_or_else(|_| {
                warn!(tokenizer = %name, "unknown tokenizer, using Cobe");
                TokenizerKind::Cobe
            }),
            None => {
                warn!("brain records no tokenizer, using Cobe");
                TokenizerKind::Cobe
            }
        };

        let stemmer = match graph.get_info_text("stemmer")? {
            Some(language) => Some(
                CobeStemmer::new(&language).ok_or(BrainError::UnknownStemmer(language))?,
            ),
            None => None,
        };

        debug!(
            order = graph.order(),
            tokenizer = %tokenizer_kind,
            stemmer = stemmer.as_ref().map(|s| s.language()),
            "brain ready"
        );

        Ok(Brain {
            graph,
            tokenizer_kind,
            tokenizer: tokenizer_kind.build(),
            stemmer,
            scorer: ScorerGroup::default(),
            limit: GenerationLimit::default(),
            max_length: None,
            batch: false,
            rng,
        })
    }

    /// Set how long `reply` searches.
    pub fn set_limit(&mut self, limit: GenerationLimit) {
        self.limit = limit;
    }

    /// Reject candidate replies longer than `max_length` characters.
    pub fn set_max_length(&mut self, max_length: Option<usize>) {
        self.max_length = max_length;
    }

    /// Replace the scorer ensemble.
    pub fn set_scorer(&mut self, scorer: ScorerGroup) {
        self.scorer = scorer;
    }

    /// Learn from free text.
    pub fn learn(&mut self, text: &str) -> Result<(), BrainError> {
        let tokens = self.tokenizer.split(text);
        self.learn_tokens(&tokens)
    }

    /// Learn an already tokenized sequence.
    ///
    /// Sequences with fewer than [`MIN_LEARN_TOKENS`] non-blank tokens are
    /// ignored. Whitespace tokens mark the next transition `has_space`
    /// instead of being stored. The whole sequence is written atomically.
    pub fn learn_tokens(&mut self, tokens: &[String]) -> Result<(), BrainError> {
        let words = tokens.iter().filter(|t| !t.trim().is_empty()).count();
        if words < MIN_LEARN_TOKENS {
            debug!(words, "input too short to learn");
            return Ok(());
        }

        let stem = stem_with(&self.stemmer);
        let stemmer = stem.as_ref().map(|f| f as &dyn Fn(&str) -> String);

        self.graph.atomically(|g| {
            let mut chain = Vec::with_capacity(tokens.len());
            for token in tokens {
                if token.is_empty() {
                    continue;
                }
                if is_space(token) {
                    chain.push(ChainToken::Space);
                } else {
                    chain.push(ChainToken::Token(g.get_or_create_token(token, stemmer)?));
                }
            }

            // Each step's next node is the following step's prev node.
            let mut prev_node = None;
            for step in transitions(&chain, g.order()) {
                let prev = match prev_node {
                    Some(id) => id,
                    None => g.get_node_id(step.prev.slots())?,
                };
                let next = g.get_node_id(step.next.slots())?;
                g.add_edge(prev, next, step.has_space)?;
                prev_node = Some(next);
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Learn every non-blank line of a file in one batch. Returns the number
    /// of lines read. A batch the caller already started is left open.
    pub fn learn_file(&mut self, path: impl AsRef<Path>) -> Result<usize, BrainError> {
        let content = fs::read_to_string(path.as_ref())?;
        let owns_batch = !self.batch;
        self.start_batch_learning()?;

        let mut lines = 0;
        let learned = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .try_for_each(|line| {
                lines += 1;
                self.learn(line)
            });

        if owns_batch {
            self.stop_batch_learning()?;
        }
        learned?;
        info!(lines, path = %path.as_ref().display(), "learned file");
        Ok(lines)
    }

    /// Enter batch mode: relax durability, swap the reply indexes for an
    /// insert index, and hold one transaction open until
    /// [`stop_batch_learning`](Self::stop_batch_learning).
    pub fn start_batch_learning(&mut self) -> Result<(), BrainError> {
        if self.batch {
            return Ok(());
        }
        self.graph.set_durability(Durability::Bulk)?;
        self.graph.drop_reply_indexes()?;
        self.graph.begin_transaction()?;
        self.batch = true;
        Ok(())
    }

    /// Commit the batch and restore the reply indexes and durability.
    pub fn stop_batch_learning(&mut self) -> Result<(), BrainError> {
        if !self.batch {
            return Ok(());
        }
        self.batch = false;
        self.graph.commit_transaction()?;
        self.graph.set_durability(Durability::Normal)?;
        self.graph.ensure_indexes()?;
        Ok(())
    }

    /// Whether batch mode is active.
    pub fn is_batch_learning(&self) -> bool {
        self.batch
    }

    /// Reply to `text`.
    ///
    /// Pivots on the known tokens of the input, widened to their stem
    /// classes when a stemmer is set. With no known tokens the brain babbles
    /// from random ones, and with nothing learned at all it answers
    /// [`FALLBACK_REPLY`].
    pub fn reply(&mut self, text: &str) -> Result<String, BrainError> {
        let tokens = self.tokenizer.split(text);
        let mut token_ids = Vec::with_capacity(tokens.len());
        for token in &tokens {
            if let Some(id) = self.graph.token_id(token)? {
                token_ids.push(id);
            }
        }

        let mut pivots = filter_pivots(&self.graph, &token_ids)?;
        if let Some(stem) = stem_with(&self.stemmer) {
            conflate_stems(&self.graph, &mut pivots, &tokens, &stem)?;
        }
        if pivots.is_empty() {
            debug!("no known tokens in input, babbling");
            pivots = babble(&self.graph, &mut self.rng)?;
        }

        let input = ReplyInput { tokens, token_ids };
        let best = generate_reply(
            &self.graph,
            &input,
            &pivots,
            &mut self.scorer,
            &self.limit,
            self.max_length,
            &mut self.rng,
        )?;

        let Some(best) = best else {
            return Ok(FALLBACK_REPLY.to_string());
        };
        let text = best.text(&self.graph)?.to_string();
        debug!(reply = %preview(&text), "chose reply");
        Ok(text)
    }

    /// Format reply text for display with the brain's tokenizer. MegaHAL
    /// brains get sentence case; Cobe text is unchanged.
    pub fn display(&self, reply: &str) -> String {
        self.tokenizer.join(&[reply.to_string()])
    }

    /// Stem every token with a Snowball stemmer for `language`, replacing
    /// any previous stems.
    pub fn set_stemmer(&mut self, language: &str) -> Result<(), BrainError> {
        let stemmer = CobeStemmer::new(language)
            .ok_or_else(|| BrainError::UnknownStemmer(language.to_string()))?;

        self.graph.atomically(|g| {
            g.delete_token_stems()?;
            g.update_token_stems(&|token| stemmer.stem(token))?;
            g.set_info_text("stemmer", Some(stemmer.language()))
        })?;
        info!(language = stemmer.language(), "stemmer set");
        self.stemmer = Some(stemmer);
        Ok(())
    }

    /// Remove the stemmer and every stem.
    pub fn del_stemmer(&mut self) -> Result<(), BrainError> {
        self.graph.atomically(|g| {
            g.delete_token_stems()?;
            g.set_info_text("stemmer", None)
        })?;
        info!("stemmer removed");
        self.stemmer = None;
        Ok(())
    }

    /// Name of the active stemmer's language.
    pub fn stemmer_language(&self) -> Option<&'static str> {
        self.stemmer.as_ref().map(|s| s.language())
    }

    pub fn tokenizer_kind(&self) -> TokenizerKind {
        self.tokenizer_kind
    }

    pub fn order(&self) -> usize {
        self.graph.order()
    }

    /// Token, node, and edge counts.
    pub fn stats(&self) -> Result<GraphStats, BrainError> {
        Ok(self.graph.stats()?)
    }

    /// The underlying graph store (for inspection/testing).
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

impl<R: Rng> Drop for Brain<R> {
    fn drop(&mut self) {
        if self.batch {
            warn!("brain dropped in batch mode, committing");
            if let Err(err) = self.stop_batch_learning() {
                warn!(error = %err, "failed to commit batch");
            }
        }
    }
}

fn stem_with(stemmer: &Option<CobeStemmer>) -> Option<impl Fn(&str) -> String + '_> {
    stemmer.as_ref().map(|s| move |token: &str| s.stem(token))
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(60) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
