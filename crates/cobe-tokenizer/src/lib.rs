//! Text tokenization and stemming for the cobe brain.
//!
//! A [`Tokenizer`] splits free text into an alternating sequence of word
//! tokens and separator tokens. Runs of whitespace come out as a single `" "`
//! token, which the brain turns into the `has_space` flag of a transition
//! instead of storing it. Two tokenizers are provided:
//!
//! - [`CobeTokenizer`]: case-preserving, keeps URLs, hyphenated words, and
//!   punctuation clusters such as `:-(` whole;
//! - [`MegaHalTokenizer`]: the classic MegaHAL rules, uppercasing everything
//!   and forcing sentence-terminal punctuation.
//!
//! A [`Stemmer`] maps a token to a canonical form so replies can pivot on
//! every spelling of a word.
//!
//! # Examples
//!
//! ```
//! use cobe_tokenizer::{CobeTokenizer, Tokenizer};
//!
//! let tokens = CobeTokenizer::new().split("hi,   there");
//! assert_eq!(tokens, vec!["hi", ",", " ", "there"]);
//! ```

mod cobe;
mod megahal;
mod stem;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use cobe::CobeTokenizer;
pub use megahal::MegaHalTokenizer;
pub use stem::{CobeStemmer, Stemmer};

/// Splits text into tokens and renders tokens back into text.
pub trait Tokenizer {
    /// Split `text` into tokens. Whitespace runs become `" "`.
    fn split(&self, text: &str) -> Vec<String>;

    /// Render tokens back into display text.
    fn join(&self, tokens: &[String]) -> String;
}

/// Which tokenizer a brain was created with. Stored in the brain's `info`
/// table under `tokenizer`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TokenizerKind {
    #[default]
    Cobe,
    #[serde(rename = "MegaHAL")]
    MegaHal,
}

impl TokenizerKind {
    /// The name recorded in the store.
    pub fn name(self) -> &'static str {
        match self {
            TokenizerKind::Cobe => "Cobe",
            TokenizerKind::MegaHal => "MegaHAL",
        }
    }

    /// Build the tokenizer this kind names.
    pub fn build(self) -> Box<dyn Tokenizer> {
        match self {
            TokenizerKind::Cobe => Box::new(CobeTokenizer::new()),
            TokenizerKind::MegaHal => Box::new(MegaHalTokenizer),
        }
    }
}

impl fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for a tokenizer name that is not recognized.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownTokenizer(pub String);

impl fmt::Display for UnknownTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tokenizer {:?}", self.0)
    }
}

impl std::error::Error for UnknownTokenizer {}

impl FromStr for TokenizerKind {
    type Err = UnknownTokenizer;

    /// Names match case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cobe" => Ok(TokenizerKind::Cobe),
            "megahal" => Ok(TokenizerKind::MegaHal),
            _ => Err(UnknownTokenizer(s.to_string())),
        }
    }
}

/// Whether a token consists only of whitespace.
pub fn is_space(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_whitespace)
}
