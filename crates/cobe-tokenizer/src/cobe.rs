use std::sync::LazyLock;

use regex::Regex;

use crate::{Tokenizer, is_space};

/// URLs, then words (hyphens and apostrophes included), then punctuation
/// clusters, then single punctuation, then whitespace runs.
///
/// A hyphen counts as a word character inside words, but a cluster made only
/// of punctuation still keeps it, so `:-(` stays one token.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+:\S+|[\w'-]+|[^\w\s][^\w]*[^\w\s]|[^\w\s]|\s+")
        .expect("token pattern is valid")
});

/// Case-preserving tokenizer.
#[derive(Clone, Copy, Debug, Default)]
pub struct CobeTokenizer;

impl CobeTokenizer {
    pub fn new() -> Self {
        CobeTokenizer
    }
}

impl Tokenizer for CobeTokenizer {
    /// Leading and trailing whitespace is stripped, so a chain never starts
    /// or ends with a space.
    fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        TOKEN_RE
            .find_iter(text)
            .map(|m| {
                if is_space(m.as_str()) {
                    " ".to_string()
                } else {
                    m.as_str().to_string()
                }
            })
            .collect()
    }

    fn join(&self, tokens: &[String]) -> String {
        tokens.concat()
    }
}
