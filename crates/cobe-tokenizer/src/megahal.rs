//! MegaHAL tokenization: uppercase words, digit runs, and everything else.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Tokenizer, is_space};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z']+|[0-9]+|[^A-Z'0-9]+").expect("token pattern is valid")
});

/// Tokenizer following the classic MegaHAL rules.
///
/// Input is uppercased and split into letter runs (apostrophes included),
/// digit runs, and separator runs. Text that does not already end in `.`,
/// `!`, or `?` gets a `.` appended.
#[derive(Clone, Copy, Debug, Default)]
pub struct MegaHalTokenizer;

impl Tokenizer for MegaHalTokenizer {
    /// # Examples
    ///
    /// ```
    /// use cobe_tokenizer::{MegaHalTokenizer, Tokenizer};
    ///
    /// let tokens = MegaHalTokenizer.split("Don't you think so?");
    /// assert_eq!(tokens, vec!["DON'T", " ", "YOU", " ", "THINK", " ", "SO", "?"]);
    /// ```
    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut phrase = text.to_uppercase();
        if !phrase.ends_with(['.', '!', '?']) {
            phrase.push('.');
        }

        TOKEN_RE
            .find_iter(&phrase)
            .map(|m| {
                if is_space(m.as_str()) {
                    " ".to_string()
                } else {
                    m.as_str().to_string()
                }
            })
            .collect()
    }

    /// Capitalize the first letter of the reply and the first letter after
    /// sentence punctuation and a space; lowercase every other letter.
    fn join(&self, tokens: &[String]) -> String {
        let chars: Vec<char> = tokens.concat().chars().collect();
        let mut out = String::with_capacity(chars.len());
        let mut start = true;

        for (i, &c) in chars.iter().enumerate() {
            if c.is_alphabetic() {
                if start {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                start = false;
            } else {
                if i > 2 && matches!(chars[i - 1], '.' | '?' | '!') && c.is_whitespace() {
                    start = true;
                }
                out.push(c);
            }
        }

        out
    }
}
