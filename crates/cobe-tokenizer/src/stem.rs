use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::Algorithm;

static SMILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":-?[ )]*\)").expect("smile pattern is valid"));
static FROWN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":-?[' (]*\(").expect("frown pattern is valid"));
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w").expect("word pattern is valid"));

/// Maps a token to its canonical form. Must be a pure function of the text.
pub trait Stemmer {
    fn stem(&self, token: &str) -> String;
}

/// Snowball stemmer that produces lowercase stems and folds common
/// emoticons into `:)` and `:(`.
pub struct CobeStemmer {
    language: &'static str,
    stemmer: rust_stemmers::Stemmer,
}

impl CobeStemmer {
    /// Build a stemmer for a Snowball language name such as `"english"`.
    /// Returns `None` for a language Snowball does not cover.
    pub fn new(language: &str) -> Option<Self> {
        let (language, algorithm) = algorithm_for(language)?;
        Some(CobeStemmer {
            language,
            stemmer: rust_stemmers::Stemmer::create(algorithm),
        })
    }

    /// The normalized language name, as stored in the brain.
    pub fn language(&self) -> &'static str {
        self.language
    }

    fn stem_nonword(token: &str) -> String {
        if SMILE_RE.is_match(token) {
            ":)".to_string()
        } else if FROWN_RE.is_match(token) {
            ":(".to_string()
        } else {
            token.to_string()
        }
    }
}

impl Stemmer for CobeStemmer {
    fn stem(&self, token: &str) -> String {
        if !WORD_RE.is_match(token) {
            return Self::stem_nonword(token);
        }
        self.stemmer.stem(&token.to_lowercase()).into_owned()
    }
}

impl fmt::Debug for CobeStemmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CobeStemmer")
            .field("language", &self.language)
            .finish()
    }
}

fn algorithm_for(name: &str) -> Option<(&'static str, Algorithm)> {
    let found = match name.trim().to_ascii_lowercase().as_str() {
        "arabic" => ("arabic", Algorithm::Arabic),
        "danish" => ("danish", Algorithm::Danish),
        "dutch" => ("dutch", Algorithm::Dutch),
        "english" => ("english", Algorithm::English),
        "finnish" => ("finnish", Algorithm::Finnish),
        "french" => ("french", Algorithm::French),
        "german" => ("german", Algorithm::German),
        "greek" => ("greek", Algorithm::Greek),
        "hungarian" => ("hungarian", Algorithm::Hungarian),
        "italian" => ("italian", Algorithm::Italian),
        "norwegian" => ("norwegian", Algorithm::Norwegian),
        "portuguese" => ("portuguese", Algorithm::Portuguese),
        "romanian" => ("romanian", Algorithm::Romanian),
        "russian" => ("russian", Algorithm::Russian),
        "spanish" => ("spanish", Algorithm::Spanish),
        "swedish" => ("swedish", Algorithm::Swedish),
        "tamil" => ("tamil", Algorithm::Tamil),
        "turkish" => ("turkish", Algorithm::Turkish),
        _ => return None,
    };
    Some(found)
}
