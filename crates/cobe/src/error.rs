use std::io;
use std::path::PathBuf;

use ngram_graph::StoreError;
use thiserror::Error;

/// Failures surfaced by a [`Brain`](crate::Brain).
#[derive(Debug, Error)]
pub enum BrainError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// No Snowball stemmer exists for the language.
    #[error("unknown stemmer language {0:?}")]
    UnknownStemmer(String),

    /// `init` refuses to touch an existing file.
    #[error("brain file already exists: {}", .0.display())]
    BrainExists(PathBuf),
}
