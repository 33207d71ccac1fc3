//! Integration tests for the cobe brain: persistence, learning, replying, and
//! stemmer administration against brains stored in temporary files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cobe::{
    Brain, BrainError, FALLBACK_REPLY, GenerationLimit, InitOptions, StoreError, TokenizerKind,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tempfile::TempDir;

/// Path to the sample corpus bundled with the repo.
fn corpus() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/corpus.txt")
}

fn make_rng(s: u64) -> SmallRng {
    SmallRng::seed_from_u64(s)
}

fn open(path: &Path, seed: u64) -> Brain<SmallRng> {
    let mut brain = Brain::open(path, make_rng(seed)).expect("open brain");
    brain.set_limit(GenerationLimit::Iterations(50));
    brain
}

/// A brain file trained on the sample corpus.
fn trained_brain_file() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cobe.brain");
    let mut brain = open(&path, 1);
    brain.learn_file(corpus()).unwrap();
    (dir, path)
}

// ---------------------------------------------------------------------------
// Creation and persistence
// ---------------------------------------------------------------------------

#[test]
fn open_creates_default_brain() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("new.brain");
    assert!(!path.exists());

    let brain = open(&path, 1);
    assert!(path.exists());
    assert_eq!(brain.order(), 3);
    assert_eq!(brain.tokenizer_kind(), TokenizerKind::Cobe);
    assert_eq!(brain.stemmer_language(), None);
    // Only the end token exists.
    assert_eq!(brain.stats().unwrap().tokens, 1);
}

#[test]
fn init_refuses_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taken.brain");
    std::fs::write(&path, b"").unwrap();

    let err = Brain::init(&path, InitOptions::default(), make_rng(1))
        .err()
        .expect("init over an existing file must fail");
    assert!(matches!(err, BrainError::BrainExists(ref p) if p == &path));
}

#[test]
fn init_options_persist() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("megahal.brain");
    let options = InitOptions {
        order: 2,
        tokenizer: TokenizerKind::MegaHal,
    };
    drop(Brain::init(&path, options, make_rng(1)).unwrap());

    let brain = open(&path, 1);
    assert_eq!(brain.order(), 2);
    assert_eq!(brain.tokenizer_kind(), TokenizerKind::MegaHal);
}

#[test]
fn learned_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cobe.brain");
    {
        let mut brain = open(&path, 1);
        brain.learn("a b c").unwrap();
    }

    let mut brain = open(&path, 2);
    assert_eq!(brain.stats().unwrap().edges, 6);
    assert_eq!(brain.reply("b").unwrap(), "a b c");
}

#[test]
fn other_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old.brain");
    {
        let brain = open(&path, 1);
        brain.graph().set_info_text("version", Some("1")).unwrap();
    }

    let err = Brain::open(&path, make_rng(1)).err().expect("version mismatch");
    match err {
        BrainError::Store(StoreError::IncompatibleVersion { found }) => {
            assert_eq!(found.as_deref(), Some("1"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_tokenizer_falls_back_to_cobe() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("odd.brain");
    {
        let brain = open(&path, 1);
        brain.graph().set_info_text("tokenizer", Some("Whitespace")).unwrap();
    }

    let brain = open(&path, 1);
    assert_eq!(brain.tokenizer_kind(), TokenizerKind::Cobe);
}

// ---------------------------------------------------------------------------
// Learning
// ---------------------------------------------------------------------------

#[test]
fn short_input_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut brain = open(&dir.path().join("cobe.brain"), 1);
    let before = brain.stats().unwrap();

    brain.learn("hello there").unwrap();
    brain
        .learn_tokens(&["a".to_string(), " ".to_string(), "b".to_string()])
        .unwrap();
    assert_eq!(brain.stats().unwrap(), before);
}

#[test]
fn token_sequence_round_trips() {
    let dir = TempDir::new().unwrap();
    let mut brain = open(&dir.path().join("cobe.brain"), 1);
    let tokens: Vec<String> = ["a", " ", "b", " ", "c"].iter().map(|t| t.to_string()).collect();
    brain.learn_tokens(&tokens).unwrap();

    assert_eq!(brain.reply("a").unwrap(), "a b c");
    assert_eq!(brain.reply("c").unwrap(), "a b c");
}

#[test]
fn relearning_increments_counts() {
    let dir = TempDir::new().unwrap();
    let mut brain = open(&dir.path().join("cobe.brain"), 1);
    brain.learn("a b c").unwrap();
    let once = brain.stats().unwrap();
    brain.learn("a b c").unwrap();

    assert_eq!(brain.stats().unwrap(), once);
    assert!(brain.graph().inconsistent_nodes().unwrap().is_empty());
}

#[test]
fn node_counts_match_incoming_edges() {
    let (_dir, path) = trained_brain_file();
    let brain = open(&path, 1);
    assert!(brain.stats().unwrap().edges > 100);
    assert!(brain.graph().inconsistent_nodes().unwrap().is_empty());
}

#[test]
fn batch_learning_restores_indexes() {
    let (_dir, path) = trained_brain_file();
    let brain = open(&path, 1);
    let indexes = brain.graph().index_names().unwrap();
    assert!(indexes.contains(&"edges_all_next".to_string()));
    assert!(indexes.contains(&"edges_all_prev".to_string()));
    assert!(!indexes.contains(&"learn_index".to_string()));
}

#[test]
fn learn_file_counts_lines() {
    let dir = TempDir::new().unwrap();
    let mut brain = open(&dir.path().join("cobe.brain"), 1);
    assert_eq!(brain.learn_file(corpus()).unwrap(), 30);
    assert!(!brain.is_batch_learning());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let mut brain = open(&dir.path().join("cobe.brain"), 1);
    let err = brain.learn_file(dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, BrainError::Io(_)));
}

#[test]
fn dropping_in_batch_mode_commits() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cobe.brain");
    {
        let mut brain = open(&path, 1);
        brain.start_batch_learning().unwrap();
        brain.learn("the cat sat down").unwrap();
    }

    let brain = open(&path, 1);
    assert!(brain.stats().unwrap().edges > 0);
    assert!(brain.graph().index_names().unwrap().contains(&"edges_all_next".to_string()));
}

// ---------------------------------------------------------------------------
// Replying
// ---------------------------------------------------------------------------

#[test]
fn empty_brain_falls_back() {
    let dir = TempDir::new().unwrap();
    let mut brain = open(&dir.path().join("cobe.brain"), 1);
    assert_eq!(brain.reply("Hello, anyone?").unwrap(), FALLBACK_REPLY);
    assert_eq!(brain.reply("").unwrap(), FALLBACK_REPLY);
}

#[test]
fn reply_pivots_on_known_words() {
    let (_dir, path) = trained_brain_file();
    let mut brain = open(&path, 3);
    let reply = brain.reply("zebra piano").unwrap();
    assert!(reply.contains("piano"), "reply {reply:?} should contain the pivot");
}

#[test]
fn unknown_input_babbles() {
    let (_dir, path) = trained_brain_file();
    let mut brain = open(&path, 4);
    let reply = brain.reply("xyzzy plugh").unwrap();
    assert_ne!(reply, FALLBACK_REPLY);
    assert!(!reply.is_empty());
}

#[test]
fn seeded_replies_are_reproducible() {
    let (_dir, path) = trained_brain_file();
    let first = open(&path, 99).reply("the dog and the cat").unwrap();
    let second = open(&path, 99).reply("the dog and the cat").unwrap();
    assert_eq!(first, second);
}

#[test]
fn zero_timeout_still_answers() {
    let dir = TempDir::new().unwrap();
    let mut brain = open(&dir.path().join("cobe.brain"), 1);
    brain.learn("a b c").unwrap();
    brain.set_limit(GenerationLimit::Timeout(Duration::ZERO));
    assert_eq!(brain.reply("b").unwrap(), "a b c");
}

#[test]
fn max_length_can_reject_everything() {
    let (_dir, path) = trained_brain_file();
    let mut brain = open(&path, 5);
    brain.set_max_length(Some(4));
    assert_eq!(brain.reply("the cat").unwrap(), FALLBACK_REPLY);

    brain.set_max_length(Some(10_000));
    assert_ne!(brain.reply("the cat").unwrap(), FALLBACK_REPLY);
}

// ---------------------------------------------------------------------------
// Stemming
// ---------------------------------------------------------------------------

#[test]
fn stemmer_persists_and_indexes_tokens() {
    let (_dir, path) = trained_brain_file();
    {
        let mut brain = open(&path, 1);
        brain.set_stemmer("english").unwrap();
        assert_eq!(brain.stemmer_language(), Some("english"));
    }

    let brain = open(&path, 1);
    assert_eq!(brain.stemmer_language(), Some("english"));
    let graph = brain.graph();
    let class = graph.token_ids_with_stem("cat").unwrap();
    for text in ["cat", "Cats", "cats"] {
        let id = graph.token_id(text).unwrap().unwrap();
        assert!(class.contains(&id), "{text} should stem to cat");
    }
}

#[test]
fn stemmed_pivots_match_other_spellings() {
    let (_dir, path) = trained_brain_file();
    let mut brain = open(&path, 6);
    brain.set_stemmer("english").unwrap();

    // "CATS" was never learned, but it shares a stem with "cat".
    let reply = brain.reply("CATS").unwrap();
    assert!(
        reply.to_lowercase().contains("cat"),
        "reply {reply:?} should pivot on a cat spelling"
    );
}

#[test]
fn new_tokens_are_stemmed_after_set() {
    let dir = TempDir::new().unwrap();
    let mut brain = open(&dir.path().join("cobe.brain"), 1);
    brain.set_stemmer("english").unwrap();
    brain.learn("jumping frogs jumped").unwrap();

    let class = brain.graph().token_ids_with_stem("jump").unwrap();
    assert_eq!(class.len(), 2);
}

#[test]
fn del_stemmer_clears_stems() {
    let (_dir, path) = trained_brain_file();
    {
        let mut brain = open(&path, 1);
        brain.set_stemmer("english").unwrap();
        brain.del_stemmer().unwrap();
        assert_eq!(brain.stemmer_language(), None);
        assert!(brain.graph().token_ids_with_stem("cat").unwrap().is_empty());
    }

    let brain = open(&path, 1);
    assert_eq!(brain.stemmer_language(), None);
    assert_eq!(brain.graph().get_info_text("stemmer").unwrap(), None);
}

#[test]
fn unknown_stemmer_language_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut brain = open(&dir.path().join("cobe.brain"), 1);
    assert!(matches!(
        brain.set_stemmer("klingon"),
        Err(BrainError::UnknownStemmer(_))
    ));
}
