//! Cobe CLI: create, train, and talk to a brain file.
//!
//! Thin wrapper over the `cobe` library crate.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};
use cobe::{Brain, BrainError, GenerationLimit, InitOptions, TokenizerKind};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Cobe: a conversational Markov-chain text generator.
#[derive(Parser, Debug)]
#[command(name = "cobe", version, about)]
struct Cli {
    /// Brain file to use.
    #[arg(long, global = true, default_value = "cobe.brain")]
    brain: PathBuf,

    /// PRNG seed for reproducible output.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log filter, e.g. `debug` or `cobe_gen=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new brain file.
    Init {
        /// Context width of the n-gram graph.
        #[arg(long, default_value_t = 3)]
        order: usize,

        /// Tokenizer to record in the brain (Cobe or MegaHAL). Unknown names
        /// fall back to Cobe.
        #[arg(long, default_value = "Cobe")]
        tokenizer: String,
    },

    /// Learn every non-empty line of the given files.
    Learn {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print one reply to the given text.
    Reply {
        text: String,

        #[command(flatten)]
        limit: LimitArgs,
    },

    /// Interactive session: learn each line, then reply to it.
    Console {
        #[command(flatten)]
        limit: LimitArgs,
    },

    /// Stem all tokens with a Snowball stemmer for the language.
    SetStemmer { language: String },

    /// Remove the stemmer and all stems.
    DelStemmer,
}

#[derive(Args, Debug)]
struct LimitArgs {
    /// Reply search timeout in milliseconds.
    #[arg(long, default_value_t = 500)]
    timeout_ms: u64,

    /// Maximum candidate draws (0 = no limit).
    #[arg(long, default_value_t = 0)]
    max_iterations: usize,

    /// Reject replies longer than this many characters.
    #[arg(long)]
    max_length: Option<usize>,
}

impl LimitArgs {
    fn limit(&self) -> GenerationLimit {
        match (self.timeout_ms, self.max_iterations) {
            (ms, 0) => GenerationLimit::Timeout(Duration::from_millis(ms)),
            (0, n) => GenerationLimit::Iterations(n),
            (ms, n) => GenerationLimit::Both {
                timeout: Duration::from_millis(ms),
                max_iterations: n,
            },
        }
    }

    fn apply(&self, brain: &mut Brain<SmallRng>) {
        brain.set_limit(self.limit());
        brain.set_max_length(self.max_length);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("cobe: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BrainError> {
    let seed = cli.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    });
    let rng = SmallRng::seed_from_u64(seed);

    match cli.command {
        Command::Init { order, tokenizer } => {
            let tokenizer = tokenizer.parse::<TokenizerKind>().unwrap_or_else(|err| {
                warn!(error = %err, "unknown tokenizer, using Cobe");
                TokenizerKind::Cobe
            });
            let brain = Brain::init(&cli.brain, InitOptions { order, tokenizer }, rng)?;
            println!(
                "Initialized {} (order {}, tokenizer {})",
                cli.brain.display(),
                brain.order(),
                brain.tokenizer_kind()
            );
        }
        Command::Learn { files } => {
            let mut brain = Brain::open(&cli.brain, rng)?;
            for file in &files {
                let lines = brain.learn_file(file)?;
                println!("Learned {lines} lines from {}", file.display());
            }
            let stats = brain.stats()?;
            println!(
                "{} tokens, {} nodes, {} edges",
                stats.tokens, stats.nodes, stats.edges
            );
        }
        Command::Reply { text, limit } => {
            let mut brain = Brain::open(&cli.brain, rng)?;
            limit.apply(&mut brain);
            let reply = brain.reply(&text)?;
            println!("{}", brain.display(&reply));
        }
        Command::Console { limit } => {
            let mut brain = Brain::open(&cli.brain, rng)?;
            limit.apply(&mut brain);
            console(&mut brain)?;
        }
        Command::SetStemmer { language } => {
            let mut brain = Brain::open(&cli.brain, rng)?;
            brain.set_stemmer(&language)?;
            println!("Stemmer set to {language}");
        }
        Command::DelStemmer => {
            let mut brain = Brain::open(&cli.brain, rng)?;
            brain.del_stemmer()?;
            println!("Stemmer removed");
        }
    }
    Ok(())
}

fn console(brain: &mut Brain<SmallRng>) -> Result<(), BrainError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }

        brain.learn(trimmed)?;
        let reply = brain.reply(trimmed)?;
        writeln!(stdout, "cobe: {}", brain.display(&reply))?;
        stdout.flush()?;
    }

    Ok(())
}
