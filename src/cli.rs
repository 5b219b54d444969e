//! CLI interface for word2vec
//!
//! Provides command-line interface for:
//! - Training a model from a text corpus
//! - Printing the default training configuration
//! - Embedding every paragraph of text files into `.fvecs` files
//! - Looking up the nearest words to a query

use crate::config::TrainConfig;
use crate::corpus::Corpus;
use crate::fvecs::{self, BvecsWriter, FvecsWriter};
use crate::model::Model;
use crate::store::{self, LoadMode};
use crate::train::Trainer;
use crate::vocab::Vocabulary;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "w2v")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train word2vec models and query word embeddings")]
#[command(
    long_about = "w2v - skip-gram / CBOW word embeddings\n\n\
    Trains dense word vectors from a plain-text corpus using hierarchical softmax\n\
    or negative sampling, and answers nearest-neighbour queries against a trained model.\n\n\
    Examples:\n\
      w2v train config > w2v.json\n\
      w2v train -C w2v.json -f corpus.txt -o model.bin\n\
      w2v lookup -m model.bin -k 10 king\n\
      w2v embedding -m model.bin paragraphs.txt"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a model from a text corpus
    #[command(
        long_about = "Train a model from a text corpus\n\n\
        The corpus is a file or a directory of files. Options not given in the\n\
        configuration file take their defaults; use `w2v train config` to see them.\n\n\
        Example:\n\
          w2v train -C w2v.json -f ./books -o books.bin -t 8"
    )]
    Train(TrainArgs),

    /// Embed each paragraph of text files into .fvecs/.bvecs files
    #[command(
        long_about = "Embed each paragraph of text files\n\n\
        Every non-empty line of each input file is embedded as the mean of its known\n\
        word vectors. Vectors are written to <name>.fvecs and the paragraph text to\n\
        <name>.bvecs next to the input. Lines without known words are skipped.\n\n\
        Example:\n\
          w2v embedding -m books.bin chapter1.txt chapter2.txt"
    )]
    Embedding {
        /// Trained model file
        #[arg(short, long, value_name = "FILE")]
        model: PathBuf,

        /// Expected vector dimension of the model
        #[arg(short = 'v', long = "vector", value_name = "DIM")]
        vector: Option<usize>,

        /// Training configuration whose delimiters split the input text
        #[arg(short = 'C', long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Memory-map the model file instead of streaming it
        #[arg(long)]
        mmap: bool,

        /// Text files to embed
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,
    },

    /// Print the nearest words to a query
    Lookup {
        /// Trained model file
        #[arg(short, long, value_name = "FILE")]
        model: PathBuf,

        /// Expected vector dimension of the model
        #[arg(short = 'v', long = "vector", value_name = "DIM")]
        vector: Option<usize>,

        /// Number of nearest words
        #[arg(short = 'k', long = "size", default_value_t = 30)]
        k: usize,

        /// Training configuration whose delimiters split the input text
        #[arg(short = 'C', long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Memory-map the model file instead of streaming it
        #[arg(long)]
        mmap: bool,

        /// Query words, joined with spaces
        #[arg(required = true, value_name = "WORDS")]
        words: Vec<String>,
    },
}

#[derive(Args, Debug)]
#[command(subcommand_negates_reqs = true, args_conflicts_with_subcommands = true)]
pub struct TrainArgs {
    #[command(subcommand)]
    pub action: Option<TrainAction>,

    /// JSON training configuration
    #[arg(short = 'C', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Training corpus, a file or a directory
    #[arg(short = 'f', long, value_name = "PATH", required = true)]
    pub corpus: Option<PathBuf>,

    /// Output model file
    #[arg(short, long, value_name = "FILE", required = true)]
    pub output: Option<PathBuf>,

    /// Number of training threads (overrides the configuration)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Random seed (overrides the configuration)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Do not report training progress
    #[arg(long)]
    pub silent: bool,

    /// Save the learned vocabulary to FILE
    #[arg(long, value_name = "FILE")]
    pub save_vocab: Option<PathBuf>,

    /// Use a saved vocabulary instead of learning one from the corpus
    #[arg(long, value_name = "FILE")]
    pub read_vocab: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum TrainAction {
    /// Print the default configuration as JSON
    Config,
}

impl TrainArgs {
    /// The configuration file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_file(path)?,
            None => TrainConfig::default(),
        };
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.verbose = !self.silent;
        Ok(config)
    }
}

/// Load a model, using the delimiters of `config` when one is given.
fn load_model(
    path: &Path,
    vector: Option<usize>,
    mmap: bool,
    config: Option<&Path>,
) -> Result<Model> {
    let mode = if mmap { LoadMode::Mapped } else { LoadMode::Buffered };
    let model = match vector {
        Some(dim) => store::load_with_dimension(path, mode, dim)?,
        None => store::load(path, mode)?,
    };
    match config {
        Some(config) => {
            let tokenizer = TrainConfig::from_file(config)?.tokenizer()?;
            Ok(model.with_tokenizer(tokenizer))
        }
        None => Ok(model),
    }
}

/// Parse the process arguments and run the selected command.
pub fn run() -> Result<()> {
    execute(Cli::parse())
}

pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Train(args) => train(args),
        Commands::Embedding {
            model,
            vector,
            config,
            mmap,
            files,
        } => {
            let model = load_model(&model, vector, mmap, config.as_deref())?;
            for file in &files {
                embedding(&model, file)?;
            }
            Ok(())
        }
        Commands::Lookup {
            model,
            vector,
            k,
            config,
            mmap,
            words,
        } => {
            let model = load_model(&model, vector, mmap, config.as_deref())?;
            let query = words.join(" ");
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for n in model.lookup(&query, k)? {
                writeln!(out, "{:>15} : {:.6}", n.word, n.distance)?;
            }
            Ok(())
        }
    }
}

fn train(args: TrainArgs) -> Result<()> {
    if let Some(TrainAction::Config) = args.action {
        let json = TrainConfig::default().to_json()?;
        println!("{json}");
        return Ok(());
    }

    let (Some(corpus_path), Some(output)) = (args.corpus.as_deref(), args.output.as_deref()) else {
        anyhow::bail!("both --corpus and --output are required");
    };

    let settings = args.resolve_config()?.validate()?;
    let trainer = match &args.read_vocab {
        Some(path) => {
            let corpus = Corpus::open(corpus_path)?;
            let vocab = Vocabulary::load(path)?;
            Trainer::with_vocabulary(settings, corpus, vocab)?
        }
        None => Trainer::new(settings, corpus_path)?,
    };

    if let Some(path) = &args.save_vocab {
        trainer.vocabulary().save(path)?;
        info!(path = %path.display(), "vocabulary saved");
    }

    let model = trainer.train()?;
    store::save(&model, output)?;
    Ok(())
}

fn embedding(model: &Model, input: &Path) -> Result<()> {
    let started = Instant::now();
    let fvecs_path = input.with_extension("fvecs");
    let bvecs_path = input.with_extension("bvecs");

    let reader = File::open(input).with_context(|| format!("cannot open {}", input.display()))?;
    let create = |path: &Path| {
        File::create(path)
            .map(BufWriter::new)
            .with_context(|| format!("cannot create {}", path.display()))
    };
    let mut vectors = FvecsWriter::new(create(&fvecs_path)?);
    let mut texts = BvecsWriter::new(create(&bvecs_path)?);

    let stats = fvecs::export_embeddings(model, BufReader::new(reader), &mut vectors, &mut texts)?;

    let elapsed = started.elapsed();
    eprintln!("==> {}", input.display());
    eprintln!("\tvectors: {}", stats.vectors);
    eprintln!("\tskipped: {}", stats.skipped);
    eprintln!("\t   time: {elapsed:?}");
    if stats.vectors > 0 {
        eprintln!("\t  op/ns: {}", elapsed.as_nanos() / stats.vectors as u128);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_requires_corpus_and_output() {
        assert!(Cli::try_parse_from(["w2v", "train"]).is_err());
        assert!(Cli::try_parse_from(["w2v", "train", "-f", "c.txt"]).is_err());
        assert!(Cli::try_parse_from(["w2v", "train", "-f", "c.txt", "-o", "m.bin"]).is_ok());
    }

    #[test]
    fn train_config_needs_no_paths() {
        let cli = Cli::try_parse_from(["w2v", "train", "config"]).unwrap();
        match cli.command {
            Commands::Train(args) => assert!(matches!(args.action, Some(TrainAction::Config))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lookup_defaults() {
        let cli = Cli::try_parse_from(["w2v", "lookup", "-m", "m.bin", "new", "york"]).unwrap();
        match cli.command {
            Commands::Lookup { k, words, mmap, vector, .. } => {
                assert_eq!(k, 30);
                assert_eq!(words, ["new", "york"]);
                assert!(!mmap);
                assert_eq!(vector, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let cli = Cli::try_parse_from([
            "w2v", "train", "-f", "c.txt", "-o", "m.bin", "-t", "3", "--seed", "42", "--silent",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        let config = args.resolve_config().unwrap();
        assert_eq!(config.threads, 3);
        assert_eq!(config.seed, 42);
        assert!(!config.verbose);
        assert_eq!(config.word.vector, 300);
    }
}
