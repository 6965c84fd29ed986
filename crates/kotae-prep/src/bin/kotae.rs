//! Kotae command-line interface.
//!
//! Prepares record stores from segmented QA corpora, scores model output,
//! and inspects record stores.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kotae_core::config::{Paths, PrepareConfig, Split};
use kotae_prep::{inspect_store, prepare, run_evaluation};
use tracing::{Level, info};

/// CLI arguments
#[derive(Parser)]
#[command(name = "kotae")]
#[command(about = "Prepare reading-comprehension corpora and score span predictions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true, env = "KOTAE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding corpora and outputs (replaces the configured paths)
    #[arg(short = 'D', long, global = true, env = "KOTAE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log at DEBUG level
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build vocabularies, embeddings and record stores for all splits
    Prepare {
        /// Context token limit for train/dev
        #[arg(long)]
        para_limit: Option<usize>,
        /// Question token limit for train/dev
        #[arg(long)]
        ques_limit: Option<usize>,
        /// Answer span limit for train/dev
        #[arg(long)]
        ans_limit: Option<usize>,
        /// Character grid columns
        #[arg(long)]
        char_limit: Option<usize>,
        /// Embedding dimensionality (1..=200)
        #[arg(long)]
        vec_size: Option<usize>,
        /// Seed for shuffling and random embeddings
        #[arg(long)]
        seed: Option<u64>,
        /// Reuse word indices instead of character grids
        #[arg(long)]
        no_char_emb: bool,
        /// Keep examples in corpus order
        #[arg(long)]
        no_shuffle: bool,
        /// Pretrained word vectors
        #[arg(long)]
        word_emb: Option<PathBuf>,
        /// Pretrained char vectors
        #[arg(long)]
        char_emb: Option<PathBuf>,
    },
    /// Decode model scores (JSON Lines) and report EM/F1
    Evaluate {
        /// Model output, one {"id", "start_scores", "end_scores"} object per line
        predictions: PathBuf,
        /// Split whose eval file holds the gold answers
        #[arg(short, long, default_value = "dev")]
        split: Split,
        /// Where to write answers keyed by question id
        #[arg(short, long)]
        answer_file: Option<PathBuf>,
    },
    /// Show record store statistics
    Inspect {
        /// Split whose record store to read
        #[arg(short, long, default_value = "train")]
        split: Split,
        /// Stack this many records into a tensor batch
        #[arg(short, long, default_value_t = 0)]
        batch: usize,
    },
}

fn load_config(cli: &Cli) -> Result<PrepareConfig> {
    let mut config = match &cli.config {
        Some(path) => PrepareConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PrepareConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        let paths = Paths {
            pretrain_word_emb_file: config.paths.pretrain_word_emb_file.take(),
            pretrain_char_emb_file: config.paths.pretrain_char_emb_file.take(),
            ..Paths::under(dir)
        };
        config = config.with_paths(paths);
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(&cli)?;
    let show_progress = !cli.quiet;

    match cli.command {
        Commands::Prepare {
            para_limit,
            ques_limit,
            ans_limit,
            char_limit,
            vec_size,
            seed,
            no_char_emb,
            no_shuffle,
            word_emb,
            char_emb,
        } => {
            let para_limit = para_limit.unwrap_or(config.para_limit);
            let ques_limit = ques_limit.unwrap_or(config.ques_limit);
            let ans_limit = ans_limit.unwrap_or(config.ans_limit);
            config = config.with_limits(para_limit, ques_limit, ans_limit);
            if let Some(char_limit) = char_limit {
                config = config.with_char_limit(char_limit);
            }
            if let Some(vec_size) = vec_size {
                config = config.with_vec_size(vec_size);
            }
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if no_char_emb {
                config = config.with_char_emb(false);
            }
            if no_shuffle {
                config = config.with_shuffle(false);
            }
            if word_emb.is_some() {
                config.paths.pretrain_word_emb_file = word_emb;
            }
            if char_emb.is_some() {
                config.paths.pretrain_char_emb_file = char_emb;
            }

            let report = prepare(&config, show_progress)?;
            println!(
                "train: {} examples, dev: {} examples, test: {} examples",
                report.train.total, report.dev.total, report.test.total
            );
            println!("word vocabulary: {}", report.word_vocab);
            if let Some(chars) = report.char_vocab {
                println!("char vocabulary: {chars}");
            }
        }
        Commands::Evaluate {
            predictions,
            split,
            answer_file,
        } => {
            let answer_file = answer_file.unwrap_or_else(|| config.paths.answer_file.clone());
            info!(%split, predictions = %predictions.display(), "Evaluating");
            let report = run_evaluation(
                config.paths.eval(split),
                &predictions,
                &answer_file,
                show_progress,
            )?;
            println!(
                "Exact Match: {:.4}, F1: {:.4} ({} answers)",
                report.metrics.exact_match, report.metrics.f1, report.answered
            );
            println!("Answers written to {}", answer_file.display());
        }
        Commands::Inspect { split, batch } => {
            let path = config.paths.records(split);
            let stats = inspect_store(
                path,
                &config.limits(split),
                config.char_row_width(),
                batch,
            )?;
            println!("Store: {}", path.display());
            println!("Records: {}", stats.records);
            match (stats.min_id, stats.max_id) {
                (Some(min), Some(max)) => println!("Ids: {min}..={max}"),
                _ => println!("Ids: none"),
            }
            if stats.shape_errors == 0 {
                println!("Shapes: all records match the {split} limits");
            } else {
                println!("Shapes: {} records do not match the {split} limits", stats.shape_errors);
            }
            for (name, dims) in &stats.batch_dims {
                println!("  {name}: {dims:?}");
            }
        }
    }

    Ok(())
}
