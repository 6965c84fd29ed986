//! # Prepare Pass
//!
//! Runs the three corpus splits through the loader with one shared
//! vocabulary, builds the embedding tables, and writes the record stores
//! and side files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use kotae_core::config::{PrepareConfig, Split};
use kotae_core::prep::{
    CorpusExamples, EmbeddingTable, ExampleEncoder, VocabBuilder, process_file, save_safetensors,
    shuffle,
};
use kotae_core::store::build_features;
use kotae_core::types::Meta;
use serde::Serialize;
use tracing::info;

use crate::progress;

/// What a prepare run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PrepareReport {
    pub train: Meta,
    pub dev: Meta,
    pub test: Meta,
    /// Word dictionary size, sentinels included.
    pub word_vocab: usize,
    /// Char dictionary size; absent when character embeddings are off.
    pub char_vocab: Option<usize>,
}

impl PrepareReport {
    pub fn meta(&self, split: Split) -> Meta {
        match split {
            Split::Train => self.train,
            Split::Dev => self.dev,
            Split::Test => self.test,
        }
    }
}

/// Run the full preparation pass described by `config`.
///
/// # Errors
///
/// Fails on an invalid configuration before touching any file, and on the
/// first corpus that cannot be read or aligned.
pub fn prepare(config: &PrepareConfig, show_progress: bool) -> Result<PrepareReport> {
    config.validate()?;
    let paths = &config.paths;

    let mut builder = VocabBuilder::new();
    let mut splits: Vec<(Split, CorpusExamples)> = Vec::with_capacity(Split::ALL.len());
    for (i, split) in Split::ALL.into_iter().enumerate() {
        let path = paths.corpus(split);
        let mut corpus = process_file(path, &mut builder)
            .with_context(|| format!("preparing the {split} split"))?;
        if config.shuffle {
            shuffle(&mut corpus.examples, config.seed.wrapping_add(i as u64));
        }
        splits.push((split, corpus));
    }

    let vocab = builder.freeze();
    info!(
        words = vocab.words.len(),
        chars = vocab.chars.len(),
        "Counted vocabulary"
    );

    let words = EmbeddingTable::build(
        &vocab.words,
        paths.pretrain_word_emb_file.as_deref(),
        config.word_count_limit,
        config.vec_size,
        config.seed,
    )
    .context("building word embeddings")?;
    let chars = if config.use_char_emb {
        let table = EmbeddingTable::build(
            &vocab.chars,
            paths.pretrain_char_emb_file.as_deref(),
            config.char_count_limit,
            config.vec_size,
            config.seed.wrapping_add(1),
        )
        .context("building char embeddings")?;
        Some(table)
    } else {
        None
    };

    let mut report = PrepareReport {
        train: Meta::default(),
        dev: Meta::default(),
        test: Meta::default(),
        word_vocab: words.len(),
        char_vocab: chars.as_ref().map(EmbeddingTable::len),
    };

    for (split, corpus) in &splits {
        let split = *split;
        let encoder = ExampleEncoder::new(
            &words,
            chars.as_ref().unwrap_or(&words),
            config.limits(split),
            config.use_char_emb,
        );
        let out = paths.records(split);
        ensure_parent(out)?;

        let pb = progress::bar(corpus.examples.len(), format!("Encoding {split}"), show_progress);
        let meta = build_features(pb.wrap_iter(corpus.examples.iter()), &encoder, out)
            .with_context(|| format!("writing {split} records to {}", out.display()))?;
        pb.finish_and_clear();

        save_json(paths.eval(split), &corpus.eval)?;
        // Train meta is reported but not persisted.
        if split != Split::Train {
            save_json(paths.meta(split), &meta)?;
        }
        match split {
            Split::Train => report.train = meta,
            Split::Dev => report.dev = meta,
            Split::Test => report.test = meta,
        }
    }

    save_json(&paths.word_emb_file, words.matrix())?;
    save_json(&paths.word_dictionary, &words.dictionary())?;
    let mut tensors = vec![("word_emb", &words)];
    if let Some(chars) = &chars {
        save_json(&paths.char_emb_file, chars.matrix())?;
        save_json(&paths.char_dictionary, &chars.dictionary())?;
        tensors.push(("char_emb", chars));
    }
    ensure_parent(&paths.emb_safetensors_file)?;
    save_safetensors(&tensors, &paths.emb_safetensors_file)
        .with_context(|| format!("writing {}", paths.emb_safetensors_file.display()))?;

    info!(
        train = report.train.total,
        dev = report.dev.total,
        test = report.test.total,
        "Preparation finished"
    );
    Ok(report)
}

/// Serialize `value` as JSON to `path`, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).with_context(|| format!("writing {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent.display()))?;
    }
    Ok(())
}
