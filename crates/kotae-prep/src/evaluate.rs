//! # Evaluate Pass
//!
//! Scores model output against a split's eval file. The model writes one
//! JSON object per line:
//!
//! ```text
//! {"id": 7, "start_scores": [...], "end_scores": [...]}
//! ```
//!
//! Scores beyond the example's context length are masked before decoding.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use kotae_core::KotaeError;
use kotae_core::eval::{Metrics, SpanDecoder, convert_tokens, evaluate};
use kotae_core::types::EvalFile;
use serde::Deserialize;
use tracing::{info, warn};

use crate::prepare::save_json;
use crate::progress;

/// Start/end scores the model produced for one example.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelOutput {
    pub id: u64,
    pub start_scores: Vec<f32>,
    pub end_scores: Vec<f32>,
}

/// Result of an evaluate run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub metrics: Metrics,
    /// Number of scored predictions.
    pub answered: usize,
}

/// Read an eval file written by the prepare pass.
pub fn load_eval_file(path: &Path) -> Result<EvalFile> {
    let file = File::open(path).with_context(|| format!("opening eval file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing eval file {}", path.display()))
}

/// Parse model output lines. Blank lines are ignored.
pub fn read_model_outputs<R: BufRead>(reader: R) -> Result<Vec<ModelOutput>> {
    let mut outputs = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let output: ModelOutput = serde_json::from_str(&line)
            .with_context(|| format!("model output line {}", line_no + 1))?;
        outputs.push(output);
    }
    Ok(outputs)
}

/// Decode `outputs`, score them against `eval` and write the answers keyed
/// by question id to `answer_file`.
pub fn score_outputs(
    eval: &EvalFile,
    outputs: &[ModelOutput],
    answer_file: &Path,
    show_progress: bool,
) -> Result<EvaluationReport> {
    let decoder = SpanDecoder::new();
    let mut ids = Vec::with_capacity(outputs.len());
    let mut starts = Vec::with_capacity(outputs.len());
    let mut ends = Vec::with_capacity(outputs.len());

    let pb = progress::bar(outputs.len(), "Decoding", show_progress);
    for output in pb.wrap_iter(outputs.iter()) {
        let record = eval
            .get(&output.id)
            .ok_or_else(|| KotaeError::UnknownExample(output.id.to_string()))?;
        let valid_len = record.spans.len().min(output.start_scores.len());
        if valid_len == 0 {
            warn!(id = output.id, "Empty context, predicting an empty answer");
        }
        let (start, end) = decoder
            .decode(&output.start_scores, &output.end_scores, valid_len)
            .with_context(|| format!("decoding example {}", output.id))?;
        ids.push(output.id);
        starts.push(start);
        ends.push(end);
    }
    pb.finish_and_clear();

    let (answers, remapped) = convert_tokens(eval, &ids, &starts, &ends)?;
    let metrics = evaluate(eval, &answers)?;
    save_json(answer_file, &remapped)?;

    info!(
        answered = answers.len(),
        exact_match = metrics.exact_match,
        f1 = metrics.f1,
        path = %answer_file.display(),
        "Evaluation finished"
    );
    Ok(EvaluationReport {
        metrics,
        answered: answers.len(),
    })
}

/// File-level entry point for `kotae evaluate`.
pub fn run_evaluation(
    eval_file: &Path,
    predictions: &Path,
    answer_file: &Path,
    show_progress: bool,
) -> Result<EvaluationReport> {
    let eval = load_eval_file(eval_file)?;
    let file = File::open(predictions)
        .with_context(|| format!("opening model output {}", predictions.display()))?;
    let outputs = read_model_outputs(BufReader::new(file))
        .with_context(|| format!("reading model output {}", predictions.display()))?;
    score_outputs(&eval, &outputs, answer_file, show_progress)
}
