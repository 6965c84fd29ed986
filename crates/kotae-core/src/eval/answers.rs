//! Maps decoded token spans back to answer text and scores them.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{KotaeError, Result};
use crate::eval::metrics::{AnswerScorer, Metrics};
use crate::types::EvalFile;

/// Predicted answer text keyed by example id.
pub type AnswerDict = BTreeMap<u64, String>;

/// Predicted answer text keyed by the dataset-native question id.
pub type RemappedDict = BTreeMap<String, String>;

/// Turn decoded `(start, end)` token positions into answer strings.
///
/// `ids`, `starts` and `ends` are parallel. Each span is sliced out of the
/// original context through the stored char offsets.
///
/// # Errors
///
/// [`KotaeError::ShapeMismatch`] if the slices differ in length, and
/// [`KotaeError::UnknownExample`] for an id without an eval record.
pub fn convert_tokens(
    eval: &EvalFile,
    ids: &[u64],
    starts: &[usize],
    ends: &[usize],
) -> Result<(AnswerDict, RemappedDict)> {
    for (field, len) in [("starts", starts.len()), ("ends", ends.len())] {
        if len != ids.len() {
            return Err(KotaeError::ShapeMismatch {
                field,
                expected: ids.len(),
                actual: len,
            });
        }
    }

    let mut answers = AnswerDict::new();
    let mut remapped = RemappedDict::new();
    for ((&id, &start), &end) in ids.iter().zip(starts).zip(ends) {
        let record = eval
            .get(&id)
            .ok_or_else(|| KotaeError::UnknownExample(id.to_string()))?;
        let text = record.answer_text(start, end);
        remapped.insert(record.uuid.clone(), text.clone());
        answers.insert(id, text);
    }
    Ok((answers, remapped))
}

/// Corpus EM/F1 of `answers` against the gold answers in `eval`.
///
/// An empty `answers` scores zero on both metrics.
pub fn evaluate(eval: &EvalFile, answers: &AnswerDict) -> Result<Metrics> {
    let scorer = AnswerScorer::new()?;
    let mut scores = Vec::with_capacity(answers.len());
    for (id, prediction) in answers {
        let record = eval
            .get(id)
            .ok_or_else(|| KotaeError::UnknownExample(id.to_string()))?;
        scores.push(scorer.score(prediction, &record.answers));
    }
    let metrics = Metrics::from_scores(scores);
    debug!(
        examples = answers.len(),
        exact_match = metrics.exact_match,
        f1 = metrics.f1,
        "Scored predictions"
    );
    Ok(metrics)
}
