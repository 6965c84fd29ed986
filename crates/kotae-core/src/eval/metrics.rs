//! # Exact-Match and F1
//!
//! Per-example scores take the best match over all gold answers; corpus
//! scores are the mean per-example scores scaled to `[0, 100]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::eval::normalize::AnswerNormalizer;

/// Corpus-level scores, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub exact_match: f64,
    pub f1: f64,
}

impl Metrics {
    /// Mean of per-example `(em, f1)` pairs in `[0, 1]`, scaled by 100.
    /// An empty input scores zero.
    pub fn from_scores(scores: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut count = 0usize;
        let (mut em, mut f1) = (0.0, 0.0);
        for (e, f) in scores {
            em += e;
            f1 += f;
            count += 1;
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            exact_match: 100.0 * em / count as f64,
            f1: 100.0 * f1 / count as f64,
        }
    }
}

/// Scores predicted answer strings against gold answers.
#[derive(Debug, Clone)]
pub struct AnswerScorer {
    normalizer: AnswerNormalizer,
}

impl AnswerScorer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            normalizer: AnswerNormalizer::new()?,
        })
    }

    pub fn normalizer(&self) -> &AnswerNormalizer {
        &self.normalizer
    }

    /// 1.0 if the normalized strings are equal, else 0.0.
    pub fn exact_match(&self, prediction: &str, gold: &str) -> f64 {
        if self.normalizer.normalize(prediction) == self.normalizer.normalize(gold) {
            1.0
        } else {
            0.0
        }
    }

    /// Token-overlap F1 between the normalized strings.
    ///
    /// Two empty token lists score 1.0; one empty list scores 0.0.
    pub fn f1(&self, prediction: &str, gold: &str) -> f64 {
        let pred_tokens = self.normalizer.tokens(prediction);
        let gold_tokens = self.normalizer.tokens(gold);
        if pred_tokens.is_empty() || gold_tokens.is_empty() {
            return if pred_tokens.is_empty() && gold_tokens.is_empty() {
                1.0
            } else {
                0.0
            };
        }

        let mut gold_counts: HashMap<&str, usize> = HashMap::new();
        for token in &gold_tokens {
            *gold_counts.entry(token.as_str()).or_default() += 1;
        }
        let mut overlap = 0usize;
        for token in &pred_tokens {
            if let Some(count) = gold_counts.get_mut(token.as_str()).filter(|c| **c > 0) {
                *count -= 1;
                overlap += 1;
            }
        }
        if overlap == 0 {
            return 0.0;
        }

        let precision = overlap as f64 / pred_tokens.len() as f64;
        let recall = overlap as f64 / gold_tokens.len() as f64;
        2.0 * precision * recall / (precision + recall)
    }

    /// Best `(em, f1)` over all gold answers. No golds scores zero.
    pub fn score<S: AsRef<str>>(&self, prediction: &str, golds: &[S]) -> (f64, f64) {
        golds.iter().fold((0.0f64, 0.0f64), |(em, f1), gold| {
            let gold = gold.as_ref();
            (
                em.max(self.exact_match(prediction, gold)),
                f1.max(self.f1(prediction, gold)),
            )
        })
    }
}
