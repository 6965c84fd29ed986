//! # Span Decoder
//!
//! Picks the most probable answer span from per-token start/end scores.
//! Scores are turned into probabilities with a masked softmax; the span
//! score is `p_start[i] * p_end[j]` restricted to `j >= i`.

use candle_core::{DType, Tensor};

use crate::error::{KotaeError, Result};

/// Additive bias for masked positions before the softmax.
pub const MASK_BIAS: f32 = -1e30;

/// Decoder for start/end score vectors.
#[derive(Debug, Clone, Default)]
pub struct SpanDecoder;

impl SpanDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode with the first `valid_len` positions unmasked.
    ///
    /// # Examples
    /// ```
    /// use kotae_core::eval::SpanDecoder;
    ///
    /// let decoder = SpanDecoder::new();
    /// let span = decoder.decode(&[5.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 0.0, 1.0], 4).unwrap();
    /// assert_eq!(span, (0, 3));
    /// ```
    pub fn decode(&self, start_scores: &[f32], end_scores: &[f32], valid_len: usize) -> Result<(usize, usize)> {
        let mask: Vec<bool> = (0..start_scores.len()).map(|i| i < valid_len).collect();
        self.decode_masked(start_scores, end_scores, &mask)
    }

    /// Decode with an explicit validity mask.
    ///
    /// Returns `(start, end)` with `start <= end`. Ties go to the lowest
    /// index.
    ///
    /// # Errors
    ///
    /// Returns [`KotaeError::ShapeMismatch`] if the three slices differ in
    /// length.
    pub fn decode_masked(&self, start_scores: &[f32], end_scores: &[f32], mask: &[bool]) -> Result<(usize, usize)> {
        let len = start_scores.len();
        if end_scores.len() != len {
            return Err(KotaeError::ShapeMismatch {
                field: "end_scores",
                expected: len,
                actual: end_scores.len(),
            });
        }
        if mask.len() != len {
            return Err(KotaeError::ShapeMismatch {
                field: "mask",
                expected: len,
                actual: mask.len(),
            });
        }
        if len == 0 {
            return Ok((0, 0));
        }

        let p1 = masked_softmax(start_scores, mask);
        let p2 = masked_softmax(end_scores, mask);

        // Row maxima of the upper-triangular outer product: the best end
        // for start i is the largest p2[j] with j >= i.
        let mut suffix_max = p2.clone();
        for j in (0..len - 1).rev() {
            suffix_max[j] = suffix_max[j].max(suffix_max[j + 1]);
        }
        let row_max: Vec<f32> = p1.iter().zip(&suffix_max).map(|(a, b)| a * b).collect();

        // Column maxima: the best start for end j is the largest p1[i] with i <= j.
        let mut prefix_max = p1.clone();
        for i in 1..len {
            prefix_max[i] = prefix_max[i].max(prefix_max[i - 1]);
        }
        let col_max: Vec<f32> = p2.iter().zip(&prefix_max).map(|(a, b)| a * b).collect();

        Ok((argmax(&row_max), argmax(&col_max)))
    }

    /// Decode a batch of `[N, L]` start/end logits with a `[N, L]` mask
    /// (non-zero = valid).
    pub fn decode_batch(&self, start: &Tensor, end: &Tensor, mask: &Tensor) -> Result<Vec<(usize, usize)>> {
        let start = start.to_dtype(DType::F32)?.to_vec2::<f32>()?;
        let end = end.to_dtype(DType::F32)?.to_vec2::<f32>()?;
        let mask = mask.to_dtype(DType::F32)?.to_vec2::<f32>()?;
        if end.len() != start.len() || mask.len() != start.len() {
            return Err(KotaeError::ShapeMismatch {
                field: "batch",
                expected: start.len(),
                actual: end.len().min(mask.len()),
            });
        }

        start
            .iter()
            .zip(&end)
            .zip(&mask)
            .map(|((s, e), m)| {
                let valid: Vec<bool> = m.iter().map(|&v| v != 0.0).collect();
                self.decode_masked(s, e, &valid)
            })
            .collect()
    }
}

/// Softmax over `scores` with masked positions pushed to `MASK_BIAS`.
pub fn masked_softmax(scores: &[f32], mask: &[bool]) -> Vec<f32> {
    let biased: Vec<f32> = scores
        .iter()
        .zip(mask)
        .map(|(&s, &valid)| if valid { s } else { s + MASK_BIAS })
        .collect();
    let max = biased.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = biased.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the first maximum.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}
