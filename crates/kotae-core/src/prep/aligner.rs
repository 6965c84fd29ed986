//! # Span Aligner
//!
//! Recovers the char offsets of pre-segmented tokens inside their source
//! text. Segmentation happens upstream; tokens are expected to appear in
//! the text in order, separated only by whitespace or punctuation.

use crate::error::{KotaeError, Result};

/// Find the `(start, end)` char offsets of each token in `text`.
///
/// Each search starts where the previous token ended, so spans never move
/// backwards. Offsets count Unicode scalar values, not bytes.
///
/// # Errors
///
/// Returns [`KotaeError::Alignment`] when a token does not occur at or
/// after the cursor. This signals a text/segmentation mismatch and must
/// abort the corpus file.
///
/// # Examples
/// ```
/// use kotae_core::prep::aligner::align_spans;
///
/// let spans = align_spans("Paris is the capital", &["Paris", "is", "the", "capital"]).unwrap();
/// assert_eq!(spans, vec![(0, 5), (6, 8), (9, 12), (13, 20)]);
/// ```
pub fn align_spans<S: AsRef<str>>(text: &str, tokens: &[S]) -> Result<Vec<(usize, usize)>> {
    let mut spans = Vec::with_capacity(tokens.len());
    let mut cursor_byte = 0;
    let mut cursor_char = 0;

    for token in tokens {
        let token = token.as_ref();
        let rest = &text[cursor_byte..];
        let found = rest.find(token).ok_or_else(|| KotaeError::Alignment {
            token: token.to_string(),
            cursor: cursor_char,
        })?;

        let start = cursor_char + rest[..found].chars().count();
        let end = start + token.chars().count();
        spans.push((start, end));

        cursor_byte += found + token.len();
        cursor_char = end;
    }

    Ok(spans)
}
