//! # Example Encoder
//!
//! Converts a tokenized [`Example`] into fixed-width index arrays and
//! one-hot answer labels. Examples that exceed the limits are filtered,
//! never truncated.

use std::fmt;

use crate::config::Limits;
use crate::prep::embedding::EmbeddingTable;
use crate::types::{EncodedFeature, Example};

/// Why an example was left out of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterReason {
    /// The example carries no gold answer.
    NoAnswer,
    ContextTooLong,
    QuestionTooLong,
    /// `end - start` of the last answer exceeds the answer limit.
    AnswerTooLong,
    /// The last answer points past the context width.
    AnswerOutOfRange,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAnswer => write!(f, "no answer"),
            Self::ContextTooLong => write!(f, "context too long"),
            Self::QuestionTooLong => write!(f, "question too long"),
            Self::AnswerTooLong => write!(f, "answer too long"),
            Self::AnswerOutOfRange => write!(f, "answer out of range"),
        }
    }
}

/// Outcome of encoding one example.
#[derive(Debug, Clone, PartialEq)]
pub enum Encoding {
    Kept(EncodedFeature),
    Filtered(FilterReason),
}

/// Produces the "char" inputs of a feature.
///
/// Picked once per run: a 2-D character grid, or a 1-D reuse of word
/// indices when character embeddings are disabled.
pub trait CharLevelEncoder: Send + Sync {
    /// Char-level array for the context.
    fn encode_context(&self, example: &Example, limits: &Limits) -> Vec<i32>;

    /// Char-level array for the question.
    fn encode_question(&self, example: &Example, limits: &Limits) -> Vec<i32>;

    /// Elements per row; 1 for the word-index variant.
    fn row_width(&self, limits: &Limits) -> usize;
}

/// Character grid `[rows, char_limit]` over the flat character sequence.
///
/// Each character is one row unit, so only column 0 of a row is filled.
pub struct CharGrid<'a> {
    chars: &'a EmbeddingTable,
}

impl<'a> CharGrid<'a> {
    pub fn new(chars: &'a EmbeddingTable) -> Self {
        Self { chars }
    }

    fn grid(&self, chars: &[char], rows: usize, cols: usize) -> Vec<i32> {
        let mut grid = vec![0i32; rows * cols];
        let mut buf = [0u8; 4];
        for (i, c) in chars.iter().take(rows).enumerate() {
            grid[i * cols] = self.chars.lookup(c.encode_utf8(&mut buf));
        }
        grid
    }
}

impl CharLevelEncoder for CharGrid<'_> {
    fn encode_context(&self, example: &Example, limits: &Limits) -> Vec<i32> {
        self.grid(&example.context_chars, limits.para, limits.char)
    }

    fn encode_question(&self, example: &Example, limits: &Limits) -> Vec<i32> {
        self.grid(&example.ques_chars, limits.ques, limits.char)
    }

    fn row_width(&self, limits: &Limits) -> usize {
        limits.char
    }
}

/// Word indices standing in for the char inputs.
pub struct WordFallback<'a> {
    words: &'a EmbeddingTable,
}

impl<'a> WordFallback<'a> {
    pub fn new(words: &'a EmbeddingTable) -> Self {
        Self { words }
    }
}

impl CharLevelEncoder for WordFallback<'_> {
    fn encode_context(&self, example: &Example, limits: &Limits) -> Vec<i32> {
        index_tokens(&example.context_tokens, self.words, limits.para)
    }

    fn encode_question(&self, example: &Example, limits: &Limits) -> Vec<i32> {
        index_tokens(&example.ques_tokens, self.words, limits.ques)
    }

    fn row_width(&self, _limits: &Limits) -> usize {
        1
    }
}

/// Map tokens to indices in a zero-padded array of length `width`.
pub fn index_tokens<S: AsRef<str>>(tokens: &[S], table: &EmbeddingTable, width: usize) -> Vec<i32> {
    let mut idxs = vec![0i32; width];
    for (slot, token) in idxs.iter_mut().zip(tokens) {
        *slot = table.lookup(token.as_ref());
    }
    idxs
}

/// Encoder bound to frozen dictionaries and one set of limits.
pub struct ExampleEncoder<'a> {
    words: &'a EmbeddingTable,
    char_level: Box<dyn CharLevelEncoder + 'a>,
    limits: Limits,
}

impl<'a> ExampleEncoder<'a> {
    /// Build an encoder. With `use_char_emb` off the char inputs reuse
    /// `words` and `chars` is ignored.
    pub fn new(
        words: &'a EmbeddingTable,
        chars: &'a EmbeddingTable,
        limits: Limits,
        use_char_emb: bool,
    ) -> Self {
        let char_level: Box<dyn CharLevelEncoder + 'a> = if use_char_emb {
            Box::new(CharGrid::new(chars))
        } else {
            Box::new(WordFallback::new(words))
        };
        Self {
            words,
            char_level,
            limits,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Elements per row of the char arrays.
    pub fn char_row_width(&self) -> usize {
        self.char_level.row_width(&self.limits)
    }

    /// Check the length filter. Only the last gold answer is considered.
    pub fn filter(&self, example: &Example) -> Option<FilterReason> {
        let limits = &self.limits;
        let (start, end) = match example.last_answer() {
            Some(span) if example.is_valid() => span,
            _ => return Some(FilterReason::NoAnswer),
        };
        if example.context_tokens.len() > limits.para {
            return Some(FilterReason::ContextTooLong);
        }
        if example.ques_tokens.len() > limits.ques {
            return Some(FilterReason::QuestionTooLong);
        }
        if end.saturating_sub(start) > limits.ans {
            return Some(FilterReason::AnswerTooLong);
        }
        if start >= limits.para || end >= limits.para {
            return Some(FilterReason::AnswerOutOfRange);
        }
        None
    }

    /// Encode one example, or report why it was filtered.
    pub fn encode(&self, example: &Example) -> Encoding {
        if let Some(reason) = self.filter(example) {
            return Encoding::Filtered(reason);
        }
        let limits = &self.limits;

        let context_idxs = index_tokens(&example.context_tokens, self.words, limits.para);
        let ques_idxs = index_tokens(&example.ques_tokens, self.words, limits.ques);
        let context_char_idxs = self.char_level.encode_context(example, limits);
        let ques_char_idxs = self.char_level.encode_question(example, limits);

        let mut y1 = vec![0.0f32; limits.para];
        let mut y2 = vec![0.0f32; limits.para];
        // filter() guarantees a last answer inside the context width.
        if let Some((start, end)) = example.last_answer() {
            y1[start] = 1.0;
            y2[end] = 1.0;
        }

        Encoding::Kept(EncodedFeature {
            context_idxs,
            ques_idxs,
            context_char_idxs,
            ques_char_idxs,
            y1,
            y2,
            id: example.id,
        })
    }
}
