use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Scoring metadata for one example, persisted next to the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalRecord {
    /// Original untokenized context.
    pub context: String,
    /// Char offsets `(start, end)` of each context token.
    pub spans: Vec<(usize, usize)>,
    /// Gold answer texts.
    pub answers: Vec<String>,
    /// Dataset-native question id.
    pub uuid: String,
}

impl EvalRecord {
    /// Slice the context between the char offsets of two token positions.
    ///
    /// `end_idx` past the span table is clipped to the last span; a start
    /// past the table or an empty table yields an empty string.
    pub fn answer_text(&self, start_idx: usize, end_idx: usize) -> String {
        let Some(last) = self.spans.len().checked_sub(1) else {
            return String::new();
        };
        let Some(&(start, _)) = self.spans.get(start_idx) else {
            return String::new();
        };
        let (_, end) = self.spans[end_idx.min(last)];
        if end <= start {
            return String::new();
        }
        self.context.chars().skip(start).take(end - start).collect()
    }
}

/// Eval records of one split keyed by example id.
///
/// Serializes as a JSON object with stringified ids.
pub type EvalFile = BTreeMap<u64, EvalRecord>;
