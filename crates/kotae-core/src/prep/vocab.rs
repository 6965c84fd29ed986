//! # Vocabulary Builder
//!
//! Accumulates word and character frequencies over a corpus pass, then
//! freezes into read-only tables for the embedding builder.

use std::collections::HashMap;

/// Read-only token frequencies in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl FrequencyTable {
    /// Count for `token`, if it was ever seen.
    pub fn get(&self, token: &str) -> Option<u64> {
        self.index.get(token).map(|&i| self.entries[i].1)
    }

    /// Returns `true` if `token` was seen with a count strictly above `limit`.
    pub fn exceeds(&self, token: &str, limit: i64) -> bool {
        self.get(token).is_some_and(|count| count as i128 > limit as i128)
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(t, c)| (t.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    fn add(&mut self, token: &str, amount: u64) {
        match self.index.get(token) {
            Some(&i) => self.entries[i].1 += amount,
            None => {
                self.index.insert(token.to_string(), self.entries.len());
                self.entries.push((token.to_string(), amount));
            }
        }
    }
}

impl<S: AsRef<str>> FromIterator<(S, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut table = Self::default();
        for (token, count) in iter {
            table.add(token.as_ref(), count);
        }
        table
    }
}

/// Frozen word and character frequencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    pub words: FrequencyTable,
    pub chars: FrequencyTable,
}

/// Mutable accumulator used during the corpus pass.
///
/// A context token counts once per question asked about its paragraph; a
/// question token counts once per occurrence. Characters inherit the
/// weight of the token they belong to.
#[derive(Debug, Default)]
pub struct VocabBuilder {
    words: FrequencyTable,
    chars: FrequencyTable,
}

impl VocabBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a paragraph's context tokens, weighted by its question count.
    pub fn add_context<S: AsRef<str>>(&mut self, tokens: &[S], num_questions: usize) {
        self.add_weighted(tokens, num_questions as u64);
    }

    /// Count one question's tokens.
    pub fn add_question<S: AsRef<str>>(&mut self, tokens: &[S]) {
        self.add_weighted(tokens, 1);
    }

    fn add_weighted<S: AsRef<str>>(&mut self, tokens: &[S], weight: u64) {
        let mut buf = [0u8; 4];
        for token in tokens {
            let token = token.as_ref();
            self.words.add(token, weight);
            for c in token.chars() {
                self.chars.add(c.encode_utf8(&mut buf), weight);
            }
        }
    }

    /// Stop counting and hand out the read-only tables.
    pub fn freeze(self) -> Vocabulary {
        Vocabulary {
            words: self.words,
            chars: self.chars,
        }
    }
}
