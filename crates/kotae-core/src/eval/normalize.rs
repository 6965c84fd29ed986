//! Answer string normalization used before EM/F1 comparison.

use regex::Regex;

use crate::error::Result;

/// Normalizes answer strings: lowercase, strip ASCII punctuation, drop the
/// standalone words "a", "an" and "the", then collapse whitespace.
#[derive(Debug, Clone)]
pub struct AnswerNormalizer {
    articles: Regex,
}

impl AnswerNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            articles: Regex::new(r"\b(a|an|the)\b")?,
        })
    }

    /// # Examples
    /// ```
    /// use kotae_core::eval::AnswerNormalizer;
    ///
    /// let normalizer = AnswerNormalizer::new().unwrap();
    /// assert_eq!(normalizer.normalize("The  Eiffel Tower!"), "eiffel tower");
    /// ```
    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let unpunctuated: String = lowered.chars().filter(|c| !c.is_ascii_punctuation()).collect();
        let without_articles = self.articles.replace_all(&unpunctuated, " ");
        without_articles.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Normalized whitespace tokens.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        self.normalize(text)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}
