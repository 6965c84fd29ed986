use serde::{Deserialize, Serialize};

/// One question paired with its context, tokenized and carrying its gold
/// answer spans as token positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Segmented context tokens.
    pub context_tokens: Vec<String>,
    /// Every character of the raw context, in order.
    pub context_chars: Vec<char>,
    /// Segmented question tokens.
    pub ques_tokens: Vec<String>,
    /// Every character of the raw question, in order.
    pub ques_chars: Vec<char>,
    /// Start token of each gold answer.
    pub y1s: Vec<usize>,
    /// End token (inclusive) of each gold answer.
    pub y2s: Vec<usize>,
    /// 1-based id, unique within a corpus file.
    pub id: u64,
}

impl Example {
    /// The span used for filtering and labels: the last recorded gold answer.
    ///
    /// Returns `None` for an example without answers.
    pub fn last_answer(&self) -> Option<(usize, usize)> {
        Some((*self.y1s.last()?, *self.y2s.last()?))
    }

    /// Returns `true` if the example has at least one complete answer span.
    pub fn is_valid(&self) -> bool {
        !self.y1s.is_empty() && self.y1s.len() == self.y2s.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(y1s: Vec<usize>, y2s: Vec<usize>) -> Example {
        Example {
            context_tokens: vec!["Paris".into(), "is".into()],
            context_chars: "Paris is".chars().collect(),
            ques_tokens: vec!["where".into()],
            ques_chars: "where".chars().collect(),
            y1s,
            y2s,
            id: 1,
        }
    }

    #[test]
    fn last_answer_picks_final_span() {
        let ex = example(vec![0, 1], vec![0, 1]);
        assert_eq!(ex.last_answer(), Some((1, 1)));
        assert!(ex.is_valid());
    }

    #[test]
    fn empty_answers_are_invalid() {
        let ex = example(vec![], vec![]);
        assert_eq!(ex.last_answer(), None);
        assert!(!ex.is_valid());
    }
}
