use serde::{Deserialize, Serialize};

/// Fixed-width encoding of one example, ready for the record store.
///
/// Index arrays are zero-padded (index 0 is the NULL sentinel). In
/// character mode the char grids are row-major `[rows, char_limit]`; in
/// word-fallback mode they are 1-D arrays of word indices.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeature {
    pub context_idxs: Vec<i32>,
    pub ques_idxs: Vec<i32>,
    pub context_char_idxs: Vec<i32>,
    pub ques_char_idxs: Vec<i32>,
    /// One-hot answer start, length `para_limit`.
    pub y1: Vec<f32>,
    /// One-hot answer end, length `para_limit`.
    pub y2: Vec<f32>,
    pub id: u64,
}

/// Per-split corpus metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Examples submitted to the encoder, filtered ones included.
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_json_shape() {
        let meta = Meta { total: 42 };
        assert_eq!(serde_json::to_string(&meta).unwrap(), r#"{"total":42}"#);
    }
}
