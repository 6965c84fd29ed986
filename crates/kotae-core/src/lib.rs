//! # Kotae Core
//!
//! Feature preparation and answer scoring for extractive reading
//! comprehension. Aligns pre-segmented corpora to their source text, builds
//! vocabularies and embedding tables, encodes examples into fixed-width
//! records for a span-prediction model, and turns the model's start/end
//! scores back into answers scored by Exact-Match and F1.
//!
//! ## Quick Start
//!
//! ```rust
//! use kotae_core::eval::{SpanDecoder, evaluate, convert_tokens};
//! use kotae_core::types::{EvalFile, EvalRecord};
//!
//! let mut eval = EvalFile::new();
//! eval.insert(1, EvalRecord {
//!     context: "Paris is our capital".into(),
//!     spans: vec![(0, 5), (6, 8), (9, 12), (13, 20)],
//!     answers: vec!["Paris".into()],
//!     uuid: "q-1".into(),
//! });
//!
//! let (start, end) = SpanDecoder::new()
//!     .decode(&[5.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 0.0, 1.0], 4)
//!     .unwrap();
//! let (answers, _) = convert_tokens(&eval, &[1], &[start], &[end]).unwrap();
//! let metrics = evaluate(&eval, &answers).unwrap();
//!
//! assert_eq!(answers[&1], "Paris is our capital");
//! assert_eq!(metrics.exact_match, 0.0);
//! assert!((metrics.f1 - 40.0).abs() < 1e-9);
//! ```
pub mod config;
pub mod error;
pub mod eval;
pub mod prep;
pub mod store;
pub mod types;

// Re-export primary API
pub use config::{Limits, Paths, PrepareConfig, Split};
pub use error::{KotaeError, Result};
pub use eval::{AnswerScorer, Metrics, SpanDecoder, convert_tokens, evaluate};
pub use prep::{
    EmbeddingTable, Encoding, ExampleEncoder, FilterReason, VocabBuilder, Vocabulary, align_spans,
    process_file,
};
pub use store::{FeatureBatch, RecordReader, RecordWriter, build_features};
pub use types::{EncodedFeature, EvalFile, EvalRecord, Example, Meta};
