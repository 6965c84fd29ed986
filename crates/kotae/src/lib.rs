//! # Kotae
//!
//! Data preparation and EM/F1 evaluation for span-extraction question
//! answering. Re-exports [`kotae_core`] (alignment, vocabularies,
//! embeddings, encoding, record stores, scoring) and [`kotae_prep`]
//! (corpus-level passes).

pub use kotae_core::*;

pub use kotae_prep as passes;
pub use kotae_prep::{EvaluationReport, PrepareReport, StoreStats, inspect_store, prepare, run_evaluation};
