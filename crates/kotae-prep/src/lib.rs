//! # Kotae Prep
//!
//! Corpus-level passes over the Kotae core: prepare record stores and side
//! files for all splits, score model output, and inspect record stores.
//! The `kotae` binary is a thin CLI over these functions.

pub mod evaluate;
pub mod inspect;
pub mod prepare;
pub mod progress;

pub use evaluate::{EvaluationReport, ModelOutput, read_model_outputs, run_evaluation, score_outputs};
pub use inspect::{StoreStats, inspect_store};
pub use prepare::{PrepareReport, prepare, save_json};
