pub mod eval_record;
pub mod example;
pub mod feature;

pub use eval_record::{EvalFile, EvalRecord};
pub use example::Example;
pub use feature::{EncodedFeature, Meta};
