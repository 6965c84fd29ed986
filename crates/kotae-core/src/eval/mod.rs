pub mod answers;
pub mod decoder;
pub mod metrics;
pub mod normalize;

pub use answers::{AnswerDict, RemappedDict, convert_tokens, evaluate};
pub use decoder::{MASK_BIAS, SpanDecoder, masked_softmax};
pub use metrics::{AnswerScorer, Metrics};
pub use normalize::AnswerNormalizer;
