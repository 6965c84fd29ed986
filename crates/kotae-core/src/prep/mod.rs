pub mod aligner;
pub mod corpus;
pub mod embedding;
pub mod encoder;
pub mod vocab;

pub use aligner::align_spans;
pub use corpus::{CorpusExamples, RawCorpus, process_corpus, process_file, read_corpus, shuffle};
pub use embedding::{EmbeddingTable, NULL_INDEX, NULL_TOKEN, OOV_INDEX, OOV_TOKEN, save_safetensors};
pub use encoder::{CharGrid, CharLevelEncoder, Encoding, ExampleEncoder, FilterReason, WordFallback};
pub use vocab::{FrequencyTable, VocabBuilder, Vocabulary};
