pub mod batch;
pub mod format;
pub mod reader;
pub mod writer;

pub use batch::FeatureBatch;
pub use reader::{RecordReader, check_shape};
pub use writer::{RecordSink, RecordWriter, build_features};
