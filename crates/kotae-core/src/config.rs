//! # Pipeline Configuration
//!
//! Length limits, embedding options and file locations for the
//! preparation and evaluation passes. Loaded from JSON or built in code;
//! every field has a default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KotaeError, Result};

/// Largest accepted embedding dimensionality.
pub const MAX_VEC_SIZE: usize = 200;

/// Dataset split. The test split is encoded with its own, looser limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    /// All splits in processing order.
    pub const ALL: [Split; 3] = [Split::Train, Split::Dev, Split::Test];
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Dev => write!(f, "dev"),
            Self::Test => write!(f, "test"),
        }
    }
}

impl FromStr for Split {
    type Err = KotaeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Ok(Self::Train),
            "dev" => Ok(Self::Dev),
            "test" => Ok(Self::Test),
            other => Err(KotaeError::InvalidConfig(format!("unknown split {other:?}"))),
        }
    }
}

/// Length limits applied by the example encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum context tokens; also the width of the context arrays and labels.
    pub para: usize,
    /// Maximum question tokens.
    pub ques: usize,
    /// Maximum `end - start` of the answer span.
    pub ans: usize,
    /// Columns of the character grids.
    pub char: usize,
}

/// Input and output file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub train_file: PathBuf,
    pub dev_file: PathBuf,
    pub test_file: PathBuf,
    pub pretrain_word_emb_file: Option<PathBuf>,
    pub pretrain_char_emb_file: Option<PathBuf>,
    pub train_record_file: PathBuf,
    pub dev_record_file: PathBuf,
    pub test_record_file: PathBuf,
    pub train_eval_file: PathBuf,
    pub dev_eval_file: PathBuf,
    pub test_eval_file: PathBuf,
    pub train_meta: PathBuf,
    pub dev_meta: PathBuf,
    pub test_meta: PathBuf,
    pub word_emb_file: PathBuf,
    pub char_emb_file: PathBuf,
    pub emb_safetensors_file: PathBuf,
    pub word_dictionary: PathBuf,
    pub char_dictionary: PathBuf,
    pub answer_file: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::under("data")
    }
}

impl Paths {
    /// Conventional file names, inputs and outputs side by side under `dir`.
    pub fn under(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            train_file: dir.join("train.json"),
            dev_file: dir.join("dev.json"),
            test_file: dir.join("test.json"),
            pretrain_word_emb_file: None,
            pretrain_char_emb_file: None,
            train_record_file: dir.join("train.records"),
            dev_record_file: dir.join("dev.records"),
            test_record_file: dir.join("test.records"),
            train_eval_file: dir.join("train_eval.json"),
            dev_eval_file: dir.join("dev_eval.json"),
            test_eval_file: dir.join("test_eval.json"),
            train_meta: dir.join("train_meta.json"),
            dev_meta: dir.join("dev_meta.json"),
            test_meta: dir.join("test_meta.json"),
            word_emb_file: dir.join("word_emb.json"),
            char_emb_file: dir.join("char_emb.json"),
            emb_safetensors_file: dir.join("emb.safetensors"),
            word_dictionary: dir.join("word_dictionary.json"),
            char_dictionary: dir.join("char_dictionary.json"),
            answer_file: dir.join("answer.json"),
        }
    }

    /// Corpus file of a split.
    pub fn corpus(&self, split: Split) -> &Path {
        match split {
            Split::Train => &self.train_file,
            Split::Dev => &self.dev_file,
            Split::Test => &self.test_file,
        }
    }

    /// Record store of a split.
    pub fn records(&self, split: Split) -> &Path {
        match split {
            Split::Train => &self.train_record_file,
            Split::Dev => &self.dev_record_file,
            Split::Test => &self.test_record_file,
        }
    }

    /// Eval record file of a split.
    pub fn eval(&self, split: Split) -> &Path {
        match split {
            Split::Train => &self.train_eval_file,
            Split::Dev => &self.dev_eval_file,
            Split::Test => &self.test_eval_file,
        }
    }

    /// Meta file of a split.
    pub fn meta(&self, split: Split) -> &Path {
        match split {
            Split::Train => &self.train_meta,
            Split::Dev => &self.dev_meta,
            Split::Test => &self.test_meta,
        }
    }
}

/// Configuration for the preparation and evaluation passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    pub para_limit: usize,
    pub ques_limit: usize,
    pub ans_limit: usize,
    pub test_para_limit: usize,
    pub test_ques_limit: usize,
    pub test_ans_limit: usize,
    pub char_limit: usize,
    /// Encode 2-D character grids; otherwise the char inputs reuse word indices.
    pub use_char_emb: bool,
    pub vec_size: usize,
    /// Tokens need a count strictly greater than this to get an embedding.
    pub word_count_limit: i64,
    pub char_count_limit: i64,
    /// Seed for shuffling and the random embedding fallback.
    pub seed: u64,
    /// Shuffle examples before encoding.
    pub shuffle: bool,
    pub paths: Paths,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            para_limit: 400,
            ques_limit: 50,
            ans_limit: 30,
            test_para_limit: 1000,
            test_ques_limit: 100,
            test_ans_limit: 100,
            char_limit: 16,
            use_char_emb: true,
            vec_size: MAX_VEC_SIZE,
            word_count_limit: -1,
            char_count_limit: -1,
            seed: 13,
            shuffle: true,
            paths: Paths::default(),
        }
    }
}

impl PrepareConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Set the train/dev limits.
    pub fn with_limits(mut self, para: usize, ques: usize, ans: usize) -> Self {
        self.para_limit = para;
        self.ques_limit = ques;
        self.ans_limit = ans;
        self
    }

    /// Set the test limits.
    pub fn with_test_limits(mut self, para: usize, ques: usize, ans: usize) -> Self {
        self.test_para_limit = para;
        self.test_ques_limit = ques;
        self.test_ans_limit = ans;
        self
    }

    pub fn with_char_limit(mut self, char_limit: usize) -> Self {
        self.char_limit = char_limit;
        self
    }

    /// Enable or disable the character grids.
    pub fn with_char_emb(mut self, enabled: bool) -> Self {
        self.use_char_emb = enabled;
        self
    }

    pub fn with_vec_size(mut self, vec_size: usize) -> Self {
        self.vec_size = vec_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_paths(mut self, paths: Paths) -> Self {
        self.paths = paths;
        self
    }

    /// Reject settings that would make every later pass meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`KotaeError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.vec_size == 0 || self.vec_size > MAX_VEC_SIZE {
            return Err(KotaeError::InvalidConfig(format!(
                "vec_size must be in 1..={MAX_VEC_SIZE}, got {}",
                self.vec_size
            )));
        }
        let limits = [
            ("para_limit", self.para_limit),
            ("ques_limit", self.ques_limit),
            ("test_para_limit", self.test_para_limit),
            ("test_ques_limit", self.test_ques_limit),
            ("char_limit", self.char_limit),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(KotaeError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    /// Elements per row of the char arrays in the record stores.
    pub fn char_row_width(&self) -> usize {
        if self.use_char_emb { self.char_limit } else { 1 }
    }

    /// Limits for a split.
    pub fn limits(&self, split: Split) -> Limits {
        match split {
            Split::Test => Limits {
                para: self.test_para_limit,
                ques: self.test_ques_limit,
                ans: self.test_ans_limit,
                char: self.char_limit,
            },
            Split::Train | Split::Dev => Limits {
                para: self.para_limit,
                ques: self.ques_limit,
                ans: self.ans_limit,
                char: self.char_limit,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PrepareConfig::default().validate().is_ok());
    }

    #[test]
    fn vec_size_out_of_range_rejected() {
        let err = PrepareConfig::new().with_vec_size(201).validate().unwrap_err();
        assert!(err.to_string().contains("vec_size"));
        assert!(PrepareConfig::new().with_vec_size(0).validate().is_err());
        assert!(PrepareConfig::new().with_vec_size(200).validate().is_ok());
    }

    #[test]
    fn zero_limit_rejected() {
        let err = PrepareConfig::new().with_limits(0, 50, 30).validate().unwrap_err();
        assert!(err.to_string().contains("para_limit"));
    }

    #[test]
    fn test_split_uses_test_limits() {
        let config = PrepareConfig::new()
            .with_limits(400, 50, 30)
            .with_test_limits(1000, 100, 100);
        assert_eq!(config.limits(Split::Dev).para, 400);
        assert_eq!(config.limits(Split::Train).ans, 30);
        let test = config.limits(Split::Test);
        assert_eq!((test.para, test.ques, test.ans), (1000, 100, 100));
        assert_eq!(test.char, config.char_limit);
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config: PrepareConfig =
            serde_json::from_str(r#"{"para_limit": 120, "use_char_emb": false}"#).unwrap();
        assert_eq!(config.para_limit, 120);
        assert!(!config.use_char_emb);
        assert_eq!(config.ques_limit, 50);
        assert_eq!(config.paths.train_file, PathBuf::from("data/train.json"));
    }

    #[test]
    fn split_display_and_parse() {
        assert_eq!(Split::Train.to_string(), "train");
        assert_eq!(Split::Test.to_string(), "test");
        assert_eq!("Dev".parse::<Split>().unwrap(), Split::Dev);
        assert!("validation".parse::<Split>().is_err());
    }

    #[test]
    fn char_row_width_follows_char_mode() {
        let config = PrepareConfig::new().with_char_limit(12);
        assert_eq!(config.char_row_width(), 12);
        assert_eq!(config.with_char_emb(false).char_row_width(), 1);
    }
}
