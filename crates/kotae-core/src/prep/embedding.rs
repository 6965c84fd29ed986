//! # Embedding Table Builder
//!
//! Turns a frequency table into a dense index (`token2idx`) and an
//! embedding matrix. Vectors come from a pretrained text resource
//! (`token v1 ... vN` per line) or, without one, from a seeded Gaussian.
//! Index 0 is the NULL (padding) sentinel and index 1 the OOV sentinel;
//! both map to zero vectors.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use serde::ser::SerializeMap;
use tracing::{debug, info};

use crate::config::MAX_VEC_SIZE;
use crate::error::{KotaeError, Result};
use crate::prep::vocab::FrequencyTable;

/// Padding sentinel token.
pub const NULL_TOKEN: &str = "--NULL--";
/// Out-of-vocabulary sentinel token.
pub const OOV_TOKEN: &str = "--OOV--";
pub const NULL_INDEX: u32 = 0;
pub const OOV_INDEX: u32 = 1;

/// Standard deviation of the random fallback vectors.
const RANDOM_STDDEV: f64 = 0.1;

/// A frozen token index with one embedding row per index.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingTable {
    tokens: Vec<String>,
    index: HashMap<String, u32>,
    matrix: Vec<Vec<f32>>,
    vec_size: usize,
}

impl EmbeddingTable {
    /// Build from a pretrained file when given, else from random vectors.
    ///
    /// Only tokens counted strictly more than `limit` times are kept.
    ///
    /// # Errors
    ///
    /// Rejects `vec_size` outside `1..=200`, unreadable files and
    /// unparseable vectors.
    pub fn build(
        counter: &FrequencyTable,
        pretrained: Option<&Path>,
        limit: i64,
        vec_size: usize,
        seed: u64,
    ) -> Result<Self> {
        match pretrained {
            Some(path) => {
                info!(path = %path.display(), "Scanning pretrained vectors");
                let reader = BufReader::new(File::open(path)?);
                Self::from_pretrained(counter, reader, limit, vec_size)
            }
            None => Self::random(counter, limit, vec_size, seed),
        }
    }

    /// Keep the vectors of a pretrained resource whose token passes the
    /// frequency filter, in file order.
    ///
    /// The token is everything before the trailing `vec_size` fields, so
    /// tokens containing spaces survive. Lines too short to hold a vector
    /// (e.g. a word2vec header) are skipped. A token listed twice keeps
    /// its first position and its last vector.
    pub fn from_pretrained<R: BufRead>(
        counter: &FrequencyTable,
        reader: R,
        limit: i64,
        vec_size: usize,
    ) -> Result<Self> {
        check_vec_size(vec_size)?;

        let mut entries: Vec<(String, Vec<f32>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut skipped = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() <= vec_size {
                skipped += 1;
                continue;
            }
            let split = fields.len() - vec_size;
            let token = fields[..split].join(" ");
            if !counter.exceeds(&token, limit) {
                continue;
            }

            let vector = fields[split..]
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| KotaeError::EmbeddingFormat {
                    line: line_no + 1,
                    reason: format!("token {token:?}: {e}"),
                })?;

            match positions.get(&token) {
                Some(&i) => entries[i].1 = vector,
                None => {
                    positions.insert(token.clone(), entries.len());
                    entries.push((token, vector));
                }
            }
        }

        if skipped > 0 {
            debug!(skipped, "Skipped short pretrained lines");
        }
        let eligible = counter.iter().filter(|(_, c)| *c as i128 > limit as i128).count();
        info!(
            found = entries.len(),
            eligible,
            "Pretrained vectors matched vocabulary"
        );

        Ok(Self::assemble(entries, vec_size))
    }

    /// Draw a `N(0, 0.1)` vector for every token above the limit, in
    /// first-seen order. Deterministic for a given `seed`.
    pub fn random(counter: &FrequencyTable, limit: i64, vec_size: usize, seed: u64) -> Result<Self> {
        check_vec_size(vec_size)?;

        let mut rng = Gaussian::new(seed);
        let entries: Vec<(String, Vec<f32>)> = counter
            .iter()
            .filter(|(_, count)| *count as i128 > limit as i128)
            .map(|(token, _)| {
                let vector = (0..vec_size).map(|_| rng.sample(RANDOM_STDDEV)).collect();
                (token.to_string(), vector)
            })
            .collect();

        info!(tokens = entries.len(), "Built random embeddings");
        Ok(Self::assemble(entries, vec_size))
    }

    fn assemble(entries: Vec<(String, Vec<f32>)>, vec_size: usize) -> Self {
        let capacity = entries.len() + 2;
        let mut tokens = Vec::with_capacity(capacity);
        let mut matrix = Vec::with_capacity(capacity);

        tokens.push(NULL_TOKEN.to_string());
        matrix.push(vec![0.0; vec_size]);
        tokens.push(OOV_TOKEN.to_string());
        matrix.push(vec![0.0; vec_size]);

        // A corpus token spelled like a sentinel must not shadow it.
        for (token, vector) in entries {
            if token == NULL_TOKEN || token == OOV_TOKEN {
                debug!(%token, "Dropped token that collides with a sentinel");
                continue;
            }
            tokens.push(token);
            matrix.push(vector);
        }

        let index = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();

        Self {
            tokens,
            index,
            matrix,
            vec_size,
        }
    }

    /// Index of `token`, if it has one.
    pub fn get(&self, token: &str) -> Option<u32> {
        self.index.get(token).copied()
    }

    /// Index of `token`, or the OOV sentinel on a miss.
    pub fn lookup(&self, token: &str) -> i32 {
        self.get(token).unwrap_or(OOV_INDEX) as i32
    }

    /// Token stored at `idx`.
    pub fn token(&self, idx: u32) -> Option<&str> {
        self.tokens.get(idx as usize).map(String::as_str)
    }

    /// Embedding rows ordered by index.
    pub fn matrix(&self) -> &[Vec<f32>] {
        &self.matrix
    }

    pub fn vec_size(&self) -> usize {
        self.vec_size
    }

    /// Number of indices, sentinels included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Serializable `token -> index` view, in index order.
    pub fn dictionary(&self) -> Dictionary<'_> {
        Dictionary(self)
    }

    /// Row-major little-endian f32 bytes of the matrix.
    fn matrix_bytes(&self) -> Vec<u8> {
        self.matrix
            .iter()
            .flatten()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }
}

/// JSON object `{token: index}` for an [`EmbeddingTable`].
pub struct Dictionary<'a>(&'a EmbeddingTable);

impl Serialize for Dictionary<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.tokens.len()))?;
        for (idx, token) in self.0.tokens.iter().enumerate() {
            map.serialize_entry(token, &idx)?;
        }
        map.end()
    }
}

/// Write embedding matrices as named F32 `[rows, vec_size]` tensors.
pub fn save_safetensors(tables: &[(&str, &EmbeddingTable)], path: &Path) -> Result<()> {
    let buffers: Vec<(&str, Vec<u8>, Vec<usize>)> = tables
        .iter()
        .map(|(name, table)| (*name, table.matrix_bytes(), vec![table.len(), table.vec_size()]))
        .collect();

    let views = buffers
        .iter()
        .map(|(name, bytes, shape)| {
            safetensors::tensor::TensorView::new(safetensors::Dtype::F32, shape.clone(), bytes)
                .map(|view| (*name, view))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    safetensors::serialize_to_file(views, &None, path)?;
    Ok(())
}

fn check_vec_size(vec_size: usize) -> Result<()> {
    if vec_size == 0 || vec_size > MAX_VEC_SIZE {
        return Err(KotaeError::InvalidConfig(format!(
            "vec_size must be in 1..={MAX_VEC_SIZE}, got {vec_size}"
        )));
    }
    Ok(())
}

/// Box-Muller sampler over a seeded PCG stream.
struct Gaussian {
    rng: oorandom::Rand64,
}

impl Gaussian {
    fn new(seed: u64) -> Self {
        Self {
            rng: oorandom::Rand64::new(seed as u128),
        }
    }

    fn sample(&mut self, stddev: f64) -> f32 {
        // 1 - u keeps the log argument in (0, 1].
        let u1 = 1.0 - self.rng.rand_float();
        let u2 = self.rng.rand_float();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        (z * stddev) as f32
    }
}
