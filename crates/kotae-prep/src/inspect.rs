//! Record store statistics for `kotae inspect`.

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::Device;
use kotae_core::config::Limits;
use kotae_core::store::{FeatureBatch, RecordReader, check_shape};
use kotae_core::types::EncodedFeature;
use serde::Serialize;
use tracing::warn;

/// Summary of one record store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub records: usize,
    pub min_id: Option<u64>,
    pub max_id: Option<u64>,
    /// Records whose array sizes disagree with the limits.
    pub shape_errors: usize,
    /// Dimensions of each tensor in the sample batch, when one was built.
    pub batch_dims: Vec<(String, Vec<usize>)>,
}

/// Read every record of `path` and check it against `limits`.
///
/// When `sample` is non-zero the first `sample` well-shaped records are
/// stacked into a [`FeatureBatch`] to confirm the tensor contract.
pub fn inspect_store(
    path: &Path,
    limits: &Limits,
    char_row_width: usize,
    sample: usize,
) -> Result<StoreStats> {
    let reader = RecordReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut stats = StoreStats::default();
    let mut batch: Vec<EncodedFeature> = Vec::with_capacity(sample);

    for record in reader {
        let feature = record
            .with_context(|| format!("reading {} after {} records", path.display(), stats.records))?;
        stats.records += 1;
        stats.min_id = Some(stats.min_id.map_or(feature.id, |id| id.min(feature.id)));
        stats.max_id = Some(stats.max_id.map_or(feature.id, |id| id.max(feature.id)));

        match check_shape(&feature, limits, char_row_width) {
            Ok(()) if batch.len() < sample => batch.push(feature),
            Ok(()) => {}
            Err(err) => {
                if stats.shape_errors == 0 {
                    warn!(id = feature.id, error = %err, "Record does not match the limits");
                }
                stats.shape_errors += 1;
            }
        }
    }

    if !batch.is_empty() {
        let tensors = FeatureBatch::from_features(&batch, limits, char_row_width, &Device::Cpu)?;
        stats.batch_dims = [
            ("context_idxs", &tensors.context_idxs),
            ("ques_idxs", &tensors.ques_idxs),
            ("context_char_idxs", &tensors.context_char_idxs),
            ("ques_char_idxs", &tensors.ques_char_idxs),
            ("y1", &tensors.y1),
            ("y2", &tensors.y2),
            ("ids", &tensors.ids),
        ]
        .into_iter()
        .map(|(name, t)| (name.to_string(), t.dims().to_vec()))
        .collect();
    }

    Ok(stats)
}
