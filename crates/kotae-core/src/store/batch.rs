//! Stacks decoded records into the tensors a candle model consumes.

use candle_core::{Device, Tensor};

use crate::config::Limits;
use crate::error::Result;
use crate::store::reader::check_shape;
use crate::types::EncodedFeature;

/// A batch of features as tensors.
///
/// Index tensors are `u32` (`[N, para]`, `[N, ques]`; char inputs gain a
/// trailing `char_limit` axis in grid mode), labels `f32 [N, para]`, ids
/// `i64 [N]`.
#[derive(Debug, Clone)]
pub struct FeatureBatch {
    pub context_idxs: Tensor,
    pub ques_idxs: Tensor,
    pub context_char_idxs: Tensor,
    pub ques_char_idxs: Tensor,
    pub y1: Tensor,
    pub y2: Tensor,
    pub ids: Tensor,
}

impl FeatureBatch {
    /// Build a batch after checking every feature against `limits`.
    pub fn from_features(
        features: &[EncodedFeature],
        limits: &Limits,
        char_row_width: usize,
        device: &Device,
    ) -> Result<Self> {
        for feature in features {
            check_shape(feature, limits, char_row_width)?;
        }
        let n = features.len();

        let char_shape = |rows: usize| {
            if char_row_width > 1 {
                vec![n, rows, char_row_width]
            } else {
                vec![n, rows]
            }
        };

        Ok(Self {
            context_idxs: index_tensor(features, |f| &f.context_idxs, vec![n, limits.para], device)?,
            ques_idxs: index_tensor(features, |f| &f.ques_idxs, vec![n, limits.ques], device)?,
            context_char_idxs: index_tensor(
                features,
                |f| &f.context_char_idxs,
                char_shape(limits.para),
                device,
            )?,
            ques_char_idxs: index_tensor(
                features,
                |f| &f.ques_char_idxs,
                char_shape(limits.ques),
                device,
            )?,
            y1: label_tensor(features, |f| &f.y1, limits.para, device)?,
            y2: label_tensor(features, |f| &f.y2, limits.para, device)?,
            ids: Tensor::from_vec(
                features.iter().map(|f| f.id as i64).collect::<Vec<_>>(),
                n,
                device,
            )?,
        })
    }
}

fn index_tensor(
    features: &[EncodedFeature],
    field: impl Fn(&EncodedFeature) -> &Vec<i32>,
    shape: Vec<usize>,
    device: &Device,
) -> Result<Tensor> {
    // Indices are never negative, so the u32 view is lossless.
    let data: Vec<u32> = features
        .iter()
        .flat_map(|f| field(f).iter().map(|&i| i as u32))
        .collect();
    Ok(Tensor::from_vec(data, shape, device)?)
}

fn label_tensor(
    features: &[EncodedFeature],
    field: impl Fn(&EncodedFeature) -> &Vec<f32>,
    width: usize,
    device: &Device,
) -> Result<Tensor> {
    let data: Vec<f32> = features.iter().flat_map(|f| field(f).iter().copied()).collect();
    Ok(Tensor::from_vec(data, (features.len(), width), device)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(id: u64) -> EncodedFeature {
        EncodedFeature {
            context_idxs: vec![2, 3, 0],
            ques_idxs: vec![4, 0],
            context_char_idxs: vec![5, 0, 6, 0, 0, 0],
            ques_char_idxs: vec![7, 0, 0, 0],
            y1: vec![1.0, 0.0, 0.0],
            y2: vec![0.0, 1.0, 0.0],
            id,
        }
    }

    fn limits() -> Limits {
        Limits {
            para: 3,
            ques: 2,
            ans: 1,
            char: 2,
        }
    }

    #[test]
    fn batch_shapes_in_grid_mode() {
        let batch =
            FeatureBatch::from_features(&[feature(1), feature(2)], &limits(), 2, &Device::Cpu).unwrap();

        assert_eq!(batch.context_idxs.dims(), &[2, 3]);
        assert_eq!(batch.context_char_idxs.dims(), &[2, 3, 2]);
        assert_eq!(batch.ques_char_idxs.dims(), &[2, 2, 2]);
        assert_eq!(batch.y1.dims(), &[2, 3]);
        assert_eq!(batch.ids.to_vec1::<i64>().unwrap(), vec![1, 2]);
        assert_eq!(
            batch.context_idxs.to_vec2::<u32>().unwrap(),
            vec![vec![2, 3, 0], vec![2, 3, 0]]
        );
    }

    #[test]
    fn batch_rejects_wrong_shape() {
        let mut bad = feature(3);
        bad.y2.push(0.0);
        assert!(FeatureBatch::from_features(&[bad], &limits(), 2, &Device::Cpu).is_err());
    }
}
