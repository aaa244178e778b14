use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, Axis};
use serde::Deserialize;

use super::model::SupertonicError;

#[derive(Deserialize)]
struct StyleFile {
    style_ttl: StyleTensor,
    style_dp: StyleTensor,
}

#[derive(Deserialize)]
struct StyleTensor {
    dims: Vec<usize>,
    data: serde_json::Value,
}

/// Decoded voice style, batched along the first axis.
#[derive(Debug, Clone)]
pub struct VoiceStyle {
    /// Conditioning for the text encoder and vector estimator: `[batch, a, b]`.
    pub ttl: Array3<f32>,
    /// Conditioning for the duration predictor: `[batch, c, d]`.
    pub dp: Array3<f32>,
}

impl VoiceStyle {
    /// Load and stack one style file per batch entry.
    ///
    /// Every file must use the dimensions of the first one.
    pub fn load(paths: &[PathBuf]) -> Result<Self, SupertonicError> {
        let first_path = paths
            .first()
            .ok_or_else(|| SupertonicError::VoiceParse("no voice style files given".to_string()))?;
        let first = read_style_file(first_path)?;
        let ttl_dims = inner_dims(&first.style_ttl, first_path, "style_ttl")?;
        let dp_dims = inner_dims(&first.style_dp, first_path, "style_dp")?;

        let mut ttl = Array3::<f32>::zeros((paths.len(), ttl_dims.0, ttl_dims.1));
        let mut dp = Array3::<f32>::zeros((paths.len(), dp_dims.0, dp_dims.1));

        for (i, path) in paths.iter().enumerate() {
            let file = if i == 0 {
                None
            } else {
                Some(read_style_file(path)?)
            };
            let file = file.as_ref().unwrap_or(&first);

            ttl.index_axis_mut(Axis(0), i)
                .assign(&tensor_to_array(&file.style_ttl, ttl_dims, path, "style_ttl")?);
            dp.index_axis_mut(Axis(0), i)
                .assign(&tensor_to_array(&file.style_dp, dp_dims, path, "style_dp")?);
        }

        log::debug!(
            "Loaded {} voice style(s): ttl {:?}, dp {:?}",
            paths.len(),
            ttl.shape(),
            dp.shape()
        );
        Ok(Self { ttl, dp })
    }

    pub fn batch_size(&self) -> usize {
        self.ttl.shape()[0]
    }
}

fn read_style_file(path: &Path) -> Result<StyleFile, SupertonicError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| SupertonicError::VoiceParse(format!("{}: {e}", path.display())))
}

/// The two trailing dimensions of a `[1, a, b]` style tensor.
fn inner_dims(
    tensor: &StyleTensor,
    path: &Path,
    name: &str,
) -> Result<(usize, usize), SupertonicError> {
    match tensor.dims.as_slice() {
        [_, a, b] => Ok((*a, *b)),
        dims => Err(SupertonicError::VoiceParse(format!(
            "{}: {name} must have 3 dims, got {dims:?}",
            path.display()
        ))),
    }
}

fn tensor_to_array(
    tensor: &StyleTensor,
    expected: (usize, usize),
    path: &Path,
    name: &str,
) -> Result<Array2<f32>, SupertonicError> {
    let dims = inner_dims(tensor, path, name)?;
    if dims != expected {
        return Err(SupertonicError::VoiceParse(format!(
            "{}: {name} dims {dims:?} differ from first style {expected:?}",
            path.display()
        )));
    }

    let mut values = Vec::with_capacity(dims.0 * dims.1);
    flatten_numbers(&tensor.data, &mut values)
        .map_err(|msg| SupertonicError::VoiceParse(format!("{}: {name}: {msg}", path.display())))?;

    if values.len() != dims.0 * dims.1 {
        return Err(SupertonicError::VoiceParse(format!(
            "{}: {name} holds {} values, expected {}",
            path.display(),
            values.len(),
            dims.0 * dims.1
        )));
    }
    Ok(Array2::from_shape_vec(dims, values)?)
}

fn flatten_numbers(value: &serde_json::Value, out: &mut Vec<f32>) -> Result<(), String> {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                flatten_numbers(item, out)?;
            }
            Ok(())
        }
        serde_json::Value::Number(n) => {
            let v = n.as_f64().ok_or_else(|| format!("unrepresentable number {n}"))?;
            out.push(v as f32);
            Ok(())
        }
        other => Err(format!("unexpected value {other}")),
    }
}
