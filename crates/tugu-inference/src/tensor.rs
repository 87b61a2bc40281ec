//! Tensor types exchanged with a backend.

use ndarray::{ArrayD, IxDyn};

use crate::error::InferenceError;
use crate::Result;

/// Input tensor for inference.
#[derive(Debug, Clone)]
pub enum InputTensor {
    Float32(ArrayD<f32>),
}

impl InputTensor {
    /// Build a Float32 tensor, rejecting data whose length does not match `shape`.
    pub fn from_f32(data: Vec<f32>, shape: &[usize]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(InferenceError::InvalidInput(format!(
                "buffer holds {} values but shape {:?} needs {}",
                data.len(),
                shape,
                expected
            )));
        }

        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(InputTensor::Float32)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }

    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            InputTensor::Float32(arr) => arr.shape(),
        }
    }
}

/// Output tensor from inference.
#[derive(Debug, Clone)]
pub enum OutputTensor {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int64(ArrayD<i64>),
}

impl OutputTensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            OutputTensor::Float32(arr) => arr.shape(),
            OutputTensor::Float64(arr) => arr.shape(),
            OutputTensor::Int64(arr) => arr.shape(),
        }
    }

    /// Flatten a floating-point output into scores, in logical (row-major) order.
    ///
    /// Integer outputs are class ids, not scores, and are rejected.
    pub fn to_scores(&self) -> Result<Vec<f32>> {
        match self {
            OutputTensor::Float32(arr) => Ok(arr.iter().copied().collect()),
            OutputTensor::Float64(arr) => Ok(arr.iter().map(|&v| v as f32).collect()),
            OutputTensor::Int64(_) => Err(InferenceError::OutputExtraction(
                "expected floating-point scores, got int64 tensor".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_f32_checks_element_count() {
        let ok = InputTensor::from_f32(vec![0.0; 2 * 2 * 3], &[1, 2, 2, 3]).unwrap();
        assert_eq!(ok.shape(), &[1, 2, 2, 3]);

        let err = InputTensor::from_f32(vec![0.0; 11], &[1, 2, 2, 3]).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInput(_)));
    }

    #[test]
    fn test_to_scores_flattens_float_outputs() {
        let arr = ArrayD::from_shape_vec(IxDyn(&[1, 3]), vec![0.1f64, 0.7, 0.2]).unwrap();
        let scores = OutputTensor::Float64(arr).to_scores().unwrap();
        assert_eq!(scores.len(), 3);
        assert!((scores[1] - 0.7).abs() < 1e-6);

        let ids = ArrayD::from_shape_vec(IxDyn(&[1]), vec![4i64]).unwrap();
        assert!(OutputTensor::Int64(ids).to_scores().is_err());
    }
}
