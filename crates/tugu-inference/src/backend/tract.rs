//! Tract backend for pure-Rust ONNX inference.

use std::io::Cursor;

use ndarray::{ArrayD, IxDyn};
use tract_onnx::prelude::*;
use tracing::{debug, warn};

use crate::error::InferenceError;
use crate::tensor::{InputTensor, OutputTensor};
use crate::{BackendOptions, InferenceBackend, Result};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Backend using Tract. The input shape is fixed at load time.
pub struct TractBackend {
    model: RunnableModel,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl TractBackend {
    /// Load a model from an in-memory buffer.
    pub fn from_bytes(bytes: &[u8], options: &BackendOptions) -> Result<Self> {
        debug!("Loading ONNX model with Tract from {} bytes", bytes.len());
        if options.use_gpu {
            warn!("Tract runs on CPU only; ignoring GPU request");
        }

        let mut model = tract_onnx::onnx()
            .model_for_read(&mut Cursor::new(bytes))
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        // Pin the input so dynamic batch/spatial dims become concrete.
        model
            .set_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), &options.input_shape))
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to set input shape: {}", e)))?;

        let input_names = model
            .input_outlets()
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?
            .iter()
            .map(|outlet| model.node(outlet.node).name.clone())
            .collect();
        let output_names = model
            .output_outlets()
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?
            .iter()
            .map(|outlet| model.node(outlet.node).name.clone())
            .collect();

        let model = model
            .into_typed()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to type model: {}", e)))?
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to optimize: {}", e)))?
            .into_runnable()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        Ok(Self {
            model,
            input_names,
            output_names,
        })
    }

    fn convert_input(tensor: &InputTensor) -> Result<TValue> {
        match tensor {
            InputTensor::Float32(arr) => {
                let data: Vec<f32> = arr.iter().copied().collect();
                let tract_tensor =
                    tract_ndarray::ArrayD::from_shape_vec(tract_ndarray::IxDyn(arr.shape()), data)
                        .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
                Ok(tract_tensor.into_tvalue())
            }
        }
    }
}

impl InferenceBackend for TractBackend {
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>> {
        let tract_inputs: TVec<TValue> = inputs
            .iter()
            .map(|(_, tensor)| Self::convert_input(tensor))
            .collect::<Result<TVec<_>>>()?;

        let outputs = self
            .model
            .run(tract_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());

        for (idx, output) in outputs.iter().enumerate() {
            let name = self
                .output_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("output_{}", idx));

            let tensor = if let Ok(view) = output.to_array_view::<f32>() {
                let arr = ArrayD::from_shape_vec(IxDyn(view.shape()), view.iter().copied().collect())
                    .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
                OutputTensor::Float32(arr)
            } else if let Ok(view) = output.to_array_view::<f64>() {
                let arr = ArrayD::from_shape_vec(IxDyn(view.shape()), view.iter().copied().collect())
                    .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
                OutputTensor::Float64(arr)
            } else if let Ok(view) = output.to_array_view::<i64>() {
                let arr = ArrayD::from_shape_vec(IxDyn(view.shape()), view.iter().copied().collect())
                    .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
                OutputTensor::Int64(arr)
            } else {
                return Err(InferenceError::OutputExtraction(format!(
                    "unsupported output type for '{}'",
                    name
                )));
            };

            results.push((name, tensor));
        }

        Ok(results)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
