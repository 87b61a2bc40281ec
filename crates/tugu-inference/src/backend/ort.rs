//! ONNX Runtime (ort) backend for native platforms.

use std::sync::Mutex;

use ndarray::{ArrayD, IxDyn};
use ort::ep::{ExecutionProviderDispatch, CUDA, XNNPACK};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::{DynValue, Tensor};
use tracing::{debug, info};

use crate::error::InferenceError;
use crate::tensor::{InputTensor, OutputTensor};
use crate::{BackendOptions, InferenceBackend, Result};

/// Backend using ONNX Runtime for native inference.
pub struct OrtBackend {
    session: Mutex<Session>,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl OrtBackend {
    /// Load a model from an in-memory buffer. The buffer is not retained.
    pub fn from_bytes(bytes: &[u8], options: &BackendOptions) -> Result<Self> {
        debug!("Loading ONNX model from {} bytes", bytes.len());

        let mut providers: Vec<ExecutionProviderDispatch> = Vec::with_capacity(2);
        if options.use_gpu {
            info!("GPU execution requested, registering CUDA provider");
            providers.push(CUDA::default().build());
        }
        providers.push(XNNPACK::default().build());

        let session = Session::builder()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_execution_providers(providers)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_intra_threads(options.num_threads)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .commit_from_memory(bytes)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        debug!("Model inputs: {:?}", input_names);
        debug!("Model outputs: {:?}", output_names);

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            output_names,
        })
    }

    fn convert_input(tensor: &InputTensor) -> Result<SessionInputValue<'static>> {
        match tensor {
            InputTensor::Float32(arr) => {
                let shape: Vec<i64> = arr.shape().iter().map(|&s| s as i64).collect();
                let data: Vec<f32> = arr.iter().copied().collect();
                Tensor::from_array((shape, data))
                    .map(Into::into)
                    .map_err(|e| InferenceError::InvalidInput(e.to_string()))
            }
        }
    }

    fn convert_output(name: &str, value: &DynValue) -> Result<OutputTensor> {
        if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
            let shape: Vec<usize> = shape.iter().map(|&s| s as usize).collect();
            let arr = ArrayD::from_shape_vec(IxDyn(&shape), data.to_vec())
                .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
            Ok(OutputTensor::Float32(arr))
        } else if let Ok((shape, data)) = value.try_extract_tensor::<f64>() {
            let shape: Vec<usize> = shape.iter().map(|&s| s as usize).collect();
            let arr = ArrayD::from_shape_vec(IxDyn(&shape), data.to_vec())
                .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
            Ok(OutputTensor::Float64(arr))
        } else if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
            let shape: Vec<usize> = shape.iter().map(|&s| s as usize).collect();
            let arr = ArrayD::from_shape_vec(IxDyn(&shape), data.to_vec())
                .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
            Ok(OutputTensor::Int64(arr))
        } else {
            Err(InferenceError::OutputExtraction(format!(
                "unsupported output type for '{}'",
                name
            )))
        }
    }
}

impl InferenceBackend for OrtBackend {
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>> {
        let ort_inputs: Vec<(&str, SessionInputValue<'static>)> = inputs
            .iter()
            .map(|(name, tensor)| Ok((*name, Self::convert_input(tensor)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::InferenceFailed(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        outputs
            .iter()
            .map(|(name, value)| Ok((name.to_string(), Self::convert_output(name, &value)?)))
            .collect()
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

impl Drop for OrtBackend {
    fn drop(&mut self) {
        debug!("Releasing ort session");
    }
}
