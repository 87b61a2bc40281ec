//! Monument classifier: preprocessing, inference and result selection.

use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::PredictionError;
use crate::labels::LabelTable;
use crate::preprocessing::{ArgbImage, ImagePreprocessor};
use crate::selector::Prediction;
use tugu_inference::InferenceBackend;

/// Input name used when a backend does not report one.
const DEFAULT_INPUT_NAME: &str = "input";

/// A classifier bound to a loaded model.
///
/// Holding one means the runtime is initialized; there is no "not ready"
/// state to check here.
pub struct MonumentClassifier<B: InferenceBackend> {
    backend: B,
    preprocessor: ImagePreprocessor,
    labels: LabelTable,
}

impl<B: InferenceBackend> MonumentClassifier<B> {
    /// Create a classifier over the monument label table.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            preprocessor: ImagePreprocessor::new(),
            labels: LabelTable::monuments(),
        }
    }

    /// Replace the label table.
    pub fn with_labels(mut self, labels: LabelTable) -> Self {
        self.labels = labels;
        self
    }

    /// Run a preprocessed buffer through the model and return one score per label.
    pub fn infer(&self, buffer: Vec<f32>) -> Result<Vec<f32>, PredictionError> {
        let input = self.preprocessor.to_input_tensor(buffer)?;
        let input_name = self
            .backend
            .input_names()
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_INPUT_NAME);

        let outputs = self
            .backend
            .run(&[(input_name, input)])
            .map_err(|e| PredictionError::Inference(e.to_string()))?;

        let (name, output) = outputs
            .into_iter()
            .next()
            .ok_or_else(|| PredictionError::Inference("model produced no output".to_string()))?;

        debug!("Output '{}' has shape {:?}", name, output.shape());
        let scores = output
            .to_scores()
            .map_err(|e| PredictionError::Inference(e.to_string()))?;

        if scores.len() != self.labels.len() {
            return Err(PredictionError::Inference(format!(
                "output '{}' has {} scores, expected {}",
                name,
                scores.len(),
                self.labels.len()
            )));
        }

        debug!("Scores from '{}': {:?}", name, scores);
        Ok(scores)
    }

    /// Classify an image.
    pub fn classify(&self, image: &DynamicImage) -> Result<Prediction, PredictionError> {
        let start = Instant::now();
        let buffer = self.preprocessor.preprocess(image)?;
        self.select(buffer, start)
    }

    /// Classify a raw ARGB pixel grid.
    pub fn classify_argb(&self, image: &ArgbImage) -> Result<Prediction, PredictionError> {
        let start = Instant::now();
        let buffer = self.preprocessor.preprocess_argb(image)?;
        self.select(buffer, start)
    }

    fn select(&self, buffer: Vec<f32>, start: Instant) -> Result<Prediction, PredictionError> {
        let scores = self.infer(buffer)?;
        let prediction = Prediction::from_scores(&self.labels, &scores)
            .ok_or_else(|| PredictionError::Inference("no valid score in output".to_string()))?;

        info!(
            "Predicted {} ({:.1}%) in {}ms",
            prediction.label,
            prediction.confidence,
            start.elapsed().as_millis()
        );

        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tugu_inference::{InferenceError, InputTensor, OutputTensor};

    /// Backend that returns fixed scores and records the input it saw.
    struct FixedBackend {
        scores: Vec<f32>,
        seen_shape: Mutex<Option<Vec<usize>>>,
        names: Vec<String>,
    }

    impl FixedBackend {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores,
                seen_shape: Mutex::new(None),
                names: vec!["input_1".to_string()],
            }
        }
    }

    impl InferenceBackend for FixedBackend {
        fn run(&self, inputs: &[(&str, InputTensor)]) -> tugu_inference::Result<Vec<(String, OutputTensor)>> {
            assert_eq!(inputs[0].0, "input_1");
            *self.seen_shape.lock().unwrap() = Some(inputs[0].1.shape().to_vec());
            let arr = ArrayD::from_shape_vec(IxDyn(&[1, self.scores.len()]), self.scores.clone()).unwrap();
            Ok(vec![("scores".to_string(), OutputTensor::Float32(arr))])
        }

        fn input_names(&self) -> &[String] {
            &self.names
        }

        fn output_names(&self) -> &[String] {
            &[]
        }
    }

    struct FailingBackend;

    impl InferenceBackend for FailingBackend {
        fn run(&self, _inputs: &[(&str, InputTensor)]) -> tugu_inference::Result<Vec<(String, OutputTensor)>> {
            Err(InferenceError::InferenceFailed("out of memory".to_string()))
        }

        fn input_names(&self) -> &[String] {
            &[]
        }

        fn output_names(&self) -> &[String] {
            &[]
        }
    }

    fn bung_karno_scores() -> Vec<f32> {
        vec![0.01, 0.02, 0.03, 0.02, 0.83, 0.01, 0.01, 0.02, 0.01, 0.02, 0.01, 0.01]
    }

    #[test]
    fn test_classify_picks_best_monument() {
        let classifier = MonumentClassifier::new(FixedBackend::new(bung_karno_scores()));
        let prediction = classifier.classify(&DynamicImage::new_rgb8(640, 480)).unwrap();

        assert_eq!(prediction.label, "Patung Bung Karno");
        assert!((prediction.confidence - 83.0).abs() < 1e-4);
        assert_eq!(
            classifier.backend.seen_shape.lock().unwrap().clone(),
            Some(vec![1, 224, 224, 3])
        );
    }

    #[test]
    fn test_wrong_output_length_is_rejected() {
        let classifier = MonumentClassifier::new(FixedBackend::new(vec![0.5, 0.5]));
        let err = classifier.classify(&DynamicImage::new_rgb8(8, 8)).unwrap_err();
        assert!(matches!(err, PredictionError::Inference(msg) if msg.contains("expected 12")));
    }

    #[test]
    fn test_runtime_failure_is_reported() {
        let classifier = MonumentClassifier::new(FailingBackend);
        let err = classifier.classify(&DynamicImage::new_rgb8(8, 8)).unwrap_err();
        assert_eq!(
            err,
            PredictionError::Inference("inference failed: out of memory".to_string())
        );
    }

    #[test]
    fn test_classify_argb_grid() {
        let classifier = MonumentClassifier::new(FixedBackend::new(bung_karno_scores()));
        let grid = ArgbImage::from_pixels(3, 2, vec![0xFF80_8080; 6]).unwrap();
        assert_eq!(classifier.classify_argb(&grid).unwrap().index, 4);
    }
}
