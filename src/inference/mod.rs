//! Model inference: runs the classifier over a feature tensor and decodes
//! per-cell class scores into a full-height label grid.

pub mod onnx;
pub mod window;

use std::path::Path;

use ndarray::{Array3, Array4, ArrayView4};

use crate::constants::*;
use crate::error::EngineError;
use crate::features::FeatureTensor;

pub use onnx::OnnxClassifier;
pub use window::ModelWindow;

/// One forward pass of a trained model.
///
/// `input` is the feature tensor flattened channel-major, then width,
/// model height and depth. The result holds raw class scores shaped
/// `[classes, 16, model_height, 16]`.
pub trait Classifier: Send + Sync {
    fn forward(&self, input: &[f32], shape: [usize; 5]) -> Result<Array4<f32>, EngineError>;
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Number of forward passes allowed to run at once.
    pub worker_threads: usize,
    /// Run the graph optimizer once at load time.
    pub optimize: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            worker_threads: INFERENCE_WORKER_COUNT,
            optimize: true,
        }
    }
}

/// Class labels for a whole chunk, `[16, world_height, 16]`.
///
/// Only the rows covered by the model window hold real predictions; every
/// other row stays at class 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationGrid {
    labels: Array3<u32>,
}

impl ClassificationGrid {
    pub fn new(world_height: usize) -> Self {
        Self {
            labels: Array3::zeros((CHUNK_SIZE as usize, world_height, CHUNK_SIZE as usize)),
        }
    }

    pub fn height(&self) -> usize {
        self.labels.dim().1
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, x: usize, row: usize, z: usize) -> u32 {
        self.labels[[x, row, z]]
    }

    pub fn set(&mut self, x: usize, row: usize, z: usize, label: u32) {
        self.labels[[x, row, z]] = label;
    }

    /// Cell coordinates for a linear index, depth fastest, then height, then width.
    pub fn cell(&self, index: usize) -> (usize, usize, usize) {
        let (_, height, depth) = self.labels.dim();
        (index / (height * depth), (index / depth) % height, index % depth)
    }
}

/// Index of the highest score; the first maximum wins ties.
pub fn argmax(scores: impl IntoIterator<Item = f32>) -> usize {
    let mut best_class = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (class, score) in scores.into_iter().enumerate() {
        if score > best_score {
            best_score = score;
            best_class = class;
        }
    }
    best_class
}

/// Arg-max every cell and scatter model rows into world-height grid rows.
pub fn decode_scores(scores: ArrayView4<'_, f32>, window: ModelWindow) -> ClassificationGrid {
    let (classes, width, model_height, depth) = scores.dim();
    let mut grid = ClassificationGrid::new(window.world_height.max(0) as usize);

    for x in 0..width {
        for model_y in 0..model_height {
            let row = window.grid_row(model_y as i32);
            if !window.contains_row(row) {
                continue;
            }
            for z in 0..depth {
                let best = argmax((0..classes).map(|c| scores[[c, x, model_y, z]]));
                grid.set(x, row as usize, z, best as u32);
            }
        }
    }
    grid
}

/// Accepts `[classes, w, h, d]` or a batched `[1, classes, w, h, d]` output.
pub(crate) fn scores_from_raw(dims: &[usize], data: Vec<f32>) -> Result<Array4<f32>, EngineError> {
    let shape = match dims {
        [c, w, h, d] => (*c, *w, *h, *d),
        [1, c, w, h, d] => (*c, *w, *h, *d),
        _ => return Err(EngineError::OutputShape(dims.to_vec())),
    };
    Array4::from_shape_vec(shape, data).map_err(|_| EngineError::OutputShape(dims.to_vec()))
}

/// The loaded model plus the geometry needed to interpret it.
pub struct InferenceEngine {
    classifier: Box<dyn Classifier>,
    window: ModelWindow,
}

impl InferenceEngine {
    pub fn new(classifier: Box<dyn Classifier>, window: ModelWindow) -> Self {
        Self { classifier, window }
    }

    pub fn load_model(
        path: &Path,
        options: &EngineOptions,
        window: ModelWindow,
    ) -> Result<Self, EngineError> {
        let classifier = OnnxClassifier::load(path, window.model_height as usize, options.optimize)?;
        tracing::info!("ONNX model loaded successfully from {}", path.display());
        Ok(Self::new(Box::new(classifier), window))
    }

    pub fn window(&self) -> ModelWindow {
        self.window
    }

    pub fn infer(&self, tensor: &FeatureTensor) -> Result<ClassificationGrid, EngineError> {
        let dims = tensor.dim();
        let shape = [dims.0, dims.1, dims.2, dims.3, dims.4];
        // Standard layout iteration is exactly channel, width, height, depth order.
        let input: Vec<f32> = tensor.iter().copied().collect();

        let scores = self.classifier.forward(&input, shape)?;
        let (classes, width, model_height, depth) = scores.dim();
        if classes == 0
            || width != shape[2]
            || model_height != shape[3]
            || depth != shape[4]
        {
            return Err(EngineError::OutputShape(scores.shape().to_vec()));
        }
        Ok(decode_scores(scores.view(), self.window))
    }

    /// Releases the model. Called once, from process teardown.
    pub fn shutdown(self) {
        drop(self.classifier);
        tracing::info!("Inference engine resources released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scores one class higher than the rest everywhere.
    struct ConstantClassifier {
        class: usize,
        classes: usize,
    }

    impl Classifier for ConstantClassifier {
        fn forward(&self, _input: &[f32], shape: [usize; 5]) -> Result<Array4<f32>, EngineError> {
            let mut scores = Array4::zeros((self.classes, shape[2], shape[3], shape[4]));
            scores
                .index_axis_mut(ndarray::Axis(0), self.class)
                .fill(1.0);
            Ok(scores)
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn forward(&self, _input: &[f32], _shape: [usize; 5]) -> Result<Array4<f32>, EngineError> {
            Err(EngineError::Forward("boom".to_string()))
        }
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax([0.5, 0.5, 0.1]), 0);
        assert_eq!(argmax([0.1, 0.7, 0.7, 0.2]), 1);
        assert_eq!(argmax([-3.0, -1.0, -2.0]), 1);
        assert_eq!(argmax([f32::NAN, f32::NAN]), 0);
    }

    #[test]
    fn test_scatter_fills_only_the_window() {
        let window = ModelWindow::default();
        let engine = InferenceEngine::new(
            Box::new(ConstantClassifier {
                class: 1,
                classes: 3,
            }),
            window,
        );
        let tensor = FeatureTensor::zeros([1, FEATURE_CHANNELS, 16, MODEL_HEIGHT as usize, 16]);
        let grid = engine.infer(&tensor).unwrap();

        assert_eq!(grid.height(), WORLD_HEIGHT as usize);
        let rows = window.predicted_rows();
        for row in 0..WORLD_HEIGHT {
            let expected = if rows.contains(&row) { 1 } else { 0 };
            assert_eq!(grid.get(7, row as usize, 3), expected, "row {}", row);
        }
    }

    #[test]
    fn test_forward_failure_is_propagated() {
        let engine = InferenceEngine::new(Box::new(FailingClassifier), ModelWindow::default());
        let tensor = FeatureTensor::zeros([1, FEATURE_CHANNELS, 16, MODEL_HEIGHT as usize, 16]);
        assert!(matches!(engine.infer(&tensor), Err(EngineError::Forward(_))));
    }

    #[test]
    fn test_output_shape_is_checked() {
        assert!(scores_from_raw(&[1, 3, 16, 32, 16], vec![0.0; 3 * 16 * 32 * 16]).is_ok());
        assert!(scores_from_raw(&[3, 16, 32, 16], vec![0.0; 3 * 16 * 32 * 16]).is_ok());
        assert!(matches!(
            scores_from_raw(&[2, 3, 16, 32, 16], vec![0.0; 2 * 3 * 16 * 32 * 16]),
            Err(EngineError::OutputShape(_))
        ));
        assert!(matches!(
            scores_from_raw(&[3, 16, 32, 16], vec![0.0; 10]),
            Err(EngineError::OutputShape(_))
        ));
    }

    #[test]
    fn test_cell_order_is_depth_fastest() {
        let grid = ClassificationGrid::new(4);
        assert_eq!(grid.cell(0), (0, 0, 0));
        assert_eq!(grid.cell(1), (0, 0, 1));
        assert_eq!(grid.cell(16), (0, 1, 0));
        assert_eq!(grid.cell(64), (1, 0, 0));
        assert_eq!(grid.len(), 16 * 4 * 16);
    }
}
