//! ONNX-backed classifier using tract.

use std::fmt::Display;
use std::path::Path;

use ndarray::Array4;
use tract_onnx::prelude::*;

use crate::constants::*;
use crate::error::EngineError;
use crate::inference::{Classifier, scores_from_raw};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

pub struct OnnxClassifier {
    model: RunnableModel,
}

fn load_error(path: &Path, err: impl Display) -> EngineError {
    EngineError::ModelLoad {
        path: path.to_path_buf(),
        message: format!("{:#}", err),
    }
}

fn forward_error(err: impl Display) -> EngineError {
    EngineError::Forward(format!("{:#}", err))
}

impl OnnxClassifier {
    /// Loads the model with its input pinned to `[1, 10, 16, model_height, 16]`.
    pub fn load(path: &Path, model_height: usize, optimize: bool) -> Result<Self, EngineError> {
        if !path.is_file() {
            return Err(EngineError::ModelMissing(path.to_path_buf()));
        }

        let input_shape = [
            1,
            FEATURE_CHANNELS,
            CHUNK_SIZE as usize,
            model_height,
            CHUNK_SIZE as usize,
        ];
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| load_error(path, e))?
            .with_input_fact(0, f32::fact(input_shape).into())
            .map_err(|e| load_error(path, e))?;

        let typed = if optimize {
            model.into_optimized()
        } else {
            model.into_typed()
        }
        .map_err(|e| load_error(path, e))?;

        let model = typed.into_runnable().map_err(|e| load_error(path, e))?;
        Ok(Self { model })
    }
}

impl Classifier for OnnxClassifier {
    fn forward(&self, input: &[f32], shape: [usize; 5]) -> Result<Array4<f32>, EngineError> {
        // Input and output tensors only live for this call.
        let tensor = Tensor::from_shape(&shape, input).map_err(forward_error)?;
        let outputs = self.model.run(tvec!(tensor.into())).map_err(forward_error)?;
        let output = outputs
            .first()
            .ok_or_else(|| EngineError::Forward("model produced no outputs".to_string()))?;

        let dims = output.shape().to_vec();
        let scores = output.as_slice::<f32>().map_err(forward_error)?;
        scores_from_raw(&dims, scores.to_vec())
    }
}
