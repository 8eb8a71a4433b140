//! Error types shared across the generation pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to read a category table at all. Individual bad entries are
/// skipped during loading and never surface here.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("table {path} is not a JSON object: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model file not found: {0}")]
    ModelMissing(PathBuf),
    #[error("failed to load model {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },
    #[error("category tables unavailable: {0}")]
    Tables(#[from] TableError),
    #[error("forward pass failed: {0}")]
    Forward(String),
    #[error("unexpected model output shape {0:?}")]
    OutputShape(Vec<usize>),
    #[error("failed to spawn inference worker: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("y={0} is outside the world's vertical bounds")]
    OutOfBounds(i32),
    #[error("chunk ({0}, {1}) is not loaded")]
    ChunkNotLoaded(i32, i32),
}

/// Request-level outcomes reported back to the requester.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("The terrain generation model isn't loaded ({0}). Check server logs.")]
    Unavailable(String),
    #[error("You already have a terrain generation in progress.")]
    AlreadyRunning,
    #[error("Model inference failed. Check server logs.")]
    InferenceFailure,
    #[error("You don't have any terrain generation in progress.")]
    NotFound,
    #[error("The generation service is shutting down.")]
    Shutdown,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export path must end with .csv: {0}")]
    NotCsv(PathBuf),
    #[error("failed to write export {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config {path}: model_height {value} must be between 1 and the world height")]
    ModelHeight { path: PathBuf, value: i32 },
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a world snapshot")]
    BadMagic,
    #[error("unsupported snapshot version {0}")]
    Version(u32),
    #[error("snapshot encoding: {0}")]
    Encoding(#[from] bincode::Error),
}
