// Core module with fundamental types
pub mod core;

// World module with generation and terrain
pub mod world;

// Generation pipeline
pub mod features;
pub mod inference;
pub mod mutator;
pub mod pipeline;
pub mod registry;
pub mod tables;

// Other modules
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod save;

// Re-exports
pub use config::GenerationConfig;
pub use constants::*;
pub use core::{Biome, BlockType, Chunk, SubChunk};
pub use error::{EngineError, ExportError, GenerationError};
pub use export::{ExportConfig, export_region};
pub use features::{FeatureTensor, FeatureTensorBuilder};
pub use inference::{ClassificationGrid, Classifier, InferenceEngine, ModelWindow};
pub use mutator::BatchedWorldMutator;
pub use pipeline::{
    EngineStatus, GenerationEvent, GenerationEventKind, GenerationRequest, GenerationService,
};
pub use registry::{GenerationTaskRegistry, RequesterId};
pub use save::{DEFAULT_WORLD_FILE, SavedWorld, load_world, save_world};
pub use tables::CategoryTables;
pub use world::{ChunkGenerator, SharedWorld, World, WorldMut, WorldView};
