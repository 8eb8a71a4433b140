//! World generation and management modules
//! Contains chunk generation and world state.

pub mod generator;
pub mod terrain;

// Re-export commonly used types
pub use generator::ChunkGenerator;
pub use terrain::{World, WorldMut, WorldView, chunk_coords};

use std::sync::Arc;

/// World state shared between the foreground tick loop (the only writer)
/// and background readers.
pub type SharedWorld = Arc<parking_lot::RwLock<World>>;
