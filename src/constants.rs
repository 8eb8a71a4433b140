// World constants
pub const CHUNK_SIZE: i32 = 16;
pub const MIN_Y: i32 = -64;
pub const MAX_Y: i32 = 319;
pub const WORLD_HEIGHT: i32 = MAX_Y - MIN_Y + 1;
pub const SUBCHUNK_HEIGHT: i32 = 16;
pub const NUM_SUBCHUNKS: i32 = WORLD_HEIGHT / SUBCHUNK_HEIGHT;
pub const SEA_LEVEL: i32 = 62;
pub const MAX_LIGHT: u8 = 15;

// Model constants
pub const MODEL_HEIGHT: i32 = 32; // 32 for the transformer model, 256 for the CNN one
pub const FEATURE_CHANNELS: usize = 10;

// Scheduling constants
pub const BLOCKS_PER_BATCH: usize = 2048;
pub const START_DELAY_TICKS: u64 = 5;
pub const TICKS_BETWEEN_BATCHES: u64 = 1;
pub const TICKS_PER_SECOND: u64 = 20;
pub const INFERENCE_WORKER_COUNT: usize = 2;

// Data files expected in the data directory
pub const DEFAULT_MODEL_FILE: &str = "terrain_transformer_model.onnx";
pub const DEFAULT_BLOCK_MAPPING_FILE: &str = "block_id_mapping.json";
pub const DEFAULT_BIOME_MAPPING_FILE: &str = "biome_id_mapping.json";
pub const DEFAULT_CONFIG_FILE: &str = "generative_terrain.json";
