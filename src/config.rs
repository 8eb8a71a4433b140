use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::ConfigError;
use crate::inference::{EngineOptions, ModelWindow};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Directory holding the model and both category tables.
    pub data_dir: PathBuf,
    pub model_file: String,
    pub block_mapping_file: String,
    pub biome_mapping_file: String,
    pub model_height: i32,
    pub blocks_per_batch: usize,
    pub start_delay_ticks: u64,
    pub ticks_between_batches: u64,
    pub worker_threads: usize,
    pub optimize_model: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            block_mapping_file: DEFAULT_BLOCK_MAPPING_FILE.to_string(),
            biome_mapping_file: DEFAULT_BIOME_MAPPING_FILE.to_string(),
            model_height: MODEL_HEIGHT,
            blocks_per_batch: BLOCKS_PER_BATCH,
            start_delay_ticks: START_DELAY_TICKS,
            ticks_between_batches: TICKS_BETWEEN_BATCHES,
            worker_threads: num_cpus::get().clamp(1, INFERENCE_WORKER_COUNT),
            optimize_model: true,
        }
    }
}

/// Per-user data directory, falling back to `./data` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "neural-terrain")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

impl GenerationConfig {
    /// Reads the config file, or returns defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if !(1..=WORLD_HEIGHT).contains(&config.model_height) {
            return Err(ConfigError::ModelHeight {
                path: path.to_path_buf(),
                value: config.model_height,
            });
        }
        Ok(config)
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(&self.model_file)
    }

    pub fn block_mapping_path(&self) -> PathBuf {
        self.data_dir.join(&self.block_mapping_file)
    }

    pub fn biome_mapping_path(&self) -> PathBuf {
        self.data_dir.join(&self.biome_mapping_file)
    }

    pub fn window(&self) -> ModelWindow {
        ModelWindow::new(self.model_height, WORLD_HEIGHT, MIN_Y)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            worker_threads: self.worker_threads.max(1),
            optimize: self.optimize_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("neural-terrain-no-such-config.json");
        let config = GenerationConfig::load(&path).unwrap();
        assert_eq!(config.blocks_per_batch, 2048);
        assert_eq!(config.start_delay_ticks, 5);
        assert_eq!(config.ticks_between_batches, 1);
        assert_eq!(config.model_height, 32);
        assert!(config.worker_threads >= 1);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let path = std::env::temp_dir().join(format!(
            "neural-terrain-config-{}.json",
            std::process::id()
        ));
        fs::write(&path, r#"{"data_dir": "/srv/model", "blocks_per_batch": 512}"#).unwrap();
        let config = GenerationConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.blocks_per_batch, 512);
        assert_eq!(config.model_file, DEFAULT_MODEL_FILE);
        assert_eq!(
            config.model_path(),
            Path::new("/srv/model").join(DEFAULT_MODEL_FILE)
        );
        assert_eq!(config.window().offset(), -176);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!(
            "neural-terrain-bad-config-{}.json",
            std::process::id()
        ));
        fs::write(&path, "{ not json").unwrap();
        let result = GenerationConfig::load(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_model_height_must_fit_the_world() {
        let path = std::env::temp_dir().join(format!(
            "neural-terrain-height-config-{}.json",
            std::process::id()
        ));
        let load = |json: &str| {
            fs::write(&path, json).unwrap();
            GenerationConfig::load(&path)
        };

        for bad in [0, -5, WORLD_HEIGHT + 1] {
            let result = load(&format!(r#"{{"model_height": {}}}"#, bad));
            assert!(
                matches!(result, Err(ConfigError::ModelHeight { value, .. }) if value == bad),
                "model_height {} was accepted",
                bad
            );
        }
        assert_eq!(load(r#"{"model_height": 1}"#).unwrap().model_height, 1);
        let full = load(&format!(r#"{{"model_height": {}}}"#, WORLD_HEIGHT)).unwrap();
        assert_eq!(full.window().offset(), 0);
        fs::remove_file(&path).unwrap();
    }
}
