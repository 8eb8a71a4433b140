//! Category tables: the lookup data that maps block types and biomes to and
//! from the integer class indices the model was trained on.
//!
//! Both tables are flat JSON objects supplied next to the model:
//!
//! * `block_id_mapping.json`: `{"0": "AIR", "1": "STONE", ...}`
//! * `biome_id_mapping.json`: `{"PLAINS": 0, "FOREST": 1, ...}`
//!
//! Entries are validated once at load time. Anything that does not resolve
//! is dropped with a warning, so lookups afterwards can never fail.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::core::biome::Biome;
use crate::core::block::BlockType;
use crate::error::TableError;

pub type BlockDecoder = FxHashMap<u32, BlockType>;
pub type BlockEncoder = FxHashMap<BlockType, u32>;
pub type BiomeEncoder = FxHashMap<Biome, u32>;

/// Encoding used for any block or biome missing from the tables.
pub const DEFAULT_INDEX: u32 = 0;

/// Immutable after construction; share it behind an `Arc`.
#[derive(Debug, Default, Clone)]
pub struct CategoryTables {
    block_decoder: BlockDecoder,
    block_encoder: BlockEncoder,
    biome_encoder: BiomeEncoder,
}

impl CategoryTables {
    pub fn new(
        block_decoder: BlockDecoder,
        block_encoder: BlockEncoder,
        biome_encoder: BiomeEncoder,
    ) -> Self {
        Self {
            block_decoder,
            block_encoder,
            biome_encoder,
        }
    }

    pub fn load(block_path: &Path, biome_path: &Path) -> Result<Self, TableError> {
        let (block_decoder, block_encoder) = load_block_tables(block_path)?;
        let biome_encoder = load_biome_table(biome_path)?;
        Ok(Self::new(block_decoder, block_encoder, biome_encoder))
    }

    /// Class index to block; unknown classes decode to air.
    pub fn decode(&self, index: u32) -> BlockType {
        self.block_decoder
            .get(&index)
            .copied()
            .unwrap_or(BlockType::Air)
    }

    pub fn encode_block(&self, block: BlockType) -> u32 {
        self.block_encoder
            .get(&block)
            .copied()
            .unwrap_or(DEFAULT_INDEX)
    }

    pub fn encode_biome(&self, biome: Biome) -> u32 {
        self.biome_encoder
            .get(&biome)
            .copied()
            .unwrap_or(DEFAULT_INDEX)
    }

    pub fn block_count(&self) -> usize {
        self.block_decoder.len()
    }
}

fn read_object(path: &Path) -> Result<BTreeMap<String, Value>, TableError> {
    let json = fs::read_to_string(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| TableError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_block_tables(path: &Path) -> Result<(BlockDecoder, BlockEncoder), TableError> {
    let tables = parse_block_tables(read_object(path)?);
    tracing::info!(
        "Loaded {} block mappings from {}",
        tables.0.len(),
        path.display()
    );
    Ok(tables)
}

pub fn load_biome_table(path: &Path) -> Result<BiomeEncoder, TableError> {
    let table = parse_biome_table(read_object(path)?);
    tracing::info!(
        "Loaded {} biome mappings from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

pub fn parse_block_tables(entries: BTreeMap<String, Value>) -> (BlockDecoder, BlockEncoder) {
    let mut resolved: Vec<(u32, BlockType)> = Vec::with_capacity(entries.len());

    for (key, value) in &entries {
        let Ok(index) = key.trim().parse::<u32>() else {
            tracing::warn!("Invalid class index in block mapping: {:?}", key);
            continue;
        };
        let Some(label) = value.as_str() else {
            tracing::warn!("Non-string block label for index {}: {}", index, value);
            continue;
        };
        match BlockType::from_name(label) {
            Some(block) => resolved.push((index, block)),
            None => tracing::warn!("Invalid material in model mapping: {}", label),
        }
    }

    // Lowest index wins when a label appears twice.
    resolved.sort_by_key(|(index, _)| *index);

    let mut decoder = BlockDecoder::default();
    let mut encoder = BlockEncoder::default();
    for (index, block) in resolved {
        decoder.insert(index, block);
        encoder.entry(block).or_insert(index);
    }
    (decoder, encoder)
}

pub fn parse_biome_table(entries: BTreeMap<String, Value>) -> BiomeEncoder {
    let mut encoder = BiomeEncoder::default();

    for (label, value) in &entries {
        let Some(index) = value.as_u64().and_then(|v| u32::try_from(v).ok()) else {
            tracing::warn!("Invalid class index for biome {}: {}", label, value);
            continue;
        };
        match Biome::from_name(label) {
            Some(biome) => {
                encoder.entry(biome).or_insert(index);
            }
            None => tracing::warn!("Unknown biome in model mapping: {}", label),
        }
    }
    encoder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(json: &str) -> BTreeMap<String, Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let (decoder, encoder) = parse_block_tables(object(
            r#"{"0": "AIR", "1": "stone", "two": "DIRT", "3": "UNOBTAINIUM", "4": 12}"#,
        ));
        assert_eq!(decoder.len(), 2);
        assert_eq!(decoder[&1], BlockType::Stone);
        assert_eq!(encoder[&BlockType::Air], 0);
        assert!(!encoder.contains_key(&BlockType::Dirt));

        let biomes = parse_biome_table(object(
            r#"{"PLAINS": 0, "minecraft:desert": 2, "MOON": 3, "FOREST": "x", "OCEAN": -1}"#,
        ));
        assert_eq!(biomes.len(), 2);
        assert_eq!(biomes[&Biome::Desert], 2);
    }

    #[test]
    fn test_decode_encode_roundtrip_and_defaults() {
        let (decoder, encoder) = parse_block_tables(object(
            r#"{"0": "AIR", "1": "STONE", "2": "GRASS_BLOCK", "3": "WATER", "7": "STONE"}"#,
        ));
        let tables = CategoryTables::new(decoder, encoder, BiomeEncoder::default());

        for block in [
            BlockType::Air,
            BlockType::Stone,
            BlockType::GrassBlock,
            BlockType::Water,
        ] {
            assert_eq!(tables.decode(tables.encode_block(block)), block);
        }
        assert_eq!(tables.encode_block(BlockType::Stone), 1);
        assert_eq!(tables.encode_block(BlockType::Lava), DEFAULT_INDEX);
        assert_eq!(tables.decode(999), BlockType::Air);
        assert_eq!(tables.encode_biome(Biome::Swamp), DEFAULT_INDEX);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let missing = std::env::temp_dir().join("neural-terrain-no-such-table.json");
        assert!(matches!(
            load_biome_table(&missing),
            Err(TableError::Io { .. })
        ));
    }

    #[test]
    fn test_load_from_files() {
        let dir = std::env::temp_dir().join(format!("neural-terrain-tables-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let blocks = dir.join("blocks.json");
        let biomes = dir.join("biomes.json");
        fs::write(&blocks, r#"{"0": "AIR", "5": "SAND"}"#).unwrap();
        fs::write(&biomes, r#"{"BEACH": 4}"#).unwrap();

        let tables = CategoryTables::load(&blocks, &biomes).unwrap();
        assert_eq!(tables.block_count(), 2);
        assert_eq!(tables.decode(5), BlockType::Sand);
        assert_eq!(tables.encode_biome(Biome::Beach), 4);

        fs::write(&biomes, "[1, 2, 3]").unwrap();
        assert!(matches!(
            CategoryTables::load(&blocks, &biomes),
            Err(TableError::Json { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
