use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::constants::*;
use crate::core::biome::Biome;
use crate::core::block::BlockType;
use crate::core::chunk::Chunk;
use crate::error::SaveError;
use crate::world::World;

const MAGIC_HEADER: &[u8; 4] = b"NTWS";
const VERSION: u32 = 1;

/// A non-air block, in chunk-local x/z and absolute y.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SavedBlock {
    pub x: u8,
    pub y: i16,
    pub z: u8,
    pub block_type: BlockType,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SavedChunk {
    pub cx: i32,
    pub cz: i32,
    /// 256 entries, x-major.
    pub biomes: Vec<Biome>,
    pub blocks: Vec<SavedBlock>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SavedWorld {
    pub seed: u32,
    pub chunks: Vec<SavedChunk>,
}

impl SavedWorld {
    pub fn from_world(world: &World) -> Self {
        let mut chunks: Vec<SavedChunk> = world
            .chunks
            .iter()
            .map(|(&(cx, cz), chunk)| {
                let mut biomes = Vec::with_capacity((CHUNK_SIZE * CHUNK_SIZE) as usize);
                let mut blocks = Vec::new();
                for x in 0..CHUNK_SIZE {
                    for z in 0..CHUNK_SIZE {
                        biomes.push(chunk.get_biome(x, z));
                        for y in MIN_Y..=MAX_Y {
                            let block_type = chunk.get_block(x, y, z);
                            if !block_type.is_air() {
                                blocks.push(SavedBlock {
                                    x: x as u8,
                                    y: y as i16,
                                    z: z as u8,
                                    block_type,
                                });
                            }
                        }
                    }
                }
                SavedChunk {
                    cx,
                    cz,
                    biomes,
                    blocks,
                }
            })
            .collect();
        // Map iteration order is arbitrary; keep files reproducible.
        chunks.sort_by_key(|chunk| (chunk.cx, chunk.cz));

        SavedWorld {
            seed: world.seed,
            chunks,
        }
    }

    pub fn into_world(self) -> World {
        let mut world = World::new(self.seed);
        for saved in self.chunks {
            let mut chunk = Chunk::new();
            for (i, biome) in saved.biomes.into_iter().enumerate() {
                let i = i as i32;
                chunk.set_biome(i / CHUNK_SIZE, i % CHUNK_SIZE, biome);
            }
            for block in saved.blocks {
                chunk.set_block(block.x as i32, block.y as i32, block.z as i32, block.block_type);
            }
            chunk.recompute_light();
            world.insert_chunk(saved.cx, saved.cz, chunk);
        }
        world
    }
}

pub fn save_world<P: AsRef<Path>>(path: P, world: &SavedWorld) -> Result<(), SaveError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC_HEADER)?;
    writer.write_all(&VERSION.to_le_bytes())?;

    let data = bincode::serialize(world)?;
    writer.write_all(&(data.len() as u64).to_le_bytes())?;
    writer.write_all(&data)?;
    writer.flush()?;
    Ok(())
}

pub fn load_world<P: AsRef<Path>>(path: P) -> Result<SavedWorld, SaveError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC_HEADER {
        return Err(SaveError::BadMagic);
    }

    let mut version_bytes = [0u8; 4];
    reader.read_exact(&mut version_bytes)?;
    let version = u32::from_le_bytes(version_bytes);
    if version != VERSION {
        return Err(SaveError::Version(version));
    }

    let mut size_bytes = [0u8; 8];
    reader.read_exact(&mut size_bytes)?;
    let size = u64::from_le_bytes(size_bytes) as usize;

    let mut data = vec![0u8; size];
    reader.read_exact(&mut data)?;
    Ok(bincode::deserialize(&data)?)
}

pub const DEFAULT_WORLD_FILE: &str = "world.ntw";
