//! Noise-driven chunk generation using FastNoiseLite
//!
//! Produces full-height columns (`MIN_Y..=MAX_Y`) with biomes, caves, ores
//! and a little surface decoration, so there is real terrain for the model
//! to read and overwrite. Deterministic for a given seed.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};

use crate::constants::*;
use crate::core::biome::Biome;
use crate::core::block::BlockType;
use crate::core::chunk::Chunk;

const SIZE: usize = CHUNK_SIZE as usize;

/// Thread-safe chunk generator with pre-configured FastNoiseLite instances
pub struct ChunkGenerator {
    noise_continents: FastNoiseLite,
    noise_terrain: FastNoiseLite,
    noise_detail: FastNoiseLite,
    noise_temperature: FastNoiseLite,
    noise_moisture: FastNoiseLite,
    noise_river: FastNoiseLite,
    noise_cave: FastNoiseLite,
    noise_ore: FastNoiseLite,
    pub seed: u32,
}

impl ChunkGenerator {
    pub fn new(seed: u32) -> Self {
        ChunkGenerator {
            noise_continents: Self::create_noise(seed, 0.002),
            noise_terrain: Self::create_fbm_noise(seed.wrapping_add(1), 0.008),
            noise_detail: Self::create_fbm_noise(seed.wrapping_add(2), 0.03),
            noise_temperature: Self::create_noise(seed.wrapping_add(3), 0.004),
            noise_moisture: Self::create_noise(seed.wrapping_add(4), 0.005),
            noise_river: Self::create_noise(seed.wrapping_add(5), 0.01),
            noise_cave: Self::create_fbm_noise(seed.wrapping_add(9), 0.04),
            noise_ore: Self::create_noise(seed.wrapping_add(11), 0.12),
            seed,
        }
    }

    fn create_noise(seed: u32, frequency: f32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(frequency));
        noise
    }

    fn create_fbm_noise(seed: u32, frequency: f32) -> FastNoiseLite {
        let mut noise = Self::create_noise(seed, frequency);
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(4));
        noise.set_fractal_lacunarity(Some(2.0));
        noise.set_fractal_gain(Some(0.5));
        noise
    }

    /// Generate a complete chunk at the given chunk coordinates
    pub fn generate_chunk(&self, cx: i32, cz: i32) -> Chunk {
        let mut chunk = Chunk::new();
        let base_x = cx * CHUNK_SIZE;
        let base_z = cz * CHUNK_SIZE;

        let mut height_map = [[0i32; SIZE]; SIZE];

        for lx in 0..CHUNK_SIZE {
            for lz in 0..CHUNK_SIZE {
                let world_x = base_x + lx;
                let world_z = base_z + lz;
                let biome = self.get_biome(world_x, world_z);
                let surface = self.get_terrain_height(world_x, world_z, biome);
                chunk.set_biome(lx, lz, biome);
                height_map[lx as usize][lz as usize] = surface;

                for y in MIN_Y..=MAX_Y {
                    let block = if y < surface {
                        self.get_block_for_biome(biome, y, surface, world_x, world_z)
                    } else if y < SEA_LEVEL {
                        if biome == Biome::SnowyPlains && y == SEA_LEVEL - 1 {
                            BlockType::Ice
                        } else {
                            BlockType::Water
                        }
                    } else {
                        BlockType::Air
                    };
                    if block != BlockType::Air {
                        chunk.set_block(lx, y, lz, block);
                    }
                }
            }
        }

        self.carve_caves(&mut chunk, base_x, base_z, &height_map);
        self.generate_decorations(&mut chunk, base_x, base_z, &height_map);

        chunk.recompute_light();
        chunk
    }

    fn get_biome(&self, x: i32, z: i32) -> Biome {
        let fx = x as f32;
        let fz = z as f32;

        let continent = self.noise_continents.get_noise_2d(fx, fz);
        let river_value = 1.0 - self.noise_river.get_noise_2d(fx, fz).abs() * 1.5;

        if river_value > 0.9 && continent > -0.3 {
            return Biome::River;
        }
        if continent < -0.35 {
            return Biome::Ocean;
        }
        if continent < -0.2 {
            return Biome::Beach;
        }

        let temp = self.noise_temperature.get_noise_2d(fx, fz);
        let moist = self.noise_moisture.get_noise_2d(fx, fz);

        if temp < -0.3 {
            Biome::SnowyPlains
        } else if temp > 0.5 && moist < -0.2 {
            Biome::Desert
        } else if moist > 0.35 {
            Biome::Swamp
        } else if moist > -0.2 {
            Biome::Forest
        } else if self.noise_terrain.get_noise_2d(fx + 1000.0, fz + 1000.0) > 0.4 {
            Biome::StonyPeaks
        } else {
            Biome::Plains
        }
    }

    fn get_terrain_height(&self, x: i32, z: i32, biome: Biome) -> i32 {
        let fx = x as f32;
        let fz = z as f32;
        let continental = self.noise_continents.get_noise_2d(fx, fz) as f64;
        let terrain = self.noise_terrain.get_noise_2d(fx, fz) as f64;
        let detail = self.noise_detail.get_noise_2d(fx, fz) as f64;
        let sea = SEA_LEVEL as f64;

        let height = match biome {
            Biome::Ocean => sea - 20.0 + continental * 10.0 + detail * 3.0,
            Biome::River => sea - 3.0 + detail * 2.0,
            Biome::Beach => sea + 1.0 + terrain * 2.0,
            Biome::Swamp => sea + 1.0 + terrain * 2.0 + detail,
            Biome::Plains => sea + 4.0 + terrain * 4.0 + detail * 2.0,
            Biome::Forest => sea + 6.0 + terrain * 8.0 + detail * 3.0,
            Biome::Desert => sea + 3.0 + terrain * 6.0 + detail * 2.0,
            Biome::SnowyPlains => sea + 6.0 + terrain * 6.0 + detail * 2.0,
            Biome::StonyPeaks => sea + 30.0 + (terrain + 1.0) * 40.0 + detail * 6.0,
        };
        (height as i32).clamp(MIN_Y + 8, MAX_Y - 32)
    }

    fn get_block_for_biome(
        &self,
        biome: Biome,
        y: i32,
        surface: i32,
        world_x: i32,
        world_z: i32,
    ) -> BlockType {
        if y == MIN_Y {
            return BlockType::Bedrock;
        }
        if y < MIN_Y + 5 {
            let bedrock_chance = (MIN_Y + 5 - y) as u32 * 20;
            if self.position_hash_3d(world_x, y, world_z) % 100 < bedrock_chance {
                return BlockType::Bedrock;
            }
        }

        let depth = surface - y;
        let dirt_depth = 3 + (self.position_hash(world_x, world_z) % 3) as i32;

        if depth > dirt_depth + 3 {
            return self.get_stone(y, world_x, world_z);
        }

        match biome {
            Biome::Ocean | Biome::River => {
                if depth > 3 {
                    BlockType::Gravel
                } else {
                    BlockType::Sand
                }
            }
            Biome::Beach => BlockType::Sand,
            Biome::Desert => {
                if depth > 3 {
                    BlockType::Sandstone
                } else {
                    BlockType::Sand
                }
            }
            Biome::StonyPeaks => {
                if depth == 1 && y > 140 {
                    BlockType::SnowBlock
                } else {
                    BlockType::Stone
                }
            }
            Biome::SnowyPlains if depth == 1 => BlockType::SnowBlock,
            Biome::Swamp if depth == 1 && y <= SEA_LEVEL => BlockType::Clay,
            _ if depth == 1 => BlockType::GrassBlock,
            _ => BlockType::Dirt,
        }
    }

    fn get_stone(&self, y: i32, world_x: i32, world_z: i32) -> BlockType {
        let ore = self
            .noise_ore
            .get_noise_3d(world_x as f32, y as f32, world_z as f32);
        if ore > 0.75 {
            return if y < 16 {
                BlockType::IronOre
            } else {
                BlockType::CoalOre
            };
        }
        if y < 0 {
            return BlockType::Deepslate;
        }
        match self.position_hash_3d(world_x, y, world_z) % 40 {
            0 => BlockType::Andesite,
            1 => BlockType::Granite,
            2 => BlockType::Diorite,
            _ => BlockType::Stone,
        }
    }

    fn carve_caves(
        &self,
        chunk: &mut Chunk,
        base_x: i32,
        base_z: i32,
        height_map: &[[i32; SIZE]; SIZE],
    ) {
        for lx in 0..CHUNK_SIZE {
            for lz in 0..CHUNK_SIZE {
                let surface = height_map[lx as usize][lz as usize];
                for y in (MIN_Y + 5)..(surface - 8) {
                    let density = self.noise_cave.get_noise_3d(
                        (base_x + lx) as f32,
                        y as f32 * 1.5,
                        (base_z + lz) as f32,
                    );
                    if density > 0.55 {
                        let fill = if y < MIN_Y + 10 {
                            BlockType::Lava
                        } else {
                            BlockType::Air
                        };
                        chunk.set_block(lx, y, lz, fill);
                    }
                }
            }
        }
    }

    fn generate_decorations(
        &self,
        chunk: &mut Chunk,
        base_x: i32,
        base_z: i32,
        height_map: &[[i32; SIZE]; SIZE],
    ) {
        let margin = 3;
        for lx in margin..(CHUNK_SIZE - margin) {
            for lz in margin..(CHUNK_SIZE - margin) {
                let height = height_map[lx as usize][lz as usize];
                if height <= SEA_LEVEL {
                    continue;
                }
                let biome = chunk.get_biome(lx, lz);
                let hash = self.position_hash(base_x + lx, base_z + lz);
                let ground = chunk.get_block(lx, height - 1, lz);

                if biome.has_trees() && hash % 100 < 3 && ground == BlockType::GrassBlock {
                    self.place_tree(chunk, lx, height, lz);
                } else if biome == Biome::Desert && hash % 100 < 2 && ground == BlockType::Sand {
                    let cactus_height = 2 + (hash % 2) as i32;
                    for dy in 0..cactus_height {
                        chunk.set_block(lx, height + dy, lz, BlockType::Cactus);
                    }
                } else if biome == Biome::Desert && hash % 100 < 4 && ground == BlockType::Sand {
                    chunk.set_block(lx, height, lz, BlockType::DeadBush);
                }
            }
        }
    }

    fn place_tree(&self, chunk: &mut Chunk, lx: i32, y: i32, lz: i32) {
        let trunk_height = 5;
        for dy in 0..trunk_height {
            chunk.set_block(lx, y + dy, lz, BlockType::OakLog);
        }
        for dy in 3..=trunk_height {
            let radius = if dy == trunk_height { 1 } else { 2 };
            for dx in -radius..=radius {
                for dz in -radius..=radius {
                    let (nx, ny, nz) = (lx + dx, y + dy, lz + dz);
                    if chunk.get_block(nx, ny, nz) == BlockType::Air {
                        chunk.set_block(nx, ny, nz, BlockType::OakLeaves);
                    }
                }
            }
        }
    }

    fn position_hash(&self, x: i32, z: i32) -> u32 {
        let mut hash = self.seed;
        hash = hash.wrapping_add(x as u32).wrapping_mul(73856093);
        hash = hash.wrapping_add(z as u32).wrapping_mul(19349663);
        hash ^ (hash >> 16)
    }

    fn position_hash_3d(&self, x: i32, y: i32, z: i32) -> u32 {
        let mut hash = self.seed;
        hash = hash.wrapping_add(x as u32).wrapping_mul(73856093);
        hash = hash.wrapping_add(y as u32).wrapping_mul(19349663);
        hash = hash.wrapping_add(z as u32).wrapping_mul(83492791);
        hash ^ (hash >> 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = ChunkGenerator::new(42).generate_chunk(3, -2);
        let b = ChunkGenerator::new(42).generate_chunk(3, -2);
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                assert_eq!(a.get_biome(x, z), b.get_biome(x, z));
                for y in (MIN_Y..=MAX_Y).step_by(7) {
                    assert_eq!(a.get_block(x, y, z), b.get_block(x, y, z));
                }
            }
        }
    }

    #[test]
    fn test_floor_is_bedrock_and_sky_is_air() {
        let chunk = ChunkGenerator::new(7).generate_chunk(0, 0);
        assert_eq!(chunk.get_block(0, MIN_Y, 0), BlockType::Bedrock);
        assert_eq!(chunk.get_block(0, MAX_Y, 0), BlockType::Air);
        assert_eq!(chunk.get_light(0, MAX_Y, 0), MAX_LIGHT);
    }
}
