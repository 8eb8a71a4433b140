use crate::constants::*;
use crate::core::biome::Biome;
use crate::core::block::BlockType;

const SIZE: usize = CHUNK_SIZE as usize;
const SUB: usize = SUBCHUNK_HEIGHT as usize;

pub struct SubChunk {
    pub blocks: [[[BlockType; SIZE]; SUB]; SIZE],
    pub light: [[[u8; SIZE]; SUB]; SIZE],
}

impl SubChunk {
    pub fn new() -> Self {
        SubChunk {
            blocks: [[[BlockType::Air; SIZE]; SUB]; SIZE],
            light: [[[MAX_LIGHT; SIZE]; SUB]; SIZE],
        }
    }
}

impl Default for SubChunk {
    fn default() -> Self {
        Self::new()
    }
}

/// A full-height 16x16 column of the world. Local `x`/`z` are in `0..16`,
/// `y` is an absolute world height in `MIN_Y..=MAX_Y`.
pub struct Chunk {
    pub subchunks: Vec<SubChunk>,
    pub biomes: [[Biome; SIZE]; SIZE],
    /// Set when the chunk has to be resent to clients.
    pub needs_refresh: bool,
}

impl Chunk {
    pub fn new() -> Self {
        let mut subchunks = Vec::with_capacity(NUM_SUBCHUNKS as usize);
        for _ in 0..NUM_SUBCHUNKS {
            subchunks.push(SubChunk::new());
        }
        Chunk {
            subchunks,
            biomes: [[Biome::default(); SIZE]; SIZE],
            needs_refresh: false,
        }
    }

    fn locate(x: i32, y: i32, z: i32) -> Option<(usize, usize, usize, usize)> {
        if !(0..CHUNK_SIZE).contains(&x) || !(0..CHUNK_SIZE).contains(&z) {
            return None;
        }
        if !(MIN_Y..=MAX_Y).contains(&y) {
            return None;
        }
        let rel_y = y - MIN_Y;
        let subchunk_idx = (rel_y / SUBCHUNK_HEIGHT) as usize;
        let local_y = (rel_y % SUBCHUNK_HEIGHT) as usize;
        Some((subchunk_idx, x as usize, local_y, z as usize))
    }

    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockType {
        match Self::locate(x, y, z) {
            Some((s, lx, ly, lz)) => self.subchunks[s].blocks[lx][ly][lz],
            None => BlockType::Air,
        }
    }

    /// Returns `false` when the position is outside the chunk.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockType) -> bool {
        let Some((s, lx, ly, lz)) = Self::locate(x, y, z) else {
            return false;
        };
        self.subchunks[s].blocks[lx][ly][lz] = block;
        true
    }

    pub fn get_light(&self, x: i32, y: i32, z: i32) -> u8 {
        match Self::locate(x, y, z) {
            Some((s, lx, ly, lz)) => self.subchunks[s].light[lx][ly][lz],
            None => MAX_LIGHT,
        }
    }

    pub fn get_biome(&self, x: i32, z: i32) -> Biome {
        if (0..CHUNK_SIZE).contains(&x) && (0..CHUNK_SIZE).contains(&z) {
            self.biomes[x as usize][z as usize]
        } else {
            Biome::default()
        }
    }

    pub fn set_biome(&mut self, x: i32, z: i32, biome: Biome) {
        if (0..CHUNK_SIZE).contains(&x) && (0..CHUNK_SIZE).contains(&z) {
            self.biomes[x as usize][z as usize] = biome;
        }
    }

    /// Sky light falls straight down until the first opaque block; emitters
    /// light their own cell.
    pub fn recompute_column_light(&mut self, x: i32, z: i32) {
        let mut sky = MAX_LIGHT;
        for y in (MIN_Y..=MAX_Y).rev() {
            let Some((s, lx, ly, lz)) = Self::locate(x, y, z) else {
                return;
            };
            let block = self.subchunks[s].blocks[lx][ly][lz];
            if block.is_solid_opaque() {
                sky = 0;
            }
            self.subchunks[s].light[lx][ly][lz] = sky.max(block.emitted_light());
        }
    }

    pub fn recompute_light(&mut self) {
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                self.recompute_column_light(x, z);
            }
        }
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_storage_spans_full_height() {
        let mut chunk = Chunk::new();
        assert!(chunk.set_block(3, MIN_Y, 4, BlockType::Bedrock));
        assert!(chunk.set_block(3, MAX_Y, 4, BlockType::Stone));
        assert!(!chunk.set_block(3, MAX_Y + 1, 4, BlockType::Stone));
        assert!(!chunk.set_block(16, 0, 4, BlockType::Stone));

        assert_eq!(chunk.get_block(3, MIN_Y, 4), BlockType::Bedrock);
        assert_eq!(chunk.get_block(3, MAX_Y, 4), BlockType::Stone);
        assert_eq!(chunk.get_block(3, MIN_Y - 1, 4), BlockType::Air);
    }

    #[test]
    fn test_column_light_stops_at_opaque_block() {
        let mut chunk = Chunk::new();
        chunk.set_block(0, 10, 0, BlockType::Stone);
        chunk.recompute_column_light(0, 0);

        assert_eq!(chunk.get_light(0, 11, 0), MAX_LIGHT);
        assert_eq!(chunk.get_light(0, 10, 0), 0);
        assert_eq!(chunk.get_light(0, 9, 0), 0);
    }
}
