use glam::IVec3;
use rustc_hash::FxHashMap;

use crate::constants::*;
use crate::core::biome::Biome;
use crate::core::block::BlockType;
use crate::core::chunk::Chunk;
use crate::error::WorldError;

/// Read access to world state, as needed by feature extraction and export.
pub trait WorldView {
    fn block(&self, pos: IVec3) -> BlockType;
    fn biome(&self, pos: IVec3) -> Biome;
    fn light(&self, pos: IVec3) -> u8;

    fn min_y(&self) -> i32 {
        MIN_Y
    }

    fn max_y(&self) -> i32 {
        MAX_Y
    }
}

/// Write access to world state. Only the foreground tick loop holds this.
pub trait WorldMut: WorldView {
    /// With `apply_physics == false` the write skips the lighting update.
    fn set_block(
        &mut self,
        pos: IVec3,
        block: BlockType,
        apply_physics: bool,
    ) -> Result<(), WorldError>;

    /// Requests that a chunk is brought up to date for clients.
    fn refresh_chunk(&mut self, cx: i32, cz: i32);
}

pub fn chunk_coords(x: i32, z: i32) -> (i32, i32) {
    (x.div_euclid(CHUNK_SIZE), z.div_euclid(CHUNK_SIZE))
}

#[derive(Default)]
pub struct World {
    pub chunks: FxHashMap<(i32, i32), Chunk>,
    pub seed: u32,
    refresh_queue: Vec<(i32, i32)>,
}

impl World {
    pub fn new(seed: u32) -> Self {
        World {
            chunks: FxHashMap::default(),
            seed,
            refresh_queue: Vec::new(),
        }
    }

    pub fn insert_chunk(&mut self, cx: i32, cz: i32, chunk: Chunk) {
        self.chunks.insert((cx, cz), chunk);
    }

    pub fn is_loaded(&self, cx: i32, cz: i32) -> bool {
        self.chunks.contains_key(&(cx, cz))
    }

    fn chunk_at(&self, x: i32, z: i32) -> Option<&Chunk> {
        self.chunks.get(&chunk_coords(x, z))
    }

    /// Chunks refreshed since the last call, oldest first.
    pub fn take_refreshed(&mut self) -> Vec<(i32, i32)> {
        for key in &self.refresh_queue {
            if let Some(chunk) = self.chunks.get_mut(key) {
                chunk.needs_refresh = false;
            }
        }
        std::mem::take(&mut self.refresh_queue)
    }
}

impl WorldView for World {
    fn block(&self, pos: IVec3) -> BlockType {
        match self.chunk_at(pos.x, pos.z) {
            Some(chunk) => chunk.get_block(
                pos.x.rem_euclid(CHUNK_SIZE),
                pos.y,
                pos.z.rem_euclid(CHUNK_SIZE),
            ),
            None => BlockType::Air,
        }
    }

    fn biome(&self, pos: IVec3) -> Biome {
        match self.chunk_at(pos.x, pos.z) {
            Some(chunk) => {
                chunk.get_biome(pos.x.rem_euclid(CHUNK_SIZE), pos.z.rem_euclid(CHUNK_SIZE))
            }
            None => Biome::default(),
        }
    }

    fn light(&self, pos: IVec3) -> u8 {
        match self.chunk_at(pos.x, pos.z) {
            Some(chunk) => chunk.get_light(
                pos.x.rem_euclid(CHUNK_SIZE),
                pos.y,
                pos.z.rem_euclid(CHUNK_SIZE),
            ),
            None => MAX_LIGHT,
        }
    }
}

impl WorldMut for World {
    fn set_block(
        &mut self,
        pos: IVec3,
        block: BlockType,
        apply_physics: bool,
    ) -> Result<(), WorldError> {
        if pos.y < MIN_Y || pos.y > MAX_Y {
            return Err(WorldError::OutOfBounds(pos.y));
        }
        let (cx, cz) = chunk_coords(pos.x, pos.z);
        let chunk = self
            .chunks
            .get_mut(&(cx, cz))
            .ok_or(WorldError::ChunkNotLoaded(cx, cz))?;

        let lx = pos.x.rem_euclid(CHUNK_SIZE);
        let lz = pos.z.rem_euclid(CHUNK_SIZE);
        chunk.set_block(lx, pos.y, lz, block);
        if apply_physics {
            chunk.recompute_column_light(lx, lz);
        }
        Ok(())
    }

    fn refresh_chunk(&mut self, cx: i32, cz: i32) {
        if let Some(chunk) = self.chunks.get_mut(&(cx, cz)) {
            chunk.recompute_light();
            if !chunk.needs_refresh {
                chunk.needs_refresh = true;
                self.refresh_queue.push((cx, cz));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_coordinates_map_to_correct_chunk() {
        assert_eq!(chunk_coords(-1, -16), (-1, -1));
        assert_eq!(chunk_coords(-17, 15), (-2, 0));

        let mut world = World::new(1);
        world.insert_chunk(-1, 0, Chunk::new());
        let pos = IVec3::new(-1, 70, 5);
        world.set_block(pos, BlockType::Stone, true).unwrap();
        assert_eq!(world.block(pos), BlockType::Stone);
        assert_eq!(world.light(pos), 0);
    }

    #[test]
    fn test_invalid_writes_are_reported() {
        let mut world = World::new(1);
        world.insert_chunk(0, 0, Chunk::new());

        assert_eq!(
            world.set_block(IVec3::new(0, MAX_Y + 1, 0), BlockType::Stone, false),
            Err(WorldError::OutOfBounds(MAX_Y + 1))
        );
        assert_eq!(
            world.set_block(IVec3::new(32, 0, 0), BlockType::Stone, false),
            Err(WorldError::ChunkNotLoaded(2, 0))
        );
    }

    #[test]
    fn test_refresh_relights_and_queues_once() {
        let mut world = World::new(1);
        world.insert_chunk(0, 0, Chunk::new());
        let pos = IVec3::new(2, 0, 2);
        world.set_block(pos, BlockType::Stone, false).unwrap();
        assert_eq!(world.light(pos.with_y(-1)), MAX_LIGHT);

        world.refresh_chunk(0, 0);
        world.refresh_chunk(0, 0);
        assert_eq!(world.light(pos.with_y(-1)), 0);
        assert_eq!(world.take_refreshed(), vec![(0, 0)]);
        assert!(world.take_refreshed().is_empty());
    }
}
