//! Feature extraction: turns a chunk's worth of world state into the dense
//! `[1, 10, 16, model_height, 16]` tensor the model consumes.

use glam::IVec3;
use ndarray::Array5;

use crate::constants::*;
use crate::core::biome::Biome;
use crate::core::block::BlockType;
use crate::inference::ModelWindow;
use crate::tables::CategoryTables;
use crate::world::WorldView;

pub type FeatureTensor = Array5<f32>;

// Channel layout
pub const CH_REGION_BIOME: usize = 0;
pub const CH_BIOME: usize = 1;
pub const CH_SKY_EXPOSED: usize = 2;
pub const CH_LIGHT: usize = 3;
pub const CH_WEST: usize = 4;
pub const CH_EAST: usize = 5;
pub const CH_DOWN: usize = 6;
pub const CH_UP: usize = 7;
pub const CH_NORTH: usize = 8;
pub const CH_SOUTH: usize = 9;

/// Height at which the region-level biome is sampled.
const REGION_BIOME_Y: i32 = 64;

pub struct FeatureTensorBuilder<'a> {
    tables: &'a CategoryTables,
    window: ModelWindow,
}

impl<'a> FeatureTensorBuilder<'a> {
    pub fn new(tables: &'a CategoryTables, window: ModelWindow) -> Self {
        Self { tables, window }
    }

    pub fn tensor_shape(&self) -> [usize; 5] {
        [
            1,
            FEATURE_CHANNELS,
            CHUNK_SIZE as usize,
            self.window.model_height as usize,
            CHUNK_SIZE as usize,
        ]
    }

    /// Biome of the region's centre column, used for channel 0.
    pub fn region_biome<W: WorldView + ?Sized>(world: &W, origin_x: i32, origin_z: i32) -> Biome {
        world.biome(IVec3::new(
            origin_x + CHUNK_SIZE / 2,
            REGION_BIOME_Y,
            origin_z + CHUNK_SIZE / 2,
        ))
    }

    pub fn build<W: WorldView + ?Sized>(
        &self,
        world: &W,
        origin_x: i32,
        origin_z: i32,
        region_biome: Biome,
    ) -> FeatureTensor {
        let mut tensor = FeatureTensor::zeros(self.tensor_shape());
        let min_y = world.min_y();
        let max_y = world.max_y();
        let region_code = self.tables.encode_biome(region_biome) as f32;
        let last = CHUNK_SIZE - 1;

        for x in 0..CHUNK_SIZE {
            for model_y in 0..self.window.model_height {
                let world_y = self.window.world_y(model_y);
                if world_y < min_y || world_y > max_y {
                    // Tensor starts zeroed, nothing to write.
                    continue;
                }

                for z in 0..CHUNK_SIZE {
                    let pos = IVec3::new(origin_x + x, world_y, origin_z + z);
                    // Horizontal neighbours clamp to the cell itself at the
                    // chunk edge; vertical ones are absent outside the world.
                    let west = if x > 0 { pos - IVec3::X } else { pos };
                    let east = if x < last { pos + IVec3::X } else { pos };
                    let north = if z < last { pos + IVec3::Z } else { pos };
                    let south = if z > 0 { pos - IVec3::Z } else { pos };
                    let below = (world_y > min_y).then(|| world.block(pos - IVec3::Y));
                    let above = (world_y < max_y).then(|| world.block(pos + IVec3::Y));

                    let features = [
                        region_code,
                        self.tables.encode_biome(world.biome(pos)) as f32,
                        if above == Some(BlockType::Air) { 1.0 } else { 0.0 },
                        world.light(pos) as f32 / MAX_LIGHT as f32,
                        self.block_feature(Some(world.block(west))),
                        self.block_feature(Some(world.block(east))),
                        self.block_feature(below),
                        self.block_feature(above),
                        self.block_feature(Some(world.block(north))),
                        self.block_feature(Some(world.block(south))),
                    ];

                    let (xi, yi, zi) = (x as usize, model_y as usize, z as usize);
                    for (channel, value) in features.into_iter().enumerate() {
                        tensor[[0, channel, xi, yi, zi]] = value;
                    }
                }
            }
        }

        tensor
    }

    fn block_feature(&self, block: Option<BlockType>) -> f32 {
        block.map_or(0.0, |block| self.tables.encode_block(block) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunk::Chunk;
    use crate::tables::{BiomeEncoder, BlockDecoder, BlockEncoder};
    use crate::world::{World, WorldMut};

    fn tables() -> CategoryTables {
        let blocks = [
            (0, BlockType::Air),
            (1, BlockType::Stone),
            (2, BlockType::Dirt),
            (3, BlockType::GrassBlock),
            (4, BlockType::Sand),
        ];
        let decoder: BlockDecoder = blocks.into_iter().collect();
        let encoder: BlockEncoder = blocks.into_iter().map(|(i, b)| (b, i)).collect();
        let biomes: BiomeEncoder = [(Biome::Plains, 1), (Biome::Desert, 2)].into_iter().collect();
        CategoryTables::new(decoder, encoder, biomes)
    }

    fn world_with_chunk() -> World {
        let mut world = World::new(0);
        let mut chunk = Chunk::new();
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                chunk.set_biome(x, z, Biome::Desert);
            }
        }
        world.insert_chunk(0, 0, chunk);
        world
    }

    #[test]
    fn test_channels_follow_documented_order() {
        let tables = tables();
        let mut world = world_with_chunk();
        // Cell under test at x=5, z=5, y=120 (model row 8).
        let at = |x, y, z| IVec3::new(x, y, z);
        world.set_block(at(4, 120, 5), BlockType::Stone, false).unwrap();
        world.set_block(at(6, 120, 5), BlockType::Dirt, false).unwrap();
        world.set_block(at(5, 119, 5), BlockType::GrassBlock, false).unwrap();
        world.set_block(at(5, 120, 6), BlockType::Sand, false).unwrap();
        world.set_block(at(5, 120, 4), BlockType::Stone, false).unwrap();
        world.refresh_chunk(0, 0);

        let builder = FeatureTensorBuilder::new(&tables, ModelWindow::default());
        let tensor = builder.build(&world, 0, 0, Biome::Plains);
        assert_eq!(tensor.shape(), &[1, 10, 16, 32, 16]);

        let cell = |channel: usize| tensor[[0, channel, 5, 8, 5]];
        assert_eq!(cell(CH_REGION_BIOME), 1.0);
        assert_eq!(cell(CH_BIOME), 2.0);
        assert_eq!(cell(CH_SKY_EXPOSED), 1.0);
        assert_eq!(cell(CH_LIGHT), 1.0);
        assert_eq!(cell(CH_WEST), 1.0);
        assert_eq!(cell(CH_EAST), 2.0);
        assert_eq!(cell(CH_DOWN), 3.0);
        assert_eq!(cell(CH_UP), 0.0);
        assert_eq!(cell(CH_NORTH), 4.0);
        assert_eq!(cell(CH_SOUTH), 1.0);

        // The grass block below sits in shadow but still has air above it.
        assert_eq!(tensor[[0, CH_LIGHT, 5, 7, 5]], 0.0);
        assert_eq!(tensor[[0, CH_SKY_EXPOSED, 5, 7, 5]], 1.0);
        assert_eq!(tensor[[0, CH_DOWN, 5, 9, 5]], 0.0);
    }

    #[test]
    fn test_edge_neighbours_clamp_to_self() {
        let tables = tables();
        let mut world = world_with_chunk();
        world.insert_chunk(-1, 0, Chunk::new());
        world.set_block(IVec3::new(0, 112, 0), BlockType::Sand, false).unwrap();
        world.set_block(IVec3::new(-1, 112, 0), BlockType::Stone, false).unwrap();

        let builder = FeatureTensorBuilder::new(&tables, ModelWindow::default());
        let tensor = builder.build(&world, 0, 0, Biome::Plains);

        // West of x=0 would cross into the neighbouring chunk; it reads the cell itself.
        assert_eq!(tensor[[0, CH_WEST, 0, 0, 0]], 4.0);
        assert_eq!(tensor[[0, CH_SOUTH, 0, 0, 0]], 4.0);
        assert_eq!(tensor[[0, CH_EAST, 0, 0, 0]], 0.0);
    }

    #[test]
    fn test_rows_outside_world_are_zero() {
        let tables = tables();
        let mut world = world_with_chunk();
        world.set_block(IVec3::new(0, MIN_Y, 0), BlockType::Stone, false).unwrap();
        world.set_block(IVec3::new(0, MIN_Y + 1, 0), BlockType::Dirt, false).unwrap();

        // 20-row model over a 10-row band of a world starting at MIN_Y: offset 5,
        // model rows 0..5 sit below the world floor.
        let window = ModelWindow::new(20, 10, MIN_Y);
        let builder = FeatureTensorBuilder::new(&tables, window);
        let tensor = builder.build(&world, 0, 0, Biome::Desert);

        for model_y in 0..5 {
            for channel in 0..FEATURE_CHANNELS {
                assert_eq!(tensor[[0, channel, 0, model_y, 0]], 0.0);
            }
        }
        // Model row 5 is MIN_Y: no block below, dirt above.
        assert_eq!(tensor[[0, CH_DOWN, 0, 5, 0]], 0.0);
        assert_eq!(tensor[[0, CH_UP, 0, 5, 0]], 2.0);
        assert_eq!(tensor[[0, CH_REGION_BIOME, 0, 5, 0]], 2.0);
    }

    #[test]
    fn test_region_biome_samples_centre_column() {
        let mut world = world_with_chunk();
        if let Some(chunk) = world.chunks.get_mut(&(0, 0)) {
            chunk.set_biome(8, 8, Biome::Forest);
        }
        assert_eq!(
            FeatureTensorBuilder::region_biome(&world, 0, 0),
            Biome::Forest
        );
    }
}
