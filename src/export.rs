//! Region-observation export: dumps every voxel of a chunk with its
//! surroundings to CSV, for collecting training data offline.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use glam::IVec3;

use crate::constants::*;
use crate::error::ExportError;
use crate::world::WorldView;

pub const CSV_HEADER: &str = "x,y,z,ChunkBiome,Biome,Block_ID,Is_Surface,Light_Level,\
Block_to_Left,Block_to_Right,Block_Below,Block_Above,Block_in_Front,Block_Behind";

/// Where an export goes. Owned by the caller and passed to each export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    path: PathBuf,
}

impl ExportConfig {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let path = path.into();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(ExportError::NotCsv(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Biome at the surface of the chunk's centre column.
pub fn chunk_biome_name<W: WorldView + ?Sized>(world: &W, chunk_x: i32, chunk_z: i32) -> &'static str {
    let x = chunk_x * CHUNK_SIZE + CHUNK_SIZE / 2;
    let z = chunk_z * CHUNK_SIZE + CHUNK_SIZE / 2;
    let mut y = world.max_y();
    while y > world.min_y() && world.block(IVec3::new(x, y, z)).is_air() {
        y -= 1;
    }
    world.biome(IVec3::new(x, y, z)).name()
}

/// Writes one row per voxel, z fastest, then y, then x. Returns the row count.
pub fn export_region<W: WorldView + ?Sized>(
    world: &W,
    chunk_x: i32,
    chunk_z: i32,
    config: &ExportConfig,
) -> Result<usize, ExportError> {
    let path = config.path();
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    writeln!(writer, "{}", CSV_HEADER).map_err(io_error)?;

    let chunk_biome = chunk_biome_name(world, chunk_x, chunk_z);
    let mut rows = 0;
    for x in 0..CHUNK_SIZE {
        for y in world.min_y()..=world.max_y() {
            for z in 0..CHUNK_SIZE {
                let pos = IVec3::new(chunk_x * CHUNK_SIZE + x, y, chunk_z * CHUNK_SIZE + z);
                let name = |offset: IVec3| world.block(pos + offset).name();
                writeln!(
                    writer,
                    "{},{},{},{},{},{},{},{:.1},{},{},{},{},{},{}",
                    x,
                    y,
                    z,
                    chunk_biome,
                    world.biome(pos).name(),
                    world.block(pos).name(),
                    world.block(pos + IVec3::Y).is_air(),
                    world.light(pos) as f64,
                    name(-IVec3::X),
                    name(IVec3::X),
                    name(-IVec3::Y),
                    name(IVec3::Y),
                    name(-IVec3::Z),
                    name(IVec3::Z),
                )
                .map_err(io_error)?;
                rows += 1;
            }
        }
    }
    writer.flush().map_err(io_error)?;

    tracing::info!(
        "Exported {} rows for chunk {}, {} to {}",
        rows,
        chunk_x,
        chunk_z,
        path.display()
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::biome::Biome;
    use crate::core::block::BlockType;
    use crate::core::chunk::Chunk;
    use crate::world::{World, WorldMut};

    #[test]
    fn test_path_must_be_csv() {
        assert!(ExportConfig::new("out/data.csv").is_ok());
        assert!(ExportConfig::new("DATA.CSV").is_ok());
        assert!(matches!(
            ExportConfig::new("out/data.txt"),
            Err(ExportError::NotCsv(_))
        ));
        assert!(ExportConfig::new("csv").is_err());
    }

    #[test]
    fn test_chunk_biome_comes_from_centre_column() {
        let mut world = World::new(0);
        let mut chunk = Chunk::new();
        chunk.set_biome(8, 8, Biome::Swamp);
        world.insert_chunk(-1, 2, chunk);
        // All-air column bottoms out at the floor and still reports its biome.
        assert_eq!(chunk_biome_name(&world, -1, 2), Biome::Swamp.name());

        world.set_block(IVec3::new(-8, 40, 40), BlockType::GrassBlock, true).unwrap();
        world.set_block(IVec3::new(-7, 90, 40), BlockType::Stone, true).unwrap();
        assert_eq!(chunk_biome_name(&world, -1, 2), Biome::Swamp.name());
        assert_eq!(chunk_biome_name(&world, -1, 3), Biome::default().name());
    }

    #[test]
    fn test_export_writes_every_voxel() {
        let mut world = World::new(0);
        let mut chunk = Chunk::new();
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                chunk.set_biome(x, z, Biome::Desert);
            }
        }
        world.insert_chunk(0, 0, chunk);
        world.insert_chunk(-1, 0, Chunk::new());
        world.set_block(IVec3::new(8, 70, 8), BlockType::Sand, true).unwrap();
        world.set_block(IVec3::new(-1, MIN_Y, 0), BlockType::Bedrock, true).unwrap();

        let dir = std::env::temp_dir().join(format!("neural-terrain-export-{}", std::process::id()));
        let config = ExportConfig::new(dir.join("nested").join("chunk.csv")).unwrap();
        let rows = export_region(&world, 0, 0, &config).unwrap();
        let text = fs::read_to_string(config.path()).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(rows, (16 * WORLD_HEIGHT * 16) as usize);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), rows + 1);
        assert_eq!(lines[0], CSV_HEADER);
        // First row: x=0, y=MIN_Y, z=0, its west neighbour is in the next chunk over.
        assert_eq!(
            lines[1],
            "0,-64,0,DESERT,DESERT,AIR,true,15.0,BEDROCK,AIR,AIR,AIR,AIR,AIR"
        );

        let sand_row = "8,70,8,DESERT,DESERT,SAND,true,0.0,AIR,AIR,AIR,AIR,AIR,AIR";
        assert!(lines.contains(&sand_row));
        let below_sand = "8,69,8,DESERT,DESERT,AIR,false,0.0,AIR,AIR,AIR,SAND,AIR,AIR";
        assert!(lines.contains(&below_sand));
    }
}
