use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum BlockType {
    #[default]
    Air,
    GrassBlock,
    Dirt,
    Stone,
    Deepslate,
    Andesite,
    Granite,
    Diorite,
    Sand,
    Sandstone,
    Water,
    Lava,
    OakLog,
    OakLeaves,
    Bedrock,
    SnowBlock,
    Gravel,
    Clay,
    Ice,
    Cactus,
    DeadBush,
    CoalOre,
    IronOre,
}

impl BlockType {
    pub const ALL: [BlockType; 23] = [
        BlockType::Air,
        BlockType::GrassBlock,
        BlockType::Dirt,
        BlockType::Stone,
        BlockType::Deepslate,
        BlockType::Andesite,
        BlockType::Granite,
        BlockType::Diorite,
        BlockType::Sand,
        BlockType::Sandstone,
        BlockType::Water,
        BlockType::Lava,
        BlockType::OakLog,
        BlockType::OakLeaves,
        BlockType::Bedrock,
        BlockType::SnowBlock,
        BlockType::Gravel,
        BlockType::Clay,
        BlockType::Ice,
        BlockType::Cactus,
        BlockType::DeadBush,
        BlockType::CoalOre,
        BlockType::IronOre,
    ];

    /// Canonical upper-case label, as used by the category tables and exports.
    pub fn name(&self) -> &'static str {
        match self {
            BlockType::Air => "AIR",
            BlockType::GrassBlock => "GRASS_BLOCK",
            BlockType::Dirt => "DIRT",
            BlockType::Stone => "STONE",
            BlockType::Deepslate => "DEEPSLATE",
            BlockType::Andesite => "ANDESITE",
            BlockType::Granite => "GRANITE",
            BlockType::Diorite => "DIORITE",
            BlockType::Sand => "SAND",
            BlockType::Sandstone => "SANDSTONE",
            BlockType::Water => "WATER",
            BlockType::Lava => "LAVA",
            BlockType::OakLog => "OAK_LOG",
            BlockType::OakLeaves => "OAK_LEAVES",
            BlockType::Bedrock => "BEDROCK",
            BlockType::SnowBlock => "SNOW_BLOCK",
            BlockType::Gravel => "GRAVEL",
            BlockType::Clay => "CLAY",
            BlockType::Ice => "ICE",
            BlockType::Cactus => "CACTUS",
            BlockType::DeadBush => "DEAD_BUSH",
            BlockType::CoalOre => "COAL_ORE",
            BlockType::IronOre => "IRON_ORE",
        }
    }

    /// Resolves a label case-insensitively, with or without a `minecraft:` namespace.
    pub fn from_name(label: &str) -> Option<BlockType> {
        let label = label.trim();
        let label = label
            .strip_prefix("minecraft:")
            .or_else(|| label.strip_prefix("MINECRAFT:"))
            .unwrap_or(label);
        Self::ALL
            .iter()
            .copied()
            .find(|block| block.name().eq_ignore_ascii_case(label))
    }

    pub fn is_air(&self) -> bool {
        *self == BlockType::Air
    }

    pub fn is_transparent(&self) -> bool {
        matches!(
            self,
            BlockType::Air
                | BlockType::Water
                | BlockType::OakLeaves
                | BlockType::Ice
                | BlockType::DeadBush
        )
    }

    pub fn is_solid_opaque(&self) -> bool {
        !self.is_transparent() && *self != BlockType::Air
    }

    /// Light this block emits on its own.
    pub fn emitted_light(&self) -> u8 {
        match self {
            BlockType::Lava => 15,
            _ => 0,
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
