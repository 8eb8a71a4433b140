use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Biome {
    #[default]
    Plains,
    Forest,
    Desert,
    SnowyPlains,
    StonyPeaks,
    Swamp,
    Ocean,
    Beach,
    River,
}

impl Biome {
    pub const ALL: [Biome; 9] = [
        Biome::Plains,
        Biome::Forest,
        Biome::Desert,
        Biome::SnowyPlains,
        Biome::StonyPeaks,
        Biome::Swamp,
        Biome::Ocean,
        Biome::Beach,
        Biome::River,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Biome::Plains => "PLAINS",
            Biome::Forest => "FOREST",
            Biome::Desert => "DESERT",
            Biome::SnowyPlains => "SNOWY_PLAINS",
            Biome::StonyPeaks => "STONY_PEAKS",
            Biome::Swamp => "SWAMP",
            Biome::Ocean => "OCEAN",
            Biome::Beach => "BEACH",
            Biome::River => "RIVER",
        }
    }

    pub fn from_name(label: &str) -> Option<Biome> {
        let label = label.trim();
        let label = label.strip_prefix("minecraft:").unwrap_or(label);
        Self::ALL
            .iter()
            .copied()
            .find(|biome| biome.name().eq_ignore_ascii_case(label))
    }

    pub fn has_trees(&self) -> bool {
        matches!(self, Biome::Plains | Biome::Forest | Biome::Swamp)
    }
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
