use crate::primitives::bits::TwoBitValue;

/// Per-node growth classification for the current snapshot.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum GrowthStatus {
    /// Seen only in the first snapshot; nothing to compare against yet.
    #[default]
    New,
    /// Failed to grow at least once, or had no counterpart in the previous snapshot.
    NotGrowing,
    /// Grew in every snapshot pair observed so far.
    Growing,
}

impl TwoBitValue for GrowthStatus {
    fn to_bits(self) -> u8 {
        match self {
            GrowthStatus::New => 0,
            GrowthStatus::NotGrowing => 1,
            GrowthStatus::Growing => 2,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => GrowthStatus::New,
            2 => GrowthStatus::Growing,
            _ => GrowthStatus::NotGrowing,
        }
    }
}

impl GrowthStatus {
    /// Whether a node with this status may still be promoted to `Growing`.
    pub fn can_grow(self) -> bool {
        matches!(self, GrowthStatus::New | GrowthStatus::Growing)
    }
}
