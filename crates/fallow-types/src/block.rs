//! Cell contents and the bounded age capability.
//!
//! Every cell holds a [`BlockState`]: a [`BlockKind`] plus an age value that
//! only carries meaning for kinds exposing a bounded age attribute. Whether a
//! kind exposes one is a capability of the kind itself, answered by
//! [`BlockKind::age_ceiling`], so callers never need to match on individual
//! crop types.

use serde::{Deserialize, Serialize};

/// The kind of entity occupying a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    // --- Terrain ---
    /// Empty space.
    Air,
    /// Bare soil.
    Dirt,
    /// Tilled soil that crops grow on.
    Farmland,
    /// Solid rock.
    Stone,
    /// Still water.
    Water,
    /// Soul sand, the substrate nether wart grows on.
    SoulSand,

    // --- Crops (bounded age attribute) ---
    /// Wheat crop, ages 0 through 7.
    Wheat,
    /// Carrot crop, ages 0 through 7.
    Carrots,
    /// Potato crop, ages 0 through 7.
    Potatoes,
    /// Beetroot crop, ages 0 through 3.
    Beetroots,
    /// Nether wart, ages 0 through 3.
    NetherWart,
    /// Sweet berry bush, ages 0 through 3.
    SweetBerryBush,
    /// Melon stem, ages 0 through 7.
    MelonStem,
    /// Pumpkin stem, ages 0 through 7.
    PumpkinStem,
}

impl BlockKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::Air,
        Self::Dirt,
        Self::Farmland,
        Self::Stone,
        Self::Water,
        Self::SoulSand,
        Self::Wheat,
        Self::Carrots,
        Self::Potatoes,
        Self::Beetroots,
        Self::NetherWart,
        Self::SweetBerryBush,
        Self::MelonStem,
        Self::PumpkinStem,
    ];

    /// Maximum value of this kind's age attribute, or `None` if the kind
    /// does not expose one.
    pub const fn age_ceiling(self) -> Option<u8> {
        match self {
            Self::Wheat | Self::Carrots | Self::Potatoes | Self::MelonStem | Self::PumpkinStem => {
                Some(7)
            }
            Self::Beetroots | Self::NetherWart | Self::SweetBerryBush => Some(3),
            Self::Air | Self::Dirt | Self::Farmland | Self::Stone | Self::Water | Self::SoulSand => {
                None
            }
        }
    }

    /// Whether this kind exposes a bounded age attribute.
    pub const fn is_ageable(self) -> bool {
        self.age_ceiling().is_some()
    }

    /// Whether the cell counts as empty when locating a column's surface.
    pub const fn is_air(self) -> bool {
        matches!(self, Self::Air)
    }

    /// Stable lowercase name, matching the serialized form.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Dirt => "dirt",
            Self::Farmland => "farmland",
            Self::Stone => "stone",
            Self::Water => "water",
            Self::SoulSand => "soul_sand",
            Self::Wheat => "wheat",
            Self::Carrots => "carrots",
            Self::Potatoes => "potatoes",
            Self::Beetroots => "beetroots",
            Self::NetherWart => "nether_wart",
            Self::SweetBerryBush => "sweet_berry_bush",
            Self::MelonStem => "melon_stem",
            Self::PumpkinStem => "pumpkin_stem",
        }
    }
}

/// A bounded integer age read from a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeAttribute {
    /// Current age.
    pub value: u8,
    /// Maximum age for the occupying kind.
    pub ceiling: u8,
}

impl AgeAttribute {
    /// Age after advancing by `stages`, capped at the ceiling.
    ///
    /// Never returns a value below the current age.
    pub fn advanced_by(self, stages: u32) -> u8 {
        let target = u32::from(self.value).saturating_add(stages);
        let capped = target.min(u32::from(self.ceiling));
        u8::try_from(capped).unwrap_or(self.ceiling).max(self.value)
    }
}

/// The full state of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    /// What occupies the cell.
    pub kind: BlockKind,
    /// Age value. Meaningful only when `kind` is ageable; always zero
    /// otherwise.
    #[serde(default)]
    pub age: u8,
}

impl BlockState {
    /// Empty cell.
    pub const AIR: Self = Self::of(BlockKind::Air);

    /// A cell of the given kind at age zero.
    pub const fn of(kind: BlockKind) -> Self {
        Self { kind, age: 0 }
    }

    /// A crop cell of the given kind and age. The age is clamped to the
    /// kind's ceiling, and forced to zero for kinds without one.
    pub fn crop(kind: BlockKind, age: u8) -> Self {
        Self::of(kind).with_age(age)
    }

    /// Capability query: the bounded age attribute, if this cell's kind
    /// exposes one.
    pub fn bounded_age(self) -> Option<AgeAttribute> {
        self.kind.age_ceiling().map(|ceiling| AgeAttribute {
            value: self.age.min(ceiling),
            ceiling,
        })
    }

    /// Return a copy with the age set to `age`, clamped to the ceiling.
    pub fn with_age(self, age: u8) -> Self {
        let age = self.kind.age_ceiling().map_or(0, |ceiling| age.min(ceiling));
        Self { kind: self.kind, age }
    }
}

impl Default for BlockState {
    fn default() -> Self {
        Self::AIR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terrain_has_no_age() {
        assert!(BlockState::of(BlockKind::Stone).bounded_age().is_none());
        assert!(BlockState::AIR.bounded_age().is_none());
        assert!(!BlockKind::Farmland.is_ageable());
    }

    #[test]
    fn crops_report_their_ceiling() {
        let wheat = BlockState::crop(BlockKind::Wheat, 2);
        assert_eq!(
            wheat.bounded_age(),
            Some(AgeAttribute {
                value: 2,
                ceiling: 7
            })
        );
        assert_eq!(BlockKind::Beetroots.age_ceiling(), Some(3));
        assert_eq!(BlockKind::SweetBerryBush.age_ceiling(), Some(3));
    }

    #[test]
    fn with_age_clamps_to_ceiling() {
        assert_eq!(BlockState::crop(BlockKind::NetherWart, 9).age, 3);
        assert_eq!(BlockState::of(BlockKind::Dirt).with_age(4).age, 0);
    }

    #[test]
    fn advanced_by_caps_at_ceiling() {
        let attr = AgeAttribute {
            value: 5,
            ceiling: 7,
        };
        assert_eq!(attr.advanced_by(10), 7);
        assert_eq!(attr.advanced_by(1), 6);
        assert_eq!(attr.advanced_by(0), 5);
        assert_eq!(attr.advanced_by(u32::MAX), 7);
    }

    #[test]
    fn names_match_serde_form() {
        for kind in BlockKind::ALL {
            let json = serde_json::to_string(&kind).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }
}
