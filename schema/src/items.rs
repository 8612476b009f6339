use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Everything a trainer can carry in their bag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Item {
    Pokeball,
    Superball,
    Potion,
    Revive,
}

/// What an item does when used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemKind {
    /// Capture device with a multiplier applied to the base catch probability.
    Catch { multiplier: f64 },
    Heal,
    Revive,
}

impl Item {
    pub fn kind(self) -> ItemKind {
        match self {
            Item::Pokeball => ItemKind::Catch { multiplier: 1.0 },
            Item::Superball => ItemKind::Catch { multiplier: 1.5 },
            Item::Potion => ItemKind::Heal,
            Item::Revive => ItemKind::Revive,
        }
    }

    pub fn is_capture_device(self) -> bool {
        matches!(self.kind(), ItemKind::Catch { .. })
    }
}
