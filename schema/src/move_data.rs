use crate::PokemonType;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MOVE_POWER: u16 = 40;
pub const DEFAULT_MOVE_ACCURACY: u8 = 100;

/// Battle-relevant data for a single move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveData {
    pub name: String,
    pub power: u16,
    pub move_type: PokemonType,
    /// Percentage in 1..=100.
    pub accuracy: u8,
}

impl MoveData {
    /// The stand-in used when a move cannot be looked up.
    pub fn fallback(name: &str) -> Self {
        MoveData {
            name: name.to_string(),
            power: DEFAULT_MOVE_POWER,
            move_type: PokemonType::default(),
            accuracy: DEFAULT_MOVE_ACCURACY,
        }
    }
}
