// Pokemon trainer bot schema - Shared type definitions
// This crate contains the static enums and value types shared between
// the battle engine, the creature catalog and the persisted records.

// Re-export the main types
pub use items::*;
pub use move_data::*;
pub use pokemon_types::*;

pub mod items;
pub mod move_data;
pub mod pokemon_types;
