//! Creature, move and type lookups.
//!
//! The game only talks to the [`CreatureCatalog`] trait. [`PokeApiCatalog`]
//! is the networked implementation; [`InMemoryCatalog`] serves fixed data for
//! tests and offline play.

mod memory;
mod pokeapi;

pub use memory::InMemoryCatalog;
pub use pokeapi::{PokeApiCatalog, DEFAULT_API_BASE};

use crate::pokemon::PokemonInst;
use async_trait::async_trait;
use schema::{MoveData, PokemonType};

/// Level every freshly fetched creature starts at.
pub const STARTING_LEVEL: u8 = 5;

#[async_trait]
pub trait CreatureCatalog: Send + Sync {
    /// A level-5 instance of the species at full health, or None when it cannot be found.
    async fn get_creature(&self, id_or_name: &str) -> Option<PokemonInst>;

    /// Move data, degrading to [`MoveData::fallback`] when the lookup fails.
    async fn get_move(&self, name: &str) -> MoveData;

    /// Species names carrying the given type. Empty when the lookup fails.
    async fn get_species_pool_by_type(&self, pokemon_type: PokemonType) -> Vec<String>;
}
