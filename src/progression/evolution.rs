use super::ProgressionResolver;
use crate::catalog::CreatureCatalog;
use crate::pokemon::PokemonInst;

/// Minimum level for any evolution.
pub const EVOLUTION_LEVEL: u8 = 30;

impl ProgressionResolver {
    /// A creature can evolve once it has a known next stage and is level 30 or higher.
    pub fn can_evolve(&self, pokemon: &PokemonInst) -> bool {
        pokemon.evolves_into.is_some() && pokemon.level >= EVOLUTION_LEVEL
    }

    /// Carries level and experience over to the freshly fetched form. Stats and
    /// moves are the new species' base values.
    pub fn apply_evolution(&self, before: &PokemonInst, mut evolved: PokemonInst) -> PokemonInst {
        evolved.level = before.level;
        evolved.experience = before.experience;
        evolved
    }

    /// Fetches the next stage and returns the evolved creature, or None when
    /// the creature is not eligible or the target cannot be fetched.
    pub async fn evolve_pokemon<C: CreatureCatalog + ?Sized>(
        &self,
        pokemon: &PokemonInst,
        catalog: &C,
    ) -> Option<PokemonInst> {
        if !self.can_evolve(pokemon) {
            return None;
        }
        let target = pokemon.evolves_into.as_deref()?;
        let evolved = catalog.get_creature(target).await?;
        Some(self.apply_evolution(pokemon, evolved))
    }
}
