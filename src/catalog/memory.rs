use super::CreatureCatalog;
use crate::pokemon::PokemonInst;
use async_trait::async_trait;
use schema::{MoveData, PokemonType};
use std::collections::HashMap;

/// A catalog backed by fixed data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    creatures: HashMap<String, PokemonInst>,
    moves: HashMap<String, MoveData>,
    type_pools: HashMap<PokemonType, Vec<String>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a creature under its name. Each type it has also lists it in that type's pool.
    pub fn with_creature(mut self, pokemon: PokemonInst) -> Self {
        for pokemon_type in &pokemon.types {
            let pool = self.type_pools.entry(*pokemon_type).or_default();
            if !pool.contains(&pokemon.name) {
                pool.push(pokemon.name.clone());
            }
        }
        self.creatures.insert(pokemon.name.to_lowercase(), pokemon);
        self
    }

    pub fn with_move(mut self, move_data: MoveData) -> Self {
        self.moves.insert(move_data.name.to_lowercase(), move_data);
        self
    }
}

#[async_trait]
impl CreatureCatalog for InMemoryCatalog {
    async fn get_creature(&self, id_or_name: &str) -> Option<PokemonInst> {
        let key = id_or_name.trim().to_lowercase();
        self.creatures.get(&key).cloned().or_else(|| {
            let id: u32 = key.parse().ok()?;
            self.creatures.values().find(|p| p.species_id == id).cloned()
        })
    }

    async fn get_move(&self, name: &str) -> MoveData {
        match self.moves.get(&name.to_lowercase()) {
            Some(move_data) => move_data.clone(),
            None => MoveData::fallback(name),
        }
    }

    async fn get_species_pool_by_type(&self, pokemon_type: PokemonType) -> Vec<String> {
        self.type_pools.get(&pokemon_type).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::TestPokemonBuilder;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_lookup_by_name_and_id() {
        let catalog = InMemoryCatalog::new().with_creature(
            TestPokemonBuilder::new("onix", 5)
                .with_species_id(95)
                .with_types(vec![PokemonType::Rock, PokemonType::Ground])
                .build(),
        );
        assert_eq!(catalog.get_creature("ONIX").await.map(|p| p.species_id), Some(95));
        assert_eq!(catalog.get_creature("95").await.map(|p| p.name), Some("onix".to_string()));
        assert!(catalog.get_creature("missingno").await.is_none());
        assert_eq!(
            catalog.get_species_pool_by_type(PokemonType::Ground).await,
            vec!["onix".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unknown_move_falls_back() {
        let catalog = InMemoryCatalog::new();
        let move_data = catalog.get_move("splash").await;
        assert_eq!(move_data, MoveData::fallback("splash"));
        assert_eq!(move_data.power, 40);
        assert_eq!(move_data.move_type, PokemonType::Normal);
    }
}
