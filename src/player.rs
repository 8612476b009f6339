use crate::pokemon::PokemonInst;
use schema::Item;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Largest roster a trainer can hold.
pub const MAX_TEAM_SIZE: usize = 6;

/// A registered player, keyed by their chat id in the trainer store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Trainer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub team: Vec<PokemonInst>,
    #[serde(default)]
    pub badges: BTreeSet<String>,
    #[serde(default)]
    pub items: BTreeMap<Item, u32>,
    #[serde(default)]
    pub starter: Option<String>,
}

impl Trainer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, items: BTreeMap<Item, u32>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            team: Vec::new(),
            badges: BTreeSet::new(),
            items,
            starter: None,
        }
    }

    pub fn item_count(&self, item: Item) -> u32 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    /// Removes one of `item` from the bag. Returns false if none were left.
    pub fn consume_item(&mut self, item: Item) -> bool {
        match self.items.get_mut(&item) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn team_is_full(&self, max_team_size: usize) -> bool {
        self.team.len() >= max_team_size
    }

    /// Adds a creature if there is room. The first creature ever kept becomes the starter.
    pub fn add_to_team(&mut self, pokemon: PokemonInst, max_team_size: usize) -> bool {
        if self.team_is_full(max_team_size) {
            return false;
        }
        if self.starter.is_none() {
            self.starter = Some(pokemon.name.clone());
        }
        self.team.push(pokemon);
        true
    }

    /// Roster indices of every creature that can still fight.
    pub fn conscious_members(&self) -> Vec<usize> {
        self.team
            .iter()
            .enumerate()
            .filter(|(_, pokemon)| !pokemon.is_fainted())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn has_badge(&self, gym_name: &str) -> bool {
        self.badges.contains(gym_name)
    }

    /// Returns true if the badge is new.
    pub fn award_badge(&mut self, gym_name: &str) -> bool {
        self.badges.insert(gym_name.to_string())
    }
}
