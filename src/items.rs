//! Using bag items on a trainer's roster.

use crate::player::Trainer;
use schema::Item;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemUseError {
    #[error("You're out of {}!", plural(.0))]
    OutOfItem(Item),
    #[error("You don't have any Pokémon to heal!")]
    EmptyTeam,
    #[error("No fainted Pokémon to revive!")]
    NothingToRevive,
    #[error("There is no Pokémon in slot {}!", slot_number(.0))]
    InvalidTarget(usize),
}

fn plural(item: &Item) -> String {
    match item {
        Item::Potion => "potions".to_string(),
        Item::Revive => "revives".to_string(),
        other => other.to_string(),
    }
}

fn slot_number(index: &usize) -> usize {
    index + 1
}

/// The effect of a successfully used item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUse {
    pub roster_index: usize,
    pub name: String,
    pub restored: u16,
    pub hp: u16,
    pub max_hp: u16,
}

/// Heals the creature at `roster_index` by `heal_amount`, capped at its max hp.
pub fn use_potion(trainer: &mut Trainer, roster_index: usize, heal_amount: u16) -> Result<ItemUse, ItemUseError> {
    if trainer.item_count(Item::Potion) == 0 {
        return Err(ItemUseError::OutOfItem(Item::Potion));
    }
    if trainer.team.is_empty() {
        return Err(ItemUseError::EmptyTeam);
    }
    if roster_index >= trainer.team.len() {
        return Err(ItemUseError::InvalidTarget(roster_index));
    }

    trainer.consume_item(Item::Potion);
    let pokemon = &mut trainer.team[roster_index];
    let restored = pokemon.heal(heal_amount);
    Ok(ItemUse {
        roster_index,
        name: pokemon.name.clone(),
        restored,
        hp: pokemon.current_hp(),
        max_hp: pokemon.max_hp(),
    })
}

/// Revives the first fainted creature in the roster to half of its max hp.
pub fn use_revive(trainer: &mut Trainer) -> Result<ItemUse, ItemUseError> {
    if trainer.item_count(Item::Revive) == 0 {
        return Err(ItemUseError::OutOfItem(Item::Revive));
    }
    let roster_index = trainer
        .team
        .iter()
        .position(|pokemon| pokemon.is_fainted())
        .ok_or(ItemUseError::NothingToRevive)?;

    trainer.consume_item(Item::Revive);
    let pokemon = &mut trainer.team[roster_index];
    pokemon.revive();
    Ok(ItemUse {
        roster_index,
        name: pokemon.name.clone(),
        restored: pokemon.current_hp(),
        hp: pokemon.current_hp(),
        max_hp: pokemon.max_hp(),
    })
}
