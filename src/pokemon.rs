use schema::PokemonType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest level a creature can reach through experience.
pub const MAX_LEVEL: u8 = 100;
/// Creatures can know at most this many moves.
pub const MAX_MOVES: usize = 4;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub hp: u16,
    pub max_hp: u16,
    pub attack: u16,
    pub defense: u16,
    pub speed: u16,
}

impl Stats {
    /// Full-health stats from base values.
    pub fn from_base(max_hp: u16, attack: u16, defense: u16, speed: u16) -> Self {
        Stats {
            hp: max_hp,
            max_hp,
            attack,
            defense,
            speed,
        }
    }
}

/// A single owned creature. Lives in exactly one trainer or gym roster.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PokemonInst {
    pub species_id: u32,
    pub name: String,
    pub level: u8,
    pub experience: u32,
    pub stats: Stats,
    pub types: Vec<PokemonType>,
    pub moves: Vec<String>,
    #[serde(default)]
    pub evolves_from: Option<String>,
    #[serde(default)]
    pub evolves_into: Option<String>,
    pub image: String,
}

/// A level reached while applying experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUp {
    pub new_level: u8,
}

impl PokemonInst {
    pub fn current_hp(&self) -> u16 {
        self.stats.hp
    }

    pub fn max_hp(&self) -> u16 {
        self.stats.max_hp
    }

    pub fn is_fainted(&self) -> bool {
        self.stats.hp == 0
    }

    /// Subtracts damage, flooring hp at zero. Returns true if this knocked the creature out.
    pub fn take_damage(&mut self, damage: u16) -> bool {
        self.stats.hp = self.stats.hp.saturating_sub(damage);
        self.is_fainted()
    }

    /// Restores hp, never past max_hp. Returns the amount actually restored.
    pub fn heal(&mut self, amount: u16) -> u16 {
        let before = self.stats.hp;
        self.stats.hp = self.stats.hp.saturating_add(amount).min(self.stats.max_hp);
        self.stats.hp - before
    }

    /// Brings a fainted creature back to half of its max hp.
    pub fn revive(&mut self) -> bool {
        if !self.is_fainted() {
            return false;
        }
        self.stats.hp = self.stats.max_hp / 2;
        true
    }

    pub fn restore_full_hp(&mut self) {
        self.stats.hp = self.stats.max_hp;
    }

    /// Adds experience and applies the level-up loop: every time experience
    /// reaches `level * 100` the creature gains a level and experience resets.
    pub fn add_experience(&mut self, amount: u32) -> Vec<LevelUp> {
        self.experience = self.experience.saturating_add(amount);
        let mut level_ups = Vec::new();
        while self.level < MAX_LEVEL && self.experience >= u32::from(self.level) * 100 {
            self.level += 1;
            self.experience = 0;
            level_ups.push(LevelUp {
                new_level: self.level,
            });
        }
        level_ups
    }

    pub fn primary_type(&self) -> PokemonType {
        self.types.first().copied().unwrap_or_default()
    }
}

impl fmt::Display for PokemonInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Lv. {}) HP: {}/{}",
            self.name, self.level, self.stats.hp, self.stats.max_hp
        )
    }
}
