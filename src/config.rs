use crate::battle::calculators::BattleRules;
use crate::catalog::DEFAULT_API_BASE;
use crate::errors::ConfigError;
use crate::gym::{default_gyms, Gym};
use crate::player::MAX_TEAM_SIZE;
use schema::Item;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Game settings, read from a RON file. Every field is optional.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub data_dir: PathBuf,
    pub trainers_file: String,
    pub gyms_file: String,
    /// Where rendered scenes are written.
    pub temp_dir: PathBuf,
    pub scene_max_age_secs: u64,
    pub pokeapi_base_url: String,
    pub http_timeout_secs: u64,
    pub starters: Vec<String>,
    pub max_team_size: usize,
    /// Bag contents of a newly registered trainer.
    pub starting_items: BTreeMap<Item, u32>,
    pub potion_heal: u16,
    pub gym_team_size: usize,
    pub gym_level: u8,
    pub command_prefix: String,
    pub rules: BattleRules,
    /// Gyms written to a fresh gym store.
    pub gyms: Vec<Gym>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            trainers_file: "trainers.json".to_string(),
            gyms_file: "gyms.json".to_string(),
            temp_dir: PathBuf::from("temp"),
            scene_max_age_secs: 24 * 60 * 60,
            pokeapi_base_url: DEFAULT_API_BASE.to_string(),
            http_timeout_secs: 10,
            starters: vec![
                "bulbasaur".to_string(),
                "charmander".to_string(),
                "squirtle".to_string(),
            ],
            max_team_size: MAX_TEAM_SIZE,
            starting_items: BTreeMap::from([(Item::Pokeball, 5), (Item::Potion, 3), (Item::Revive, 1)]),
            potion_heal: 20,
            gym_team_size: 3,
            gym_level: 10,
            command_prefix: "!".to_string(),
            rules: BattleRules::default(),
            gyms: default_gyms(),
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_ron(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    pub fn trainers_path(&self) -> PathBuf {
        self.data_dir.join(&self.trainers_file)
    }

    pub fn gyms_path(&self) -> PathBuf {
        self.data_dir.join(&self.gyms_file)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn scene_max_age(&self) -> Duration {
        Duration::from_secs(self.scene_max_age_secs)
    }

    /// Team size clamped to the 1..=6 a roster can hold.
    pub fn team_limit(&self) -> usize {
        self.max_team_size.clamp(1, MAX_TEAM_SIZE)
    }
}
