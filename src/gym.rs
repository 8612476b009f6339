use crate::pokemon::PokemonInst;
use schema::PokemonType;
use serde::{Deserialize, Serialize};

/// A gym and its leader. The roster is generated the first time it is challenged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Gym {
    pub name: String,
    pub leader: String,
    pub pokemon_type: PokemonType,
    #[serde(default)]
    pub defeated: bool,
    #[serde(default)]
    pub team: Vec<PokemonInst>,
}

impl Gym {
    pub fn new(name: impl Into<String>, leader: impl Into<String>, pokemon_type: PokemonType) -> Self {
        Self {
            name: name.into(),
            leader: leader.into(),
            pokemon_type,
            defeated: false,
            team: Vec::new(),
        }
    }

    pub fn needs_roster(&self) -> bool {
        self.team.is_empty()
    }

    /// Restores the whole roster to full health between challenges.
    pub fn heal_team(&mut self) {
        for pokemon in &mut self.team {
            pokemon.restore_full_hp();
        }
    }
}

/// The four gyms a fresh world starts with.
pub fn default_gyms() -> Vec<Gym> {
    vec![
        Gym::new("Pewter City", "Brock", PokemonType::Rock),
        Gym::new("Cerulean City", "Misty", PokemonType::Water),
        Gym::new("Vermilion City", "Lt. Surge", PokemonType::Electric),
        Gym::new("Celadon City", "Erika", PokemonType::Grass),
    ]
}

/// Case-insensitive lookup of a gym key.
pub fn find_gym_key<'a, I>(names: I, query: &str) -> Option<&'a String>
where
    I: IntoIterator<Item = &'a String>,
{
    let query = query.trim();
    names.into_iter().find(|name| name.eq_ignore_ascii_case(query))
}
