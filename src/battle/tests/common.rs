use crate::battle::state::{
    BattleKind, BattleRosters, BattleSide, BattleState, PlayerType, RosterOwner, SideId, TurnRng,
};
use crate::errors::BattleResult;
use crate::pokemon::{PokemonInst, Stats};
use schema::PokemonType;

/// A builder for creating test Pokemon instances with common defaults.
///
/// Defaults: 40 hp, 50 attack, 50 defense, 50 speed, Normal type, knows `tackle`.
///
/// # Example
/// ```ignore
/// let pokemon = TestPokemonBuilder::new("pikachu", 25)
///     .with_moves(vec!["thunder-shock"])
///     .with_hp(10)
///     .build();
/// ```
pub struct TestPokemonBuilder {
    name: String,
    level: u8,
    species_id: u32,
    stats: Stats,
    current_hp: Option<u16>,
    types: Vec<PokemonType>,
    moves: Vec<String>,
    experience: u32,
    evolves_into: Option<String>,
}

impl TestPokemonBuilder {
    /// Creates a new builder for a given species name and level.
    pub fn new(name: &str, level: u8) -> Self {
        Self {
            name: name.to_string(),
            level,
            species_id: 1,
            stats: Stats::from_base(40, 50, 50, 50),
            current_hp: None,
            types: vec![PokemonType::Normal],
            moves: vec!["tackle".to_string()],
            experience: 0,
            evolves_into: None,
        }
    }

    pub fn with_species_id(mut self, species_id: u32) -> Self {
        self.species_id = species_id;
        self
    }

    pub fn with_attack(mut self, attack: u16) -> Self {
        self.stats.attack = attack;
        self
    }

    pub fn with_defense(mut self, defense: u16) -> Self {
        self.stats.defense = defense;
        self
    }

    pub fn with_max_hp(mut self, max_hp: u16) -> Self {
        self.stats.max_hp = max_hp;
        self
    }

    /// Sets the current HP for the test Pokemon. If not set, HP will be max.
    pub fn with_hp(mut self, hp: u16) -> Self {
        self.current_hp = Some(hp);
        self
    }

    pub fn with_types(mut self, types: Vec<PokemonType>) -> Self {
        self.types = types;
        self
    }

    pub fn with_moves(mut self, moves: Vec<&str>) -> Self {
        self.moves = moves.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_experience(mut self, experience: u32) -> Self {
        self.experience = experience;
        self
    }

    pub fn with_evolves_into(mut self, target: Option<&str>) -> Self {
        self.evolves_into = target.map(str::to_string);
        self
    }

    /// Builds the `PokemonInst`.
    pub fn build(self) -> PokemonInst {
        let mut stats = self.stats;
        stats.hp = self.current_hp.unwrap_or(stats.max_hp).min(stats.max_hp);
        PokemonInst {
            species_id: self.species_id,
            name: self.name,
            level: self.level,
            experience: self.experience,
            stats,
            types: self.types,
            moves: self.moves,
            evolves_from: None,
            evolves_into: self.evolves_into,
            image: String::new(),
        }
    }
}

/// A human trainer side using every creature of the roster.
pub fn human_side(name: &str, roster_len: usize) -> BattleSide {
    BattleSide::new(
        name,
        RosterOwner::Trainer(name.to_lowercase()),
        PlayerType::Human,
        (0..roster_len).collect(),
    )
}

/// An NPC gym side using every creature of the roster.
pub fn npc_side(name: &str, roster_len: usize) -> BattleSide {
    BattleSide::new(
        name,
        RosterOwner::Gym("Test Gym".to_string()),
        PlayerType::NPC,
        (0..roster_len).collect(),
    )
}

/// Creates a gym battle over the given rosters with a fixed first turn.
pub fn create_test_battle(rosters: &BattleRosters, turn_owner: SideId) -> BattleState {
    BattleState::new(
        "test_battle".to_string(),
        BattleKind::Gym {
            gym_name: "Test Gym".to_string(),
        },
        human_side("Player", rosters.roster(SideId::A).len()),
        npc_side("Leader", rosters.roster(SideId::B).len()),
        turn_owner,
    )
}

/// Creates a `TurnRng` instance with a long list of default values (50).
/// 50 never lands a critical hit.
pub fn predictable_rng() -> TurnRng {
    TurnRng::new_for_test(vec![50; 100])
}

/// Helper function to assert that a Result is Ok and return the value.
pub fn assert_ok<T>(result: BattleResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected Ok but got error: {}", err),
    }
}
