//! Pokémon Trainer Bot
//!
//! A turn-based creature collection game played through chat commands.
//! Players catch, train, evolve and battle creatures; progress is kept in
//! JSON documents on disk. The battle engine under [`battle`] is the core,
//! everything else feeds it or reports on it.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod catalog;
pub mod catch;
pub mod commands;
pub mod config;
pub mod errors;
pub mod game;
pub mod gym;
pub mod items;
pub mod player;
pub mod pokemon;
pub mod progression;
pub mod render;
pub mod session;
pub mod store;

// --- PUBLIC API RE-EXPORTS ---

// Static data shared with the `schema` crate.
pub use schema::{Item, ItemKind, MoveData, PokemonType};

// Core battle engine functions and state.
pub use battle::engine::{check_battle_end, execute_turn, start_battle, BattleAction, TurnOutcome};
pub use battle::runner::BattleRunner;
pub use battle::state::{BattleEvent, BattleState, GameState, PlayerAction, PlayerType, SideId, TurnRng};

// Records and services.
pub use catalog::{CreatureCatalog, InMemoryCatalog, PokeApiCatalog};
pub use config::GameConfig;
pub use game::{GameService, Reply};
pub use gym::Gym;
pub use player::Trainer;
pub use pokemon::PokemonInst;
pub use progression::ProgressionResolver;
pub use render::{DisabledRenderer, ImageRef, ImageSceneRenderer, SceneRenderer};

// Crate-specific error and result types.
pub use errors::{
    ActionError, BattleEngineError, BattleResult, BattleStateError, CatalogError, GameError, GameResult,
    RenderError, StoreError,
};
