use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the battle engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleEngineError {
    /// Error related to invalid battle state
    #[error("Battle state error: {0}")]
    BattleState(#[from] BattleStateError),
    /// Error related to invalid player actions
    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

/// Errors related to battle state validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleStateError {
    /// A side was created without any creature to send out
    #[error("Side {0} has an empty roster")]
    EmptyRoster(usize),
    /// A side refers to a roster slot its owner no longer has
    #[error("Roster slot {slot} is missing for side {side}")]
    MissingRosterSlot { side: usize, slot: usize },
    /// Battle state is in an inconsistent or corrupted state
    #[error("Inconsistent battle state: {0}")]
    InconsistentState(String),
}

/// Errors related to player actions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The side submitting the action is not the side expected to act
    #[error("It is not side {0}'s turn")]
    NotYourTurn(usize),
    /// Action is not valid in the current battle state
    #[error("Invalid action: {0}")]
    InvalidAction(String),
}

/// Failures talking to the creature catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed catalog data: {0}")]
    MalformedData(String),
}

/// Failures reading or writing a persisted JSON document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failures producing a scene image.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("scene rendering is disabled")]
    Disabled,
    #[error("failed to prepare scene directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode scene image: {0}")]
    Image(#[from] image::ImageError),
}

/// Failures of the battle session registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{0} already has a battle in progress")]
    AlreadyActive(String),
    #[error("{0} has no battle in progress")]
    NoActiveBattle(String),
}

/// Failures loading the game configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Top-level error of a single chat command.
///
/// `NotFound` and `InvalidState` carry the user-facing rejection text; every
/// other variant is answered with the generic retry message.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Fetch(#[from] CatalogError),
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Battle(#[from] BattleEngineError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl GameError {
    /// The text to send back to the player, if this error is meant to be seen.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            GameError::NotFound(message) | GameError::InvalidState(message) => Some(message),
            _ => None,
        }
    }
}

impl From<BattleStateError> for GameError {
    fn from(err: BattleStateError) -> Self {
        GameError::Battle(err.into())
    }
}

impl From<ActionError> for GameError {
    fn from(err: ActionError) -> Self {
        GameError::Battle(err.into())
    }
}

/// Type alias for Results using BattleEngineError
pub type BattleResult<T> = Result<T, BattleEngineError>;

/// Type alias for Results using CatalogError
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Type alias for Results using StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Type alias for Results using RenderError
pub type RenderResult<T> = Result<T, RenderError>;

/// Type alias for Results using GameError
pub type GameResult<T> = Result<T, GameError>;
