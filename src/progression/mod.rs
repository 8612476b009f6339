pub mod evolution;
pub mod rewards;

pub use evolution::EVOLUTION_LEVEL;
pub use rewards::{LevelUpNotice, ProgressionReport, GYM_VICTORY_EXP, TRAINER_VICTORY_EXP};

/// Applies everything a creature or trainer earns outside of a single turn:
/// battle rewards, level-ups and evolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressionResolver;

impl ProgressionResolver {
    pub fn new() -> Self {
        Self
    }
}
