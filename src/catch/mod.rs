//! Catching wild creatures with capture devices.

pub mod calculation;
pub mod validation;

pub use calculation::{calculate_catch_probability, roll_catch_success};
pub use validation::{validate_catch_attempt, CatchError};

use crate::battle::state::TurnRng;
use crate::player::Trainer;
use crate::pokemon::PokemonInst;
use schema::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchOutcome {
    Caught,
    /// The catch succeeded but the roster had no room, so the creature was released.
    CaughtButTeamFull,
    BrokeFree,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchAttempt {
    pub outcome: CatchOutcome,
    pub probability: f64,
}

/// Throws `ball` at `target`. The ball is used up whatever the result.
pub fn attempt_catch(
    trainer: &mut Trainer,
    target: PokemonInst,
    ball: Item,
    max_team_size: usize,
    rng: &mut TurnRng,
) -> Result<CatchAttempt, CatchError> {
    let multiplier = validate_catch_attempt(trainer, ball)?;
    if !trainer.consume_item(ball) {
        return Err(CatchError::OutOfBalls(ball));
    }

    let probability = calculate_catch_probability(target.level, multiplier);
    let outcome = if !roll_catch_success(probability, rng) {
        CatchOutcome::BrokeFree
    } else if trainer.add_to_team(target, max_team_size) {
        CatchOutcome::Caught
    } else {
        CatchOutcome::CaughtButTeamFull
    };

    log::debug!("{} threw a {} (p={:.2}): {:?}", trainer.id, ball, probability, outcome);
    Ok(CatchAttempt { outcome, probability })
}
