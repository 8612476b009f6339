use crate::player::Trainer;
use schema::{Item, ItemKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatchError {
    /// The chosen item cannot catch anything.
    #[error("{0} can't be used to catch Pokémon")]
    NotACaptureDevice(Item),
    /// The trainer has none of the chosen capture device left.
    #[error("You're out of {}!", ball_label(.0))]
    OutOfBalls(Item),
}

fn ball_label(ball: &Item) -> &'static str {
    match ball {
        Item::Superball => "Super Balls",
        _ => "Poké Balls",
    }
}

/// Checks the trainer can throw `ball` and returns its catch multiplier.
pub fn validate_catch_attempt(trainer: &Trainer, ball: Item) -> Result<f64, CatchError> {
    let ItemKind::Catch { multiplier } = ball.kind() else {
        return Err(CatchError::NotACaptureDevice(ball));
    };
    if trainer.item_count(ball) == 0 {
        return Err(CatchError::OutOfBalls(ball));
    }
    Ok(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_validate_catch_attempt() {
        let trainer = Trainer::new("ash", "Trainer", BTreeMap::from([(Item::Superball, 1), (Item::Potion, 2)]));
        assert_eq!(validate_catch_attempt(&trainer, Item::Superball), Ok(1.5));
        assert_eq!(
            validate_catch_attempt(&trainer, Item::Pokeball),
            Err(CatchError::OutOfBalls(Item::Pokeball))
        );
        assert_eq!(
            validate_catch_attempt(&trainer, Item::Potion),
            Err(CatchError::NotACaptureDevice(Item::Potion))
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(CatchError::OutOfBalls(Item::Superball).to_string(), "You're out of Super Balls!");
        assert_eq!(CatchError::OutOfBalls(Item::Pokeball).to_string(), "You're out of Poké Balls!");
        assert_eq!(
            CatchError::NotACaptureDevice(Item::Potion).to_string(),
            "potion can't be used to catch Pokémon"
        );
    }
}
