use crate::battle::state::TurnRng;

/// Chance of a catch succeeding: `0.5 + (5 / level) * 0.1`, scaled by the
/// capture device and capped at 1.
pub fn calculate_catch_probability(level: u8, ball_multiplier: f64) -> f64 {
    let level = f64::from(level.max(1));
    ((0.5 + (5.0 / level) * 0.1) * ball_multiplier).min(1.0)
}

/// Roll for catch success. Succeeds when the outcome is at or below the
/// probability expressed as a percentage.
pub fn roll_catch_success(probability: f64, rng: &mut TurnRng) -> bool {
    let threshold = (probability * 100.0).round();
    f64::from(rng.next_outcome("catch roll")) <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(5, 1.0, 0.6)]
    #[case(10, 1.0, 0.55)]
    #[case(50, 1.0, 0.51)]
    #[case(5, 1.5, 0.9)]
    #[case(1, 1.0, 1.0)]
    #[case(1, 1.5, 1.0)]
    fn test_catch_probability(#[case] level: u8, #[case] multiplier: f64, #[case] expected: f64) {
        let probability = calculate_catch_probability(level, multiplier);
        assert!(
            (probability - expected).abs() < 1e-9,
            "level {} x{}: {}",
            level,
            multiplier,
            probability
        );
    }

    #[test]
    fn test_roll_boundary() {
        let mut rng = TurnRng::new_for_test(vec![60, 61]);
        assert!(roll_catch_success(0.6, &mut rng));
        assert!(!roll_catch_success(0.6, &mut rng));
        assert_eq!(rng.consumed(), 2);
    }
}
