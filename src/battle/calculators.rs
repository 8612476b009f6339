use crate::battle::state::TurnRng;
use crate::pokemon::PokemonInst;
use schema::{MoveData, PokemonType};
use serde::{Deserialize, Serialize};

/// Outcomes at or below this value (out of 100) land a critical hit.
pub const CRITICAL_HIT_THRESHOLD: u8 = 10;
pub const CRITICAL_HIT_MULTIPLIER: f64 = 1.5;

/// Optional battle policies. Both are off by default, which keeps the
/// baseline damage formula and makes every move connect.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct BattleRules {
    /// Multiply damage by the standard type chart.
    pub type_effectiveness: bool,
    /// Roll against move accuracy before dealing damage.
    pub accuracy_check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRoll {
    pub damage: u16,
    pub critical: bool,
    pub effectiveness: f32,
}

/// The deterministic part of the formula:
/// `((2 * level / 5 + 2) * power * (attack / defense)) / 50 + 2`.
pub fn calculate_base_damage(level: u8, power: u16, attack: u16, defense: u16) -> f64 {
    let level_factor = 2.0 * f64::from(level) / 5.0 + 2.0;
    let ratio = f64::from(attack) / f64::from(defense.max(1));
    (level_factor * f64::from(power) * ratio) / 50.0 + 2.0
}

/// Applies the critical and type multipliers to a base value and clamps the
/// result to a whole number of at least 1.
pub fn finalize_damage(base: f64, critical: bool, effectiveness: f32) -> u16 {
    let crit_multiplier = if critical { CRITICAL_HIT_MULTIPLIER } else { 1.0 };
    let damage = (base.floor() * crit_multiplier * f64::from(effectiveness)).floor();
    damage.clamp(1.0, f64::from(u16::MAX)) as u16
}

pub fn calculate_type_multiplier(move_type: PokemonType, defender: &PokemonInst, rules: &BattleRules) -> f32 {
    if rules.type_effectiveness {
        PokemonType::effectiveness_against(move_type, &defender.types)
    } else {
        1.0
    }
}

/// Full damage calculation for one attack. Consumes exactly one outcome for
/// the critical-hit check.
pub fn calculate_damage(
    attacker: &PokemonInst,
    defender: &PokemonInst,
    move_data: &MoveData,
    rules: &BattleRules,
    rng: &mut TurnRng,
) -> DamageRoll {
    let base = calculate_base_damage(
        attacker.level,
        move_data.power,
        attacker.stats.attack,
        defender.stats.defense,
    );
    let critical = rng.next_outcome("Critical hit check") <= CRITICAL_HIT_THRESHOLD;
    let effectiveness = calculate_type_multiplier(move_data.move_type, defender, rules);

    DamageRoll {
        damage: finalize_damage(base, critical, effectiveness),
        critical,
        effectiveness,
    }
}

/// Accuracy roll. Draws nothing when the accuracy policy is disabled.
pub fn move_hits(move_data: &MoveData, rules: &BattleRules, rng: &mut TurnRng) -> bool {
    if !rules.accuracy_check {
        return true;
    }
    rng.next_outcome("Accuracy check") <= move_data.accuracy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::TestPokemonBuilder;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn tackle(power: u16) -> MoveData {
        MoveData {
            name: "tackle".to_string(),
            power,
            move_type: PokemonType::Normal,
            accuracy: 100,
        }
    }

    #[rstest]
    #[case::no_crit(50, 8)]
    #[case::crit(10, 12)]
    #[case::crit_threshold_edge(11, 8)]
    fn test_reference_scenario(#[case] roll: u8, #[case] expected: u16) {
        let attacker = TestPokemonBuilder::new("bulbasaur", 5).with_attack(50).build();
        let defender = TestPokemonBuilder::new("rattata", 5).with_defense(25).build();
        let mut rng = TurnRng::new_for_test(vec![roll]);

        let roll = calculate_damage(&attacker, &defender, &tackle(40), &BattleRules::default(), &mut rng);
        assert_eq!(roll.damage, expected);
        assert_eq!(roll.effectiveness, 1.0);
    }

    #[rstest]
    #[case(1, 0, 1, 500)]
    #[case(1, 1, 1, 999)]
    #[case(100, 250, 999, 1)]
    #[case(50, 40, 0, 0)]
    fn test_damage_is_at_least_one(
        #[case] level: u8,
        #[case] power: u16,
        #[case] attack: u16,
        #[case] defense: u16,
    ) {
        for roll in [1u8, 50, 100] {
            let attacker = TestPokemonBuilder::new("magikarp", level).with_attack(attack).build();
            let defender = TestPokemonBuilder::new("onix", 10).with_defense(defense).build();
            let mut rng = TurnRng::new_for_test(vec![roll]);
            let result = calculate_damage(&attacker, &defender, &tackle(power), &BattleRules::default(), &mut rng);
            assert!(result.damage >= 1, "damage {} for roll {}", result.damage, roll);
        }
    }

    #[test]
    fn test_type_effectiveness_is_opt_in() {
        let attacker = TestPokemonBuilder::new("pikachu", 5).with_attack(50).build();
        let defender = TestPokemonBuilder::new("squirtle", 5)
            .with_types(vec![PokemonType::Water])
            .with_defense(25)
            .build();
        let thunder_shock = MoveData {
            name: "thunder-shock".to_string(),
            power: 40,
            move_type: PokemonType::Electric,
            accuracy: 100,
        };

        let baseline = calculate_damage(
            &attacker,
            &defender,
            &thunder_shock,
            &BattleRules::default(),
            &mut TurnRng::new_for_test(vec![50]),
        );
        let rules = BattleRules {
            type_effectiveness: true,
            ..BattleRules::default()
        };
        let boosted = calculate_damage(&attacker, &defender, &thunder_shock, &rules, &mut TurnRng::new_for_test(vec![50]));

        assert_eq!(baseline.damage, 8);
        assert_eq!(boosted.damage, 16);
        assert_eq!(boosted.effectiveness, 2.0);
    }

    #[test]
    fn test_immune_target_still_takes_minimum_damage() {
        assert_eq!(finalize_damage(8.4, false, 0.0), 1);
    }

    #[test]
    fn test_accuracy_policy() {
        let mut shaky = tackle(40);
        shaky.accuracy = 70;
        let mut rng = TurnRng::new_for_test(vec![]);
        assert!(move_hits(&shaky, &BattleRules::default(), &mut rng));
        assert_eq!(rng.consumed(), 0);

        let rules = BattleRules {
            accuracy_check: true,
            ..BattleRules::default()
        };
        let mut rng = TurnRng::new_for_test(vec![70, 71]);
        assert!(move_hits(&shaky, &rules, &mut rng));
        assert!(!move_hits(&shaky, &rules, &mut rng));
    }
}
