use crate::battle::calculators::BattleRules;
use crate::battle::engine::{check_battle_end, execute_turn, BattleAction, TurnOutcome};
use crate::battle::state::{ActionFailureReason, BattleRosters, GameState, SideId};
use crate::battle::tests::common::{assert_ok, create_test_battle, predictable_rng, TestPokemonBuilder};
use crate::errors::{ActionError, BattleEngineError};
use pretty_assertions::assert_eq;
use schema::MoveData;

fn tackle() -> BattleAction {
    BattleAction::Attack(MoveData::fallback("tackle"))
}

#[test]
fn test_knockout_keeps_turn_owner_and_awaits_replacement() {
    let mut team_a = vec![TestPokemonBuilder::new("bulbasaur", 5).with_attack(50).build()];
    let mut team_b = vec![
        TestPokemonBuilder::new("rattata", 5).with_defense(25).with_hp(5).build(),
        TestPokemonBuilder::new("spearow", 5).build(),
    ];
    let mut rosters = BattleRosters::new(&mut team_a, &mut team_b);
    let mut state = create_test_battle(&rosters, SideId::A);
    let mut rng = predictable_rng();

    let report = assert_ok(execute_turn(
        &mut state,
        &mut rosters,
        SideId::A,
        tackle(),
        &BattleRules::default(),
        &mut rng,
    ));

    assert_eq!(report.outcome, TurnOutcome::Knockout { damage: 8 });
    assert_eq!(state.turn_owner, SideId::A);
    assert_eq!(state.game_state, GameState::AwaitingReplacement(SideId::B));
    assert_eq!(rosters.roster(SideId::B)[0].current_hp(), 0);
    assert_eq!(
        state.log,
        vec![
            "Player's bulbasaur used tackle!".to_string(),
            "It dealt 8 damage to Leader's rattata!".to_string(),
            "Leader's rattata fainted!".to_string(),
        ]
    );
    assert_eq!(check_battle_end(&mut state, &rosters), None);
}

#[test]
fn test_knocked_out_side_must_switch_then_acts_next() {
    let mut team_a = vec![TestPokemonBuilder::new("bulbasaur", 5).with_attack(50).build()];
    let mut team_b = vec![
        TestPokemonBuilder::new("rattata", 5).with_defense(25).with_hp(1).build(),
        TestPokemonBuilder::new("spearow", 5).build(),
    ];
    let mut rosters = BattleRosters::new(&mut team_a, &mut team_b);
    let mut state = create_test_battle(&rosters, SideId::A);
    let mut rng = predictable_rng();
    let rules = BattleRules::default();

    assert_ok(execute_turn(&mut state, &mut rosters, SideId::A, tackle(), &rules, &mut rng));

    // The attacker cannot go again.
    let again = execute_turn(&mut state, &mut rosters, SideId::A, tackle(), &rules, &mut rng);
    assert_eq!(again.unwrap_err(), BattleEngineError::Action(ActionError::NotYourTurn(0)));

    // The defender cannot attack with a fainted creature.
    let report = assert_ok(execute_turn(&mut state, &mut rosters, SideId::B, tackle(), &rules, &mut rng));
    assert_eq!(report.outcome, TurnOutcome::Failed(ActionFailureReason::ReplacementRequired));

    // Switching back to the fainted slot fails and changes nothing.
    let report = assert_ok(execute_turn(
        &mut state,
        &mut rosters,
        SideId::B,
        BattleAction::Switch { team_index: 0 },
        &rules,
        &mut rng,
    ));
    assert_eq!(report.outcome, TurnOutcome::Failed(ActionFailureReason::SwitchTargetFainted));
    assert_eq!(state.game_state, GameState::AwaitingReplacement(SideId::B));

    let report = assert_ok(execute_turn(
        &mut state,
        &mut rosters,
        SideId::B,
        BattleAction::Switch { team_index: 1 },
        &rules,
        &mut rng,
    ));
    assert_eq!(report.outcome, TurnOutcome::Switched);
    assert_eq!(state.game_state, GameState::AwaitingAction);
    assert_eq!(state.turn_owner, SideId::B);
    assert_eq!(state.log.last().map(String::as_str), Some("Leader switched to spearow!"));
}

#[test]
fn test_fainted_attacker_must_switch_out() {
    let mut team_a = vec![
        TestPokemonBuilder::new("bulbasaur", 5).with_hp(0).build(),
        TestPokemonBuilder::new("oddish", 5).build(),
    ];
    let mut team_b = vec![TestPokemonBuilder::new("rattata", 5).build()];
    let mut rosters = BattleRosters::new(&mut team_a, &mut team_b);
    let mut state = create_test_battle(&rosters, SideId::A);

    let report = assert_ok(execute_turn(
        &mut state,
        &mut rosters,
        SideId::A,
        tackle(),
        &BattleRules::default(),
        &mut predictable_rng(),
    ));
    assert_eq!(report.outcome, TurnOutcome::Failed(ActionFailureReason::PokemonFainted));
    assert_eq!(state.turn_owner, SideId::A);
    assert!(state.log.is_empty());
}
