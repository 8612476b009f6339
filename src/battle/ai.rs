//! Decision making for NPC-controlled battle sides.

use crate::battle::state::{BattleRosters, BattleState, GameState, PlayerAction, SideId, TurnRng};

/// Move used by a creature that knows nothing else.
pub const DEFAULT_NPC_MOVE: &str = "tackle";

/// A trait for any system that can decide on a battle action.
pub trait Behavior {
    /// Inspects the battle and decides the next action for the given side.
    fn decide_action(
        &self,
        side: SideId,
        battle_state: &BattleState,
        rosters: &BattleRosters,
        rng: &mut TurnRng,
    ) -> PlayerAction;
}

/// Attacks with a random known move; replaces a fainted creature with the
/// first conscious member of its side.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomMoveAI;

impl RandomMoveAI {
    pub fn new() -> Self {
        Self
    }

    fn first_conscious_member(side: SideId, battle_state: &BattleState, rosters: &BattleRosters) -> Option<usize> {
        let battle_side = battle_state.side(side);
        (0..battle_side.members.len()).find(|&position| {
            position != battle_side.active
                && rosters
                    .member(battle_state, side, position)
                    .is_some_and(|pokemon| !pokemon.is_fainted())
        })
    }
}

impl Behavior for RandomMoveAI {
    fn decide_action(
        &self,
        side: SideId,
        battle_state: &BattleState,
        rosters: &BattleRosters,
        rng: &mut TurnRng,
    ) -> PlayerAction {
        let active = rosters.active(battle_state, side).ok();
        let must_replace = matches!(battle_state.game_state, GameState::AwaitingReplacement(s) if s == side)
            || active.is_none_or(|pokemon| pokemon.is_fainted());

        if must_replace {
            return match Self::first_conscious_member(side, battle_state, rosters) {
                Some(team_index) => PlayerAction::SwitchPokemon { team_index },
                None => PlayerAction::Forfeit,
            };
        }

        let moves = active.map(|pokemon| pokemon.moves.as_slice()).unwrap_or_default();
        let move_name = if moves.is_empty() {
            DEFAULT_NPC_MOVE.to_string()
        } else {
            let roll = rng.next_outcome("NPC move choice");
            moves[(usize::from(roll) - 1) % moves.len()].clone()
        };
        PlayerAction::UseMove { move_name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{create_test_battle, TestPokemonBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_picks_a_known_move() {
        let mut team_a = vec![TestPokemonBuilder::new("pikachu", 5).build()];
        let mut team_b = vec![TestPokemonBuilder::new("onix", 5)
            .with_moves(vec!["rock-throw", "bind"])
            .build()];
        let rosters = BattleRosters::new(&mut team_a, &mut team_b);
        let state = create_test_battle(&rosters, SideId::B);

        let mut rng = TurnRng::new_for_test(vec![2]);
        let action = RandomMoveAI::new().decide_action(SideId::B, &state, &rosters, &mut rng);
        assert_eq!(
            action,
            PlayerAction::UseMove {
                move_name: "bind".to_string()
            }
        );
    }

    #[test]
    fn test_defaults_to_tackle_without_moves() {
        let mut team_a = vec![TestPokemonBuilder::new("pikachu", 5).build()];
        let mut team_b = vec![TestPokemonBuilder::new("ditto", 5).with_moves(vec![]).build()];
        let rosters = BattleRosters::new(&mut team_a, &mut team_b);
        let state = create_test_battle(&rosters, SideId::B);

        let action = RandomMoveAI::new().decide_action(SideId::B, &state, &rosters, &mut TurnRng::new_for_test(vec![]));
        assert_eq!(
            action,
            PlayerAction::UseMove {
                move_name: DEFAULT_NPC_MOVE.to_string()
            }
        );
    }

    #[test]
    fn test_replaces_with_first_conscious_member() {
        let mut team_a = vec![TestPokemonBuilder::new("pikachu", 5).build()];
        let mut team_b = vec![
            TestPokemonBuilder::new("geodude", 10).with_hp(0).build(),
            TestPokemonBuilder::new("graveler", 10).with_hp(0).build(),
            TestPokemonBuilder::new("onix", 10).build(),
        ];
        let rosters = BattleRosters::new(&mut team_a, &mut team_b);
        let mut state = create_test_battle(&rosters, SideId::A);
        state.game_state = GameState::AwaitingReplacement(SideId::B);

        let action = RandomMoveAI::new().decide_action(SideId::B, &state, &rosters, &mut TurnRng::new_for_test(vec![]));
        assert_eq!(action, PlayerAction::SwitchPokemon { team_index: 2 });
    }
}
