use crate::battle::calculators::{calculate_damage, move_hits, BattleRules};
use crate::battle::state::{
    ActionFailureReason, BattleEvent, BattleKind, BattleRosters, BattleSide, BattleState, EventBus,
    GameState, SideId, TurnRng,
};
use crate::errors::{ActionError, BattleResult, BattleStateError};
use crate::player::MAX_TEAM_SIZE;
use schema::MoveData;

/// A fully resolved action, ready to execute. Move names have already been
/// looked up in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleAction {
    Attack(MoveData),
    /// `team_index` is a position in the acting side's member list.
    Switch { team_index: usize },
    Forfeit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Continue { damage: u16 },
    Knockout { damage: u16 },
    Missed,
    Switched,
    Forfeited { winner: SideId },
    Failed(ActionFailureReason),
}

#[derive(Debug, Clone)]
pub struct TurnReport {
    pub side: SideId,
    pub outcome: TurnOutcome,
    pub bus: EventBus,
}

/// Builds a new battle. Each side starts with its first member active and the
/// first turn goes to a uniformly random side.
pub fn start_battle(
    battle_id: String,
    kind: BattleKind,
    side_a: BattleSide,
    side_b: BattleSide,
    rosters: &BattleRosters,
    rng: &mut TurnRng,
) -> BattleResult<BattleState> {
    for (index, side) in [&side_a, &side_b].into_iter().enumerate() {
        if side.members.is_empty() {
            return Err(BattleStateError::EmptyRoster(index).into());
        }
        let side_id = if index == 0 { SideId::A } else { SideId::B };
        let roster_len = rosters.roster(side_id).len();
        if let Some(&slot) = side.members.iter().find(|&&slot| slot >= roster_len) {
            return Err(BattleStateError::MissingRosterSlot { side: index, slot }.into());
        }
    }

    let first = if rng.next_outcome("Pick first turn") <= 50 {
        SideId::A
    } else {
        SideId::B
    };

    let mut state = BattleState::new(battle_id, kind, side_a, side_b, first);
    for side in &mut state.sides {
        side.active = 0;
    }

    log::info!(
        "battle {} started: {} vs {}, {} moves first",
        state.battle_id,
        state.sides[0].display_name,
        state.sides[1].display_name,
        state.side(first).display_name
    );
    Ok(state)
}

/// Executes one action for `side` and appends its narration to the battle log.
///
/// A `Failed` outcome leaves the state untouched apart from the report. The
/// caller must run [`check_battle_end`] after every `Knockout`.
pub fn execute_turn(
    state: &mut BattleState,
    rosters: &mut BattleRosters,
    side: SideId,
    action: BattleAction,
    rules: &BattleRules,
    rng: &mut TurnRng,
) -> BattleResult<TurnReport> {
    let mut bus = EventBus::new();

    let Some(acting) = state.acting_side() else {
        return Ok(failed(side, ActionFailureReason::BattleOver, bus));
    };
    if side != acting {
        return Err(ActionError::NotYourTurn(side.index()).into());
    }

    let outcome = match action {
        BattleAction::Attack(move_data) => execute_attack(state, rosters, side, &move_data, rules, rng, &mut bus)?,
        BattleAction::Switch { team_index } => execute_switch(state, rosters, side, team_index, &mut bus)?,
        BattleAction::Forfeit => execute_forfeit(state, side, &mut bus),
    };

    if let TurnOutcome::Failed(reason) = &outcome {
        bus.push(BattleEvent::ActionFailed {
            side,
            reason: reason.clone(),
        });
        return Ok(TurnReport { side, outcome, bus });
    }

    let lines = bus.formatted(state);
    state.log.extend(lines);
    state.turn_number += 1;

    Ok(TurnReport { side, outcome, bus })
}

fn failed(side: SideId, reason: ActionFailureReason, mut bus: EventBus) -> TurnReport {
    bus.push(BattleEvent::ActionFailed {
        side,
        reason: reason.clone(),
    });
    TurnReport {
        side,
        outcome: TurnOutcome::Failed(reason),
        bus,
    }
}

fn execute_attack(
    state: &mut BattleState,
    rosters: &mut BattleRosters,
    side: SideId,
    move_data: &MoveData,
    rules: &BattleRules,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> BattleResult<TurnOutcome> {
    if let GameState::AwaitingReplacement(_) = state.game_state {
        return Ok(TurnOutcome::Failed(ActionFailureReason::ReplacementRequired));
    }

    let defender_side = side.opponent();
    let attacker = rosters.active(state, side)?.clone();
    if attacker.is_fainted() {
        return Ok(TurnOutcome::Failed(ActionFailureReason::PokemonFainted));
    }

    let slot = state
        .side(side)
        .active_slot()
        .ok_or(BattleStateError::EmptyRoster(side.index()))?;
    let target_slot = state
        .side(defender_side)
        .active_slot()
        .ok_or(BattleStateError::EmptyRoster(defender_side.index()))?;
    bus.push(BattleEvent::MoveUsed {
        side,
        pokemon: attacker.name.clone(),
        slot,
        target_slot,
        move_name: move_data.name.clone(),
    });

    if !move_hits(move_data, rules, rng) {
        bus.push(BattleEvent::MoveMissed {
            side,
            pokemon: attacker.name.clone(),
        });
        state.turn_owner = defender_side;
        return Ok(TurnOutcome::Missed);
    }

    let defender = rosters.active_mut(state, defender_side)?;
    let roll = calculate_damage(&attacker, defender, move_data, rules, rng);
    if roll.critical {
        bus.push(BattleEvent::CriticalHit { side });
    }
    bus.push(BattleEvent::AttackTypeEffectiveness {
        multiplier: roll.effectiveness,
    });

    let knocked_out = defender.take_damage(roll.damage);
    bus.push(BattleEvent::DamageDealt {
        side: defender_side,
        target: defender.name.clone(),
        damage: roll.damage,
        remaining_hp: defender.current_hp(),
    });

    if knocked_out {
        bus.push(BattleEvent::PokemonFainted {
            side: defender_side,
            pokemon: defender.name.clone(),
        });
        // The defender answers the knockout before normal alternation resumes.
        state.game_state = GameState::AwaitingReplacement(defender_side);
        Ok(TurnOutcome::Knockout { damage: roll.damage })
    } else {
        state.turn_owner = defender_side;
        Ok(TurnOutcome::Continue { damage: roll.damage })
    }
}

fn execute_switch(
    state: &mut BattleState,
    rosters: &BattleRosters,
    side: SideId,
    team_index: usize,
    bus: &mut EventBus,
) -> BattleResult<TurnOutcome> {
    if team_index >= MAX_TEAM_SIZE || team_index >= state.side(side).members.len() {
        return Ok(TurnOutcome::Failed(ActionFailureReason::InvalidSwitchTarget));
    }
    let target = rosters
        .member(state, side, team_index)
        .ok_or_else(|| BattleStateError::InconsistentState(format!("side {} lost member {}", side, team_index)))?;
    if target.is_fainted() {
        return Ok(TurnOutcome::Failed(ActionFailureReason::SwitchTargetFainted));
    }
    if state.side(side).active == team_index {
        return Ok(TurnOutcome::Failed(ActionFailureReason::AlreadyActive));
    }

    let pokemon = target.name.clone();
    state.side_mut(side).active = team_index;
    bus.push(BattleEvent::PokemonSwitched { side, pokemon });

    match state.game_state {
        GameState::AwaitingReplacement(replacing) => {
            // The side that just lost a creature takes the next regular turn.
            state.game_state = GameState::AwaitingAction;
            state.turn_owner = replacing;
        }
        _ => state.turn_owner = side.opponent(),
    }
    Ok(TurnOutcome::Switched)
}

fn execute_forfeit(state: &mut BattleState, side: SideId, bus: &mut EventBus) -> TurnOutcome {
    let winner = side.opponent();
    state.game_state = GameState::Finished { winner };
    bus.push(BattleEvent::PlayerForfeited { side });
    bus.push(BattleEvent::BattleEnded { winner });
    TurnOutcome::Forfeited { winner }
}

/// Declares a winner once every creature one side brought has fainted. Side A
/// is checked first.
pub fn check_battle_end(state: &mut BattleState, rosters: &BattleRosters) -> Option<SideId> {
    if let Some(winner) = state.winner() {
        return Some(winner);
    }

    let winner = if rosters.side_defeated(state, SideId::A) {
        SideId::B
    } else if rosters.side_defeated(state, SideId::B) {
        SideId::A
    } else {
        return None;
    };

    state.game_state = GameState::Finished { winner };
    log::info!(
        "battle {} finished, winner {}",
        state.battle_id,
        state.side(winner).display_name
    );
    Some(winner)
}
