use crate::errors::{BattleResult, BattleStateError};
use crate::pokemon::PokemonInst;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two parties in a battle. `A` is always the initiating trainer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideId {
    A,
    B,
}

impl SideId {
    pub fn index(self) -> usize {
        match self {
            SideId::A => 0,
            SideId::B => 1,
        }
    }

    pub fn opponent(self) -> SideId {
        match self {
            SideId::A => SideId::B,
            SideId::B => SideId::A,
        }
    }
}

impl fmt::Display for SideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideId::A => write!(f, "A"),
            SideId::B => write!(f, "B"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerType {
    Human,
    NPC,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    /// The turn owner must submit an action.
    AwaitingAction,
    /// The given side had its active creature knocked out and must switch (or forfeit).
    AwaitingReplacement(SideId),
    Finished { winner: SideId },
}

/// An action as a player submits it, before the move is looked up.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum PlayerAction {
    UseMove { move_name: String },
    // Position in the side's member list, 0-based.
    SwitchPokemon { team_index: usize },
    Forfeit,
}

/// Whose roster a battle side draws its creatures from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum RosterOwner {
    Trainer(String),
    Gym(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum BattleKind {
    Gym { gym_name: String },
    Trainer { opponent_id: String },
}

/// A battle participant. `members` are indices into the owner's roster; the
/// creatures themselves stay in the trainer or gym record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleSide {
    pub display_name: String,
    pub owner: RosterOwner,
    pub player_type: PlayerType,
    pub members: Vec<usize>,
    /// Position in `members` of the creature currently battling.
    pub active: usize,
}

impl BattleSide {
    pub fn new(
        display_name: impl Into<String>,
        owner: RosterOwner,
        player_type: PlayerType,
        members: Vec<usize>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            owner,
            player_type,
            members,
            active: 0,
        }
    }

    /// Roster index of the active creature.
    pub fn active_slot(&self) -> Option<usize> {
        self.members.get(self.active).copied()
    }
}

/// The two rosters a battle mutates, borrowed from their owning records for
/// the duration of one turn.
pub struct BattleRosters<'a> {
    rosters: [&'a mut Vec<PokemonInst>; 2],
}

impl<'a> BattleRosters<'a> {
    pub fn new(side_a: &'a mut Vec<PokemonInst>, side_b: &'a mut Vec<PokemonInst>) -> Self {
        Self {
            rosters: [side_a, side_b],
        }
    }

    pub fn roster(&self, side: SideId) -> &[PokemonInst] {
        self.rosters[side.index()]
    }

    /// The creature at a position in a side's member list.
    pub fn member(&self, state: &BattleState, side: SideId, position: usize) -> Option<&PokemonInst> {
        let slot = *state.side(side).members.get(position)?;
        self.rosters[side.index()].get(slot)
    }

    pub fn active(&self, state: &BattleState, side: SideId) -> BattleResult<&PokemonInst> {
        let battle_side = state.side(side);
        let slot = battle_side
            .active_slot()
            .ok_or(BattleStateError::EmptyRoster(side.index()))?;
        self.rosters[side.index()].get(slot).ok_or_else(|| {
            BattleStateError::MissingRosterSlot {
                side: side.index(),
                slot,
            }
            .into()
        })
    }

    pub fn active_mut(&mut self, state: &BattleState, side: SideId) -> BattleResult<&mut PokemonInst> {
        let battle_side = state.side(side);
        let slot = battle_side
            .active_slot()
            .ok_or(BattleStateError::EmptyRoster(side.index()))?;
        self.rosters[side.index()].get_mut(slot).ok_or_else(|| {
            BattleStateError::MissingRosterSlot {
                side: side.index(),
                slot,
            }
            .into()
        })
    }

    /// True when every creature a side brought into the battle has fainted.
    pub fn side_defeated(&self, state: &BattleState, side: SideId) -> bool {
        let roster = &self.rosters[side.index()];
        state
            .side(side)
            .members
            .iter()
            .all(|&slot| roster.get(slot).is_none_or(PokemonInst::is_fainted))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ActionFailureReason {
    /// The battle already has a winner.
    BattleOver,
    /// A knocked-out creature has to be replaced before anyone attacks.
    ReplacementRequired,
    /// The acting creature cannot fight and must be switched out.
    PokemonFainted,
    InvalidSwitchTarget,
    SwitchTargetFainted,
    AlreadyActive,
}

impl fmt::Display for ActionFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ActionFailureReason::BattleOver => "the battle is already over",
            ActionFailureReason::ReplacementRequired => "a fainted Pokémon must be replaced first",
            ActionFailureReason::PokemonFainted => "the active Pokémon has fainted",
            ActionFailureReason::InvalidSwitchTarget => "there is no Pokémon in that slot",
            ActionFailureReason::SwitchTargetFainted => "that Pokémon has fainted",
            ActionFailureReason::AlreadyActive => "that Pokémon is already in battle",
        };
        write!(f, "{}", text)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BattleEvent {
    /// `slot` and `target_slot` are the roster slots of the attacker and
    /// the creature it aimed at.
    MoveUsed {
        side: SideId,
        pokemon: String,
        slot: usize,
        target_slot: usize,
        move_name: String,
    },
    MoveMissed {
        side: SideId,
        pokemon: String,
    },
    CriticalHit {
        side: SideId,
    },
    AttackTypeEffectiveness {
        multiplier: f32,
    },
    DamageDealt {
        side: SideId,
        target: String,
        damage: u16,
        remaining_hp: u16,
    },
    PokemonFainted {
        side: SideId,
        pokemon: String,
    },
    PokemonSwitched {
        side: SideId,
        pokemon: String,
    },
    ActionFailed {
        side: SideId,
        reason: ActionFailureReason,
    },
    PlayerForfeited {
        side: SideId,
    },
    BattleEnded {
        winner: SideId,
    },
}

impl BattleEvent {
    /// Formats the event into a narration line using battle context.
    /// Returns None for silent events that should not reach the battle log.
    pub fn format(&self, battle_state: &BattleState) -> Option<String> {
        let name = |side: &SideId| battle_state.side(*side).display_name.as_str();
        match self {
            BattleEvent::MoveUsed {
                side,
                pokemon,
                move_name,
                ..
            } => Some(format!("{}'s {} used {}!", name(side), pokemon, move_name)),
            BattleEvent::MoveMissed { side, pokemon } => {
                Some(format!("{}'s {}'s attack missed!", name(side), pokemon))
            }
            // Silent; the damage line already reflects the multiplier.
            BattleEvent::CriticalHit { .. } => None,
            BattleEvent::AttackTypeEffectiveness { multiplier } => {
                if *multiplier > 1.0 {
                    Some("It's super effective!".to_string())
                } else if *multiplier == 0.0 {
                    Some("It had no effect...".to_string())
                } else if *multiplier < 1.0 {
                    Some("It's not very effective...".to_string())
                } else {
                    None
                }
            }
            BattleEvent::DamageDealt {
                side,
                target,
                damage,
                ..
            } => Some(format!(
                "It dealt {} damage to {}'s {}!",
                damage,
                name(side),
                target
            )),
            BattleEvent::PokemonFainted { side, pokemon } => {
                Some(format!("{}'s {} fainted!", name(side), pokemon))
            }
            BattleEvent::PokemonSwitched { side, pokemon } => {
                Some(format!("{} switched to {}!", name(side), pokemon))
            }
            BattleEvent::ActionFailed { .. } => None,
            BattleEvent::PlayerForfeited { side } => {
                Some(format!("{} forfeited the battle!", name(side)))
            }
            BattleEvent::BattleEnded { .. } => None,
        }
    }
}

/// Event bus for collecting the events of a single turn.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Narration lines for every non-silent event.
    pub fn formatted(&self, battle_state: &BattleState) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| event.format(battle_state))
            .collect()
    }
}

impl fmt::Display for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "  {:?}", event)?;
        }
        Ok(())
    }
}

/// Pre-drawn percentile outcomes (1..=100) consumed by every random decision.
#[derive(Debug, Clone)]
pub struct TurnRng {
    outcomes: Vec<u8>,
    index: usize,
    scripted: bool,
}

impl TurnRng {
    pub fn new_for_test(outcomes: Vec<u8>) -> Self {
        Self {
            outcomes,
            index: 0,
            scripted: true,
        }
    }

    pub fn new_random() -> Self {
        Self {
            outcomes: Self::draw(100),
            index: 0,
            scripted: false,
        }
    }

    fn draw(count: usize) -> Vec<u8> {
        use rand::Rng;
        let mut rng = rand::rng();
        (0..count).map(|_| rng.random_range(1..=100)).collect()
    }

    pub fn next_outcome(&mut self, reason: &str) -> u8 {
        if self.index >= self.outcomes.len() {
            if self.scripted {
                panic!(
                    "TurnRng exhausted! Tried to get a value for: '{}'. Need more random values.",
                    reason
                );
            }
            self.outcomes.extend(Self::draw(100));
        }
        let outcome = self.outcomes[self.index];

        #[cfg(test)]
        println!("[RNG] Consumed {} for: {}", outcome, reason);
        log::trace!("rng {} for {}", outcome, reason);

        self.index += 1;
        outcome
    }

    pub fn consumed(&self) -> usize {
        self.index
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleState {
    pub battle_id: String,
    pub kind: BattleKind,
    pub sides: [BattleSide; 2],
    pub turn_owner: SideId,
    pub game_state: GameState,
    pub turn_number: u32,
    pub log: Vec<String>,
}

impl BattleState {
    pub fn new(
        id: String,
        kind: BattleKind,
        side_a: BattleSide,
        side_b: BattleSide,
        turn_owner: SideId,
    ) -> Self {
        Self {
            battle_id: id,
            kind,
            sides: [side_a, side_b],
            turn_owner,
            game_state: GameState::AwaitingAction,
            turn_number: 1,
            log: Vec::new(),
        }
    }

    pub fn side(&self, side: SideId) -> &BattleSide {
        &self.sides[side.index()]
    }

    pub fn side_mut(&mut self, side: SideId) -> &mut BattleSide {
        &mut self.sides[side.index()]
    }

    /// The side expected to submit the next action, or None once finished.
    pub fn acting_side(&self) -> Option<SideId> {
        match self.game_state {
            GameState::AwaitingAction => Some(self.turn_owner),
            GameState::AwaitingReplacement(side) => Some(side),
            GameState::Finished { .. } => None,
        }
    }

    pub fn winner(&self) -> Option<SideId> {
        match self.game_state {
            GameState::Finished { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.winner().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state() -> BattleState {
        BattleState::new(
            "b-1".to_string(),
            BattleKind::Gym {
                gym_name: "Pewter City".to_string(),
            },
            BattleSide::new("Ash", RosterOwner::Trainer("ash".to_string()), PlayerType::Human, vec![0]),
            BattleSide::new("Brock", RosterOwner::Gym("Pewter City".to_string()), PlayerType::NPC, vec![0]),
            SideId::A,
        )
    }

    #[test]
    fn test_event_formatting() {
        let battle_state = state();
        let used = BattleEvent::MoveUsed {
            side: SideId::A,
            pokemon: "pikachu".to_string(),
            slot: 0,
            target_slot: 0,
            move_name: "tackle".to_string(),
        };
        assert_eq!(used.format(&battle_state).as_deref(), Some("Ash's pikachu used tackle!"));

        let dealt = BattleEvent::DamageDealt {
            side: SideId::B,
            target: "onix".to_string(),
            damage: 8,
            remaining_hp: 27,
        };
        assert_eq!(
            dealt.format(&battle_state).as_deref(),
            Some("It dealt 8 damage to Brock's onix!")
        );
        assert_eq!(BattleEvent::CriticalHit { side: SideId::A }.format(&battle_state), None);
        assert_eq!(
            BattleEvent::AttackTypeEffectiveness { multiplier: 1.0 }.format(&battle_state),
            None
        );
    }

    #[test]
    fn test_event_bus() {
        let battle_state = state();
        let mut bus = EventBus::new();
        assert!(bus.is_empty());
        bus.push(BattleEvent::CriticalHit { side: SideId::A });
        bus.push(BattleEvent::PokemonSwitched {
            side: SideId::A,
            pokemon: "eevee".to_string(),
        });
        assert_eq!(bus.len(), 2);
        assert_eq!(bus.formatted(&battle_state), vec!["Ash switched to eevee!".to_string()]);
        assert!(format!("{}", bus).contains("CriticalHit"));
    }

    #[test]
    fn test_acting_side_follows_game_state() {
        let mut battle_state = state();
        assert_eq!(battle_state.acting_side(), Some(SideId::A));
        battle_state.game_state = GameState::AwaitingReplacement(SideId::B);
        assert_eq!(battle_state.acting_side(), Some(SideId::B));
        battle_state.game_state = GameState::Finished { winner: SideId::A };
        assert_eq!(battle_state.acting_side(), None);
        assert_eq!(battle_state.winner(), Some(SideId::A));
    }

    #[test]
    fn test_scripted_rng_replays_outcomes() {
        let mut rng = TurnRng::new_for_test(vec![7, 93]);
        assert_eq!(rng.next_outcome("first"), 7);
        assert_eq!(rng.next_outcome("second"), 93);
        assert_eq!(rng.consumed(), 2);
    }

    #[test]
    fn test_random_rng_never_runs_dry() {
        let mut rng = TurnRng::new_random();
        for _ in 0..250 {
            let outcome = rng.next_outcome("stress");
            assert!((1..=100).contains(&outcome));
        }
    }
}
