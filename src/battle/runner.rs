use crate::battle::ai::{Behavior, RandomMoveAI};
use crate::battle::calculators::BattleRules;
use crate::battle::engine::{check_battle_end, execute_turn, BattleAction, TurnOutcome, TurnReport};
use crate::battle::state::{BattleEvent, BattleRosters, BattleState, PlayerAction, PlayerType, SideId, TurnRng};
use crate::catalog::CreatureCatalog;
use crate::errors::{BattleResult, BattleStateError};

/// NPC sides never need more than a replacement plus an attack in a row.
const MAX_NPC_ACTIONS: usize = 12;

/// Everything that happened while handling one submitted action, including
/// any NPC turns that followed it.
#[derive(Debug, Clone, Default)]
pub struct RunnerReport {
    pub reports: Vec<TurnReport>,
    pub winner: Option<SideId>,
    pub new_log_lines: Vec<String>,
}

/// The most recent attack in a report, for scene rendering. Slots index the
/// rosters of the attacking and defending sides.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackSummary {
    pub attacker: SideId,
    pub attacker_slot: usize,
    pub defender_slot: usize,
    pub move_name: String,
    pub damage: u16,
}

impl RunnerReport {
    pub fn first_outcome(&self) -> Option<&TurnOutcome> {
        self.reports.first().map(|report| &report.outcome)
    }

    pub fn last_attack(&self) -> Option<AttackSummary> {
        self.reports.iter().rev().find_map(|report| {
            let (move_name, attacker_slot, defender_slot) =
                report.bus.events().iter().find_map(|event| match event {
                    BattleEvent::MoveUsed {
                        move_name,
                        slot,
                        target_slot,
                        ..
                    } => Some((move_name.clone(), *slot, *target_slot)),
                    _ => None,
                })?;
            let damage = match report.outcome {
                TurnOutcome::Continue { damage } | TurnOutcome::Knockout { damage } => damage,
                _ => 0,
            };
            Some(AttackSummary {
                attacker: report.side,
                attacker_slot,
                defender_slot,
                move_name,
                damage,
            })
        })
    }

    fn absorb(&mut self, other: RunnerReport) {
        self.reports.extend(other.reports);
        self.winner = other.winner.or(self.winner);
    }
}

/// Async driver around the synchronous engine: resolves move names through
/// the catalog, checks for the end of the battle after knockouts and plays
/// NPC turns until a human has to act.
pub struct BattleRunner<'a, C: CreatureCatalog + ?Sized, B = RandomMoveAI> {
    catalog: &'a C,
    rules: BattleRules,
    behavior: B,
}

impl<'a, C: CreatureCatalog + ?Sized> BattleRunner<'a, C, RandomMoveAI> {
    pub fn new(catalog: &'a C, rules: BattleRules) -> Self {
        Self::with_behavior(catalog, rules, RandomMoveAI::new())
    }
}

impl<'a, C: CreatureCatalog + ?Sized, B: Behavior + Sync> BattleRunner<'a, C, B> {
    pub fn with_behavior(catalog: &'a C, rules: BattleRules, behavior: B) -> Self {
        Self {
            catalog,
            rules,
            behavior,
        }
    }

    pub async fn resolve_action(&self, action: PlayerAction) -> BattleAction {
        match action {
            PlayerAction::UseMove { move_name } => BattleAction::Attack(self.catalog.get_move(&move_name).await),
            PlayerAction::SwitchPokemon { team_index } => BattleAction::Switch { team_index },
            PlayerAction::Forfeit => BattleAction::Forfeit,
        }
    }

    /// Runs one action for `side`, then any NPC turns it hands control to.
    pub async fn submit_action(
        &self,
        state: &mut BattleState,
        rosters: &mut BattleRosters<'_>,
        side: SideId,
        action: PlayerAction,
        rng: &mut TurnRng,
    ) -> BattleResult<RunnerReport> {
        let log_start = state.log.len();
        let mut report = RunnerReport::default();

        let failed = self.run_single(state, rosters, side, action, rng, &mut report).await?;
        if !failed && !state.is_finished() {
            let npc = self.advance_npc_turns(state, rosters, rng).await?;
            report.absorb(npc);
        }

        report.new_log_lines = state.log[log_start..].to_vec();
        report.winner = state.winner();
        Ok(report)
    }

    /// Plays turns for NPC-controlled sides until a human must act or the battle ends.
    pub async fn advance_npc_turns(
        &self,
        state: &mut BattleState,
        rosters: &mut BattleRosters<'_>,
        rng: &mut TurnRng,
    ) -> BattleResult<RunnerReport> {
        let log_start = state.log.len();
        let mut report = RunnerReport::default();

        for _ in 0..MAX_NPC_ACTIONS {
            let Some(acting) = state.acting_side() else {
                break;
            };
            if state.side(acting).player_type != PlayerType::NPC {
                break;
            }
            let action = self.behavior.decide_action(acting, state, rosters, rng);
            log::debug!("NPC {} chose {:?}", state.side(acting).display_name, action);
            if self.run_single(state, rosters, acting, action, rng, &mut report).await? {
                return Err(BattleStateError::InconsistentState(format!(
                    "NPC action for side {} was rejected",
                    acting
                ))
                .into());
            }
        }

        if let Some(acting) = state.acting_side() {
            if state.side(acting).player_type == PlayerType::NPC {
                return Err(BattleStateError::InconsistentState("NPC turn limit exceeded".to_string()).into());
            }
        }

        report.new_log_lines = state.log[log_start..].to_vec();
        report.winner = state.winner();
        Ok(report)
    }

    /// Returns true when the engine rejected the action.
    async fn run_single(
        &self,
        state: &mut BattleState,
        rosters: &mut BattleRosters<'_>,
        side: SideId,
        action: PlayerAction,
        rng: &mut TurnRng,
        report: &mut RunnerReport,
    ) -> BattleResult<bool> {
        let action = self.resolve_action(action).await;
        let turn = execute_turn(state, rosters, side, action, &self.rules, rng)?;
        let failed = matches!(turn.outcome, TurnOutcome::Failed(_));
        if matches!(turn.outcome, TurnOutcome::Knockout { .. }) {
            check_battle_end(state, rosters);
        }
        report.reports.push(turn);
        Ok(failed)
    }
}
