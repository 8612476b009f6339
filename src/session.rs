use crate::battle::state::{BattleState, RosterOwner};
use crate::errors::SessionError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Battles in progress, keyed by the id of the trainer who started them.
///
/// A session is created when a challenge is accepted and removed when the
/// battle reaches a winner. Holding the lock never spans an await.
#[derive(Debug, Default)]
pub struct BattleRegistry {
    sessions: Mutex<HashMap<String, BattleState>>,
}

impl BattleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, BattleState>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new battle. A trainer may only have one at a time.
    pub fn begin(&self, trainer_id: &str, state: BattleState) -> Result<(), SessionError> {
        let mut sessions = self.sessions();
        if sessions.contains_key(trainer_id) {
            return Err(SessionError::AlreadyActive(trainer_id.to_string()));
        }
        log::debug!("session {} opened for {}", state.battle_id, trainer_id);
        sessions.insert(trainer_id.to_string(), state);
        Ok(())
    }

    pub fn get(&self, trainer_id: &str) -> Option<BattleState> {
        self.sessions().get(trainer_id).cloned()
    }

    /// Replaces the stored state of an existing battle.
    pub fn update(&self, trainer_id: &str, state: BattleState) -> Result<(), SessionError> {
        match self.sessions().get_mut(trainer_id) {
            Some(slot) => {
                *slot = state;
                Ok(())
            }
            None => Err(SessionError::NoActiveBattle(trainer_id.to_string())),
        }
    }

    pub fn end(&self, trainer_id: &str) -> Option<BattleState> {
        let ended = self.sessions().remove(trainer_id);
        if let Some(state) = &ended {
            log::debug!("session {} closed for {}", state.battle_id, trainer_id);
        }
        ended
    }

    pub fn is_active(&self, trainer_id: &str) -> bool {
        self.sessions().contains_key(trainer_id)
    }

    /// True when the trainer started a battle or their roster is fighting in someone else's.
    pub fn is_engaged(&self, trainer_id: &str) -> bool {
        self.is_active(trainer_id) || self.roster_in_use(&RosterOwner::Trainer(trainer_id.to_string()))
    }

    /// True when any open session fights with the roster of `owner`.
    pub fn roster_in_use(&self, owner: &RosterOwner) -> bool {
        self.sessions()
            .values()
            .any(|state| state.sides.iter().any(|side| &side.owner == owner))
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}
