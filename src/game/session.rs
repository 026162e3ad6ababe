//! Session lifecycle - the stopped/running state machine
//!
//! Two states only. Stopping is unconditional and never resets roles or
//! positions; starting requires a cat, spinning the wheel first when no
//! active player has the role yet.

use std::sync::Arc;

use tracing::info;

use super::store::{GameSession, GameStore, Role, StoreError};
use super::wheel::{self, Wheel, WheelError};

/// Errors from a start/stop request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Wheel(#[from] WheelError),
}

/// Drives session transitions against the store, running role selection
/// when a start requires one.
pub struct SessionCoordinator {
    store: Arc<GameStore>,
    wheel: Wheel,
}

impl SessionCoordinator {
    pub fn new(store: Arc<GameStore>) -> Self {
        Self {
            store,
            wheel: Wheel::new(),
        }
    }

    /// Apply a start/stop request to the session with the given id.
    ///
    /// On start, if no active player is the cat yet, one is selected by
    /// wheel spin before the flag flips; the whole request is refused with
    /// no state change when fewer than two players are active or another
    /// spin is pending.
    pub fn set_running(&self, id: i32, running: bool) -> Result<GameSession, SessionError> {
        if !running {
            return Ok(self.store.update_game_session(id, false)?);
        }

        // Confirm the session exists before any role mutation
        self.store
            .get_game_session(id)
            .ok_or(StoreError::SessionNotFound(id))?;

        // Claim the wheel before inspecting the roster: the no-cat check and
        // the role assignment must happen under the same claim, otherwise two
        // racing starts could each see no cat and select one apiece.
        let guard = self.wheel.try_begin()?;

        let active = self.store.get_active_players();
        if !active.iter().any(|p| p.role == Role::Cat) {
            let angle = wheel::spin_angle(&mut rand::thread_rng());
            let winner =
                wheel::choose_next(&active, angle).ok_or(WheelError::NotEnoughPlayers)?;

            info!(
                player_id = winner.id,
                username = %winner.username,
                "Wheel selected the cat"
            );
            self.store.update_player_role(winner.id, Role::Cat)?;
        }
        drop(guard);

        Ok(self.store.update_game_session(id, true)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopBroadcaster;
    use crate::game::store::{JoinOutcome, NewPlayer, CURRENT_SESSION_ID};

    fn setup() -> (Arc<GameStore>, SessionCoordinator) {
        let store = Arc::new(GameStore::new(Arc::new(NoopBroadcaster)));
        let coordinator = SessionCoordinator::new(store.clone());
        (store, coordinator)
    }

    fn join(store: &GameStore, username: &str, lat: &str, lon: &str) -> i32 {
        let outcome = store
            .create_player(NewPlayer {
                username: username.to_string(),
                role: Role::default(),
                latitude: lat.to_string(),
                longitude: lon.to_string(),
                is_active: true,
            })
            .unwrap();
        match outcome {
            JoinOutcome::Created(p) | JoinOutcome::Rejoined(p) => p.id,
        }
    }

    #[test]
    fn starting_selects_exactly_one_cat_then_runs() {
        let (store, coordinator) = setup();
        join(&store, "alice", "45.0", "4.0");
        join(&store, "bob", "45.1", "4.1");
        store.get_or_create_game_session();

        let session = coordinator.set_running(CURRENT_SESSION_ID, true).unwrap();
        assert!(session.is_running);

        let cats: Vec<_> = store
            .get_active_players()
            .into_iter()
            .filter(|p| p.role == Role::Cat)
            .collect();
        assert_eq!(cats.len(), 1);
    }

    #[test]
    fn starting_with_an_existing_cat_does_not_reassign() {
        let (store, coordinator) = setup();
        join(&store, "alice", "45.0", "4.0");
        let bob = join(&store, "bob", "45.1", "4.1");
        store.get_or_create_game_session();
        store.update_player_role(bob, Role::Cat).unwrap();

        coordinator.set_running(CURRENT_SESSION_ID, true).unwrap();

        assert_eq!(store.get_player(bob).unwrap().role, Role::Cat);
        let cats = store
            .get_active_players()
            .into_iter()
            .filter(|p| p.role == Role::Cat)
            .count();
        assert_eq!(cats, 1);
    }

    #[test]
    fn starting_with_too_few_players_is_refused_without_mutation() {
        let (store, coordinator) = setup();
        let alice = join(&store, "alice", "45.0", "4.0");
        let before = store.get_or_create_game_session();

        let err = coordinator
            .set_running(CURRENT_SESSION_ID, true)
            .unwrap_err();

        assert_eq!(err, SessionError::Wheel(WheelError::NotEnoughPlayers));
        assert_eq!(store.get_player(alice).unwrap().role, Role::Mouse);
        let after = store.get_game_session(CURRENT_SESSION_ID).unwrap();
        assert!(!after.is_running);
        assert_eq!(after.zone_id, before.zone_id);
    }

    #[test]
    fn stopping_is_unconditional_and_preserves_roles() {
        let (store, coordinator) = setup();
        join(&store, "alice", "45.0", "4.0");
        join(&store, "bob", "45.1", "4.1");
        store.get_or_create_game_session();

        coordinator.set_running(CURRENT_SESSION_ID, true).unwrap();
        let cat_id = store
            .get_active_players()
            .into_iter()
            .find(|p| p.role == Role::Cat)
            .unwrap()
            .id;

        let stopped = coordinator.set_running(CURRENT_SESSION_ID, false).unwrap();
        assert!(!stopped.is_running);
        // Restarting later reuses the same record and the same cat
        assert_eq!(store.get_player(cat_id).unwrap().role, Role::Cat);
    }

    #[test]
    fn concurrent_starts_assign_at_most_one_cat() {
        let (store, coordinator) = setup();
        join(&store, "alice", "45.0", "4.0");
        join(&store, "bob", "45.1", "4.1");
        store.get_or_create_game_session();

        let coordinator = Arc::new(coordinator);
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    coordinator.set_running(CURRENT_SESSION_ID, true)
                })
            })
            .collect();

        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();
        assert!(started >= 1);

        // However the starts interleave, selection runs at most once
        let cats = store
            .get_active_players()
            .into_iter()
            .filter(|p| p.role == Role::Cat)
            .count();
        assert_eq!(cats, 1);
        assert!(store.get_game_session(CURRENT_SESSION_ID).unwrap().is_running);
    }

    #[test]
    fn starting_an_unknown_session_is_not_found() {
        let (store, coordinator) = setup();
        join(&store, "alice", "45.0", "4.0");
        join(&store, "bob", "45.1", "4.1");

        let err = coordinator.set_running(9, true).unwrap_err();
        assert_eq!(err, SessionError::Store(StoreError::SessionNotFound(9)));
        // No role was assigned along the way
        assert!(store
            .get_active_players()
            .iter()
            .all(|p| p.role == Role::Mouse));
    }
}
