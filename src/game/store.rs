//! In-memory entity store - players, zones, sessions

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::{Broadcaster, GameEvent};

/// Identifier of "the" current session. The store supports multiple session
/// records, but consumers only ever address this one.
pub const CURRENT_SESSION_ID: i32 = 1;

/// The two mutually exclusive player roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The pursuer - exactly one per running round
    Cat,
    /// A fleeing player
    Mouse,
}

impl Default for Role {
    fn default() -> Self {
        Self::Mouse
    }
}

impl Role {
    /// Parse a role label from a request body. Route handlers validate the
    /// label before the store ever sees it.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "cat" => Some(Self::Cat),
            "mouse" => Some(Self::Mouse),
            _ => None,
        }
    }
}

/// A player on the map
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: i32,
    pub username: String,
    pub role: Role,
    /// Decimal degrees, kept as text exactly as the client sent them
    pub latitude: String,
    pub longitude: String,
    /// Soft-delete flag: disconnected players stay in the roster
    pub is_active: bool,
    /// Marker color chosen by the player, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The authorized play boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameZone {
    pub id: i32,
    pub name: String,
    /// JSON text of an ordered list of latitude/longitude pairs. Stored
    /// verbatim; geometric validation is advisory and lives at the edge.
    pub coordinates: String,
}

/// The single global round record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: i32,
    pub is_running: bool,
    pub zone_id: Option<i32>,
}

/// A latitude/longitude pair, used for advisory zone payload validation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Fields required to create a player. Defaults (role, active flag) are
/// filled in by the route layer.
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub username: String,
    pub role: Role,
    pub latitude: String,
    pub longitude: String,
    pub is_active: bool,
}

/// Outcome of a join request
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// A brand new player record was allocated
    Created(Player),
    /// An inactive player with the same username was reactivated in place
    Rejoined(Player),
}

impl JoinOutcome {
    pub fn player(&self) -> &Player {
        match self {
            Self::Created(p) | Self::Rejoined(p) => p,
        }
    }
}

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("player not found: {0}")]
    PlayerNotFound(i32),

    #[error("game session not found: {0}")]
    SessionNotFound(i32),

    #[error("username already taken: {0}")]
    UsernameTaken(String),
}

struct Inner {
    players: BTreeMap<i32, Player>,
    zones: BTreeMap<i32, GameZone>,
    sessions: BTreeMap<i32, GameSession>,
    next_player_id: i32,
    next_zone_id: i32,
    next_session_id: i32,
}

impl Inner {
    fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            zones: BTreeMap::new(),
            sessions: BTreeMap::new(),
            next_player_id: 1,
            next_zone_id: 1,
            next_session_id: 1,
        }
    }
}

/// In-memory game state, owned for the lifetime of the process.
///
/// Every operation takes and releases the lock within the call, so
/// operations are atomic with respect to each other; there is no
/// cross-entity transaction because no mutation touches more than one
/// keyed map.
pub struct GameStore {
    inner: RwLock<Inner>,
    broadcast: Arc<dyn Broadcaster>,
}

impl GameStore {
    pub fn new(broadcast: Arc<dyn Broadcaster>) -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
            broadcast,
        }
    }

    // ========================================================================
    // Player operations
    // ========================================================================

    /// All players in id order, including deactivated ones
    pub fn get_players(&self) -> Vec<Player> {
        self.inner.read().players.values().cloned().collect()
    }

    pub fn get_player(&self, id: i32) -> Option<Player> {
        self.inner.read().players.get(&id).cloned()
    }

    pub fn get_player_by_username(&self, username: &str) -> Option<Player> {
        self.inner
            .read()
            .players
            .values()
            .find(|p| p.username == username)
            .cloned()
    }

    /// Players currently connected, in id order
    pub fn get_active_players(&self) -> Vec<Player> {
        self.inner
            .read()
            .players
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect()
    }

    /// Create a player, or reactivate an inactive one with the same username.
    ///
    /// Username uniqueness is only enforced among active players: a rejoining
    /// player gets its prior id back, with its position refreshed if it moved
    /// while away.
    pub fn create_player(&self, new: NewPlayer) -> Result<JoinOutcome, StoreError> {
        let outcome = {
            let mut inner = self.inner.write();

            let existing = inner
                .players
                .values()
                .find(|p| p.username == new.username)
                .map(|p| (p.id, p.is_active));

            match existing {
                Some((_, true)) => return Err(StoreError::UsernameTaken(new.username)),
                Some((id, false)) => {
                    let player = inner.players.get_mut(&id).unwrap();
                    player.is_active = true;
                    if player.latitude != new.latitude || player.longitude != new.longitude {
                        player.latitude = new.latitude;
                        player.longitude = new.longitude;
                    }
                    JoinOutcome::Rejoined(player.clone())
                }
                None => {
                    let id = inner.next_player_id;
                    inner.next_player_id += 1;

                    let player = Player {
                        id,
                        username: new.username,
                        role: new.role,
                        latitude: new.latitude,
                        longitude: new.longitude,
                        is_active: new.is_active,
                        color: None,
                    };
                    inner.players.insert(id, player.clone());
                    JoinOutcome::Created(player)
                }
            }
        };

        match &outcome {
            JoinOutcome::Created(p) => {
                info!(player_id = p.id, username = %p.username, "Player joined");
                self.broadcast.publish(&GameEvent::PlayerJoined(p.clone()));
            }
            JoinOutcome::Rejoined(p) => {
                info!(player_id = p.id, username = %p.username, "Player rejoined");
                self.broadcast.publish(&GameEvent::PlayerRejoined(p.clone()));
            }
        }

        Ok(outcome)
    }

    pub fn update_player_position(
        &self,
        id: i32,
        latitude: &str,
        longitude: &str,
    ) -> Result<Player, StoreError> {
        let player = {
            let mut inner = self.inner.write();
            let player = inner
                .players
                .get_mut(&id)
                .ok_or(StoreError::PlayerNotFound(id))?;
            player.latitude = latitude.to_string();
            player.longitude = longitude.to_string();
            player.clone()
        };

        self.broadcast.publish(&GameEvent::PlayerMoved(player.clone()));
        Ok(player)
    }

    pub fn update_player_role(&self, id: i32, role: Role) -> Result<Player, StoreError> {
        let player = {
            let mut inner = self.inner.write();
            let player = inner
                .players
                .get_mut(&id)
                .ok_or(StoreError::PlayerNotFound(id))?;
            player.role = role;
            player.clone()
        };

        info!(player_id = id, role = ?role, "Player role changed");
        self.broadcast
            .publish(&GameEvent::PlayerRoleChanged(player.clone()));
        Ok(player)
    }

    pub fn update_player_color(&self, id: i32, color: &str) -> Result<Player, StoreError> {
        let player = {
            let mut inner = self.inner.write();
            let player = inner
                .players
                .get_mut(&id)
                .ok_or(StoreError::PlayerNotFound(id))?;
            player.color = Some(color.to_string());
            player.clone()
        };

        self.broadcast
            .publish(&GameEvent::PlayerColorChanged(player.clone()));
        Ok(player)
    }

    /// Soft delete: the record stays in the roster with the active flag
    /// cleared, so the username and id survive for a later rejoin.
    pub fn deactivate_player(&self, id: i32) -> Result<Player, StoreError> {
        let player = {
            let mut inner = self.inner.write();
            let player = inner
                .players
                .get_mut(&id)
                .ok_or(StoreError::PlayerNotFound(id))?;
            player.is_active = false;
            player.clone()
        };

        info!(player_id = id, username = %player.username, "Player disconnected");
        self.broadcast
            .publish(&GameEvent::PlayerDisconnected(player.clone()));
        Ok(player)
    }

    // ========================================================================
    // Zone operations
    // ========================================================================

    pub fn create_game_zone(&self, name: &str, coordinates: &str) -> GameZone {
        let zone = {
            let mut inner = self.inner.write();
            let id = inner.next_zone_id;
            inner.next_zone_id += 1;

            let zone = GameZone {
                id,
                name: name.to_string(),
                coordinates: coordinates.to_string(),
            };
            inner.zones.insert(id, zone.clone());
            zone
        };

        info!(zone_id = zone.id, name = %zone.name, "Zone created");
        self.broadcast.publish(&GameEvent::ZoneCreated(zone.clone()));
        zone
    }

    /// All zones in creation order
    pub fn get_game_zones(&self) -> Vec<GameZone> {
        self.inner.read().zones.values().cloned().collect()
    }

    pub fn get_game_zone(&self, id: i32) -> Option<GameZone> {
        self.inner.read().zones.get(&id).cloned()
    }

    // ========================================================================
    // Session operations
    // ========================================================================

    pub fn get_game_session(&self, id: i32) -> Option<GameSession> {
        self.inner.read().sessions.get(&id).cloned()
    }

    /// Return the current session, creating it stopped and zone-less on
    /// first fetch.
    pub fn get_or_create_game_session(&self) -> GameSession {
        let mut inner = self.inner.write();
        if let Some(session) = inner.sessions.get(&CURRENT_SESSION_ID) {
            return session.clone();
        }

        let id = inner.next_session_id;
        inner.next_session_id += 1;

        let session = GameSession {
            id,
            is_running: false,
            zone_id: None,
        };
        inner.sessions.insert(id, session.clone());
        session
    }

    pub fn update_game_session(
        &self,
        id: i32,
        is_running: bool,
    ) -> Result<GameSession, StoreError> {
        let session = {
            let mut inner = self.inner.write();
            let session = inner
                .sessions
                .get_mut(&id)
                .ok_or(StoreError::SessionNotFound(id))?;
            session.is_running = is_running;
            session.clone()
        };

        info!(session_id = id, is_running, "Game state changed");
        self.broadcast
            .publish(&GameEvent::GameStateChanged(session.clone()));
        Ok(session)
    }
}
