//! State-change events and the publish/subscribe seam
//!
//! Every store mutation publishes a typed event here. The shipped
//! implementation is a deliberate no-op: events are logged and dropped, and
//! clients refetch over HTTP instead. Wiring a real fan-out (e.g. over the
//! WebSocket endpoint) only requires another `Broadcaster` impl.

use serde::Serialize;
use tracing::debug;

use crate::game::store::{GameSession, GameZone, Player};

/// A state change, tagged for the wire as `{"type": ..., "data": ...}`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    PlayerJoined(Player),
    PlayerRejoined(Player),
    PlayerMoved(Player),
    PlayerRoleChanged(Player),
    PlayerColorChanged(Player),
    PlayerDisconnected(Player),
    ZoneCreated(GameZone),
    GameStateChanged(GameSession),
}

impl GameEvent {
    /// The wire tag, for logging without serializing the payload
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerJoined(_) => "PLAYER_JOINED",
            Self::PlayerRejoined(_) => "PLAYER_REJOINED",
            Self::PlayerMoved(_) => "PLAYER_MOVED",
            Self::PlayerRoleChanged(_) => "PLAYER_ROLE_CHANGED",
            Self::PlayerColorChanged(_) => "PLAYER_COLOR_CHANGED",
            Self::PlayerDisconnected(_) => "PLAYER_DISCONNECTED",
            Self::ZoneCreated(_) => "ZONE_CREATED",
            Self::GameStateChanged(_) => "GAME_STATE_CHANGED",
        }
    }
}

/// Fan-out point for state changes
pub trait Broadcaster: Send + Sync {
    fn publish(&self, event: &GameEvent);
}

/// Honest no-op broadcaster: logs what it would send and drops it
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn publish(&self, event: &GameEvent) {
        debug!(event = event.kind(), "would broadcast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::store::Role;

    #[test]
    fn events_serialize_with_type_tag_and_entity_payload() {
        let event = GameEvent::PlayerJoined(Player {
            id: 1,
            username: "alice".to_string(),
            role: Role::Mouse,
            latitude: "45.0".to_string(),
            longitude: "4.0".to_string(),
            is_active: true,
            color: None,
        });

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PLAYER_JOINED");
        assert_eq!(json["data"]["username"], "alice");
        assert_eq!(json["data"]["isActive"], true);
        assert_eq!(event.kind(), "PLAYER_JOINED");
    }
}
