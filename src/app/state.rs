//! Application state shared across routes

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use crate::config::Config;
use crate::events::{Broadcaster, NoopBroadcaster};
use crate::game::{GameStore, SessionCoordinator};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<GameStore>,
    pub session: Arc<SessionCoordinator>,
    /// Connected WebSocket viewers (the push channel delivers nothing yet)
    pub viewers: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Events are logged and dropped; clients poll over HTTP
        let broadcaster: Arc<dyn Broadcaster> = Arc::new(NoopBroadcaster);

        let store = Arc::new(GameStore::new(broadcaster));
        let session = Arc::new(SessionCoordinator::new(store.clone()));

        Self {
            config,
            store,
            session,
            viewers: Arc::new(AtomicUsize::new(0)),
        }
    }
}
