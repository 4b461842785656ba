use std::sync::Arc;
use std::time::Duration;

use crate::presence::PresenceRegistry;
use crate::relay::NotificationRelay;
use crate::ws::{new_connection_table, ConnectionTable};

/// Server-initiated keepalive timings for each socket.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Every open WebSocket, registered or not
    pub connections: ConnectionTable,
    /// Identity -> connection bindings
    pub registry: Arc<PresenceRegistry>,
    /// Event dispatch over `registry`
    pub relay: NotificationRelay,
    pub heartbeat: Heartbeat,
}

impl AppState {
    pub fn new(heartbeat: Heartbeat) -> Self {
        let registry = Arc::new(PresenceRegistry::new());
        Self {
            connections: new_connection_table(),
            relay: NotificationRelay::new(registry.clone()),
            registry,
            heartbeat,
        }
    }
}
