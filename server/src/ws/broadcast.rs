use axum::extract::ws::Message;
use dashmap::DashMap;

use super::protocol::OutboundEvent;
use super::{ConnectionId, ConnectionSender, ConnectionTable};
use crate::relay::Transport;

impl Transport for DashMap<ConnectionId, ConnectionSender> {
    fn send(&self, connection_id: ConnectionId, event: &OutboundEvent) {
        let Some(msg) = event.to_message() else {
            return;
        };
        if let Some(sender) = self.get(&connection_id) {
            let _ = sender.send(msg);
        }
    }

    fn broadcast(&self, event: &OutboundEvent) {
        let Some(msg) = event.to_message() else {
            return;
        };
        for entry in self.iter() {
            let _ = entry.value().send(msg.clone());
        }
    }
}

/// Queue a close frame for one connection.
pub fn close_connection(table: &ConnectionTable, connection_id: ConnectionId) {
    if let Some(sender) = table.get(&connection_id) {
        let _ = sender.send(Message::Close(None));
    }
}
