//! Notification relay: turns inbound socket events into registry operations and
//! outbound sends.
//!
//! Every event results in exactly one registry operation and at most one send.
//! Nothing here can fail: a duplicate registration is ignored and a notification for an
//! identity that is not present is dropped without telling the sender.

pub mod notification;

use std::sync::Arc;

use crate::presence::PresenceRegistry;
use crate::ws::protocol::{InboundEvent, OutboundEvent, CONNECT_ANNOUNCEMENT};
use crate::ws::ConnectionId;
use notification::NotificationRequest;

/// Outbound side of the connection transport.
///
/// Both calls are best-effort: a send to a socket that has gone away is silently lost.
pub trait Transport {
    fn send(&self, connection_id: ConnectionId, event: &OutboundEvent);
    fn broadcast(&self, event: &OutboundEvent);
}

/// What the connection actor should do after an event has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    Close,
}

#[derive(Clone)]
pub struct NotificationRelay {
    registry: Arc<PresenceRegistry>,
}

impl NotificationRelay {
    pub fn new(registry: Arc<PresenceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    /// Announce a newly accepted connection to every open socket, the new one included.
    pub fn on_connect<T: Transport + ?Sized>(&self, transport: &T, connection_id: ConnectionId) {
        tracing::debug!(conn_id = %connection_id, "Broadcasting connect announcement");
        transport.broadcast(&OutboundEvent::Notification(CONNECT_ANNOUNCEMENT.to_string()));
    }

    pub fn on_event<T: Transport + ?Sized>(
        &self,
        transport: &T,
        connection_id: ConnectionId,
        event: InboundEvent,
    ) -> Disposition {
        match event {
            InboundEvent::NewUser(user_id) => {
                if self.registry.register(&user_id, connection_id) {
                    tracing::debug!(conn_id = %connection_id, user_id = %user_id, "User registered");
                } else {
                    tracing::debug!(
                        conn_id = %connection_id,
                        user_id = %user_id,
                        "Identity already present, registration ignored"
                    );
                }
                Disposition::Continue
            }
            InboundEvent::SendNotification(request) => {
                self.relay(transport, request, OutboundEvent::GetNotification);
                Disposition::Continue
            }
            InboundEvent::SendNotificationB(request) => {
                self.relay(transport, request, OutboundEvent::GetNotificationB);
                Disposition::Continue
            }
            InboundEvent::Disconnect => {
                self.on_disconnect(connection_id);
                Disposition::Close
            }
        }
    }

    /// Release every identity the connection registered. No-op if it never registered.
    pub fn on_disconnect(&self, connection_id: ConnectionId) {
        let removed = self.registry.remove(connection_id);
        if !removed.is_empty() {
            tracing::debug!(conn_id = %connection_id, users = ?removed, "Presence removed");
        }
    }

    /// Look up the receiver and forward the payload under `label`.
    /// Returns whether a send was issued.
    fn relay<P, T, F>(&self, transport: &T, request: NotificationRequest<P>, label: F) -> bool
    where
        T: Transport + ?Sized,
        F: FnOnce(P) -> OutboundEvent,
    {
        let Some(receiver_id) = request.receiver_id else {
            tracing::debug!("Notification without receiverId dropped");
            return false;
        };

        match self.registry.lookup(&receiver_id) {
            Some(entry) => {
                let event = label(request.payload);
                tracing::debug!(
                    receiver_id = %receiver_id,
                    conn_id = %entry.connection_id,
                    event = event.name(),
                    "Relaying notification"
                );
                transport.send(entry.connection_id, &event);
                true
            }
            None => {
                tracing::debug!(receiver_id = %receiver_id, "Receiver offline, notification dropped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notification::{Notification, Offer};
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every outbound call; `None` target means broadcast.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(Option<ConnectionId>, OutboundEvent)>>,
    }

    impl RecordingTransport {
        fn take(&self) -> Vec<(Option<ConnectionId>, OutboundEvent)> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, connection_id: ConnectionId, event: &OutboundEvent) {
            self.sent
                .lock()
                .unwrap()
                .push((Some(connection_id), event.clone()));
        }

        fn broadcast(&self, event: &OutboundEvent) {
            self.sent.lock().unwrap().push((None, event.clone()));
        }
    }

    fn relay() -> NotificationRelay {
        NotificationRelay::new(Arc::new(PresenceRegistry::new()))
    }

    fn notify(receiver: &str, message: &str) -> InboundEvent {
        InboundEvent::SendNotification(NotificationRequest {
            receiver_id: Some(receiver.to_string()),
            payload: Notification {
                message: Some(json!(message)),
                ..Default::default()
            },
        })
    }

    #[test]
    fn test_routes_to_registered_receiver_only() {
        let relay = relay();
        let transport = RecordingTransport::default();
        let h_a = ConnectionId::new();
        let h_b = ConnectionId::new();

        relay.on_event(&transport, h_a, InboundEvent::NewUser("farmer1".into()));
        let disposition = relay.on_event(&transport, h_b, notify("farmer1", "offer ready"));

        assert_eq!(disposition, Disposition::Continue);
        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Some(h_a));
        assert_eq!(
            sent[0].1,
            OutboundEvent::GetNotification(Notification {
                message: Some(json!("offer ready")),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_offer_is_relabeled() {
        let relay = relay();
        let transport = RecordingTransport::default();
        let h_a = ConnectionId::new();
        relay.on_event(&transport, h_a, InboundEvent::NewUser("farmer1".into()));

        let offer = Offer {
            buyerprice: Some(json!(12)),
            quantitybuyerneeds: Some(json!(3)),
            ..Default::default()
        };
        relay.on_event(
            &transport,
            ConnectionId::new(),
            InboundEvent::SendNotificationB(NotificationRequest {
                receiver_id: Some("farmer1".into()),
                payload: offer.clone(),
            }),
        );

        assert_eq!(
            transport.take(),
            vec![(Some(h_a), OutboundEvent::GetNotificationB(offer))]
        );
    }

    #[test]
    fn test_unknown_receiver_is_dropped() {
        let relay = relay();
        let transport = RecordingTransport::default();

        relay.on_event(&transport, ConnectionId::new(), notify("ghost", "anyone?"));
        assert!(transport.take().is_empty());
    }

    #[test]
    fn test_missing_receiver_is_dropped() {
        let relay = relay();
        let transport = RecordingTransport::default();
        relay.on_event(&transport, ConnectionId::new(), InboundEvent::NewUser("u".into()));

        relay.on_event(
            &transport,
            ConnectionId::new(),
            InboundEvent::SendNotification(NotificationRequest {
                receiver_id: None,
                payload: Notification::default(),
            }),
        );
        assert!(transport.take().is_empty());
    }

    #[test]
    fn test_register_and_disconnect_never_send() {
        let relay = relay();
        let transport = RecordingTransport::default();
        let h = ConnectionId::new();

        relay.on_event(&transport, h, InboundEvent::NewUser("buyer7".into()));
        let disposition = relay.on_event(&transport, h, InboundEvent::Disconnect);

        assert_eq!(disposition, Disposition::Close);
        assert!(transport.take().is_empty());
        assert!(relay.registry().lookup("buyer7").is_none());
    }

    #[test]
    fn test_notify_after_disconnect_is_dropped() {
        let relay = relay();
        let transport = RecordingTransport::default();
        let h = ConnectionId::new();

        relay.on_event(&transport, h, InboundEvent::NewUser("buyer7".into()));
        relay.on_disconnect(h);
        relay.on_event(&transport, ConnectionId::new(), notify("buyer7", "late"));

        assert!(transport.take().is_empty());
    }

    #[test]
    fn test_connect_broadcasts_announcement_once() {
        let relay = relay();
        let transport = RecordingTransport::default();

        relay.on_connect(&transport, ConnectionId::new());
        assert_eq!(
            transport.take(),
            vec![(
                None,
                OutboundEvent::Notification(CONNECT_ANNOUNCEMENT.to_string())
            )]
        );
    }

    #[test]
    fn test_notify_does_not_touch_registry() {
        let relay = relay();
        let transport = RecordingTransport::default();
        let h = ConnectionId::new();
        relay.on_event(&transport, h, InboundEvent::NewUser("farmer3".into()));

        relay.on_event(&transport, h, notify("farmer3", "note to self"));
        assert_eq!(relay.registry().len(), 1);
        assert_eq!(relay.registry().lookup("farmer3").unwrap().connection_id, h);
    }
}
