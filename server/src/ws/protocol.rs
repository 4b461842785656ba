//! JSON event framing for the relay socket.
//!
//! Every frame is `{"event": "<name>", "data": <payload>}`. Event names are part of the
//! client contract and must not change.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::relay::notification::{NotificationRequest, Offer, Notification};

/// Announcement broadcast to every socket whenever a new connection is accepted.
pub const CONNECT_ANNOUNCEMENT: &str = "Hello guys, notification event emmited!";

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    /// Bind a user identity to the sending connection.
    #[serde(rename = "newUser")]
    NewUser(String),
    #[serde(rename = "sendNotification")]
    SendNotification(NotificationRequest<Notification>),
    /// Notification carrying a buyer's price/quantity offer.
    #[serde(rename = "sendNotificationB")]
    SendNotificationB(NotificationRequest<Offer>),
    #[serde(rename = "disconnect")]
    Disconnect,
}

impl InboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewUser(_) => "newUser",
            Self::SendNotification(_) => "sendNotification",
            Self::SendNotificationB(_) => "sendNotificationB",
            Self::Disconnect => "disconnect",
        }
    }
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "notification")]
    Notification(String),
    #[serde(rename = "getNotification")]
    GetNotification(Notification),
    #[serde(rename = "getNotificationB")]
    GetNotificationB(Offer),
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Notification(_) => "notification",
            Self::GetNotification(_) => "getNotification",
            Self::GetNotificationB(_) => "getNotificationB",
        }
    }

    /// Encode as a text frame. Returns `None` if serialization fails.
    pub fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(text) => Some(Message::Text(text.into())),
            Err(e) => {
                tracing::warn!(event = self.name(), error = %e, "Failed to encode outbound event");
                None
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode a text frame into an inbound event.
pub fn decode_text(text: &str) -> Result<InboundEvent, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Binary frames are accepted when they carry the same JSON as a text frame.
pub fn decode_binary(data: &[u8]) -> Result<InboundEvent, ProtocolError> {
    let text = std::str::from_utf8(data)?;
    decode_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_new_user() {
        let event = decode_text(r#"{"event":"newUser","data":"buyer7"}"#).unwrap();
        assert_eq!(event, InboundEvent::NewUser("buyer7".to_string()));
    }

    #[test]
    fn test_decode_disconnect_without_data() {
        let event = decode_text(r#"{"event":"disconnect"}"#).unwrap();
        assert_eq!(event, InboundEvent::Disconnect);
    }

    #[test]
    fn test_decode_offer_keeps_numeric_fields() {
        let frame = json!({
            "event": "sendNotificationB",
            "data": {
                "senderId": "buyer7",
                "receiverId": "farmer3",
                "itemname": "maize",
                "buyerprice": 120.5,
                "quantitybuyerneeds": 40
            }
        });
        let event = decode_text(&frame.to_string()).unwrap();
        match event {
            InboundEvent::SendNotificationB(req) => {
                assert_eq!(req.receiver_id.as_deref(), Some("farmer3"));
                assert_eq!(req.payload.buyerprice, Some(json!(120.5)));
                assert_eq!(req.payload.quantitybuyerneeds, Some(json!(40)));
                assert_eq!(req.payload.notification.itemname, Some(json!("maize")));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_malformed() {
        let err = decode_text(r#"{"event":"dropTables","data":1}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_non_string_user_id_is_malformed() {
        assert!(decode_text(r#"{"event":"newUser","data":42}"#).is_err());
    }

    #[test]
    fn test_binary_frame_must_be_utf8() {
        let err = decode_binary(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidUtf8(_)));
    }

    #[test]
    fn test_outbound_notification_shape() {
        let msg = OutboundEvent::Notification(CONNECT_ANNOUNCEMENT.to_string());
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"event": "notification", "data": "Hello guys, notification event emmited!"})
        );
    }
}
