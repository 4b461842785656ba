//! Notification payload shapes.
//!
//! Fields are forwarded as whatever JSON the sender supplied. Only `receiverId` is read by
//! the relay. Absent fields stay absent and explicit nulls are forwarded as null.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Keep a field that is present, even when its value is `null`. Absent fields fall
/// back to `None` through `#[serde(default)]`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Inbound notification: the routing key plus the payload that gets forwarded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotificationRequest<P> {
    #[serde(rename = "receiverId", default)]
    pub receiver_id: Option<String>,
    #[serde(flatten)]
    pub payload: P,
}

/// Plain notification, forwarded as `getNotification`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub buyer_id: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub farmer_id: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub send_to: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub itemname: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub farmername: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

/// Notification with a buyer's price/quantity offer, forwarded as `getNotificationB`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    #[serde(flatten)]
    pub notification: Notification,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub buyerprice: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub quantitybuyerneeds: Option<Value>,
}
