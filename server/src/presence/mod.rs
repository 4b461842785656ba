//! Server-side presence: which identity is reachable on which socket.

pub mod lookup;
pub mod registry;

pub use registry::{PresenceEntry, PresenceRegistry};
