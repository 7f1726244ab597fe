//! Inbound event model.
//!
//! Events arrive from an external dispatcher, carry an optional originator
//! and an opaque payload, and are forwarded to downstream handlers untouched
//! once the gate chain admits them.

use serde::{Deserialize, Serialize};

/// Identifier of an event's originator, used for authorization and
/// rate-limit keying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub u64);

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to the originating conversation, used to address replies and
/// denial notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelRef(pub u64);

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A user-authored message
    Message,
    /// A button activation (callback)
    Interaction,
}

/// An inbound event as delivered by the external dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The originating conversation
    pub channel: ChannelRef,
    /// What kind of event this is
    pub kind: EventKind,
    /// The originator; absent for system-generated events
    #[serde(default)]
    pub principal: Option<Principal>,
    /// Opaque payload, forwarded to the downstream handler unmodified
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Event {
    /// Decode an event from its JSON wire form.
    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// The event's originator, regardless of kind.
    pub fn principal(&self) -> Option<Principal> {
        self.principal
    }

    /// Text content of the payload, if it carries any.
    ///
    /// Accepts either a bare JSON string or an object with a `text` field,
    /// which is how the driver encodes commands and button actions.
    pub fn text(&self) -> Option<&str> {
        self.payload
            .as_str()
            .or_else(|| self.payload.get("text").and_then(serde_json::Value::as_str))
    }
}
