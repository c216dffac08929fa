//! The shared `Command`/`Event` message shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::Id;

/// The reserved event type for snapshot events.
pub const SNAPSHOT_TYPE: &str = "snapshot";

/// A command or event. The two share this exact shape; which role a given
/// `Message` plays is determined entirely by where it flows, never by its
/// type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// The message's type name. Never empty for a message that has passed
    /// validation.
    #[serde(rename = "type")]
    pub message_type: String,
    /// The aggregate this message is addressed to or was emitted by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_id: Option<Id>,
    /// The aggregate version this event represents (events only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_version: Option<u64>,
    /// The saga this message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saga_id: Option<Id>,
    /// The saga-relative sequence number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saga_version: Option<u64>,
    /// Opaque payload, meaningful only to the aggregate/saga that produced
    /// or consumes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Opaque context (e.g. causation/correlation metadata, request
    /// context), carried but never interpreted by the core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Commands and events are structurally identical; the aliases exist purely
/// to document intent at call sites.
pub type Command = Message;
/// See [`Command`].
pub type Event = Message;

/// A finite, ordered sequence of committed events for one aggregate or saga.
/// Ordering is the commit order — the sole guarantee this type carries.
pub type EventStream = Vec<Event>;

impl Message {
    /// Starts building a message of the given type.
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            aggregate_id: None,
            aggregate_version: None,
            saga_id: None,
            saga_version: None,
            payload: None,
            context: None,
        }
    }

    /// Sets the aggregate id.
    #[must_use]
    pub fn with_aggregate_id(mut self, id: impl Into<Id>) -> Self {
        self.aggregate_id = Some(id.into());
        self
    }

    /// Sets the aggregate version.
    #[must_use]
    pub fn with_aggregate_version(mut self, version: u64) -> Self {
        self.aggregate_version = Some(version);
        self
    }

    /// Sets the saga id.
    #[must_use]
    pub fn with_saga_id(mut self, id: impl Into<Id>) -> Self {
        self.saga_id = Some(id.into());
        self
    }

    /// Sets the saga version.
    #[must_use]
    pub fn with_saga_version(mut self, version: u64) -> Self {
        self.saga_version = Some(version);
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Sets the context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns `true` if this message is the reserved snapshot event.
    pub fn is_snapshot(&self) -> bool {
        self.message_type == SNAPSHOT_TYPE
    }
}
