//! The `MessageBus` capability.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::message::Event;

/// An asynchronous callback invoked with every delivered event.
pub type Handler = Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>;

/// Opaque token identifying a single `on`/`off` registration.
pub type HandlerId = u64;

/// Topic-indexed publish/subscribe transport. The in-memory default lives in
/// `eventure-memory`; callers may bring any other implementation.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Registers `handler` for every delivery of `message_type`. Returns an
    /// id usable with [`MessageBus::off`].
    async fn on(&self, message_type: &str, handler: Handler) -> HandlerId;

    /// Unregisters a prior `on` registration for `message_type`.
    async fn off(&self, message_type: &str, handler_id: HandlerId);

    /// Delivers `event` to every handler registered for `event.message_type`
    /// (and to one handler of each named queue registered for it). A
    /// handler never observes an event before this call is made for it.
    async fn publish(&self, event: Event) -> Result<()>;

    /// Returns a named single-consumer queue, if this bus supports them.
    /// The default implementation fails with
    /// [`Error::UnsupportedCapability`].
    fn queue(&self, _name: &str) -> Result<Arc<dyn Queue>> {
        Err(Error::UnsupportedCapability("queue"))
    }
}

/// A named single-consumer queue: each event of a registered type is
/// delivered to exactly one handler attached to the queue, even if several
/// handlers are attached.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Attaches `handler` as one of the queue's consumers for
    /// `message_type`.
    async fn on(&self, message_type: &str, handler: Handler) -> HandlerId;

    /// Detaches a prior consumer registration.
    async fn off(&self, message_type: &str, handler_id: HandlerId);
}
