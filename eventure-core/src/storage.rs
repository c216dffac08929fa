//! External storage interfaces. Concrete backends are supplied
//! by the caller; this crate only specifies the contract.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::id::Id;
use crate::message::{Event, EventStream};

/// A lazily-produced sequence of possibly-failing event reads, used by
/// [`EventStorage::get_events`]: finite, forward-only, single-pass.
pub type EventResultStream = BoxStream<'static, Result<Event>>;

/// Durable append-only event log, indexed by aggregate, by saga, and by
/// type. Any backend exposing these four operations can back an
/// `EventStore`.
#[async_trait]
pub trait EventStorage: Send + Sync {
    /// Mints a fresh, globally unique [`Id`].
    async fn get_new_id(&self) -> Result<Id>;

    /// Atomically persists every event in `events`. The whole batch
    /// succeeds or fails together.
    async fn commit_events(&self, events: &[Event]) -> Result<()>;

    /// Reads events for `aggregate_id`. When `snapshot` is given, only
    /// events strictly after `snapshot.aggregate_version` are returned —
    /// the caller is responsible for prepending the snapshot event itself.
    async fn get_aggregate_events(
        &self,
        aggregate_id: &Id,
        snapshot: Option<&Event>,
    ) -> Result<EventStream>;

    /// Reads events committed for `saga_id` strictly before
    /// `before_event.saga_version`. Panics are not used for a missing
    /// `saga_version`; callers must validate via
    /// `crate::validation::validate_before_event` first.
    async fn get_saga_events(&self, saga_id: &Id, before_event: &Event) -> Result<EventStream>;

    /// Reads events across every aggregate, optionally filtered to
    /// `event_types`, as a lazy forward-only stream.
    async fn get_events(&self, event_types: Option<&[String]>) -> Result<EventResultStream>;
}

/// Optional latest-snapshot key/value store for aggregates.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Returns the latest snapshot event for `aggregate_id`, if any.
    async fn get_aggregate_snapshot(&self, aggregate_id: &Id) -> Result<Option<Event>>;

    /// Persists `event` as the new latest snapshot for its
    /// `aggregate_id`, replacing any prior snapshot. Fails if the event
    /// carries no `aggregate_id`.
    async fn save_aggregate_snapshot(&self, event: Event) -> Result<()>;
}
