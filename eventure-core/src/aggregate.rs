//! The aggregate contract and its command-handling collaborator.
//!
//! Concrete aggregates embed an [`AggregateState`] for version/changes
//! bookkeeping rather than re-implementing it themselves.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::id::Id;
use crate::message::{Command, Event, EventStream};

/// Version/changes bookkeeping shared by every concrete aggregate.
/// Concrete aggregates embed one of these and delegate
/// [`Aggregate::state`]/[`Aggregate::state_mut`] to it.
#[derive(Debug, Default)]
pub struct AggregateState {
    id: Option<Id>,
    version: u64,
    changes: EventStream,
}

impl AggregateState {
    /// Creates fresh bookkeeping for a newly-constructed aggregate at
    /// version 0.
    pub fn new(id: Id) -> Self {
        Self {
            id: Some(id),
            version: 0,
            changes: Vec::new(),
        }
    }

    /// The aggregate's id.
    ///
    /// # Panics
    /// Panics if called before [`AggregateState::new`] has been invoked
    /// (i.e. on a `Default`-constructed, not-yet-identified state) — every
    /// `AggregateFactory::create`/`hydrate` call is required to assign one.
    pub fn id(&self) -> &Id {
        self.id
            .as_ref()
            .expect("AggregateState used before an id was assigned")
    }

    /// The aggregate's current version (0 = never mutated).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Events emitted but not yet committed.
    pub fn changes(&self) -> &[Event] {
        &self.changes
    }

    /// Drains and returns the buffered changes.
    pub fn take_changes(&mut self) -> EventStream {
        std::mem::take(&mut self.changes)
    }

    /// Overwrites the tracked version directly. Used while replaying
    /// history, where the version must track the replayed event's
    /// `aggregate_version` rather than being incremented one at a time.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Builds, buffers, and returns a new event one version past the
    /// current one.
    pub fn record(&mut self, message_type: &str, payload: Option<Value>) -> Event {
        self.version += 1;
        let mut event = Event::new(message_type)
            .with_aggregate_id(self.id().clone())
            .with_aggregate_version(self.version);
        event.payload = payload;
        self.changes.push(event.clone());
        event
    }
}

/// A domain entity whose state is the fold of its event history.
///
/// Boxed as `Box<dyn Aggregate>` throughout the runtime; every method here
/// is therefore free of generics to stay object-safe.
#[async_trait]
pub trait Aggregate: Send + Sync {
    /// Read access to this aggregate's version/changes bookkeeping.
    fn state(&self) -> &AggregateState;
    /// Mutable access to this aggregate's version/changes bookkeeping.
    fn state_mut(&mut self) -> &mut AggregateState;

    /// The aggregate's id.
    fn id(&self) -> &Id {
        self.state().id()
    }

    /// The aggregate's current version.
    fn version(&self) -> u64 {
        self.state().version()
    }

    /// Events emitted but not yet committed.
    fn changes(&self) -> &[Event] {
        self.state().changes()
    }

    /// Drains and returns the buffered changes.
    fn take_changes(&mut self) -> EventStream {
        self.state_mut().take_changes()
    }

    /// Processes `cmd`, typically calling [`Aggregate::emit`] zero or more
    /// times.
    async fn handle(&mut self, cmd: Command) -> Result<()>;

    /// Applies a previously-committed (or newly-emitted) event to domain
    /// state. Must not mutate `state()`'s version/changes bookkeeping
    /// itself — that is handled by [`Aggregate::emit`]/[`apply_history`].
    fn mutate(&mut self, event: &Event);

    /// Appends `{type, aggregateId, aggregateVersion: version+1, payload}`
    /// to the change buffer and immediately applies it via
    /// [`Aggregate::mutate`], advancing `version`.
    fn emit(&mut self, message_type: &str, payload: Option<Value>) -> Event {
        let event = self.state_mut().record(message_type, payload);
        self.mutate(&event);
        event
    }

    /// Whether the handler should append a snapshot after this command's
    /// events commit. Defaults to never.
    fn should_take_snapshot(&self) -> bool {
        false
    }

    /// Produces a restorable state image for a snapshot event. Required
    /// whenever [`Aggregate::should_take_snapshot`] can return `true`.
    fn make_snapshot(&self) -> Option<Value> {
        None
    }

    /// Restores state from a snapshot event encountered while replaying
    /// history. Defaults to a no-op for aggregates that never snapshot.
    fn restore_snapshot(&mut self, _event: &Event) {}
}

/// Replays `events` onto a freshly-constructed aggregate: snapshot events
/// go through [`Aggregate::restore_snapshot`], everything else through
/// [`Aggregate::mutate`], and the aggregate's version tracks the last
/// applied event's `aggregate_version`.
pub fn apply_history(aggregate: &mut dyn Aggregate, events: &EventStream) {
    for event in events {
        if event.is_snapshot() {
            aggregate.restore_snapshot(event);
        } else {
            aggregate.mutate(event);
        }
        if let Some(version) = event.aggregate_version {
            aggregate.state_mut().set_version(version);
        }
    }
}

/// Constructs aggregates for a fixed, explicit set of handled command types.
pub trait AggregateFactory: Send + Sync {
    /// The command types this aggregate type handles.
    fn handled_commands(&self) -> &'static [&'static str];

    /// Constructs a brand-new aggregate with the given id and no history.
    fn create(&self, id: Id) -> Box<dyn Aggregate>;

    /// Constructs an aggregate from its id, an optional snapshot, and the
    /// events following it.
    fn hydrate(&self, id: Id, snapshot: Option<Event>, events: EventStream) -> Box<dyn Aggregate> {
        let mut aggregate = self.create(id);
        if let Some(snapshot) = snapshot {
            apply_history(aggregate.as_mut(), &[snapshot]);
        }
        apply_history(aggregate.as_mut(), &events);
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Default)]
    struct Counter {
        state: AggregateState,
        total: i64,
    }

    #[async_trait]
    impl Aggregate for Counter {
        fn state(&self) -> &AggregateState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut AggregateState {
            &mut self.state
        }

        async fn handle(&mut self, cmd: Command) -> Result<()> {
            let amount = cmd.payload.and_then(|v| v.as_i64()).unwrap_or(1);
            self.emit("incremented", Some(serde_json::json!(amount)));
            Ok(())
        }

        fn mutate(&mut self, event: &Event) {
            match event.message_type.as_str() {
                "incremented" => {
                    self.total += event.payload.as_ref().and_then(|v| v.as_i64()).unwrap_or(0)
                }
                _ => {}
            }
        }

        fn make_snapshot(&self) -> Option<Value> {
            Some(serde_json::json!({"total": self.total}))
        }

        fn restore_snapshot(&mut self, event: &Event) {
            if let Some(total) = event.payload.as_ref().and_then(|v| v["total"].as_i64()) {
                self.total = total;
            }
        }
    }

    struct CounterFactory;

    impl AggregateFactory for CounterFactory {
        fn handled_commands(&self) -> &'static [&'static str] {
            &["increment"]
        }

        fn create(&self, id: Id) -> Box<dyn Aggregate> {
            Box::new(Counter {
                state: AggregateState::new(id),
                total: 0,
            })
        }
    }

    #[tokio::test]
    async fn emit_advances_version_and_applies_mutate() {
        let factory = CounterFactory;
        let mut aggregate = factory.create(Id::from("c1"));
        aggregate
            .handle(Command::new("increment").with_payload(serde_json::json!(5)))
            .await
            .unwrap();
        assert_eq!(aggregate.version(), 1);
        assert_eq!(aggregate.changes().len(), 1);
    }

    #[tokio::test]
    async fn replaying_history_reproduces_live_state() {
        let mut live = Counter {
            state: AggregateState::new(Id::from("c1")),
            total: 0,
        };
        live.handle(Command::new("increment").with_payload(serde_json::json!(3)))
            .await
            .unwrap();
        live.handle(Command::new("increment").with_payload(serde_json::json!(4)))
            .await
            .unwrap();
        let events = live.take_changes();

        let mut replayed = Counter {
            state: AggregateState::new(Id::from("c1")),
            total: 0,
        };
        apply_history(&mut replayed, &events);
        assert_eq!(replayed.version(), 2);
        assert_eq!(replayed.total, live.total);
        assert_eq!(replayed.total, 7);
    }

    #[tokio::test]
    async fn snapshot_round_trip_matches_full_replay() {
        let factory = CounterFactory;
        let mut live = factory.create(Id::from("c1"));
        live.handle(Command::new("increment").with_payload(serde_json::json!(3)))
            .await
            .unwrap();
        live.handle(Command::new("increment").with_payload(serde_json::json!(4)))
            .await
            .unwrap();
        let snapshot_payload = live.make_snapshot().unwrap();
        let snapshot = Event::new(crate::message::SNAPSHOT_TYPE)
            .with_aggregate_id("c1")
            .with_aggregate_version(2)
            .with_payload(snapshot_payload);

        let from_snapshot = factory.hydrate(Id::from("c1"), Some(snapshot), EventStream::new());
        assert_eq!(from_snapshot.version(), 2);
    }
}
