//! The saga contract.

use async_trait::async_trait;

use crate::error::Error;
use crate::id::Id;
use crate::message::{Command, Event};

/// Version/uncommitted-messages bookkeeping shared by every concrete saga,
/// mirroring [`crate::aggregate::AggregateState`].
#[derive(Debug, Default)]
pub struct SagaState {
    id: Option<Id>,
    version: u64,
    uncommitted: Vec<Command>,
}

impl SagaState {
    /// Bookkeeping for a brand-new, not-yet-started saga.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookkeeping for a saga rehydrated from `id` at `version`.
    pub fn rehydrated(id: Id, version: u64) -> Self {
        Self {
            id: Some(id),
            version,
            uncommitted: Vec::new(),
        }
    }

    /// The saga's id, once assigned.
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// Assigns the saga's id (done once, on the triggering starter event).
    pub fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    /// The saga's current version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Advances the saga's version by one, as each applied event does.
    pub fn advance(&mut self) {
        self.version += 1;
    }

    /// Commands queued by the last `apply`/`on_error` call.
    pub fn uncommitted_messages(&self) -> &[Command] {
        &self.uncommitted
    }

    /// Queues a command to be dispatched once `apply` returns.
    pub fn enqueue(&mut self, command: Command) {
        self.uncommitted.push(command);
    }

    /// Drains and returns the queued commands.
    pub fn reset_uncommitted_messages(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.uncommitted)
    }
}

/// A long-running process coordinating commands across aggregates, driven
/// by events.
#[async_trait]
pub trait Saga: Send + Sync {
    /// Read access to this saga's bookkeeping.
    fn state(&self) -> &SagaState;
    /// Mutable access to this saga's bookkeeping.
    fn state_mut(&mut self) -> &mut SagaState;

    /// The saga's id, once a starter event has assigned one.
    fn id(&self) -> Option<&Id> {
        self.state().id()
    }

    /// The saga's current version.
    fn version(&self) -> u64 {
        self.state().version()
    }

    /// Commands queued by the last `apply`/`on_error` call.
    fn uncommitted_messages(&self) -> &[Command] {
        self.state().uncommitted_messages()
    }

    /// Drains and returns the queued commands, called once they have all
    /// been dispatched.
    fn reset_uncommitted_messages(&mut self) -> Vec<Command> {
        self.state_mut().reset_uncommitted_messages()
    }

    /// Applies an incoming event, possibly enqueueing commands via
    /// [`SagaState::enqueue`].
    async fn apply(&mut self, event: &Event);

    /// Called when dispatching one of `apply`'s resulting commands fails;
    /// may enqueue compensating commands, dispatched identically. Defaults to no compensation.
    async fn on_error(&mut self, _err: &Error, _event: &Event, _command: &Command) {}
}

/// Constructs sagas for a fixed, explicit set of handled event types.
#[async_trait]
pub trait SagaFactory: Send + Sync {
    /// The event types that (re)hydrate or advance this saga.
    fn handled_events(&self) -> &'static [&'static str];

    /// Constructs a fresh, not-yet-started saga (the triggering event is a
    /// saga starter).
    fn create(&self) -> Box<dyn Saga>;

    /// Constructs a saga rehydrated from its prior event history.
    async fn rehydrate(&self, id: Id, events: &[Event]) -> Box<dyn Saga> {
        let mut saga = self.create();
        saga.state_mut().set_id(id);
        for event in events {
            saga.state_mut().advance();
            // Rehydration applies history without dispatching: any commands
            // queued while replaying are discarded, as they were already
            // dispatched the first time this event was delivered live.
            saga.apply(event).await;
            saga.state_mut().reset_uncommitted_messages();
        }
        saga
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct ShippingSaga {
        state: SagaState,
        orders_seen: u32,
    }

    #[async_trait]
    impl Saga for ShippingSaga {
        fn state(&self) -> &SagaState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut SagaState {
            &mut self.state
        }

        async fn apply(&mut self, event: &Event) {
            if event.message_type == "orderPlaced" {
                self.orders_seen += 1;
                self.state_mut()
                    .enqueue(Command::new("reserveInventory").with_aggregate_id("inv-1"));
            }
        }
    }

    #[tokio::test]
    async fn apply_enqueues_commands_and_reset_drains_them() {
        let mut saga = ShippingSaga::default();
        saga.apply(&Event::new("orderPlaced").with_aggregate_id("o1"))
            .await;
        assert_eq!(saga.uncommitted_messages().len(), 1);
        let drained = saga.reset_uncommitted_messages();
        assert_eq!(drained.len(), 1);
        assert!(saga.uncommitted_messages().is_empty());
    }
}
