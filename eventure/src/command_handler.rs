//! `AggregateCommandHandler`: command routing, aggregate
//! rehydrate/create, dispatch, and commit.

use std::sync::Arc;

use async_trait::async_trait;
use eventure_core::{AggregateFactory, Command, Error, Event, EventStream, Result, SNAPSHOT_TYPE};

use crate::command_bus::{CommandBus, CommandDispatch};
use crate::store::EventStore;

/// Loads or creates an aggregate of type `F`, dispatches a command to it,
/// and commits the resulting changes.
pub struct AggregateCommandHandler<F> {
    factory: F,
    store: Arc<EventStore>,
}

impl<F> std::fmt::Debug for AggregateCommandHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateCommandHandler").finish_non_exhaustive()
    }
}

impl<F: AggregateFactory> AggregateCommandHandler<F> {
    /// Builds a handler for aggregates constructed by `factory`, backed by
    /// `store`.
    pub fn new(factory: F, store: Arc<EventStore>) -> Self {
        Self { factory, store }
    }

    /// Loads or creates the target aggregate, dispatches `cmd` to it, and
    /// commits whatever events result.
    #[tracing::instrument(skip(self, cmd), fields(command_type = %cmd.message_type))]
    pub async fn execute(&self, cmd: Command) -> Result<EventStream> {
        // Step 1: validate.
        if cmd.message_type.is_empty() {
            return Err(Error::InvalidArgument("command type must not be empty".into()));
        }

        // Step 2: load-or-create the aggregate.
        let mut aggregate = match &cmd.aggregate_id {
            Some(id) => {
                let (snapshot, events) = self.store.get_aggregate_events(id).await?;
                self.factory.hydrate(id.clone(), snapshot, events)
            }
            None => {
                let id = self.store.get_new_id().await?;
                self.factory.create(id)
            }
        };

        // Step 3: dispatch.
        aggregate.handle(cmd).await?;

        // Step 4: no changes, no commit.
        let mut changes = aggregate.take_changes();
        if changes.is_empty() {
            return Ok(EventStream::new());
        }

        // Step 5: optional snapshot, appended last so its aggregateVersion
        // reflects the post-commit version.
        if aggregate.should_take_snapshot() && self.store.snapshot_storage().is_some() {
            let payload = aggregate.make_snapshot().ok_or(Error::SnapshotContractViolation)?;
            let snapshot_event = Event::new(SNAPSHOT_TYPE)
                .with_aggregate_id(aggregate.id().clone())
                .with_aggregate_version(aggregate.version())
                .with_payload(payload);
            changes.push(snapshot_event);
        }

        // Step 6: commit and return the committed non-snapshot stream.
        self.store.commit(changes).await
    }
}

#[async_trait]
impl<F: AggregateFactory> CommandDispatch for AggregateCommandHandler<F> {
    async fn dispatch(&self, command: Command) -> Result<EventStream> {
        self.execute(command).await
    }
}

impl<F: AggregateFactory + 'static> AggregateCommandHandler<F> {
    /// Registers this handler on `command_bus` for each of its aggregate
    /// type's handled command types.
    pub async fn subscribe(self: &Arc<Self>, command_bus: &CommandBus) {
        command_bus
            .register(self.factory.handled_commands(), Arc::clone(self) as Arc<dyn CommandDispatch>)
            .await;
    }
}
