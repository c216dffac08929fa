//! `SagaEventHandler`: replay a saga, apply an incoming event, and
//! dispatch the commands it enqueues.

use std::sync::Arc;

use eventure_core::{Event, Result, Saga, SagaFactory};

use crate::command_bus::CommandBus;
use crate::store::EventStore;

/// Rehydrates (or starts) a saga of type `F` for each incoming event it
/// handles, applies the event, and dispatches the resulting commands
/// through a [`CommandBus`].
pub struct SagaEventHandler<F> {
    factory: F,
    store: Arc<EventStore>,
    command_bus: Arc<CommandBus>,
}

impl<F> std::fmt::Debug for SagaEventHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaEventHandler").finish_non_exhaustive()
    }
}

impl<F: SagaFactory> SagaEventHandler<F> {
    /// Builds a handler for sagas constructed by `factory`, reading from
    /// `store` and dispatching through `command_bus`.
    pub fn new(factory: F, store: Arc<EventStore>, command_bus: Arc<CommandBus>) -> Self {
        Self {
            factory,
            store,
            command_bus,
        }
    }

    /// Handles one incoming event.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.message_type))]
    pub async fn handle(&self, event: Event) -> Result<()> {
        // Step 1: identify (rehydrate or start fresh).
        let mut saga: Box<dyn Saga> = match &event.saga_id {
            Some(saga_id) => {
                let history = self.store.get_saga_events(saga_id, &event).await?;
                self.factory.rehydrate(saga_id.clone(), &history).await
            }
            None => self.factory.create(),
        };
        debug_assert!(
            event.saga_id.is_none() || saga.id().is_some(),
            "rehydrate must assign the saga id before replaying history"
        );

        // Step 2: apply and collect resulting commands.
        saga.apply(&event).await;
        saga.state_mut().advance();
        let commands = saga.reset_uncommitted_messages();

        // Step 3: dispatch, with onError compensation on failure.
        for command in commands {
            if let Err(err) = self.command_bus.send_raw(command.clone()).await {
                saga.on_error(&err, &event, &command).await;
                // Step 4 (compensating path): dispatch identically.
                for compensation in saga.reset_uncommitted_messages() {
                    if let Err(compensation_err) = self.command_bus.send_raw(compensation).await {
                        tracing::error!(error = %compensation_err, "compensating command dispatch failed");
                    }
                }
            }
        }

        Ok(())
    }

    /// Subscribes this handler on `self.store` for every event type the
    /// saga declares as handled.
    pub async fn subscribe(self: &Arc<Self>)
    where
        F: 'static,
    {
        for &event_type in self.factory.handled_events() {
            let this = Arc::clone(self);
            self.store
                .on(
                    event_type,
                    Arc::new(move |event: Event| {
                        let this = Arc::clone(&this);
                        Box::pin(async move {
                            if let Err(err) = this.handle(event).await {
                                tracing::error!(error = %err, "saga event handling failed");
                            }
                        })
                    }),
                )
                .await;
        }
    }
}
