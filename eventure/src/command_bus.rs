//! `CommandBus`: routes a command to whichever handler registered for its
//! type and returns the committed stream directly, unlike the
//! fire-and-forget `MessageBus`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use eventure_core::{Command, Error, EventStream, Id, Message, Result};
use serde_json::Value;
use tokio::sync::RwLock;

/// A single registered route's dispatch target. Implemented by
/// [`crate::AggregateCommandHandler`]; any other component capable of
/// turning a command into a committed stream may implement it too.
#[async_trait]
pub trait CommandDispatch: Send + Sync {
    /// Handles `command`, returning the stream of events it committed.
    async fn dispatch(&self, command: Command) -> Result<EventStream>;
}

/// Routes commands to the handler registered for their type.
pub struct CommandBus {
    routes: RwLock<HashMap<String, Arc<dyn CommandDispatch>>>,
}

impl std::fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBus").finish_non_exhaustive()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    /// Creates a bus with no registered routes.
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `dispatch` as the target for every type in
    /// `command_types`, overwriting any prior route for those types.
    pub async fn register(&self, command_types: &[&str], dispatch: Arc<dyn CommandDispatch>) {
        let mut routes = self.routes.write().await;
        for command_type in command_types {
            routes.insert((*command_type).to_string(), Arc::clone(&dispatch));
        }
    }

    /// Dispatches `command` to the handler registered for
    /// `command.message_type`.
    #[tracing::instrument(skip(self, command), fields(command_type = %command.message_type))]
    pub async fn send_raw(&self, command: Command) -> Result<EventStream> {
        let target = {
            let routes = self.routes.read().await;
            routes.get(&command.message_type).cloned()
        };
        match target {
            Some(handler) => handler.dispatch(command).await,
            None => Err(Error::InvalidArgument(format!(
                "no handler registered for command type {}",
                command.message_type
            ))),
        }
    }

    /// Builds a command from its parts and dispatches it.
    pub async fn send(
        &self,
        command_type: impl Into<String>,
        aggregate_id: Option<Id>,
        payload: Option<Value>,
        context: Option<Value>,
    ) -> Result<EventStream> {
        let mut command = Message::new(command_type.into());
        if let Some(id) = aggregate_id {
            command = command.with_aggregate_id(id);
        }
        if let Some(payload) = payload {
            command = command.with_payload(payload);
        }
        if let Some(context) = context {
            command = command.with_context(context);
        }
        self.send_raw(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl CommandDispatch for Echo {
        async fn dispatch(&self, command: Command) -> Result<EventStream> {
            Ok(vec![command])
        }
    }

    #[tokio::test]
    async fn routes_to_the_registered_handler() {
        let bus = CommandBus::new();
        bus.register(&["doSomething"], Arc::new(Echo)).await;

        let result = bus
            .send("doSomething", Some(Id::from("a1")), None, None)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].aggregate_id, Some(Id::from("a1")));
    }

    #[tokio::test]
    async fn unregistered_command_type_fails() {
        let bus = CommandBus::new();
        let result = bus.send_raw(Command::new("nobodyHandlesThis")).await;
        assert!(result.is_err());
    }
}
