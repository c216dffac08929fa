//! # eventure-example-domain
//!
//! A minimal to-do list aggregate exercising the full
//! `eventure_core::Aggregate`/`AggregateFactory` contract: creation,
//! description/reminder updates, and completion toggling, each command
//! validated against [`domain::Description`]/[`domain::Reminder`] before
//! any event is emitted.

#![warn(missing_docs, unused_import_braces, unused_imports)]
#![deny(missing_debug_implementations, unsafe_code)]

pub mod domain;
pub mod error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventure_core::{Aggregate, AggregateFactory, AggregateState, Command, Event, Id, Result};
use serde_json::Value;

use crate::domain::{Description, Reminder};
use crate::error::CommandError;

/// Reserved event type: a to-do item was created.
pub const CREATED: &str = "todoCreated";
/// Reserved event type: the description was updated.
pub const DESCRIPTION_UPDATED: &str = "todoDescriptionUpdated";
/// Reserved event type: the reminder was updated (payload `reminder` may
/// be `null`, meaning cancelled).
pub const REMINDER_UPDATED: &str = "todoReminderUpdated";
/// Reserved event type: the item was marked completed.
pub const COMPLETED: &str = "todoCompleted";
/// Reserved event type: the item's completion was undone.
pub const UNCOMPLETED: &str = "todoUncompleted";

fn invalid(err: impl std::fmt::Display) -> eventure_core::Error {
    eventure_core::Error::InvalidArgument(err.to_string())
}

fn parse_description(payload: &Option<Value>) -> Result<Description> {
    let text = payload
        .as_ref()
        .and_then(|v| v.get("description"))
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("command payload missing \"description\""))?;
    Description::new(text).map_err(invalid)
}

fn parse_reminder(payload: &Option<Value>, now: DateTime<Utc>) -> Result<Reminder> {
    let text = payload
        .as_ref()
        .and_then(|v| v.get("reminder"))
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("command payload missing \"reminder\""))?;
    let time = DateTime::parse_from_rfc3339(text)
        .map_err(invalid)?
        .with_timezone(&Utc);
    Reminder::new(time, now).map_err(invalid)
}

/// Snapshot/live state of a to-do item once created. `None` on a
/// not-yet-created aggregate.
#[derive(Debug, Clone)]
struct ToDoData {
    description: Description,
    reminder: Option<Reminder>,
    completed: bool,
}

/// A to-do list item, event-sourced from `todoCreated`/
/// `todoDescriptionUpdated`/`todoReminderUpdated`/`todoCompleted`/
/// `todoUncompleted`.
#[derive(Debug)]
pub struct ToDoAggregate {
    state: AggregateState,
    data: Option<ToDoData>,
}

#[async_trait]
impl Aggregate for ToDoAggregate {
    fn state(&self) -> &AggregateState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AggregateState {
        &mut self.state
    }

    async fn handle(&mut self, cmd: Command) -> Result<()> {
        match cmd.message_type.as_str() {
            "createToDo" => {
                if self.data.is_some() {
                    return Err(invalid(CommandError::AlreadyCreated));
                }
                let description = parse_description(&cmd.payload)?;
                self.emit(CREATED, Some(serde_json::json!({"description": description.as_str()})));

                if let Some(payload) = &cmd.payload {
                    if payload.get("reminder").is_some() {
                        let reminder = parse_reminder(&cmd.payload, Utc::now())?;
                        self.emit(
                            REMINDER_UPDATED,
                            Some(serde_json::json!({"reminder": reminder.get_time().to_rfc3339()})),
                        );
                    }
                }
                Ok(())
            }
            "updateDescription" => {
                let data = self.data.as_ref().ok_or_else(|| invalid(CommandError::NotInitialized))?;
                let description = parse_description(&cmd.payload)?;
                if description != data.description {
                    self.emit(
                        DESCRIPTION_UPDATED,
                        Some(serde_json::json!({"description": description.as_str()})),
                    );
                }
                Ok(())
            }
            "setReminder" => {
                let data = self.data.as_ref().ok_or_else(|| invalid(CommandError::NotInitialized))?;
                let reminder = parse_reminder(&cmd.payload, Utc::now())?;
                if data.reminder != Some(reminder) {
                    self.emit(
                        REMINDER_UPDATED,
                        Some(serde_json::json!({"reminder": reminder.get_time().to_rfc3339()})),
                    );
                }
                Ok(())
            }
            "cancelReminder" => {
                let data = self.data.as_ref().ok_or_else(|| invalid(CommandError::NotInitialized))?;
                if data.reminder.is_some() {
                    self.emit(REMINDER_UPDATED, Some(serde_json::json!({"reminder": Value::Null})));
                }
                Ok(())
            }
            "toggleCompletion" => {
                let data = self.data.as_ref().ok_or_else(|| invalid(CommandError::NotInitialized))?;
                if data.completed {
                    self.emit(UNCOMPLETED, None);
                } else {
                    self.emit(COMPLETED, None);
                }
                Ok(())
            }
            "markCompleted" => {
                let data = self.data.as_ref().ok_or_else(|| invalid(CommandError::NotInitialized))?;
                if !data.completed {
                    self.emit(COMPLETED, None);
                }
                Ok(())
            }
            "resetCompleted" => {
                let data = self.data.as_ref().ok_or_else(|| invalid(CommandError::NotInitialized))?;
                if data.completed {
                    self.emit(UNCOMPLETED, None);
                }
                Ok(())
            }
            other => Err(invalid(format!("unrecognized command type {other}"))),
        }
    }

    fn mutate(&mut self, event: &Event) {
        match event.message_type.as_str() {
            t if t == CREATED => {
                let description = event
                    .payload
                    .as_ref()
                    .and_then(|v| v.get("description"))
                    .and_then(Value::as_str)
                    .and_then(|s| Description::new(s).ok())
                    .unwrap_or_else(|| Description::new("untitled").expect("non-empty literal"));
                self.data = Some(ToDoData {
                    description,
                    reminder: None,
                    completed: false,
                });
            }
            t if t == DESCRIPTION_UPDATED => {
                if let Some(data) = self.data.as_mut() {
                    if let Some(text) = event.payload.as_ref().and_then(|v| v.get("description")).and_then(Value::as_str) {
                        if let Ok(description) = Description::new(text) {
                            data.description = description;
                        }
                    }
                }
            }
            t if t == REMINDER_UPDATED => {
                if let Some(data) = self.data.as_mut() {
                    data.reminder = event
                        .payload
                        .as_ref()
                        .and_then(|v| v.get("reminder"))
                        .and_then(Value::as_str)
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                        .map(|dt| dt.with_timezone(&Utc))
                        .map(|time| Reminder::new(time, time - chrono::Duration::seconds(1)).expect("time > time - 1s"));
                }
            }
            t if t == COMPLETED => {
                if let Some(data) = self.data.as_mut() {
                    data.completed = true;
                }
            }
            t if t == UNCOMPLETED => {
                if let Some(data) = self.data.as_mut() {
                    data.completed = false;
                }
            }
            _ => {}
        }
    }
}

/// Constructs [`ToDoAggregate`] instances.
#[derive(Debug, Default)]
pub struct ToDoAggregateFactory;

impl AggregateFactory for ToDoAggregateFactory {
    fn handled_commands(&self) -> &'static [&'static str] {
        &[
            "createToDo",
            "updateDescription",
            "setReminder",
            "cancelReminder",
            "toggleCompletion",
            "markCompleted",
            "resetCompleted",
        ]
    }

    fn create(&self, id: Id) -> Box<dyn Aggregate> {
        Box::new(ToDoAggregate {
            state: AggregateState::new(id),
            data: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventure_core::apply_history;

    fn new_aggregate() -> ToDoAggregate {
        ToDoAggregate {
            state: AggregateState::new(Id::from("t1")),
            data: None,
        }
    }

    #[tokio::test]
    async fn create_then_update_description_and_complete() {
        let mut aggregate = new_aggregate();
        aggregate
            .handle(Command::new("createToDo").with_payload(serde_json::json!({"description": "buy milk"})))
            .await
            .unwrap();
        assert_eq!(aggregate.version(), 1);

        aggregate
            .handle(Command::new("updateDescription").with_payload(serde_json::json!({"description": "buy oat milk"})))
            .await
            .unwrap();
        assert_eq!(aggregate.version(), 2);

        aggregate.handle(Command::new("markCompleted")).await.unwrap();
        assert_eq!(aggregate.version(), 3);
        assert!(aggregate.data.as_ref().unwrap().completed);
    }

    #[tokio::test]
    async fn commands_against_an_uncreated_aggregate_fail() {
        let mut aggregate = new_aggregate();
        let result = aggregate.handle(Command::new("markCompleted")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn creating_twice_fails() {
        let mut aggregate = new_aggregate();
        aggregate
            .handle(Command::new("createToDo").with_payload(serde_json::json!({"description": "buy milk"})))
            .await
            .unwrap();
        let result = aggregate
            .handle(Command::new("createToDo").with_payload(serde_json::json!({"description": "buy eggs"})))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn no_op_commands_emit_nothing() {
        let mut aggregate = new_aggregate();
        aggregate
            .handle(Command::new("createToDo").with_payload(serde_json::json!({"description": "buy milk"})))
            .await
            .unwrap();
        aggregate
            .handle(Command::new("updateDescription").with_payload(serde_json::json!({"description": "buy milk"})))
            .await
            .unwrap();
        assert_eq!(aggregate.version(), 1, "identical description should not emit an event");
    }

    #[tokio::test]
    async fn replaying_history_reproduces_live_state() {
        let mut live = new_aggregate();
        live.handle(Command::new("createToDo").with_payload(serde_json::json!({"description": "buy milk"})))
            .await
            .unwrap();
        live.handle(Command::new("markCompleted")).await.unwrap();
        let events = live.take_changes();

        let mut replayed = new_aggregate();
        apply_history(&mut replayed, &events);

        assert_eq!(replayed.version(), live.version());
        assert!(replayed.data.as_ref().unwrap().completed);
        assert_eq!(
            replayed.data.as_ref().unwrap().description.as_str(),
            live.data.as_ref().unwrap().description.as_str()
        );
    }
}
