//! # eventure-core
//!
//! Core types and traits for the `eventure` event-sourcing/CQRS runtime:
//! the `Message`/`Command`/`Event` shape, the opaque `Id`, the
//! `EventStorage`/`SnapshotStorage`/`MessageBus` external interfaces, and
//! the `Aggregate`/`Saga`/`ProjectionView` collaborator contracts. The
//! coordinating components themselves (`EventStore`,
//! `AggregateCommandHandler`, `SagaEventHandler`, the projection runtime)
//! live in the `eventure` crate; reference in-memory implementations of the
//! storage/bus traits live in `eventure-memory`.

#![warn(missing_docs, unused_import_braces, unused_imports)]
#![deny(missing_debug_implementations, unsafe_code)]

mod aggregate;
mod bus;
mod error;
mod id;
mod message;
mod saga;
mod storage;
mod validation;
mod view;

#[doc(inline)]
pub use aggregate::{apply_history, Aggregate, AggregateFactory, AggregateState};
#[doc(inline)]
pub use bus::{Handler, HandlerId, MessageBus, Queue};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use id::Id;
#[doc(inline)]
pub use message::{Command, Event, EventStream, Message, SNAPSHOT_TYPE};
#[doc(inline)]
pub use saga::{Saga, SagaFactory, SagaState};
#[doc(inline)]
pub use storage::{EventResultStream, EventStorage, SnapshotStorage};
#[doc(inline)]
pub use validation::{validate_before_event, validate_event, Validator};
#[doc(inline)]
pub use view::{FilterFn, ProjectionView, UpdateFn};

// Re-export the external crates whose types appear in this crate's public
// API, so downstream crates don't need to depend on them directly to name
// those types.
pub use async_trait::async_trait;
pub use serde_json;
