//! # eventure
//!
//! The coordination core of an event-sourcing/CQRS runtime: an
//! [`EventStore`] (validation, saga-id assignment, atomic
//! save-then-publish, one-time filtered subscriptions), an
//! [`AggregateCommandHandler`] (command dispatch against aggregates built
//! from `eventure-core`'s `Aggregate`/`AggregateFactory` contract), a
//! [`SagaEventHandler`] (saga replay/apply/dispatch), a [`CommandBus`]
//! routing commands to whichever handler registered for their type, and a
//! [`Projection`] runtime (subscribe/replay/live-apply).
//!
//! Storage, bus, aggregate, and saga implementations are all external
//! collaborators defined against `eventure-core`'s traits; this crate only
//! coordinates them. `eventure-memory` supplies the in-memory defaults used
//! when no other backend is configured.

#![warn(missing_docs, unused_import_braces, unused_imports)]
#![deny(missing_debug_implementations, unsafe_code)]

mod command_bus;
mod command_handler;
mod projection;
mod saga_handler;
mod store;

#[doc(inline)]
pub use command_bus::{CommandBus, CommandDispatch};
#[doc(inline)]
pub use command_handler::AggregateCommandHandler;
#[doc(inline)]
pub use projection::{project, run_projection, Projection};
#[doc(inline)]
pub use saga_handler::SagaEventHandler;
#[doc(inline)]
pub use store::{EventStore, EventStoreBuilder, Filter, OnceCallback, OnceHandle, OnceSubscription};

pub use eventure_core as core;
pub use eventure_memory as memory;
