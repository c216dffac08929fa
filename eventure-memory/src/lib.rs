//! # eventure-memory
//!
//! Reference in-memory implementations of `eventure-core`'s
//! `MessageBus`/`EventStorage`/`SnapshotStorage` traits: the defaults the
//! `eventure` runtime falls back to when no caller-supplied backend is
//! given. None of these are durable; they exist to
//! make the runtime runnable and testable without a real storage/transport
//! dependency.

#![warn(missing_docs, unused_import_braces, unused_imports)]
#![deny(missing_debug_implementations, unsafe_code)]

mod bus;
mod event_storage;
mod snapshot_storage;

#[doc(inline)]
pub use bus::InMemoryMessageBus;
#[doc(inline)]
pub use event_storage::InMemoryEventStorage;
#[doc(inline)]
pub use snapshot_storage::InMemorySnapshotStorage;
