//! Error types for the domain and aggregate.

use thiserror::Error;

/// The provided reminder time is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("reminder time cannot be in the past")]
pub struct InvalidReminderTime;

/// The provided description is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("description cannot be empty")]
pub struct InvalidDescription;

/// The command failed due to being in a state where the event could not be
/// applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CommandError {
    /// The aggregate was not initialized, and it should have been.
    #[error("attempt to execute command before creation")]
    NotInitialized,

    /// The aggregate was already created, and it should not have been.
    #[error("attempt to create when already created")]
    AlreadyCreated,
}
