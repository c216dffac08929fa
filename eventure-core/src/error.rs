//! Error taxonomy shared by every crate in the workspace.

use thiserror::Error;

use crate::id::Id;

/// The workspace's single error type. Validation and contract errors are
/// raised synchronously; storage and publish errors are surfaced to the
/// caller of `commit` (publish errors only in synchronous publish mode);
/// saga and projection handlers report their own errors via `on_error`/
/// logging and never let them reach this type on the publish path.
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument was missing, empty, or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An event failed structural validation during `commit`. Fails the whole commit; nothing is persisted.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// A commit contained a snapshot event but no `SnapshotStorage` was
    /// configured.
    #[error("commit contained a snapshot event but no snapshot storage is configured")]
    SnapshotsUnsupported,

    /// A commit contained more than one snapshot event.
    #[error("commit contained more than one snapshot event")]
    MultipleSnapshots,

    /// An aggregate signalled `should_take_snapshot` but does not implement
    /// `make_snapshot`.
    #[error("aggregate signalled should_take_snapshot without implementing make_snapshot")]
    SnapshotContractViolation,

    /// A saga-starter event arrived already carrying a `saga_id`.
    #[error("event of a registered saga-starter type already carries saga_id {0}")]
    SagaAlreadyStarted(Id),

    /// The backing storage failed.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// A commit partially persisted (event storage and snapshot storage
    /// disagreed on success) and is therefore not eligible for publication.
    #[error("commit partially failed: {0}")]
    CommitPartialFailure(String),

    /// Publishing succeeded-commit events failed. Only ever returned to a
    /// caller in synchronous publish mode; in async mode this is logged
    /// instead.
    #[error("publish failure: {0}")]
    PublishFailure(String),

    /// A capability (e.g. `queue()`) was invoked against a bus/storage that
    /// does not support it.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(&'static str),
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
