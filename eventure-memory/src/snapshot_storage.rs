//! In-memory [`SnapshotStorage`] reference implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use eventure_core::{Error, Event, Id, Result, SnapshotStorage};
use tokio::sync::RwLock;

/// Latest-snapshot-per-aggregate store. Saving a new snapshot for an
/// aggregate replaces any prior one.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStorage {
    snapshots: RwLock<HashMap<Id, Event>>,
}

impl InMemorySnapshotStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStorage for InMemorySnapshotStorage {
    async fn get_aggregate_snapshot(&self, aggregate_id: &Id) -> Result<Option<Event>> {
        Ok(self.snapshots.read().await.get(aggregate_id).cloned())
    }

    async fn save_aggregate_snapshot(&self, event: Event) -> Result<()> {
        let Some(aggregate_id) = event.aggregate_id.clone() else {
            return Err(Error::InvalidArgument(
                "snapshot event must carry aggregate_id".into(),
            ));
        };
        self.snapshots.write().await.insert(aggregate_id, event);
        Ok(())
    }
}
