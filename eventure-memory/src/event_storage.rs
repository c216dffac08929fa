//! In-memory [`EventStorage`] reference implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use eventure_core::{Error, Event, EventResultStream, EventStorage, EventStream, Id, Result};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Append-only event log keyed by aggregate id, with a secondary index by
/// saga id maintained on commit. Not durable across process restarts — a
/// stand-in for a real backend exposing the same four operations.
#[derive(Debug, Default)]
pub struct InMemoryEventStorage {
    by_aggregate: RwLock<HashMap<Id, EventStream>>,
    by_saga: RwLock<HashMap<Id, EventStream>>,
    all: RwLock<EventStream>,
}

impl InMemoryEventStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStorage for InMemoryEventStorage {
    async fn get_new_id(&self) -> Result<Id> {
        Ok(Id::from(Uuid::new_v4().to_string()))
    }

    async fn commit_events(&self, events: &[Event]) -> Result<()> {
        let mut by_aggregate = self.by_aggregate.write().await;
        let mut by_saga = self.by_saga.write().await;
        let mut all = self.all.write().await;

        for event in events {
            if let Some(aggregate_id) = &event.aggregate_id {
                by_aggregate
                    .entry(aggregate_id.clone())
                    .or_default()
                    .push(event.clone());
            }
            if let Some(saga_id) = &event.saga_id {
                by_saga.entry(saga_id.clone()).or_default().push(event.clone());
            }
            all.push(event.clone());
        }
        Ok(())
    }

    async fn get_aggregate_events(
        &self,
        aggregate_id: &Id,
        snapshot: Option<&Event>,
    ) -> Result<EventStream> {
        let by_aggregate = self.by_aggregate.read().await;
        let events = by_aggregate.get(aggregate_id).cloned().unwrap_or_default();
        match snapshot {
            None => Ok(events),
            Some(snapshot) => {
                let anchor = snapshot.aggregate_version.unwrap_or(0);
                Ok(events
                    .into_iter()
                    .filter(|e| e.aggregate_version.unwrap_or(0) > anchor)
                    .collect())
            }
        }
    }

    async fn get_saga_events(&self, saga_id: &Id, before_event: &Event) -> Result<EventStream> {
        eventure_core::validate_before_event(before_event)?;
        let before_version = before_event.saga_version.unwrap();
        let by_saga = self.by_saga.read().await;
        Ok(by_saga
            .get(saga_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|e| e.saga_version.map(|v| v < before_version).unwrap_or(false))
            .collect())
    }

    async fn get_events(&self, event_types: Option<&[String]>) -> Result<EventResultStream> {
        let all = self.all.read().await.clone();
        let event_types = event_types.map(|types| types.to_vec());
        let stream = async_stream::stream! {
            for event in all {
                if event_types
                    .as_ref()
                    .map(|types| types.iter().any(|t| t == &event.message_type))
                    .unwrap_or(true)
                {
                    yield Ok::<Event, Error>(event);
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn commits_are_indexed_by_aggregate_and_saga() {
        let storage = InMemoryEventStorage::new();
        storage
            .commit_events(&[
                Event::new("created")
                    .with_aggregate_id("a1")
                    .with_aggregate_version(1),
                Event::new("started")
                    .with_saga_id("s1")
                    .with_saga_version(0),
            ])
            .await
            .unwrap();

        let aggregate_events = storage.get_aggregate_events(&Id::from("a1"), None).await.unwrap();
        assert_eq!(aggregate_events.len(), 1);

        let before = Event::new("x").with_saga_version(5);
        let saga_events = storage.get_saga_events(&Id::from("s1"), &before).await.unwrap();
        assert_eq!(saga_events.len(), 1);
    }

    #[tokio::test]
    async fn get_aggregate_events_skips_events_at_or_before_snapshot_version() {
        let storage = InMemoryEventStorage::new();
        storage
            .commit_events(&[
                Event::new("a").with_aggregate_id("a1").with_aggregate_version(1),
                Event::new("b").with_aggregate_id("a1").with_aggregate_version(2),
                Event::new("c").with_aggregate_id("a1").with_aggregate_version(3),
            ])
            .await
            .unwrap();

        let snapshot = Event::new("snapshot")
            .with_aggregate_id("a1")
            .with_aggregate_version(2);
        let events = storage
            .get_aggregate_events(&Id::from("a1"), Some(&snapshot))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message_type, "c");
    }

    #[tokio::test]
    async fn get_events_filters_by_type_lazily() {
        let storage = InMemoryEventStorage::new();
        storage
            .commit_events(&[
                Event::new("created").with_aggregate_id("a1"),
                Event::new("renamed").with_aggregate_id("a1"),
            ])
            .await
            .unwrap();

        let filter = vec!["created".to_owned()];
        let mut stream = storage.get_events(Some(&filter)).await.unwrap();
        let mut seen = Vec::new();
        while let Some(event) = stream.next().await {
            seen.push(event.unwrap().message_type);
        }
        assert_eq!(seen, vec!["created".to_owned()]);
    }
}
