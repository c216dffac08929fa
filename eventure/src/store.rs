//! `EventStore`: validation, saga-id assignment, atomic
//! save-then-publish, and one-time filtered subscriptions.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eventure_core::{
    validate_before_event, Error, Event, EventResultStream, EventStorage, EventStream, Handler,
    HandlerId, Id, MessageBus, Queue, Result, SnapshotStorage, Validator,
};
use eventure_memory::InMemoryMessageBus;
use tokio::sync::{oneshot, Mutex, RwLock};

/// A predicate applied to candidate events in [`EventStore::once`].
pub type Filter = Box<dyn Fn(&Event) -> bool + Send + Sync>;
/// A side-effecting callback invoked, in addition to resolving the awaited
/// future, when [`EventStore::once`] finds its match.
pub type OnceCallback = Box<dyn Fn(&Event) + Send + Sync>;

/// Builds an [`EventStore`], resolving bus selection once at construction
/// time rather than probing per call.
pub struct EventStoreBuilder {
    storage: Arc<dyn EventStorage>,
    snapshots: Option<Arc<dyn SnapshotStorage>>,
    subscribe_bus: Option<Arc<dyn MessageBus>>,
    publish_bus: Option<Arc<dyn MessageBus>>,
    validator: Option<Validator>,
    publish_async: bool,
}

impl EventStoreBuilder {
    /// Starts a builder over the given durable event log. Defaults to no
    /// snapshot storage, a fresh in-memory bus for both publish and
    /// subscribe, the default validator, and asynchronous publish.
    pub fn new(storage: Arc<dyn EventStorage>) -> Self {
        Self {
            storage,
            snapshots: None,
            subscribe_bus: None,
            publish_bus: None,
            validator: None,
            publish_async: true,
        }
    }

    /// Configures optional snapshot storage.
    #[must_use]
    pub fn with_snapshot_storage(mut self, snapshots: Arc<dyn SnapshotStorage>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Uses `bus` for both publish and subscribe.
    #[must_use]
    pub fn with_bus(mut self, bus: Arc<dyn MessageBus>) -> Self {
        self.subscribe_bus = Some(Arc::clone(&bus));
        self.publish_bus = Some(bus);
        self
    }

    /// Uses `bus` for subscription only, with no publish target. `commit`
    /// still persists and returns the committed stream; it simply has
    /// nothing to publish to.
    #[must_use]
    pub fn with_storage_subscriptions(mut self, bus: Arc<dyn MessageBus>) -> Self {
        self.subscribe_bus = Some(bus);
        self.publish_bus = None;
        self
    }

    /// Overrides the default structural validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Switches to synchronous publish: `commit` awaits every publish and
    /// surfaces publish errors to its caller.
    #[must_use]
    pub fn synchronous_publish(mut self) -> Self {
        self.publish_async = false;
        self
    }

    /// Finishes construction. If no bus was supplied, instantiates the
    /// built-in in-memory bus for both publish and subscribe.
    pub fn build(self) -> EventStore {
        let (subscribe_bus, publish_bus) = match (self.subscribe_bus, self.publish_bus) {
            (Some(sub), publish) => (sub, publish),
            (None, _) => {
                let bus: Arc<dyn MessageBus> = Arc::new(InMemoryMessageBus::new());
                (Arc::clone(&bus), Some(bus))
            }
        };
        EventStore {
            storage: self.storage,
            snapshots: self.snapshots,
            subscribe_bus,
            publish_bus,
            saga_starters: RwLock::new(HashSet::new()),
            validator: self.validator,
            publish_async: self.publish_async,
        }
    }
}

/// The coordination core: validation, saga-id assignment, atomic
/// save-then-publish, and one-time filtered subscriptions.
pub struct EventStore {
    storage: Arc<dyn EventStorage>,
    snapshots: Option<Arc<dyn SnapshotStorage>>,
    subscribe_bus: Arc<dyn MessageBus>,
    publish_bus: Option<Arc<dyn MessageBus>>,
    saga_starters: RwLock<HashSet<String>>,
    validator: Option<Validator>,
    publish_async: bool,
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("publish_async", &self.publish_async)
            .field("has_snapshot_storage", &self.snapshots.is_some())
            .field("has_publish_bus", &self.publish_bus.is_some())
            .finish_non_exhaustive()
    }
}

impl EventStore {
    /// Starts building an `EventStore` over `storage`.
    pub fn builder(storage: Arc<dyn EventStorage>) -> EventStoreBuilder {
        EventStoreBuilder::new(storage)
    }

    /// Builds an `EventStore` with defaults: no snapshot storage, the
    /// built-in in-memory bus, the default validator, asynchronous publish.
    pub fn new(storage: Arc<dyn EventStorage>) -> Self {
        EventStoreBuilder::new(storage).build()
    }

    /// The configured snapshot storage, if any.
    pub fn snapshot_storage(&self) -> Option<&Arc<dyn SnapshotStorage>> {
        self.snapshots.as_ref()
    }

    /// Mints a fresh, globally unique id via the underlying storage.
    pub async fn get_new_id(&self) -> Result<Id> {
        self.storage.get_new_id().await
    }

    /// Fetches the latest snapshot (if snapshot storage is configured) and
    /// the events committed after it, for `aggregate_id`.
    #[tracing::instrument(skip(self))]
    pub async fn get_aggregate_events(&self, aggregate_id: &Id) -> Result<(Option<Event>, EventStream)> {
        let snapshot = match &self.snapshots {
            Some(snapshots) => snapshots.get_aggregate_snapshot(aggregate_id).await?,
            None => None,
        };
        let events = self
            .storage
            .get_aggregate_events(aggregate_id, snapshot.as_ref())
            .await?;
        Ok((snapshot, events))
    }

    /// Fetches events committed for `saga_id` strictly before
    /// `before_event.saga_version`.
    pub async fn get_saga_events(&self, saga_id: &Id, before_event: &Event) -> Result<EventStream> {
        validate_before_event(before_event)?;
        self.storage.get_saga_events(saga_id, before_event).await
    }

    /// A lazy sequence of events across every aggregate, optionally
    /// filtered by type.
    pub async fn get_all_events(&self, event_types: Option<&[String]>) -> Result<EventResultStream> {
        self.storage.get_events(event_types).await
    }

    /// Forwards to the underlying subscription bus.
    pub async fn on(&self, message_type: &str, handler: Handler) -> HandlerId {
        self.subscribe_bus.on(message_type, handler).await
    }

    /// Forwards to the underlying subscription bus.
    pub async fn off(&self, message_type: &str, handler_id: HandlerId) {
        self.subscribe_bus.off(message_type, handler_id).await
    }

    /// A named single-consumer queue, if the subscription bus supports
    /// them (else fails with `UnsupportedCapability`).
    pub fn queue(&self, name: &str) -> Result<Arc<dyn Queue>> {
        self.subscribe_bus.queue(name)
    }

    /// Adds to the set of event types that mint a fresh `sagaId` on commit.
    /// Idempotent.
    pub async fn register_saga_starters(&self, event_types: &[&str]) {
        let mut starters = self.saga_starters.write().await;
        for event_type in event_types {
            starters.insert((*event_type).to_string());
        }
    }

    /// One-time filtered subscription: resolves the first
    /// delivery, across `types`, that passes `filter`, then unsubscribes
    /// from every type. Returns a subscription whose `resolve` future
    /// yields the matched event, plus a cancellation handle usable before
    /// a match occurs.
    pub async fn once(
        &self,
        types: &[&str],
        handler: Option<OnceCallback>,
        filter: Option<Filter>,
    ) -> OnceSubscription {
        let handled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let handler = Arc::new(handler);
        let filter = Arc::new(filter);
        let registrations: Arc<Mutex<Vec<(String, HandlerId)>>> = Arc::new(Mutex::new(Vec::new()));
        let bus = Arc::clone(&self.subscribe_bus);

        let mut ids = Vec::with_capacity(types.len());
        for &message_type in types {
            let handled = Arc::clone(&handled);
            let tx = Arc::clone(&tx);
            let handler = Arc::clone(&handler);
            let filter = Arc::clone(&filter);
            let bus = Arc::clone(&bus);
            let registrations = Arc::clone(&registrations);

            let id = bus
                .on(
                    message_type,
                    Arc::new(move |event: Event| {
                        let handled = Arc::clone(&handled);
                        let tx = Arc::clone(&tx);
                        let handler = Arc::clone(&handler);
                        let filter = Arc::clone(&filter);
                        let bus = Arc::clone(&bus);
                        let registrations = Arc::clone(&registrations);
                        Box::pin(async move {
                            if let Some(f) = filter.as_ref() {
                                if !f(&event) {
                                    return;
                                }
                            }
                            if handled
                                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                                .is_err()
                            {
                                return;
                            }
                            for (message_type, id) in registrations.lock().await.drain(..) {
                                bus.off(&message_type, id).await;
                            }
                            if let Some(h) = handler.as_ref() {
                                h(&event);
                            }
                            if let Some(tx) = tx.lock().await.take() {
                                let _ = tx.send(event);
                            }
                        })
                    }),
                )
                .await;
            ids.push((message_type.to_string(), id));
        }
        *registrations.lock().await = ids;

        OnceSubscription {
            handle: OnceHandle { bus, registrations },
            receiver: rx,
        }
    }

    /// Commit algorithm.
    #[tracing::instrument(skip(self, events), fields(event_count = events.len()))]
    pub async fn commit(&self, events: EventStream) -> Result<EventStream> {
        // Step 1: separate at most one snapshot event.
        let mut snapshot: Option<Event> = None;
        let mut rest = Vec::with_capacity(events.len());
        for event in events {
            if event.is_snapshot() {
                if snapshot.is_some() {
                    return Err(Error::MultipleSnapshots);
                }
                snapshot = Some(event);
            } else {
                rest.push(event);
            }
        }
        if snapshot.is_some() && self.snapshots.is_none() {
            return Err(Error::SnapshotsUnsupported);
        }

        // Step 2: validate every non-snapshot event.
        for event in &rest {
            match &self.validator {
                Some(validator) => validator(event)?,
                None => eventure_core::validate_event(event)?,
            }
        }

        // Step 3: saga-starter assignment.
        {
            let starters = self.saga_starters.read().await;
            if !starters.is_empty() {
                for event in rest.iter_mut() {
                    if starters.contains(&event.message_type) {
                        if event.saga_id.is_some() {
                            return Err(Error::SagaAlreadyStarted(event.saga_id.clone().unwrap()));
                        }
                        event.saga_id = Some(self.storage.get_new_id().await?);
                        event.saga_version = Some(0);
                    }
                }
            }
        }

        // Step 4: persist events and snapshot concurrently; both must
        // succeed.
        let snapshot_task = async {
            match (&snapshot, &self.snapshots) {
                (Some(event), Some(storage)) => storage.save_aggregate_snapshot(event.clone()).await,
                _ => Ok(()),
            }
        };
        let (storage_result, snapshot_result) = tokio::join!(self.storage.commit_events(&rest), snapshot_task);
        match (storage_result, snapshot_result, snapshot.is_some()) {
            (Ok(()), Ok(()), _) => {}
            (Err(e), Ok(()), false) => return Err(e),
            (Ok(()), Err(e), _) => {
                return Err(Error::CommitPartialFailure(format!(
                    "events committed but snapshot persistence failed: {e}"
                )))
            }
            (Err(e), Ok(()), true) => {
                return Err(Error::CommitPartialFailure(format!(
                    "snapshot committed but event persistence failed: {e}"
                )))
            }
            (Err(e1), Err(e2), _) => return Err(Error::StorageFailure(format!("{e1}; {e2}"))),
        }

        // Step 5: publish, in input order, after successful persistence.
        if let Some(bus) = &self.publish_bus {
            if self.publish_async {
                let bus = Arc::clone(bus);
                let to_publish = rest.clone();
                tokio::spawn(async move {
                    for event in to_publish {
                        if let Err(err) = bus.publish(event).await {
                            tracing::error!(error = %err, "async publish failed");
                        }
                    }
                });
            } else {
                for event in rest.iter().cloned() {
                    bus.publish(event)
                        .await
                        .map_err(|e| Error::PublishFailure(e.to_string()))?;
                }
            }
        }

        // Step 6: return the committed non-snapshot stream.
        Ok(rest)
    }
}

/// A pending [`EventStore::once`] match, and a handle to cancel it before
/// one occurs.
pub struct OnceSubscription {
    /// Cancels the subscription, unsubscribing from every type it was
    /// registered for.
    pub handle: OnceHandle,
    receiver: oneshot::Receiver<Event>,
}

impl OnceSubscription {
    /// Awaits the matching event. Resolves to `None` if the subscription
    /// was cancelled first.
    pub async fn resolve(self) -> Option<Event> {
        self.receiver.await.ok()
    }
}

/// Cancels a pending [`EventStore::once`] subscription.
pub struct OnceHandle {
    bus: Arc<dyn MessageBus>,
    registrations: Arc<Mutex<Vec<(String, HandlerId)>>>,
}

impl OnceHandle {
    /// Unsubscribes from every type this `once` call registered for, if it
    /// has not already matched and torn itself down.
    pub async fn cancel(self) {
        for (message_type, id) in self.registrations.lock().await.drain(..) {
            self.bus.off(&message_type, id).await;
        }
    }
}
