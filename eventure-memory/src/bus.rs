//! The built-in in-memory `MessageBus`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use eventure_core::{Event, Handler, HandlerId, MessageBus, Queue, Result};
use tokio::sync::RwLock;

#[derive(Default)]
struct Topic {
    handlers: Vec<(HandlerId, Handler)>,
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("handler_count", &self.handlers.len())
            .finish()
    }
}

type QueueMap = Arc<RwLock<HashMap<String, Arc<QueueState>>>>;

/// Topic-indexed mapping from event type to handler set, with optional
/// named single-consumer queues layered on top.
///
/// `publish` delivers to every handler registered directly for
/// `event.message_type`, then to exactly one consumer of each named queue
/// registered for that type (round-robin across that queue's consumers).
#[derive(Debug)]
pub struct InMemoryMessageBus {
    next_id: AtomicU64,
    topics: RwLock<HashMap<String, Topic>>,
    queues: QueueMap,
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageBus {
    /// Creates an empty bus with no registered handlers or queues.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            topics: RwLock::new(HashMap::new()),
            queues: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn next_handler_id(&self) -> HandlerId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn on(&self, message_type: &str, handler: Handler) -> HandlerId {
        let id = self.next_handler_id();
        let mut topics = self.topics.write().await;
        topics
            .entry(message_type.to_owned())
            .or_default()
            .handlers
            .push((id, handler));
        id
    }

    async fn off(&self, message_type: &str, handler_id: HandlerId) {
        let mut topics = self.topics.write().await;
        if let Some(topic) = topics.get_mut(message_type) {
            topic.handlers.retain(|(id, _)| *id != handler_id);
        }
    }

    async fn publish(&self, event: Event) -> Result<()> {
        let direct: Vec<Handler> = {
            let topics = self.topics.read().await;
            topics
                .get(event.message_type.as_str())
                .map(|topic| topic.handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        let queued: Vec<Arc<QueueState>> = {
            let queues = self.queues.read().await;
            queues.values().cloned().collect()
        };

        let mut deliveries = Vec::with_capacity(direct.len() + queued.len());
        for handler in direct {
            deliveries.push(handler(event.clone()));
        }
        for queue in queued {
            if let Some(handler) = queue.next_consumer(&event.message_type).await {
                deliveries.push(handler(event.clone()));
            }
        }

        futures::future::join_all(deliveries).await;
        Ok(())
    }

    fn queue(&self, name: &str) -> Result<Arc<dyn Queue>> {
        Ok(Arc::new(QueueHandle {
            name: name.to_owned(),
            queues: Arc::clone(&self.queues),
        }))
    }
}

/// Shared state for one named queue: consumers grouped by message type,
/// with a round-robin cursor per type.
#[derive(Debug, Default)]
struct QueueState {
    consumers: RwLock<HashMap<String, Vec<(HandlerId, Handler)>>>,
    cursor: RwLock<HashMap<String, usize>>,
    next_id: AtomicU64,
}

impl QueueState {
    async fn next_consumer(&self, message_type: &str) -> Option<Handler> {
        let consumers = self.consumers.read().await;
        let list = consumers.get(message_type)?;
        if list.is_empty() {
            return None;
        }
        let mut cursor = self.cursor.write().await;
        let index = cursor.entry(message_type.to_owned()).or_insert(0);
        let (_, handler) = &list[*index % list.len()];
        *index = (*index + 1) % list.len();
        Some(Arc::clone(handler))
    }
}

/// A handle returned by [`InMemoryMessageBus::queue`], sharing the same
/// underlying queue map that `publish` reads from so registrations take
/// effect immediately.
struct QueueHandle {
    name: String,
    queues: QueueMap,
}

impl QueueHandle {
    async fn state(&self) -> Arc<QueueState> {
        if let Some(state) = self.queues.read().await.get(&self.name) {
            return Arc::clone(state);
        }
        let mut queues = self.queues.write().await;
        Arc::clone(
            queues
                .entry(self.name.clone())
                .or_insert_with(|| Arc::new(QueueState::default())),
        )
    }
}

#[async_trait]
impl Queue for QueueHandle {
    async fn on(&self, message_type: &str, handler: Handler) -> HandlerId {
        let state = self.state().await;
        let id = state.next_id.fetch_add(1, Ordering::Relaxed);
        state
            .consumers
            .write()
            .await
            .entry(message_type.to_owned())
            .or_default()
            .push((id, handler));
        id
    }

    async fn off(&self, message_type: &str, handler_id: HandlerId) {
        let state = self.state().await;
        if let Some(list) = state.consumers.write().await.get_mut(message_type) {
            list.retain(|(id, _)| *id != handler_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_handler(counter: Arc<AtomicUsize>) -> Handler {
        Arc::new(move |_event| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn publish_delivers_to_every_handler_of_the_type() {
        let bus = InMemoryMessageBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.on("created", counting_handler(Arc::clone(&count))).await;
        bus.on("created", counting_handler(Arc::clone(&count))).await;
        bus.on("other", counting_handler(Arc::clone(&count))).await;

        bus.publish(Event::new("created")).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn off_stops_further_delivery() {
        let bus = InMemoryMessageBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = bus.on("created", counting_handler(Arc::clone(&count))).await;
        bus.off("created", id).await;
        bus.publish(Event::new("created")).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn named_queue_delivers_each_event_to_exactly_one_consumer_round_robin() {
        let bus = InMemoryMessageBus::new();
        let queue = bus.queue("orders").unwrap();
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));
        queue.on("orderPlaced", counting_handler(Arc::clone(&count_a))).await;
        queue.on("orderPlaced", counting_handler(Arc::clone(&count_b))).await;

        for _ in 0..4 {
            bus.publish(Event::new("orderPlaced")).await.unwrap();
        }

        assert_eq!(count_a.load(Ordering::SeqCst) + count_b.load(Ordering::SeqCst), 4);
        assert_eq!(count_a.load(Ordering::SeqCst), 2);
        assert_eq!(count_b.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn queue_for_unregistered_type_receives_nothing() {
        let bus = InMemoryMessageBus::new();
        let queue = bus.queue("orders").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        queue.on("orderPlaced", counting_handler(Arc::clone(&count))).await;

        bus.publish(Event::new("unrelated")).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
