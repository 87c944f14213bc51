use dashmap::DashMap;
use todochat_core::ChatMessage;
use tokio::sync::broadcast;

/// Fan-out collaborator of the relay.
///
/// Publishing is best-effort: no acknowledgement, no record that it happened,
/// and a topic nobody listens to simply drops the message.
pub trait BroadcastChannel: Send + Sync {
    fn publish(&self, topic: &str, message: &ChatMessage);
}

/// In-process pub/sub: one `broadcast` sender per topic, created on first subscribe.
#[derive(Debug)]
pub struct TopicHub {
    topics: DashMap<String, broadcast::Sender<ChatMessage>>,
    capacity: usize,
}

impl TopicHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Per-topic buffer size, also used to bound each websocket session queue.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<ChatMessage> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drops the topic once its last receiver is gone.
    pub fn prune(&self, topic: &str) {
        if self
            .topics
            .remove_if(topic, |_, tx| tx.receiver_count() == 0)
            .is_some()
        {
            tracing::debug!(topic, "topic removed, no subscribers left");
        }
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl BroadcastChannel for TopicHub {
    fn publish(&self, topic: &str, message: &ChatMessage) {
        // send fails only when every receiver is gone, which is fine here
        let delivered = match self.topics.get(topic) {
            Some(tx) => tx.send(message.clone()).unwrap_or(0),
            None => 0,
        };
        tracing::debug!(topic, message_id = %message.id, delivered, "message published");
    }
}
