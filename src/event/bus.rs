use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace, warn};

use super::handler::{EventError, Listener, ListenerPolicy};

type TopicMap = HashMap<String, Vec<Listener>>;

/// Named-topic event bus connecting independently constructed components
///
/// Clones share the same listener table.
#[derive(Clone, Default)]
pub struct EventBus {
    /// topic -> listeners in registration order
    topics: Arc<RwLock<TopicMap>>,
    policy: ListenerPolicy,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = topics
            .iter()
            .map(|(topic, listeners)| (topic.as_str(), listeners.len()))
            .collect();

        f.debug_struct("EventBus")
            .field("topics", &counts)
            .field("policy", &self.policy)
            .finish()
    }
}

impl EventBus {
    /// Creates an event bus that aborts an emit on the first failing listener
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an event bus with the given listener failure policy
    pub fn with_policy(policy: ListenerPolicy) -> Self {
        Self {
            topics: Arc::default(),
            policy,
        }
    }

    pub fn policy(&self) -> ListenerPolicy {
        self.policy
    }

    /// Registers a listener on a topic
    ///
    /// The same closure registered twice is invoked twice.
    pub fn on<F>(&self, topic: &str, listener: F)
    where
        F: Fn(&Value) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        let listeners = topics.entry(topic.to_string()).or_default();
        listeners.push(Arc::new(listener));

        debug!(topic = %topic, listeners = listeners.len(), "Listener registered");
    }

    /// Invokes every listener of a topic, in registration order
    ///
    /// Returns the number of listeners that completed successfully. Under
    /// [`ListenerPolicy::Abort`] the first failure is returned and later
    /// listeners are skipped.
    pub fn emit(&self, topic: &str, data: &Value) -> Result<usize, EventError> {
        // Snapshot so listeners can register on the bus while being invoked
        let listeners = {
            let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
            match topics.get(topic) {
                Some(listeners) => listeners.clone(),
                None => {
                    trace!(topic = %topic, "Event dropped: no listeners");
                    return Ok(0);
                }
            }
        };

        let mut delivered = 0;
        for (index, listener) in listeners.iter().enumerate() {
            match listener(data) {
                Ok(()) => delivered += 1,
                Err(error) => match self.policy {
                    ListenerPolicy::Abort => {
                        warn!(
                            topic = %topic,
                            listener_index = index,
                            skipped = listeners.len() - index - 1,
                            error = %error,
                            "Listener failed, aborting emit"
                        );
                        return Err(error);
                    }
                    ListenerPolicy::Isolate => {
                        warn!(
                            topic = %topic,
                            listener_index = index,
                            error = %error,
                            "Listener failed, continuing with remaining listeners"
                        );
                    }
                },
            }
        }

        debug!(topic = %topic, delivered, "Event emitted");
        Ok(delivered)
    }

    /// Serializes a typed payload and emits it
    pub fn emit_serialized<T: Serialize>(&self, topic: &str, data: &T) -> Result<usize, EventError> {
        let value = serde_json::to_value(data)?;
        self.emit(topic, &value)
    }

    /// Returns how many listeners are registered on a topic
    pub fn listener_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Removes every listener from every topic
    pub fn clear(&self) {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        let topic_count = topics.len();
        topics.clear();
        debug!(topic_count, "Event bus cleared");
    }
}
