use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cupids_vault::{EventBus, EventError, KeyValueStorage, StorageError};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Captures every payload emitted on the topics it is attached to
#[derive(Clone, Default)]
pub struct EventRecorder {
    received: Arc<Mutex<Vec<(String, Value)>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, bus: &EventBus, topic: &str) {
        let received = self.received.clone();
        let topic_name = topic.to_string();
        bus.on(topic, move |data: &Value| -> Result<(), EventError> {
            received
                .lock()
                .unwrap()
                .push((topic_name.clone(), data.clone()));
            Ok(())
        });
    }

    pub fn payloads(&self, topic: &str) -> Vec<Value> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, data)| data.clone())
            .collect()
    }

    pub fn count(&self, topic: &str) -> usize {
        self.payloads(topic).len()
    }
}

/// Storage whose writes can be switched off, for persistence failures
#[derive(Default)]
pub struct FlakyStorage {
    entries: Mutex<HashMap<String, String>>,
    reject_writes: Mutex<bool>,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_writes(&self, reject: bool) {
        *self.reject_writes.lock().unwrap() = reject;
    }
}

impl KeyValueStorage for FlakyStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if *self.reject_writes.lock().unwrap() {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
            });
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
