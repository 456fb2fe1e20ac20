use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};

use super::errors::FlagError;
use super::models::{is_truthy, Flag, FlagMeta, FlagUpdate};
use crate::storage::KeyValueStorage;

/// Storage key of the persisted flag snapshot when none is configured
pub const DEFAULT_SESSION_KEY: &str = "FastFlagsSession";

#[derive(Debug, Default)]
struct FlagTable {
    /// name -> flag, the in-memory source of truth
    flags: HashMap<String, Flag>,
    /// name -> value, mirrored wholesale to storage after every value change
    session: Map<String, Value>,
}

/// Feature-flag cache backed by a session-scoped storage slot
///
/// Values set through the mutating operations survive a reload: a later
/// `define` of the same name picks the persisted value over its default.
/// Operations on names that were never defined are silent no-ops.
pub struct FlagStore {
    table: Mutex<FlagTable>,
    storage: Arc<dyn KeyValueStorage>,
    session_key: String,
}

impl std::fmt::Debug for FlagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagStore")
            .field("session_key", &self.session_key)
            .field("table", &*self.lock())
            .finish()
    }
}

impl FlagStore {
    /// Creates a store and loads the persisted snapshot under `session_key`
    ///
    /// A missing, unreadable or malformed snapshot starts an empty session.
    pub fn new(storage: Arc<dyn KeyValueStorage>, session_key: impl Into<String>) -> Self {
        let session_key = session_key.into();
        let session = load_session(storage.as_ref(), &session_key);

        debug!(
            session_key = %session_key,
            persisted_flags = session.len(),
            "Flag store initialized"
        );

        Self {
            table: Mutex::new(FlagTable {
                flags: HashMap::new(),
                session,
            }),
            storage,
            session_key,
        }
    }

    pub fn with_default_key(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::new(storage, DEFAULT_SESSION_KEY)
    }

    /// Defines a flag with empty metadata; see [`FlagStore::define_with_meta`]
    pub fn define(&self, name: &str, default: impl Into<Value>) -> Value {
        self.define_with_meta(name, default, FlagMeta::new())
    }

    /// Defines or redefines a flag
    ///
    /// The value is the persisted one when present, otherwise `default`.
    /// Any existing definition is replaced.
    #[instrument(skip(self, default, meta))]
    pub fn define_with_meta(&self, name: &str, default: impl Into<Value>, meta: FlagMeta) -> Value {
        let mut table = self.lock();
        let value = match table.session.get(name) {
            Some(persisted) => persisted.clone(),
            None => default.into(),
        };

        debug!(flag = %name, value = %value, "Flag defined");
        table
            .flags
            .insert(name.to_string(), Flag::new(value.clone(), meta));
        value
    }

    /// Defines a flag with empty metadata unless it already exists
    pub fn define_once(&self, name: &str, default: impl Into<Value>) -> Value {
        self.define_once_with_meta(name, default, FlagMeta::new())
    }

    /// Defines a flag only if no flag of that name exists yet
    ///
    /// A first definition uses `default`, unless the metadata sets
    /// `Overwrite` to `false`, in which case a persisted value wins. When the
    /// flag already exists nothing changes and its current value is returned.
    #[instrument(skip(self, default, meta))]
    pub fn define_once_with_meta(
        &self,
        name: &str,
        default: impl Into<Value>,
        meta: FlagMeta,
    ) -> Value {
        let mut table = self.lock();
        if let Some(existing) = table.flags.get(name) {
            debug!(flag = %name, "Flag already defined, keeping existing value");
            return existing.value.clone();
        }

        let persisted = if Flag::defers_to_session(&meta) {
            table.session.get(name).cloned()
        } else {
            None
        };
        let value = persisted.unwrap_or_else(|| default.into());

        debug!(flag = %name, value = %value, "Flag defined once");
        table
            .flags
            .insert(name.to_string(), Flag::new(value.clone(), meta));
        value
    }

    /// Sets a flag to `true`
    pub fn enable(&self, name: &str) -> Result<(), FlagError> {
        self.replace_value(name, |_| Value::Bool(true))
    }

    /// Sets a flag to `false`
    pub fn disable(&self, name: &str) -> Result<(), FlagError> {
        self.replace_value(name, |_| Value::Bool(false))
    }

    /// Sets a flag to the negation of its current truthiness
    pub fn toggle(&self, name: &str) -> Result<(), FlagError> {
        self.replace_value(name, |current| Value::Bool(!is_truthy(current)))
    }

    /// Overwrites a flag's value
    pub fn set_value(&self, name: &str, value: impl Into<Value>) -> Result<(), FlagError> {
        let value = value.into();
        self.replace_value(name, move |_| value)
    }

    /// Applies a partial patch to a flag
    ///
    /// A new value is persisted; metadata is shallow-merged and stays in
    /// memory only.
    #[instrument(skip(self, update))]
    pub fn update(&self, name: &str, update: FlagUpdate) -> Result<(), FlagError> {
        let mut table = self.lock();
        let Some(flag) = table.flags.get_mut(name) else {
            debug!(flag = %name, "Update on undefined flag ignored");
            return Ok(());
        };

        if let Some(meta) = update.meta {
            flag.meta.extend(meta);
        }

        if let Some(value) = update.value {
            flag.value = value.clone();
            table.session.insert(name.to_string(), value);
            self.persist(&table)?;
        }

        debug!(flag = %name, "Flag updated");
        Ok(())
    }

    /// Truthiness of a flag; undefined flags are false
    pub fn is(&self, name: &str) -> bool {
        self.lock().flags.get(name).is_some_and(Flag::is_enabled)
    }

    pub fn get(&self, name: &str) -> Option<Flag> {
        self.lock().flags.get(name).cloned()
    }

    /// Metadata of a flag, empty when undefined
    pub fn get_meta(&self, name: &str) -> FlagMeta {
        self.lock()
            .flags
            .get(name)
            .map(|flag| flag.meta.clone())
            .unwrap_or_default()
    }

    pub fn get_value(&self, name: &str) -> Option<Value> {
        self.lock().flags.get(name).map(|flag| flag.value.clone())
    }

    /// Every defined flag name mapped to its current value
    pub fn get_all(&self) -> BTreeMap<String, Value> {
        self.lock()
            .flags
            .iter()
            .map(|(name, flag)| (name.clone(), flag.value.clone()))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().flags.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lock().flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().flags.is_empty()
    }

    /// Erases the persisted snapshot
    ///
    /// Only the storage slot is removed. In-memory flags and the cached
    /// session values are kept, so a later `define` in this store still
    /// resolves them and the next value change writes them all back.
    #[instrument(skip(self))]
    pub fn clear_session(&self) -> Result<(), FlagError> {
        let _table = self.lock();
        self.storage.clear(&self.session_key)?;

        debug!(session_key = %self.session_key, "Flag session cleared");
        Ok(())
    }

    fn replace_value<F>(&self, name: &str, next: F) -> Result<(), FlagError>
    where
        F: FnOnce(&Value) -> Value,
    {
        let mut table = self.lock();
        let Some(flag) = table.flags.get_mut(name) else {
            debug!(flag = %name, "Mutation on undefined flag ignored");
            return Ok(());
        };

        let value = next(&flag.value);
        flag.value = value.clone();
        debug!(flag = %name, value = %value, "Flag value changed");

        table.session.insert(name.to_string(), value);
        self.persist(&table)
    }

    fn persist(&self, table: &FlagTable) -> Result<(), FlagError> {
        let snapshot = serde_json::to_string(&table.session)?;
        self.storage
            .write(&self.session_key, &snapshot)
            .map_err(|e| {
                warn!(session_key = %self.session_key, error = %e, "Failed to persist flag session");
                FlagError::from(e)
            })
    }

    fn lock(&self) -> MutexGuard<'_, FlagTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_session(storage: &dyn KeyValueStorage, key: &str) -> Map<String, Value> {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Map::new(),
        Err(e) => {
            warn!(session_key = %key, error = %e, "Flag session unreadable, starting empty");
            return Map::new();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(session)) => session,
        Ok(Value::Null) => Map::new(),
        Ok(other) => {
            warn!(session_key = %key, found = %other, "Flag session is not an object, starting empty");
            Map::new()
        }
        Err(e) => {
            warn!(session_key = %key, error = %e, "Flag session malformed, starting empty");
            Map::new()
        }
    }
}
