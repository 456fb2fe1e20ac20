use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

type Module = Arc<dyn Any + Send + Sync>;

/// Name-keyed table of capability objects
///
/// Components that cannot be handed their collaborators at construction time
/// can look them up here by name. The last registration under a name wins.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: Arc<RwLock<HashMap<String, Module>>>,
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a module under a name, replacing any previous registration
    ///
    /// Returns true when an earlier module was replaced.
    pub fn register<T>(&self, name: &str, module: Arc<T>) -> bool
    where
        T: Any + Send + Sync,
    {
        let replaced = self
            .modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), module)
            .is_some();

        if replaced {
            debug!(module = %name, "Module registration replaced");
        } else {
            debug!(module = %name, "Module registered");
        }
        replaced
    }

    /// Looks up a module by name
    ///
    /// Returns None when nothing is registered under the name or when the
    /// registered module is not a `T`.
    pub fn get<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let module = self
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;

        match module.downcast::<T>() {
            Ok(module) => Some(module),
            Err(_) => {
                warn!(
                    module = %name,
                    expected = std::any::type_name::<T>(),
                    "Registered module has a different type"
                );
                None
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of all registered modules, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
