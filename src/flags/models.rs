use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key that lets `define_once` defer to the persisted value
pub const OVERWRITE_META_KEY: &str = "Overwrite";

/// Open mapping of descriptive fields attached to a flag
pub type FlagMeta = Map<String, Value>;

/// A named toggle with its current value and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub value: Value,
    #[serde(default)]
    pub meta: FlagMeta,
}

impl Flag {
    pub fn new(value: Value, meta: FlagMeta) -> Self {
        Self { value, meta }
    }

    /// Truthiness of the current value
    pub fn is_enabled(&self) -> bool {
        is_truthy(&self.value)
    }

    /// True when the metadata explicitly sets `Overwrite` to `false`
    pub(crate) fn defers_to_session(meta: &FlagMeta) -> bool {
        matches!(meta.get(OVERWRITE_META_KEY), Some(Value::Bool(false)))
    }
}

/// Partial patch applied by `FlagStore::update`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagUpdate {
    pub value: Option<Value>,
    /// Shallow-merged over the existing metadata
    pub meta: Option<FlagMeta>,
}

impl FlagUpdate {
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            meta: None,
        }
    }

    pub fn meta(meta: FlagMeta) -> Self {
        Self {
            value: None,
            meta: Some(meta),
        }
    }

    pub fn with_meta(mut self, meta: FlagMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Loose boolean coercion of a JSON value
///
/// `null`, `false`, zero, NaN and the empty string are false; everything
/// else, including empty arrays and objects, is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
