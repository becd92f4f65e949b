//! Loosely-typed job definition
//!
//! Rundeck hands back job definitions as free-form JSON objects whose
//! shape drifts between versions and between jobs. [`JobDefinition`] keeps
//! the object as-is (key order included) and exposes tagged accessors for
//! the few paths reconciliation cares about. Everything else is carried
//! through untouched when the definition is written back.

use crate::error::DefinitionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level key holding plugin configuration
pub const PLUGINS: &str = "plugins";

/// Plugin group for execution lifecycle plugins
pub const EXECUTION_LIFECYCLE: &str = "ExecutionLifecycle";

/// Fields the server owns; sending them back makes the import misbehave
pub const SERVER_MANAGED_FIELDS: [&str; 5] =
    ["id", "href", "permalink", "averageDuration", "project"];

/// A single job definition as returned by the job export endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobDefinition(Map<String, Value>);

impl JobDefinition {
    /// Wrap an already-parsed JSON object
    #[inline]
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build from a response body.
    ///
    /// The export endpoint answers with a one-element list; a bare object is
    /// accepted as well. Anything else yields `None`.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            Value::Array(items) => match items.into_iter().next() {
                Some(Value::Object(fields)) => Some(Self(fields)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Job name, if present and a string
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Raw access to a top-level field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow the underlying object
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert back into a JSON value
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// `plugins.ExecutionLifecycle`, when both levels are objects
    #[must_use]
    pub fn execution_lifecycle(&self) -> Option<&Map<String, Value>> {
        self.0
            .get(PLUGINS)
            .and_then(Value::as_object)
            .and_then(|plugins| plugins.get(EXECUTION_LIFECYCLE))
            .and_then(Value::as_object)
    }

    /// Mutable `plugins.ExecutionLifecycle`, when both levels are objects
    pub fn execution_lifecycle_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0
            .get_mut(PLUGINS)
            .and_then(Value::as_object_mut)
            .and_then(|plugins| plugins.get_mut(EXECUTION_LIFECYCLE))
            .and_then(Value::as_object_mut)
    }

    /// `plugins.ExecutionLifecycle`, created on demand.
    ///
    /// Missing levels are inserted; levels holding a non-object value are
    /// replaced with an empty object.
    pub fn execution_lifecycle_or_insert(&mut self) -> &mut Map<String, Value> {
        let plugins = object_entry(&mut self.0, PLUGINS);
        object_entry(plugins, EXECUTION_LIFECYCLE)
    }

    /// Drop fields the server manages itself
    pub fn strip_server_managed(&mut self) {
        for field in SERVER_MANAGED_FIELDS {
            self.0.remove(field);
        }
    }

    /// Check the definition is importable.
    ///
    /// A `null` `plugins` or `ExecutionLifecycle` is removed rather than
    /// rejected.
    pub fn validate(&mut self) -> Result<(), DefinitionError> {
        if !self.0.contains_key("name") {
            return Err(DefinitionError::MissingName);
        }

        match self.0.get_mut(PLUGINS) {
            None => {}
            Some(Value::Null) => {
                self.0.remove(PLUGINS);
            }
            Some(Value::Object(plugins)) => match plugins.get(EXECUTION_LIFECYCLE) {
                None | Some(Value::Object(_)) => {}
                Some(Value::Null) => {
                    plugins.remove(EXECUTION_LIFECYCLE);
                }
                Some(other) => {
                    return Err(DefinitionError::InvalidExecutionLifecycle(kind(other)));
                }
            },
            Some(other) => return Err(DefinitionError::InvalidPlugins(kind(other))),
        }

        Ok(())
    }

    /// Strip server-managed fields and validate, producing the import payload
    pub fn prepare_for_import(mut self) -> Result<Self, DefinitionError> {
        self.strip_server_managed();
        self.validate()?;
        Ok(self)
    }
}

impl From<Map<String, Value>> for JobDefinition {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Coerce `value` into an object, replacing anything else, and borrow it
pub(crate) fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    ensure_object(map.entry(key).or_insert_with(|| Value::Object(Map::new())))
}

/// JSON type name for error messages
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
