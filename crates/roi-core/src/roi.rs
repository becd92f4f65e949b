//! ROI metrics plugin detection and patching
//!
//! The plugin stores its fields in `userRoiData`, a JSON *string* holding a
//! list of `{key, label, desc, value}` descriptors. Older jobs may carry a
//! `fields` entry instead, either as a string or a native list, sometimes
//! with bare strings in place of descriptors. Anything that does not parse
//! counts as "no hours field".

use crate::definition::{ensure_object, JobDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plugin name used when no existing plugin could be detected
pub const DEFAULT_PLUGIN_NAME: &str = "roi-metrics-data";

/// Hours-saved value written when none is configured
pub const DEFAULT_HOURS_SAVED: f64 = 2.0;

/// Plugin config key holding the JSON-encoded descriptor list
pub const USER_ROI_DATA: &str = "userRoiData";

/// Legacy plugin config key, inspected but never written
pub const LEGACY_FIELDS: &str = "fields";

/// Key of the descriptor this tool maintains
pub const HOURS_KEY: &str = "hours";

/// Reported when an hours field exists but carries no value
pub const UNKNOWN_VALUE: &str = "unknown";

/// Name heuristic: contains both "roi" and "metric", any case
#[must_use]
pub fn is_roi_plugin_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("roi") && lower.contains("metric")
}

/// First ExecutionLifecycle plugin whose name passes the heuristic
#[must_use]
pub fn detect_plugin_name(definition: &JobDefinition) -> Option<&str> {
    definition
        .execution_lifecycle()?
        .keys()
        .map(String::as_str)
        .find(|name| is_roi_plugin_name(name))
}

/// One ROI field descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiField {
    pub key: String,
    pub label: String,
    pub desc: String,
    pub value: String,
}

impl RoiField {
    /// Hours-saved descriptor for the given value
    #[must_use]
    pub fn hours(hours: f64) -> Self {
        Self {
            key: HOURS_KEY.to_string(),
            label: "Hours Saved By automation".to_string(),
            desc: "Number of hours saved by this automation".to_string(),
            value: format_hours(hours),
        }
    }

    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Render hours with at least one decimal place ("2.0", "1.5").
///
/// Values below 1e-4 or from 1e16 upwards switch to exponent notation
/// ("1e16"); the CLI keeps `--hours` inside the plain range.
#[must_use]
pub fn format_hours(hours: f64) -> String {
    format!("{hours:?}")
}

/// Result of looking for an hours field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoursField {
    /// No ROI plugin, or one without an hours field
    Absent,
    /// First hours field found, with its value rendered as text
    Present { value: String },
}

impl HoursField {
    #[inline]
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Absent => None,
            Self::Present { value } => Some(value.as_str()),
        }
    }
}

/// Descriptor list as stored in a plugin config
#[derive(Debug, Clone, PartialEq)]
enum FieldList {
    Missing,
    Entries(Vec<Value>),
    Malformed,
}

impl FieldList {
    fn parse(raw: Option<&Value>) -> Self {
        match raw {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::Array(items)) => Self::Entries(items.clone()),
            Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
                Ok(Value::Array(items)) => Self::Entries(items),
                _ => Self::Malformed,
            },
            Some(_) => Self::Malformed,
        }
    }

    fn entries(&self) -> &[Value] {
        match self {
            Self::Entries(items) => items.as_slice(),
            Self::Missing | Self::Malformed => &[],
        }
    }
}

/// One entry of a descriptor list
enum FieldEntry<'a> {
    Descriptor {
        key: &'a str,
        value: Option<&'a Value>,
    },
    Bare(&'a str),
    Other,
}

impl<'a> FieldEntry<'a> {
    fn classify(entry: &'a Value) -> Self {
        match entry {
            Value::Object(fields) => Self::Descriptor {
                key: fields.get("key").and_then(Value::as_str).unwrap_or(""),
                value: fields.get("value"),
            },
            Value::String(label) => Self::Bare(label),
            _ => Self::Other,
        }
    }

    fn hours_value(&self) -> Option<String> {
        match self {
            Self::Descriptor { key, value } if mentions_hours(key) => Some(render_value(*value)),
            Self::Bare(label) if mentions_hours(label) => Some(UNKNOWN_VALUE.to_string()),
            _ => None,
        }
    }
}

fn mentions_hours(text: &str) -> bool {
    text.to_lowercase().contains(HOURS_KEY)
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => UNKNOWN_VALUE.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn first_hours_value(list: &FieldList) -> Option<String> {
    list.entries()
        .iter()
        .find_map(|entry| FieldEntry::classify(entry).hours_value())
}

/// The ROI plugin this run maintains
#[derive(Debug, Clone, PartialEq)]
pub struct RoiPlugin {
    name: String,
    hours: f64,
}

impl Default for RoiPlugin {
    fn default() -> Self {
        Self {
            name: DEFAULT_PLUGIN_NAME.to_string(),
            hours: DEFAULT_HOURS_SAVED,
        }
    }
}

impl RoiPlugin {
    /// Plugin with the given name and the default hours value
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// With hours-saved value
    #[inline]
    #[must_use]
    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours = hours;
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn hours(&self) -> f64 {
        self.hours
    }

    /// Whether a plugin entry with this name is an ROI plugin
    #[must_use]
    pub fn matches(&self, plugin_name: &str) -> bool {
        plugin_name == self.name || is_roi_plugin_name(plugin_name)
    }

    /// Look for an existing hours field in any matching plugin entry.
    ///
    /// Plugins are visited in document order; within a plugin `fields` is
    /// checked before `userRoiData`.
    #[must_use]
    pub fn has_hours_field(&self, definition: &JobDefinition) -> HoursField {
        let Some(lifecycle) = definition.execution_lifecycle() else {
            return HoursField::Absent;
        };

        lifecycle
            .iter()
            .filter(|(name, _)| self.matches(name))
            .filter_map(|(_, config)| config.as_object())
            .find_map(|config| {
                first_hours_value(&FieldList::parse(config.get(LEGACY_FIELDS)))
                    .or_else(|| first_hours_value(&FieldList::parse(config.get(USER_ROI_DATA))))
            })
            .map_or(HoursField::Absent, |value| HoursField::Present { value })
    }

    /// Make sure the definition carries an hours field.
    ///
    /// Returns `true` when the definition was changed. The field is appended
    /// to the first matching plugin entry, keeping its other descriptors and
    /// config keys; if there is none, a new entry is created under this
    /// plugin's name.
    pub fn ensure_field(&self, definition: &mut JobDefinition) -> bool {
        if self.has_hours_field(definition).is_present() {
            return false;
        }

        let field = RoiField::hours(self.hours).to_value();

        if let Some(lifecycle) = definition.execution_lifecycle_mut() {
            let existing = lifecycle.iter_mut().find(|(name, _)| self.matches(name));
            if let Some((name, config)) = existing {
                let config = ensure_object(config);
                let mut entries = match FieldList::parse(config.get(USER_ROI_DATA)) {
                    FieldList::Entries(entries) => entries,
                    FieldList::Missing => Vec::new(),
                    FieldList::Malformed => {
                        tracing::warn!(plugin = %name, "invalid userRoiData, replacing it");
                        Vec::new()
                    }
                };
                entries.push(field);
                config.insert(USER_ROI_DATA.to_string(), encode(&entries));
                tracing::debug!(plugin = %name, "added hours field to existing ROI plugin");
                return true;
            }
        }

        let mut config = serde_json::Map::new();
        config.insert(USER_ROI_DATA.to_string(), encode(&[field]));
        definition
            .execution_lifecycle_or_insert()
            .insert(self.name.clone(), Value::Object(config));
        tracing::debug!(plugin = %self.name, "created ROI plugin with hours field");
        true
    }
}

fn encode(entries: &[Value]) -> Value {
    Value::String(serde_json::to_string(entries).unwrap_or_default())
}
