//! FILENAME: core/crosstab-engine/src/options.rs
//! Field Option Parser - Canonical option order for sorting labels.
//!
//! Option metadata in the field catalog has been stored in several shapes
//! over time. `OptionsSpec` names each shape explicitly and `parse_options`
//! is total over it: every spec yields an ordered list of labels, degrading
//! to a one-element list holding the raw input when nothing else fits.
//!
//! Shapes:
//! - `Flat`: `["Male", "Female"]`
//! - `Keyed`: `[{"value": "M", "label": "Male"}, ...]`
//! - `Grammar`: `"Parent: child1, child2"` per line; bare lines are leaves
//! - `Levels`: `[{"name": "District", "options": <any shape>}, ...]`
//! - `Raw`: anything else, kept verbatim

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::LOG_OPTIONS;

// ============================================================================
// OPTION SHAPES
// ============================================================================

/// One entry of a keyed option list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionEntry {
    pub value: Option<String>,
    pub label: Option<String>,
}

impl OptionEntry {
    /// The sort key of this entry: the first non-empty of value, label.
    pub fn key(&self) -> Option<&str> {
        [self.value.as_deref(), self.label.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// One level of a hierarchical field.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSpec {
    pub name: Option<String>,
    pub options: OptionsSpec,
}

/// A field's declared options, classified by storage shape.
///
/// Serializes to and from the plain JSON the catalog stores, so a `Field`
/// deserialized from any legacy shape lands in the matching variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum OptionsSpec {
    Flat(Vec<String>),
    Keyed(Vec<OptionEntry>),
    Grammar(String),
    Levels(Vec<LevelSpec>),
    Raw(Value),
}

impl Default for OptionsSpec {
    fn default() -> Self {
        OptionsSpec::Flat(Vec::new())
    }
}

impl OptionsSpec {
    pub fn flat<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        OptionsSpec::Flat(labels.into_iter().map(Into::into).collect())
    }

    /// Classifies a stored JSON value into one of the known shapes.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => OptionsSpec::Flat(Vec::new()),
            Value::String(s) => Self::from_text(s),
            Value::Array(items) => Self::from_array(items),
            Value::Object(map) => match map.get("options") {
                Some(inner) => Self::from_value(inner),
                None => OptionsSpec::Raw(value.clone()),
            },
            Value::Number(_) | Value::Bool(_) => OptionsSpec::Raw(value.clone()),
        }
    }

    fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return OptionsSpec::Flat(Vec::new());
        }

        // Some rows hold the JSON document as a string column
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            if let Ok(decoded) = serde_json::from_str::<Value>(trimmed) {
                return Self::from_value(&decoded);
            }
        }

        OptionsSpec::Grammar(text.to_string())
    }

    fn from_array(items: &[Value]) -> Self {
        if items.iter().all(Value::is_string) {
            return OptionsSpec::Flat(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            );
        }

        let is_levels = items
            .iter()
            .any(|v| v.as_object().is_some_and(|m| m.contains_key("options")));
        if is_levels {
            return OptionsSpec::Levels(
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|level| LevelSpec {
                        name: text_of(level.get("name")).or_else(|| text_of(level.get("label"))),
                        options: level
                            .get("options")
                            .map(Self::from_value)
                            .unwrap_or_default(),
                    })
                    .collect(),
            );
        }

        OptionsSpec::Keyed(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => OptionEntry {
                        value: text_of(map.get("value")),
                        label: text_of(map.get("label")),
                    },
                    other => OptionEntry {
                        value: text_of(Some(other)),
                        label: None,
                    },
                })
                .collect(),
        )
    }

    /// Number of tree levels, for level-shaped specs.
    pub fn level_count(&self) -> Option<usize> {
        match self {
            OptionsSpec::Levels(levels) => Some(levels.len()),
            _ => None,
        }
    }
}

/// Renders a scalar JSON value as option text.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl From<Value> for OptionsSpec {
    fn from(value: Value) -> Self {
        OptionsSpec::from_value(&value)
    }
}

impl From<OptionsSpec> for Value {
    fn from(spec: OptionsSpec) -> Self {
        match spec {
            OptionsSpec::Flat(labels) => Value::Array(labels.into_iter().map(Value::String).collect()),
            OptionsSpec::Keyed(entries) => Value::Array(
                entries
                    .into_iter()
                    .map(|entry| {
                        let mut map = Map::new();
                        if let Some(value) = entry.value {
                            map.insert("value".to_string(), Value::String(value));
                        }
                        if let Some(label) = entry.label {
                            map.insert("label".to_string(), Value::String(label));
                        }
                        Value::Object(map)
                    })
                    .collect(),
            ),
            OptionsSpec::Grammar(text) => Value::String(text),
            OptionsSpec::Levels(levels) => Value::Array(
                levels
                    .into_iter()
                    .map(|level| {
                        let mut map = Map::new();
                        if let Some(name) = level.name {
                            map.insert("name".to_string(), Value::String(name));
                        }
                        map.insert("options".to_string(), Value::from(level.options));
                        Value::Object(map)
                    })
                    .collect(),
            ),
            OptionsSpec::Raw(value) => value,
        }
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Flattens a spec into its canonical ordered label list. Never fails.
pub fn parse_options(spec: &OptionsSpec) -> Vec<String> {
    match spec {
        OptionsSpec::Flat(labels) => labels.clone(),
        OptionsSpec::Keyed(entries) => entries
            .iter()
            .filter_map(OptionEntry::key)
            .map(str::to_string)
            .collect(),
        OptionsSpec::Grammar(text) => {
            let parsed = parse_grammar(text);
            if parsed.is_empty() {
                log::debug!(target: LOG_OPTIONS, "option grammar yielded nothing, keeping raw text");
                vec![text.clone()]
            } else {
                parsed
            }
        }
        OptionsSpec::Levels(levels) => levels
            .iter()
            .flat_map(|level| parse_options(&level.options))
            .collect(),
        OptionsSpec::Raw(value) => {
            log::debug!(target: LOG_OPTIONS, "unrecognized option shape: {}", value);
            match value {
                Value::String(s) => vec![s.clone()],
                other => vec![other.to_string()],
            }
        }
    }
}

/// Convenience: classify stored JSON and flatten it in one step.
pub fn parse_options_value(value: &Value) -> Vec<String> {
    parse_options(&OptionsSpec::from_value(value))
}

/// Parses the `"Parent: child1, child2"` line grammar.
/// Lines without a colon are bare leaves (comma separated).
fn parse_grammar(text: &str) -> Vec<String> {
    let mut out = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let children = match line.split_once(':') {
            Some((parent, children)) => {
                let parent = parent.trim();
                if !parent.is_empty() {
                    out.push(parent.to_string());
                }
                children
            }
            None => line,
        };

        out.extend(
            children
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    }

    out
}
