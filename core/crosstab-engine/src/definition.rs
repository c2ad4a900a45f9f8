//! FILENAME: core/crosstab-engine/src/definition.rs
//! Cross-Tab Definition - The serializable request and catalog model.
//!
//! This module contains all the types needed to DESCRIBE a cross-tab report:
//! - Field declarations as the field catalog hands them out
//! - Filter descriptors as the report builder sends them
//! - The request itself (row field, column field, filters, aggregation)
//!
//! Everything here is an immutable snapshot of caller intent; the engine
//! never mutates these values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::options::OptionsSpec;

/// Identifier of a declared field in the field catalog.
pub type FieldId = u32;

/// Identifier of a record (one completed submission) in the record store.
pub type RecordId = u64;

// ============================================================================
// AGGREGATION
// ============================================================================

/// How the raw count matrix is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Distinct record counts.
    #[default]
    Count,
    /// Every cell as a percentage of the grand total.
    PercentTotal,
    /// Every cell as a percentage of its row total.
    PercentRow,
    /// Every cell as a percentage of its column total.
    PercentCol,
}

impl AggregationMode {
    /// Wire name of the mode, as used by the report UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMode::Count => "count",
            AggregationMode::PercentTotal => "percent_total",
            AggregationMode::PercentRow => "percent_row",
            AggregationMode::PercentCol => "percent_col",
        }
    }

    /// Parses a wire name. Returns None for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "count" => Some(AggregationMode::Count),
            "percent_total" => Some(AggregationMode::PercentTotal),
            "percent_row" => Some(AggregationMode::PercentRow),
            "percent_col" => Some(AggregationMode::PercentCol),
            _ => None,
        }
    }
}

// ============================================================================
// FIELD DEFINITIONS
// ============================================================================

/// The kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Numeric input; supports ordered comparisons.
    Number,
    /// Date input; supports ordered comparisons.
    Date,
    /// Flat categorical field: one atomic label per response.
    #[default]
    Select,
    /// Tree-structured categorical field: responses are comma-joined paths.
    NestedSelect,
}

impl FieldKind {
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, FieldKind::NestedSelect)
    }
}

/// A declared variable from the field catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,

    /// Internal name (e.g. "disability_type").
    pub name: String,

    /// Human readable title used by renderers.
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub kind: FieldKind,

    /// Declared options in whatever shape the catalog stored them.
    #[serde(default, alias = "optionsSpec")]
    pub options: OptionsSpec,
}

impl Field {
    pub fn new(id: FieldId, name: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            id,
            name: name.into(),
            display_name: None,
            kind,
            options: OptionsSpec::default(),
        }
    }

    pub fn with_options(mut self, options: OptionsSpec) -> Self {
        self.options = options;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Title for report headings: the display name when set, else the name.
    pub fn title(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.name)
    }

    pub fn is_hierarchical(&self) -> bool {
        self.kind.is_hierarchical()
    }

    /// Number of levels the field declares, when its options are level-shaped.
    pub fn declared_levels(&self) -> Option<usize> {
        self.options.level_count()
    }
}

// ============================================================================
// FILTER DEFINITIONS
// ============================================================================

/// Filter operators understood by the predicate builder.
///
/// Any operator name outside this list deserializes to `Unsupported`, which
/// the builder skips with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    Between,
    IsEmpty,
    IsNotEmpty,
    #[serde(other)]
    Unsupported,
}

impl FilterOperator {
    /// Parses a wire name, mapping unknown names to `Unsupported`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "equals" => FilterOperator::Equals,
            "not_equals" => FilterOperator::NotEquals,
            "contains" => FilterOperator::Contains,
            "starts_with" => FilterOperator::StartsWith,
            "ends_with" => FilterOperator::EndsWith,
            "greater_than" => FilterOperator::GreaterThan,
            "less_than" => FilterOperator::LessThan,
            "between" => FilterOperator::Between,
            "is_empty" => FilterOperator::IsEmpty,
            "is_not_empty" => FilterOperator::IsNotEmpty,
            _ => FilterOperator::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not_equals",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "starts_with",
            FilterOperator::EndsWith => "ends_with",
            FilterOperator::GreaterThan => "greater_than",
            FilterOperator::LessThan => "less_than",
            FilterOperator::Between => "between",
            FilterOperator::IsEmpty => "is_empty",
            FilterOperator::IsNotEmpty => "is_not_empty",
            FilterOperator::Unsupported => "unsupported",
        }
    }
}

/// One filter as sent by the report builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    /// The field this filter applies to.
    pub field_id: FieldId,

    pub operator: FilterOperator,

    /// Comparison value. A string or number for most operators,
    /// `[min, max]` for `between`, ignored by `is_empty`/`is_not_empty`.
    #[serde(default)]
    pub value: Value,

    /// For hierarchical fields: the 1-based tree depth the selection sits at.
    #[serde(default)]
    pub level: Option<u32>,

    /// For hierarchical fields: the label selected at each level up to `level`.
    #[serde(default)]
    pub hierarchy_path: Option<Vec<String>>,
}

impl FilterDescriptor {
    pub fn new(field_id: FieldId, operator: FilterOperator, value: impl Into<Value>) -> Self {
        FilterDescriptor {
            field_id,
            operator,
            value: value.into(),
            level: None,
            hierarchy_path: None,
        }
    }

    /// An `equals` filter selecting `path` on a hierarchical field at depth `path.len()`.
    pub fn hierarchical(field_id: FieldId, path: &[&str]) -> Self {
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        FilterDescriptor {
            field_id,
            operator: FilterOperator::Equals,
            value: Value::String(path.last().cloned().unwrap_or_default()),
            level: Some(path.len() as u32),
            hierarchy_path: Some(path),
        }
    }

    pub fn at_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// A complete cross-tab request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabRequest {
    pub row_field_id: FieldId,

    pub column_field_id: FieldId,

    /// Filters, all ANDed together.
    #[serde(default)]
    pub filters: Vec<FilterDescriptor>,

    #[serde(default, rename = "aggregationType")]
    pub aggregation: AggregationMode,
}

impl CrossTabRequest {
    pub fn new(row_field_id: FieldId, column_field_id: FieldId) -> Self {
        CrossTabRequest {
            row_field_id,
            column_field_id,
            filters: Vec::new(),
            aggregation: AggregationMode::Count,
        }
    }

    pub fn with_filter(mut self, filter: FilterDescriptor) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationMode) -> Self {
        self.aggregation = aggregation;
        self
    }
}

// ============================================================================
// ENGINE SETTINGS
// ============================================================================

/// Where observed labels missing from a field's declared options are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPlacement {
    /// Before every declared label (they sort with index -1).
    #[default]
    First,
    /// After every declared label.
    Last,
}

/// Tunables for the engine. All fields have defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    #[serde(default)]
    pub unmatched_placement: UnmatchedPlacement,

    /// Maximum record ids returned by a drill-down.
    #[serde(default = "default_drill_down_limit")]
    pub drill_down_limit: usize,
}

fn default_drill_down_limit() -> usize {
    1000
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            unmatched_placement: UnmatchedPlacement::First,
            drill_down_limit: default_drill_down_limit(),
        }
    }
}
