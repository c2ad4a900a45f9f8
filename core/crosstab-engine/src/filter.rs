//! FILENAME: core/crosstab-engine/src/filter.rs
//! Filter Predicate Builder - Compiles filter descriptors into a record predicate.
//!
//! Filters are best-effort: a filter that cannot be compiled (unknown field,
//! unsupported operator, ordered operator on a text field, invalid level,
//! malformed bounds) is skipped with a warning and the rest still apply.
//! All compiled conditions are ANDed.
//!
//! Hierarchical `equals` compiles to `^<escaped path>(,|$)` so that a
//! selection matches its own path and every deeper path below it.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use smallvec::SmallVec;
use thiserror::Error;

use crate::definition::{Field, FieldId, FieldKind, FilterDescriptor, FilterOperator};
use crate::error::StoreError;
use crate::hierarchy::{join_path, split_path};
use crate::store::{FieldCatalog, ResponseRecord};
use crate::LOG_FILTER;

// ============================================================================
// ORDERED SCALES
// ============================================================================

/// How values of an ordered field are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderedScale {
    Number,
    /// Dates compare by their UTC timestamp in seconds.
    Date,
}

impl OrderedScale {
    pub fn for_kind(kind: FieldKind) -> Option<Self> {
        match kind {
            FieldKind::Number => Some(OrderedScale::Number),
            FieldKind::Date => Some(OrderedScale::Date),
            _ => None,
        }
    }

    /// Maps a stored value onto the scale. None when it does not parse.
    pub fn measure(&self, raw: &str) -> Option<f64> {
        let raw = raw.trim();
        match self {
            OrderedScale::Number => raw.parse::<f64>().ok().filter(|n| n.is_finite()),
            OrderedScale::Date => parse_date(raw).map(|dt| dt.and_utc().timestamp() as f64),
        }
    }

    fn measure_value(&self, value: &Value) -> Option<f64> {
        match (self, value) {
            (OrderedScale::Number, Value::Number(n)) => n.as_f64(),
            (_, Value::String(s)) => self.measure(s),
            _ => None,
        }
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS` and RFC 3339.
fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc())
}

// ============================================================================
// CONDITIONS
// ============================================================================

#[derive(Debug, Clone)]
enum ConditionTest {
    Equals(String),
    PathPrefix(Regex),
    NotEquals(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    GreaterThan(OrderedScale, f64),
    LessThan(OrderedScale, f64),
    Between(OrderedScale, f64, f64),
    IsEmpty,
    IsNotEmpty,
}

/// One compiled filter.
#[derive(Debug, Clone)]
struct Condition {
    field_id: FieldId,
    test: ConditionTest,
}

impl Condition {
    fn evaluate(&self, value: Option<&str>) -> bool {
        // A record without the field only satisfies is_empty
        match (&self.test, value) {
            (ConditionTest::IsEmpty, v) => v.map_or(true, |s| s.trim().is_empty()),
            (ConditionTest::IsNotEmpty, v) => v.is_some_and(|s| !s.trim().is_empty()),
            (_, None) => false,
            (ConditionTest::Equals(expected), Some(v)) => v == expected.as_str(),
            // Paths are compared part-trimmed, the way labels are resolved
            (ConditionTest::PathPrefix(pattern), Some(v)) => {
                pattern.is_match(&join_path(split_path(v).as_slice()))
            }
            (ConditionTest::NotEquals(expected), Some(v)) => v != expected.as_str(),
            (ConditionTest::Contains(needle), Some(v)) => v.contains(needle.as_str()),
            (ConditionTest::StartsWith(prefix), Some(v)) => v.starts_with(prefix.as_str()),
            (ConditionTest::EndsWith(suffix), Some(v)) => v.ends_with(suffix.as_str()),
            (ConditionTest::GreaterThan(scale, bound), Some(v)) => {
                scale.measure(v).is_some_and(|m| m > *bound)
            }
            (ConditionTest::LessThan(scale, bound), Some(v)) => {
                scale.measure(v).is_some_and(|m| m < *bound)
            }
            (ConditionTest::Between(scale, min, max), Some(v)) => {
                scale.measure(v).is_some_and(|m| m >= *min && m <= *max)
            }
        }
    }
}

// ============================================================================
// RECORD PREDICATE
// ============================================================================

/// Compiled filters over a record's full response set.
#[derive(Debug, Clone, Default)]
pub struct RecordPredicate {
    conditions: Vec<Condition>,

    /// Validated level pinned on each hierarchical field.
    drill_levels: FxHashMap<FieldId, u32>,

    skipped: usize,
}

impl RecordPredicate {
    /// A predicate accepting every record.
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn matches(&self, record: &ResponseRecord) -> bool {
        self.conditions
            .iter()
            .all(|c| c.evaluate(record.value(c.field_id)))
    }

    /// The fields the predicate reads, without duplicates.
    pub fn field_ids(&self) -> SmallVec<[FieldId; 4]> {
        let mut ids: SmallVec<[FieldId; 4]> = SmallVec::new();
        for condition in &self.conditions {
            if !ids.contains(&condition.field_id) {
                ids.push(condition.field_id);
            }
        }
        ids
    }

    /// Level pinned on a hierarchical field by a filter, if any.
    pub fn drill_level(&self, field_id: FieldId) -> Option<u32> {
        self.drill_levels.get(&field_id).copied()
    }

    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Number of filters dropped during compilation.
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Why a filter was dropped.
#[derive(Error, Debug)]
pub enum FilterSkip {
    #[error("field {0} not found")]
    UnknownField(FieldId),

    #[error("field lookup failed: {0}")]
    Lookup(#[from] StoreError),

    #[error("unsupported operator")]
    UnsupportedOperator,

    #[error("operator {operator} needs a number or date field, field {field_id} is {kind:?}")]
    NotOrdered {
        operator: &'static str,
        field_id: FieldId,
        kind: FieldKind,
    },

    #[error("level {level} is out of range for field {field_id}")]
    LevelOutOfRange { field_id: FieldId, level: u32 },

    #[error("hierarchy path has {len} entries, level {level} needs at least that many")]
    PathTooShort { level: u32, len: usize },

    #[error("missing comparison value")]
    MissingValue,

    #[error("comparison value {0} does not fit the field's scale")]
    BadBound(String),

    #[error("invalid path pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Compiles filter descriptors against a field catalog.
pub struct FilterPredicateBuilder<'a> {
    catalog: &'a dyn FieldCatalog,
}

impl<'a> FilterPredicateBuilder<'a> {
    pub fn new(catalog: &'a dyn FieldCatalog) -> Self {
        FilterPredicateBuilder { catalog }
    }

    /// Compiles every filter it can; the rest are logged and skipped.
    pub fn build(&self, filters: &[FilterDescriptor]) -> RecordPredicate {
        let mut predicate = RecordPredicate::default();

        for filter in filters {
            match self.compile(filter) {
                Ok((condition, drill_level)) => {
                    if let Some(level) = drill_level {
                        predicate.drill_levels.entry(filter.field_id).or_insert(level);
                    }
                    predicate.conditions.push(condition);
                }
                Err(reason) => {
                    log::warn!(
                        target: LOG_FILTER,
                        "skipping filter field={} operator={}: {}",
                        filter.field_id,
                        filter.operator.as_str(),
                        reason
                    );
                    predicate.skipped += 1;
                }
            }
        }

        predicate
    }

    fn compile(&self, filter: &FilterDescriptor) -> Result<(Condition, Option<u32>), FilterSkip> {
        if filter.operator == FilterOperator::Unsupported {
            return Err(FilterSkip::UnsupportedOperator);
        }

        let field = self
            .catalog
            .field(filter.field_id)?
            .ok_or(FilterSkip::UnknownField(filter.field_id))?;

        let drill_level = if field.is_hierarchical() {
            validate_level(&field, filter)?
        } else {
            None
        };

        let test = match filter.operator {
            FilterOperator::Equals if field.is_hierarchical() => {
                let selected = selected_path(filter, drill_level).ok_or(FilterSkip::MissingValue)?;
                let pattern = format!("^{}(,|$)", regex::escape(&selected));
                ConditionTest::PathPrefix(Regex::new(&pattern)?)
            }
            FilterOperator::Equals => ConditionTest::Equals(value_text(filter)?),
            FilterOperator::NotEquals => ConditionTest::NotEquals(value_text(filter)?),
            FilterOperator::Contains => ConditionTest::Contains(value_text(filter)?),
            FilterOperator::StartsWith => ConditionTest::StartsWith(value_text(filter)?),
            FilterOperator::EndsWith => ConditionTest::EndsWith(value_text(filter)?),
            FilterOperator::GreaterThan => {
                let scale = ordered_scale(&field, filter.operator)?;
                ConditionTest::GreaterThan(scale, bound(scale, &filter.value)?)
            }
            FilterOperator::LessThan => {
                let scale = ordered_scale(&field, filter.operator)?;
                ConditionTest::LessThan(scale, bound(scale, &filter.value)?)
            }
            FilterOperator::Between => {
                let scale = ordered_scale(&field, filter.operator)?;
                match filter.value.as_array().map(Vec::as_slice) {
                    Some([min, max]) => {
                        ConditionTest::Between(scale, bound(scale, min)?, bound(scale, max)?)
                    }
                    _ => return Err(FilterSkip::BadBound(filter.value.to_string())),
                }
            }
            FilterOperator::IsEmpty => ConditionTest::IsEmpty,
            FilterOperator::IsNotEmpty => ConditionTest::IsNotEmpty,
            FilterOperator::Unsupported => return Err(FilterSkip::UnsupportedOperator),
        };

        Ok((
            Condition {
                field_id: filter.field_id,
                test,
            },
            drill_level,
        ))
    }
}

/// Checks a caller-supplied level against the field's declared tree.
fn validate_level(field: &Field, filter: &FilterDescriptor) -> Result<Option<u32>, FilterSkip> {
    let Some(level) = filter.level else {
        return Ok(None);
    };

    let out_of_range = level == 0
        || field
            .declared_levels()
            .is_some_and(|declared| level as usize > declared);
    if out_of_range {
        return Err(FilterSkip::LevelOutOfRange {
            field_id: field.id,
            level,
        });
    }

    if let Some(path) = &filter.hierarchy_path {
        if path.len() < level as usize {
            return Err(FilterSkip::PathTooShort {
                level,
                len: path.len(),
            });
        }
    }

    Ok(Some(level))
}

/// The comma-joined path selected at the filter's level.
fn selected_path(filter: &FilterDescriptor, level: Option<u32>) -> Option<String> {
    let selected = match (&filter.hierarchy_path, level) {
        (Some(path), Some(level)) => join_path(&path[..level as usize]),
        (Some(path), None) if !path.is_empty() => join_path(path),
        _ => text_of(&filter.value)?,
    };
    if selected.trim().is_empty() {
        None
    } else {
        Some(selected)
    }
}

fn value_text(filter: &FilterDescriptor) -> Result<String, FilterSkip> {
    text_of(&filter.value).ok_or(FilterSkip::MissingValue)
}

/// Renders a filter value as comparison text. Arrays are joined as paths.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Option<Vec<String>> = items.iter().map(text_of).collect();
            parts.map(|p| join_path(&p))
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn ordered_scale(field: &Field, operator: FilterOperator) -> Result<OrderedScale, FilterSkip> {
    OrderedScale::for_kind(field.kind).ok_or(FilterSkip::NotOrdered {
        operator: operator.as_str(),
        field_id: field.id,
        kind: field.kind,
    })
}

fn bound(scale: OrderedScale, value: &Value) -> Result<f64, FilterSkip> {
    scale
        .measure_value(value)
        .ok_or_else(|| FilterSkip::BadBound(value.to_string()))
}
