//! FILENAME: app/report-service/src/types.rs
use crosstab_engine::{CrossTabResult, DrillDownResult, FieldId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One filter as sent by the report builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDto {
    pub field_id: FieldId,
    /// "equals", "not_equals", "contains", "starts_with", "ends_with",
    /// "greater_than", "less_than", "between", "is_empty", "is_not_empty"
    pub operator: String,
    #[serde(default)]
    pub value: Value,
    /// 1-based level pinned on a nested-select field
    #[serde(default)]
    pub level: Option<u32>,
    /// Selected path, root first
    #[serde(default)]
    pub hierarchy_path: Option<Vec<String>>,
}

/// Request to build a cross-tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabRequestDto {
    pub row_field_id: FieldId,
    pub column_field_id: FieldId,
    #[serde(default)]
    pub filters: Vec<FilterDto>,
    /// "count", "percent_total", "percent_row", "percent_col"
    #[serde(default)]
    pub aggregation_type: Option<String>,
}

/// Request for the records behind a cell, row or column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillDownRequestDto {
    pub request: CrossTabRequestDto,
    #[serde(default)]
    pub row_label: Option<String>,
    #[serde(default)]
    pub column_label: Option<String>,
    /// Defaults to the configured drill-down limit
    #[serde(default)]
    pub max_records: Option<usize>,
}

/// Response of `generate_cross_tab`; already camelCase on the wire
pub type CrossTabResponse = CrossTabResult;

/// Response of `drill_down_cross_tab`
pub type DrillDownResponse = DrillDownResult;
