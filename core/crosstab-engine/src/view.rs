//! FILENAME: core/crosstab-engine/src/view.rs
//! Cross-Tab View - The result handed to report renderers.
//!
//! Shape invariants:
//! - `data.len() == row_labels.len()`
//! - every row of `data` has `column_labels.len()` cells
//! - totals line up with labels

use serde::{Deserialize, Serialize};

use crate::definition::{AggregationMode, Field, RecordId};

/// Echo of the resolved request, for renderer titles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabMetadata {
    pub row_field: Field,
    pub column_field: Field,
    pub aggregation_type: AggregationMode,
}

/// A dense cross-tab matrix with totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabResult {
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,

    /// rows × columns
    pub data: Vec<Vec<f64>>,

    pub row_totals: Vec<f64>,
    pub column_totals: Vec<f64>,
    pub grand_total: f64,

    pub metadata: CrossTabMetadata,
}

impl CrossTabResult {
    /// A valid 0×0 report.
    pub fn empty(metadata: CrossTabMetadata) -> Self {
        CrossTabResult {
            row_labels: Vec::new(),
            column_labels: Vec::new(),
            data: Vec::new(),
            row_totals: Vec::new(),
            column_totals: Vec::new(),
            grand_total: 0.0,
            metadata,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty() && self.column_labels.is_empty()
    }

    /// (rows, columns)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.row_labels.len(), self.column_labels.len())
    }

    /// Looks up one cell by its labels.
    pub fn cell(&self, row_label: &str, column_label: &str) -> Option<f64> {
        let row = self.row_labels.iter().position(|l| l == row_label)?;
        let col = self.column_labels.iter().position(|l| l == column_label)?;
        self.data.get(row)?.get(col).copied()
    }

    pub fn row_total(&self, row_label: &str) -> Option<f64> {
        let row = self.row_labels.iter().position(|l| l == row_label)?;
        self.row_totals.get(row).copied()
    }

    pub fn column_total(&self, column_label: &str) -> Option<f64> {
        let col = self.column_labels.iter().position(|l| l == column_label)?;
        self.column_totals.get(col).copied()
    }
}

// ============================================================================
// DRILL-DOWN
// ============================================================================

/// Records behind one cell, row or column of a cross-tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillDownResult {
    /// None means "any row".
    pub row_label: Option<String>,
    /// None means "any column".
    pub column_label: Option<String>,

    /// Matching record ids, at most `max_records`.
    pub record_ids: Vec<RecordId>,

    /// Total number of matching records.
    pub total_count: usize,

    pub max_records: usize,

    pub is_truncated: bool,
}

impl DrillDownResult {
    pub fn new(row_label: Option<String>, column_label: Option<String>, max_records: usize) -> Self {
        DrillDownResult {
            row_label,
            column_label,
            record_ids: Vec::new(),
            total_count: 0,
            max_records,
            is_truncated: false,
        }
    }
}
