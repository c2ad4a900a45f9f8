//! FILENAME: core/crosstab-engine/src/normalize.rs
//! Aggregation Normalizer - Rescales a raw count matrix into percentages.
//!
//! In every percent mode the grand total reads 100 for a non-empty report.
//! Row-percent and column-percent modes report the opposite axis total as the
//! MEAN of the rescaled values, not their sum.

use crate::definition::AggregationMode;

/// A matrix with its totals after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    pub data: Vec<Vec<f64>>,
    pub row_totals: Vec<f64>,
    pub column_totals: Vec<f64>,
    pub grand_total: f64,
}

/// `value` as a percentage of `total`; 0 when the total is 0.
fn percent_of(value: f64, total: f64) -> f64 {
    if total != 0.0 {
        value / total * 100.0
    } else {
        0.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n > 0 {
        sum / n as f64
    } else {
        0.0
    }
}

/// Applies `mode` to a raw matrix and its totals.
/// Short rows read as zero in the missing columns.
pub fn normalize(
    matrix: &[Vec<f64>],
    row_totals: &[f64],
    column_totals: &[f64],
    grand_total: f64,
    mode: AggregationMode,
) -> NormalizedResult {
    let hundred_if_any = if grand_total != 0.0 { 100.0 } else { 0.0 };
    let col_count = column_totals.len();

    match mode {
        AggregationMode::Count => NormalizedResult {
            data: matrix.to_vec(),
            row_totals: row_totals.to_vec(),
            column_totals: column_totals.to_vec(),
            grand_total,
        },
        AggregationMode::PercentTotal => NormalizedResult {
            data: matrix
                .iter()
                .map(|row| row.iter().map(|&v| percent_of(v, grand_total)).collect())
                .collect(),
            row_totals: row_totals.iter().map(|&t| percent_of(t, grand_total)).collect(),
            column_totals: column_totals.iter().map(|&t| percent_of(t, grand_total)).collect(),
            grand_total: hundred_if_any,
        },
        AggregationMode::PercentRow => {
            let data: Vec<Vec<f64>> = matrix
                .iter()
                .zip(row_totals)
                .map(|(row, &total)| row.iter().map(|&v| percent_of(v, total)).collect())
                .collect();
            let column_totals = (0..col_count)
                .map(|j| mean(data.iter().map(|row| row.get(j).copied().unwrap_or(0.0))))
                .collect();
            NormalizedResult {
                row_totals: row_totals
                    .iter()
                    .map(|&t| if t != 0.0 { 100.0 } else { 0.0 })
                    .collect(),
                column_totals,
                data,
                grand_total: hundred_if_any,
            }
        }
        AggregationMode::PercentCol => {
            let data: Vec<Vec<f64>> = matrix
                .iter()
                .map(|row| {
                    row.iter()
                        .zip(column_totals)
                        .map(|(&v, &total)| percent_of(v, total))
                        .collect()
                })
                .collect();
            let row_totals = data
                .iter()
                .map(|row| mean((0..col_count).map(|j| row.get(j).copied().unwrap_or(0.0))))
                .collect();
            NormalizedResult {
                row_totals,
                column_totals: column_totals
                    .iter()
                    .map(|&t| if t != 0.0 { 100.0 } else { 0.0 })
                    .collect(),
                data,
                grand_total: hundred_if_any,
            }
        }
    }
}
