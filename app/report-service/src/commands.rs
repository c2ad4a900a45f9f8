//! FILENAME: app/report-service/src/commands.rs
//! PURPOSE: Commands of the interactive report builder.

use std::time::Instant;

use crosstab_engine::{compute_cross_tab_with, drill_down};

use crate::types::*;
use crate::utils::request_from_dto;
use crate::{log_enter, log_exit, log_info, log_warn, AppState};

// ============================================================================
// COMMANDS
// ============================================================================

/// Builds a cross-tab for the report builder
pub fn generate_cross_tab(
    state: &AppState,
    request: CrossTabRequestDto,
) -> Result<CrossTabResponse, String> {
    log_enter!(
        "CROSSTAB",
        "generate_cross_tab",
        "row={} col={} filters={}",
        request.row_field_id,
        request.column_field_id,
        request.filters.len()
    );
    let started = Instant::now();

    let engine_request = request_from_dto(&request);
    let settings = state.settings()?;

    let result = compute_cross_tab_with(
        &engine_request,
        state.catalog.as_ref(),
        state.store.as_ref(),
        &settings,
    )
    .map_err(|e| {
        log_warn!("CROSSTAB", "generate_cross_tab failed: {}", e);
        e.to_string()
    })?;

    let (rows, cols) = result.dimensions();
    log_info!(
        "CROSSTAB",
        "generated {}x{} mode={} grand_total={} in {:?}",
        rows,
        cols,
        engine_request.aggregation.as_str(),
        result.grand_total,
        started.elapsed()
    );
    log_exit!("CROSSTAB", "generate_cross_tab");
    Ok(result)
}

/// Lists the records behind a cell, row or column of a cross-tab
pub fn drill_down_cross_tab(
    state: &AppState,
    request: DrillDownRequestDto,
) -> Result<DrillDownResponse, String> {
    log_enter!(
        "CROSSTAB",
        "drill_down_cross_tab",
        "row_label={:?} column_label={:?}",
        request.row_label,
        request.column_label
    );

    let engine_request = request_from_dto(&request.request);
    let settings = state.settings()?;
    let max_records = request.max_records.unwrap_or(settings.drill_down_limit);

    let result = drill_down(
        &engine_request,
        request.row_label.as_deref(),
        request.column_label.as_deref(),
        max_records,
        state.catalog.as_ref(),
        state.store.as_ref(),
    )
    .map_err(|e| {
        log_warn!("CROSSTAB", "drill_down_cross_tab failed: {}", e);
        e.to_string()
    })?;

    log_exit!(
        "CROSSTAB",
        "drill_down_cross_tab",
        "total={} truncated={}",
        result.total_count,
        result.is_truncated
    );
    Ok(result)
}
