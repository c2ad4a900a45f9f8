//! FILENAME: app/report-service/src/utils.rs
use crate::log_warn;
use crate::types::*;
use crosstab_engine::{AggregationMode, CrossTabRequest, FilterDescriptor, FilterOperator};

// ============================================================================
// STRING TO ENGINE CONVERTERS
// ============================================================================

/// Parses an aggregation name. Missing or unknown names fall back to count.
pub(crate) fn parse_aggregation(name: Option<&str>) -> AggregationMode {
    match name {
        None => AggregationMode::Count,
        Some(name) => AggregationMode::from_name(name).unwrap_or_else(|| {
            log_warn!("CROSSTAB", "unknown aggregationType '{}', using count", name);
            AggregationMode::Count
        }),
    }
}

/// Parses an operator name. Unknown names survive as `Unsupported`, which the
/// engine skips.
pub(crate) fn parse_operator(name: &str) -> FilterOperator {
    FilterOperator::from_name(name)
}

pub(crate) fn filter_from_dto(dto: &FilterDto) -> FilterDescriptor {
    FilterDescriptor {
        field_id: dto.field_id,
        operator: parse_operator(&dto.operator),
        value: dto.value.clone(),
        level: dto.level,
        hierarchy_path: dto.hierarchy_path.clone(),
    }
}

/// Converts a request DTO into the engine request.
pub fn request_from_dto(dto: &CrossTabRequestDto) -> CrossTabRequest {
    CrossTabRequest {
        row_field_id: dto.row_field_id,
        column_field_id: dto.column_field_id,
        filters: dto.filters.iter().map(filter_from_dto).collect(),
        aggregation: parse_aggregation(dto.aggregation_type.as_deref()),
    }
}
