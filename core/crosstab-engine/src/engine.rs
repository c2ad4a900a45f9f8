//! FILENAME: core/crosstab-engine/src/engine.rs
//! Cross-Tab Engine - The calculation core that turns responses into a matrix.
//!
//! Takes a CrossTabRequest (configuration), a FieldCatalog and a RecordStore
//! (data) and produces a CrossTabResult (dense matrix ready for rendering).
//!
//! Algorithm:
//! 1. Resolve row/column fields through the catalog (missing field is fatal)
//! 2. Compile filters into a record predicate (bad filters are skipped)
//! 3. Fetch records and resolve each record's row/column label
//! 4. Count distinct records per (row, column) pair, crediting ancestors
//! 5. Order labels by the fields' declared option order
//! 6. Densify, total, and normalize into the requested aggregation mode

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use crate::definition::{
    AggregationMode, CrossTabRequest, EngineSettings, Field, FieldId, RecordId,
    UnmatchedPlacement,
};
use crate::error::CrossTabError;
use crate::filter::{FilterPredicateBuilder, RecordPredicate};
use crate::hierarchy::HierarchyResolver;
use crate::normalize::normalize;
use crate::options::parse_options;
use crate::store::{FieldCatalog, RecordStore, ResponseRecord};
use crate::view::{CrossTabMetadata, CrossTabResult, DrillDownResult};
use crate::LOG_CROSSTAB;

/// Index of an interned axis label.
pub type LabelId = u32;

/// A (row label, column label) pair.
type CellKey = (LabelId, LabelId);

// ============================================================================
// LABEL INTERNING
// ============================================================================

/// Distinct labels of one axis, in first-appearance order.
#[derive(Debug, Clone, Default)]
struct LabelIndex {
    label_to_id: FxHashMap<String, LabelId>,
    id_to_label: Vec<String>,
}

impl LabelIndex {
    fn intern(&mut self, label: String) -> LabelId {
        if let Some(&id) = self.label_to_id.get(&label) {
            return id;
        }
        let id = self.id_to_label.len() as LabelId;
        self.id_to_label.push(label.clone());
        self.label_to_id.insert(label, id);
        id
    }

    fn get(&self, label: &str) -> Option<LabelId> {
        self.label_to_id.get(label).copied()
    }

    fn labels(&self) -> &[String] {
        &self.id_to_label
    }
}

// ============================================================================
// AXIS RESOLUTION
// ============================================================================

/// Maps stored values of one axis field to display labels.
#[derive(Debug, Clone, Copy)]
enum AxisResolver {
    Flat,
    Hierarchical(HierarchyResolver),
}

impl AxisResolver {
    fn for_field(field: &Field, predicate: &RecordPredicate) -> Self {
        if field.is_hierarchical() {
            AxisResolver::Hierarchical(HierarchyResolver::new(predicate.drill_level(field.id)))
        } else {
            AxisResolver::Flat
        }
    }

    fn label(&self, stored: &str) -> Option<String> {
        match self {
            AxisResolver::Flat => {
                let label = stored.trim();
                (!label.is_empty()).then(|| label.to_string())
            }
            AxisResolver::Hierarchical(resolver) => resolver.resolve(stored),
        }
    }

    fn ancestors(&self, stored: &str, displayed: &str) -> Vec<String> {
        match self {
            AxisResolver::Flat => Vec::new(),
            AxisResolver::Hierarchical(resolver) => resolver.ancestors(stored, displayed),
        }
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Distinct-record counts per label pair, before ordering.
#[derive(Debug, Clone, Default)]
pub struct RawCrossTab {
    row_labels: LabelIndex,
    column_labels: LabelIndex,
    counts: FxHashMap<CellKey, u64>,

    /// The cells each counted record contributed to.
    memberships: Vec<(RecordId, SmallVec<[CellKey; 4]>)>,
}

impl RawCrossTab {
    /// Observed row labels in first-appearance order.
    pub fn row_labels(&self) -> &[String] {
        self.row_labels.labels()
    }

    /// Observed column labels in first-appearance order.
    pub fn column_labels(&self) -> &[String] {
        self.column_labels.labels()
    }

    /// Distinct records counted under (row, column).
    pub fn count(&self, row_label: &str, column_label: &str) -> u64 {
        match (self.row_labels.get(row_label), self.column_labels.get(column_label)) {
            (Some(r), Some(c)) => self.counts.get(&(r, c)).copied().unwrap_or(0),
            _ => 0,
        }
    }

    /// Number of records that contributed at least one count.
    pub fn record_count(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }

    fn count_by_id(&self, row: LabelId, col: LabelId) -> u64 {
        self.counts.get(&(row, col)).copied().unwrap_or(0)
    }
}

/// A record that passed the predicate, with its resolved labels.
struct ResolvedRecord {
    record_id: RecordId,
    row: LabelId,
    column: LabelId,
    row_ancestors: Vec<String>,
    column_ancestors: Vec<String>,
}

/// Counts distinct records per (row label, column label).
///
/// Records failing `predicate`, or without a usable value on either axis,
/// are skipped. Returned records must carry the values of every field the
/// predicate reads.
///
/// A record is also credited to the displayed ancestors of its label. With
/// no drill level every label is a root and has no ancestors, so this never
/// adds a cell; a pinned level switches propagation off.
pub fn aggregate(
    row_field: &Field,
    column_field: &Field,
    predicate: &RecordPredicate,
    records: &[ResponseRecord],
) -> RawCrossTab {
    let row_axis = AxisResolver::for_field(row_field, predicate);
    let column_axis = AxisResolver::for_field(column_field, predicate);

    let mut raw = RawCrossTab::default();
    let mut resolved = Vec::with_capacity(records.len());

    for record in records {
        if !predicate.matches(record) {
            continue;
        }

        let (Some(row_value), Some(column_value)) =
            (record.value(row_field.id), record.value(column_field.id))
        else {
            continue;
        };

        let (Some(row_label), Some(column_label)) =
            (row_axis.label(row_value), column_axis.label(column_value))
        else {
            continue;
        };

        let row_ancestors = row_axis.ancestors(row_value, &row_label);
        let column_ancestors = column_axis.ancestors(column_value, &column_label);

        resolved.push(ResolvedRecord {
            record_id: record.record_id,
            row: raw.row_labels.intern(row_label),
            column: raw.column_labels.intern(column_label),
            row_ancestors,
            column_ancestors,
        });
    }

    // Ancestors are credited only once every displayed label is known
    for record in resolved {
        let rows = with_displayed_ancestors(record.row, &record.row_ancestors, &raw.row_labels);
        let columns =
            with_displayed_ancestors(record.column, &record.column_ancestors, &raw.column_labels);

        let mut cells: SmallVec<[CellKey; 4]> = SmallVec::new();
        for &r in &rows {
            for &c in &columns {
                if !cells.contains(&(r, c)) {
                    cells.push((r, c));
                }
            }
        }

        for cell in &cells {
            *raw.counts.entry(*cell).or_insert(0) += 1;
        }
        raw.memberships.push((record.record_id, cells));
    }

    raw
}

fn with_displayed_ancestors(
    label: LabelId,
    ancestors: &[String],
    displayed: &LabelIndex,
) -> SmallVec<[LabelId; 4]> {
    let mut ids: SmallVec<[LabelId; 4]> = smallvec![label];
    for id in ancestors.iter().filter_map(|a| displayed.get(a)) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

// ============================================================================
// LABEL ORDERING
// ============================================================================

/// Positions of `observed` sorted by their index in `canonical`.
/// The sort is stable, so unmatched labels keep their relative order.
fn label_order(observed: &[String], canonical: &[String], placement: UnmatchedPlacement) -> Vec<usize> {
    let mut positions: FxHashMap<&str, i64> = FxHashMap::default();
    for (i, label) in canonical.iter().enumerate() {
        positions.entry(label.trim()).or_insert(i as i64);
    }

    let unmatched = match placement {
        UnmatchedPlacement::First => -1,
        UnmatchedPlacement::Last => i64::MAX,
    };

    let mut order: Vec<usize> = (0..observed.len()).collect();
    order.sort_by_key(|&i| {
        positions
            .get(observed[i].trim())
            .copied()
            .unwrap_or(unmatched)
    });
    order
}

/// Sorts observed labels by a field's canonical option order.
pub fn order_labels(
    observed: &[String],
    canonical: &[String],
    placement: UnmatchedPlacement,
) -> Vec<String> {
    label_order(observed, canonical, placement)
        .into_iter()
        .map(|i| observed[i].clone())
        .collect()
}

// ============================================================================
// CROSS-TAB CALCULATOR
// ============================================================================

/// Builds a CrossTabResult from already-fetched records.
pub struct CrossTabCalculator<'a> {
    row_field: &'a Field,
    column_field: &'a Field,
    predicate: &'a RecordPredicate,
    aggregation: AggregationMode,
    settings: &'a EngineSettings,
}

impl<'a> CrossTabCalculator<'a> {
    pub fn new(
        row_field: &'a Field,
        column_field: &'a Field,
        predicate: &'a RecordPredicate,
        aggregation: AggregationMode,
        settings: &'a EngineSettings,
    ) -> Self {
        CrossTabCalculator {
            row_field,
            column_field,
            predicate,
            aggregation,
            settings,
        }
    }

    /// Executes the full calculation.
    pub fn calculate(&self, records: &[ResponseRecord]) -> CrossTabResult {
        let raw = aggregate(self.row_field, self.column_field, self.predicate, records);
        self.build_result(&raw)
    }

    fn metadata(&self) -> CrossTabMetadata {
        CrossTabMetadata {
            row_field: self.row_field.clone(),
            column_field: self.column_field.clone(),
            aggregation_type: self.aggregation,
        }
    }

    /// Orders, densifies, totals and normalizes an aggregation.
    pub fn build_result(&self, raw: &RawCrossTab) -> CrossTabResult {
        if raw.is_empty() {
            log::debug!(
                target: LOG_CROSSTAB,
                "no records matched row_field={} column_field={}",
                self.row_field.id,
                self.column_field.id
            );
            return CrossTabResult::empty(self.metadata());
        }

        let placement = self.settings.unmatched_placement;
        let row_order = label_order(raw.row_labels(), &parse_options(&self.row_field.options), placement);
        let col_order = label_order(
            raw.column_labels(),
            &parse_options(&self.column_field.options),
            placement,
        );

        let matrix: Vec<Vec<f64>> = row_order
            .iter()
            .map(|&r| {
                col_order
                    .iter()
                    .map(|&c| raw.count_by_id(r as LabelId, c as LabelId) as f64)
                    .collect()
            })
            .collect();

        let row_totals: Vec<f64> = matrix.iter().map(|row| row.iter().sum()).collect();
        let column_totals: Vec<f64> = (0..col_order.len())
            .map(|j| matrix.iter().map(|row| row[j]).sum())
            .collect();
        let grand_total: f64 = row_totals.iter().sum();

        let normalized = normalize(&matrix, &row_totals, &column_totals, grand_total, self.aggregation);

        log::debug!(
            target: LOG_CROSSTAB,
            "cross-tab rows={} cols={} records={} mode={}",
            row_order.len(),
            col_order.len(),
            raw.record_count(),
            self.aggregation.as_str()
        );

        CrossTabResult {
            row_labels: row_order.iter().map(|&i| raw.row_labels()[i].clone()).collect(),
            column_labels: col_order.iter().map(|&i| raw.column_labels()[i].clone()).collect(),
            data: normalized.data,
            row_totals: normalized.row_totals,
            column_totals: normalized.column_totals,
            grand_total: normalized.grand_total,
            metadata: self.metadata(),
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Resolves a row/column field; a missing field fails the request.
pub fn resolve_field(catalog: &dyn FieldCatalog, id: FieldId) -> Result<Field, CrossTabError> {
    catalog.field(id)?.ok_or(CrossTabError::FieldNotFound(id))
}

/// Fields, predicate and records of one request.
struct PreparedRequest {
    row_field: Field,
    column_field: Field,
    predicate: RecordPredicate,
    records: Vec<ResponseRecord>,
}

fn prepare(
    request: &CrossTabRequest,
    catalog: &dyn FieldCatalog,
    store: &dyn RecordStore,
) -> Result<PreparedRequest, CrossTabError> {
    let row_field = resolve_field(catalog, request.row_field_id)?;
    let column_field = resolve_field(catalog, request.column_field_id)?;

    let predicate = FilterPredicateBuilder::new(catalog).build(&request.filters);

    let mut field_ids: SmallVec<[FieldId; 6]> = smallvec![row_field.id];
    for id in std::iter::once(column_field.id).chain(predicate.field_ids()) {
        if !field_ids.contains(&id) {
            field_ids.push(id);
        }
    }

    let records = store.records_matching(&field_ids, &predicate)?;

    log::debug!(
        target: LOG_CROSSTAB,
        "prepared row_field={} column_field={} filters={}/{} records={}",
        row_field.id,
        column_field.id,
        predicate.condition_count(),
        request.filters.len(),
        records.len()
    );

    Ok(PreparedRequest {
        row_field,
        column_field,
        predicate,
        records,
    })
}

/// Computes a cross-tab with default settings.
/// This is the main entry point for the calculation engine.
pub fn compute_cross_tab(
    request: &CrossTabRequest,
    catalog: &dyn FieldCatalog,
    store: &dyn RecordStore,
) -> Result<CrossTabResult, CrossTabError> {
    compute_cross_tab_with(request, catalog, store, &EngineSettings::default())
}

/// Computes a cross-tab with explicit settings.
pub fn compute_cross_tab_with(
    request: &CrossTabRequest,
    catalog: &dyn FieldCatalog,
    store: &dyn RecordStore,
    settings: &EngineSettings,
) -> Result<CrossTabResult, CrossTabError> {
    let prepared = prepare(request, catalog, store)?;
    let calculator = CrossTabCalculator::new(
        &prepared.row_field,
        &prepared.column_field,
        &prepared.predicate,
        request.aggregation,
        settings,
    );
    Ok(calculator.calculate(&prepared.records))
}

/// Lists the records behind one cell. Omitting a label widens the
/// drill-down to the whole column (row label None) or row (column label None).
pub fn drill_down(
    request: &CrossTabRequest,
    row_label: Option<&str>,
    column_label: Option<&str>,
    max_records: usize,
    catalog: &dyn FieldCatalog,
    store: &dyn RecordStore,
) -> Result<DrillDownResult, CrossTabError> {
    let prepared = prepare(request, catalog, store)?;
    let raw = aggregate(
        &prepared.row_field,
        &prepared.column_field,
        &prepared.predicate,
        &prepared.records,
    );

    let mut result = DrillDownResult::new(
        row_label.map(str::to_string),
        column_label.map(str::to_string),
        max_records,
    );

    let row_id = match row_label {
        Some(label) => match raw.row_labels.get(label) {
            Some(id) => Some(id),
            None => return Ok(result),
        },
        None => None,
    };
    let column_id = match column_label {
        Some(label) => match raw.column_labels.get(label) {
            Some(id) => Some(id),
            None => return Ok(result),
        },
        None => None,
    };

    for (record_id, cells) in &raw.memberships {
        let hit = cells.iter().any(|&(r, c)| {
            row_id.map_or(true, |id| id == r) && column_id.map_or(true, |id| id == c)
        });
        if hit {
            result.total_count += 1;
            if result.record_ids.len() < max_records {
                result.record_ids.push(*record_id);
            }
        }
    }

    result.is_truncated = result.total_count > max_records;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{FieldKind, FilterDescriptor, FilterOperator};
    use crate::error::StoreError;
    use crate::options::OptionsSpec;
    use crate::store::MemoryStore;
    use serde_json::json;

    const GENDER: FieldId = 1;
    const DISABILITY: FieldId = 2;
    const LOCATION: FieldId = 3;
    const AGE: FieldId = 4;

    fn create_test_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_field(
            Field::new(GENDER, "gender", FieldKind::Select)
                .with_display_name("Gender")
                .with_options(OptionsSpec::flat(["Male", "Female"])),
        );
        store.add_field(
            Field::new(DISABILITY, "disability_type", FieldKind::Select)
                .with_display_name("DisabilityType")
                .with_options(OptionsSpec::flat(["Visual", "Hearing"])),
        );
        store.add_field(
            Field::new(LOCATION, "location", FieldKind::NestedSelect).with_options(
                OptionsSpec::from_value(&json!([
                    {"name": "District", "options": ["A", "E"]},
                    {"name": "Taluka", "options": "A: B, D\nE: F"},
                    {"name": "Village", "options": "B: C"},
                ])),
            ),
        );
        store.add_field(Field::new(AGE, "age", FieldKind::Number));

        // Inserted Female first so label order has to come from the options
        store.add_record(1, &[(GENDER, "Female"), (DISABILITY, "Visual"), (AGE, "41")]);
        store.add_record(2, &[(GENDER, "Male"), (DISABILITY, "Hearing"), (AGE, "17")]);
        store.add_record(3, &[(GENDER, "Male"), (DISABILITY, "Visual"), (AGE, "30")]);
        store
    }

    fn create_location_store() -> MemoryStore {
        let mut store = create_test_store();
        store.add_response(1, LOCATION, "A,B,C");
        store.add_response(2, LOCATION, "A,B");
        store.add_response(3, LOCATION, "A,D");
        store.add_record(4, &[(GENDER, "Female"), (LOCATION, "E,F")]);
        store
    }

    #[test]
    fn test_gender_by_disability_counts() {
        let store = create_test_store();
        let request = CrossTabRequest::new(GENDER, DISABILITY);

        let result = compute_cross_tab(&request, &store, &store).unwrap();

        assert_eq!(result.row_labels, vec!["Male", "Female"]);
        assert_eq!(result.column_labels, vec!["Visual", "Hearing"]);
        assert_eq!(result.data, vec![vec![1.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(result.row_totals, vec![2.0, 1.0]);
        assert_eq!(result.column_totals, vec![2.0, 1.0]);
        assert_eq!(result.grand_total, 3.0);
        assert_eq!(result.metadata.row_field.title(), "Gender");
        assert_eq!(result.metadata.column_field.title(), "DisabilityType");
    }

    #[test]
    fn test_gender_by_disability_percent_total() {
        let store = create_test_store();
        let request = CrossTabRequest::new(GENDER, DISABILITY)
            .with_aggregation(AggregationMode::PercentTotal);

        let result = compute_cross_tab(&request, &store, &store).unwrap();

        assert_eq!(result.grand_total, 100.0);
        assert!((result.data[0][0] - 33.3).abs() < 0.1);
        assert!((result.data[0][1] - 33.3).abs() < 0.1);
        assert!((result.data[1][0] - 33.3).abs() < 0.1);
        assert_eq!(result.data[1][1], 0.0);
        assert_eq!(result.metadata.aggregation_type, AggregationMode::PercentTotal);
    }

    #[test]
    fn test_filters_excluding_everything_give_empty_result() {
        let store = create_test_store();
        let request = CrossTabRequest::new(GENDER, DISABILITY).with_filter(FilterDescriptor::new(
            GENDER,
            FilterOperator::Equals,
            "Nobody",
        ));

        let result = compute_cross_tab(&request, &store, &store).unwrap();

        assert!(result.is_empty());
        assert!(result.data.is_empty());
        assert!(result.row_totals.is_empty());
        assert_eq!(result.grand_total, 0.0);
    }

    #[test]
    fn test_missing_axis_field_is_fatal() {
        let store = create_test_store();
        let request = CrossTabRequest::new(GENDER, 99);

        let err = compute_cross_tab(&request, &store, &store).unwrap_err();
        assert_eq!(err, CrossTabError::FieldNotFound(99));
    }

    #[test]
    fn test_store_failure_is_fatal() {
        struct DownStore;
        impl RecordStore for DownStore {
            fn records(&self, _: &[FieldId]) -> Result<Vec<ResponseRecord>, StoreError> {
                Err(StoreError::Unavailable("connection refused".to_string()))
            }
        }

        let store = create_test_store();
        let err = compute_cross_tab(&CrossTabRequest::new(GENDER, DISABILITY), &store, &DownStore)
            .unwrap_err();
        assert!(matches!(err, CrossTabError::Store(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_records_missing_an_axis_value_are_excluded() {
        let mut store = create_test_store();
        store.add_record(10, &[(GENDER, "Male")]);
        store.add_record(11, &[(GENDER, "  "), (DISABILITY, "Visual")]);

        let result = compute_cross_tab(&CrossTabRequest::new(GENDER, DISABILITY), &store, &store).unwrap();
        assert_eq!(result.grand_total, 3.0);
    }

    #[test]
    fn test_skipped_filter_does_not_fail_request() {
        let store = create_test_store();
        let request = CrossTabRequest::new(GENDER, DISABILITY)
            .with_filter(FilterDescriptor::new(GENDER, FilterOperator::GreaterThan, 3))
            .with_filter(FilterDescriptor::new(AGE, FilterOperator::GreaterThan, 18));

        let result = compute_cross_tab(&request, &store, &store).unwrap();

        // Only the age filter applied: record 2 (17) is gone
        assert_eq!(result.grand_total, 2.0);
        assert_eq!(result.column_labels, vec!["Visual"]);
    }

    #[test]
    fn test_hierarchical_rows_group_at_root_with_ancestor_credit() {
        let store = create_location_store();
        let request = CrossTabRequest::new(LOCATION, GENDER);

        let result = compute_cross_tab(&request, &store, &store).unwrap();

        assert_eq!(result.row_labels, vec!["A", "E"]);
        // "A,B,C" counts toward root label "A"
        assert_eq!(result.cell("A", "Female"), Some(1.0));
        assert_eq!(result.cell("A", "Male"), Some(2.0));
        assert_eq!(result.row_total("A"), Some(3.0));
        assert_eq!(result.row_total("E"), Some(1.0));
    }

    #[test]
    fn test_drill_level_shows_next_level_down() {
        let store = create_location_store();
        let request = CrossTabRequest::new(LOCATION, GENDER)
            .with_filter(FilterDescriptor::hierarchical(LOCATION, &["A"]));

        let result = compute_cross_tab(&request, &store, &store).unwrap();

        assert_eq!(result.row_labels, vec!["B", "D"]);
        assert_eq!(result.cell("B", "Female"), Some(1.0));
        assert_eq!(result.cell("B", "Male"), Some(1.0));
        assert_eq!(result.cell("D", "Male"), Some(1.0));
        assert_eq!(result.grand_total, 3.0);
    }

    #[test]
    fn test_drill_level_two_falls_back_for_shallow_records() {
        let store = create_location_store();
        let request = CrossTabRequest::new(LOCATION, GENDER)
            .with_filter(FilterDescriptor::hierarchical(LOCATION, &["A", "B"]));

        let result = compute_cross_tab(&request, &store, &store).unwrap();

        // Record 1 goes on to "C"; record 2 stops at "B"
        assert_eq!(result.row_labels, vec!["B", "C"]);
        assert_eq!(result.cell("C", "Female"), Some(1.0));
        assert_eq!(result.cell("B", "Male"), Some(1.0));
    }

    #[test]
    fn test_spaced_paths_survive_a_level_two_drill() {
        let mut store = create_test_store();
        store.add_response(1, LOCATION, "A, B");
        store.add_response(2, LOCATION, "A,B,C");

        let root = compute_cross_tab(&CrossTabRequest::new(LOCATION, GENDER), &store, &store).unwrap();
        assert_eq!(root.row_labels, vec!["A"]);
        assert_eq!(root.grand_total, 2.0);

        let request = CrossTabRequest::new(LOCATION, GENDER)
            .with_filter(FilterDescriptor::hierarchical(LOCATION, &["A", "B"]));
        let drilled = compute_cross_tab(&request, &store, &store).unwrap();

        assert_eq!(drilled.row_labels, vec!["B", "C"]);
        assert_eq!(drilled.cell("B", "Female"), Some(1.0));
        assert_eq!(drilled.cell("C", "Male"), Some(1.0));
        assert_eq!(drilled.grand_total, 2.0);
    }

    #[test]
    fn test_count_totals_are_consistent() {
        let mut store = create_test_store();
        // Deterministic pseudo-random responses
        let genders = ["Male", "Female", "Other"];
        let types = ["Visual", "Hearing", "Locomotor", "Speech"];
        let mut seed: u64 = 42;
        for id in 100..400 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let g = genders[(seed >> 33) as usize % genders.len()];
            let t = types[(seed >> 17) as usize % types.len()];
            if seed % 7 == 0 {
                store.add_record(id, &[(GENDER, g)]);
            } else {
                store.add_record(id, &[(GENDER, g), (DISABILITY, t)]);
            }
        }

        let result = compute_cross_tab(&CrossTabRequest::new(GENDER, DISABILITY), &store, &store).unwrap();

        let cells: f64 = result.data.iter().flatten().sum();
        let rows: f64 = result.row_totals.iter().sum();
        let cols: f64 = result.column_totals.iter().sum();
        assert_eq!(rows, result.grand_total);
        assert_eq!(cols, result.grand_total);
        assert_eq!(cells, result.grand_total);
        assert_eq!(result.data.len(), result.row_labels.len());
        assert!(result.data.iter().all(|row| row.len() == result.column_labels.len()));
        for (i, row) in result.data.iter().enumerate() {
            assert_eq!(row.iter().sum::<f64>(), result.row_totals[i]);
        }
    }

    #[test]
    fn test_percent_row_totals_are_hundred() {
        let store = create_test_store();
        let request =
            CrossTabRequest::new(GENDER, DISABILITY).with_aggregation(AggregationMode::PercentRow);

        let result = compute_cross_tab(&request, &store, &store).unwrap();

        assert!(result.row_totals.iter().all(|&t| t == 100.0));
        assert_eq!(result.grand_total, 100.0);
    }

    #[test]
    fn test_label_order_unmatched_first_by_default() {
        let observed: Vec<String> = ["Zeta", "Female", "Alpha", "Male"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let canonical = vec!["Male".to_string(), "Female".to_string()];

        assert_eq!(
            order_labels(&observed, &canonical, UnmatchedPlacement::First),
            vec!["Zeta", "Alpha", "Male", "Female"]
        );
        assert_eq!(
            order_labels(&observed, &canonical, UnmatchedPlacement::Last),
            vec!["Male", "Female", "Zeta", "Alpha"]
        );
    }

    #[test]
    fn test_unmatched_placement_setting_reaches_result() {
        let mut store = create_test_store();
        store.add_record(20, &[(GENDER, "Other"), (DISABILITY, "Visual")]);
        let request = CrossTabRequest::new(GENDER, DISABILITY);

        let legacy = compute_cross_tab(&request, &store, &store).unwrap();
        assert_eq!(legacy.row_labels, vec!["Other", "Male", "Female"]);

        let settings = EngineSettings {
            unmatched_placement: UnmatchedPlacement::Last,
            ..EngineSettings::default()
        };
        let last = compute_cross_tab_with(&request, &store, &store, &settings).unwrap();
        assert_eq!(last.row_labels, vec!["Male", "Female", "Other"]);
    }

    #[test]
    fn test_aggregate_counts_distinct_records() {
        let store = create_test_store();
        let records = store.records(&[GENDER, DISABILITY]).unwrap();
        let row = store.field(GENDER).unwrap().unwrap();
        let col = store.field(DISABILITY).unwrap().unwrap();

        let raw = aggregate(&row, &col, &RecordPredicate::match_all(), &records);

        assert_eq!(raw.row_labels(), &["Female".to_string(), "Male".to_string()]);
        assert_eq!(raw.count("Male", "Visual"), 1);
        assert_eq!(raw.count("Male", "Speech"), 0);
        assert_eq!(raw.record_count(), 3);
    }

    #[test]
    fn test_drill_down_cell() {
        let store = create_test_store();
        let request = CrossTabRequest::new(GENDER, DISABILITY);

        let cell = drill_down(&request, Some("Male"), Some("Visual"), 10, &store, &store).unwrap();
        assert_eq!(cell.record_ids, vec![3]);
        assert_eq!(cell.total_count, 1);
        assert!(!cell.is_truncated);

        let row = drill_down(&request, Some("Male"), None, 1, &store, &store).unwrap();
        assert_eq!(row.total_count, 2);
        assert_eq!(row.record_ids.len(), 1);
        assert!(row.is_truncated);

        let unknown = drill_down(&request, Some("Nobody"), None, 10, &store, &store).unwrap();
        assert_eq!(unknown.total_count, 0);
    }
}
