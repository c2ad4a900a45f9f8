//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for report service integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use crosstab_engine::{EngineSettings, Field, FieldId, FieldKind, MemoryStore, OptionsSpec};
use report_service::{AppState, CrossTabRequestDto, FilterDto};
use serde_json::{json, Value};

pub const GENDER: FieldId = 1;
pub const DISABILITY: FieldId = 2;
pub const LOCATION: FieldId = 3;
pub const AGE: FieldId = 4;
pub const REGISTERED: FieldId = 5;

/// Test harness for creating and managing test state.
pub struct TestHarness {
    pub state: AppState,
}

impl TestHarness {
    /// Create a harness over an empty store.
    pub fn new() -> Self {
        TestHarness {
            state: report_service::create_app_state(),
        }
    }

    /// Create a harness over the survey fixture.
    pub fn with_survey_data() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        TestHarness {
            state: AppState::with_store(Arc::new(survey_store()), settings),
        }
    }
}

/// Fields declared the way the form builder stores them.
pub fn survey_fields() -> Vec<Field> {
    vec![
        Field::new(GENDER, "gender", FieldKind::Select)
            .with_display_name("Gender")
            .with_options(OptionsSpec::flat(["Male", "Female", "Other"])),
        Field::new(DISABILITY, "disability_type", FieldKind::Select)
            .with_display_name("Disability Type")
            .with_options(OptionsSpec::from_value(&json!([
                {"value": "Visual", "label": "Visual impairment"},
                {"value": "Hearing", "label": "Hearing impairment"},
                {"value": "Locomotor", "label": "Locomotor disability"},
            ]))),
        Field::new(LOCATION, "location", FieldKind::NestedSelect)
            .with_display_name("Location")
            .with_options(OptionsSpec::from_value(&json!([
                {"name": "District", "options": ["Pune", "Nashik"]},
                {"name": "Taluka", "options": "Pune: Haveli, Mulshi\nNashik: Igatpuri"},
                {"name": "Village", "options": "Haveli: Wagholi, Lohegaon\nIgatpuri: Ghoti"},
            ]))),
        Field::new(AGE, "age", FieldKind::Number).with_display_name("Age"),
        Field::new(REGISTERED, "registered_on", FieldKind::Date),
    ]
}

/// Eight respondents.
///
/// | id | gender | disability | location               | age | registered |
/// |----|--------|------------|------------------------|-----|------------|
/// | 1  | Female | Visual     | Pune,Haveli,Wagholi    | 34  | 2024-01-15 |
/// | 2  | Male   | Hearing    | Pune,Haveli            | 12  | 2024-02-03 |
/// | 3  | Male   | Visual     | Pune,Mulshi            | 58  | 2024-03-20 |
/// | 4  | Female | Locomotor  | Nashik,Igatpuri,Ghoti  | 41  | 2024-04-11 |
/// | 5  | Other  | Visual     | Pune,Haveli,Lohegaon   | 27  | 2024-05-30 |
/// | 6  | Male   | Locomotor  | Nashik                 | 66  | 2024-06-01 |
/// | 7  | Female | Hearing    | Pune,Haveli,Wagholi    |     | 2024-06-18 |
/// | 8  | Male   | (none)     | Pune,Mulshi            | 19  |            |
pub fn survey_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    for field in survey_fields() {
        store.add_field(field);
    }

    let rows: [(u64, &str, &str, &str, &str, &str); 8] = [
        (1, "Female", "Visual", "Pune,Haveli,Wagholi", "34", "2024-01-15"),
        (2, "Male", "Hearing", "Pune,Haveli", "12", "2024-02-03"),
        (3, "Male", "Visual", "Pune,Mulshi", "58", "2024-03-20"),
        (4, "Female", "Locomotor", "Nashik,Igatpuri,Ghoti", "41", "2024-04-11"),
        (5, "Other", "Visual", "Pune,Haveli,Lohegaon", "27", "2024-05-30"),
        (6, "Male", "Locomotor", "Nashik", "66", "2024-06-01"),
        (7, "Female", "Hearing", "Pune,Haveli,Wagholi", "", "2024-06-18"),
        (8, "Male", "", "Pune,Mulshi", "19", ""),
    ];

    for (id, gender, disability, location, age, registered) in rows {
        let responses = [
            (GENDER, gender),
            (DISABILITY, disability),
            (LOCATION, location),
            (AGE, age),
            (REGISTERED, registered),
        ];
        for (field_id, value) in responses {
            if !value.is_empty() {
                store.add_response(id, field_id, value);
            }
        }
    }
    store
}

pub fn request(row: FieldId, column: FieldId) -> CrossTabRequestDto {
    CrossTabRequestDto {
        row_field_id: row,
        column_field_id: column,
        filters: Vec::new(),
        aggregation_type: None,
    }
}

pub fn filter(field_id: FieldId, operator: &str, value: Value) -> FilterDto {
    FilterDto {
        field_id,
        operator: operator.to_string(),
        value,
        level: None,
        hierarchy_path: None,
    }
}

pub fn location_filter(path: &[&str]) -> FilterDto {
    FilterDto {
        field_id: LOCATION,
        operator: "equals".to_string(),
        value: json!(path.last().copied().unwrap_or_default()),
        level: Some(path.len() as u32),
        hierarchy_path: Some(path.iter().map(|s| s.to_string()).collect()),
    }
}

/// Asserts the count-mode total identities of a result.
pub fn assert_totals_consistent(result: &crosstab_engine::CrossTabResult) {
    let (rows, cols) = result.dimensions();
    assert_eq!(result.data.len(), rows);
    assert_eq!(result.row_totals.len(), rows);
    assert_eq!(result.column_totals.len(), cols);

    for (i, row) in result.data.iter().enumerate() {
        assert_eq!(row.len(), cols);
        assert_eq!(row.iter().sum::<f64>(), result.row_totals[i]);
    }
    for j in 0..cols {
        let col: f64 = result.data.iter().map(|row| row[j]).sum();
        assert_eq!(col, result.column_totals[j]);
    }
    assert_eq!(result.row_totals.iter().sum::<f64>(), result.grand_total);
    assert_eq!(result.column_totals.iter().sum::<f64>(), result.grand_total);
}
