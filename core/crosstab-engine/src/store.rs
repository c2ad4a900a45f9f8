//! FILENAME: core/crosstab-engine/src/store.rs
//! Collaborator contracts for the field catalog and the record store,
//! plus an in-memory adapter implementing both.
//!
//! The in-memory store keeps responses the way a pivot cache keeps cells:
//! - Each distinct value is stored once per field and referenced by index
//! - A record is a short list of (field, value id) pairs
//! - Lookups by record id go through an index map

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::definition::{Field, FieldId, RecordId};
use crate::error::StoreError;
use crate::filter::RecordPredicate;

// ============================================================================
// RECORD VIEW
// ============================================================================

/// The responses one record holds for the fields a request asked for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub record_id: RecordId,

    /// Stored value per field. A field without a response is absent.
    pub values: FxHashMap<FieldId, String>,
}

impl ResponseRecord {
    pub fn new(record_id: RecordId) -> Self {
        ResponseRecord {
            record_id,
            values: FxHashMap::default(),
        }
    }

    pub fn with_value(mut self, field_id: FieldId, value: impl Into<String>) -> Self {
        self.values.insert(field_id, value.into());
        self
    }

    pub fn value(&self, field_id: FieldId) -> Option<&str> {
        self.values.get(&field_id).map(String::as_str)
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Resolves declared fields.
pub trait FieldCatalog: Send + Sync {
    /// Returns `Ok(None)` when no field has this id.
    fn field(&self, id: FieldId) -> Result<Option<Field>, StoreError>;
}

/// Enumerates records and their responses.
pub trait RecordStore: Send + Sync {
    /// Every record holding a response for at least one of `field_ids`,
    /// with the values of those fields.
    fn records(&self, field_ids: &[FieldId]) -> Result<Vec<ResponseRecord>, StoreError>;

    /// Records passing `predicate`. Adapters that can translate the filters
    /// into their own query language override this; the default filters in
    /// memory. Returned records still carry the values of every `field_ids`
    /// entry, since the aggregator re-checks the predicate.
    fn records_matching(
        &self,
        field_ids: &[FieldId],
        predicate: &RecordPredicate,
    ) -> Result<Vec<ResponseRecord>, StoreError> {
        Ok(self
            .records(field_ids)?
            .into_iter()
            .filter(|record| predicate.matches(record))
            .collect())
    }
}

// ============================================================================
// IN-MEMORY ADAPTER
// ============================================================================

/// Index into a field's interned value list.
pub type ValueId = u32;

/// Distinct values of one field.
#[derive(Debug, Clone, Default)]
struct FieldValues {
    value_to_id: FxHashMap<String, ValueId>,
    id_to_value: Vec<String>,
}

impl FieldValues {
    fn intern(&mut self, value: &str) -> ValueId {
        if let Some(&id) = self.value_to_id.get(value) {
            return id;
        }
        let id = self.id_to_value.len() as ValueId;
        self.id_to_value.push(value.to_string());
        self.value_to_id.insert(value.to_string(), id);
        id
    }

    fn get(&self, id: ValueId) -> Option<&str> {
        self.id_to_value.get(id as usize).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct StoredRecord {
    record_id: RecordId,
    values: SmallVec<[(FieldId, ValueId); 8]>,
}

/// In-memory field catalog and record store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    fields: FxHashMap<FieldId, Field>,
    values: FxHashMap<FieldId, FieldValues>,
    records: Vec<StoredRecord>,
    record_index: FxHashMap<RecordId, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares (or replaces) a field.
    pub fn add_field(&mut self, field: Field) {
        self.fields.insert(field.id, field);
    }

    /// Stores a response. A record holds at most one value per field, so a
    /// second response for the same pair replaces the first.
    pub fn add_response(&mut self, record_id: RecordId, field_id: FieldId, value: &str) {
        let value_id = self.values.entry(field_id).or_default().intern(value);

        let idx = match self.record_index.get(&record_id) {
            Some(&idx) => idx,
            None => {
                self.records.push(StoredRecord {
                    record_id,
                    values: SmallVec::new(),
                });
                let idx = self.records.len() - 1;
                self.record_index.insert(record_id, idx);
                idx
            }
        };

        let record = &mut self.records[idx];
        match record.values.iter_mut().find(|(f, _)| *f == field_id) {
            Some(slot) => slot.1 = value_id,
            None => record.values.push((field_id, value_id)),
        }
    }

    /// Stores several responses of one record.
    pub fn add_record(&mut self, record_id: RecordId, responses: &[(FieldId, &str)]) {
        for &(field_id, value) in responses {
            self.add_response(record_id, field_id, value);
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of distinct values stored for a field.
    pub fn unique_count(&self, field_id: FieldId) -> usize {
        self.values
            .get(&field_id)
            .map_or(0, |v| v.id_to_value.len())
    }

    fn materialize(&self, record: &StoredRecord, field_ids: &[FieldId]) -> Option<ResponseRecord> {
        let mut out = ResponseRecord::new(record.record_id);
        for &(field_id, value_id) in &record.values {
            if !field_ids.contains(&field_id) {
                continue;
            }
            if let Some(value) = self.values.get(&field_id).and_then(|v| v.get(value_id)) {
                out.values.insert(field_id, value.to_string());
            }
        }
        if out.values.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

impl FieldCatalog for MemoryStore {
    fn field(&self, id: FieldId) -> Result<Option<Field>, StoreError> {
        Ok(self.fields.get(&id).cloned())
    }
}

impl RecordStore for MemoryStore {
    fn records(&self, field_ids: &[FieldId]) -> Result<Vec<ResponseRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter_map(|record| self.materialize(record, field_ids))
            .collect())
    }
}
