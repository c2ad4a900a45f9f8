//! FILENAME: core/crosstab-engine/src/error.rs

use thiserror::Error;

use crate::definition::FieldId;

/// Failure reported by a field catalog or record store adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt store data: {0}")]
    Corrupt(String),
}

/// Fatal errors of a cross-tab request. Everything else degrades and is logged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrossTabError {
    #[error("Field not found: {0}")]
    FieldNotFound(FieldId),

    #[error(transparent)]
    Store(#[from] StoreError),
}
