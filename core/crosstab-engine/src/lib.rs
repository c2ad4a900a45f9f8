//! FILENAME: core/crosstab-engine/src/lib.rs
//! Cross-tabulation report engine.
//!
//! Counts how many response records fall into each combination of a row
//! field's labels and a column field's labels, optionally narrowed by filters
//! and drilled into hierarchical (nested-select) fields.
//!
//! Layers:
//! - `definition`: Serializable request and field configuration
//! - `options`: Canonical label order from stored field options
//! - `hierarchy`: Display labels for nested-select paths
//! - `filter`: Filter descriptors compiled into a record predicate
//! - `store`: Collaborator traits plus an in-memory adapter
//! - `engine`: Aggregation, label ordering and the public entry points
//! - `normalize`: Count and percentage modes
//! - `view`: Renderable output

pub mod definition;
pub mod engine;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod normalize;
pub mod options;
pub mod store;
pub mod view;

pub use definition::*;
pub use engine::{
    aggregate, compute_cross_tab, compute_cross_tab_with, drill_down, order_labels,
    resolve_field, CrossTabCalculator, LabelId, RawCrossTab,
};
pub use error::{CrossTabError, StoreError};
pub use filter::{FilterPredicateBuilder, FilterSkip, RecordPredicate};
pub use hierarchy::{resolve_label, HierarchyResolver};
pub use normalize::{normalize, NormalizedResult};
pub use options::{parse_options, parse_options_value, LevelSpec, OptionEntry, OptionsSpec};
pub use store::{FieldCatalog, MemoryStore, RecordStore, ResponseRecord};
pub use view::{CrossTabMetadata, CrossTabResult, DrillDownResult};

/// Log target for aggregation summaries.
pub const LOG_CROSSTAB: &str = "CROSSTAB";
/// Log target for skipped filters.
pub const LOG_FILTER: &str = "FILTER";
/// Log target for option parsing fallbacks.
pub const LOG_OPTIONS: &str = "OPTIONS";
