//! FILENAME: core/crosstab-engine/src/hierarchy.rs
//! Hierarchy Resolver - Display labels for nested-select values.
//!
//! A nested-select response stores the full selected path, e.g.
//! `"District,Taluka,Village"`. Without a drill level the report groups at
//! the root (`District`). When a filter pins level `L`, the report shows the
//! level just below the selection (`parts[L]`), falling back to the pinned
//! level itself for records that stop there.

use smallvec::SmallVec;

use crate::definition::FilterDescriptor;

/// Separator between levels in a stored path.
pub const PATH_SEPARATOR: char = ',';

/// Split path; most trees are at most four levels deep.
pub type LevelParts<'a> = SmallVec<[&'a str; 4]>;

/// Splits a stored path into its trimmed level parts.
pub fn split_path(stored: &str) -> LevelParts<'_> {
    stored.split(PATH_SEPARATOR).map(str::trim).collect()
}

/// Joins level labels back into a stored path.
pub fn join_path<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| p.as_ref().trim())
        .collect::<Vec<_>>()
        .join(",")
}

/// Resolves the label a stored path is grouped under.
///
/// `drill_level` is the 1-based level a filter pinned on this field.
/// Returns None when the stored value carries no usable label.
pub fn resolve_label(stored: &str, drill_level: Option<u32>) -> Option<String> {
    let parts = split_path(stored);

    let label = match drill_level {
        None => parts.first().copied(),
        Some(level) => {
            let below = level as usize;
            parts
                .get(below)
                .or_else(|| parts.get(below.saturating_sub(1)))
                .or_else(|| parts.last())
                .copied()
        }
    }?;

    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

/// Labels above `displayed` in the stored path, root first.
/// Empty when `displayed` is not part of the path.
pub fn ancestor_labels(stored: &str, displayed: &str) -> Vec<String> {
    let parts = split_path(stored);
    match parts.iter().position(|p| *p == displayed) {
        Some(idx) => parts[..idx]
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect(),
        None => Vec::new(),
    }
}

/// Label resolution for one hierarchical axis of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HierarchyResolver {
    drill_level: Option<u32>,
}

impl HierarchyResolver {
    pub fn new(drill_level: Option<u32>) -> Self {
        HierarchyResolver { drill_level }
    }

    /// Takes the drill level from the filter targeting this field, if any.
    pub fn for_filter(active: Option<&FilterDescriptor>) -> Self {
        HierarchyResolver::new(active.and_then(|f| f.level).filter(|&l| l >= 1))
    }

    pub fn drill_level(&self) -> Option<u32> {
        self.drill_level
    }

    pub fn resolve(&self, stored: &str) -> Option<String> {
        resolve_label(stored, self.drill_level)
    }

    /// Ancestors to credit alongside `displayed`.
    /// Propagation only happens when no level is pinned.
    pub fn ancestors(&self, stored: &str, displayed: &str) -> Vec<String> {
        if self.drill_level.is_some() {
            return Vec::new();
        }
        ancestor_labels(stored, displayed)
    }
}
