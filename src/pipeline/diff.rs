//! Field-level change detection between a stored project and a fresh record.
//!
//! Decides whether an observed card warrants a database write. A project
//! that exists and is byte-identical on every tracked field is left
//! untouched; only actual differences are itemized, with old and new values
//! retained for audit logging.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{ProjectEntity, ProjectRecord};

/// Old and new value of a single changed field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldChange {
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Result of comparing a fresh record against the stored row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectDiff {
    /// Whether a write is warranted (new project, or at least one change)
    pub has_changes: bool,

    /// Changed fields only; sorted for deterministic logging
    pub changes: BTreeMap<String, FieldChange>,
}

impl ProjectDiff {
    /// Diff representing a brand-new project (implicit insert, no itemized
    /// field changes).
    pub fn new_project() -> Self {
        Self {
            has_changes: true,
            changes: BTreeMap::new(),
        }
    }

    /// Get the number of changed fields.
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }
}

/// Compare a fresh record against the stored row, if any.
///
/// Pure function: no I/O. `None == None` counts as equal; the Ley VP flag
/// is coerced to integer 0/1 on both sides so the storage representation
/// never produces a false positive.
pub fn compare_project(existing: Option<&ProjectEntity>, record: &ProjectRecord) -> ProjectDiff {
    let Some(existing) = existing else {
        return ProjectDiff::new_project();
    };

    let mut changes = BTreeMap::new();
    let mut check = |field: &str, old: Option<&str>, new: Option<&str>| {
        if old != new {
            changes.insert(
                field.to_string(),
                FieldChange {
                    old: old.map(str::to_string),
                    new: new.map(str::to_string),
                },
            );
        }
    };

    check(
        "detail_url",
        Some(existing.detail_url.as_str()),
        record.detail_url.as_deref(),
    );
    check("name", Some(existing.name.as_str()), record.name.as_deref());
    check("zone", existing.zone.as_deref(), record.zone.as_deref());
    check(
        "delivery_type",
        existing.delivery_type.as_deref(),
        record.delivery_type.as_deref(),
    );
    check(
        "delivery_torres",
        existing.delivery_torres.as_deref(),
        record.delivery_torres.as_deref(),
    );
    check(
        "project_status",
        existing.project_status.as_deref(),
        record.project_status.as_deref(),
    );
    check(
        "price_from",
        existing.price_from.as_deref(),
        record.price_from.as_deref(),
    );
    check(
        "developer",
        existing.developer.as_deref(),
        record.developer.as_deref(),
    );
    check(
        "commission",
        existing.commission.as_deref(),
        record.commission.as_deref(),
    );
    check(
        "location",
        existing.location.as_deref(),
        record.location.as_deref(),
    );
    check(
        "image_url",
        existing.image_url.as_deref(),
        record.image_url.as_deref(),
    );

    // Boolean field: normalize both sides to 0/1 before comparing
    let old_ley_vp = i64::from(existing.has_ley_vp != 0);
    let new_ley_vp = i64::from(record.has_ley_vp);
    if old_ley_vp != new_ley_vp {
        changes.insert(
            "has_ley_vp".to_string(),
            FieldChange {
                old: Some(old_ley_vp.to_string()),
                new: Some(new_ley_vp.to_string()),
            },
        );
    }

    ProjectDiff {
        has_changes: !changes.is_empty(),
        changes,
    }
}

/// Format a change-detection message for logging.
pub fn format_change_message(project_id: i64, diff: &ProjectDiff) -> String {
    if diff.changes.is_empty() {
        return format!("Project {}: no changes", project_id);
    }

    let mut parts = vec![format!(
        "Project {}: {} change(s) detected",
        project_id,
        diff.change_count()
    )];
    for (field, change) in &diff.changes {
        parts.push(format!(
            "     - {}: {:?} -> {:?}",
            field, change.old, change.new
        ));
    }
    parts.join("\n")
}
