//! Project data structures.

use serde::{Deserialize, Serialize};

/// A project as extracted from a single catalog card.
///
/// All fields except the Ley VP flag are optional: per-field extraction
/// degrades to `None` on malformed markup. Records without a name are
/// discarded by the crawl loop before persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectRecord {
    /// Project name/title
    pub name: Option<String>,

    /// Neighborhood/zone label
    pub zone: Option<String>,

    /// Hand-over category or date ("INMEDIATA", "MAYO 2026", ...)
    pub delivery_type: Option<String>,

    /// Per-tower delivery breakdown when the project has several towers
    pub delivery_torres: Option<String>,

    /// Project status ("A estrenar", "En construcción", "En pozo")
    pub project_status: Option<String>,

    /// Starting price as displayed (currency text kept verbatim)
    pub price_from: Option<String>,

    /// Developer/builder name
    pub developer: Option<String>,

    /// Commission tag text
    pub commission: Option<String>,

    /// Whether the project carries the "Ley VP" designation
    pub has_ley_vp: bool,

    /// Street address
    pub location: Option<String>,

    /// Card image URL (absolute)
    pub image_url: Option<String>,

    /// Detail page URL (absolute); source of the project identity
    pub detail_url: Option<String>,
}

/// A project row as persisted in the `projects` table.
///
/// `has_ley_vp` keeps the storage representation (integer 0/1); change
/// detection coerces it against the in-memory boolean.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectEntity {
    /// Numeric identity derived from the detail URL
    pub project_id: i64,

    /// Detail page URL, unique per project
    pub detail_url: String,

    /// Project name/title
    pub name: String,

    pub zone: Option<String>,
    pub delivery_type: Option<String>,
    pub delivery_torres: Option<String>,
    pub project_status: Option<String>,
    pub price_from: Option<String>,
    pub developer: Option<String>,
    pub commission: Option<String>,

    /// Ley VP flag as stored (0/1)
    pub has_ley_vp: i64,

    pub location: Option<String>,
    pub image_url: Option<String>,

    /// Set once at first insert
    pub scraped_at: String,

    /// Refreshed by every insert or field change
    pub updated_at: String,
}

impl ProjectRecord {
    /// One-line description for debug logging.
    pub fn describe(&self) -> String {
        format!(
            "{} | {} | {} [{}]",
            self.name.as_deref().unwrap_or("?"),
            self.zone.as_deref().unwrap_or("-"),
            self.delivery_type.as_deref().unwrap_or("-"),
            self.project_status.as_deref().unwrap_or("N/A"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_with_gaps() {
        let record = ProjectRecord {
            name: Some("Torre Vista".into()),
            delivery_type: Some("INMEDIATA".into()),
            ..ProjectRecord::default()
        };
        assert_eq!(record.describe(), "Torre Vista | - | INMEDIATA [N/A]");
    }
}
