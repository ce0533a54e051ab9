// src/models/selectors.rs

//! CSS selector strategy tables for the Iris catalog.
//!
//! All site-specific markup knowledge lives here as data. If the catalog
//! HTML changes, only these tables need updating, not the extraction or
//! pagination algorithms.

use serde::{Deserialize, Serialize};

/// One strategy for locating the "load more" control.
///
/// The optional `text` filters matches by their text content, replacing
/// the non-standard `:has-text()` pseudo-class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadMoreStrategy {
    /// CSS selector for candidate elements
    pub css: String,

    /// Required substring of the element text, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl LoadMoreStrategy {
    pub fn new(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: Some(text.into()),
        }
    }
}

/// Selector strategy tables for the catalog page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSelectors {
    /// Ordered card selector strategies; first with a match wins
    #[serde(default = "defaults::card_strategies")]
    pub card_strategies: Vec<String>,

    /// Ordered "load more" control strategies
    #[serde(default = "defaults::load_more_strategies")]
    pub load_more_strategies: Vec<LoadMoreStrategy>,

    /// Structural row selector used for growth detection
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// Scrollable catalog container
    #[serde(default = "defaults::scroll_container")]
    pub scroll_container: String,

    /// URL fragment of the background projects API
    #[serde(default = "defaults::projects_api_path")]
    pub projects_api_path: String,

    /// Container of the grid/list view toggle buttons
    #[serde(default = "defaults::view_toggle_container")]
    pub view_toggle_container: String,

    /// Label of the list-view toggle button
    #[serde(default = "defaults::list_view_label")]
    pub list_view_label: String,

    /// List-layout field selectors
    #[serde(default)]
    pub list: ListSelectors,

    /// Table-layout column indexes
    #[serde(default)]
    pub table: TableSelectors,

    /// Grid-layout field selectors
    #[serde(default)]
    pub grid: GridSelectors,

    /// Delivery column sub-selectors
    #[serde(default)]
    pub delivery: DeliverySelectors,

    /// Project status keywords scanned case-insensitively
    #[serde(default = "defaults::status_keywords")]
    pub status_keywords: Vec<String>,

    /// Visual indicator selector for the Ley VP column
    #[serde(default = "defaults::ley_vp_icon")]
    pub ley_vp_icon: String,

    /// Card image selector
    #[serde(default = "defaults::image")]
    pub image: String,

    /// Login page selectors
    #[serde(default)]
    pub auth: AuthSelectors,
}

impl Default for CatalogSelectors {
    fn default() -> Self {
        Self {
            card_strategies: defaults::card_strategies(),
            load_more_strategies: defaults::load_more_strategies(),
            row_selector: defaults::row_selector(),
            scroll_container: defaults::scroll_container(),
            projects_api_path: defaults::projects_api_path(),
            view_toggle_container: defaults::view_toggle_container(),
            list_view_label: defaults::list_view_label(),
            list: ListSelectors::default(),
            table: TableSelectors::default(),
            grid: GridSelectors::default(),
            delivery: DeliverySelectors::default(),
            status_keywords: defaults::status_keywords(),
            ley_vp_icon: defaults::ley_vp_icon(),
            image: defaults::image(),
            auth: AuthSelectors::default(),
        }
    }
}

/// Login page selectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSelectors {
    /// Email/user input field
    pub email_input: String,

    /// Password input field
    pub password_input: String,

    /// Submit button
    pub submit_button: String,

    /// On-page error indicators checked after submitting
    pub error_indicators: Vec<String>,
}

impl Default for AuthSelectors {
    fn default() -> Self {
        Self {
            email_input: "input[type='email'], input[name*='email' i], \
                          input[id*='email' i], input[placeholder*='email' i]"
                .into(),
            password_input: "input[type='password']".into(),
            submit_button: "button[type='submit']".into(),
            error_indicators: vec![
                ".alert-danger".into(),
                ".error-message".into(),
                "[role='alert']".into(),
                ".text-danger".into(),
                ".invalid-feedback".into(),
            ],
        }
    }
}

/// Field selectors for the list layout.
///
/// Fields are addressed by 1-based column position within the row plus a
/// sub-selector inside that column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSelectors {
    /// Marker sub-structure distinguishing the list layout
    pub row_marker: String,

    pub name_col: usize,
    pub name: String,

    pub zone_col: usize,
    pub zone: String,

    pub location_col: usize,
    pub location: String,

    /// Column holding the hand-over tag and status paragraph
    pub delivery_col: usize,

    /// Multiple price spans may exist; the authoritative one is last
    pub price_col: usize,
    pub price: String,

    pub developer_col: usize,
    pub developer: String,

    pub commission_col: usize,
    pub commission: String,

    pub ley_vp_col: usize,
}

impl Default for ListSelectors {
    fn default() -> Self {
        Self {
            row_marker: ".p-2.row".into(),
            name_col: 2,
            name: ".property-table-title".into(),
            zone_col: 3,
            zone: ".property-hood".into(),
            location_col: 3,
            location: ".property-address".into(),
            delivery_col: 4,
            price_col: 5,
            price: ".price.text-secondary.fw-bold".into(),
            developer_col: 6,
            developer: "p.text-secondary".into(),
            commission_col: 7,
            commission: ".tag-commision".into(),
            ley_vp_col: 8,
        }
    }
}

/// Column indexes for the table layout (1-based `td` positions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSelectors {
    /// Cell element name
    pub cell: String,

    /// Link element carrying the detail URL
    pub link: String,

    pub name_col: usize,
    pub zone_col: usize,
    pub delivery_col: usize,
    pub price_col: usize,
    pub developer_col: usize,
    pub commission_col: usize,
    pub ley_vp_col: usize,
}

impl Default for TableSelectors {
    fn default() -> Self {
        Self {
            cell: "td".into(),
            link: "a".into(),
            name_col: 1,
            zone_col: 2,
            delivery_col: 3,
            price_col: 4,
            developer_col: 5,
            commission_col: 6,
            ley_vp_col: 7,
        }
    }
}

/// Field selectors for the grid layout fallback.
///
/// Zone, price, developer and commission are not rendered in this layout;
/// the Ley VP flag cannot be determined either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSelectors {
    pub title: String,
    pub delivery_tag: String,
    pub location: String,
    pub link: String,
}

impl Default for GridSelectors {
    fn default() -> Self {
        Self {
            title: ".property-card-title".into(),
            delivery_tag: ".property-tags .tag-hand-over".into(),
            location: ".property-card-location".into(),
            link: "a".into(),
        }
    }
}

/// Sub-selectors within the delivery column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySelectors {
    /// Hand-over tag span
    pub tag: String,

    /// Status paragraph
    pub status_paragraph: String,

    /// Prefix marking the authoritative status text
    pub status_marker: String,
}

impl Default for DeliverySelectors {
    fn default() -> Self {
        Self {
            tag: ".tag-hand-over".into(),
            status_paragraph: "p.text-secondary".into(),
            status_marker: "Estado:".into(),
        }
    }
}

mod defaults {
    use super::LoadMoreStrategy;

    pub fn card_strategies() -> Vec<String> {
        vec![
            "table tbody tr".into(),
            "a[href*='/proyecto/']".into(),
            "div.property-card".into(),
        ]
    }

    pub fn load_more_strategies() -> Vec<LoadMoreStrategy> {
        vec![
            LoadMoreStrategy::new("button", "Cargar más"),
            LoadMoreStrategy::new("button", "Mostrar más"),
            LoadMoreStrategy::new("button", "Ver más"),
            LoadMoreStrategy::new("a", "Cargar más"),
            LoadMoreStrategy::new("a", "Mostrar más"),
        ]
    }

    pub fn row_selector() -> String {
        "a[href*='/proyecto/']".into()
    }

    pub fn scroll_container() -> String {
        "div.gx-2.gy-3.mb-4.mt-1.mt-lg-0.row".into()
    }

    pub fn projects_api_path() -> String {
        "get-projects-search".into()
    }

    pub fn view_toggle_container() -> String {
        ".container-toggle-list".into()
    }

    pub fn list_view_label() -> String {
        "Lista".into()
    }

    pub fn status_keywords() -> Vec<String> {
        vec![
            "a estrenar".into(),
            "en construcción".into(),
            "en pozo".into(),
        ]
    }

    pub fn ley_vp_icon() -> String {
        "i, svg, .icon, [class*='check']".into()
    }

    pub fn image() -> String {
        "img".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_are_populated() {
        let selectors = CatalogSelectors::default();
        assert!(!selectors.card_strategies.is_empty());
        assert!(!selectors.load_more_strategies.is_empty());
        assert_eq!(selectors.list.row_marker, ".p-2.row");
        assert_eq!(selectors.table.name_col, 1);
        assert_eq!(selectors.status_keywords.len(), 3);
    }

    #[test]
    fn load_more_strategy_deserializes_without_text() {
        let strategy: LoadMoreStrategy =
            toml::from_str(r#"css = "[class*='load-more']""#).unwrap();
        assert_eq!(strategy.css, "[class*='load-more']");
        assert!(strategy.text.is_none());
    }
}
