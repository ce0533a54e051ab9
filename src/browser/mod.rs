//! Browser capability surface.
//!
//! The crawl pipeline never talks to a browser library directly; it depends
//! on the narrow [`Page`] trait below. The production implementation drives
//! headless Chrome ([`chrome`]); tests substitute a scripted fake.

pub mod chrome;

#[cfg(test)]
pub mod fake;

use std::time::Duration;

use crate::error::Result;

pub use chrome::ChromePage;

/// Addresses elements on the live page.
///
/// A CSS selector plus an optional text-content filter. The filter stands in
/// for the non-standard `:has-text()` pseudo-class the platform markup would
/// otherwise require.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub css: String,
    pub text: Option<String>,
}

impl Locator {
    /// Locator matching by CSS alone.
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: None,
        }
    }

    /// Locator matching by CSS and text content.
    pub fn with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: Some(text.into()),
        }
    }

    /// Stable key for bookkeeping (fakes, logging).
    pub fn key(&self) -> String {
        match &self.text {
            Some(text) => format!("{}::{}", self.css, text),
            None => self.css.clone(),
        }
    }
}

/// Which of several matches to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    First,
    Last,
    Nth(usize),
}

/// Element bounding box in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Center point of the box.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A queryable, clickable, scrollable page.
///
/// Read operations degrade to `None`/`false`/`0` rather than erroring;
/// only actions that the caller must react to return `Result`.
pub trait Page {
    /// Navigate to a URL and wait for the navigation to finish.
    fn navigate(&self, url: &str) -> Result<()>;

    /// Current page URL.
    fn current_url(&self) -> String;

    /// Number of elements matching the locator.
    fn count(&self, locator: &Locator) -> usize;

    /// Trimmed text content of the picked match.
    fn text(&self, locator: &Locator, pick: Pick) -> Option<String>;

    /// Attribute value of the picked match.
    fn attr(&self, locator: &Locator, pick: Pick, name: &str) -> Option<String>;

    /// Outer HTML of the picked match.
    fn outer_html(&self, locator: &Locator, pick: Pick) -> Option<String>;

    /// Whether the first match renders with a layout box.
    fn is_visible(&self, locator: &Locator) -> bool;

    /// Whether the first match is not disabled.
    fn is_enabled(&self, locator: &Locator) -> bool;

    /// Bounding box of the first match.
    fn bounding_box(&self, locator: &Locator) -> Option<BoundingBox>;

    /// Focus the first match and type a value into it.
    fn fill(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Trusted click at page coordinates.
    fn click_at(&self, x: f64, y: f64) -> Result<()>;

    /// DOM-level click on the picked match.
    fn click_dom(&self, locator: &Locator, pick: Pick) -> Result<()>;

    /// Scroll the picked match into view. Best-effort.
    fn scroll_into_view(&self, locator: &Locator, pick: Pick) -> bool;

    /// Wheel-scroll the page by a pixel delta. Best-effort.
    fn scroll_by(&self, dx: i64, dy: i64);

    /// Scroll a container to its bottom, falling back to the window.
    /// Returns whether the container path was taken.
    fn scroll_container_to_bottom(&self, locator: &Locator) -> bool;

    /// Scroll the window to the document bottom. Best-effort.
    fn scroll_page_to_bottom(&self);

    /// Unique `href` attributes across all matches.
    fn hrefs(&self, locator: &Locator) -> Vec<String>;

    /// Wait until the locator has a match, bounded by `timeout`.
    fn wait_for(&self, locator: &Locator, timeout: Duration) -> bool;

    /// Wait for a 2xx background response whose URL contains `url_fragment`.
    fn wait_for_response(&self, url_fragment: &str, timeout: Duration) -> bool;

    /// Wait until network activity quiesces, bounded by `timeout`.
    fn wait_for_network_idle(&self, timeout: Duration) -> bool;

    /// Fixed delay.
    fn wait_timeout(&self, delay: Duration);

    /// Serialized page content.
    fn content(&self) -> Result<String>;

    /// Full-page PNG screenshot.
    fn screenshot(&self) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_key() {
        assert_eq!(Locator::css("button").key(), "button");
        assert_eq!(
            Locator::with_text("button", "Cargar más").key(),
            "button::Cargar más"
        );
    }

    #[test]
    fn test_bounding_box_center() {
        let bbox = BoundingBox {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 40.0,
        };
        assert_eq!(bbox.center(), (60.0, 40.0));
    }
}
