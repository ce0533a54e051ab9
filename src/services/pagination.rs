//! "Load more" pagination driver.
//!
//! Reveals additional catalog entries by clicking the load-more control and
//! confirming growth. The catalog loads entries through a background API
//! call and client-side rendering, so a click proves nothing by itself:
//! growth is only trusted when a previously-unseen card href appears or the
//! structural row count increases.
//!
//! Exhausting every cycle without growth is the normal end-of-catalog
//! signal, not an error.

use std::time::Duration;

use crate::browser::{Locator, Page, Pick};
use crate::models::Config;

/// Wheel steps used by the aggressive re-scroll tier.
const AGGRESSIVE_WHEEL_STEPS: u64 = 2;
const AGGRESSIVE_WHEEL_DISTANCE: i64 = 1_600;

/// How a click attempt finally registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickTier {
    /// Trusted input event at the control's bounding-box center
    Coordinate,
    /// DOM-level click
    Dom,
    /// Scroll-into-view then DOM click
    Forced,
    Failed,
}

/// Drives the catalog's "load more" interaction.
pub struct Paginator<'a> {
    page: &'a dyn Page,
    config: &'a Config,
    card_locator: Locator,
    row_locator: Locator,
}

impl<'a> Paginator<'a> {
    /// `card_css` is the card selector strategy picked at crawl start.
    pub fn new(page: &'a dyn Page, config: &'a Config, card_css: &str) -> Self {
        Self {
            page,
            config,
            card_locator: Locator::css(card_css),
            row_locator: Locator::css(&config.selectors.row_selector),
        }
    }

    /// Attempt to reveal more catalog entries.
    ///
    /// Returns `false` when the catalog is exhausted: control missing or
    /// not interactable, or no growth after every escalation cycle.
    pub fn load_more(&self) -> bool {
        let Some(control) = self.find_control() else {
            log::debug!("No load-more control matched any strategy");
            return false;
        };

        self.page.scroll_into_view(&control, Pick::First);
        if !self.page.is_visible(&control) || !self.page.is_enabled(&control) {
            log::debug!("Load-more control is not interactable");
            return false;
        }

        let (mut prev_hrefs, mut prev_rows) = self.snapshot();

        for cycle in 1..=self.config.pagination.max_click_cycles {
            log::debug!(
                "Load-more cycle {}/{} (rows={}, hrefs={})",
                cycle,
                self.config.pagination.max_click_cycles,
                prev_rows,
                prev_hrefs.len()
            );

            let tier = self.click_control(&control);
            log::debug!("Click registered via {:?}", tier);

            self.wait_for_load();
            self.scroll_assist();

            if self.wait_for_growth(&prev_hrefs, prev_rows) {
                return true;
            }

            // No growth detected: escalate with an aggressive re-scroll
            // and refresh the snapshot before the next cycle.
            self.aggressive_scroll();
            (prev_hrefs, prev_rows) = self.snapshot();
        }

        false
    }

    /// First load-more strategy with at least one match.
    fn find_control(&self) -> Option<Locator> {
        self.config
            .selectors
            .load_more_strategies
            .iter()
            .map(|strategy| Locator {
                css: strategy.css.clone(),
                text: strategy.text.clone(),
            })
            .find(|locator| self.page.count(locator) > 0)
    }

    /// Unique card hrefs and structural row count.
    fn snapshot(&self) -> (Vec<String>, usize) {
        let hrefs = self.page.hrefs(&self.card_locator);
        let rows = self.page.count(&self.row_locator);
        (hrefs, rows)
    }

    /// Click with escalating tiers: coordinate, DOM, forced.
    fn click_control(&self, control: &Locator) -> ClickTier {
        if let Some(bbox) = self.page.bounding_box(control) {
            let (x, y) = bbox.center();
            if self.page.click_at(x, y).is_ok() {
                return ClickTier::Coordinate;
            }
        }
        if self.page.click_dom(control, Pick::First).is_ok() {
            return ClickTier::Dom;
        }
        self.page.scroll_into_view(control, Pick::First);
        if self.page.click_dom(control, Pick::First).is_ok() {
            return ClickTier::Forced;
        }
        log::warn!("Load-more click did not register on any tier");
        ClickTier::Failed
    }

    /// Post-click wait: API response, then network idle, then fixed delay.
    fn wait_for_load(&self) {
        let load_timeout = Duration::from_millis(self.config.pagination.load_timeout_ms);
        if self
            .page
            .wait_for_response(&self.config.selectors.projects_api_path, load_timeout)
        {
            return;
        }
        if self.page.wait_for_network_idle(load_timeout) {
            return;
        }
        self.page
            .wait_timeout(Duration::from_millis(self.config.scroll.networkidle_fallback_ms));
    }

    /// Best-effort scrolling to coax lazy rendering.
    fn scroll_assist(&self) {
        let after_delay = Duration::from_millis(self.config.scroll.after_delay_ms);

        self.page
            .scroll_container_to_bottom(&Locator::css(&self.config.selectors.scroll_container));
        self.page.wait_timeout(after_delay);

        if self.page.scroll_into_view(&self.row_locator, Pick::Last) {
            self.page.wait_timeout(after_delay);
        }

        self.wheel_scroll(
            self.config.scroll.wheel_steps,
            self.config.scroll.wheel_distance_px as i64,
        );
    }

    /// Escalation tier: page bottom, longer wait, re-scroll.
    fn aggressive_scroll(&self) {
        self.page.scroll_page_to_bottom();
        self.page
            .wait_timeout(Duration::from_millis(self.config.scroll.retry_delay_ms));
        self.page.scroll_into_view(&self.row_locator, Pick::Last);
        self.wheel_scroll(AGGRESSIVE_WHEEL_STEPS, AGGRESSIVE_WHEEL_DISTANCE);
    }

    fn wheel_scroll(&self, steps: u64, distance: i64) {
        let step_delay = Duration::from_millis(self.config.scroll.step_delay_ms);
        for _ in 0..steps {
            self.page.scroll_by(0, distance);
            self.page.wait_timeout(step_delay);
        }
    }

    /// Poll for a previously-unseen href or a row count increase.
    fn wait_for_growth(&self, prev_hrefs: &[String], prev_rows: usize) -> bool {
        let interval = Duration::from_millis(self.config.pagination.poll_interval_ms);
        for _ in 0..self.config.pagination.poll_max_attempts {
            self.page.wait_timeout(interval);
            let (hrefs, rows) = self.snapshot();
            if rows > prev_rows || hrefs.iter().any(|href| !prev_hrefs.contains(href)) {
                return true;
            }
        }
        false
    }
}
