//! Scripted in-memory [`Page`] fake for unit tests.
//!
//! State is addressed by locator key. Values that change as the catalog
//! "loads more" (hrefs, row counts, URL, content) are modeled as step
//! sequences advanced by every click, so growth-after-click scenarios can
//! be scripted deterministically. All waits return instantly.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::browser::{BoundingBox, Locator, Page, Pick};
use crate::error::{AppError, Result};

#[derive(Default)]
struct Inner {
    counts: HashMap<String, usize>,
    count_steps: HashMap<String, Vec<usize>>,
    visible: HashMap<String, bool>,
    enabled: HashMap<String, bool>,
    boxes: HashMap<String, BoundingBox>,
    texts: HashMap<String, Vec<String>>,
    attrs: HashMap<(String, String), Vec<String>>,
    hrefs_steps: Vec<Vec<String>>,
    url_steps: Vec<String>,
    content_steps: Vec<String>,
    step: usize,
    api_response: bool,
    network_idle: bool,
    fail_click_at: bool,
    calls: Vec<String>,
}

/// Deterministic scripted page.
#[derive(Default)]
pub struct FakePage {
    inner: Mutex<Inner>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_count(&self, locator: &Locator, count: usize) {
        self.inner.lock().unwrap().counts.insert(locator.key(), count);
    }

    /// Per-click-step counts (e.g. a growing row count).
    pub fn set_count_steps(&self, locator: &Locator, steps: Vec<usize>) {
        self.inner
            .lock()
            .unwrap()
            .count_steps
            .insert(locator.key(), steps);
    }

    pub fn set_visible(&self, locator: &Locator, visible: bool) {
        self.inner
            .lock()
            .unwrap()
            .visible
            .insert(locator.key(), visible);
    }

    pub fn set_enabled(&self, locator: &Locator, enabled: bool) {
        self.inner
            .lock()
            .unwrap()
            .enabled
            .insert(locator.key(), enabled);
    }

    pub fn set_bbox(&self, locator: &Locator, bbox: BoundingBox) {
        self.inner.lock().unwrap().boxes.insert(locator.key(), bbox);
    }

    pub fn set_texts(&self, locator: &Locator, texts: Vec<&str>) {
        self.inner
            .lock()
            .unwrap()
            .texts
            .insert(locator.key(), texts.into_iter().map(String::from).collect());
    }

    pub fn set_attrs(&self, locator: &Locator, name: &str, values: Vec<&str>) {
        self.inner.lock().unwrap().attrs.insert(
            (locator.key(), name.to_string()),
            values.into_iter().map(String::from).collect(),
        );
    }

    /// Unique hrefs per click step.
    pub fn set_hrefs_steps(&self, steps: Vec<Vec<&str>>) {
        self.inner.lock().unwrap().hrefs_steps = steps
            .into_iter()
            .map(|step| step.into_iter().map(String::from).collect())
            .collect();
    }

    /// Page URL per click step.
    pub fn set_url_steps(&self, steps: Vec<&str>) {
        self.inner.lock().unwrap().url_steps =
            steps.into_iter().map(String::from).collect();
    }

    /// Page content per click step.
    pub fn set_content_steps(&self, steps: Vec<&str>) {
        self.inner.lock().unwrap().content_steps =
            steps.into_iter().map(String::from).collect();
    }

    pub fn set_api_response(&self, ok: bool) {
        self.inner.lock().unwrap().api_response = ok;
    }

    pub fn set_network_idle(&self, ok: bool) {
        self.inner.lock().unwrap().network_idle = ok;
    }

    pub fn set_fail_click_at(&self, fail: bool) {
        self.inner.lock().unwrap().fail_click_at = fail;
    }

    /// All recorded method calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls starting with the given prefix.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: impl Into<String>) {
        self.inner.lock().unwrap().calls.push(call.into());
    }

    fn advance_step(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.step += 1;
    }

    fn step_value<T: Clone + Default>(steps: &[T], step: usize) -> T {
        if steps.is_empty() {
            return T::default();
        }
        steps[step.min(steps.len() - 1)].clone()
    }
}

impl Page for FakePage {
    fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    fn current_url(&self) -> String {
        let inner = self.inner.lock().unwrap();
        Self::step_value(&inner.url_steps, inner.step)
    }

    fn count(&self, locator: &Locator) -> usize {
        let inner = self.inner.lock().unwrap();
        if let Some(steps) = inner.count_steps.get(&locator.key()) {
            return Self::step_value(steps, inner.step);
        }
        inner.counts.get(&locator.key()).copied().unwrap_or(0)
    }

    fn text(&self, locator: &Locator, pick: Pick) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        let texts = inner.texts.get(&locator.key())?;
        let index = match pick {
            Pick::First => 0,
            Pick::Last => texts.len().checked_sub(1)?,
            Pick::Nth(index) => index,
        };
        texts.get(index).cloned()
    }

    fn attr(&self, locator: &Locator, pick: Pick, name: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        let values = inner.attrs.get(&(locator.key(), name.to_string()))?;
        let index = match pick {
            Pick::First => 0,
            Pick::Last => values.len().checked_sub(1)?,
            Pick::Nth(index) => index,
        };
        values.get(index).cloned()
    }

    fn outer_html(&self, locator: &Locator, _pick: Pick) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .texts
            .get(&locator.key())
            .and_then(|texts| texts.first().cloned())
    }

    fn is_visible(&self, locator: &Locator) -> bool {
        let key = locator.key();
        let inner = self.inner.lock().unwrap();
        inner
            .visible
            .get(&key)
            .copied()
            .unwrap_or_else(|| inner.counts.get(&key).copied().unwrap_or(0) > 0)
    }

    fn is_enabled(&self, locator: &Locator) -> bool {
        let key = locator.key();
        let inner = self.inner.lock().unwrap();
        inner
            .enabled
            .get(&key)
            .copied()
            .unwrap_or_else(|| inner.counts.get(&key).copied().unwrap_or(0) > 0)
    }

    fn bounding_box(&self, locator: &Locator) -> Option<BoundingBox> {
        self.inner.lock().unwrap().boxes.get(&locator.key()).copied()
    }

    fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        self.record(format!("fill:{}:{}", locator.key(), value));
        if self.count(locator) == 0 {
            return Err(AppError::browser("fill", "no match"));
        }
        Ok(())
    }

    fn click_at(&self, x: f64, y: f64) -> Result<()> {
        self.record(format!("click_at:{x},{y}"));
        if self.inner.lock().unwrap().fail_click_at {
            return Err(AppError::browser("click", "scripted failure"));
        }
        self.advance_step();
        Ok(())
    }

    fn click_dom(&self, locator: &Locator, _pick: Pick) -> Result<()> {
        self.record(format!("click_dom:{}", locator.key()));
        if self.count(locator) == 0 {
            return Err(AppError::browser("click", "no match"));
        }
        self.advance_step();
        Ok(())
    }

    fn scroll_into_view(&self, locator: &Locator, _pick: Pick) -> bool {
        self.record(format!("scroll_into_view:{}", locator.key()));
        self.count(locator) > 0
    }

    fn scroll_by(&self, _dx: i64, dy: i64) {
        self.record(format!("scroll_by:{dy}"));
    }

    fn scroll_container_to_bottom(&self, locator: &Locator) -> bool {
        self.record(format!("scroll_container:{}", locator.key()));
        self.count(locator) > 0
    }

    fn scroll_page_to_bottom(&self) {
        self.record("scroll_page_bottom");
    }

    fn hrefs(&self, _locator: &Locator) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        Self::step_value(&inner.hrefs_steps, inner.step)
    }

    fn wait_for(&self, locator: &Locator, _timeout: Duration) -> bool {
        self.count(locator) > 0
    }

    fn wait_for_response(&self, url_fragment: &str, _timeout: Duration) -> bool {
        self.record(format!("wait_for_response:{url_fragment}"));
        self.inner.lock().unwrap().api_response
    }

    fn wait_for_network_idle(&self, _timeout: Duration) -> bool {
        self.record("wait_for_network_idle");
        self.inner.lock().unwrap().network_idle
    }

    fn wait_timeout(&self, delay: Duration) {
        self.record(format!("wait_timeout:{}", delay.as_millis()));
    }

    fn content(&self) -> Result<String> {
        let inner = self.inner.lock().unwrap();
        Ok(Self::step_value(&inner.content_steps, inner.step))
    }

    fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }
}
