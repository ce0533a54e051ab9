//! Headless Chrome implementation of the [`Page`] capability trait.
//!
//! Reads go through JavaScript evaluation so that text-filtered locators
//! behave identically everywhere; clicks prefer trusted CDP input events at
//! page coordinates, with DOM clicks as the forced fallback. Background
//! response waits use the tab's response interception hooks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use headless_chrome::protocol::cdp::Page as CdpPage;
use headless_chrome::browser::tab::point::Point;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::browser::{BoundingBox, Locator, Page, Pick};
use crate::error::{AppError, Result};
use crate::models::BrowserConfig;

/// Poll step for bounded waits.
const WAIT_POLL: Duration = Duration::from_millis(100);

/// Quiet window that counts as "network idle".
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// A Chrome tab behind the [`Page`] trait.
pub struct ChromePage {
    // The browser must outlive the tab; dropping it closes Chrome.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromePage {
    /// Launch a Chrome instance and open a blank tab.
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        log::info!("Launching headless Chrome (headless={})", config.headless);

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .idle_browser_timeout(Duration::from_millis(config.timeout_ms.max(60_000)))
            .build()
            .map_err(|e| AppError::browser("launch options", e))?;

        let browser = Browser::new(options).map_err(|e| AppError::browser("launch", e))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AppError::browser("new tab", e))?;

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    /// Evaluate a JS expression and return its JSON value, if any.
    fn eval(&self, expr: &str) -> Option<serde_json::Value> {
        match self.tab.evaluate(expr, false) {
            Ok(object) => object.value,
            Err(e) => {
                log::debug!("evaluate failed: {}", e);
                None
            }
        }
    }

    fn eval_bool(&self, expr: &str) -> bool {
        self.eval(expr).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    fn eval_string(&self, expr: &str) -> Option<String> {
        self.eval(expr).and_then(|v| v.as_str().map(str::to_string))
    }

    /// JS expression producing the array of elements a locator matches.
    fn matches_expr(locator: &Locator) -> String {
        let css = js_string(&locator.css);
        match &locator.text {
            Some(text) => format!(
                "Array.from(document.querySelectorAll({css})).filter(el => (el.textContent || '').includes({}))",
                js_string(text)
            ),
            None => format!("Array.from(document.querySelectorAll({css}))"),
        }
    }

    /// JS expression producing the picked element or null.
    fn pick_expr(locator: &Locator, pick: Pick) -> String {
        let matches = Self::matches_expr(locator);
        match pick {
            Pick::First => format!("(({matches})[0] || null)"),
            Pick::Last => format!("(arr => arr[arr.length - 1] || null)({matches})"),
            Pick::Nth(index) => format!("(({matches})[{index}] || null)"),
        }
    }
}

impl Page for ChromePage {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| AppError::browser("navigate", e))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| AppError::browser("navigate", e))?;
        Ok(())
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    fn count(&self, locator: &Locator) -> usize {
        let expr = format!("({}).length", Self::matches_expr(locator));
        self.eval(&expr)
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize
    }

    fn text(&self, locator: &Locator, pick: Pick) -> Option<String> {
        let expr = format!(
            "(el => el ? el.textContent : null)({})",
            Self::pick_expr(locator, pick)
        );
        self.eval_string(&expr)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    fn attr(&self, locator: &Locator, pick: Pick, name: &str) -> Option<String> {
        let expr = format!(
            "(el => el ? el.getAttribute({}) : null)({})",
            js_string(name),
            Self::pick_expr(locator, pick)
        );
        self.eval_string(&expr)
    }

    fn outer_html(&self, locator: &Locator, pick: Pick) -> Option<String> {
        let expr = format!(
            "(el => el ? el.outerHTML : null)({})",
            Self::pick_expr(locator, pick)
        );
        self.eval_string(&expr)
    }

    fn is_visible(&self, locator: &Locator) -> bool {
        let expr = format!(
            "(el => el !== null && el.getClientRects().length > 0)({})",
            Self::pick_expr(locator, Pick::First)
        );
        self.eval_bool(&expr)
    }

    fn is_enabled(&self, locator: &Locator) -> bool {
        let expr = format!(
            "(el => el !== null && !el.disabled)({})",
            Self::pick_expr(locator, Pick::First)
        );
        self.eval_bool(&expr)
    }

    fn bounding_box(&self, locator: &Locator) -> Option<BoundingBox> {
        let expr = format!(
            "(el => {{ if (!el) return null; const r = el.getBoundingClientRect(); \
             return JSON.stringify({{x: r.x, y: r.y, width: r.width, height: r.height}}); }})({})",
            Self::pick_expr(locator, Pick::First)
        );
        let raw = self.eval_string(&expr)?;
        let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
        Some(BoundingBox {
            x: value.get("x")?.as_f64()?,
            y: value.get("y")?.as_f64()?,
            width: value.get("width")?.as_f64()?,
            height: value.get("height")?.as_f64()?,
        })
    }

    fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        let focused = self.eval_bool(&format!(
            "(el => el ? (el.focus(), true) : false)({})",
            Self::pick_expr(locator, Pick::First)
        ));
        if !focused {
            return Err(AppError::browser("fill", format!("no match for {}", locator.css)));
        }
        self.tab
            .type_str(value)
            .map_err(|e| AppError::browser("fill", e))?;
        Ok(())
    }

    fn click_at(&self, x: f64, y: f64) -> Result<()> {
        self.tab
            .click_point(Point { x, y })
            .map_err(|e| AppError::browser("click", e))?;
        Ok(())
    }

    fn click_dom(&self, locator: &Locator, pick: Pick) -> Result<()> {
        let clicked = self.eval_bool(&format!(
            "(el => el ? (el.click(), true) : false)({})",
            Self::pick_expr(locator, pick)
        ));
        if clicked {
            Ok(())
        } else {
            Err(AppError::browser(
                "click",
                format!("no match for {}", locator.css),
            ))
        }
    }

    fn scroll_into_view(&self, locator: &Locator, pick: Pick) -> bool {
        self.eval_bool(&format!(
            "(el => el ? (el.scrollIntoView({{block: 'center'}}), true) : false)({})",
            Self::pick_expr(locator, pick)
        ))
    }

    fn scroll_by(&self, dx: i64, dy: i64) {
        let _ = self.eval(&format!("window.scrollBy({dx}, {dy})"));
    }

    fn scroll_container_to_bottom(&self, locator: &Locator) -> bool {
        let scrolled = self.eval_bool(&format!(
            "(el => el ? (el.scrollTop = el.scrollHeight, true) : false)({})",
            Self::pick_expr(locator, Pick::First)
        ));
        if !scrolled {
            self.scroll_page_to_bottom();
        }
        scrolled
    }

    fn scroll_page_to_bottom(&self) {
        let _ = self.eval("window.scrollTo(0, document.body.scrollHeight)");
    }

    fn hrefs(&self, locator: &Locator) -> Vec<String> {
        let expr = format!(
            "JSON.stringify(Array.from(new Set(({})\
             .map(el => el.getAttribute('href')).filter(Boolean))))",
            Self::matches_expr(locator)
        );
        self.eval_string(&expr)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn wait_for(&self, locator: &Locator, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count(locator) > 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(WAIT_POLL);
        }
    }

    fn wait_for_response(&self, url_fragment: &str, timeout: Duration) -> bool {
        static HANDLER_SEQ: OnceLock<Mutex<u64>> = OnceLock::new();
        let seq = {
            let mut guard = HANDLER_SEQ.get_or_init(|| Mutex::new(0)).lock().unwrap();
            *guard += 1;
            *guard
        };
        let handler_name = format!("irisbot_response_wait_{seq}");

        let hit = Arc::new(AtomicBool::new(false));
        let hit_flag = Arc::clone(&hit);
        let fragment = url_fragment.to_string();

        let registered = self.tab.register_response_handling(
            &handler_name,
            Box::new(move |event_params, _fetch_body| {
                let response = &event_params.response;
                if response.url.contains(&fragment)
                    && response.status >= 200
                    && response.status < 300
                {
                    hit_flag.store(true, Ordering::SeqCst);
                }
            }),
        );
        if let Err(e) = registered {
            log::debug!("response handler registration failed: {}", e);
            return false;
        }

        let deadline = Instant::now() + timeout;
        while !hit.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(WAIT_POLL);
        }

        let _ = self.tab.deregister_response_handling(&handler_name);
        hit.load(Ordering::SeqCst)
    }

    fn wait_for_network_idle(&self, timeout: Duration) -> bool {
        let last_activity = Arc::new(Mutex::new(Instant::now()));
        let activity = Arc::clone(&last_activity);

        let registered = self.tab.register_response_handling(
            "irisbot_idle_wait",
            Box::new(move |_event_params, _fetch_body| {
                *activity.lock().unwrap() = Instant::now();
            }),
        );
        if registered.is_err() {
            // Can't observe traffic; treat the bound as a plain delay
            std::thread::sleep(timeout.min(IDLE_WINDOW));
            return false;
        }

        let deadline = Instant::now() + timeout;
        let idle = loop {
            if last_activity.lock().unwrap().elapsed() >= IDLE_WINDOW {
                break true;
            }
            if Instant::now() >= deadline {
                break false;
            }
            std::thread::sleep(WAIT_POLL);
        };

        let _ = self.tab.deregister_response_handling("irisbot_idle_wait");
        idle
    }

    fn wait_timeout(&self, delay: Duration) {
        std::thread::sleep(delay);
    }

    fn content(&self) -> Result<String> {
        self.eval_string("document.documentElement.outerHTML")
            .ok_or_else(|| AppError::browser("content", "page returned no HTML"))
    }

    fn screenshot(&self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(
                CdpPage::CaptureScreenshotFormatOption::Png,
                None,
                None,
                true,
            )
            .map_err(|e| AppError::browser("screenshot", e))
    }
}

/// Encode a Rust string as a JS string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escaping() {
        assert_eq!(js_string("a[href*='/proyecto/']"), r#""a[href*='/proyecto/']""#);
        assert_eq!(js_string(r#"say "hi""#), r#""say \"hi\"""#);
    }

    #[test]
    fn test_pick_expr_variants() {
        let locator = Locator::css("button");
        assert!(ChromePage::pick_expr(&locator, Pick::First).contains("[0]"));
        assert!(ChromePage::pick_expr(&locator, Pick::Last).contains("arr.length - 1"));
        assert!(ChromePage::pick_expr(&locator, Pick::Nth(3)).contains("[3]"));
    }

    #[test]
    fn test_matches_expr_with_text_filter() {
        let locator = Locator::with_text("button", "Cargar más");
        let expr = ChromePage::matches_expr(&locator);
        assert!(expr.contains("querySelectorAll(\"button\")"));
        assert!(expr.contains("includes(\"Cargar más\")"));
    }
}
