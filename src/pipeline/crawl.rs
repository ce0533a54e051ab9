// src/pipeline/crawl.rs

//! Catalog crawl pipeline.
//!
//! Drives the whole sequence: authenticate, reach the catalog, switch to
//! the list view, then alternate extraction/persistence with "load more"
//! pagination until the catalog is exhausted or the iteration cap is hit.
//!
//! Each iteration's upserts are committed before pagination is attempted,
//! so cancelling between iterations always leaves the store consistent and
//! the run resumable.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::browser::{Locator, Page, Pick};
use crate::error::{AppError, Result};
use crate::models::Config;
use crate::pipeline::diff::{compare_project, format_change_message};
use crate::services::{Authenticator, FieldExtractor, Paginator};
use crate::storage::ProjectStore;
use crate::utils::url::extract_project_id;

/// Cap on project-ID previews in the final summary.
const SUMMARY_PREVIEW: usize = 10;

/// Per-iteration classification counters.
///
/// Reset at the start of every iteration; the run-wide picture lives in
/// the [`CrawlSummary`] accumulators instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IterationStats {
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Structured result of a crawl run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    /// Records that survived session dedup and the name filter
    pub total_records: usize,
    /// Distinct detail URLs observed
    pub unique_urls: usize,
    /// IDs inserted for the first time
    pub new_ids: Vec<i64>,
    /// IDs updated with detected changes
    pub updated_ids: Vec<i64>,
    /// IDs observed without any change
    pub unchanged_ids: Vec<i64>,
    /// Per-iteration counters, in order
    pub per_iteration: Vec<IterationStats>,
    /// Iterations performed
    pub iterations: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlSummary {
    fn begin() -> Self {
        let now = Utc::now();
        Self {
            total_records: 0,
            unique_urls: 0,
            new_ids: Vec::new(),
            updated_ids: Vec::new(),
            unchanged_ids: Vec::new(),
            per_iteration: Vec::new(),
            iterations: 0,
            elapsed: Duration::ZERO,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn avg_records_per_iteration(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.total_records as f64 / self.iterations as f64
    }

    /// Log the run summary.
    pub fn log(&self) {
        log::info!("Catalog scraping completed");
        log::info!("  Records captured: {}", self.total_records);
        log::info!("  Unique URLs: {}", self.unique_urls);
        log::info!(
            "  New projects: {}{}",
            self.new_ids.len(),
            preview(&self.new_ids)
        );
        log::info!(
            "  Updated projects: {}{}",
            self.updated_ids.len(),
            preview(&self.updated_ids)
        );
        log::info!(
            "  Unchanged projects (no write): {}",
            self.unchanged_ids.len()
        );
        log::info!(
            "  Iterations: {} ({:.2}s total, {:.1} records/iteration)",
            self.iterations,
            self.elapsed.as_secs_f64(),
            self.avg_records_per_iteration()
        );
    }
}

/// Capped ID preview like ` [235, 682, ... (3 more)]`.
fn preview(ids: &[i64]) -> String {
    if ids.is_empty() {
        return String::new();
    }
    let shown: Vec<String> = ids.iter().take(SUMMARY_PREVIEW).map(i64::to_string).collect();
    if ids.len() > SUMMARY_PREVIEW {
        format!(
            " [{}, ... ({} more)]",
            shown.join(", "),
            ids.len() - SUMMARY_PREVIEW
        )
    } else {
        format!(" [{}]", shown.join(", "))
    }
}

/// Run the catalog crawl to completion.
///
/// `cancel` is checked between iterations; setting it stops the run after
/// the current iteration's upserts have been committed.
pub fn run_catalog_crawl(
    page: &dyn Page,
    store: &ProjectStore,
    config: &Config,
    cancel: &AtomicBool,
) -> Result<CrawlSummary> {
    config.validate()?;
    log_configuration(config);

    page.navigate(&config.urls.login)?;
    if !Authenticator::new(page, config).login() {
        return Err(AppError::auth(
            "could not authenticate; verify IRIS_EMAIL/IRIS_PASSWORD",
        ));
    }

    page.navigate(&config.urls.catalog)?;
    ensure_list_view(page, config);

    // Let the client-side render finish before the first snapshot
    let first_card = Locator::css(&config.selectors.row_selector);
    page.wait_for(
        &first_card,
        Duration::from_millis(config.browser.timeout_ms),
    );

    let artifacts_dir = Path::new(&config.storage.artifacts_dir);
    std::fs::create_dir_all(artifacts_dir)?;
    save_artifacts(page, artifacts_dir, "01_catalog_initial");

    let Some((card_css, card_count)) = pick_card_selector(page, config) else {
        return Err(AppError::crawl(
            "catalog",
            "no project card selector matched on first load",
        ));
    };
    log::info!("Project selector used: {} (count={})", card_css, card_count);
    save_card_sample(page, artifacts_dir, &card_css);

    let extractor = FieldExtractor::new(&config.selectors, &config.urls.base);
    let paginator = Paginator::new(page, config, &card_css);

    let mut summary = CrawlSummary::begin();
    let mut seen_detail_urls: HashSet<String> = HashSet::new();
    let start = Instant::now();

    log::info!(
        "Starting catalog pagination (max {} iterations)",
        config.pagination.max_iterations
    );

    while summary.iterations < config.pagination.max_iterations {
        if cancel.load(Ordering::SeqCst) {
            log::info!("Cancellation requested; stopping before the next iteration");
            break;
        }

        summary.iterations += 1;
        let iteration = summary.iterations;
        let iteration_start = Instant::now();
        let mut stats = IterationStats::default();

        log::info!(
            "Iteration {}/{}",
            iteration,
            config.pagination.max_iterations
        );

        let html = page.content()?;
        let records = extractor.extract_all(&html, &card_css);
        log::debug!("Cards visible: {}", records.len());

        for record in records {
            if let Some(url) = record.detail_url.as_deref() {
                if !seen_detail_urls.insert(url.to_string()) {
                    continue;
                }
            }
            if record.name.is_none() {
                continue;
            }
            summary.total_records += 1;
            log::debug!("Extracted: {}", record.describe());

            let Some(project_id) = record.detail_url.as_deref().and_then(extract_project_id)
            else {
                log::warn!(
                    "Could not extract project id from URL: {:?}",
                    record.detail_url
                );
                continue;
            };

            // Persistence problems are iteration-local: log and move on so
            // the remaining cards still get their chance.
            let existing = match store.fetch(project_id) {
                Ok(existing) => existing,
                Err(e) => {
                    log::error!("Lookup failed for project {}: {}", project_id, e);
                    continue;
                }
            };

            let diff = compare_project(existing.as_ref(), &record);
            if !diff.has_changes {
                summary.unchanged_ids.push(project_id);
                stats.unchanged += 1;
                continue;
            }

            if let Err(e) = store.upsert(project_id, &record) {
                log::error!("Upsert failed for project {}: {}", project_id, e);
                continue;
            }

            if existing.is_none() {
                log::info!(
                    "NEW project {} - {}",
                    project_id,
                    record.name.as_deref().unwrap_or("?")
                );
                summary.new_ids.push(project_id);
                stats.new += 1;
            } else {
                log::info!("{}", format_change_message(project_id, &diff));
                summary.updated_ids.push(project_id);
                stats.updated += 1;
            }
        }

        summary.per_iteration.push(stats);
        log::info!(
            "Iteration {} done: {} new, {} updated, {} unchanged ({} total, {:.2}s)",
            iteration,
            stats.new,
            stats.updated,
            stats.unchanged,
            summary.total_records,
            iteration_start.elapsed().as_secs_f64()
        );

        save_artifacts(
            page,
            artifacts_dir,
            &format!("{:02}_catalog_page_{}", iteration + 1, iteration - 1),
        );

        if cancel.load(Ordering::SeqCst) {
            log::info!("Cancellation requested; skipping pagination");
            break;
        }

        if !paginator.load_more() {
            log::info!("No more entries loaded. End of catalog reached.");
            break;
        }
    }

    summary.unique_urls = seen_detail_urls.len();
    summary.elapsed = start.elapsed();
    summary.finished_at = Utc::now();
    summary.log();
    save_summary(&summary, artifacts_dir);
    Ok(summary)
}

/// Serialize the run summary next to the page artifacts.
fn save_summary(summary: &CrawlSummary, dir: &Path) {
    match serde_json::to_vec_pretty(summary) {
        Ok(json) => {
            if let Err(e) = std::fs::write(dir.join("crawl_summary.json"), json) {
                log::debug!("Could not save crawl summary: {e}");
            }
        }
        Err(e) => log::debug!("Could not serialize crawl summary: {e}"),
    }
}

/// First card selector strategy with at least one match.
fn pick_card_selector(page: &dyn Page, config: &Config) -> Option<(String, usize)> {
    config
        .selectors
        .card_strategies
        .iter()
        .find_map(|strategy| {
            let count = page.count(&Locator::css(strategy));
            (count > 0).then(|| (strategy.clone(), count))
        })
}

/// Switch the catalog to the list view if the toggle exists.
fn ensure_list_view(page: &dyn Page, config: &Config) {
    let container = Locator::css(&config.selectors.view_toggle_container);
    if page.count(&container) == 0 {
        return;
    }

    let buttons = Locator::css(&format!(
        "{} button",
        config.selectors.view_toggle_container
    ));
    let count = page.count(&buttons);
    if count == 0 {
        return;
    }

    let delay = Duration::from_millis(config.scroll.view_switch_delay_ms);
    for index in 0..count {
        let text = page.text(&buttons, Pick::Nth(index)).unwrap_or_default();
        if text.contains(&config.selectors.list_view_label) {
            let classes = page
                .attr(&buttons, Pick::Nth(index), "class")
                .unwrap_or_default();
            if classes.contains("active") {
                return;
            }
            let _ = page.click_dom(&buttons, Pick::Nth(index));
            page.wait_timeout(delay);
            return;
        }
    }

    // No labeled button: the second toggle is the list view by convention
    if count > 1 {
        let _ = page.click_dom(&buttons, Pick::Nth(1));
        page.wait_timeout(delay);
    }
}

/// Best-effort screenshot + HTML snapshot pair.
fn save_artifacts(page: &dyn Page, dir: &Path, stem: &str) {
    match page.screenshot() {
        Ok(bytes) => {
            if let Err(e) = std::fs::write(dir.join(format!("{stem}.png")), bytes) {
                log::debug!("Could not save screenshot {stem}: {e}");
            }
        }
        Err(e) => log::debug!("Screenshot failed for {stem}: {e}"),
    }
    match page.content() {
        Ok(html) => {
            if let Err(e) = std::fs::write(dir.join(format!("{stem}.html")), html) {
                log::debug!("Could not save HTML snapshot {stem}: {e}");
            }
        }
        Err(e) => log::debug!("Content capture failed for {stem}: {e}"),
    }
}

/// Dump the first card's outer HTML for selector debugging.
fn save_card_sample(page: &dyn Page, dir: &Path, card_css: &str) {
    if let Some(html) = page.outer_html(&Locator::css(card_css), Pick::First) {
        let _ = std::fs::write(dir.join("catalog_row_sample.html"), html);
    }
}

fn log_configuration(config: &Config) {
    log::info!("Irisbot catalog scraper");
    log::info!("  Headless mode: {}", config.browser.headless);
    log::info!("  Max iterations: {}", config.pagination.max_iterations);
    log::info!(
        "  Poll: {}ms x {} attempts",
        config.pagination.poll_interval_ms,
        config.pagination.poll_max_attempts
    );
    log::info!(
        "  Scroll delays: step {}ms, after {}ms, retry {}ms",
        config.scroll.step_delay_ms,
        config.scroll.after_delay_ms,
        config.scroll.retry_delay_ms
    );
    log::info!(
        "  Network fallback: {}ms",
        config.scroll.networkidle_fallback_ms
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;
    use crate::models::ProjectRecord;

    const LOGIN: &str = "https://iris.example.com/iniciar-sesion";
    const CATALOG: &str = "https://iris.example.com/proyectos?country=1";
    const CARD_CSS: &str = "a[href*='/proyecto/']";

    /// Minimal list-layout card: an anchor wrapping the marker row with
    /// only the name column populated.
    fn card(id: i64, name: &str) -> String {
        format!(
            r#"<a href="/proyecto/{id}">
                <div class="p-2 row">
                    <div></div>
                    <div><span class="property-table-title">{name}</span></div>
                </div>
            </a>"#
        )
    }

    fn test_config(artifacts_dir: &Path) -> Config {
        let mut config = Config::default();
        config.auth.email = "user@test".into();
        config.auth.password = "secret".into();
        config.auth.redirect_timeout_ms = 1_000;
        config.urls.base = "https://iris.example.com".into();
        config.urls.login = LOGIN.into();
        config.urls.catalog = CATALOG.into();
        config.storage.artifacts_dir = artifacts_dir.to_string_lossy().into_owned();
        config.pagination.max_click_cycles = 2;
        config.pagination.poll_max_attempts = 2;
        config
    }

    /// Page scripted through login and one catalog view.
    fn crawl_page(config: &Config, contents: Vec<&str>) -> FakePage {
        let page = FakePage::new();
        let auth = &config.selectors.auth;
        page.set_count(&Locator::css(&auth.email_input), 1);
        page.set_count(&Locator::css(&auth.password_input), 1);
        page.set_count(&Locator::css(&auth.submit_button), 1);
        page.set_network_idle(true);
        page.set_api_response(true);
        page.set_count(&Locator::css(CARD_CSS), 1);

        // Step 0 is pre-login; the submit click advances past it
        let mut url_steps = vec![LOGIN];
        let mut content_steps = vec![""];
        for content in contents {
            url_steps.push(CATALOG);
            content_steps.push(content);
        }
        page.set_url_steps(url_steps);
        page.set_content_steps(content_steps);
        page
    }

    // Minimal cards carry only a name and detail URL; a stored row for
    // "unchanged" scenarios must look exactly like that.
    fn stored_record(id: i64, name: &str) -> ProjectRecord {
        ProjectRecord {
            name: Some(name.into()),
            detail_url: Some(format!("https://iris.example.com/proyecto/{id}")),
            ..ProjectRecord::default()
        }
    }

    #[test]
    fn test_single_iteration_when_catalog_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let cards = format!("{}{}", card(1, "P 1"), card(2, "P 2"));
        let page = crawl_page(&config, vec![&cards]);
        let store = ProjectStore::open_in_memory().unwrap();
        let cancel = AtomicBool::new(false);

        let summary = run_catalog_crawl(&page, &store, &config, &cancel).unwrap();

        assert_eq!(summary.iterations, 1);
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.new_ids, vec![1, 2]);
        assert_eq!(summary.unique_urls, 2);
        assert_eq!(store.count().unwrap(), 2);
        // Initial + per-iteration artifacts and the serialized summary
        assert!(dir.path().join("01_catalog_initial.html").exists());
        assert!(dir.path().join("02_catalog_page_0.png").exists());
        assert!(dir.path().join("crawl_summary.json").exists());
    }

    #[test]
    fn test_counters_reset_per_iteration_and_globals_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        // Iteration 1: project 1 is new, project 2 updates a stored row.
        // Iteration 2: projects 1-2 are session-duplicates, project 3
        // matches its stored row, project 4 is new.
        let iter1 = format!("{}{}", card(1, "P 1"), card(2, "P 2"));
        let iter2 = format!(
            "{}{}{}{}",
            card(1, "P 1"),
            card(2, "P 2"),
            card(3, "P 3"),
            card(4, "P 4")
        );
        let page = crawl_page(&config, vec![&iter1, &iter2]);

        // Load-more control: first click succeeds (href growth), later
        // cycles find no growth and end the catalog.
        let control = Locator::with_text("button", "Cargar más");
        page.set_count(&control, 1);
        page.set_hrefs_steps(vec![
            vec![],
            vec!["/proyecto/1", "/proyecto/2"],
            vec!["/proyecto/1", "/proyecto/2", "/proyecto/3", "/proyecto/4"],
            vec!["/proyecto/1", "/proyecto/2", "/proyecto/3", "/proyecto/4"],
        ]);

        let store = ProjectStore::open_in_memory().unwrap();
        store.upsert(2, &stored_record(2, "P 2 (old name)")).unwrap();
        store.upsert(3, &stored_record(3, "P 3")).unwrap();

        let cancel = AtomicBool::new(false);
        let summary = run_catalog_crawl(&page, &store, &config, &cancel).unwrap();

        assert_eq!(summary.iterations, 2);
        assert_eq!(
            summary.per_iteration,
            vec![
                IterationStats {
                    new: 1,
                    updated: 1,
                    unchanged: 0
                },
                IterationStats {
                    new: 1,
                    updated: 0,
                    unchanged: 1
                },
            ]
        );
        // Globals accumulate across iterations
        assert_eq!(summary.new_ids, vec![1, 4]);
        assert_eq!(summary.updated_ids, vec![2]);
        assert_eq!(summary.unchanged_ids, vec![3]);
        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.unique_urls, 4);
    }

    #[test]
    fn test_session_dedup_skips_repeated_urls() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        // The same card twice in one view counts once
        let cards = format!("{}{}", card(5, "P 5"), card(5, "P 5"));
        let page = crawl_page(&config, vec![&cards]);
        let store = ProjectStore::open_in_memory().unwrap();
        let cancel = AtomicBool::new(false);

        let summary = run_catalog_crawl(&page, &store, &config, &cancel).unwrap();
        assert_eq!(summary.total_records, 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_nameless_cards_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let cards = format!(
            r#"<div class="property-card"><a href="/proyecto/9"></a></div>{}"#,
            card(6, "P 6")
        );
        let page = crawl_page(&config, vec![&cards]);
        let store = ProjectStore::open_in_memory().unwrap();
        let cancel = AtomicBool::new(false);

        let summary = run_catalog_crawl(&page, &store, &config, &cancel).unwrap();
        assert_eq!(summary.total_records, 1);
        assert_eq!(summary.new_ids, vec![6]);
    }

    #[test]
    fn test_auth_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.auth.password.clear();
        let page = crawl_page(&config, vec![""]);
        let store = ProjectStore::open_in_memory().unwrap();
        let cancel = AtomicBool::new(false);

        let result = run_catalog_crawl(&page, &store, &config, &cancel);
        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[test]
    fn test_placeholder_catalog_url_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.urls.catalog = "https://example.com/proyectos".into();
        let page = crawl_page(&config, vec![""]);
        let store = ProjectStore::open_in_memory().unwrap();
        let cancel = AtomicBool::new(false);

        let result = run_catalog_crawl(&page, &store, &config, &cancel);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_no_card_selector_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let page = crawl_page(&config, vec![""]);
        // Remove the only matching card strategy
        page.set_count(&Locator::css(CARD_CSS), 0);
        let store = ProjectStore::open_in_memory().unwrap();
        let cancel = AtomicBool::new(false);

        let result = run_catalog_crawl(&page, &store, &config, &cancel);
        assert!(matches!(result, Err(AppError::Crawl { .. })));
    }

    #[test]
    fn test_cancellation_before_first_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let page = crawl_page(&config, vec![&card(1, "P 1")]);
        let store = ProjectStore::open_in_memory().unwrap();
        let cancel = AtomicBool::new(true);

        let summary = run_catalog_crawl(&page, &store, &config, &cancel).unwrap();
        assert_eq!(summary.iterations, 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_ensure_list_view_clicks_inactive_toggle() {
        let config = Config::default();
        let page = FakePage::new();
        let container = Locator::css(&config.selectors.view_toggle_container);
        let buttons = Locator::css(&format!(
            "{} button",
            config.selectors.view_toggle_container
        ));
        page.set_count(&container, 1);
        page.set_count(&buttons, 2);
        page.set_texts(&buttons, vec!["Mapa", "Lista"]);
        page.set_attrs(&buttons, "class", vec!["btn", "btn"]);

        ensure_list_view(&page, &config);
        assert_eq!(page.call_count("click_dom"), 1);
    }

    #[test]
    fn test_ensure_list_view_skips_active_toggle() {
        let config = Config::default();
        let page = FakePage::new();
        let container = Locator::css(&config.selectors.view_toggle_container);
        let buttons = Locator::css(&format!(
            "{} button",
            config.selectors.view_toggle_container
        ));
        page.set_count(&container, 1);
        page.set_count(&buttons, 2);
        page.set_texts(&buttons, vec!["Mapa", "Lista"]);
        page.set_attrs(&buttons, "class", vec!["btn", "btn active"]);

        ensure_list_view(&page, &config);
        assert_eq!(page.call_count("click_dom"), 0);
    }

    #[test]
    fn test_preview_caps_long_lists() {
        let ids: Vec<i64> = (1..=15).collect();
        let text = preview(&ids);
        assert!(text.contains("(5 more)"));
        assert!(preview(&[]).is_empty());
    }
}
