//! Platform authentication.
//!
//! Fills the login form, submits it and waits out the post-login redirect.
//! Only the boolean outcome escapes this module; every internal failure is
//! logged and surfaces as "not logged in", since the caller cannot do
//! anything more granular than abort the run.

use std::time::Duration;

use crate::browser::{Locator, Page, Pick};
use crate::models::Config;

/// Poll step while waiting for the post-login redirect.
const REDIRECT_POLL_MS: u64 = 500;

/// Login flow against the platform's email/password form.
pub struct Authenticator<'a> {
    page: &'a dyn Page,
    config: &'a Config,
}

impl<'a> Authenticator<'a> {
    pub fn new(page: &'a dyn Page, config: &'a Config) -> Self {
        Self { page, config }
    }

    /// Authenticate with the configured credentials.
    ///
    /// The page must already be on the login URL. Returns whether the
    /// session ended up authenticated.
    pub fn login(&self) -> bool {
        let auth = &self.config.auth;
        if auth.email.is_empty() || auth.password.is_empty() {
            log::error!("Email and/or password not configured");
            return false;
        }

        log::info!("Authenticating as {}", auth.email);

        let selectors = &self.config.selectors.auth;
        let email_input = Locator::css(&selectors.email_input);
        let timeout = Duration::from_millis(self.config.browser.timeout_ms);

        if !self.page.wait_for(&email_input, timeout) {
            log::error!("Login form never appeared");
            return false;
        }

        if let Err(e) = self.page.fill(&email_input, &auth.email) {
            log::error!("Could not fill email field: {}", e);
            return false;
        }
        if let Err(e) = self
            .page
            .fill(&Locator::css(&selectors.password_input), &auth.password)
        {
            log::error!("Could not fill password field: {}", e);
            return false;
        }

        let submit = Locator::css(&selectors.submit_button);
        if let Err(e) = self.page.click_dom(&submit, Pick::First) {
            log::error!("Could not press the login button: {}", e);
            return false;
        }

        // Give the platform time to process the login before checking
        self.page
            .wait_timeout(Duration::from_millis(auth.button_click_delay_ms));

        self.surface_page_errors();

        if !self.wait_for_redirect() {
            log::error!("No URL change after login; check credentials");
            return false;
        }

        if !self.page.wait_for_network_idle(Duration::from_millis(
            auth.networkidle_timeout_ms,
        )) {
            log::warn!("Post-login page never settled (may still be authenticated)");
        }

        self.verify_authenticated_view()
    }

    /// Log any visible error message the login form rendered.
    fn surface_page_errors(&self) {
        for css in &self.config.selectors.auth.error_indicators {
            if let Some(text) = self.page.text(&Locator::css(css), Pick::First) {
                log::error!("Login page error: {}", text);
            }
        }
    }

    /// Poll for the URL to leave the login path, bounded by the redirect
    /// timeout.
    fn wait_for_redirect(&self) -> bool {
        let login_path = login_path(&self.config.urls.login);
        let attempts =
            (self.config.auth.redirect_timeout_ms / REDIRECT_POLL_MS).max(1);

        for _ in 0..attempts {
            if !self
                .page
                .current_url()
                .to_lowercase()
                .contains(&login_path)
            {
                return true;
            }
            self.page
                .wait_timeout(Duration::from_millis(REDIRECT_POLL_MS));
        }
        false
    }

    /// Confirm the session landed on an authenticated view, navigating to
    /// the catalog directly when the redirect went elsewhere.
    fn verify_authenticated_view(&self) -> bool {
        let current = self.page.current_url();
        let lower = current.to_lowercase();
        log::debug!("URL after login: {}", current);

        if lower.contains(&login_path(&self.config.urls.login)) || lower.contains("/login") {
            log::error!("Still on the login page: {}", current);
            return false;
        }

        if !current.contains("/proyectos") {
            log::warn!("Authenticated but not on the catalog: {}", current);
            if let Err(e) = self.page.navigate(&self.config.urls.catalog) {
                log::warn!("Could not navigate to the catalog: {}", e);
            }
        }

        log::info!("Authentication successful ({})", self.page.current_url());
        true
    }
}

/// Lowercased path component of the login URL, used to detect whether the
/// browser has left the login page.
fn login_path(login_url: &str) -> String {
    url::Url::parse(login_url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| "/iniciar-sesion".to_string())
}
