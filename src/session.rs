//! HTTP session shared by every step of a scrape.
//!
//! The portal sits behind an anti-automation check that turns away clients which
//! do not look like a desktop browser, so the client presents a Chrome-on-Windows
//! identity and keeps cookies between requests. Connectivity is not checked here;
//! a broken session shows up later as non-200 responses.

use crate::config::ResolvedConfig;
use crate::constants::{BROWSER_ACCEPT, BROWSER_ACCEPT_LANGUAGE};
use crate::errors::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::debug;

/// Builds the cookie-bearing client used for login, listing and downloads.
pub fn build_client(config: &ResolvedConfig) -> AppResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
    );

    let mut builder = reqwest::Client::builder()
        .cookie_store(true)
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10));

    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }

    let client = builder
        .build()
        .map_err(|e| AppError::NetworkError(format!("Failed to build HTTP client: {e}")))?;

    debug!(user_agent = %config.user_agent, "HTTP session created");
    Ok(client)
}
