//! Login-state detection and credential submission.

use crate::constants::{FORM_BUILD_ID_FIELD, FORM_BUILD_ID_SELECTOR, LOGIN_FORM_ID};
use crate::errors::{AppError, AppResult};
use crate::models::Credentials;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use tracing::{debug, error, info};

/// Cached CSS selector for the hidden login token.
static FORM_BUILD_ID_SELECTOR_CACHED: OnceLock<Selector> = OnceLock::new();

/// Whether the session still has to submit the login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// Login form present; carries the token it must be posted with.
    NeedsLogin { form_build_id: String },
    /// No login form on the page.
    AlreadyAuthenticated,
}

/// Inspects the landing page for the hidden `form_build_id` input.
///
/// # Errors
///
/// Returns `ParseError` when the input exists but has no `value` attribute.
pub fn detect_login_state(html: &str) -> AppResult<LoginState> {
    let document = Html::parse_document(html);
    let selector = FORM_BUILD_ID_SELECTOR_CACHED.get_or_init(|| {
        Selector::parse(FORM_BUILD_ID_SELECTOR)
            .expect("FORM_BUILD_ID_SELECTOR is a valid CSS selector")
    });

    let Some(input) = document.select(selector).next() else {
        return Ok(LoginState::AlreadyAuthenticated);
    };

    let form_build_id = input.value().attr("value").ok_or_else(|| {
        AppError::ParseError("Login form token field has no value".to_string())
    })?;

    Ok(LoginState::NeedsLogin {
        form_build_id: form_build_id.to_string(),
    })
}

/// Form fields the portal expects on the login POST.
pub fn login_form<'a>(
    credentials: &'a Credentials,
    form_build_id: &'a str,
) -> [(&'static str, &'a str); 4] {
    [
        ("name", credentials.username.as_str()),
        ("pass", credentials.password.as_str()),
        ("form_id", LOGIN_FORM_ID),
        (FORM_BUILD_ID_FIELD, form_build_id),
    ]
}

/// Posts credentials to the portal. Exactly one attempt is made.
///
/// # Errors
///
/// Returns `AuthenticationError` for any final status other than 200, and
/// `NetworkError` if the request itself fails.
pub async fn submit_login(
    client: &reqwest::Client,
    portal_url: &str,
    credentials: &Credentials,
    form_build_id: &str,
) -> AppResult<()> {
    debug!(
        token_prefix = %form_build_id.chars().take(10).collect::<String>(),
        "Prepared login payload"
    );
    info!(user = %credentials.masked_username(), "Submitting login credentials");

    let response = client
        .post(portal_url)
        .form(&login_form(credentials, form_build_id))
        .send()
        .await?;

    let status = response.status();
    debug!(status = status.as_u16(), "Login response received");

    if status != reqwest::StatusCode::OK {
        error!(status = status.as_u16(), "Login failed");
        return Err(AppError::AuthenticationError);
    }

    info!("Login successful");
    Ok(())
}
