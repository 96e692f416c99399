//! Common test utilities for integration tests: an in-process mock of the library portal.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const PORTAL_PATH: &str = "/library/exam-papers";
pub const FORM_TOKEN: &str = "form-QmT4x9Zk_token";
const SESSION_COOKIE: &str = "SESSmock=authenticated";

/// Login page as served to an anonymous visitor
#[allow(dead_code)]
pub const LOGIN_PAGE: &str = r#"<html><body>
  <form id="user-login" action="/library/exam-papers" method="post">
    <input type="text" name="name" />
    <input type="password" name="pass" />
    <input type="hidden" name="form_build_id" value="form-QmT4x9Zk_token" />
    <input type="hidden" name="form_id" value="user_login" />
  </form>
</body></html>"#;

/// Landing page for a visitor who needs no login
#[allow(dead_code)]
pub const WELCOME_PAGE: &str = "<html><body><h1>Exam Papers</h1></body></html>";

/// Behaviour of the mock portal. Built before the server starts.
#[derive(Default)]
pub struct Portal {
    /// Serve the login form and require the session cookie for listings
    pub login_required: bool,
    /// Status returned by a well-formed login POST (200 when 0)
    pub login_status: u16,
    /// Module code -> (status, html); unknown codes get an empty results page
    pub listings: HashMap<String, (u16, String)>,
    /// Filename under `/a/` -> (status, body)
    pub papers: HashMap<String, (u16, Vec<u8>)>,
    /// Delay applied to every paper response
    pub paper_delay: Option<Duration>,
    pub counters: Counters,
}

#[derive(Default)]
pub struct Counters {
    pub landing_gets: AtomicUsize,
    pub login_posts: AtomicUsize,
    pub listing_gets: AtomicUsize,
    pub paper_gets: AtomicUsize,
    pub papers_in_flight: AtomicUsize,
    pub max_papers_in_flight: AtomicUsize,
    pub last_login_form: Mutex<Option<HashMap<String, String>>>,
    pub listing_codes: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl Portal {
    pub fn with_login() -> Self {
        Self {
            login_required: true,
            ..Self::default()
        }
    }

    pub fn listing(mut self, code: &str, status: u16, html: impl Into<String>) -> Self {
        self.listings
            .insert(code.to_string(), (status, html.into()));
        self
    }

    pub fn paper(mut self, filename: &str, status: u16, body: &[u8]) -> Self {
        self.papers
            .insert(filename.to_string(), (status, body.to_vec()));
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Listing HTML with one anchor per href.
#[allow(dead_code)]
pub fn listing_html(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!("<li><a href=\"{href}\">{href}</a></li>\n"))
        .collect();
    format!(
        "<html><body><a href=\"/library\">Library</a><ul>\n{anchors}</ul></body></html>"
    )
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains(SESSION_COOKIE))
}

async fn portal_get(
    State(portal): State<Arc<Portal>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let counters = &portal.counters;
    let Some(code) = params.get("code_value_1") else {
        counters.landing_gets.fetch_add(1, Ordering::SeqCst);
        if portal.login_required && !has_session(&headers) {
            return Html(LOGIN_PAGE).into_response();
        }
        return Html(WELCOME_PAGE).into_response();
    };

    counters.listing_gets.fetch_add(1, Ordering::SeqCst);
    counters.listing_codes.lock().unwrap().push(code.clone());
    if portal.login_required && !has_session(&headers) {
        return (StatusCode::FORBIDDEN, "Access denied").into_response();
    }
    match portal.listings.get(code) {
        Some((listing_status, html)) => {
            (status(*listing_status), Html(html.clone())).into_response()
        }
        None => Html("<html><body><p>No results</p></body></html>").into_response(),
    }
}

async fn portal_post(
    State(portal): State<Arc<Portal>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let counters = &portal.counters;
    counters.login_posts.fetch_add(1, Ordering::SeqCst);
    let well_formed = form.get("form_id").map(String::as_str) == Some("user_login")
        && form.get("form_build_id").map(String::as_str) == Some(FORM_TOKEN)
        && form.contains_key("name")
        && form.contains_key("pass");
    *counters.last_login_form.lock().unwrap() = Some(form);

    if !well_formed {
        return (StatusCode::BAD_REQUEST, "Malformed login").into_response();
    }
    let login_status = if portal.login_status == 0 {
        200
    } else {
        portal.login_status
    };
    if login_status != 200 {
        return (status(login_status), "Login rejected").into_response();
    }
    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))],
        Html(WELCOME_PAGE),
    )
        .into_response()
}

async fn paper_get(State(portal): State<Arc<Portal>>, Path(file): Path<String>) -> Response {
    let counters = &portal.counters;
    counters.paper_gets.fetch_add(1, Ordering::SeqCst);
    let now = counters.papers_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    counters
        .max_papers_in_flight
        .fetch_max(now, Ordering::SeqCst);

    if let Some(delay) = portal.paper_delay {
        tokio::time::sleep(delay).await;
    }

    let response = match portal.papers.get(&file) {
        Some((code, body)) => (
            status(*code),
            [(header::CONTENT_TYPE, "application/pdf")],
            body.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    };
    counters.papers_in_flight.fetch_sub(1, Ordering::SeqCst);
    response
}

/// Serves `router` on an ephemeral localhost port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Starts the mock portal and returns its exam-papers URL plus the shared state.
#[allow(dead_code)]
pub async fn start_portal(portal: Portal) -> (String, Arc<Portal>) {
    let portal = Arc::new(portal);
    let app = Router::new()
        .route(PORTAL_PATH, get(portal_get).post(portal_post))
        .route("/a/:file", get(paper_get))
        .with_state(portal.clone());
    let addr = serve(app).await;
    (format!("http://{addr}{PORTAL_PATH}"), portal)
}
