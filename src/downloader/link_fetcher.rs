use crate::constants::{ANCHOR_SELECTOR, MODULE_QUERY_PARAM, PDF_SUFFIX};
use crate::errors::{AppError, AppResult};
use crate::models::{ModuleCode, PaperLink};
use scraper::{Html, Selector};
use std::sync::OnceLock;
use tracing::{debug, error, info};
use url::Url;

/// Cached CSS selector for anchors carrying an href.
/// Compiled once at initialization for performance.
static ANCHOR_SELECTOR_CACHED: OnceLock<Selector> = OnceLock::new();

/// Listing page HTML together with the URL it was served from.
#[derive(Debug)]
pub struct ListingPage {
    pub html: String,
    /// Final URL after redirects, used to resolve relative hrefs
    pub url: Url,
}

/// Fetches the exam-paper listing for one module.
///
/// Issues `GET {portal_url}?code_value_1={MODULE}` on the authenticated session.
///
/// # Errors
///
/// Returns `FetchError` if the portal answers with anything other than 200, and
/// `NetworkError` if the request cannot be sent or the body cannot be read.
pub async fn fetch_listing(
    client: &reqwest::Client,
    portal_url: &str,
    module: &ModuleCode,
) -> AppResult<ListingPage> {
    info!(module = %module, "Fetching exam papers");

    let response = client
        .get(portal_url)
        .query(&[(MODULE_QUERY_PARAM, module.as_str())])
        .send()
        .await?;

    let status = response.status();
    debug!(status = status.as_u16(), url = %response.url(), "Listing response received");

    if status != reqwest::StatusCode::OK {
        error!(module = %module, status = status.as_u16(), "Failed to fetch exam papers");
        return Err(AppError::FetchError);
    }

    let url = response.url().clone();
    let html = response.text().await?;
    Ok(ListingPage { html, url })
}

/// Parses listing HTML and returns every anchor whose href ends in `.pdf`.
///
/// The suffix test is case-sensitive and applied to the raw href, so
/// `paper.PDF` and `paper.pdf?download=1` are not papers. Relative hrefs are
/// resolved against `base_url` for the download URL; hrefs that cannot be
/// resolved are skipped. The filename is the last segment of the href as written,
/// not of the resolved URL, so `Exam 2021.pdf` stays `Exam 2021.pdf`.
/// Duplicate links are kept as they appear on the page.
pub fn parse_pdf_links(html: &str, base_url: &Url) -> Vec<PaperLink> {
    let document = Html::parse_document(html);

    let selector = ANCHOR_SELECTOR_CACHED.get_or_init(|| {
        Selector::parse(ANCHOR_SELECTOR).expect("ANCHOR_SELECTOR is a valid CSS selector")
    });

    let mut anchors = 0usize;
    let mut papers = Vec::new();

    for href in document
        .select(selector)
        .filter_map(|el| el.value().attr("href"))
    {
        anchors += 1;
        if !href.ends_with(PDF_SUFFIX) {
            continue;
        }
        let Some(filename) = filename_from_href(href) else {
            continue;
        };
        let Ok(url) = base_url.join(href) else {
            debug!(href, "Skipping unresolvable PDF link");
            continue;
        };
        debug!(href, "Found PDF link");
        papers.push(PaperLink {
            url: url.to_string(),
            filename: filename.to_string(),
        });
    }

    debug!(anchors, pdfs = papers.len(), "Scanned listing for PDF links");
    papers
}

/// Text after the last `/` (or `\`) of a raw href, or `None` when it is empty.
pub fn filename_from_href(href: &str) -> Option<&str> {
    href.rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
}
