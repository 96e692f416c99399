//! Site-wide module catalog.
//!
//! Walks the "available courses" index, visits every department page it links to,
//! and reads the module table on each. It shares nothing with the paper pipeline
//! and is meant to be run occasionally to refresh `modules.json`.

use crate::constants::{ANCHOR_SELECTOR, DEPARTMENT_LINK_MARKER};
use crate::errors::{AppError, AppResult};
use crate::utils::title_from_slug;
use futures::stream::{self, StreamExt};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};
use url::Url;

static ANCHOR_SELECTOR_CACHED: OnceLock<Selector> = OnceLock::new();
static ROW_SELECTOR: OnceLock<Selector> = OnceLock::new();
static CELL_SELECTOR: OnceLock<Selector> = OnceLock::new();

/// One row of a department's module table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    /// Module code
    pub index: String,
    pub semester: String,
    pub department: String,
}

/// Department page links found on the catalog index, resolved and deduplicated.
/// The index page itself is excluded.
pub fn parse_department_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selector = ANCHOR_SELECTOR_CACHED.get_or_init(|| {
        Selector::parse(ANCHOR_SELECTOR).expect("ANCHOR_SELECTOR is a valid CSS selector")
    });

    let mut seen = BTreeSet::new();
    document
        .select(selector)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| href.contains(DEPARTMENT_LINK_MARKER))
        .filter_map(|href| base_url.join(href).ok())
        .filter(|url| url.path().trim_end_matches('/') != base_url.path().trim_end_matches('/'))
        .filter(|url| seen.insert(url.to_string()))
        .collect()
}

/// Department name derived from the last path segment of its page URL.
pub fn department_name(url: &Url) -> String {
    let slug = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default();
    title_from_slug(slug)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads module rows from the first `<tbody>` of a department page.
///
/// Rows with fewer than three cells are ignored.
pub fn parse_module_table(html: &str, department: &str) -> Vec<ModuleEntry> {
    let document = Html::parse_document(html);
    let rows = ROW_SELECTOR.get_or_init(|| {
        Selector::parse("tbody tr").expect("row selector is a valid CSS selector")
    });
    let cells = CELL_SELECTOR
        .get_or_init(|| Selector::parse("td").expect("cell selector is a valid CSS selector"));

    document
        .select(rows)
        .filter_map(|row| {
            let columns: Vec<String> = row.select(cells).map(cell_text).collect();
            match columns.as_slice() {
                [name, index, semester, ..] => Some(ModuleEntry {
                    name: name.clone(),
                    index: index.clone(),
                    semester: semester.clone(),
                    department: department.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

async fn fetch_department(client: &reqwest::Client, url: &Url) -> AppResult<Vec<ModuleEntry>> {
    let html = client
        .get(url.as_str())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let department = department_name(url);
    let modules = parse_module_table(&html, &department);
    if modules.is_empty() {
        warn!(url = %url, "No module table found");
    }
    Ok(modules)
}

/// Crawls every department linked from `catalog_url`.
///
/// Department pages are fetched `concurrency` at a time. A department that fails is
/// logged and skipped. The result is sorted by module code.
///
/// # Errors
///
/// Returns an error only if the catalog index itself cannot be fetched or parsed.
pub async fn crawl_catalog(
    client: &reqwest::Client,
    catalog_url: &str,
    concurrency: usize,
) -> AppResult<Vec<ModuleEntry>> {
    if concurrency == 0 {
        return Err(AppError::InvalidInput(
            "Catalog concurrency must be greater than 0".into(),
        ));
    }

    let base_url = Url::parse(catalog_url)?;
    info!(url = %base_url, "Fetching department index");
    let index_html = client
        .get(base_url.as_str())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let departments = parse_department_links(&index_html, &base_url);
    info!(departments = departments.len(), "Department links found");

    let results: Vec<(Url, AppResult<Vec<ModuleEntry>>)> = stream::iter(departments)
        .map(|url| async move {
            let result = fetch_department(client, &url).await;
            (url, result)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut modules = Vec::new();
    for (url, result) in results {
        match result {
            Ok(entries) => modules.extend(entries),
            Err(e) => warn!(url = %url, error = %e, "Error fetching department"),
        }
    }

    modules.sort_by(|a, b| a.index.cmp(&b.index));
    info!(modules = modules.len(), "Module catalog crawled");
    Ok(modules)
}

/// Writes the catalog as pretty-printed JSON.
pub fn write_catalog(modules: &[ModuleEntry], path: &Path) -> AppResult<()> {
    let json = serde_json::to_string_pretty(modules)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), modules = modules.len(), "Module catalog written");
    Ok(())
}
