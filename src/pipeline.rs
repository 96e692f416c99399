//! The scrape pipeline for a single module, and sequences of modules.
//!
//! [`Scraper::start`] runs the stages in a fixed order: session check, optional
//! login, listing fetch, link extraction, year filtering, download. The first
//! failing stage ends the call with its error and nothing is rolled back.
//! Individual download failures are not stage failures: they are logged, counted
//! in the [`DownloadReport`], and the call still succeeds.

use crate::auth::{detect_login_state, submit_login, LoginState};
use crate::config::ResolvedConfig;
use crate::constants::PAPERS_SUBDIR;
use crate::downloader::{
    download_papers, fetch_listing, filter_by_years, parse_pdf_links, DownloadReport,
};
use crate::errors::{AppError, AppResult};
use crate::models::{AllowedYears, Credentials, ModuleCode};
use crate::session::build_client;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Receives `(completed, total)` once per finished download task.
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Result of a successful [`Scraper::start`].
#[derive(Debug, Clone)]
pub struct ScrapeSummary {
    pub module: ModuleCode,
    pub papers_dir: PathBuf,
    /// PDF links on the listing page
    pub found: usize,
    /// Links that passed the year filter and were handed to the downloader
    pub filtered: usize,
    pub report: DownloadReport,
}

/// Outcome of one module inside [`Scraper::run_modules`].
#[derive(Debug)]
pub struct ModuleOutcome {
    pub module: ModuleCode,
    pub result: AppResult<ScrapeSummary>,
}

/// Owns one portal session and runs the pipeline against it.
pub struct Scraper {
    client: reqwest::Client,
    config: ResolvedConfig,
    /// `None` until the landing page has been inspected
    login_state: Option<LoginState>,
    progress: Option<ProgressCallback>,
}

impl Scraper {
    /// Creates the session. No request is sent until [`Scraper::start`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` or `UrlError` for an unusable configuration, and
    /// `NetworkError` if the HTTP client cannot be built.
    pub fn new(config: ResolvedConfig) -> AppResult<Self> {
        config.validate()?;
        let client = build_client(&config)?;
        debug!(portal = %config.portal_url, "Scraper initialized");
        Ok(Self {
            client,
            config,
            login_state: None,
            progress: None,
        })
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn with_allowed_years(mut self, years: AllowedYears) -> Self {
        self.config.allowed_years = years;
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.login_state == Some(LoginState::AlreadyAuthenticated)
    }

    /// Checks the landing page once per session and logs in if it shows the form.
    async fn ensure_authenticated(&mut self, credentials: &Credentials) -> AppResult<()> {
        if self.is_authenticated() {
            debug!("Session already authenticated, skipping login check");
            return Ok(());
        }

        info!("Fetching login page");
        let response = self.client.get(&self.config.portal_url).send().await?;
        debug!(status = response.status().as_u16(), "Login page response received");
        let html = response.text().await?;

        match detect_login_state(&html)? {
            LoginState::NeedsLogin { form_build_id } => {
                info!("Login form detected, proceeding with authentication");
                submit_login(
                    &self.client,
                    &self.config.portal_url,
                    credentials,
                    &form_build_id,
                )
                .await?;
            }
            LoginState::AlreadyAuthenticated => {
                info!("No login form found - already authenticated or login not required");
            }
        }

        self.login_state = Some(LoginState::AlreadyAuthenticated);
        Ok(())
    }

    /// Scrapes one module into `{output_folder}/{MODULE}/papers`.
    ///
    /// `module_code` is trimmed and uppercased before use. The output directory is
    /// only created once there is at least one paper to download.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty module code
    /// - `AuthenticationError` if the login POST is rejected
    /// - `FetchError` if the listing page is not served
    /// - `NoPapersFound` if the listing has no PDF links
    /// - `NoPapersInYearRange` if no PDF link carries an allowed year
    /// - `IoError` if the output directory cannot be created
    pub async fn start(
        &mut self,
        credentials: &Credentials,
        module_code: &str,
        output_folder: &Path,
    ) -> AppResult<ScrapeSummary> {
        let module: ModuleCode = module_code.parse()?;
        info!(
            module = %module,
            user = %credentials.masked_username(),
            output = %output_folder.display(),
            "Starting scraper"
        );

        self.ensure_authenticated(credentials).await?;

        let listing = fetch_listing(&self.client, &self.config.portal_url, &module).await?;
        info!(module = %module, "Exam papers page fetched");

        let papers = parse_pdf_links(&listing.html, &listing.url);
        if papers.is_empty() {
            warn!(module = %module, "No papers found");
            return Err(AppError::NoPapersFound);
        }
        let found = papers.len();
        info!(module = %module, found, "Found PDF papers");

        let papers = filter_by_years(papers, &self.config.allowed_years, self.config.year_match())
            .map_err(|e| {
                warn!(
                    module = %module,
                    min = self.config.allowed_years.min(),
                    max = self.config.allowed_years.max(),
                    "No papers in allowed years"
                );
                e
            })?;

        let papers_dir = output_folder.join(module.as_str()).join(PAPERS_SUBDIR);
        let progress = self.progress.as_ref();
        let report = download_papers(
            &self.client,
            &papers,
            &papers_dir,
            self.config.concurrent_downloads,
            |event| {
                if let Some(callback) = progress {
                    callback(event.completed, event.total);
                }
            },
        )
        .await?;

        info!(
            module = %module,
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "Scraping completed"
        );

        Ok(ScrapeSummary {
            module,
            papers_dir,
            found,
            filtered: papers.len(),
            report,
        })
    }

    /// Runs [`Scraper::start`] for each module in order on the same session.
    ///
    /// Stops after the first failing module unless `keep_going` is set. The returned
    /// list holds one entry per module that was attempted.
    pub async fn run_modules(
        &mut self,
        credentials: &Credentials,
        modules: &[ModuleCode],
        output_folder: &Path,
        keep_going: bool,
    ) -> Vec<ModuleOutcome> {
        let mut outcomes = Vec::with_capacity(modules.len());

        for (position, module) in modules.iter().enumerate() {
            info!(
                module = %module,
                position = position + 1,
                total = modules.len(),
                "Scraping module"
            );
            let result = self
                .start(credentials, module.as_str(), output_folder)
                .await;
            let failed = result.is_err();
            if let Err(e) = &result {
                error!(module = %module, error = %e, "Module failed");
            }
            outcomes.push(ModuleOutcome {
                module: module.clone(),
                result,
            });
            if failed && !keep_going {
                break;
            }
        }

        outcomes
    }
}
