use crate::constants::{BROWSER_USER_AGENT, CATALOG_URL, DEFAULT_OUTPUT_DIR, PORTAL_URL};
use crate::errors::{AppError, AppResult};
use crate::models::{AllowedYears, ModuleCode, YearMatch};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved configuration with all values filled in (no Options).
///
/// This struct represents the pipeline defaults and can be deserialized by the TOML
/// loader. All fields have concrete values, making it safe to access directly without unwrapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolvedConfig {
    /// Exam papers page; also the login endpoint
    pub portal_url: String,
    /// Root directory; papers land in `{output_dir}/{MODULE}/papers`
    pub output_dir: PathBuf,
    /// Years kept by the filename filter
    pub allowed_years: AllowedYears,
    /// Require years to stand alone in the filename instead of a raw substring match
    pub strict_year_match: bool,

    // Downloads
    /// Number of concurrent download tasks
    pub concurrent_downloads: usize,
    /// Per-request timeout in seconds; 0 leaves the client default (no timeout)
    pub request_timeout_secs: u64,
    /// User agent presented to the portal
    pub user_agent: String,

    // Module catalog
    /// Page listing every department
    pub catalog_url: String,
    /// Number of department pages fetched at once
    pub catalog_concurrency: usize,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            portal_url: PORTAL_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            allowed_years: AllowedYears::default(),
            strict_year_match: false,
            concurrent_downloads: 8,
            request_timeout_secs: 0,
            user_agent: BROWSER_USER_AGENT.to_string(),
            catalog_url: CATALOG_URL.to_string(),
            catalog_concurrency: 4,
        }
    }
}

impl ResolvedConfig {
    pub fn year_match(&self) -> YearMatch {
        YearMatch::from_strict(self.strict_year_match)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.concurrent_downloads == 0 {
            return Err(AppError::InvalidInput(
                "Concurrent downloads must be greater than 0".into(),
            ));
        }
        if self.catalog_concurrency == 0 {
            return Err(AppError::InvalidInput(
                "Catalog concurrency must be greater than 0".into(),
            ));
        }
        url::Url::parse(&self.portal_url)?;
        url::Url::parse(&self.catalog_url)?;
        Ok(())
    }
}

/// Configuration that can be loaded from a TOML file.
///
/// Holds the run inputs (username and modules) plus optional pipeline configuration.
/// The password is deliberately absent: it comes from the command line or environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedConfigFile {
    /// Portal username (student ID)
    pub username: String,
    /// Module codes to scrape, in order
    pub modules: Vec<String>,
    /// Continue with the next module after a failure (defaults to `false`)
    #[serde(default)]
    pub keep_going: bool,
    /// Flattened resolved configuration with pipeline defaults
    #[serde(flatten)]
    pub resolved: ResolvedConfig,
}

impl ResolvedConfigFile {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the TOML is malformed, required fields are missing,
    /// unknown keys are present, the module list is empty or a module code is invalid,
    /// or a concurrency value is zero.
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: ResolvedConfigFile = toml::from_str(&contents)
            .map_err(|e| AppError::InvalidInput(format!("Failed to parse config: {e}")))?;

        if config.modules.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one module code is required".into(),
            ));
        }
        config.module_codes()?;
        config.resolved.validate()?;

        Ok(config)
    }

    pub fn module_codes(&self) -> AppResult<Vec<ModuleCode>> {
        self.modules.iter().map(|m| m.parse()).collect()
    }
}
