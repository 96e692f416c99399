use crate::catalog::{crawl_catalog, write_catalog};
use crate::config::{ResolvedConfig, ResolvedConfigFile};
use crate::constants::{DEFAULT_CATALOG_FILE, DEFAULT_OUTPUT_DIR, PASSWORD_ENV_VAR};
use crate::errors::{AppError, AppResult};
use crate::models::{AllowedYears, Credentials, ModuleCode};
use crate::pipeline::Scraper;
use crate::session::build_client;
use crate::ui;
use crate::utils::{format_duration, mb_from_bytes, round_two_decimals};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

// CLI metadata constants
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
const APP_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");

/// Builds the command-line definition.
pub fn build_command() -> Command<'static> {
    Command::new("paper-scraper")
        .version(APP_VERSION)
        .author(APP_AUTHOR)
        .about(APP_ABOUT)
        .subcommand(
            Command::new("cli")
                .about("Log in and download exam papers for one or more modules")
                .after_help("The password may also be supplied through PAPER_SCRAPER_PASSWORD.\nExample:\n  paper-scraper cli -u 21345678 -m CS161 -m MA101 -y 2021-2024")
                .arg(
                    Arg::new("username")
                        .short('u')
                        .long("username")
                        .help("Portal username (student ID)")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("Portal password")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("module")
                        .short('m')
                        .long("module")
                        .help("Module code to download; repeat for several modules")
                        .required(true)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Output folder; papers go to <output>/<MODULE>/papers")
                        .default_value(DEFAULT_OUTPUT_DIR)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("years")
                        .short('y')
                        .long("years")
                        .help("Allowed years: a range (2020-2025) or a list (2021,2023)")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("concurrency")
                        .short('c')
                        .long("concurrency")
                        .help("Papers downloaded at the same time")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("strict_years")
                        .long("strict-years")
                        .help("Only match years that stand alone in the filename")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("keep_going")
                        .short('k')
                        .long("keep-going")
                        .help("Continue with the next module after a failure")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("toml")
                .about("Run using a TOML configuration file")
                .arg(
                    Arg::new("config")
                        .help("Path to the TOML config file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("Portal password (never read from the config file)")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("modules")
                .about("Crawl the course catalog and write every module to JSON")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("JSON file to write")
                        .default_value(DEFAULT_CATALOG_FILE)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
}

/// Parses command-line arguments and executes the selected subcommand.
///
/// - `cli`: scrape the given modules with defaults overridden by flags
/// - `toml`: scrape the modules listed in a configuration file
/// - `modules`: crawl the module catalog
///
/// # Errors
///
/// Returns the first module failure, or any configuration, network or I/O error.
pub async fn cli() -> AppResult<()> {
    let cmd = build_command();
    let mut cmd_for_help = cmd.clone();
    let matches = cmd.get_matches();

    match matches.subcommand() {
        Some(("cli", sub)) => {
            let (credentials, modules, keep_going, config) = resolve_cli_args(sub)?;
            run_workflow(&credentials, &modules, keep_going, config).await?;
        }
        Some(("toml", sub)) => {
            let config_path = sub
                .get_one::<PathBuf>("config")
                .ok_or_else(|| AppError::InvalidInput("Config path is required".into()))?;

            let file_config = ResolvedConfigFile::from_toml_file(config_path)?;
            let password = resolve_password(sub.get_one::<String>("password").cloned())?;
            let credentials = Credentials::new(file_config.username.as_str(), password)?;
            let modules = file_config.module_codes()?;

            run_workflow(
                &credentials,
                &modules,
                file_config.keep_going,
                file_config.resolved,
            )
            .await?;
        }
        Some(("modules", sub)) => {
            let output = sub
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_FILE));
            run_catalog(&ResolvedConfig::default(), &output).await?;
        }
        _ => {
            cmd_for_help
                .print_help()
                .map_err(|e| AppError::IoError(format!("Failed to print help: {e}")))?;
        }
    }

    Ok(())
}

/// Password from the flag, else from `PAPER_SCRAPER_PASSWORD`.
fn resolve_password(flag: Option<String>) -> AppResult<String> {
    flag.or_else(|| std::env::var(PASSWORD_ENV_VAR).ok())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Password cannot be empty; pass --password or set {PASSWORD_ENV_VAR}"
            ))
        })
}

type CliRun = (Credentials, Vec<ModuleCode>, bool, ResolvedConfig);

fn resolve_cli_args(sub: &ArgMatches) -> AppResult<CliRun> {
    let username = sub
        .get_one::<String>("username")
        .ok_or_else(|| AppError::InvalidInput("Username cannot be empty".into()))?;
    let password = resolve_password(sub.get_one::<String>("password").cloned())?;
    let credentials = Credentials::new(username.as_str(), password)?;

    let modules = sub
        .get_many::<String>("module")
        .map(|values| values.map(|m| m.parse()).collect::<AppResult<Vec<ModuleCode>>>())
        .transpose()?
        .unwrap_or_default();
    if modules.is_empty() {
        return Err(AppError::InvalidInput(
            "Please select at least one module to download".into(),
        ));
    }

    let mut config = ResolvedConfig::default();
    if let Some(output) = sub.get_one::<PathBuf>("output") {
        config.output_dir = output.clone();
    }
    if let Some(years) = sub.get_one::<String>("years") {
        config.allowed_years = years.parse::<AllowedYears>()?;
    }
    if let Some(&concurrency) = sub.get_one::<usize>("concurrency") {
        config.concurrent_downloads = concurrency;
    }
    if sub.get_flag("strict_years") {
        config.strict_year_match = true;
    }
    config.validate()?;

    Ok((credentials, modules, sub.get_flag("keep_going"), config))
}

async fn run_workflow(
    credentials: &Credentials,
    modules: &[ModuleCode],
    keep_going: bool,
    config: ResolvedConfig,
) -> AppResult<()> {
    let started = Instant::now();
    let output_dir = config.output_dir.clone();
    print_run_info(modules, &config);

    let pb = ui::create_progress_bar()?;
    pb.set_message("Downloading papers");
    let mut scraper = Scraper::new(config)?.with_progress(ui::progress_updater(pb.clone()));

    let outcomes = scraper
        .run_modules(credentials, modules, &output_dir, keep_going)
        .await;
    if outcomes.len() < modules.len() {
        info!(
            remaining = modules.len() - outcomes.len(),
            "Stopped after module failure"
        );
    }
    pb.finish_and_clear();

    let mut first_error = None;
    let (mut downloaded, mut skipped, mut failed, mut bytes) = (0, 0, 0, 0u64);
    for outcome in outcomes {
        match outcome.result {
            Ok(summary) => {
                downloaded += summary.report.downloaded;
                skipped += summary.report.skipped;
                failed += summary.report.failed;
                bytes += summary.report.bytes;
                info!(
                    module = %summary.module,
                    dir = %summary.papers_dir.display(),
                    found = summary.found,
                    kept = summary.filtered,
                    "Module done"
                );
            }
            Err(e) => {
                error!(module = %outcome.module, error = %e, "Module failed");
                first_error.get_or_insert(e);
            }
        }
    }

    info!(
        downloaded,
        skipped,
        failed,
        mb = round_two_decimals(mb_from_bytes(bytes)),
        elapsed = %format_duration(started.elapsed()),
        "All modules processed"
    );

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn run_catalog(config: &ResolvedConfig, output: &std::path::Path) -> AppResult<()> {
    let started = Instant::now();
    let client = build_client(config)?;
    let modules = crawl_catalog(&client, &config.catalog_url, config.catalog_concurrency).await?;
    write_catalog(&modules, output)?;
    info!(
        modules = modules.len(),
        elapsed = %format_duration(started.elapsed()),
        "Catalog refresh completed"
    );
    Ok(())
}

fn print_run_info(modules: &[ModuleCode], config: &ResolvedConfig) {
    let module_list = modules
        .iter()
        .map(ModuleCode::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    info!(
        modules = %module_list,
        output = %config.output_dir.display(),
        first_year = config.allowed_years.min(),
        last_year = config.allowed_years.max(),
        concurrency = config.concurrent_downloads,
        "Starting download"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_matches(args: &[&str]) -> ArgMatches {
        let matches = build_command()
            .try_get_matches_from(args.iter().copied())
            .unwrap();
        matches.subcommand_matches("cli").unwrap().clone()
    }

    #[test]
    fn cli_command_parses_modules_and_flags() {
        let sub = cli_matches(&[
            "paper-scraper",
            "cli",
            "-u",
            "21345678",
            "-p",
            "pw",
            "-m",
            "cs161",
            "-m",
            "MA101",
            "-y",
            "2021-2022",
            "-c",
            "3",
            "--strict-years",
            "--keep-going",
        ]);

        let (credentials, modules, keep_going, config) = resolve_cli_args(&sub).unwrap();
        assert_eq!(credentials.username, "21345678");
        assert_eq!(
            modules.iter().map(ModuleCode::as_str).collect::<Vec<_>>(),
            vec!["CS161", "MA101"]
        );
        assert!(keep_going);
        assert_eq!(config.concurrent_downloads, 3);
        assert!(config.strict_year_match);
        assert_eq!(config.allowed_years.min(), "2021");
        assert_eq!(config.allowed_years.max(), "2022");
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn cli_command_requires_module() {
        let result =
            build_command().try_get_matches_from(vec!["paper-scraper", "cli", "-u", "21345678"]);
        assert!(result.is_err());
    }

    #[test]
    fn toml_command_requires_path() {
        let err = build_command().try_get_matches_from(vec!["paper-scraper", "toml"]);
        assert!(err.is_err());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let sub = cli_matches(&[
            "paper-scraper", "cli", "-u", "21345678", "-p", "pw", "-m", "CS161", "-c", "0",
        ]);
        assert!(resolve_cli_args(&sub).is_err());
    }

    #[test]
    fn explicit_password_wins() {
        assert_eq!(resolve_password(Some("pw".to_string())).unwrap(), "pw");
    }

    #[test]
    fn test_print_run_info_runs() {
        let modules: Vec<ModuleCode> = vec!["CS161".parse().unwrap()];
        print_run_info(&modules, &ResolvedConfig::default());
    }
}
