//! paper-scraper library
//!
//! This crate provides the core functionality for the `paper-scraper` binary.
//! Keep the crate root minimal; implementation and tests live in their modules.
//!
//! ## Overview
//!
//! The library is organized into modules that handle the stages of the exam-paper pipeline:
//!
//! - [`session`] - Builds the cookie-bearing HTTP client shared by every request
//! - [`auth`] - Detects the portal login form and submits credentials
//! - [`downloader`] - Fetches a module's listing, extracts and year-filters PDF links, downloads them
//! - [`pipeline`] - Orchestrates the stages for one module or a sequence of modules
//! - [`catalog`] - Crawls the course catalog into a list of modules
//! - [`cli`] - Command-line interface driving the scraper and the catalog crawler
//! - [`config`] - Pipeline defaults and TOML configuration
//! - [`models`] - Credentials, module codes, allowed years and paper links
//! - [`errors`] - Error types used throughout the application
//!
//! ## Example Usage
//!
//! ```no_run
//! use paper_scraper::config::ResolvedConfig;
//! use paper_scraper::errors::AppResult;
//! use paper_scraper::models::Credentials;
//! use paper_scraper::pipeline::Scraper;
//! use std::path::Path;
//!
//! # async fn example() -> AppResult<()> {
//! let credentials = Credentials::new("21345678", "password")?;
//! let mut scraper = Scraper::new(ResolvedConfig::default())?
//!     .with_progress(|done, total| println!("{done}/{total}"));
//!
//! let summary = scraper.start(&credentials, "cs161", Path::new("./papers")).await?;
//! println!("{} papers in {}", summary.filtered, summary.papers_dir.display());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod ui;
pub mod utils;
