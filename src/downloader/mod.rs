//! Listing, filtering and download operations for exam papers.
//!
//! This module turns a module's listing page into files on disk. The main entry points
//! are [`fetch_listing`], [`parse_pdf_links`], [`filter_by_years`] and [`download_papers`].

mod file_downloader;
mod link_fetcher;
mod year_filter;

// Re-export public API
pub use file_downloader::{
    download_paper, download_papers, DownloadOutcome, DownloadReport, Progress,
};
pub use link_fetcher::{fetch_listing, filename_from_href, parse_pdf_links, ListingPage};
pub use year_filter::{filter_by_years, matching_year};
