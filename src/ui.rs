use crate::errors::{AppError, AppResult};
use indicatif::{ProgressBar, ProgressStyle};

/// Creates a progress bar with the standard application styling.
///
/// The length is left at zero; the scraper's progress callback sets it once the
/// number of papers for a module is known.
///
/// # Example
///
/// ```no_run
/// use paper_scraper::ui;
///
/// # fn main() -> Result<(), paper_scraper::errors::AppError> {
/// let pb = ui::create_progress_bar()?;
/// pb.set_length(3);
/// pb.inc(1);
/// pb.finish_with_message("Done");
/// # Ok(())
/// # }
/// ```
pub fn create_progress_bar() -> AppResult<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
            )
            .map_err(|e| AppError::IoError(format!("Failed to create progress bar template: {e}")))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Progress callback that drives `pb` from `(completed, total)` events.
///
/// Each module restarts its count at 1, which moves the bar back to the start.
pub fn progress_updater(pb: ProgressBar) -> impl Fn(usize, usize) + Send + Sync + 'static {
    move |completed, total| {
        pb.set_length(total as u64);
        pb.set_position(completed as u64);
    }
}
