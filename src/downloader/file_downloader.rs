use crate::errors::{AppError, AppResult};
use crate::models::PaperLink;
use crate::utils::{mb_from_bytes, round_two_decimals};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What happened to a single paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Written to disk
    Downloaded { bytes: u64 },
    /// Target already existed and was left untouched
    Skipped,
    /// Request or write failed; the reason is only logged
    Failed(String),
}

/// One completed download task, as seen by the progress consumer.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Tasks finished so far, including this one
    pub completed: usize,
    /// Number of papers handed to the downloader
    pub total: usize,
    pub filename: String,
    pub outcome: DownloadOutcome,
}

/// Per-call tally. Failures are reported here and in logs, never as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes: u64,
}

impl DownloadReport {
    fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { bytes } => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            DownloadOutcome::Skipped => self.skipped += 1,
            DownloadOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn completed(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }
}

/// Downloads a single paper to `file_path`.
///
/// The response status is checked first; only a 200 counts. An existing target is
/// never rewritten. The body is streamed into `tmp_path` and renamed into place so a
/// half-written file never sits at the final path.
pub async fn download_paper(
    client: &reqwest::Client,
    url: &str,
    tmp_path: &Path,
    file_path: &Path,
) -> DownloadOutcome {
    let filename = file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    debug!(filename = %filename, url, "Starting download");

    let mut response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(filename = %filename, error = %e, "Failed to download paper");
            return DownloadOutcome::Failed(format!("Failed to download {filename}: {e}"));
        }
    };

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        warn!(
            filename = %filename,
            status = status.as_u16(),
            url,
            "Failed to download paper"
        );
        return DownloadOutcome::Failed(format!(
            "HTTP {}: Failed to download {filename}",
            status.as_u16()
        ));
    }

    if fs::try_exists(file_path).await.unwrap_or(false) {
        info!(filename = %filename, "Paper already exists, skipping");
        return DownloadOutcome::Skipped;
    }

    match write_body(&mut response, tmp_path, file_path).await {
        Ok(bytes) => {
            info!(filename = %filename, bytes, "Downloaded paper");
            DownloadOutcome::Downloaded { bytes }
        }
        Err(e) => {
            // Best-effort cleanup of the partial file
            if let Err(cleanup) = fs::remove_file(tmp_path).await {
                debug!(file_path = %tmp_path.display(), error = %cleanup, "No temp file to remove");
            }
            warn!(filename = %filename, error = %e, "Failed to write paper");
            DownloadOutcome::Failed(e.to_string())
        }
    }
}

async fn write_body(
    response: &mut reqwest::Response,
    tmp_path: &Path,
    file_path: &Path,
) -> AppResult<u64> {
    let mut file = File::create(tmp_path).await.map_err(|e| {
        AppError::IoError(format!(
            "Failed to create temp file {}: {}",
            tmp_path.display(),
            e
        ))
    })?;

    let mut bytes = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await.map_err(|e| {
            AppError::IoError(format!(
                "Failed to write to temp file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        bytes += chunk.len() as u64;
    }
    file.flush().await?;

    // Ensure the file is closed before renaming
    drop(file);

    // A duplicate link may have landed first
    if fs::try_exists(file_path).await.unwrap_or(false) {
        fs::remove_file(tmp_path).await?;
        return Ok(bytes);
    }

    fs::rename(tmp_path, file_path).await.map_err(|e| {
        AppError::IoError(format!(
            "Failed to rename temp file {} to {}: {}",
            tmp_path.display(),
            file_path.display(),
            e
        ))
    })?;

    Ok(bytes)
}

/// Downloads every paper into `papers_dir`, at most `concurrency` at a time.
///
/// # Behavior
///
/// - **Directory**: `papers_dir` is created (idempotently) before any task starts.
/// - **Skip existing**: a paper whose file already exists is fetched but not written.
/// - **Progress**: `on_progress` runs exactly once per paper, in completion order,
///   whatever the outcome. Events arrive over a channel and this function is their
///   only consumer, so the callback needs no synchronization.
/// - **Failures**: a failed paper is logged and counted in the report; it never
///   turns into an error.
///
/// # Errors
///
/// Returns an error only if `papers_dir` cannot be created or `concurrency` is zero.
pub async fn download_papers<F>(
    client: &reqwest::Client,
    papers: &[PaperLink],
    papers_dir: &Path,
    concurrency: usize,
    mut on_progress: F,
) -> AppResult<DownloadReport>
where
    F: FnMut(&Progress),
{
    if concurrency == 0 {
        return Err(AppError::InvalidInput(
            "Concurrent downloads must be greater than 0".into(),
        ));
    }

    fs::create_dir_all(papers_dir)
        .await
        .map_err(|e| AppError::IoError(format!("Failed to create directory: {e}")))?;

    let total = papers.len();
    let mut report = DownloadReport::default();
    if total == 0 {
        return Ok(report);
    }

    info!(
        total,
        concurrency,
        dir = %papers_dir.display(),
        "Starting parallel download"
    );

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let papers_dir: Arc<PathBuf> = Arc::new(papers_dir.to_path_buf());
    let (tx, mut rx) = mpsc::unbounded_channel::<(String, DownloadOutcome)>();

    let mut handles: Vec<(String, JoinHandle<()>)> = Vec::with_capacity(total);

    for (index, paper) in papers.iter().enumerate() {
        let semaphore = semaphore.clone();
        let client = client.clone();
        let papers_dir = papers_dir.clone();
        let tx = tx.clone();
        let url = paper.url.clone();
        let filename = paper.filename.clone();

        let handle = tokio::spawn(async move {
            let file_path = papers_dir.join(&filename);
            // Index keeps temp names distinct when the page lists a paper twice
            let tmp_path = papers_dir.join(format!(".{filename}.{index}.part"));

            let outcome = match semaphore.acquire().await {
                Ok(_permit) => download_paper(&client, &url, &tmp_path, &file_path).await,
                Err(e) => DownloadOutcome::Failed(format!(
                    "Failed to acquire semaphore permit: {e}"
                )),
            };

            // Receiver outlives every task; a send error means the caller is gone
            let _ = tx.send((filename, outcome));
        });

        handles.push((paper.filename.clone(), handle));
    }
    drop(tx);

    let mut completed = 0usize;
    let mut emit = |filename: String, outcome: DownloadOutcome, report: &mut DownloadReport| {
        completed += 1;
        report.record(&outcome);
        debug!(completed, total, "Download progress");
        on_progress(&Progress {
            completed,
            total,
            filename,
            outcome,
        });
    };

    while let Some((filename, outcome)) = rx.recv().await {
        emit(filename, outcome, &mut report);
    }

    // A task that panicked never sent its event; count it as failed
    for (filename, handle) in handles {
        if let Err(e) = handle.await {
            warn!(filename = %filename, error = %e, "Download task aborted");
            emit(
                filename,
                DownloadOutcome::Failed(format!("Task join error: {e}")),
                &mut report,
            );
        }
    }

    if report.failed == 0 {
        info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            mb = round_two_decimals(mb_from_bytes(report.bytes)),
            "Download completed"
        );
    } else {
        info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            mb = round_two_decimals(mb_from_bytes(report.bytes)),
            "Download completed with errors"
        );
    }

    Ok(report)
}
