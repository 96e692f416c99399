use crate::constants::FILENAME_TOKEN_PATTERN;
use crate::errors::{AppError, AppResult};
use crate::models::{AllowedYears, PaperLink, YearMatch};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Cached regex splitting a filename into alphanumeric tokens.
static FILENAME_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

/// Returns the first allowed year (in ascending order) found in `filename`.
///
/// With [`YearMatch::Substring`] any occurrence counts, including digits that belong
/// to something else: `MA2021_exam.pdf` matches 2021 for module MA2021. With
/// [`YearMatch::Boundary`] the year must be a whole token, delimited by anything
/// other than an ASCII letter or digit.
pub fn matching_year<'a>(
    filename: &str,
    years: &'a AllowedYears,
    mode: YearMatch,
) -> Option<&'a str> {
    match mode {
        YearMatch::Substring => years.iter().find(|year| filename.contains(year)),
        YearMatch::Boundary => {
            let token_regex = FILENAME_TOKEN_REGEX.get_or_init(|| {
                Regex::new(FILENAME_TOKEN_PATTERN)
                    .expect("FILENAME_TOKEN_PATTERN is a valid regex pattern")
            });
            let tokens: Vec<&str> = token_regex
                .find_iter(filename)
                .map(|m| m.as_str())
                .collect();
            years.iter().find(|year| tokens.contains(year))
        }
    }
}

/// Keeps the papers whose filename carries an allowed year.
///
/// Order of the input is preserved.
///
/// # Errors
///
/// Returns `NoPapersInYearRange` naming the smallest and largest allowed year when
/// nothing survives.
pub fn filter_by_years(
    papers: Vec<PaperLink>,
    years: &AllowedYears,
    mode: YearMatch,
) -> AppResult<Vec<PaperLink>> {
    let filtered: Vec<PaperLink> = papers
        .into_iter()
        .filter(|paper| match matching_year(&paper.filename, years, mode) {
            Some(year) => {
                debug!(year, filename = %paper.filename, "Including paper");
                true
            }
            None => {
                debug!(filename = %paper.filename, "Excluding paper (year not in allowed range)");
                false
            }
        })
        .collect();

    if filtered.is_empty() {
        return Err(AppError::NoPapersInYearRange {
            min: years.min().to_string(),
            max: years.max().to_string(),
        });
    }

    Ok(filtered)
}
