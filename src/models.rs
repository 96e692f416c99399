use crate::constants::{DEFAULT_FIRST_YEAR, DEFAULT_LAST_YEAR};
use crate::errors::{AppError, AppResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Portal login. Supplied per run and never written anywhere.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> AppResult<Self> {
        let username = username.into();
        let password = password.into();
        if username.trim().is_empty() {
            return Err(AppError::InvalidInput("Username cannot be empty".into()));
        }
        if password.is_empty() {
            return Err(AppError::InvalidInput("Password cannot be empty".into()));
        }
        Ok(Self { username, password })
    }

    /// Username with everything after the first four characters hidden, for logs.
    pub fn masked_username(&self) -> String {
        let visible: String = self.username.chars().take(4).collect();
        format!("{visible}****")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.masked_username())
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Module code used as the listing query key, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleCode(String);

impl ModuleCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ModuleCode {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        let code = value.trim();
        if code.is_empty() {
            return Err(AppError::InvalidInput("Module code cannot be empty".into()));
        }
        if code.contains(['/', '\\']) || code == "." || code == ".." {
            return Err(AppError::InvalidInput(format!(
                "Module code must not contain path separators, got: {code}"
            )));
        }
        Ok(Self(code.to_uppercase()))
    }
}

impl fmt::Display for ModuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an allowed year is located inside a paper filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearMatch {
    /// Raw substring test. A filename such as `CS2021_intro.pdf` matches 2021
    /// even when that number belongs to the module code.
    #[default]
    Substring,
    /// The year must be a whole alphanumeric token of the filename, delimited by
    /// anything other than an ASCII letter or digit. `CS2021_2015.pdf` yields the
    /// tokens `CS2021` and `2015`, so it does not match 2021; neither does
    /// `exam2022.pdf` match 2022.
    Boundary,
}

impl YearMatch {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Boundary
        } else {
            Self::Substring
        }
    }
}

/// Validates that a year string is exactly four ASCII digits.
pub fn validate_year_format(year: &str) -> AppResult<()> {
    if year.is_empty() {
        return Err(AppError::InvalidInput(
            "Year must be YYYY format (4 digits), got empty string".to_string(),
        ));
    }
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidInput(format!(
            "Year must contain only digits, got: {year}"
        )));
    }
    if year.len() != 4 {
        return Err(AppError::InvalidInput(format!(
            "Year must be YYYY format (4 digits), got: {} ({} digits)",
            year,
            year.len()
        )));
    }
    Ok(())
}

/// Non-empty set of four-digit years whose papers are kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawYears")]
pub struct AllowedYears(BTreeSet<String>);

impl AllowedYears {
    pub fn new<I, S>(years: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for year in years {
            let year = year.as_ref().trim();
            validate_year_format(year)?;
            set.insert(year.to_string());
        }
        if set.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one allowed year is required".into(),
            ));
        }
        Ok(Self(set))
    }

    /// Inclusive range of years, e.g. `range(2020, 2025)`.
    pub fn range(first: u16, last: u16) -> AppResult<Self> {
        if first > last {
            return Err(AppError::InvalidInput(format!(
                "Year range start {first} is after end {last}"
            )));
        }
        Self::new((first..=last).map(|y| y.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, year: &str) -> bool {
        self.0.contains(year)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // The set is never empty, so the fallbacks are unreachable in practice.
    pub fn min(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn max(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }
}

impl Default for AllowedYears {
    fn default() -> Self {
        Self(
            (DEFAULT_FIRST_YEAR..=DEFAULT_LAST_YEAR)
                .map(|y| y.to_string())
                .collect(),
        )
    }
}

/// Accepts `2020-2025`, `2021,2023` or a single `2022`.
impl FromStr for AllowedYears {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        let value = value.trim();
        if let Some((first, last)) = value.split_once('-') {
            validate_year_format(first.trim())?;
            validate_year_format(last.trim())?;
            return Self::range(first.trim().parse()?, last.trim().parse()?);
        }
        Self::new(value.split(',').filter(|s| !s.trim().is_empty()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawYears {
    Text(String),
    List(Vec<u16>),
}

impl TryFrom<RawYears> for AllowedYears {
    type Error = AppError;

    fn try_from(raw: RawYears) -> AppResult<Self> {
        match raw {
            RawYears::Text(text) => text.parse(),
            RawYears::List(years) => Self::new(years.iter().map(|y| y.to_string())),
        }
    }
}

/// A PDF link found on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperLink {
    /// Absolute download URL
    pub url: String,
    /// Final path segment of the URL
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_code_is_uppercased_and_trimmed() {
        let code: ModuleCode = "  cs101 ".parse().unwrap();
        assert_eq!(code.as_str(), "CS101");
        assert_eq!(code.to_string(), "CS101");
    }

    #[test]
    fn module_code_rejects_empty_and_paths() {
        assert!("".parse::<ModuleCode>().is_err());
        assert!("   ".parse::<ModuleCode>().is_err());
        assert!("../etc".parse::<ModuleCode>().is_err());
        assert!("..".parse::<ModuleCode>().is_err());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("21345678", "hunter2").unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("2134****"));
        assert!(!debug.contains("21345678"));
    }

    #[test]
    fn credentials_reject_empty_fields() {
        assert!(Credentials::new("", "pw").is_err());
        assert!(Credentials::new("user", "").is_err());
    }

    #[test]
    fn default_years_cover_2020_through_2025() {
        let years = AllowedYears::default();
        assert_eq!(years.len(), 6);
        assert_eq!(years.min(), "2020");
        assert_eq!(years.max(), "2025");
        assert!(years.contains("2023"));
        assert!(!years.contains("2019"));
    }

    #[test]
    fn allowed_years_parse_range_and_list() {
        let range: AllowedYears = "2021-2023".parse().unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec!["2021", "2022", "2023"]);

        let list: AllowedYears = "2023, 2019".parse().unwrap();
        assert_eq!(list.min(), "2019");
        assert_eq!(list.max(), "2023");

        let single: AllowedYears = "2022".parse().unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn allowed_years_reject_bad_input() {
        assert!("".parse::<AllowedYears>().is_err());
        assert!("20x1".parse::<AllowedYears>().is_err());
        assert!("2025-2020".parse::<AllowedYears>().is_err());
        assert!("202-2023".parse::<AllowedYears>().is_err());
        assert!(AllowedYears::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn validate_year_format_messages() {
        match validate_year_format("20231").unwrap_err() {
            AppError::InvalidInput(msg) => assert!(msg.contains("4 digits")),
            _ => panic!("Expected InvalidInput error"),
        }
        match validate_year_format("abcd").unwrap_err() {
            AppError::InvalidInput(msg) => assert!(msg.contains("only digits")),
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn year_match_from_strict_flag() {
        assert_eq!(YearMatch::from_strict(false), YearMatch::Substring);
        assert_eq!(YearMatch::from_strict(true), YearMatch::Boundary);
        assert_eq!(YearMatch::default(), YearMatch::Substring);
    }
}
