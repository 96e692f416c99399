// Portal URLs
pub const PORTAL_URL: &str = "https://www.maynoothuniversity.ie/library/exam-papers";
pub const CATALOG_URL: &str =
    "https://www.maynoothuniversity.ie/international/study-maynooth/available-courses";

// Login form
pub const FORM_BUILD_ID_FIELD: &str = "form_build_id";
pub const LOGIN_FORM_ID: &str = "user_login";
pub const MODULE_QUERY_PARAM: &str = "code_value_1";

// Selectors and Patterns
pub const FORM_BUILD_ID_SELECTOR: &str = r#"input[name="form_build_id"]"#;
pub const ANCHOR_SELECTOR: &str = "a[href]";
pub const PDF_SUFFIX: &str = ".pdf";
pub const FILENAME_TOKEN_PATTERN: &str = r"[A-Za-z0-9]+";
pub const DEPARTMENT_LINK_MARKER: &str = "available-courses";

// Session identity presented to the portal
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
pub const BROWSER_ACCEPT_LANGUAGE: &str = "en-GB,en;q=0.9";

// Defaults
pub const DEFAULT_FIRST_YEAR: u16 = 2020;
pub const DEFAULT_LAST_YEAR: u16 = 2025;
pub const DEFAULT_OUTPUT_DIR: &str = "./papers";
pub const DEFAULT_CATALOG_FILE: &str = "modules.json";
pub const PAPERS_SUBDIR: &str = "papers";

// Environment
pub const PASSWORD_ENV_VAR: &str = "PAPER_SCRAPER_PASSWORD";
