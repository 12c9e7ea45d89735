//! Static configuration with zero-allocation design.
//! All strings are &'static str to avoid lifetime complexity.

use std::fmt;

/// News category accepted by the top-headlines endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Business,
    Entertainment,
    General,
    Health,
    Science,
    Sports,
    Technology,
}

impl Category {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Business => "business",
            Category::Entertainment => "entertainment",
            Category::General => "general",
            Category::Health => "health",
            Category::Science => "science",
            Category::Sports => "sports",
            Category::Technology => "technology",
        }
    }

    /// Case-insensitive lookup
    pub fn parse(name: &str) -> Option<Self> {
        CATEGORIES
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub static CATEGORIES: &[Category] = &[
    Category::Business,
    Category::Entertainment,
    Category::General,
    Category::Health,
    Category::Science,
    Category::Sports,
    Category::Technology,
];

/// News API endpoints and request defaults
pub mod api {
    pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";
    pub const TOP_HEADLINES_PATH: &str = "/v2/top-headlines";
    pub const EVERYTHING_PATH: &str = "/v2/everything";

    /// Country the API itself treats as its default market
    pub const DEFAULT_COUNTRY: &str = "us";
    pub const PREFERRED_COUNTRY: &str = "in";
    pub const FALLBACK_QUERY: &str = "technology OR business OR world OR science";
    pub const SORT_BY: &str = "publishedAt";

    /// Placeholder title the API uses for withdrawn articles
    pub const REMOVED_MARKER: &str = "[Removed]";

    /// Error codes that point at the API key rather than the request
    pub const KEY_ERROR_CODES: &[&str] = &[
        "apiKeyMissing",
        "apiKeyInvalid",
        "apiKeyDisabled",
        "apiKeyExhausted",
        "unauthorized",
    ];
}

/// SMTP relays and the disposable inbox service
pub mod mail {
    pub const GMAIL_HOST: &str = "smtp.gmail.com";
    pub const ETHEREAL_HOST: &str = "smtp.ethereal.email";
    pub const SUBMISSION_PORT: u16 = 587;

    pub const ETHEREAL_ACCOUNT_API: &str = "https://api.nodemailer.com/user";
    pub const ETHEREAL_WEB: &str = "https://ethereal.email";
    pub const ETHEREAL_REQUESTOR: &str = "news-digest";

    pub const SENDER_NAME: &str = "Daily News Bot";
    pub const TEST_SENDER_SUFFIX: &str = " (test)";
    pub const SUBJECT: &str = "📰 Your Daily News Update";
    pub const SUBJECT_DATE_FORMAT: &str = "%d %b %Y";
}

/// Environment variable names
pub mod env {
    pub const NEWS_API_KEY: &str = "NEWS_API_KEY";
    pub const EMAIL_USER: &str = "EMAIL_USER";
    pub const EMAIL_PASS: &str = "EMAIL_PASS";
    pub const RECEIVER_EMAIL: &str = "RECEIVER_EMAIL";
    pub const DRY_RUN: &str = "DRY_RUN";
    pub const USE_ETHEREAL: &str = "USE_ETHEREAL";
    pub const NEWS_COUNTRY: &str = "NEWS_COUNTRY";
    pub const NEWS_CATEGORY: &str = "NEWS_CATEGORY";
    pub const NEWS_FALLBACK_QUERY: &str = "NEWS_FALLBACK_QUERY";
    pub const NEWS_API_BASE_URL: &str = "NEWS_API_BASE_URL";
    pub const DIGEST_SUBJECT_DATE: &str = "DIGEST_SUBJECT_DATE";
}

/// HTTP headers
pub mod headers {
    pub const USER_AGENT: &str = concat!("news-digest/", env!("CARGO_PKG_VERSION"));
}

/// Limits and thresholds
pub mod limits {
    pub const PAGE_SIZE: usize = 5;
    pub const MAX_TITLE_LENGTH: usize = 200;
    pub const MAX_DESCRIPTION_LENGTH: usize = 400;
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
}

/// Canned stories used when every network attempt comes back empty
pub static SAMPLE_STORIES: &[(&str, &str, &str)] = &[
    ("Sample Headline 1", "Fallback story.", "https://example.com/1"),
    ("Sample Headline 2", "Fallback story.", "https://example.com/2"),
    ("Sample Headline 3", "Fallback story.", "https://example.com/3"),
];
