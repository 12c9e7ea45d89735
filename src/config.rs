//! Run configuration, read once from the environment at startup.

use crate::consts::{api, env, Category};
use crate::utils::{non_blank, parse_flag};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// How the digest leaves the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    DryRun,
    TestInbox,
    LiveMailbox,
}

impl DeliveryMode {
    /// Dry run wins over the test inbox, which wins over the live mailbox
    pub fn select(dry_run: bool, use_test_inbox: bool) -> Self {
        if dry_run {
            DeliveryMode::DryRun
        } else if use_test_inbox {
            DeliveryMode::TestInbox
        } else {
            DeliveryMode::LiveMailbox
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base_url: String,
    pub country: String,
    pub category: Category,
    pub fallback_query: String,
    pub email_user: String,
    pub email_pass: String,
    pub receiver: String,
    pub mode: DeliveryMode,
    pub dated_subject: bool,
}

impl Config {
    /// Read the process environment (`.env` is loaded by `main`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Every missing required key is reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        let mut missing = Vec::new();
        let mut require = |key: &'static str| {
            let value = get(key);
            if value.is_none() {
                missing.push(key);
            }
            value.unwrap_or_default()
        };

        let api_key = require(env::NEWS_API_KEY);
        let email_user = require(env::EMAIL_USER);
        let email_pass = require(env::EMAIL_PASS);
        let receiver = require(env::RECEIVER_EMAIL);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let category = match get(env::NEWS_CATEGORY) {
            Some(raw) => Category::parse(&raw).unwrap_or_else(|| {
                log::warn!("Unknown {} '{}', using general", env::NEWS_CATEGORY, raw);
                Category::General
            }),
            None => Category::General,
        };

        let mode = DeliveryMode::select(
            parse_flag(lookup(env::DRY_RUN).as_deref()),
            parse_flag(lookup(env::USE_ETHEREAL).as_deref()),
        );

        Ok(Self {
            api_key,
            api_base_url: get(env::NEWS_API_BASE_URL)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| api::DEFAULT_BASE_URL.to_string()),
            country: get(env::NEWS_COUNTRY)
                .map(|c| c.to_ascii_lowercase())
                .unwrap_or_else(|| api::PREFERRED_COUNTRY.to_string()),
            category,
            fallback_query: get(env::NEWS_FALLBACK_QUERY)
                .unwrap_or_else(|| api::FALLBACK_QUERY.to_string()),
            email_user,
            email_pass,
            receiver,
            mode,
            dated_subject: parse_flag(lookup(env::DIGEST_SUBJECT_DATE).as_deref()),
        })
    }
}
