//! Business logic layer - fallback chain resolution and the end-to-end run

use crate::config::{Config, ConfigError};
use crate::consts::{api, Category};
use crate::dispatch::{DeliveryError, DigestDispatcher, Dispatched, TransportProvider};
use crate::network::{ApiRequest, CredentialRejected, FetchError, NewsApi, NewsItem};
use crate::render::render;
use std::fmt;
use thiserror::Error;

/// One step of the fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Top headlines for the configured country
    Preferred { country: String, category: Category },
    /// Top headlines for the API's own default country
    DefaultCountry { category: Category },
    /// Keyword search, newest first
    Keyword { query: String },
}

impl FetchStrategy {
    /// Ordered chain for a config. The default-country step is omitted when it
    /// would repeat the preferred request.
    pub fn chain(config: &Config) -> Vec<FetchStrategy> {
        let mut chain = vec![FetchStrategy::Preferred {
            country: config.country.clone(),
            category: config.category,
        }];
        if !config.country.eq_ignore_ascii_case(api::DEFAULT_COUNTRY) {
            chain.push(FetchStrategy::DefaultCountry { category: config.category });
        }
        chain.push(FetchStrategy::Keyword { query: config.fallback_query.clone() });
        chain
    }

    pub fn request(&self) -> ApiRequest {
        match self {
            FetchStrategy::Preferred { country, category } => ApiRequest::TopHeadlines {
                country: country.clone(),
                category: *category,
            },
            FetchStrategy::DefaultCountry { category } => ApiRequest::TopHeadlines {
                country: api::DEFAULT_COUNTRY.to_string(),
                category: *category,
            },
            FetchStrategy::Keyword { query } => ApiRequest::Everything { query: query.clone() },
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::Preferred { country, category } => {
                write!(f, "top headlines (country={}, category={})", country, category)
            }
            FetchStrategy::DefaultCountry { category } => write!(
                f,
                "top headlines (default country={}, category={})",
                api::DEFAULT_COUNTRY,
                category
            ),
            FetchStrategy::Keyword { query } => write!(f, "keyword search (q={})", query),
        }
    }
}

/// Why a strategy produced nothing
#[derive(Debug)]
pub enum FetchSignal {
    Empty,
    Failed(FetchError),
}

pub struct NewsFetcher<'a, A> {
    api: &'a A,
    api_key: &'a str,
    chain: Vec<FetchStrategy>,
}

impl<'a, A: NewsApi> NewsFetcher<'a, A> {
    pub fn new(api: &'a A, config: &'a Config) -> Self {
        Self {
            api,
            api_key: &config.api_key,
            chain: FetchStrategy::chain(config),
        }
    }

    async fn attempt(&self, strategy: &FetchStrategy) -> Result<Vec<NewsItem>, FetchSignal> {
        match self.api.get(&strategy.request(), self.api_key).await {
            Ok(items) if items.is_empty() => Err(FetchSignal::Empty),
            Ok(items) => Ok(items),
            Err(e) => Err(FetchSignal::Failed(e)),
        }
    }

    /// Walk the chain until a step yields items. Only a rejected key escapes;
    /// empty results and transport failures end in the sample digest.
    pub async fn fetch(&self) -> Result<Vec<NewsItem>, CredentialRejected> {
        for strategy in &self.chain {
            match self.attempt(strategy).await {
                Ok(items) => {
                    log::info!("{} item(s) from {}", items.len(), strategy);
                    return Ok(items);
                }
                Err(FetchSignal::Empty) => {
                    log::warn!("No usable articles from {}; trying next source", strategy);
                }
                Err(FetchSignal::Failed(FetchError::Credential(rejected))) => {
                    log::error!("{} failed: {}", strategy, rejected);
                    return Err(rejected);
                }
                Err(FetchSignal::Failed(e)) => {
                    log::warn!("{} failed: {}; using fallback sample", strategy, e);
                    return Ok(NewsItem::samples());
                }
            }
        }

        log::warn!("No articles from any source; using fallback sample");
        Ok(NewsItem::samples())
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Credential(#[from] CredentialRejected),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("could not build HTTP client: {0}")]
    Client(reqwest::Error),
}

impl RunError {
    /// Process exit status for a handled failure
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Config(_) => 1,
            RunError::Credential(_) => 2,
            RunError::Delivery(DeliveryError::Auth { .. }) => 3,
            RunError::Delivery(_) => 4,
            RunError::Client(_) => 5,
        }
    }
}

/// Validate config, fetch, render, send. Configuration is checked before any
/// network collaborator is touched.
pub async fn run<A, P>(
    config: Result<Config, ConfigError>,
    api: &A,
    provider: &P,
) -> Result<Dispatched, RunError>
where
    A: NewsApi,
    P: TransportProvider,
{
    let config = config?;

    let items = NewsFetcher::new(api, &config).fetch().await?;
    let document = render(&items);

    let dispatched = DigestDispatcher::new(&config, provider).send(&document).await?;
    Ok(dispatched)
}
