//! News API client: request shapes, response interpretation, and the HTTP seam.

use crate::consts::{api, headers, limits, Category, SAMPLE_STORIES};
use crate::utils::{clean_text, truncate_text};
use regex::Regex;
use reqwest::{Client, Url};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// The API refused the key. Never absorbed into sample data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("news API rejected NEWS_API_KEY [{code}]: {message} (bad credential, not an empty result)")]
pub struct CredentialRejected {
    pub code: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Credential(#[from] CredentialRejected),
    #[error("transport error [{}]: {detail}", transport_label(.status, .code))]
    Transport {
        status: Option<u16>,
        code: Option<String>,
        detail: String,
    },
}

fn transport_label(status: &Option<u16>, code: &Option<String>) -> String {
    match (status, code) {
        (Some(s), Some(c)) => format!("HTTP {} {}", s, c),
        (Some(s), None) => format!("HTTP {}", s),
        (None, Some(c)) => c.clone(),
        (None, None) => "no status".to_string(),
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        let code = if e.is_timeout() {
            Some("timeout")
        } else if e.is_connect() {
            Some("connect")
        } else if e.is_decode() {
            Some("decode")
        } else {
            None
        };
        // The request URL carries the API key in its query string.
        FetchError::Transport {
            status: e.status().map(|s| s.as_u16()),
            code: code.map(str::to_string),
            detail: e.without_url().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
}

impl NewsItem {
    fn new(title: String, url: String) -> Self {
        Self { title, description: None, url }
    }
    fn with_desc(mut self, desc: Option<String>) -> Self { self.description = desc; self }

    /// The fixed three-story digest used when the API has nothing to offer
    pub fn samples() -> Vec<NewsItem> {
        SAMPLE_STORIES
            .iter()
            .map(|(title, desc, url)| {
                NewsItem::new(title.to_string(), url.to_string()).with_desc(Some(desc.to_string()))
            })
            .collect()
    }
}

/// One outbound API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    TopHeadlines { country: String, category: Category },
    Everything { query: String },
}

impl ApiRequest {
    pub fn path(&self) -> &'static str {
        match self {
            ApiRequest::TopHeadlines { .. } => api::TOP_HEADLINES_PATH,
            ApiRequest::Everything { .. } => api::EVERYTHING_PATH,
        }
    }

    pub fn query_params(&self, api_key: &str) -> Vec<(&'static str, String)> {
        let mut params = match self {
            ApiRequest::TopHeadlines { country, category } => vec![
                ("country", country.clone()),
                ("category", category.to_string()),
            ],
            ApiRequest::Everything { query } => vec![
                ("q", query.clone()),
                ("sortBy", api::SORT_BY.to_string()),
            ],
        };
        params.push(("pageSize", limits::PAGE_SIZE.to_string()));
        params.push(("apiKey", api_key.to_string()));
        params
    }
}

/// Transport seam for the fetch chain
pub trait NewsApi {
    /// Usable items for `request`, possibly none
    async fn get(&self, request: &ApiRequest, api_key: &str) -> Result<Vec<NewsItem>, FetchError>;
}

pub struct HttpNewsApi {
    client: Client,
    base_url: String,
}

impl HttpNewsApi {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, Duration::from_secs(limits::REQUEST_TIMEOUT_SECS))
    }

    pub(crate) fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(headers::USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl NewsApi for HttpNewsApi {
    async fn get(&self, request: &ApiRequest, api_key: &str) -> Result<Vec<NewsItem>, FetchError> {
        let url = format!("{}{}", self.base_url, request.path());
        log::debug!("GET {} {:?}", url, request);

        let res = self
            .client
            .get(&url)
            .query(&request.query_params(api_key))
            .send()
            .await?;

        let status = res.status().as_u16();
        let body = res.text().await?;
        interpret(status, &body)
    }
}

/// Turn a status code and raw body into usable items or a classified failure
pub fn interpret(status: u16, body: &str) -> Result<Vec<NewsItem>, FetchError> {
    let data: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) if status == 401 => {
            return Err(CredentialRejected {
                code: "http401".to_string(),
                message: format!("unauthorized ({})", e),
            }
            .into())
        }
        Err(e) => {
            return Err(FetchError::Transport {
                status: Some(status),
                code: None,
                detail: format!("unreadable response body: {}", e),
            })
        }
    };

    if data["status"].as_str() == Some("error") {
        let code = data["code"].as_str().unwrap_or("unknown").to_string();
        let message = data["message"].as_str().unwrap_or("").to_string();
        if status == 401 || is_key_error(&code, &message) {
            return Err(CredentialRejected { code, message }.into());
        }
        return Err(FetchError::Transport {
            status: Some(status),
            code: Some(code),
            detail: message,
        });
    }

    if !(200..300).contains(&status) {
        if status == 401 {
            return Err(CredentialRejected {
                code: "http401".to_string(),
                message: "unauthorized".to_string(),
            }
            .into());
        }
        return Err(FetchError::Transport {
            status: Some(status),
            code: None,
            detail: "unexpected response status".to_string(),
        });
    }

    Ok(data["articles"]
        .as_array()
        .map(|articles| normalize(articles))
        .unwrap_or_default())
}

fn is_key_error(code: &str, message: &str) -> bool {
    static KEY_PATTERN: OnceLock<Regex> = OnceLock::new();
    if api::KEY_ERROR_CODES.iter().any(|k| k.eq_ignore_ascii_case(code)) {
        return true;
    }
    KEY_PATTERN
        .get_or_init(|| Regex::new(r"(?i)\bapi\s*key\b").expect("static regex"))
        .is_match(message)
}

/// Only absolute http(s) links end up as `href`s in the digest
fn is_web_link(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

/// Project `{title, description, url}` and keep only entries with a title and a link
pub fn normalize(articles: &[Value]) -> Vec<NewsItem> {
    articles
        .iter()
        .filter_map(|entry| {
            let title = clean_text(entry["title"].as_str().unwrap_or(""));
            let url = entry["url"].as_str().unwrap_or("").trim().to_string();
            if title.is_empty() || !is_web_link(&url) || title == api::REMOVED_MARKER {
                return None;
            }
            let desc = entry["description"]
                .as_str()
                .map(clean_text)
                .filter(|d| !d.is_empty())
                .map(|d| truncate_text(&d, limits::MAX_DESCRIPTION_LENGTH));
            Some(
                NewsItem::new(truncate_text(&title, limits::MAX_TITLE_LENGTH), url)
                    .with_desc(desc),
            )
        })
        .take(limits::PAGE_SIZE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn normalize_drops_entries_without_title_or_url() {
        let articles = json!([
            { "title": "Kept", "description": "  body  ", "url": "https://a.example/1" },
            { "title": null, "url": "https://a.example/2" },
            { "title": "No link", "url": "" },
            { "title": "   ", "url": "https://a.example/3" },
            { "title": "[Removed]", "url": "https://removed.com" },
            { "title": "Blank desc", "description": " ", "url": "https://a.example/4" },
            "not an object"
        ]);
        let items = normalize(articles.as_array().unwrap());

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Kept");
        assert_eq!(items[0].description.as_deref(), Some("body"));
        assert_eq!(items[1].title, "Blank desc");
        assert_eq!(items[1].description, None);
    }

    #[test]
    fn normalize_keeps_only_http_links() {
        let articles = json!([
            { "title": "Script", "url": "javascript:alert(1)" },
            { "title": "Data", "url": "data:text/html,<b>x</b>" },
            { "title": "Relative", "url": "/news/1" },
            { "title": "Plain", "url": "http://a.example/1" },
            { "title": "Secure", "url": " https://a.example/2 " }
        ]);
        let items = normalize(articles.as_array().unwrap());

        let urls: Vec<_> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["http://a.example/1", "https://a.example/2"]);
    }

    #[test]
    fn five_titleless_articles_count_as_zero() {
        let articles: Vec<Value> = (0..5).map(|i| json!({ "url": format!("https://x/{}", i) })).collect();
        let body = json!({ "status": "ok", "articles": articles });
        let items = interpret(200, &body.to_string()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn key_error_codes_are_credential_rejections() {
        let body = json!({ "status": "error", "code": "apiKeyInvalid", "message": "Your API key is invalid or incorrect." });
        let err = interpret(401, &body.to_string()).unwrap_err();
        assert!(matches!(err, FetchError::Credential(ref c) if c.code == "apiKeyInvalid"));
        assert!(err.to_string().contains("NEWS_API_KEY"));

        // Status 200 with a key-ish message still names the key.
        let body = json!({ "status": "error", "code": "odd", "message": "API key has expired" });
        assert!(matches!(interpret(200, &body.to_string()), Err(FetchError::Credential(_))));
    }

    #[test]
    fn other_api_errors_are_transport_errors() {
        let body = json!({ "status": "error", "code": "rateLimited", "message": "slow down" });
        match interpret(429, &body.to_string()) {
            Err(FetchError::Transport { status, code, .. }) => {
                assert_eq!(status, Some(429));
                assert_eq!(code.as_deref(), Some("rateLimited"));
            }
            other => panic!("unexpected {:?}", other),
        }

        match interpret(502, "<html>bad gateway</html>") {
            Err(e @ FetchError::Transport { .. }) => assert!(e.to_string().contains("HTTP 502")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_articles_field_is_empty() {
        assert!(interpret(200, r#"{"status":"ok"}"#).unwrap().is_empty());
    }

    #[test]
    fn samples_are_fixed() {
        let samples = NewsItem::samples();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].title, "Sample Headline 1");
        assert_eq!(samples[2].url, "https://example.com/3");
    }

    #[tokio::test]
    async fn http_client_sends_top_headline_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/top-headlines"))
            .and(query_param("country", "in"))
            .and(query_param("category", "general"))
            .and(query_param("pageSize", "5"))
            .and(query_param("apiKey", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": [{ "title": "Monsoon arrives", "url": "https://n.example/m" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpNewsApi::new(&server.uri()).unwrap();
        let request = ApiRequest::TopHeadlines { country: "in".into(), category: Category::General };
        let items = client.get(&request, "k").await.unwrap();
        assert_eq!(items, vec![NewsItem::new("Monsoon arrives".into(), "https://n.example/m".into())]);
    }

    #[tokio::test]
    async fn http_client_sends_everything_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(query_param("q", "rust OR tokio"))
            .and(query_param("sortBy", "publishedAt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok", "articles": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpNewsApi::new(&server.uri()).unwrap();
        let request = ApiRequest::Everything { query: "rust OR tokio".into() };
        assert!(client.get(&request, "k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn http_client_surfaces_unauthorized_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": "error",
                "code": "apiKeyInvalid",
                "message": "Your API key is invalid or incorrect."
            })))
            .mount(&server)
            .await;

        let client = HttpNewsApi::new(&server.uri()).unwrap();
        let request = ApiRequest::Everything { query: "x".into() };
        let err = client.get(&request, "bad").await.unwrap_err();
        assert!(matches!(err, FetchError::Credential(_)));
    }

    #[tokio::test]
    async fn http_client_connection_failure_is_transport() {
        // Nothing listens on port 9 locally.
        let client = HttpNewsApi::new("http://127.0.0.1:9").unwrap();
        let request = ApiRequest::Everything { query: "x".into() };
        let err = client.get(&request, "secret-key-42").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { status: None, .. }));
        assert!(!err.to_string().contains("secret-key-42"));
    }

    #[tokio::test]
    async fn http_client_times_out_without_leaking_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "ok", "articles": [] }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = HttpNewsApi::with_timeout(&server.uri(), Duration::from_millis(200)).unwrap();
        let request = ApiRequest::Everything { query: "x".into() };
        let err = client.get(&request, "secret-key-42").await.unwrap_err();

        assert!(matches!(err, FetchError::Transport { code: Some(ref c), .. } if c == "timeout"));
        assert!(!err.to_string().contains("secret-key-42"));
        assert!(!format!("{:?}", err).contains("secret-key-42"));
    }
}
