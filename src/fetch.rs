use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::document::ActivityDocument;

pub const EXTRACT_PATH: &str = "extract-all";
pub const DEFAULT_COMMENT_COUNT: u8 = 2;
pub const MAX_COMMENT_COUNT: u8 = 50;

/// Per-batch request parameters chosen in the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub extract_comments: bool,
    count: u8,
}

impl FetchOptions {
    /// Returns `None` when `count` is above [`MAX_COMMENT_COUNT`].
    pub fn new(extract_comments: bool, count: u8) -> Option<Self> {
        (count <= MAX_COMMENT_COUNT).then_some(Self {
            extract_comments,
            count,
        })
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn extract_comments_param(&self) -> &'static str {
        if self.extract_comments {
            "yes"
        } else {
            "no"
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            extract_comments: true,
            count: DEFAULT_COMMENT_COUNT,
        }
    }
}

/// Parse the `yes`/`no` toggle used by the form and the API.
pub fn parse_toggle(value: &str) -> Option<bool> {
    match value.trim() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} for url: {url}")]
    Status { status: StatusCode, url: String },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of activity documents, one identifier at a time.
#[async_trait]
pub trait ActivityFetcher: Send + Sync {
    async fn fetch(
        &self,
        username: &str,
        options: FetchOptions,
    ) -> Result<ActivityDocument, FetchError>;
}

/// Fetcher backed by the remote `extract-all` endpoint.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    endpoint: Url,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let endpoint = extract_endpoint(base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ActivityFetcher for HttpFetcher {
    async fn fetch(
        &self,
        username: &str,
        options: FetchOptions,
    ) -> Result<ActivityDocument, FetchError> {
        let count = options.count().to_string();
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("username", username),
                ("extract_comments", options.extract_comments_param()),
                ("count", count.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: response.url().to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Append the `extract-all` segment to the configured base URL.
fn extract_endpoint(base_url: &str) -> anyhow::Result<Url> {
    let mut endpoint = Url::parse(base_url)?;
    endpoint
        .path_segments_mut()
        .map_err(|_| anyhow::anyhow!("API base URL cannot be a base: {}", base_url))?
        .pop_if_empty()
        .push(EXTRACT_PATH);
    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_reject_count_above_limit() {
        assert!(FetchOptions::new(true, 0).is_some());
        assert!(FetchOptions::new(true, 50).is_some());
        assert!(FetchOptions::new(true, 51).is_none());
    }

    #[test]
    fn default_options() {
        let options = FetchOptions::default();
        assert!(options.extract_comments);
        assert_eq!(options.count(), 2);
        assert_eq!(options.extract_comments_param(), "yes");
    }

    #[test]
    fn toggle_parsing() {
        assert_eq!(parse_toggle("yes"), Some(true));
        assert_eq!(parse_toggle(" no "), Some(false));
        assert_eq!(parse_toggle("Yes"), None);
        assert_eq!(parse_toggle(""), None);
    }

    #[test]
    fn endpoint_appends_extract_path() {
        let fetcher = HttpFetcher::new("https://api.example.com", None).unwrap();
        assert_eq!(
            fetcher.endpoint().as_str(),
            "https://api.example.com/extract-all"
        );

        let fetcher = HttpFetcher::new("https://api.example.com/v1/", None).unwrap();
        assert_eq!(
            fetcher.endpoint().as_str(),
            "https://api.example.com/v1/extract-all"
        );
    }

    #[test]
    fn endpoint_rejects_bad_urls() {
        assert!(HttpFetcher::new("not a url", None).is_err());
        assert!(HttpFetcher::new("mailto:someone@example.com", None).is_err());
    }
}
