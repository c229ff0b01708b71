use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};

use crate::errors::{Result, ScribeError};

/// Pages that extract to fewer characters than this are treated as empty.
pub const MIN_CONTENT_CHARS: usize = 100;

/// Anything that can hand back the raw HTML of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// Fetches article pages over HTTP, optionally through a fetch proxy that
/// takes the percent-encoded target URL appended to its own URL.
pub struct PageFetcher {
    client: Client,
    proxy_prefix: Option<String>,
    max_attempts: u32,
}

impl PageFetcher {
    pub fn new(proxy_prefix: Option<String>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; MyanmarNewsScribe/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            proxy_prefix,
            max_attempts: 3,
        })
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    async fn fetch_with_retries(&self, request_url: &str, target: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            match self.try_fetch(request_url, target).await {
                Ok(html) => return Ok(html),
                Err(failed) if is_terminal(failed.status) => return Err(failed.error),
                Err(failed) => {
                    last_error = Some(failed.error);
                    if attempt + 1 < self.max_attempts {
                        let backoff = std::time::Duration::from_millis(500 * (2_u64.pow(attempt)));
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| fetch_failure(target, "no attempts made")))
    }

    async fn try_fetch(&self, request_url: &str, target: &str) -> std::result::Result<String, AttemptError> {
        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| AttemptError::new(e.status(), fetch_failure(target, &e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::new(
                Some(status),
                fetch_failure(target, &format!("HTTP error: {}", status)),
            ));
        }

        response.text().await.map_err(|e| {
            AttemptError::new(
                None,
                fetch_failure(target, &format!("Failed to read response body: {}", e)),
            )
        })
    }
}

/// One failed attempt, with the HTTP status when the server answered.
struct AttemptError {
    status: Option<StatusCode>,
    error: ScribeError,
}

impl AttemptError {
    fn new(status: Option<StatusCode>, error: ScribeError) -> Self {
        Self { status, error }
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        // Proxy first, then straight to the origin
        if let Some(prefix) = &self.proxy_prefix {
            let proxied = format!("{}{}", prefix, urlencoding::encode(url));
            debug!("Fetching {} through proxy", url);
            match self.fetch_with_retries(&proxied, url).await {
                Ok(html) => return Ok(html),
                Err(e) => warn!("Proxy fetch failed, trying direct fetch: {}", e),
            }
        }

        self.fetch_with_retries(url, url).await
    }
}

fn fetch_failure(url: &str, reason: &str) -> ScribeError {
    ScribeError::FetchFailure {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Statuses that another attempt will not change.
fn is_terminal(status: Option<StatusCode>) -> bool {
    matches!(
        status,
        Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND)
    )
}

/// Plain text of a page: the `<body>` (or whole document) with `script` and
/// `style` subtrees dropped, text nodes separated by a space, whitespace
/// collapsed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut pieces: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| matches!(el.name(), "script" | "style"))
                .unwrap_or(false)
        });
        if !inside_skipped {
            pieces.push(&text.text);
        }
    }

    pieces
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracted text of a fetched page, or `EmptyContent` below the threshold.
pub fn extract_article_text(html: &str) -> Result<String> {
    let text = html_to_text(html);
    let chars = text.chars().count();
    if chars < MIN_CONTENT_CHARS {
        return Err(ScribeError::EmptyContent { chars });
    }
    Ok(text)
}
