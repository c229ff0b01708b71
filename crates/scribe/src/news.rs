use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::errors::{Result, ScribeError};
use crate::models::SourceReference;
use crate::prompts::truncate_chars;

pub const DEFAULT_NEWS_API_BASE: &str = "https://newsapi.org/v2";

/// News search rejects longer `q` values.
pub const MAX_QUERY_CHARS: usize = 500;

const PAGE_SIZE: u32 = 5;
const SNIPPET_CHARS: usize = 280;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
}

impl NewsArticle {
    pub fn to_source(&self) -> SourceReference {
        let snippet = [
            Some(self.title.as_str()),
            self.description.as_deref(),
            self.content.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" | ");

        SourceReference {
            title: self.title.clone(),
            url: self.url.clone().unwrap_or_default(),
            snippet: truncate_chars(&snippet, SNIPPET_CHARS).to_string(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Articles rendered as one block of prompt text, separated by `---`.
pub fn articles_as_prompt_text(articles: &[NewsArticle]) -> String {
    articles
        .iter()
        .map(|a| {
            format!(
                "Title: {}\nDescription: {}\nContent: {}",
                a.title,
                a.description.as_deref().unwrap_or(""),
                a.content.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// Recent articles for `query`, newest first. Never returns an empty list.
    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>>;
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

pub struct NewsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl NewsClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Self::with_base_url(api_key, DEFAULT_NEWS_API_BASE)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/everything", self.base_url))
            .map_err(|e| self.failure(&format!("bad news API base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("language", "en")
            .append_pair("sortBy", "publishedAt")
            .append_pair("pageSize", &PAGE_SIZE.to_string());
        Ok(url)
    }

    fn failure(&self, reason: &str) -> ScribeError {
        ScribeError::FetchFailure {
            url: self.base_url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl NewsSearch for NewsClient {
    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>> {
        let query = truncate_chars(&query.split_whitespace().collect::<Vec<_>>().join(" "), MAX_QUERY_CHARS)
            .to_string();
        let url = self.search_url(&query)?;
        debug!("Searching news for {:?}", query);

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| self.failure(&format!("Failed to fetch news articles: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(self.failure(&format!(
                "News API returned error: {} - {}",
                status, error_text
            )));
        }

        let news_response = response
            .json::<NewsResponse>()
            .await
            .map_err(|e| self.failure(&format!("Failed to parse news API response: {}", e)))?;

        if news_response.articles.is_empty() {
            return Err(ScribeError::NoResults { query });
        }

        info!("News search returned {} articles", news_response.articles.len());
        Ok(news_response.articles)
    }
}
