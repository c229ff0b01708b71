use anyhow::{Context, Result};
use std::env;

use crate::gemini::{DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL};
use crate::news::DEFAULT_NEWS_API_BASE;

pub const APP_DIR_NAME: &str = "myanmar-news-scribe";

const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub news_api_key: Option<String>,
    pub news_api_base: String,
    pub fetch_proxy_url: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
}

impl Config {
    /// Reads configuration from the environment. A missing Gemini key is not an
    /// error here; it is reported through [`Config::has_valid_api_key`] so the
    /// caller can block generation while still offering sign-in and the like.
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let gemini_api_base = optional_var("GEMINI_API_BASE")
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string());
        url::Url::parse(&gemini_api_base)
            .with_context(|| format!("GEMINI_API_BASE is not a valid URL: {}", gemini_api_base))?;

        let news_api_base =
            optional_var("NEWS_API_BASE").unwrap_or_else(|| DEFAULT_NEWS_API_BASE.to_string());
        url::Url::parse(&news_api_base)
            .with_context(|| format!("NEWS_API_BASE is not a valid URL: {}", news_api_base))?;

        Ok(Self {
            gemini_api_key: optional_var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: optional_var("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_base,
            news_api_key: optional_var("NEWS_API_KEY"),
            news_api_base,
            fetch_proxy_url: optional_var("FETCH_PROXY_URL"),
            supabase_url: optional_var("SUPABASE_URL"),
            supabase_anon_key: optional_var("SUPABASE_ANON_KEY"),
        })
    }

    pub fn has_valid_api_key(&self) -> bool {
        is_api_key_valid(&self.gemini_api_key)
    }

    pub fn require_news_api_key(&self) -> Result<&str> {
        self.news_api_key.as_deref().context(
            "NEWS_API_KEY not found.\n\n\
            File mode searches supporting news articles. Add it to ~/.config/myanmar-news-scribe/.env:\n  \
            NEWS_API_KEY=your_key_here\n\n\
            Get a key from: https://newsapi.org/register",
        )
    }

    /// Supabase project URL and anon key, when both are configured.
    pub fn supabase(&self) -> Option<(&str, &str)> {
        match (&self.supabase_url, &self.supabase_anon_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/myanmar-news-scribe/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(APP_DIR_NAME).join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A key is usable when it is present, not the template placeholder, and
/// longer than ten characters.
pub fn is_api_key_valid(api_key: &str) -> bool {
    let key = api_key.trim();
    !key.is_empty() && key != API_KEY_PLACEHOLDER && key.chars().count() > 10
}
