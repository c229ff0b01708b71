use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScribeError};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// A text-completion service: prompt in, text out. One attempt per call.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Self::with_endpoint(api_key, DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL)
    }

    pub fn with_endpoint(
        api_key: String,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(
            "Sending {} character prompt to {}",
            prompt.chars().count(),
            self.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScribeError::Timeout(e.to_string())
                } else {
                    ScribeError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ScribeError::Timeout(e.to_string())
            } else {
                ScribeError::Transport(format!("Failed to read response body: {}", e))
            }
        })?;

        if !status.is_success() {
            let err = classify_error(status, &body);
            error!("Gemini API error: {}", err);
            return Err(err);
        }

        extract_text(&body)
    }
}

/// Maps a non-success response onto the error taxonomy.
fn classify_error(status: StatusCode, body: &str) -> ScribeError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    let api_status = parsed.as_ref().map(|e| e.error.status.as_str()).unwrap_or("");
    let key_invalid = parsed
        .as_ref()
        .map(|e| {
            e.error
                .details
                .iter()
                .any(|d| d.to_string().contains("API_KEY_INVALID"))
        })
        .unwrap_or(false);

    match status {
        StatusCode::TOO_MANY_REQUESTS => ScribeError::RateLimited(message),
        _ if api_status == "RESOURCE_EXHAUSTED" => ScribeError::RateLimited(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ScribeError::AuthInvalid(message),
        StatusCode::BAD_REQUEST if key_invalid => ScribeError::AuthInvalid(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ScribeError::Timeout(message),
        _ => ScribeError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

/// `candidates[0].content.parts[0].text`, trimmed, or `MalformedResponse`.
fn extract_text(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ScribeError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| {
            ScribeError::MalformedResponse("missing candidates[0].content.parts[0].text".to_string())
        })?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ScribeError::MalformedResponse("empty text".to_string()));
    }
    Ok(trimmed.to_string())
}
