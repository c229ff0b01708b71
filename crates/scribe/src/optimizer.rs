//! Content optimizer: metrics and suggestion lists for an existing article,
//! produced by one generative call that is asked for JSON.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::acquisition::require_text;
use crate::errors::{Result, ScribeError};
use crate::gemini::TextGenerator;
use crate::prompts::content_analysis_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoTitleSuggestion {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSuggestion {
    pub id: String,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    pub word_count: usize,
    pub sentiment: Sentiment,
    pub keywords: Vec<String>,
    pub seo_title_suggestions: Vec<SeoTitleSuggestion>,
    pub followup_topic_suggestions: Vec<TopicSuggestion>,
    pub related_topic_suggestions: Vec<TopicSuggestion>,
}

/// Suggestions arrive as bare strings or as objects, depending on the model's mood.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSuggestion {
    Text(String),
    Title { title: String },
    Question { question: String },
}

impl RawSuggestion {
    fn into_text(self) -> String {
        match self {
            RawSuggestion::Text(text) => text,
            RawSuggestion::Title { title } => title,
            RawSuggestion::Question { question } => question,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    word_count: Option<usize>,
    sentiment: Option<Sentiment>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    seo_title_suggestions: Vec<RawSuggestion>,
    #[serde(default)]
    followup_topic_suggestions: Vec<RawSuggestion>,
    #[serde(default)]
    related_topic_suggestions: Vec<RawSuggestion>,
}

pub async fn analyze_content(generator: &dyn TextGenerator, content: &str) -> Result<ContentAnalysis> {
    let content = require_text(content, "သတင်းအကြောင်းအရာ")?;
    let response = generator.generate(&content_analysis_prompt(content)).await?;
    debug!("Analysis response is {} characters", response.len());
    parse_analysis(&response, content)
}

/// Parses the model's JSON, filling a missing word count from `content`.
pub fn parse_analysis(response: &str, content: &str) -> Result<ContentAnalysis> {
    let json = json_object(strip_code_fence(response));
    let raw: RawAnalysis = serde_json::from_str(json).map_err(|e| {
        warn!("Could not parse content analysis: {}", e);
        ScribeError::MalformedResponse(format!("content analysis is not valid JSON: {}", e))
    })?;

    Ok(ContentAnalysis {
        word_count: raw
            .word_count
            .filter(|&n| n > 0)
            .unwrap_or_else(|| count_words(content)),
        sentiment: raw.sentiment.unwrap_or(Sentiment::Unknown),
        keywords: raw
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        seo_title_suggestions: texts(raw.seo_title_suggestions)
            .enumerate()
            .map(|(i, title)| SeoTitleSuggestion {
                id: format!("seo-{}", i + 1),
                title,
            })
            .collect(),
        followup_topic_suggestions: topics("followup", raw.followup_topic_suggestions),
        related_topic_suggestions: topics("related", raw.related_topic_suggestions),
    })
}

fn texts(raw: Vec<RawSuggestion>) -> impl Iterator<Item = String> {
    raw.into_iter()
        .map(|s| s.into_text().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn topics(prefix: &str, raw: Vec<RawSuggestion>) -> Vec<TopicSuggestion> {
    texts(raw)
        .enumerate()
        .map(|(i, question)| TopicSuggestion {
            id: format!("{}-{}", prefix, i + 1),
            question,
        })
        .collect()
}

/// Strips a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// The span from the first `{` to the last `}`, or the whole text.
fn json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
