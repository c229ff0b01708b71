use serde::{Deserialize, Serialize};

use crate::acquisition::SourceInput;
use crate::style::StyleSelection;

/// A grounding source shown to the user as a citation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// One submit: the source plus the style it was submitted with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub source: SourceInput,
    pub style: StyleSelection,
}

impl GenerationRequest {
    pub fn new(source: SourceInput, style: StyleSelection) -> Self {
        Self { source, style }
    }
}

/// Output of one generation cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub script: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intermediate_translation: Option<String>,
    pub sources: Vec<SourceReference>,
}
