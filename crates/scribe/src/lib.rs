// Public modules
pub mod acquisition;
pub mod auth;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod gemini;
pub mod io;
pub mod models;
pub mod news;
pub mod optimizer;
pub mod orchestrator;
pub mod prompts;
pub mod style;

// Re-export commonly used types
pub use acquisition::SourceInput;
pub use auth::{Session, SessionProvider, SupabaseAuth};
pub use config::Config;
pub use errors::ScribeError;
pub use extractor::{PageFetcher, PageSource};
pub use gemini::{GeminiClient, TextGenerator};
pub use io::{get_default_data_dir, load_session, save_script, save_session, ScriptKind};
pub use models::{GenerationRequest, GenerationResult, SourceReference};
pub use news::{NewsArticle, NewsClient, NewsSearch};
pub use optimizer::{analyze_content, ContentAnalysis, Sentiment};
pub use orchestrator::{Orchestrator, Phase, ProofreadState, Snapshot, SubmitOutcome};
pub use style::{InputMode, ScriptLength, ScriptTone, ScriptType, StyleSelection};

/// Shown under every generated script.
pub const DISCLAIMER: &str = "သတင်းပါ အချက်အလက်များသည် Google Fact Check နှင့် AP Fact Check တို့မှ \
စစ်ဆေးအတည်ပြုပြီးသော အချက်အလက်များအပေါ် အခြေခံပါသည်။";
