//! Error taxonomy shared by acquisition, prompt assembly, the API clients and
//! the orchestrator.
//!
//! Every variant maps to a Burmese user-facing message through
//! [`ScribeError::user_message`]; the `Display` text is the English diagnostic
//! that ends up in logs.

use thiserror::Error;

pub const ERROR_NO_INPUT: &str = "ထည့်သွင်းမှု မရှိပါ";
pub const ERROR_GENERATING_SCRIPT: &str = "သတင်းမူကြမ်း ရေးသားရာတွင် အမှားအယွင်းဖြစ်ပွားခဲ့သည်";
pub const ERROR_FILE_READ: &str = "ဖိုင်ဖတ်ရှုရာတွင် အမှားအယွင်းဖြစ်ပွားခဲ့သည်";
pub const ERROR_FILE_PARSE: &str = "ဖိုင်ဖွင့်ရာတွင် အမှားအယွင်းဖြစ်ပွားခဲ့သည်";
pub const ERROR_UNSUPPORTED_FILE_TYPE: &str =
    "ထောက်ပံ့မထားသော ဖိုင်အမျိုးအစား။ txt, pdf, docx ဖိုင်များကိုသာ အသုံးပြုနိုင်ပါသည်။";
pub const ERROR_API_KEY_MISSING: &str =
    "API ကီး မတွေ့ရှိပါ။ API ကီးကို .env ဖိုင်တွင် ထည့်သွင်းပါ သို့မဟုတ် စီမံခန့်ခွဲသူထံ ဆက်သွယ်ပါ။";
pub const ERROR_INVALID_URL: &str = "ထည့်သွင်းထားသော URL သည် မှန်ကန်မှုမရှိပါ။";
pub const ERROR_URL_SCHEME: &str = "URL သည် 'http://' သို့မဟုတ် 'https://' ဖြင့် စတင်ရပါမည်။";
pub const ERROR_NO_NEWS_RESULTS: &str = "မည်သည့်အင်္ဂလိပ်သတင်းအကြောင်းအရာမှ မတွေ့ရှိပါ။\n\n\
    ကျေးဇူးပြု၍ သတင်းအကြောင်းအရာ (keywords သို့မဟုတ် URL) ကို ပိုမိုတိကျစွာ ထည့်သွင်းပါ။";
pub const ERROR_PROOFREADING: &str = "သတင်းမူကြမ်းကို ပြန်လည်တည်းဖြတ်ရာတွင် အမှားအယွင်းဖြစ်ပွားခဲ့သည်";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScribeError {
    /// Blank or whitespace-only input
    #[error("no input supplied ({0})")]
    NoInput(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Decoder succeeded but produced no text
    #[error("no text could be extracted from the file")]
    EmptyExtraction,

    /// Fetched page yielded less text than the minimum threshold
    #[error("fetched page is empty or too short ({chars} characters)")]
    EmptyContent { chars: usize },

    #[error("failed to read file: {0}")]
    ReadFailure(String),

    #[error("failed to fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    #[error("news search returned no articles for {query:?}")]
    NoResults { query: String },

    #[error("generative API rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("generative API rejected the credentials: {0}")]
    AuthInvalid(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("API responded with error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("connection error: {0}")]
    Transport(String),

    #[error("no signed-in session")]
    AuthSessionMissing,

    #[error("API key is missing or invalid")]
    MissingApiKey,

    #[error("no prompt template covers {0}")]
    TemplateUnmatched(String),

    #[error("more than one prompt template covers {0}")]
    TemplateAmbiguous(String),
}

impl ScribeError {
    /// Burmese message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ScribeError::NoInput(what) => format!("{} ({})", ERROR_NO_INPUT, what),
            ScribeError::InvalidUrl(reason) if reason.contains("scheme") => {
                ERROR_URL_SCHEME.to_string()
            }
            ScribeError::InvalidUrl(_) => ERROR_INVALID_URL.to_string(),
            ScribeError::UnsupportedFormat(_) => ERROR_UNSUPPORTED_FILE_TYPE.to_string(),
            ScribeError::EmptyExtraction => format!(
                "{} (ဖိုင်တွင် စာသားမတွေ့ပါ သို့မဟုတ် ထုတ်ယူ၍မရပါ။)",
                ERROR_FILE_PARSE
            ),
            ScribeError::ReadFailure(_) => ERROR_FILE_READ.to_string(),
            ScribeError::EmptyContent { .. } => {
                "ရယူထားသော သတင်းဆောင်းပါးသည် အလွန်တိုတောင်းနေ သို့မဟုတ် ဗလာဖြစ်နေပါသည်။ မှန်ကန်သော URL ကို ထည့်သွင်းပါ။"
                    .to_string()
            }
            ScribeError::FetchFailure { .. } => {
                "ပေးထားသော URL မှ သတင်းဆောင်းပါးကို ရယူ၍မရပါ။ URL ကို စစ်ဆေးပါ သို့မဟုတ် အခြား URL ကို စမ်းကြည့်ပါ။"
                    .to_string()
            }
            ScribeError::NoResults { .. } => ERROR_NO_NEWS_RESULTS.to_string(),
            ScribeError::RateLimited(_) => format!(
                "{} (API အသုံးပြုမှု ကန့်သတ်ချက် ပြည့်သွားပါပြီ။ ခဏစောင့်ပြီး ပြန်ကြိုးစားပါ။)",
                ERROR_GENERATING_SCRIPT
            ),
            ScribeError::AuthInvalid(_) | ScribeError::MissingApiKey => {
                ERROR_API_KEY_MISSING.to_string()
            }
            ScribeError::Timeout(_) => format!("{} (အချိန်ကုန်သွားပါသည်)", ERROR_GENERATING_SCRIPT),
            ScribeError::MalformedResponse(_) => format!(
                "{} (API returned an empty script)",
                ERROR_GENERATING_SCRIPT
            ),
            ScribeError::ApiError { message, .. } => {
                format!("{}: {}", ERROR_GENERATING_SCRIPT, message)
            }
            ScribeError::Transport(_) => format!(
                "{} (ကွန်ရက်ချိတ်ဆက်မှု မအောင်မြင်ပါ)",
                ERROR_GENERATING_SCRIPT
            ),
            ScribeError::AuthSessionMissing => {
                "ဆက်လက်အသုံးပြုရန် အကောင့်ဖြင့် ဝင်ရောက်ပါ။".to_string()
            }
            ScribeError::TemplateUnmatched(_) | ScribeError::TemplateAmbiguous(_) => {
                ERROR_GENERATING_SCRIPT.to_string()
            }
        }
    }

    /// Message for a failed proofread; the script itself is still valid.
    pub fn proofreading_message(&self) -> String {
        format!("{}: {}", ERROR_PROOFREADING, self.user_message())
    }

    /// Whether this error belongs to the generative API call rather than the input.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            ScribeError::RateLimited(_)
                | ScribeError::AuthInvalid(_)
                | ScribeError::Timeout(_)
                | ScribeError::MalformedResponse(_)
                | ScribeError::ApiError { .. }
                | ScribeError::Transport(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;
