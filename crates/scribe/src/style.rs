use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generates `as_str`, `ALL`, `Display` and `FromStr` for a style enum so the
/// string identity is the same one serde uses.
macro_rules! style_enum {
    ($name:ident { $($variant:ident => $ident:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $ident),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
                match normalized.as_str() {
                    $($ident => Ok($name::$variant),)+
                    _ => Err(format!(
                        "unknown {} '{}' (expected one of: {})",
                        stringify!($name),
                        s,
                        [$($ident),+].join(", ")
                    )),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputMode {
    File,
    Url,
    Keywords,
    #[serde(rename = "TRANSLATE_DEVELOP")]
    TranslateAndDevelop,
}

style_enum!(InputMode {
    File => "FILE",
    Url => "URL",
    Keywords => "KEYWORDS",
    TranslateAndDevelop => "TRANSLATE_DEVELOP",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptLength {
    Short,
    Standard,
    Detailed,
    Feature,
    Analytical,
}

style_enum!(ScriptLength {
    Short => "SHORT",
    Standard => "STANDARD",
    Detailed => "DETAILED",
    Feature => "FEATURE",
    Analytical => "ANALYTICAL",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptTone {
    Formal,
    Conversational,
    Simplified,
}

style_enum!(ScriptTone {
    Formal => "FORMAL",
    Conversational => "CONVERSATIONAL",
    Simplified => "SIMPLIFIED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptType {
    WebPost,
    NewsScript,
    SocialMedia,
}

style_enum!(ScriptType {
    WebPost => "WEB_POST",
    NewsScript => "NEWS_SCRIPT",
    SocialMedia => "SOCIAL_MEDIA",
});

/// Style options for one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSelection {
    pub input_mode: InputMode,
    pub length: ScriptLength,
    pub tone: ScriptTone,
    pub output_type: ScriptType,
}

impl Default for StyleSelection {
    fn default() -> Self {
        Self {
            input_mode: InputMode::File,
            length: ScriptLength::Standard,
            tone: ScriptTone::Formal,
            output_type: ScriptType::WebPost,
        }
    }
}

impl StyleSelection {
    pub fn new(
        input_mode: InputMode,
        length: ScriptLength,
        tone: ScriptTone,
        output_type: ScriptType,
    ) -> Self {
        Self {
            input_mode,
            length,
            tone,
            output_type,
        }
    }

    /// Every (length, tone, output type) triple for the given input mode.
    pub fn all(input_mode: InputMode) -> Vec<StyleSelection> {
        let mut selections = Vec::new();
        for &length in ScriptLength::ALL {
            for &tone in ScriptTone::ALL {
                for &output_type in ScriptType::ALL {
                    selections.push(Self::new(input_mode, length, tone, output_type));
                }
            }
        }
        selections
    }
}

impl fmt::Display for StyleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.input_mode, self.length, self.tone, self.output_type
        )
    }
}
