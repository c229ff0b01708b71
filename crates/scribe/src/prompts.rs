//! Prompt assembly.
//!
//! A template is picked from [`TEMPLATE_RULES`] by (length, tone, output type);
//! the input mode picks the framing around it. Every prompt carries
//! [`FACT_PRESERVATION_CLAUSE`] verbatim.

use crate::errors::{Result, ScribeError};
use crate::style::{InputMode, ScriptLength, ScriptTone, ScriptType, StyleSelection};

/// "Do not add any new information. Use only the original facts."
pub const FACT_PRESERVATION_CLAUSE: &str =
    "မည်သည့်အချက်အလက်အသစ်မှ မထည့်ပါနှင့်။ မူရင်းအချက်အလက်များကိုသာ အသုံးပြုပါ။";

/// Source text beyond this many characters is cut before it goes into a prompt.
pub const MAX_SOURCE_CHARS: usize = 30_000;

const REPUTABLE_OUTLETS: &str = "BBC, VOA, Reuters, AP, Mizzima, Irrawaddy, Myanmar Now, \
Eleven Media, Frontier Myanmar, The Irrawaddy, The Guardian, Google News, Wikipedia, \
University Research Papers, Scientific Reports";

const FACT_CHECK_FOOTER: &str = "သတင်းအချက်အလက်များကို Google Fact Check နှင့် AP Fact Check ဖြင့် \
စစ်ဆေးပြီး ဖြစ်ကြောင်း footer တွင် disclaimer message (font size small) ဖြင့် ထည့်ပါ။";

pub fn tone_instruction(tone: ScriptTone) -> &'static str {
    match tone {
        ScriptTone::Formal => "ရေးသားပုံ - နေ့စဉ်သတင်းပုံစံ တရားဝင်လေသံ",
        ScriptTone::Conversational => "ရေးသားပုံ - ယဉ်ကျေးသော စကားပြောဟန်",
        ScriptTone::Simplified => "ရေးသားပုံ - သာမန်ပြည်သူ နားလည်လွယ်သော ရိုးရှင်းသည့်အသုံးအနှုန်း",
    }
}

pub fn length_instruction(length: ScriptLength) -> &'static str {
    match length {
        ScriptLength::Short => "အရှည် - တိုတောင်းစွာ (စာလုံးရေ ၁၅၀ ခန့်)",
        ScriptLength::Standard => "အရှည် - သာမန် (စာလုံးရေ ၃၀၀ မှ ၄၀၀ ခန့်)",
        ScriptLength::Detailed => "အရှည် - အသေးစိတ် (စာလုံးရေ ၈၀၀ ခန့်)",
        ScriptLength::Feature => "အရှည် - သတင်းအထူးအစီအစဉ် (စာလုံးရေ ၁၀၀၀ ခန့်)",
        ScriptLength::Analytical => "အရှည် - သုံးသပ်ချက် (စာလုံးရေ ၈၀၀ မှ ၁၀၀၀ ခန့်)",
    }
}

pub fn type_instruction(output_type: ScriptType) -> &'static str {
    match output_type {
        ScriptType::WebPost => "ဝဘ်ဆိုက်ပို့စ်အတွက်",
        ScriptType::NewsScript => "သတင်းဖတ်ကြားရန် (Video post)",
        ScriptType::SocialMedia => "လူမှုမီဒီယာအတွက်",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    InvestigativeReport,
    AnalyticalReview,
    FeatureStory,
    NewscastNarration,
    VideoNarration,
    NewsBulletin,
    BlogPost,
    SocialPost,
}

impl TemplateKind {
    pub fn label(&self) -> &'static str {
        match self {
            TemplateKind::InvestigativeReport => "စုံစမ်းဖော်ထုတ်သတင်း",
            TemplateKind::AnalyticalReview => "သတင်းသုံးသပ်ချက်",
            TemplateKind::FeatureStory => "သတင်းအထူးအစီအစဉ်",
            TemplateKind::NewscastNarration => "သတင်းဖတ်ကြားရန်",
            TemplateKind::VideoNarration => "ဗီဒီယို ထုတ်ရန် (Video post)",
            TemplateKind::NewsBulletin => "သတင်းတိုဖတ်ကြားရန်",
            TemplateKind::BlogPost => "ဝဘ်ဆိုက်ပို့စ်အတွက်",
            TemplateKind::SocialPost => "လူမှုမီဒီယာပို့စ်",
        }
    }

    fn extra_instruction(&self) -> &'static str {
        match self {
            TemplateKind::InvestigativeReport => {
                "စုံစမ်းဖော်ထုတ်သတင်းအတွက် အထူးသတင်းတင်ပြချက် format ကို အသုံးပြုပါ။"
            }
            TemplateKind::AnalyticalReview => "သတင်းသုံးသပ်ချက်အတွက် သုံးသပ်ချက် format ကို အသုံးပြုပါ။",
            TemplateKind::FeatureStory => "သတင်းအထူးအစီအစဉ်အတွက် Feature News format ကို အသုံးပြုပါ။",
            TemplateKind::NewscastNarration | TemplateKind::VideoNarration => {
                "Greeting နှင့် call to action ကို စကားပြောသံ script များအတွက်သာ ထည့်ပါ။"
            }
            TemplateKind::NewsBulletin => {
                "Greeting နှင့် call to action မထည့်ပါနှင့်။ သတင်းကြေညာသူ ဖတ်ကြားသည့်ပုံစံဖြင့် ရေးပါ။"
            }
            TemplateKind::BlogPost => {
                "Greeting နှင့် call to action မထည့်ပါနှင့်။ Blog post format ကို paragraph by paragraph ဖြင့်ရေးပါ။"
            }
            TemplateKind::SocialPost => {
                "လူမှုမီဒီယာတွင် မျှဝေရန် တိုတိုနှင့် ထိရောက်စွာ ရေးပါ။ Hashtag ၃ ခုအထိ ထည့်နိုင်သည်။"
            }
        }
    }

    fn structure_guide(&self) -> &'static str {
        match self {
            TemplateKind::InvestigativeReport => "\
စုံစမ်းဖော်ထုတ်သတင်း (Investigative Report) ဖွဲ့စည်းပုံ:
- ခေါင်းစဉ် (Title)
- အကျဉ်းချုပ် (Executive Summary)
- နောက်ခံသတင်း (Background)
- သက်ဆိုင်ရာအချက်အလက်များ၊ သက်သေခံချက်များ၊ သက်ဆိုင်သူများ၏ သက်သေခံချက်များ
- သုတေသန၊ သတင်းအရင်းအမြစ်များ၊ သက်ဆိုင်ရာ စာရွက်စာတမ်းများ
- သတင်းအချက်အလက်များကို Google Fact Check နှင့် AP Fact Check ဖြင့် စစ်ဆေးပြီး ဖြစ်ကြောင်း footer တွင် disclaimer message (font size small) ဖြင့် ထည့်ပါ။
- အပိုဒ်ခွဲများအလိုက် စနစ်တကျရေးပါ။",
            TemplateKind::AnalyticalReview => "\
သတင်းသုံးသပ်ချက် (Analytical News) ဖွဲ့စည်းပုံ:
- ခေါင်းစဉ် (Title)
- သုံးသပ်ချက်အကျဉ်း (Summary of Analysis)
- အဓိကအချက်များ၊ သက်ဆိုင်ရာအချက်အလက်များ၊ သုတေသန၊ သတင်းအရင်းအမြစ်များ
- သုံးသပ်ချက်၊ သုံးသပ်သူ၏အမြင်၊ သက်ဆိုင်ရာအချက်အလက်များ
- အပိုဒ်ခွဲများအလိုက် စနစ်တကျရေးပါ။",
            TemplateKind::FeatureStory => "\
သတင်းအထူးအစီအစဉ် (Feature News) ဖွဲ့စည်းပုံ:
- ခေါင်းစဉ် (Title)
- အကျဉ်းချုပ် (Summary)
- အဓိကအချက်များ၊ သက်ဆိုင်ရာအချက်အလက်များ၊ သုတေသန၊ သတင်းအရင်းအမြစ်များ
- စိတ်ဝင်စားဖွယ်အကြောင်းအရာများ၊ လူမှုရေး၊ ယဉ်ကျေးမှု၊ သဘာဝပတ်ဝန်းကျင်၊ စီးပွားရေး၊ နည်းပညာ စသည့်အကြောင်းအရာများ
- အပိုဒ်ခွဲများအလိုက် စနစ်တကျရေးပါ။",
            TemplateKind::NewscastNarration | TemplateKind::VideoNarration => "\
သတင်းဖတ်ကြားရန် စကားပြောသံ script များအတွက်:
- ပရိသတ်များ မင်္ဂလာပါ ခင်ဗျာ/ရှင်၊ (သတင်းအစမှာ)
- သတင်းအကြောင်းအရာကို အပိုင်းလိုက် အပိုဒ်ခွဲပြီး ဖော်ပြပါ (အဓိကအချက်များ၊ အကြောင်းအရာအကျဉ်း၊ အနောက်ခံသတင်း၊ သက်ဆိုင်ရာအချက်အလက်များ)
- သတင်းအဆုံးတွင် နောက်ထပ်သတင်းများအတွက် subscribe လုပ်ရန်/ကြည့်ရှုရန် ဖိတ်ခေါ်ပါ
- ယဥ်ကျေးသော မြန်မာစကားပြော အသုံးအနှုန်းများဖြင့် အများဆုံးသုံးနှုန်းပါ",
            TemplateKind::NewsBulletin => "\
သတင်းတိုဖတ်ကြားရန် ဖွဲ့စည်းပုံ:
- အဓိကသတင်းခေါင်းစဉ်ကို ပထမစာကြောင်းတွင် ဖော်ပြပါ
- ဘယ်သူ၊ ဘာ၊ ဘယ်မှာ၊ ဘယ်တော့၊ ဘာကြောင့် ကို အစဉ်လိုက်ဖော်ပြပါ
- စာကြောင်းတိုများဖြင့် အသံထွက်ဖတ်ရလွယ်အောင် ရေးပါ",
            TemplateKind::BlogPost => "\
Blog post ဖွဲ့စည်းပုံ:
- Title (မူရင်းသတင်း၏ ခေါင်းစဉ်)
- Author name (မူရင်းသတင်းရေးသားသူ)
- Original media name (မူရင်းသတင်းထုတ်ဝေသည့်မီဒီယာအမည်)
- Text body (သတင်းအကြောင်းအရာကို အပိုဒ်ခွဲများဖြင့် စနစ်တကျရေးပါ)
- အဆုံးတွင် Source links များထည့်ပါ။
- မင်္ဂလာပါ/မင်္ဂလာညနေခင်းပါ မထည့်ပါနှင့်။ Call to action မထည့်ပါနှင့်။",
            TemplateKind::SocialPost => "\
လူမှုမီဒီယာပို့စ် ဖွဲ့စည်းပုံ:
- ဆွဲဆောင်မှုရှိသော ခေါင်းစဉ်တစ်ကြောင်း
- အဓိကအချက် ၂ မှ ၃ ချက်
- မူရင်းသတင်းရင်းမြစ် link",
        }
    }
}

/// One row of the template table. A triple matches when each of its fields is
/// listed.
#[derive(Debug, Clone, Copy)]
pub struct TemplateRule {
    pub lengths: &'static [ScriptLength],
    pub tones: &'static [ScriptTone],
    pub types: &'static [ScriptType],
    pub kind: TemplateKind,
}

impl TemplateRule {
    fn matches(&self, style: &StyleSelection) -> bool {
        self.lengths.contains(&style.length)
            && self.tones.contains(&style.tone)
            && self.types.contains(&style.output_type)
    }
}

const BRIEF: &[ScriptLength] = &[ScriptLength::Short, ScriptLength::Standard];
const NOT_CONVERSATIONAL: &[ScriptTone] = &[ScriptTone::Formal, ScriptTone::Simplified];

pub const TEMPLATE_RULES: &[TemplateRule] = &[
    TemplateRule {
        lengths: &[ScriptLength::Detailed],
        tones: ScriptTone::ALL,
        types: ScriptType::ALL,
        kind: TemplateKind::InvestigativeReport,
    },
    TemplateRule {
        lengths: &[ScriptLength::Analytical],
        tones: ScriptTone::ALL,
        types: ScriptType::ALL,
        kind: TemplateKind::AnalyticalReview,
    },
    TemplateRule {
        lengths: &[ScriptLength::Feature],
        tones: ScriptTone::ALL,
        types: ScriptType::ALL,
        kind: TemplateKind::FeatureStory,
    },
    TemplateRule {
        lengths: BRIEF,
        tones: &[ScriptTone::Conversational],
        types: &[ScriptType::NewsScript],
        kind: TemplateKind::NewscastNarration,
    },
    TemplateRule {
        lengths: BRIEF,
        tones: &[ScriptTone::Conversational],
        types: &[ScriptType::WebPost],
        kind: TemplateKind::VideoNarration,
    },
    TemplateRule {
        lengths: BRIEF,
        tones: NOT_CONVERSATIONAL,
        types: &[ScriptType::NewsScript],
        kind: TemplateKind::NewsBulletin,
    },
    TemplateRule {
        lengths: BRIEF,
        tones: NOT_CONVERSATIONAL,
        types: &[ScriptType::WebPost],
        kind: TemplateKind::BlogPost,
    },
    TemplateRule {
        lengths: BRIEF,
        tones: ScriptTone::ALL,
        types: &[ScriptType::SocialMedia],
        kind: TemplateKind::SocialPost,
    },
];

/// The single template covering the style's (length, tone, output type).
pub fn select_template(style: &StyleSelection) -> Result<TemplateKind> {
    select_template_from(TEMPLATE_RULES, style)
}

pub fn select_template_from(rules: &[TemplateRule], style: &StyleSelection) -> Result<TemplateKind> {
    let mut matching = rules.iter().filter(|rule| rule.matches(style));
    let key = || format!("{}/{}/{}", style.length, style.tone, style.output_type);

    match (matching.next(), matching.next()) {
        (Some(rule), None) => Ok(rule.kind),
        (None, _) => Err(ScribeError::TemplateUnmatched(key())),
        (Some(_), Some(_)) => Err(ScribeError::TemplateAmbiguous(key())),
    }
}

/// Text that goes into a generation prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceText {
    /// Article body, uploaded document, or (translated) keywords
    pub primary: String,
    /// Keywords as the user typed them, when `primary` is a translation
    pub original: Option<String>,
    /// Supporting articles from news search
    pub supporting: Option<String>,
}

impl SourceText {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            ..Default::default()
        }
    }

    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        self.original = Some(original.into());
        self
    }

    pub fn with_supporting(mut self, supporting: impl Into<String>) -> Self {
        self.supporting = Some(supporting.into());
        self
    }
}

/// Cut at `max` characters without splitting a UTF-8 sequence.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Builds the generation prompt for a request.
pub fn assemble(source: &SourceText, style: &StyleSelection) -> Result<String> {
    let template = select_template(style)?;
    let primary = truncate_chars(source.primary.trim(), MAX_SOURCE_CHARS);

    let style_block = format!(
        "- {}\n- {}\n- အမျိုးအစား - {} ({})",
        tone_instruction(style.tone),
        length_instruction(style.length),
        type_instruction(style.output_type),
        template.label()
    );

    let prompt = match style.input_mode {
        InputMode::Url => format!(
            "အောက်ပါ မြန်မာသတင်းဆောင်းပါးအကြောင်းအရာကို မူရင်းအချက်အလက်များကိုသာ အသုံးပြု၍ {label} \
မြန်မာဘာသာဖြင့် ပြန်ဆိုရေးသားပါ။ {fact}\n\n{style_block}\n\n{extra}\n\n\
သတင်း script ကို အောက်ပါနမူနာပုံစံနှင့်ဖွဲ့စည်းပုံအတိုင်းသာရေးပါ။\n{guide}\n\n\
သတင်းအကြောင်းအရာ:\n{primary}",
            label = template.label(),
            fact = FACT_PRESERVATION_CLAUSE,
            extra = template.extra_instruction(),
            guide = template.structure_guide(),
        ),
        InputMode::File => {
            let mut prompt = format!(
                "အောက်ပါ တင်သွင်းထားသောဖိုင်နှင့် အင်္ဂလိပ်သတင်းအကြောင်းအရာများကို မြန်မာဘာသာဖြင့် {label} \
ပြန်ဆိုရေးသားပါ။ {fact}\n\n{style_block}\n\n{extra}\n\n{guide}\n\n\
တင်သွင်းထားသောဖိုင်:\n{primary}",
                label = template.label(),
                fact = FACT_PRESERVATION_CLAUSE,
                extra = template.extra_instruction(),
                guide = template.structure_guide(),
            );
            if let Some(supporting) = &source.supporting {
                prompt.push_str("\n\nကိုးကားသတင်းများ:\n");
                prompt.push_str(truncate_chars(supporting.trim(), MAX_SOURCE_CHARS));
            }
            prompt
        }
        InputMode::Keywords => {
            let mut topic = primary.to_string();
            if let Some(original) = &source.original {
                topic.push_str(&format!("\n(မူရင်းသော့ချက်စာလုံး: {})", original.trim()));
            }
            format!(
                "အောက်ပါသော့ချက်စာလုံးများအရ မြန်မာဘာသာဖြင့် {label} သတင်း script တစ်ပုဒ်ရေးပါ။\n\
- နောက်ဆုံးရသတင်းများ၊ နိုင်ငံတကာနှင့် မြန်မာသတင်းမီဒီယာ ({outlets}) မှသာ အချက်အလက်များကို အသုံးပြုပါ။\n\
- {fact}\n- {footer}\n- သတင်းအကြောင်းအရာကို အပိုဒ်ခွဲများဖြင့် စနစ်တကျရေးပါ။\n\
{style_block}\n\n{extra}\n\n{guide}\n\n- သတင်းအကြောင်းအရာ:\n{topic}",
                label = template.label(),
                outlets = REPUTABLE_OUTLETS,
                fact = FACT_PRESERVATION_CLAUSE,
                footer = FACT_CHECK_FOOTER,
                extra = template.extra_instruction(),
                guide = template.structure_guide(),
            )
        }
        InputMode::TranslateAndDevelop => {
            let register = if style.tone == ScriptTone::Conversational
                || style.output_type == ScriptType::NewsScript
            {
                "in a narration tone suitable for a newscaster reporting the news. Use clear, formal, \
and engaging language as if reading the news on TV or radio."
            } else {
                "in a news reporting tone, using a web post structure."
            };
            format!(
                "Translate the following English news article into Burmese language {register} \
Do not add any new information. Use only the original facts.\n{fact}\n\n{style_block}\n\n\
{extra}\n\n{guide}\n\n---\n\n{primary}",
                fact = FACT_PRESERVATION_CLAUSE,
                extra = template.extra_instruction(),
                guide = template.structure_guide(),
            )
        }
    };

    Ok(prompt)
}

/// Sub-call used when keywords contain no Myanmar script.
pub fn keyword_translation_prompt(keywords: &str) -> String {
    format!(
        "Translate the following keywords or phrases to Burmese language (မြန်မာဘာသာ). \
Reply with the translation only, without explanations:\n{}",
        keywords.trim()
    )
}

pub fn proofread_prompt(script: &str) -> String {
    format!(
        "အောက်ပါ မြန်မာသတင်းမူကြမ်းကို စာလုံးပေါင်း၊ သဒ္ဒါ၊ ပုဒ်ဖြတ်ပုဒ်ရပ်နှင့် ဝါကျဖွဲ့စည်းပုံများကို \
စစ်ဆေးပြင်ဆင်ပါ။ {}\nအဓိပ္ပါယ်ကို မပြောင်းလဲပါနှင့်။ ပြင်ဆင်ပြီးသော မူကြမ်းကိုသာ ပြန်ပေးပါ။\n\n{}",
        FACT_PRESERVATION_CLAUSE,
        truncate_chars(script.trim(), MAX_SOURCE_CHARS)
    )
}

pub fn content_analysis_prompt(content: &str) -> String {
    format!(
        r#"You are a news content analyst. Analyze the article below and respond with JSON only, no prose, using exactly this shape:
{{
  "wordCount": <number of words in the article>,
  "sentiment": "Positive" | "Negative" | "Neutral" | "Mixed",
  "keywords": ["up to 8 key terms"],
  "seoTitleSuggestions": ["3 to 5 SEO-friendly headlines"],
  "followupTopicSuggestions": ["3 to 5 follow-up questions a reader would ask"],
  "relatedTopicSuggestions": ["3 to 5 related topics phrased as questions"]
}}

Write suggestions in the same language as the article. {}

Article:
{}"#,
        FACT_PRESERVATION_CLAUSE,
        truncate_chars(content.trim(), MAX_SOURCE_CHARS)
    )
}
