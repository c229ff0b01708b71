//! Orchestrator behaviour against in-memory clients.

use async_trait::async_trait;
use scribe::auth::Session;
use scribe::errors::Result;
use scribe::prompts::{length_instruction, tone_instruction, FACT_PRESERVATION_CLAUSE};
use scribe::{
    InputMode, NewsArticle, NewsSearch, Orchestrator, PageSource, Phase, ProofreadState,
    ScribeError, ScriptLength, ScriptTone, ScriptType, SessionProvider, SourceInput,
    StyleSelection, SubmitOutcome, TextGenerator,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct ScriptedGenerator {
    prompts: Mutex<Vec<String>>,
    responses: Mutex<VecDeque<Result<String>>>,
}

impl ScriptedGenerator {
    fn new(responses: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("မူကြမ်း".to_string()))
    }
}

/// Blocks every call until released.
#[derive(Default)]
struct GatedGenerator {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl TextGenerator for GatedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok("late script".to_string())
    }
}

/// Answers in order, holding the second call until released.
#[derive(Default)]
struct SecondCallGate {
    calls: AtomicUsize,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl TextGenerator for SecondCallGate {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        match self.calls.fetch_add(1, Ordering::SeqCst) {
            0 => Ok("SCRIPT_A".to_string()),
            1 => {
                self.entered.notify_one();
                self.release.notified().await;
                Ok("PROOFREAD_OF_A".to_string())
            }
            _ => Ok("SCRIPT_B".to_string()),
        }
    }
}

#[derive(Default)]
struct FakeNews {
    articles: Vec<NewsArticle>,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl NewsSearch for FakeNews {
    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.articles.is_empty() {
            return Err(ScribeError::NoResults {
                query: query.to_string(),
            });
        }
        Ok(self.articles.clone())
    }
}

struct FakePages {
    html: String,
    calls: AtomicUsize,
}

impl FakePages {
    fn new(html: &str) -> Arc<Self> {
        Arc::new(Self {
            html: html.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn article() -> Arc<Self> {
        Self::new(&format!(
            "<html><body><script>track()</script><p>{}</p></body></html>",
            "ရန်ကုန်မြို့တွင် မိုးသည်းထန်စွာ ရွာသွန်းခဲ့သည်။ ".repeat(5)
        ))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for FakePages {
    async fn fetch_page(&self, _url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.html.clone())
    }
}

struct FixedSession(Option<Session>);

#[async_trait]
impl SessionProvider for FixedSession {
    fn current_session(&self) -> Option<Session> {
        self.0.clone()
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}

/// Changes the tone from inside validation, then reports no session.
#[derive(Default)]
struct RestylingSession {
    orchestrator: Mutex<Option<Orchestrator>>,
}

#[async_trait]
impl SessionProvider for RestylingSession {
    fn current_session(&self) -> Option<Session> {
        if let Some(orchestrator) = self.orchestrator.lock().unwrap().as_ref() {
            orchestrator.set_tone(ScriptTone::Conversational);
        }
        None
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}

fn style(mode: InputMode) -> StyleSelection {
    StyleSelection::new(mode, ScriptLength::Standard, ScriptTone::Formal, ScriptType::WebPost)
}

fn text_file(text: &str) -> SourceInput {
    SourceInput::File {
        bytes: text.as_bytes().to_vec(),
        mime: Some("text/plain".to_string()),
        file_name: Some("story.txt".to_string()),
    }
}

fn article(title: &str) -> NewsArticle {
    NewsArticle {
        title: title.to_string(),
        description: Some("Heavy rain across the delta".to_string()),
        content: None,
        url: Some(format!("https://news.example/{}", title.len())),
    }
}

#[tokio::test]
async fn blank_input_never_reaches_acquisition() {
    let cases = [
        (
            InputMode::File,
            SourceInput::File {
                bytes: Vec::new(),
                mime: None,
                file_name: None,
            },
        ),
        (InputMode::Url, SourceInput::Url("   ".to_string())),
        (InputMode::Keywords, SourceInput::Keywords("\n\t".to_string())),
        (InputMode::TranslateAndDevelop, SourceInput::EnglishUrl(String::new())),
    ];

    for (mode, input) in cases {
        let generator = ScriptedGenerator::new(vec![]);
        let pages = FakePages::article();
        let orchestrator = Orchestrator::builder(generator.clone(), pages.clone())
            .style(style(mode))
            .build();

        assert_eq!(orchestrator.submit(input).await, SubmitOutcome::Completed);

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.phase, Phase::Failed, "{}", mode);
        assert!(matches!(snapshot.error, Some(ScribeError::NoInput(_))), "{}", mode);
        assert!(snapshot.result.is_none());
        assert_eq!(generator.calls(), 0);
        assert_eq!(pages.calls(), 0);
    }
}

#[tokio::test]
async fn non_http_urls_are_invalid() {
    for url in ["ftp://example.com/story", "javascript:alert(1)", "news/today"] {
        let generator = ScriptedGenerator::new(vec![]);
        let pages = FakePages::article();
        let orchestrator = Orchestrator::builder(generator.clone(), pages.clone())
            .style(style(InputMode::Url))
            .build();

        orchestrator.submit(SourceInput::Url(url.to_string())).await;

        let snapshot = orchestrator.snapshot();
        assert!(matches!(snapshot.error, Some(ScribeError::InvalidUrl(_))), "{}", url);
        assert_eq!(pages.calls(), 0);
        assert_eq!(generator.calls(), 0);
    }
}

#[tokio::test]
async fn url_mode_writes_from_the_fetched_article() {
    let generator = ScriptedGenerator::new(vec![Ok("  ရန်ကုန် မိုးသတင်း  ".to_string())]);
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Url))
        .build();

    orchestrator
        .submit(SourceInput::Url("https://news.example/rain".to_string()))
        .await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Done);
    let result = snapshot.result.unwrap();
    assert_eq!(result.script, "ရန်ကုန် မိုးသတင်း");
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].url, "https://news.example/rain");

    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("ရန်ကုန်မြို့တွင်"));
    assert!(!prompt.contains("track()"));
    assert!(prompt.contains(FACT_PRESERVATION_CLAUSE));
}

#[tokio::test]
async fn short_pages_are_empty_content() {
    let generator = ScriptedGenerator::new(vec![]);
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::new("<body>Login</body>"))
        .style(style(InputMode::TranslateAndDevelop))
        .build();

    orchestrator
        .submit(SourceInput::EnglishUrl("https://news.example/paywall".to_string()))
        .await;

    assert!(matches!(
        orchestrator.snapshot().error,
        Some(ScribeError::EmptyContent { .. })
    ));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn zero_news_articles_is_no_results() {
    let generator = ScriptedGenerator::new(vec![]);
    let news = Arc::new(FakeNews::default());
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .news(news.clone())
        .style(style(InputMode::File))
        .build();

    orchestrator
        .submit(text_file("Flood waters   rose\nacross the delta overnight."))
        .await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Failed);
    assert!(matches!(snapshot.error, Some(ScribeError::NoResults { .. })));
    assert!(snapshot.result.is_none());
    assert_eq!(generator.calls(), 0);
    assert_eq!(
        news.queries.lock().unwrap().as_slice(),
        ["Flood waters rose across the delta overnight."]
    );
}

#[tokio::test]
async fn file_mode_cites_supporting_articles() {
    let generator = ScriptedGenerator::new(vec![]);
    let news = Arc::new(FakeNews {
        articles: vec![article("Delta floods"), article("Aid arrives")],
        ..Default::default()
    });
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .news(news)
        .style(style(InputMode::File))
        .build();

    orchestrator.submit(text_file("Flood waters rose.")).await;

    let result = orchestrator.snapshot().result.unwrap();
    assert_eq!(result.sources.len(), 2);
    assert_eq!(result.sources[0].title, "Delta floods");

    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("Flood waters rose."));
    assert!(prompt.contains("Title: Aid arrives"));
}

#[tokio::test]
async fn keyword_request_end_to_end() {
    let generator = ScriptedGenerator::new(vec![
        Ok("ရွေးကောက်ပွဲ ရလဒ်များ".to_string()),
        Ok("ရွေးကောက်ပွဲ သတင်း".to_string()),
    ]);
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    orchestrator
        .submit(SourceInput::Keywords("election results".to_string()))
        .await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Done);
    let result = snapshot.result.unwrap();
    assert_eq!(result.script, "ရွေးကောက်ပွဲ သတင်း");
    assert_eq!(
        result.intermediate_translation.as_deref(),
        Some("ရွေးကောက်ပွဲ ရလဒ်များ")
    );

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("election results"));

    let generation = &prompts[1];
    assert!(generation.contains("ရွေးကောက်ပွဲ ရလဒ်များ"));
    assert!(generation.contains("election results"));
    assert!(generation.contains(tone_instruction(ScriptTone::Formal)));
    assert!(generation.contains(length_instruction(ScriptLength::Standard)));
}

#[tokio::test]
async fn myanmar_keywords_skip_translation() {
    let generator = ScriptedGenerator::new(vec![]);
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    orchestrator
        .submit(SourceInput::Keywords("ငလျင် ကယ်ဆယ်ရေး".to_string()))
        .await;

    assert_eq!(generator.calls(), 1);
    assert!(orchestrator.snapshot().result.unwrap().intermediate_translation.is_none());
}

#[tokio::test]
async fn empty_text_file_is_empty_extraction() {
    let generator = ScriptedGenerator::new(vec![]);
    let news = Arc::new(FakeNews {
        articles: vec![article("unused")],
        ..Default::default()
    });
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .news(news.clone())
        .style(style(InputMode::File))
        .build();

    orchestrator.submit(text_file("")).await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.error, Some(ScribeError::EmptyExtraction));
    assert_eq!(generator.calls(), 0);
    assert!(news.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn generator_errors_fail_the_request() {
    let generator = ScriptedGenerator::new(vec![Err(ScribeError::RateLimited("quota".to_string()))]);
    let orchestrator = Orchestrator::builder(generator, FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    orchestrator.submit(SourceInput::Keywords("ငလျင်".to_string())).await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Failed);
    assert_eq!(snapshot.error, Some(ScribeError::RateLimited("quota".to_string())));
}

#[tokio::test]
async fn blank_script_is_malformed() {
    let generator = ScriptedGenerator::new(vec![Ok("  \n ".to_string())]);
    let orchestrator = Orchestrator::builder(generator, FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    orchestrator.submit(SourceInput::Keywords("ငလျင်".to_string())).await;

    assert!(matches!(
        orchestrator.snapshot().error,
        Some(ScribeError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn proofread_failure_keeps_the_script() {
    let generator = ScriptedGenerator::new(vec![
        Ok("မူရင်း မူကြမ်း".to_string()),
        Err(ScribeError::Timeout("slow".to_string())),
    ]);
    let orchestrator = Orchestrator::builder(generator, FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    orchestrator.submit(SourceInput::Keywords("ငလျင်".to_string())).await;
    assert_eq!(orchestrator.proofread().await, SubmitOutcome::Completed);

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Done);
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.result.unwrap().script, "မူရင်း မူကြမ်း");
    assert_eq!(
        snapshot.proofread,
        ProofreadState::Failed(ScribeError::Timeout("slow".to_string()))
    );
}

#[tokio::test]
async fn proofread_success_is_held_separately() {
    let generator = ScriptedGenerator::new(vec![
        Ok("မူရင်း".to_string()),
        Ok(" ပြင်ပြီး ".to_string()),
    ]);
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    assert_eq!(orchestrator.proofread().await, SubmitOutcome::Ignored);

    orchestrator.submit(SourceInput::Keywords("ငလျင်".to_string())).await;
    orchestrator.proofread().await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.result.unwrap().script, "မူရင်း");
    assert_eq!(snapshot.proofread, ProofreadState::Done("ပြင်ပြီး".to_string()));
    assert!(generator.prompts()[1].contains("မူရင်း"));
}

#[tokio::test]
async fn style_change_clears_the_result() {
    let generator = ScriptedGenerator::new(vec![]);
    let orchestrator = Orchestrator::builder(generator, FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    orchestrator
        .submit(SourceInput::Keywords("election results".to_string()))
        .await;
    orchestrator.proofread().await;
    assert!(orchestrator.snapshot().result.is_some());

    orchestrator.set_tone(ScriptTone::Conversational);

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.result.is_none());
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.proofread, ProofreadState::Idle);
    assert_eq!(snapshot.style.tone, ScriptTone::Conversational);
}

#[tokio::test]
async fn unchanged_style_keeps_the_result() {
    let generator = ScriptedGenerator::new(vec![]);
    let orchestrator = Orchestrator::builder(generator, FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    orchestrator.submit(SourceInput::Keywords("ငလျင်".to_string())).await;
    orchestrator.set_length(ScriptLength::Standard);

    assert!(orchestrator.snapshot().result.is_some());
}

#[tokio::test]
async fn mode_mismatch_is_no_input() {
    let generator = ScriptedGenerator::new(vec![]);
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Url))
        .build();

    orchestrator.submit(SourceInput::Keywords("ငလျင်".to_string())).await;

    assert!(matches!(orchestrator.snapshot().error, Some(ScribeError::NoInput(_))));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn missing_api_key_blocks_submit() {
    let generator = ScriptedGenerator::new(vec![]);
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Keywords))
        .blocked_by(ScribeError::MissingApiKey)
        .build();

    assert_eq!(
        orchestrator.submit(SourceInput::Keywords("   ".to_string())).await,
        SubmitOutcome::Blocked
    );

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.blocking, Some(ScribeError::MissingApiKey));
    assert_eq!(generator.calls(), 0);

    // Survives parameter resets
    orchestrator.set_input_mode(InputMode::Url);
    assert_eq!(orchestrator.snapshot().blocking, Some(ScribeError::MissingApiKey));
}

#[tokio::test]
async fn required_session_must_be_present() {
    let generator = ScriptedGenerator::new(vec![]);
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Keywords))
        .session(Arc::new(FixedSession(None)), true)
        .build();

    orchestrator.submit(SourceInput::Keywords("ငလျင်".to_string())).await;

    assert_eq!(orchestrator.snapshot().error, Some(ScribeError::AuthSessionMissing));
    assert_eq!(generator.calls(), 0);

    let signed_in = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Keywords))
        .session(
            Arc::new(FixedSession(Some(Session {
                access_token: "token".to_string(),
                refresh_token: None,
                expires_at: None,
                user: None,
            }))),
            true,
        )
        .build();

    signed_in.submit(SourceInput::Keywords("ငလျင်".to_string())).await;
    assert_eq!(signed_in.snapshot().phase, Phase::Done);
}

#[tokio::test]
async fn submit_is_ignored_while_in_flight() {
    let generator = Arc::new(GatedGenerator::default());
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .submit(SourceInput::Keywords("ငလျင်".to_string()))
                .await
        })
    };
    generator.entered.notified().await;
    assert_eq!(orchestrator.snapshot().phase, Phase::Generating);

    assert_eq!(
        orchestrator
            .submit(SourceInput::Keywords("မီးလောင်မှု".to_string()))
            .await,
        SubmitOutcome::Ignored
    );

    generator.release.notify_one();
    assert_eq!(running.await.unwrap(), SubmitOutcome::Completed);
    assert_eq!(orchestrator.snapshot().result.unwrap().script, "late script");
}

#[tokio::test]
async fn parameter_change_cancels_in_flight_request() {
    let generator = Arc::new(GatedGenerator::default());
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .submit(SourceInput::Keywords("ငလျင်".to_string()))
                .await
        })
    };
    generator.entered.notified().await;

    orchestrator.set_output_type(ScriptType::NewsScript);

    let outcome = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("cancelled request should finish promptly")
        .unwrap();
    assert_eq!(outcome, SubmitOutcome::Cancelled);

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.result.is_none());
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.epoch, 1);

    // A new request runs normally afterwards
    let next = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .submit(SourceInput::Keywords("ငလျင်".to_string()))
                .await
        })
    };
    generator.entered.notified().await;
    generator.release.notify_one();
    assert_eq!(next.await.unwrap(), SubmitOutcome::Completed);
    assert_eq!(orchestrator.snapshot().phase, Phase::Done);
}

#[tokio::test]
async fn validation_error_is_dropped_after_a_parameter_change() {
    let generator = ScriptedGenerator::new(vec![]);
    let session = Arc::new(RestylingSession::default());
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Keywords))
        .session(session.clone(), true)
        .build();
    *session.orchestrator.lock().unwrap() = Some(orchestrator.clone());

    let outcome = orchestrator
        .submit(SourceInput::Keywords("ငလျင်".to_string()))
        .await;
    session.orchestrator.lock().unwrap().take();

    assert_eq!(outcome, SubmitOutcome::Cancelled);
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.style.tone, ScriptTone::Conversational);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn proofread_of_a_replaced_script_is_discarded() {
    let generator = Arc::new(SecondCallGate::default());
    let orchestrator = Orchestrator::builder(generator.clone(), FakePages::article())
        .style(style(InputMode::Keywords))
        .build();

    orchestrator.submit(SourceInput::Keywords("ငလျင်".to_string())).await;
    assert_eq!(orchestrator.snapshot().result.unwrap().script, "SCRIPT_A");

    let proofreading = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.proofread().await })
    };
    generator.entered.notified().await;

    assert_eq!(
        orchestrator
            .submit(SourceInput::Keywords("မီးလောင်မှု".to_string()))
            .await,
        SubmitOutcome::Completed
    );
    assert_eq!(orchestrator.snapshot().result.unwrap().script, "SCRIPT_B");

    generator.release.notify_one();
    assert_eq!(proofreading.await.unwrap(), SubmitOutcome::Cancelled);

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.result.unwrap().script, "SCRIPT_B");
    assert_eq!(snapshot.proofread, ProofreadState::Idle);
    assert_eq!(snapshot.request, 2);
}
