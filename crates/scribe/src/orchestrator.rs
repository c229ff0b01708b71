//! Request lifecycle for script generation.
//!
//! All observable state lives in one [`Snapshot`] behind a mutex. A request
//! captures the epoch it started in; every parameter change bumps the epoch,
//! which both cancels the in-flight future and makes any late completion a
//! no-op.

use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::acquisition::{self, SourceInput};
use crate::auth::SessionProvider;
use crate::errors::{Result, ScribeError};
use crate::extractor::PageSource;
use crate::gemini::TextGenerator;
use crate::models::{GenerationRequest, GenerationResult, SourceReference};
use crate::news::{articles_as_prompt_text, NewsSearch, MAX_QUERY_CHARS};
use crate::prompts::{self, truncate_chars, SourceText};
use crate::style::{InputMode, ScriptLength, ScriptTone, ScriptType, StyleSelection};

const SOURCE_SNIPPET_CHARS: usize = 280;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Acquiring,
    Assembling,
    Generating,
    Done,
    Failed,
}

impl Phase {
    fn accepts_submit(self) -> bool {
        matches!(self, Phase::Idle | Phase::Done | Phase::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofreadState {
    Idle,
    Running,
    Done(String),
    Failed(ScribeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Ran to the end; the snapshot holds the result or the error
    Completed,
    /// Superseded by a parameter change; nothing was applied
    Cancelled,
    /// Another request is in flight, or there is nothing to act on
    Ignored,
    /// A configuration error prevents any request
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub epoch: u64,
    /// Bumped by every accepted submit
    pub request: u64,
    pub style: StyleSelection,
    pub phase: Phase,
    pub result: Option<GenerationResult>,
    pub error: Option<ScribeError>,
    pub proofread: ProofreadState,
    /// Held apart from `error`; survives resets
    pub blocking: Option<ScribeError>,
}

impl Snapshot {
    fn new(style: StyleSelection, blocking: Option<ScribeError>) -> Self {
        Self {
            epoch: 0,
            request: 0,
            style,
            phase: Phase::Idle,
            result: None,
            error: None,
            proofread: ProofreadState::Idle,
            blocking,
        }
    }

    fn clear_output(&mut self) {
        self.result = None;
        self.error = None;
        self.proofread = ProofreadState::Idle;
    }
}

/// Text, citations and translation gathered for one request
struct Acquired {
    text: SourceText,
    translation: Option<String>,
    sources: Vec<SourceReference>,
}

pub struct OrchestratorBuilder {
    generator: Arc<dyn TextGenerator>,
    pages: Arc<dyn PageSource>,
    news: Option<Arc<dyn NewsSearch>>,
    session: Option<Arc<dyn SessionProvider>>,
    require_session: bool,
    style: StyleSelection,
    blocking: Option<ScribeError>,
}

impl OrchestratorBuilder {
    pub fn news(mut self, news: Arc<dyn NewsSearch>) -> Self {
        self.news = Some(news);
        self
    }

    pub fn session(mut self, provider: Arc<dyn SessionProvider>, require_session: bool) -> Self {
        self.session = Some(provider);
        self.require_session = require_session;
        self
    }

    pub fn style(mut self, style: StyleSelection) -> Self {
        self.style = style;
        self
    }

    pub fn blocked_by(mut self, error: ScribeError) -> Self {
        self.blocking = Some(error);
        self
    }

    pub fn build(self) -> Orchestrator {
        let (epoch_tx, _) = watch::channel(0);
        Orchestrator {
            inner: Arc::new(Inner {
                generator: self.generator,
                pages: self.pages,
                news: self.news,
                session: self.session,
                require_session: self.require_session,
                state: Mutex::new(Snapshot::new(self.style, self.blocking)),
                epoch_tx,
            }),
        }
    }
}

struct Inner {
    generator: Arc<dyn TextGenerator>,
    pages: Arc<dyn PageSource>,
    news: Option<Arc<dyn NewsSearch>>,
    session: Option<Arc<dyn SessionProvider>>,
    require_session: bool,
    state: Mutex<Snapshot>,
    epoch_tx: watch::Sender<u64>,
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn builder(generator: Arc<dyn TextGenerator>, pages: Arc<dyn PageSource>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            generator,
            pages,
            news: None,
            session: None,
            require_session: false,
            style: StyleSelection::default(),
            blocking: None,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state().clone()
    }

    pub fn set_style(&self, style: StyleSelection) {
        self.update_style(|s| *s = style);
    }

    pub fn set_input_mode(&self, input_mode: InputMode) {
        self.update_style(|s| s.input_mode = input_mode);
    }

    pub fn set_length(&self, length: ScriptLength) {
        self.update_style(|s| s.length = length);
    }

    pub fn set_tone(&self, tone: ScriptTone) {
        self.update_style(|s| s.tone = tone);
    }

    pub fn set_output_type(&self, output_type: ScriptType) {
        self.update_style(|s| s.output_type = output_type);
    }

    /// Runs one generation request to completion, cancellation, or rejection.
    pub async fn submit(&self, source: SourceInput) -> SubmitOutcome {
        let (epoch, style) = {
            let mut state = self.state();
            if let Some(blocking) = &state.blocking {
                warn!("Submit blocked: {}", blocking);
                return SubmitOutcome::Blocked;
            }
            if !state.phase.accepts_submit() {
                debug!("Submit ignored while {:?}", state.phase);
                return SubmitOutcome::Ignored;
            }
            state.clear_output();
            state.request += 1;
            state.phase = Phase::Validating;
            (state.epoch, state.style)
        };

        let request = GenerationRequest::new(source, style);
        info!("Starting {} request", request.style);

        if let Err(err) = self.validate(&request) {
            return if self.finish(epoch, Err(err)) {
                SubmitOutcome::Completed
            } else {
                SubmitOutcome::Cancelled
            };
        }

        let mut epochs = self.inner.epoch_tx.subscribe();
        tokio::select! {
            result = self.run(epoch, &request) => {
                if self.finish(epoch, result) {
                    SubmitOutcome::Completed
                } else {
                    SubmitOutcome::Cancelled
                }
            }
            _ = epoch_moved(&mut epochs, epoch) => {
                info!("Request superseded by a parameter change");
                SubmitOutcome::Cancelled
            }
        }
    }

    /// Second round trip over the current script. Never touches the script.
    pub async fn proofread(&self) -> SubmitOutcome {
        let (epoch, request, script) = {
            let mut state = self.state();
            if state.blocking.is_some() {
                return SubmitOutcome::Blocked;
            }
            let script = match (&state.phase, &state.result, &state.proofread) {
                (_, _, ProofreadState::Running) => return SubmitOutcome::Ignored,
                (Phase::Done, Some(result), _) => result.script.clone(),
                _ => return SubmitOutcome::Ignored,
            };
            state.proofread = ProofreadState::Running;
            (state.epoch, state.request, script)
        };

        info!("Proofreading {} character script", script.chars().count());
        let generator = Arc::clone(&self.inner.generator);
        let prompt = prompts::proofread_prompt(&script);
        let mut epochs = self.inner.epoch_tx.subscribe();

        let outcome = tokio::select! {
            result = generator.generate(&prompt) => result,
            _ = epoch_moved(&mut epochs, epoch) => return SubmitOutcome::Cancelled,
        };

        let outcome = outcome.and_then(|text| {
            let text = text.trim();
            if text.is_empty() {
                Err(ScribeError::MalformedResponse("proofread text is empty".to_string()))
            } else {
                Ok(text.to_string())
            }
        });

        let mut state = self.state();
        if state.epoch != epoch || state.request != request {
            debug!("Dropping proofread of a superseded script");
            return SubmitOutcome::Cancelled;
        }
        state.proofread = match outcome {
            Ok(text) => ProofreadState::Done(text),
            Err(err) => {
                warn!("Proofreading failed: {}", err);
                ProofreadState::Failed(err)
            }
        };
        SubmitOutcome::Completed
    }

    fn state(&self) -> MutexGuard<'_, Snapshot> {
        // A panic while holding the lock leaves a whole snapshot behind
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update_style(&self, change: impl FnOnce(&mut StyleSelection)) {
        let mut state = self.state();
        let mut style = state.style;
        change(&mut style);
        if style == state.style {
            return;
        }

        let was = state.phase;
        state.style = style;
        state.epoch += 1;
        state.phase = Phase::Idle;
        state.clear_output();
        self.inner.epoch_tx.send_replace(state.epoch);

        if !matches!(was, Phase::Idle | Phase::Done | Phase::Failed) {
            info!("Style changed to {} while {:?}, cancelling", style, was);
        } else {
            debug!("Style changed to {}", style);
        }
    }

    fn set_phase(&self, epoch: u64, phase: Phase) {
        let mut state = self.state();
        if state.epoch == epoch {
            debug!("{:?} -> {:?}", state.phase, phase);
            state.phase = phase;
        }
    }

    /// Applies a completion if its epoch is still current.
    fn finish(&self, epoch: u64, result: Result<GenerationResult>) -> bool {
        let mut state = self.state();
        if state.epoch != epoch {
            debug!("Discarding completion from epoch {}", epoch);
            return false;
        }
        match result {
            Ok(result) => {
                info!("Script ready ({} characters)", result.script.chars().count());
                state.phase = Phase::Done;
                state.result = Some(result);
            }
            Err(err) => {
                if err.is_generation_failure() {
                    error!("Generation failed: {}", err);
                } else {
                    warn!("Request failed: {}", err);
                }
                state.phase = Phase::Failed;
                state.error = Some(err);
            }
        }
        true
    }

    fn validate(&self, request: &GenerationRequest) -> Result<()> {
        if request.source.mode() != request.style.input_mode {
            return Err(ScribeError::NoInput(request.style.input_mode.to_string()));
        }
        acquisition::validate(&request.source)?;

        if self.inner.require_session {
            let signed_in = self
                .inner
                .session
                .as_ref()
                .map(|provider| provider.current_session().is_some())
                .unwrap_or(false);
            if !signed_in {
                return Err(ScribeError::AuthSessionMissing);
            }
        }
        Ok(())
    }

    async fn run(&self, epoch: u64, request: &GenerationRequest) -> Result<GenerationResult> {
        self.set_phase(epoch, Phase::Acquiring);
        let acquired = self.acquire(&request.source).await?;

        self.set_phase(epoch, Phase::Assembling);
        let prompt = prompts::assemble(&acquired.text, &request.style)?;

        self.set_phase(epoch, Phase::Generating);
        let script = self.inner.generator.generate(&prompt).await?;
        let script = script.trim();
        if script.is_empty() {
            return Err(ScribeError::MalformedResponse("generated script is empty".to_string()));
        }

        Ok(GenerationResult {
            script: script.to_string(),
            intermediate_translation: acquired.translation,
            sources: acquired.sources,
        })
    }

    async fn acquire(&self, source: &SourceInput) -> Result<Acquired> {
        match source {
            SourceInput::File {
                bytes,
                mime,
                file_name,
            } => {
                let text = acquisition::extract_file_text(bytes, mime.as_deref(), file_name.as_deref())?;
                let mut source_text = SourceText::new(text.as_str());
                let mut sources = Vec::new();

                match &self.inner.news {
                    Some(news) => {
                        let query = text.split_whitespace().collect::<Vec<_>>().join(" ");
                        let articles = news.search(truncate_chars(&query, MAX_QUERY_CHARS)).await?;
                        sources = articles.iter().map(|a| a.to_source()).collect();
                        source_text = source_text.with_supporting(articles_as_prompt_text(&articles));
                    }
                    None => warn!("No news search configured, writing from the file alone"),
                }

                Ok(Acquired {
                    text: source_text,
                    translation: None,
                    sources,
                })
            }
            SourceInput::Url(url) | SourceInput::EnglishUrl(url) => {
                let article = acquisition::fetch_article(self.inner.pages.as_ref(), url).await?;
                let source = SourceReference {
                    title: article.url.clone(),
                    url: article.url.clone(),
                    snippet: truncate_chars(&article.text, SOURCE_SNIPPET_CHARS).to_string(),
                };
                Ok(Acquired {
                    text: SourceText::new(article.text),
                    translation: None,
                    sources: vec![source],
                })
            }
            SourceInput::Keywords(keywords) => {
                let keywords = keywords.trim();
                if acquisition::contains_myanmar_script(keywords) {
                    return Ok(Acquired {
                        text: SourceText::new(keywords),
                        translation: None,
                        sources: Vec::new(),
                    });
                }

                debug!("Translating keywords before generation");
                let translated = self
                    .inner
                    .generator
                    .generate(&prompts::keyword_translation_prompt(keywords))
                    .await?;
                let translated = translated.trim();
                let translation = (!translated.is_empty() && translated != keywords)
                    .then(|| translated.to_string());
                let primary = translation.as_deref().unwrap_or(keywords);

                Ok(Acquired {
                    text: SourceText::new(primary).with_original(keywords),
                    translation,
                    sources: Vec::new(),
                })
            }
        }
    }
}

/// Resolves once the published epoch differs from `epoch`.
async fn epoch_moved(epochs: &mut watch::Receiver<u64>, epoch: u64) {
    loop {
        if *epochs.borrow_and_update() != epoch {
            return;
        }
        if epochs.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
