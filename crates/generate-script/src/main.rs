use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use scribe::{
    get_default_data_dir, load_session, save_script, save_session, Config, GeminiClient,
    InputMode, NewsClient, Orchestrator, PageFetcher, ProofreadState, ScribeError, ScriptKind,
    ScriptLength, ScriptTone, ScriptType, SessionProvider, SourceInput, StyleSelection,
    SubmitOutcome, SupabaseAuth, DISCLAIMER,
};
use std::io::{self as stdio, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "generate-script")]
#[command(about = "Write a Burmese news script from a file, a URL, or keywords")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Input mode (file, url, keywords, translate-develop)
    #[arg(short, long)]
    mode: Option<InputMode>,

    /// File path, URL, or keywords, depending on the mode
    #[arg(short, long)]
    input: Option<String>,

    /// Script length (short, standard, detailed, feature, analytical)
    #[arg(short, long, default_value = "standard")]
    length: ScriptLength,

    /// Script tone (formal, conversational, simplified)
    #[arg(short, long, default_value = "formal")]
    tone: ScriptTone,

    /// Output type (web-post, news-script, social-media)
    #[arg(long = "type", default_value = "web-post")]
    output_type: ScriptType,

    /// Run a proofreading pass over the generated script
    #[arg(long)]
    proofread: bool,

    /// Save the script (and proofread version) to the data directory
    #[arg(long)]
    save: bool,

    /// Directory to save scripts into instead of the data directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Refuse to generate without a signed-in session
    #[arg(long)]
    require_login: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password and remember the session
    Login {
        #[arg(short, long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    stdio::stdout().flush()?;

    let mut input = String::new();
    stdio::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_mode_selection() -> Result<InputMode> {
    println!("Which input?");
    println!("  1) File (txt, pdf, docx)");
    println!("  2) Burmese article URL");
    println!("  3) Keywords");
    println!("  4) English article URL (translate and develop)");

    match read_line("\nEnter your choice (1-4): ")?.as_str() {
        "1" => Ok(InputMode::File),
        "2" => Ok(InputMode::Url),
        "3" => Ok(InputMode::Keywords),
        "4" => Ok(InputMode::TranslateAndDevelop),
        _ => anyhow::bail!("Invalid selection. Please choose 1, 2, 3, or 4."),
    }
}

fn source_input(mode: InputMode, input: Option<String>) -> Result<SourceInput> {
    let input = match input {
        Some(input) => input,
        None => {
            let label = match mode {
                InputMode::File => "File path",
                InputMode::Url | InputMode::TranslateAndDevelop => "URL",
                InputMode::Keywords => "Keywords",
            };
            read_line(&format!("{}: ", label))?
        }
    };

    Ok(match mode {
        InputMode::File if input.trim().is_empty() => SourceInput::File {
            bytes: Vec::new(),
            mime: None,
            file_name: None,
        },
        InputMode::File => SourceInput::from_path(&PathBuf::from(input.trim()))
            .map_err(|e| anyhow::anyhow!("{}\n{}", e.user_message(), e))?,
        InputMode::Url => SourceInput::Url(input),
        InputMode::Keywords => SourceInput::Keywords(input),
        InputMode::TranslateAndDevelop => SourceInput::EnglishUrl(input),
    })
}

fn auth_client(config: &Config) -> Result<Option<Arc<SupabaseAuth>>> {
    let Some((url, anon_key)) = config.supabase() else {
        return Ok(None);
    };
    let auth = SupabaseAuth::new(url, anon_key)?;

    let data_dir = get_default_data_dir()?;
    match load_session(&data_dir) {
        Ok(Some(session)) => auth.restore(session),
        Ok(None) => {}
        Err(e) => log::warn!("Ignoring stored session: {:#}", e),
    }

    Ok(Some(Arc::new(auth)))
}

async fn login(config: &Config, email: &str, password: Option<String>) -> Result<()> {
    let auth = auth_client(config)?.context(
        "SUPABASE_URL and SUPABASE_ANON_KEY must both be set to sign in",
    )?;
    let password = match password {
        Some(password) => password,
        None => read_line("Password: ")?,
    };

    println!("🔑 Signing in as {}...", email);
    let session = auth
        .sign_in_with_password(email, &password)
        .await
        .map_err(|e| anyhow::anyhow!("{}\n{}", e.user_message(), e))?;

    let path = save_session(&session, &get_default_data_dir()?)
        .context("Failed to store session")?;
    println!("✅ Signed in. Session saved to: {}", path.display());
    Ok(())
}

async fn logout(config: &Config) -> Result<()> {
    if let Some(auth) = auth_client(config)? {
        if let Err(e) = auth.sign_out().await {
            println!("⚠ Remote sign-out failed: {}", e);
        }
    }
    scribe::io::clear_session(&get_default_data_dir()?)?;
    println!("✅ Signed out");
    Ok(())
}

fn fail(err: &ScribeError) -> anyhow::Error {
    anyhow::anyhow!("{}\n({})", err.user_message(), err)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = Config::from_env()?;

    match args.command {
        Some(Command::Login { email, password }) => return login(&config, &email, password).await,
        Some(Command::Logout) => return logout(&config).await,
        None => {}
    }

    let mode = match args.mode {
        Some(mode) => mode,
        None => prompt_mode_selection()?,
    };
    let style = StyleSelection::new(mode, args.length, args.tone, args.output_type);
    println!("\n✓ Selected: {}", style);

    let source = source_input(mode, args.input)?;

    let generator = GeminiClient::with_endpoint(
        config.gemini_api_key.clone(),
        config.gemini_api_base.as_str(),
        config.gemini_model.as_str(),
    )?;
    let pages = PageFetcher::new(config.fetch_proxy_url.clone())?;

    let mut builder = Orchestrator::builder(Arc::new(generator), Arc::new(pages)).style(style);

    match config.require_news_api_key() {
        Ok(key) => {
            let news = NewsClient::with_base_url(key.to_string(), config.news_api_base.as_str())?;
            builder = builder.news(Arc::new(news));
        }
        Err(e) if mode == InputMode::File => println!("⚠ {}\n", e),
        Err(_) => {}
    }

    if let Some(auth) = auth_client(&config)? {
        let provider: Arc<dyn SessionProvider> = auth;
        builder = builder.session(provider, args.require_login);
    } else if args.require_login {
        anyhow::bail!("--require-login needs SUPABASE_URL and SUPABASE_ANON_KEY");
    }

    if !config.has_valid_api_key() {
        builder = builder.blocked_by(ScribeError::MissingApiKey);
    }

    let orchestrator = builder.build();

    println!("\n🤖 Writing script with Gemini...");
    println!("  (This may take a minute...)");
    match orchestrator.submit(source).await {
        SubmitOutcome::Blocked => return Err(fail(&ScribeError::MissingApiKey)),
        SubmitOutcome::Cancelled | SubmitOutcome::Ignored => {
            anyhow::bail!("Request did not run")
        }
        SubmitOutcome::Completed => {}
    }

    let snapshot = orchestrator.snapshot();
    if let Some(err) = &snapshot.error {
        return Err(fail(err));
    }
    let result = snapshot
        .result
        .context("Generation finished without a script")?;

    if let Some(translation) = &result.intermediate_translation {
        println!("\n🔤 Keywords translated as: {}", translation);
    }

    println!("\n📝 Script\n");
    println!("{}", result.script);
    println!("\n---\n{}", DISCLAIMER);

    if !result.sources.is_empty() {
        println!("\n🔗 Sources:");
        for source in &result.sources {
            println!("  • {}", source.title);
            if !source.url.is_empty() && source.url != source.title {
                println!("    URL: {}", source.url);
            }
        }
    }

    let mut edited = None;
    if args.proofread {
        println!("\n✏️  Proofreading...");
        orchestrator.proofread().await;
        match orchestrator.snapshot().proofread {
            ProofreadState::Done(text) => {
                println!("\n📝 Proofread script\n");
                println!("{}", text);
                edited = Some(text);
            }
            ProofreadState::Failed(err) => println!("\n⚠ {}", err.proofreading_message()),
            ProofreadState::Idle | ProofreadState::Running => {}
        }
    }

    if args.save {
        let dir = match args.output_dir {
            Some(dir) => dir,
            None => get_default_data_dir()?,
        };
        let today = Local::now().date_naive();

        let path = save_script(&result.script, ScriptKind::Generated, &dir, today)
            .context("Failed to save script")?;
        println!("\n✅ Script saved to: {}", path.display());

        if let Some(text) = edited {
            let path = save_script(&text, ScriptKind::Edited, &dir, today)
                .context("Failed to save proofread script")?;
            println!("✅ Proofread script saved to: {}", path.display());
        }
    }

    Ok(())
}
