use anyhow::{Context, Result};
use clap::Parser;
use scribe::optimizer::{SeoTitleSuggestion, TopicSuggestion};
use scribe::{analyze_content, Config, ContentAnalysis, GeminiClient, ScribeError};
use std::fs;
use std::io::{self, Read as _};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "optimize-content")]
#[command(about = "Analyze a news article and suggest SEO titles and follow-up topics")]
struct Args {
    /// Article file to analyze (reads stdin if not provided)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print the analysis as JSON
    #[arg(long)]
    json: bool,
}

fn read_content(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => {
            eprintln!("📖 Reading article: {}", path.display());
            fs::read_to_string(&path)
                .with_context(|| format!("Failed to read article file: {}", path.display()))
        }
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read article from stdin")?;
            Ok(content)
        }
    }
}

/// The whole of stdout under `--json`; progress lines go to stderr.
fn render_json(analysis: &ContentAnalysis) -> Result<String> {
    serde_json::to_string_pretty(analysis).context("Failed to serialize analysis")
}

fn print_titles(heading: &str, items: &[SeoTitleSuggestion]) {
    println!("\n{}", heading);
    if items.is_empty() {
        println!("  No suggestions available.");
    }
    for item in items {
        println!("  • {}", item.title);
    }
}

fn print_topics(heading: &str, items: &[TopicSuggestion]) {
    println!("\n{}", heading);
    if items.is_empty() {
        println!("  No suggestions available.");
    }
    for item in items {
        println!("  • {}", item.question);
    }
}

fn print_analysis(analysis: &ContentAnalysis) {
    println!("\n📊 Analysis");
    println!("  Word count: {}", analysis.word_count);
    println!("  Sentiment:  {:?}", analysis.sentiment);
    if !analysis.keywords.is_empty() {
        println!("  Keywords:   {}", analysis.keywords.join(", "));
    }

    print_titles("🔎 SEO Title Suggestions", &analysis.seo_title_suggestions);
    print_topics("❓ Follow-up Topic Suggestions", &analysis.followup_topic_suggestions);
    print_topics("🧭 Related Topic Suggestions", &analysis.related_topic_suggestions);
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = Config::from_env()?;

    if !config.has_valid_api_key() {
        anyhow::bail!(ScribeError::MissingApiKey.user_message());
    }

    let content = read_content(args.file)?;

    eprintln!("🤖 Analyzing content with Gemini...");
    let generator = GeminiClient::with_endpoint(
        config.gemini_api_key.clone(),
        config.gemini_api_base.as_str(),
        config.gemini_model.as_str(),
    )?;

    let analysis = analyze_content(&generator, &content)
        .await
        .map_err(|e| anyhow::anyhow!("{}\n({})", e.user_message(), e))?;

    if args.json {
        println!("{}", render_json(&analysis)?);
    } else {
        print_analysis(&analysis);
    }

    Ok(())
}
