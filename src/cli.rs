use std::error::Error;
use std::io::Read;
use std::time::Duration;

use atty::Stream;
use clap::{Parser, Subcommand};
use lingolens::client::{DEFAULT_BASE_URL, DEFAULT_LENGTH};
use lingolens::session::{explanation_fragment, translation_fragment};
use lingolens::{
    DetailRequest, Difficulty, GenerateRequest, MetaCommentaryFilter, TranslationFormatter,
    TutorClient, TutorConfig,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lingolens", about = "Generate reading passages and explain selections", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Base URL of the tutoring backend.
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Request timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a reading passage for a topic.
    Generate {
        /// Topic to write about.
        #[arg(long)]
        topic: String,
        /// Reading difficulty: easy, medium, or hard.
        #[arg(long, default_value = "medium")]
        difficulty: String,
        /// Requested passage length, in the backend's own terms.
        #[arg(long, default_value = DEFAULT_LENGTH)]
        length: String,
    },
    /// Explain and translate a snippet of generated text.
    Explain {
        /// Snippet to explain.
        text: String,
        /// Target language for the translation.
        #[arg(long)]
        language: String,
        /// Surrounding passage the snippet was taken from.
        #[arg(long, default_value = "")]
        context: String,
        /// Print the HTML fragments instead of terminal text.
        #[arg(long)]
        html: bool,
    },
    /// Clean up a raw translation response and print the HTML fragment.
    Format {
        /// Raw translation text; read from stdin when omitted.
        text: Option<String>,
        /// Label the fragment with this target language.
        #[arg(long)]
        language: Option<String>,
        /// Additional meta-commentary patterns to discard.
        #[arg(long = "ignore-pattern", value_name = "REGEX")]
        ignore_patterns: Vec<String>,
    },
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = TutorConfig {
        base_url: cli.base_url.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
    };

    match cli.command {
        Command::Generate {
            topic,
            difficulty,
            length,
        } => handle_generate(config, topic, difficulty, length, cli.json).await,
        Command::Explain {
            text,
            language,
            context,
            html,
        } => handle_explain(config, text, language, context, html, cli.json).await,
        Command::Format {
            text,
            language,
            ignore_patterns,
        } => handle_format(text, language, ignore_patterns, cli.json),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("LINGOLENS_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn handle_generate(
    config: TutorConfig,
    topic: String,
    difficulty: String,
    length: String,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    if topic.trim().is_empty() {
        return Err("Topic cannot be empty".into());
    }
    let difficulty = Difficulty::from_str(&difficulty)
        .ok_or_else(|| format!("Unknown difficulty {difficulty:?} (use easy, medium, or hard)"))?;

    let client = TutorClient::new(config)?;
    let request = GenerateRequest {
        topic,
        difficulty,
        length,
    };
    let generated = client.generate_text(&request).await?;

    if as_json {
        let payload = json!({
            "topic": request.topic,
            "difficulty": request.difficulty,
            "length": request.length,
            "text": generated.text,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", generated.text);
    }
    Ok(())
}

async fn handle_explain(
    config: TutorConfig,
    text: String,
    language: String,
    context: String,
    as_html: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    if text.trim().is_empty() {
        return Err("Nothing to explain: the snippet is empty".into());
    }

    let client = TutorClient::new(config)?;
    let request = DetailRequest {
        text,
        language,
        context,
    };
    let details = client.explain_translate(&request).await?;
    let formatter = TranslationFormatter::default();

    if as_json {
        let payload = json!({
            "text": request.text,
            "language": request.language,
            "explanation": details.explanation,
            "translation": details.translation,
            "translation_html": formatter.format(&details.translation),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if as_html {
        println!("{}", explanation_fragment(&details.explanation));
        println!(
            "{}",
            translation_fragment(&request.language, &details.translation, &formatter)
        );
    } else {
        render_markdown_block("Explanation", &details.explanation);
        print_translation_block(
            &request.language,
            &formatter.clean_lines(&details.translation),
            &details.translation,
        );
    }
    Ok(())
}

fn handle_format(
    text: Option<String>,
    language: Option<String>,
    ignore_patterns: Vec<String>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let raw = match text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let mut filter = MetaCommentaryFilter::default();
    for pattern in &ignore_patterns {
        filter.extend(pattern)?;
    }
    let formatter = TranslationFormatter::new(filter);

    let fragment = match &language {
        Some(language) => translation_fragment(language, &raw, &formatter),
        None => formatter.format(&raw),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({ "html": fragment }))?);
    } else {
        println!("{fragment}");
    }
    Ok(())
}

fn print_translation_block(language: &str, lines: &[String], raw: &str) {
    println!("\nTranslation (to {language}):");
    if lines.is_empty() {
        let fallback = raw.trim();
        if fallback.is_empty() {
            println!("<no translation available>");
        } else {
            println!("{fallback}");
        }
        return;
    }
    for line in lines {
        println!("- {line}");
    }
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn markdown_skin() -> MadSkin {
    MadSkin::default()
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = markdown_skin();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
