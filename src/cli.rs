//! CLI parsing and orchestration. Parses args, looks up every URL concurrently, prints text
//! or JSON in input order. Maps errors to exit codes.

use crate::client::{ClientError, FicHubClient, TransportError};
use crate::config;
use crate::model::{Story, StoryDownloadBundle, StoryStats};
use crate::shape::DescriptionFormat;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("Failed to write JSON: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Client(ClientError::InvalidConcurrency { .. })
            | CliRunError::Client(ClientError::Build { .. }) => 1,
            CliRunError::Client(ClientError::Transport(_))
            | CliRunError::Client(ClientError::LimiterClosed) => 2,
            CliRunError::Client(ClientError::Metadata { .. })
            | CliRunError::Client(ClientError::Download { .. })
            | CliRunError::Output(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "fichub")]
#[command(about = "Look up fan-fiction metadata and download links through FicHub")]
#[command(
    after_help = "Config file keys (user_agent, timeout_secs, concurrency, base_url, description) are read from ./fichub.toml or ~/.config/fichub/config.toml. CLI flags override config."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Print results as JSON instead of a text listing.
    #[arg(long, global = true)]
    pub json: bool,

    /// Simultaneous requests, 1 to 3 (overrides config; default 2).
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// HTTP User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Keep story descriptions as FicHub's HTML instead of converting to Markdown.
    #[arg(long, global = true)]
    pub raw_description: bool,

    /// More log output per occurrence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Less log output per occurrence.
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "verbose")]
    pub quiet: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch story metadata.
    Meta {
        /// Story URLs (AO3, FFN, SpaceBattles, ...).
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Fetch download links (epub, html, mobi, pdf) and metadata when available.
    Download {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

impl Args {
    /// Log level from -v/-q counts, starting at WARN.
    pub fn log_level_filter(&self) -> LevelFilter {
        match 1 + self.verbose as i16 - self.quiet as i16 {
            i16::MIN..=-1 => LevelFilter::OFF,
            0 => LevelFilter::ERROR,
            1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// Install the fmt subscriber on stderr. `RUST_LOG` directives are honoured on top of the
/// -v/-q level.
pub fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_client(args: &Args) -> Result<FicHubClient, CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let config = config.unwrap_or_default();

    let mut builder = FicHubClient::builder();
    if let Some(limit) = args.concurrency.or(config.concurrency) {
        builder = builder.concurrency(limit);
    }
    if let Some(secs) = args.timeout.or(config.timeout_secs) {
        builder = builder.timeout_secs(secs);
    }
    if let Some(ua) = args.user_agent.clone().or(config.user_agent) {
        builder = builder.user_agent(ua);
    }
    if let Some(base) = config.base_url {
        builder = builder.base_url(base);
    }
    let description = if args.raw_description {
        DescriptionFormat::Raw
    } else {
        config.description.unwrap_or(DescriptionFormat::Markdown)
    };
    Ok(builder.description(description).build()?)
}

const SEPARATOR: &str = "\n-------------------------------\n";

fn row(name: &str, value: impl std::fmt::Display) -> String {
    format!("{:>15}  |  {}", name, value)
}

/// Aligned `name | value` listing of a story.
fn render_story(story: &Story) -> Vec<String> {
    let author = story.author();
    let mut lines = vec![
        row("title", story.title()),
        row("author", format!("{} ({})", author.name, author.profile_url)),
        row("url", story.url()),
        row("site", story.site()),
        row("status", story.status()),
        row("chapters", story.chapters()),
        row("words", story.words()),
        row("created", story.created().to_rfc3339()),
        row("updated", story.updated().to_rfc3339()),
        row("language", story.language()),
        row("rating", story.rating()),
        row("fandoms", story.fandoms().join(", ")),
        row("characters", story.characters().join(", ")),
        row("crossover", story.is_crossover()),
    ];
    if let Some(genres) = story.genres() {
        lines.push(row("genres", genres));
    }
    match story.stats() {
        StoryStats::Ao3(s) => lines.push(row(
            "stats",
            format!(
                "kudos {}, hits {}, bookmarks {}, comments {}",
                s.kudos, s.hits, s.bookmarks, s.comments
            ),
        )),
        StoryStats::Ffn(s) => lines.push(row(
            "stats",
            format!(
                "favorites {}, follows {}, reviews {}",
                s.favorites, s.follows, s.reviews
            ),
        )),
        StoryStats::Empty => {}
    }
    if let Some(tags) = story.tags() {
        for (name, values) in [
            ("warnings", &tags.warning),
            ("categories", &tags.category),
            ("relationships", &tags.relationship),
            ("freeform", &tags.freeform),
        ] {
            if !values.is_empty() {
                lines.push(row(name, values.join(", ")));
            }
        }
    }
    lines.push(row("description", story.description().replace('\n', " ")));
    lines
}

fn render_bundle(bundle: &StoryDownloadBundle) -> Vec<String> {
    let mut lines = vec![
        row("epub", &bundle.links.epub),
        row("html", &bundle.links.html),
        row("mobi", &bundle.links.mobi),
        row("pdf", &bundle.links.pdf),
    ];
    match &bundle.metadata {
        Some(story) => lines.extend(render_story(story)),
        None => lines.push(row("metadata", "unavailable")),
    }
    lines
}

fn render<T: Serialize>(
    value: &T,
    json: bool,
    text: impl Fn(&T) -> Vec<String>,
) -> Result<String, CliRunError> {
    if json {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(text(value).join("\n"))
    }
}

/// Print each result in input order; failures go to stderr. Returns the first failure.
fn report<T: Serialize>(
    urls: &[String],
    results: Vec<Result<T, ClientError>>,
    json: bool,
    text: impl Fn(&T) -> Vec<String>,
) -> Result<(), CliRunError> {
    let mut first_err: Option<CliRunError> = None;
    let mut blocks = Vec::with_capacity(results.len());
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(value) => blocks.push(render(&value, json, &text)?),
            Err(e) => {
                eprintln!("{}: {}", url, e);
                if first_err.is_none() {
                    first_err = Some(CliRunError::Client(e));
                }
            }
        }
    }
    if !blocks.is_empty() {
        let sep = if json { "\n" } else { SEPARATOR };
        println!("{}", blocks.join(sep));
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub async fn run(args: &Args) -> Result<(), CliRunError> {
    let client = build_client(args)?;
    tracing::info!(concurrency = client.concurrency(), "client ready");

    match &args.command {
        Command::Meta { urls } => {
            let lookups = urls.iter().map(|url| client.get_story_metadata(url));
            let results = futures::future::join_all(lookups).await;
            report(urls, results, args.json, render_story)
        }
        Command::Download { urls } => {
            let lookups = urls.iter().map(|url| client.get_download_urls(url));
            let results = futures::future::join_all(lookups).await;
            report(urls, results, args.json, render_bundle)
        }
    }
}

/// Transport failures worth a hint on stderr.
pub fn hint(err: &CliRunError) -> Option<&'static str> {
    match err {
        CliRunError::Client(ClientError::Transport(TransportError::HttpStatus {
            status: 429,
            ..
        })) => Some("FicHub is rate limiting requests; try a lower --concurrency."),
        CliRunError::Client(ClientError::InvalidConcurrency { .. }) => {
            Some("Use --concurrency 1, 2, or 3.")
        }
        _ => None,
    }
}
