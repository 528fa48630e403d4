use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use github_client::GitHubClient;
use newsapi_client::NewsApiClient;
use newsdigest_common::config::DEFAULT_QUERY_CACHE_PATH;
use newsdigest_common::file_config::load_config;
use newsdigest_common::{Config, FileConfig};
use newsdigest_pipeline::orchestrator::{Orchestrator, RunSettings};
use newsdigest_pipeline::publisher::{DryRunTracker, PublishOptions, PublishTarget, Publisher};
use newsdigest_pipeline::query_cache::{JsonFileStore, QueryCache};
use newsdigest_pipeline::search::ArticleSearch;
use newsdigest_pipeline::strategist::QueryStrategist;
use newsdigest_pipeline::synthesizer::Synthesizer;
use newsdigest_pipeline::traits::IssueTracker;

#[derive(Parser)]
#[command(name = "newsdigest", about = "Daily news digests published as GitHub issues")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and publish digests (default)
    Run(RunArgs),
    /// Inspect the query cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Path to run config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Topic to process; repeat for several. Replaces the configured topics.
    #[arg(long = "topic")]
    topics: Vec<String>,

    #[arg(long)]
    days_back: Option<u32>,

    #[arg(long)]
    max_headlines: Option<usize>,

    /// Log what would be posted instead of calling GitHub
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// List cached query sets, newest first
    List {
        /// Cache file (defaults to QUERY_CACHE_PATH or query_cache.json)
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("newsdigest=info"))?;
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json)?;

    match cli.command {
        None => run(RunArgs::default()).await,
        Some(Command::Run(args)) => run(args).await,
        Some(Command::Cache {
            command: CacheCommand::List { cache },
        }) => list_cache(cache),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    info!("newsdigest starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    let mut file_config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading run config");
            load_config(path)?
        }
        None => FileConfig::default(),
    };
    if !args.topics.is_empty() {
        file_config.topics = args.topics.clone();
    }
    if let Some(days_back) = args.days_back {
        file_config.days_back = days_back;
    }
    if let Some(max_headlines) = args.max_headlines {
        file_config.max_headlines = max_headlines;
    }

    let llm = Arc::new(Claude::new(&config.anthropic_api_key, &config.anthropic_model));
    let news = Arc::new(NewsApiClient::new(&config.newsapi_key));

    let tracker: Arc<dyn IssueTracker> = match config.github() {
        Some((token, repo)) if !args.dry_run => {
            info!(repo, "Publishing to GitHub");
            Arc::new(GitHubClient::new(token, repo)?)
        }
        Some(_) => {
            info!("Dry run requested, nothing will be posted");
            Arc::new(DryRunTracker::new())
        }
        None => {
            warn!("GITHUB_TOKEN/GITHUB_REPO not set, running as dry run");
            Arc::new(DryRunTracker::new())
        }
    };

    let cache = QueryCache::load(Box::new(JsonFileStore::new(&config.query_cache_path)));
    let strategist = QueryStrategist::new(llm.clone(), cache)
        .with_fallback_policy(file_config.fallback_cache.into());
    let search = ArticleSearch::new(news)
        .with_delay(Duration::from_millis(file_config.search_delay_ms));
    let synthesizer = Synthesizer::new(llm);
    let publisher = Publisher::new(
        tracker,
        PublishOptions {
            labels: file_config.labels.clone(),
            assignees: file_config.assignees.clone(),
            mention_users: file_config.mention_users.clone(),
            target: match file_config.comment_on_issue {
                Some(issue_number) => PublishTarget::Comment { issue_number },
                None => PublishTarget::NewIssue,
            },
        },
    );

    let mut orchestrator = Orchestrator::new(
        RunSettings::from(&file_config),
        strategist,
        search,
        synthesizer,
        publisher,
    );
    orchestrator.run(&file_config.topics).await;

    Ok(())
}

fn list_cache(path: Option<PathBuf>) -> Result<()> {
    dotenvy::dotenv().ok();
    let path = path
        .or_else(|| std::env::var_os("QUERY_CACHE_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_QUERY_CACHE_PATH));

    let cache = QueryCache::load(Box::new(JsonFileStore::new(&path)));
    println!("{} entries in {}", cache.len(), path.display());
    for entry in cache.entries() {
        println!(
            "{}  {:<40}  n={}  {}{}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.original_topic,
            entry.requested_count,
            entry.queries.join(" | "),
            if entry.is_fallback { "  (fallback)" } else { "" },
        );
    }
    Ok(())
}
