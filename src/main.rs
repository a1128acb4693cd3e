mod adapters;
mod config;
mod core;
mod pipeline;
mod platforms;
mod registry;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::adapters::JiraClient;
use crate::config::Config;
use crate::core::TriggerDetector;
use crate::pipeline::Pipeline;
use crate::platforms::WebhookEvent;
use crate::registry::{PlatformRegistry, ProviderRegistry};

#[derive(Parser)]
#[command(name = "mention-review")]
#[command(about = "Reviews pull requests when a comment mentions @claude or @codex", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Path to a YAML config file")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one comment webhook event
    Run {
        #[arg(long, help = "Event payload (defaults to $GITHUB_EVENT_PATH)")]
        event: Option<PathBuf>,

        #[arg(long, help = "Directory context files are read from")]
        work_dir: Option<PathBuf>,
    },
    /// Print a diff with [L<n>] line annotations
    Annotate {
        #[arg(long, help = "Path to diff file (reads from stdin if not provided)")]
        diff: Option<PathBuf>,

        #[arg(long)]
        max_chars: Option<usize>,
    },
    /// Print the trigger detected in a comment body as JSON
    Trigger { text: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = dispatch(cli).await {
        error!("Action failed: {:#}", err);
        eprintln!("::error::Action failed: {:#}", err);
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { event, work_dir } => run_command(config, event, work_dir).await,
        Commands::Annotate { diff, max_chars } => {
            annotate_command(diff, max_chars.unwrap_or(config.max_diff_chars)).await
        }
        Commands::Trigger { text } => trigger_command(&text),
    }
}

async fn run_command(
    config: Config,
    event_path: Option<PathBuf>,
    work_dir: Option<PathBuf>,
) -> Result<()> {
    let env: HashMap<String, String> = std::env::vars().collect();

    let event_path = event_path
        .or_else(|| env.get("GITHUB_EVENT_PATH").map(PathBuf::from))
        .context("No event file given and GITHUB_EVENT_PATH is not set")?;
    let payload = tokio::fs::read_to_string(&event_path)
        .await
        .with_context(|| format!("Failed to read event file {}", event_path.display()))?;
    let event: WebhookEvent = serde_json::from_str(&payload)
        .with_context(|| format!("Failed to parse event file {}", event_path.display()))?;

    let work_dir = work_dir
        .or_else(|| env.get("GITHUB_WORKSPACE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let platforms = PlatformRegistry::with_builtins();
    let token = config.platform_token.clone().unwrap_or_default();
    let platform = platforms.create(&config.platform, &config.platform_url, &token)?;
    info!("Using {} at {}", platform.platform_name(), config.platform_url);

    let jira = config.jira();
    let mut pipeline = Pipeline::new(config, platform, ProviderRegistry::with_builtins(), work_dir);
    if let Some(settings) = jira {
        pipeline = pipeline.with_ticket_source(Box::new(JiraClient::new(&settings)?));
    }

    let outcome = pipeline.handle_event(&event, &env).await?;
    info!("Finished: {:?}", outcome);
    Ok(())
}

async fn annotate_command(diff_path: Option<PathBuf>, max_chars: usize) -> Result<()> {
    let diff = if let Some(path) = diff_path {
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read diff {}", path.display()))?
    } else if std::io::stdin().is_terminal() {
        anyhow::bail!("No diff provided: pass --diff or pipe one on stdin");
    } else {
        use std::io::Read;
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let annotated = crate::core::annotate_diff(&diff);
    println!("{}", crate::core::truncate_diff(&annotated, max_chars));
    Ok(())
}

fn trigger_command(text: &str) -> Result<()> {
    let detector = TriggerDetector::new(ProviderRegistry::with_builtins().names());
    let trigger = detector.detect(text);
    println!("{}", serde_json::to_string(&trigger)?);
    Ok(())
}
