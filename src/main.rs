use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use storefront_navigator::agent_engine::NavigationController;
use storefront_navigator::assistant::Assistant;
use storefront_navigator::config::{self, AppConfig};
use storefront_navigator::dispatch::{MemoryRouter, MemoryStore, TranscriptSpeaker};
use storefront_navigator::errors::{NavigatorError, NavigatorResult};
use storefront_navigator::perception::{BrowserPage, MemoryPage, Page};
use storefront_navigator::planner::{Feedback, HttpPlanner};

#[derive(Parser, Debug)]
#[command(
    name = "storefront-navigator",
    version,
    about = "Natural-language command layer for a shopping site"
)]
struct Cli {
    /// Read this config file instead of searching the usual locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify an utterance and print the parsed command as JSON.
    Parse { utterance: Vec<String> },

    /// Run an utterance through the local assistant against an in-memory store.
    Say { utterance: Vec<String> },

    /// Drive a page with the remote planner until it reports DONE.
    Navigate {
        query: Vec<String>,

        /// JSON fixture describing the page's element tree, instead of Chrome.
        #[arg(long, conflicts_with = "url")]
        page: Option<PathBuf>,

        /// Open this URL in Chrome first. Without it the current tab is used.
        #[arg(long)]
        url: Option<String>,

        /// Skip the legibility delays between steps.
        #[arg(long)]
        fast: bool,

        /// Report the outcome back to the planner service.
        #[arg(long)]
        feedback: bool,
    },

    /// Query the planner service's health endpoint.
    Health,

    /// Print the planner service's cache and learning counters.
    Stats,

    /// Write a config file populated with the defaults.
    InitConfig {
        #[arg(default_value = "config.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    storefront_navigator::init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> NavigatorResult<()> {
    match cli.command {
        Commands::Parse { utterance } => {
            let assistant = local_assistant()?;
            let parsed = assistant.parse(&utterance.join(" "));
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Commands::Say { utterance } => {
            let assistant = local_assistant()?;
            println!("{}", assistant.handle_utterance(&utterance.join(" ")));
        }
        Commands::Navigate {
            query,
            page,
            url,
            fast,
            feedback,
        } => {
            let mut config = load(cli.config.as_deref())?;
            if fast {
                config.agent = config.agent.without_delays();
            }
            let page: Arc<dyn Page> = match page {
                Some(path) => Arc::new(MemoryPage::load_fixture(&path)?),
                None => Arc::new(BrowserPage::open(&config.browser, url.as_deref()).await?),
            };
            navigate(&config, &query.join(" "), page, feedback).await?;
        }
        Commands::Health => {
            let config = load(cli.config.as_deref())?;
            let health = HttpPlanner::new(&config.planner).health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Stats => {
            let config = load(cli.config.as_deref())?;
            let stats = HttpPlanner::new(&config.planner).stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(NavigatorError::Config(format!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                )));
            }
            config::save_config(&AppConfig::default(), &path)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn load(path: Option<&Path>) -> NavigatorResult<AppConfig> {
    match path {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
}

fn local_assistant() -> NavigatorResult<Assistant> {
    Assistant::new(
        Arc::new(MemoryStore::default()),
        Arc::new(MemoryRouter::default()),
        Arc::new(TranscriptSpeaker::default()),
    )
}

async fn navigate(config: &AppConfig, query: &str, page: Arc<dyn Page>, feedback: bool) -> NavigatorResult<()> {
    let planner = Arc::new(HttpPlanner::new(&config.planner));
    let nav = NavigationController::new(page.clone(), planner.clone(), config)?;

    let result = nav.execute_command(query).await;
    match &result {
        Ok(summary) => println!("{summary}"),
        Err(e) => println!("{}", e.user_message(nav.messages())),
    }
    for entry in nav.history() {
        println!("{}", serde_json::to_string(&entry.action)?);
    }
    let location = page.location();
    if !location.is_empty() {
        tracing::info!(location = %location, "final location");
    }

    if feedback {
        let report = Feedback {
            query: query.to_string(),
            success: result.is_ok(),
            actions: nav.history().into_iter().map(|e| e.action).collect(),
            dom_snapshot: nav.scanner().scan(),
        };
        match planner.submit_feedback(&report).await {
            Ok(receipt) => tracing::info!(status = %receipt.status, "feedback recorded"),
            Err(e) => tracing::warn!(error = %e, "feedback not recorded"),
        }
    }
    result.map(|_| ())
}
