use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use devboards_client::HttpBackend;
use devboards_comments::CommentStore;
use devboards_core::{Catalog, CommentId, JobId, JobQuery};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::AppConfig;

/// Browse the DevBoards job feed and its comment threads.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scroll through the job feed.
    Jobs {
        /// Number of times to scroll to the end of the list.
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        remote: bool,
    },
    /// Show the comments on a job.
    Comments { job: String },
    /// Post a comment on a job.
    Comment {
        job: String,
        text: String,
        /// Display name; anonymous when omitted.
        #[arg(long)]
        author: Option<String>,
    },
    /// Change the text of a comment on a job.
    Edit { job: String, id: String, text: String },
    /// Delete a comment from a job.
    Delete { job: String, id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devboards=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    let config = AppConfig::from_env()?;
    tracing::info!(api_url = %config.api_url, page_size = config.page_size, "Loaded client configuration");

    let catalog = load_catalog(&config)?;

    // --- Backend ---
    let backend = Arc::new(HttpBackend::new(config.client_config())?);

    let store = CommentStore::new(backend.clone());

    let result = match cli.command {
        Command::Jobs {
            pages,
            search,
            location,
            remote,
        } => {
            let query = JobQuery {
                search,
                location,
                remote_only: remote,
            };
            commands::scroll_jobs(backend, &catalog, &config, query, pages).await
        }
        Command::Comments { job } => {
            commands::show_comments(&store, &catalog, JobId::from(job)).await
        }
        Command::Comment { job, text, author } => {
            commands::post_comment(&store, &catalog, JobId::from(job), author, &text).await
        }
        Command::Edit { job, id, text } => {
            commands::edit_comment(&store, &catalog, JobId::from(job), CommentId::from(id), &text)
                .await
        }
        Command::Delete { job, id } => {
            commands::delete_comment(&store, &catalog, JobId::from(job), CommentId::from(id))
                .await
        }
    };

    store.shutdown().await;
    result
}

/// Built-in English messages, overlaid with the configured locale file.
fn load_catalog(config: &AppConfig) -> anyhow::Result<Catalog> {
    let english = Catalog::english();
    let Some(path) = &config.locale_file else {
        return Ok(english);
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read locale file {}", path.display()))?;
    let overrides = Catalog::from_json(&raw)
        .with_context(|| format!("Invalid locale file {}", path.display()))?;
    tracing::info!(path = %path.display(), messages = overrides.len(), "Loaded locale overrides");
    Ok(english.merged(overrides))
}
