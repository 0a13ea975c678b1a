use anyhow::Context;
use clap::{Parser, Subcommand};
use content_curator::{load_config, CacheService, ContentQuery, ContentService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "curator", about = "Operator CLI for the content curation core")]
struct Cli {
    /// Path to the deployment config JSON
    #[arg(short, long)]
    config: PathBuf,

    /// Redis connection URL; falls back to REDIS_URL, then in-process caching
    #[arg(long)]
    redis_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a page of curated content
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Narrow to one category name
        #[arg(long)]
        category: Option<String>,
        /// Full-text search over titles, descriptions, channels, and tags
        #[arg(long)]
        q: Option<String>,
    },
    /// Look up one item by its provider ID
    Get { id: String },
    /// Aggregation and filter statistics
    Stats,
    /// Invalidate caches and eagerly re-aggregate
    Refresh,
    /// Check provider API reachability
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let deployment_id = config.deployment.id.clone();

    let redis_url = cli.redis_url.or_else(|| std::env::var("REDIS_URL").ok());
    let cache = Arc::new(CacheService::new(redis_url.as_deref()));
    let service =
        ContentService::new(Arc::new(config), cache).context("Failed to build content service")?;

    info!(deployment_id = %deployment_id, "Content curator ready");

    match cli.command {
        Command::List {
            page,
            limit,
            category,
            q,
        } => {
            let query = ContentQuery {
                page,
                limit,
                category,
                q,
            };
            let content = service.get_content(&query).await?;
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
        Command::Get { id } => match service.get_item_by_id(&id).await? {
            Some(item) => println!("{}", serde_json::to_string_pretty(&item)?),
            None => anyhow::bail!("Item not found: {id}"),
        },
        Command::Stats => {
            let stats = service.get_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Refresh => {
            service.refresh_content().await?;
            println!("Cache refreshed");
        }
        Command::Health => {
            let health = service.health_check().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
            if health.values().any(|healthy| !healthy) {
                anyhow::bail!("One or more providers are unhealthy");
            }
        }
    }

    Ok(())
}
