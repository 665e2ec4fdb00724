//! WaveSight - trend similarity CLI
//!
//! Submits trends to the similarity engine and queries the resulting clusters.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wavesight::{
    config::{AppConfig, EmbedderKind},
    db::Database,
    embedding, log_error, log_info, logging, EngineSettings, SubmissionMetadata,
    TrendSimilarityEngine,
};

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Submit a trend and assign it to a cluster
    Submit {
        /// Trend description
        text: String,
        /// Platform the trend was seen on
        #[arg(long)]
        platform: Option<String>,
        /// Trend category
        #[arg(long)]
        category: Option<String>,
        /// Submitting user
        #[arg(long)]
        user_id: Option<String>,
        /// Additional metadata as a JSON object
        #[arg(long)]
        extra: Option<String>,
    },
    /// Score a trend against existing clusters without saving it
    Check {
        /// Trend description
        text: String,
    },
    /// Show the most recent trends of a cluster
    Trends {
        cluster_id: String,
        /// Number of trends to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show clusters with the most recent activity
    Trending {
        /// Number of clusters to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Rename a cluster
    Label { cluster_id: String, label: String },
    /// Show size and cohesion statistics for a cluster
    Stats { cluster_id: String },
    /// List all clusters
    Clusters,
    /// Reload every cluster from the database
    Reindex,
}

#[derive(Parser, Debug)]
#[command(name = "wavesight")]
#[command(author = "WaveSight Team")]
#[command(version = "0.1.0")]
#[command(about = "Cluster social media trend submissions by semantic similarity", long_about = None)]
struct Args {
    /// Configuration file path (overrides defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database path (default: ~/.local/share/wavesight/wavesight.db)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Similarity threshold for joining an existing cluster
    #[arg(long)]
    threshold: Option<f32>,

    /// Embedder: fastembed or hashing
    #[arg(long)]
    embedder: Option<EmbedderKind>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut app_config = AppConfig::load(args.config.as_deref())?;

    init_logging(args.verbose || app_config.debug);

    // CLI overrides
    if let Some(path) = args.db_path {
        app_config.db_path = Some(path);
    }
    if let Some(threshold) = args.threshold {
        app_config.similarity_threshold = threshold;
    }
    if let Some(embedder) = args.embedder {
        app_config.embedder = embedder;
    }
    app_config.validate()?;

    let db_path = app_config.resolved_db_path();
    if let Err(e) = logging::init_logger_at(&logging::log_path_for(&db_path)) {
        tracing::warn!("Session log disabled: {}", e);
    }
    tracing::info!("Initializing database at {:?}", db_path);
    let db = Database::new(&db_path).await?;

    let embedder = match embedding::create_embedder(&app_config).await {
        Ok(embedder) => embedder,
        Err(e) => {
            log_error!("Embedding model unavailable: {}", e);
            tracing::error!("Embedding model unavailable: {}", e);
            tracing::error!("Use --embedder hashing to run without downloading a model.");
            return Err(e.into());
        }
    };

    let engine =
        TrendSimilarityEngine::new(embedder, Arc::new(db), EngineSettings::from(&app_config))
            .await?;

    run(&engine, &app_config, args.command).await
}

async fn run(
    engine: &TrendSimilarityEngine,
    config: &AppConfig,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Submit {
            text,
            platform,
            category,
            user_id,
            extra,
        } => {
            let metadata = build_metadata(platform, category, user_id, extra.as_deref())?;
            let result = engine.process_trend_submission(&text, Some(metadata)).await?;
            log_info!(
                "Submitted {:?} -> {} (score {:.3}, new: {})",
                text,
                result.assigned_cluster,
                result.score,
                result.new_cluster
            );
            print_json(&result)
        }
        Command::Check { text } => print_json(&engine.preview_submission(&text).await?),
        Command::Trends { cluster_id, limit } => {
            let limit = limit.unwrap_or(config.default_trend_limit);
            let trends: Vec<_> = engine
                .get_cluster_trends(&cluster_id, limit)
                .await?
                .into_iter()
                .map(|t| t.without_embedding())
                .collect();
            let label = engine
                .cluster_label(&cluster_id)
                .await
                .unwrap_or_else(|| "Unknown Cluster".to_string());
            print_json(&serde_json::json!({
                "cluster_id": cluster_id,
                "label": label,
                "trends": trends,
            }))
        }
        Command::Trending { limit } => {
            let limit = limit.unwrap_or(config.default_trend_limit);
            print_json(&serde_json::json!({
                "clusters": engine.get_trending_clusters(limit).await?,
            }))
        }
        Command::Label { cluster_id, label } => {
            engine.update_cluster_label(&cluster_id, &label).await?;
            log_info!("Relabeled {} to {:?}", cluster_id, label);
            println!("Cluster label updated successfully");
            Ok(())
        }
        Command::Stats { cluster_id } => {
            print_json(&engine.calculate_cluster_statistics(&cluster_id).await?)
        }
        Command::Clusters => print_json(&engine.list_clusters().await),
        Command::Reindex => {
            let count = engine.reload().await?;
            log_info!("Reindexed {} clusters", count);
            print_json(&serde_json::json!({
                "message": "Clusters reindexed successfully",
                "cluster_count": count,
            }))
        }
    }
}

/// Stamp submission time and parse the optional `--extra` JSON object
fn build_metadata(
    platform: Option<String>,
    category: Option<String>,
    user_id: Option<String>,
    extra: Option<&str>,
) -> anyhow::Result<SubmissionMetadata> {
    let mut metadata = SubmissionMetadata {
        platform,
        category,
        user_id,
        submitted_at: Some(chrono::Utc::now()),
        ..Default::default()
    };

    if let Some(raw) = extra {
        match serde_json::from_str::<serde_json::Value>(raw)? {
            serde_json::Value::Object(map) => metadata.extra = map,
            other => anyhow::bail!("--extra must be a JSON object, got {}", other),
        }
    }

    Ok(metadata)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize logging
fn init_logging(verbose: bool) {
    let filter = if verbose {
        "wavesight=debug,info"
    } else {
        "wavesight=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
