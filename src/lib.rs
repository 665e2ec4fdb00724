//! WaveSight - Trend Similarity Engine
//!
//! WaveSight groups user-submitted social media trends into clusters of
//! similar submissions. Each trend text is embedded, compared against the
//! members of every known cluster, and either joins the best-matching cluster
//! or starts a new one.
//!
//! # Main Modules
//!
//! - [`embedding`] - Text embedders (FastEmbed and feature hashing)
//! - [`similarity`] - Cluster cache, scoring and the similarity engine
//! - [`db`] - SQLite persistence for clusters and trend vectors
//! - [`config`] - JSON configuration with environment overrides
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wavesight::{config::AppConfig, embedding, Database, EngineSettings, TrendSimilarityEngine};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::load(None)?;
//! let db = Database::new(&config.resolved_db_path()).await?;
//! let embedder = embedding::create_embedder(&config).await?;
//!
//! let engine =
//!     TrendSimilarityEngine::new(embedder, Arc::new(db), EngineSettings::from(&config)).await?;
//! let result = engine
//!     .process_trend_submission("mob wife aesthetic tiktok outfits", None)
//!     .await?;
//! println!("{} (new: {})", result.assigned_cluster, result.new_cluster);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod embedding;
pub mod logging;
pub mod similarity;

pub use db::{Database, SubmissionMetadata, TrendStore};
pub use embedding::{Embedder, EmbeddingEngine, HashingEmbedder};
pub use similarity::{EngineError, EngineSettings, SimilarityResult, TrendSimilarityEngine};
