//! Trend similarity clustering
//!
//! - [`metrics`]: cosine similarity, centroids and pairwise statistics
//! - [`cluster_store`]: in-memory cache of clusters mirrored from the database
//! - [`engine`]: submission processing and cluster queries

pub mod cluster_store;
pub mod engine;
pub mod metrics;
pub mod types;

pub use cluster_store::{ClusterEntry, ClusterStore};
pub use engine::{EngineError, EngineSettings, TrendSimilarityEngine};
pub use types::{
    ClusterScore, ClusterStatistics, ClusterSummary, SimilarityPreview, SimilarityResult,
};
