//! Persistence seam used by the similarity engine

use super::models::{ClusterRecord, TrendVector, TrendingCluster};
use super::repository::DatabaseError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Store of record for clusters and trend vectors.
///
/// The engine keeps an in-memory copy of clusters; this trait is the
/// authoritative side and every mutation goes through it first.
#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Insert a new cluster together with its founding vector, atomically.
    async fn insert_cluster_with_vector(
        &self,
        cluster: &ClusterRecord,
        vector: &TrendVector,
    ) -> Result<(), DatabaseError>;

    /// Insert a vector into an existing cluster
    async fn insert_trend_vector(&self, vector: &TrendVector) -> Result<(), DatabaseError>;

    async fn list_clusters(&self) -> Result<Vec<ClusterRecord>, DatabaseError>;

    async fn list_trend_vectors(&self) -> Result<Vec<TrendVector>, DatabaseError>;

    /// Most recent vectors of a cluster, newest first
    async fn cluster_trends(
        &self,
        cluster_id: &str,
        limit: usize,
    ) -> Result<Vec<TrendVector>, DatabaseError>;

    /// Returns false when no cluster has that id
    async fn update_cluster_label(&self, cluster_id: &str, label: &str)
        -> Result<bool, DatabaseError>;

    /// Clusters with the most submissions since `since`
    async fn trending_clusters(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingCluster>, DatabaseError>;
}
