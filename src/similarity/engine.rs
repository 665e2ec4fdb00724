//! Trend Similarity Engine
//!
//! Embeds trend submissions and assigns each one to the existing cluster whose
//! members it most resembles on average, or starts a new cluster when nothing
//! reaches the similarity threshold.
//!
//! Every mutation is persisted before the in-memory [`ClusterStore`] is touched,
//! and the whole score -> decide -> persist -> apply sequence runs under one
//! lock, so concurrent submissions are serialized.

use super::cluster_store::ClusterStore;
use super::metrics::{calculate_centroid, l2_norm, mean_pairwise_similarity, score_members};
use super::types::{
    ClusterScore, ClusterStatistics, ClusterSummary, SimilarityPreview, SimilarityResult,
};
use crate::config::AppConfig;
use crate::db::{
    ClusterRecord, DatabaseError, SubmissionMetadata, TrendStore, TrendVector, TrendingCluster,
    DEFAULT_CLUSTER_LABEL, NEW_CLUSTER_LABEL,
};
use crate::embedding::{Embedder, EmbeddingError};
use chrono::Utc;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("Embedding has {actual} dimensions but clusters use {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Failed to load clusters: {0}")]
    Load(DatabaseError),
}

/// Tunables for the engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub similarity_threshold: f32,
    pub embed_timeout: Duration,
    pub persist_timeout: Duration,
    pub trending_window: chrono::Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            embed_timeout: config.embed_timeout(),
            persist_timeout: config.persist_timeout(),
            trending_window: chrono::Duration::hours(i64::from(config.trending_window_hours)),
        }
    }
}

/// Best-scoring cluster plus the per-cluster breakdown
struct Scoring {
    top: Option<(String, f32)>,
    all_scores: BTreeMap<String, ClusterScore>,
}

impl Scoring {
    fn top_score(&self) -> f32 {
        self.top.as_ref().map(|(_, s)| *s).unwrap_or(0.0)
    }
}

/// Mean-similarity scan over all clusters in id order. Strictly-greater
/// comparison, so on exact ties the lowest cluster id wins.
fn score_clusters(clusters: &ClusterStore, vector: &[f32]) -> Scoring {
    let mut top_score = 0.0f32;
    let mut top_cluster: Option<&String> = None;
    let mut all_scores = BTreeMap::new();

    for (cluster_id, entry) in clusters.iter() {
        let Some((avg_score, max_score)) = score_members(vector, &entry.vectors) else {
            continue;
        };

        all_scores.insert(
            cluster_id.clone(),
            ClusterScore {
                avg_score,
                max_score,
                label: entry.label.clone(),
            },
        );

        if avg_score > top_score {
            top_score = avg_score;
            top_cluster = Some(cluster_id);
        }
    }

    Scoring {
        top: top_cluster.map(|id| (id.clone(), top_score)),
        all_scores,
    }
}

fn mint_cluster_id(clusters: &ClusterStore) -> String {
    loop {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("cluster_{}", &hex[..8]);
        if !clusters.contains(&id) {
            return id;
        }
    }
}

/// Trend similarity engine
pub struct TrendSimilarityEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn TrendStore>,
    clusters: Mutex<ClusterStore>,
    settings: EngineSettings,
}

impl TrendSimilarityEngine {
    /// Create an engine and load every cluster from the store.
    ///
    /// A failed initial load is returned as an error; callers should treat it
    /// as fatal.
    pub async fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn TrendStore>,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let engine = Self {
            embedder,
            store,
            clusters: Mutex::new(ClusterStore::new()),
            settings,
        };
        engine.reload().await?;

        tracing::info!(
            "Similarity engine ready (model: {}, threshold: {})",
            engine.embedder.model_name(),
            engine.settings.similarity_threshold
        );
        Ok(engine)
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.settings.similarity_threshold
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Run a store call under the persistence timeout.
    ///
    /// A timeout does not cancel a write SQLite has already committed. In that
    /// case the database is ahead of the in-memory clusters until the next
    /// `reload`.
    async fn persist<T, F>(&self, operation: &'static str, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        match tokio::time::timeout(self.settings.persist_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!("{} failed: {}", operation, e);
                Err(e.into())
            }
            Err(_) => Err(EngineError::Timeout {
                operation,
                seconds: self.settings.persist_timeout.as_secs(),
            }),
        }
    }

    /// Embed text with the configured timeout. Empty text is rejected.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText.into());
        }

        match tokio::time::timeout(self.settings.embed_timeout, self.embedder.embed(text)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(EngineError::Timeout {
                operation: "embedding",
                seconds: self.settings.embed_timeout.as_secs(),
            }),
        }
    }

    fn check_dimension(clusters: &ClusterStore, vector: &[f32]) -> Result<(), EngineError> {
        match clusters.dimension() {
            Some(expected) if expected != vector.len() => Err(EngineError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Embed, score, assign and persist one trend submission
    pub async fn process_trend_submission(
        &self,
        text: &str,
        metadata: Option<SubmissionMetadata>,
    ) -> Result<SimilarityResult, EngineError> {
        let vector = self.embed_text(text).await?;

        let mut clusters = self.clusters.lock().await;
        Self::check_dimension(&clusters, &vector)?;

        let scoring = score_clusters(&clusters, &vector);
        let score = scoring.top_score();
        tracing::debug!(
            "Scored {:?} against {} clusters (top: {:?})",
            text,
            scoring.all_scores.len(),
            scoring.top
        );

        let assigned = match scoring.top {
            Some((cluster_id, top)) if top >= self.settings.similarity_threshold => {
                Some(cluster_id)
            }
            _ => None,
        };

        let result = match assigned {
            Some(cluster_id) => {
                let record =
                    TrendVector::new(cluster_id.clone(), vector, text, metadata.clone());
                self.persist("vector insert", self.store.insert_trend_vector(&record))
                    .await?;

                clusters.append(&cluster_id, record.embedding);
                let label = clusters
                    .label(&cluster_id)
                    .unwrap_or(DEFAULT_CLUSTER_LABEL)
                    .to_string();

                SimilarityResult {
                    assigned_cluster: cluster_id,
                    score,
                    label,
                    new_cluster: false,
                    all_scores: scoring.all_scores,
                    metadata,
                }
            }
            None => {
                let cluster_id = mint_cluster_id(&clusters);
                let cluster = ClusterRecord::new(cluster_id.clone(), metadata.as_ref());
                let created_at = cluster.created_at()?;
                let record =
                    TrendVector::new(cluster_id.clone(), vector, text, metadata.clone());
                self.persist(
                    "cluster insert",
                    self.store.insert_cluster_with_vector(&cluster, &record),
                )
                .await?;

                clusters.create(
                    cluster_id.clone(),
                    record.embedding,
                    cluster.label,
                    created_at,
                    metadata.clone().unwrap_or_default(),
                );
                tracing::info!("Created cluster {} (best score {:.3})", cluster_id, score);

                SimilarityResult {
                    assigned_cluster: cluster_id,
                    score,
                    label: NEW_CLUSTER_LABEL.to_string(),
                    new_cluster: true,
                    all_scores: scoring.all_scores,
                    metadata,
                }
            }
        };

        Ok(result)
    }

    /// Score a text against all clusters without persisting or assigning it
    pub async fn preview_submission(&self, text: &str) -> Result<SimilarityPreview, EngineError> {
        let vector = self.embed_text(text).await?;

        let clusters = self.clusters.lock().await;
        Self::check_dimension(&clusters, &vector)?;
        let scoring = score_clusters(&clusters, &vector);
        let score = scoring.top_score();
        let would_create_cluster =
            scoring.top.is_none() || score < self.settings.similarity_threshold;

        Ok(SimilarityPreview {
            best_cluster: scoring.top.map(|(id, _)| id),
            score,
            would_create_cluster,
            all_scores: scoring.all_scores,
        })
    }

    /// Most recent submissions of a cluster, newest first
    pub async fn get_cluster_trends(
        &self,
        cluster_id: &str,
        limit: usize,
    ) -> Result<Vec<TrendVector>, EngineError> {
        self.persist("cluster trends query", self.store.cluster_trends(cluster_id, limit))
            .await
    }

    /// Clusters with the most submissions inside the trending window
    pub async fn get_trending_clusters(
        &self,
        limit: usize,
    ) -> Result<Vec<TrendingCluster>, EngineError> {
        let since = Utc::now() - self.settings.trending_window;
        self.persist("trending query", self.store.trending_clusters(since, limit))
            .await
    }

    /// Rename a cluster. The in-memory label only changes once the store has
    /// accepted the update.
    pub async fn update_cluster_label(
        &self,
        cluster_id: &str,
        new_label: &str,
    ) -> Result<(), EngineError> {
        let mut clusters = self.clusters.lock().await;

        let updated = self
            .persist(
                "label update",
                self.store.update_cluster_label(cluster_id, new_label),
            )
            .await?;
        if !updated {
            return Err(EngineError::ClusterNotFound(cluster_id.to_string()));
        }

        clusters.rename(cluster_id, new_label);
        tracing::info!("Cluster {} relabeled to {:?}", cluster_id, new_label);
        Ok(())
    }

    pub async fn calculate_cluster_statistics(
        &self,
        cluster_id: &str,
    ) -> Result<ClusterStatistics, EngineError> {
        let clusters = self.clusters.lock().await;
        let entry = clusters
            .get(cluster_id)
            .ok_or_else(|| EngineError::ClusterNotFound(cluster_id.to_string()))?;

        let centroid = calculate_centroid(&entry.vectors);

        Ok(ClusterStatistics {
            cluster_id: cluster_id.to_string(),
            label: entry.label.clone(),
            size: entry.vectors.len(),
            avg_intra_similarity: mean_pairwise_similarity(&entry.vectors),
            centroid_norm: l2_norm(&centroid),
        })
    }

    /// Discard the in-memory clusters and reload them from the store.
    ///
    /// Waits for in-flight submissions. On failure the cache is left empty.
    /// Returns the number of clusters loaded.
    pub async fn reload(&self) -> Result<usize, EngineError> {
        let mut clusters = self.clusters.lock().await;

        let loaded = tokio::time::timeout(
            self.settings.persist_timeout,
            clusters.load(self.store.as_ref()),
        )
        .await;
        match loaded {
            Ok(Ok(())) => {
                if clusters.is_empty() {
                    tracing::info!("No stored clusters; starting empty");
                }
                Ok(clusters.len())
            }
            Ok(Err(e)) => {
                clusters.clear();
                tracing::error!("Cluster reload failed: {}", e);
                Err(EngineError::Load(e))
            }
            Err(_) => {
                clusters.clear();
                tracing::error!("Cluster reload timed out");
                Err(EngineError::Timeout {
                    operation: "cluster reload",
                    seconds: self.settings.persist_timeout.as_secs(),
                })
            }
        }
    }

    pub async fn list_clusters(&self) -> Vec<ClusterSummary> {
        self.clusters.lock().await.summaries()
    }

    pub async fn cluster_label(&self, cluster_id: &str) -> Option<String> {
        self.clusters
            .lock()
            .await
            .label(cluster_id)
            .map(str::to_string)
    }

    pub async fn cluster_size(&self, cluster_id: &str) -> Option<usize> {
        self.clusters
            .lock()
            .await
            .vectors(cluster_id)
            .map(<[Vec<f32>]>::len)
    }

    pub async fn cluster_count(&self) -> usize {
        self.clusters.lock().await.len()
    }
}
