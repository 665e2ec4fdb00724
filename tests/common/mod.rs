//! Shared test doubles for the engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wavesight::db::{ClusterRecord, DatabaseError, TrendVector, TrendingCluster};
use wavesight::embedding::EmbeddingError;
use wavesight::{
    Database, Embedder, EngineSettings, HashingEmbedder, TrendSimilarityEngine, TrendStore,
};

/// Embedder returning fixed vectors for known texts
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl FixedEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(0);
        Self {
            vectors: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::Inference(format!("unknown text: {}", text)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

/// Embedder that never answers in time
pub struct SlowEmbedder;

#[async_trait]
impl Embedder for SlowEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(vec![1.0])
    }

    fn dimension(&self) -> usize {
        1
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

/// Database wrapper whose reads or writes can be switched to fail
pub struct FlakyStore {
    inner: Arc<Database>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    /// Writes reach the database, then the call stalls
    pub stall_after_write: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<Database>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            stall_after_write: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_stall_after_write(&self, stall: bool) {
        self.stall_after_write.store(stall, Ordering::SeqCst);
    }

    async fn after_write(&self) {
        if self.stall_after_write.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    }

    fn check_write(&self) -> Result<(), DatabaseError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryError("injected write failure".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), DatabaseError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryError("injected read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TrendStore for FlakyStore {
    async fn insert_cluster_with_vector(
        &self,
        cluster: &ClusterRecord,
        vector: &TrendVector,
    ) -> Result<(), DatabaseError> {
        self.check_write()?;
        self.inner.insert_cluster_with_vector(cluster, vector).await?;
        self.after_write().await;
        Ok(())
    }

    async fn insert_trend_vector(&self, vector: &TrendVector) -> Result<(), DatabaseError> {
        self.check_write()?;
        self.inner.insert_trend_vector(vector).await?;
        self.after_write().await;
        Ok(())
    }

    async fn list_clusters(&self) -> Result<Vec<ClusterRecord>, DatabaseError> {
        self.check_read()?;
        self.inner.list_clusters().await
    }

    async fn list_trend_vectors(&self) -> Result<Vec<TrendVector>, DatabaseError> {
        self.check_read()?;
        self.inner.list_trend_vectors().await
    }

    async fn cluster_trends(
        &self,
        cluster_id: &str,
        limit: usize,
    ) -> Result<Vec<TrendVector>, DatabaseError> {
        self.check_read()?;
        self.inner.cluster_trends(cluster_id, limit).await
    }

    async fn update_cluster_label(
        &self,
        cluster_id: &str,
        label: &str,
    ) -> Result<bool, DatabaseError> {
        self.check_write()?;
        self.inner.update_cluster_label(cluster_id, label).await
    }

    async fn trending_clusters(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingCluster>, DatabaseError> {
        self.check_read()?;
        self.inner.trending_clusters(since, limit).await
    }
}

pub fn settings(threshold: f32) -> EngineSettings {
    EngineSettings {
        similarity_threshold: threshold,
        ..EngineSettings::default()
    }
}

/// Engine over a fresh in-memory database with the hashing embedder
pub async fn hashing_engine(threshold: f32) -> (TrendSimilarityEngine, Arc<Database>) {
    let db = Arc::new(Database::in_memory().await.unwrap());
    let engine = TrendSimilarityEngine::new(
        Arc::new(HashingEmbedder::new(384)),
        db.clone(),
        settings(threshold),
    )
    .await
    .unwrap();
    (engine, db)
}

/// Engine over a flaky wrapper of a fresh in-memory database
pub async fn flaky_engine(
    embedder: Arc<dyn Embedder>,
    threshold: f32,
) -> (TrendSimilarityEngine, Arc<FlakyStore>, Arc<Database>) {
    flaky_engine_with(embedder, settings(threshold)).await
}

pub async fn flaky_engine_with(
    embedder: Arc<dyn Embedder>,
    settings: EngineSettings,
) -> (TrendSimilarityEngine, Arc<FlakyStore>, Arc<Database>) {
    let db = Arc::new(Database::in_memory().await.unwrap());
    let store = Arc::new(FlakyStore::new(db.clone()));
    let engine = TrendSimilarityEngine::new(embedder, store.clone(), settings)
        .await
        .unwrap();
    (engine, store, db)
}
