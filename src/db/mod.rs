//! Database module for SQLite persistence

mod migrations;
mod models;
mod repository;
mod store;

pub use models::{
    format_timestamp, parse_timestamp, ClusterRecord, SubmissionMetadata, TrendVector,
    TrendVectorRow, TrendingCluster, DEFAULT_CLUSTER_LABEL, NEW_CLUSTER_LABEL,
};
pub use repository::{Database, DatabaseError};
pub use store::TrendStore;
