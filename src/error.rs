use std::time::Duration;

use thiserror::Error;

/// Failures while building a season's feature tables. Any of these aborts the
/// load; no partially built table is ever served.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data quality: {0}")]
    DataQuality(String),

    #[error("merge integrity: {0}")]
    MergeIntegrity(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("stats source timed out after {0:?}")]
    SourceTimeout(Duration),

    #[error("stats source failed: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl PipelineError {
    pub(crate) fn data_quality(msg: impl Into<String>) -> Self {
        PipelineError::DataQuality(msg.into())
    }

    pub(crate) fn merge_integrity(msg: impl Into<String>) -> Self {
        PipelineError::MergeIntegrity(msg.into())
    }

    pub(crate) fn schema_mismatch(msg: impl Into<String>) -> Self {
        PipelineError::SchemaMismatch(msg.into())
    }
}

/// Per-call prediction failures. These are recoverable and leave the service
/// and its history untouched.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{0} cannot be drawn against itself")]
    InvalidMatchup(String),

    #[error("no matchup row for {home} vs {away}")]
    UnknownMatchup { home: String, away: String },

    #[error("matchup {home} vs {away} is missing features: {missing:?}")]
    IncompleteFeatures {
        home: String,
        away: String,
        missing: Vec<String>,
    },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("classifier returned an invalid result: {0}")]
    Classifier(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
