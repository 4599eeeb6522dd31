// src/ingest/error.rs
use serde::Serialize;
use thiserror::Error;

/// Classified failures of the ingestion pipeline.
///
/// None of these ever escapes a scheduler tick: the scheduler catches them per
/// task and records them into the daily stats.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Network / HTTP level failure talking to a provider.
    #[error("{provider}: transport error: {message}")]
    Transport { provider: String, message: String },

    /// Request timed out (after the optional one-shot fallback).
    #[error("{provider}: request timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    /// Provider answered but its envelope signalled failure.
    #[error("{provider}: api error: {message}")]
    ProviderApi { provider: String, message: String },

    /// Provider body could not be decoded into its envelope shape.
    #[error("{provider}: malformed response: {message}")]
    Decode { provider: String, message: String },

    /// Raw record unusable (e.g. no title). Discarded, never retried.
    #[error("unusable record: {0}")]
    Transform(String),

    /// Recent-window query for duplicate detection failed.
    #[error("storage query failed: {0}")]
    StorageQuery(String),

    /// Persisting an admitted article failed.
    #[error("storage write failed: {0}")]
    Storage(String),
}

/// Coarse classification stored alongside each recorded error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    ProviderApi,
    Transform,
    StorageQuery,
    Storage,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Transport { .. } | IngestError::Timeout { .. } => ErrorKind::Transport,
            IngestError::ProviderApi { .. } | IngestError::Decode { .. } => ErrorKind::ProviderApi,
            IngestError::Transform(_) => ErrorKind::Transform,
            IngestError::StorageQuery(_) => ErrorKind::StorageQuery,
            IngestError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn transport(provider: &str, err: impl std::fmt::Display) -> Self {
        IngestError::Transport {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    pub fn api(provider: &str, message: impl Into<String>) -> Self {
        IngestError::ProviderApi {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn decode(provider: &str, err: impl std::fmt::Display) -> Self {
        IngestError::Decode {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}
