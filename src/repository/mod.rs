//! Tournament persistence.
//!
//! The engine only reads pending tournaments and writes resolved signup URLs;
//! both go through [`TournamentStore`], which implementations must make safe
//! for concurrent callers.

mod json;

pub use json::{DateRange, JsonFileStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ResolveError;
use crate::models::TournamentTarget;

/// Errors raised by tournament stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown tournament {0}")]
    UnknownTournament(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed store data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<StoreError> for ResolveError {
    fn from(e: StoreError) -> Self {
        ResolveError::Store(e.to_string())
    }
}

/// Source of pending tournaments and sink of resolved URLs.
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Tournaments that still lack a signup URL.
    async fn load_pending(&self) -> Result<Vec<TournamentTarget>, StoreError>;

    /// Record the signup URL of one tournament. Writing the same URL twice is
    /// a no-op.
    async fn persist_resolved(&self, id: i64, url: &str) -> Result<(), StoreError>;

    /// Record several signup URLs; returns how many were written.
    async fn persist_batch(&self, resolved: &[(i64, String)]) -> Result<usize, StoreError> {
        for (id, url) in resolved {
            self.persist_resolved(*id, url).await?;
        }
        Ok(resolved.len())
    }
}
