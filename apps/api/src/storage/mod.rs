// External credential store collaborators.
// Sessions only ever see these traits; the HTTP client is one implementation.

pub mod http;
#[cfg(test)]
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing access credential")]
    MissingCredential,

    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Document {0} has no content")]
    MissingPayload(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A raw document as returned by `retrieve`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievedDocument {
    #[serde(default)]
    pub data: Value,
}

/// An unsigned (work-in-progress) resume from the storage listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoredResume {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: Value,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn retrieve(&self, document_id: &str) -> Result<RetrievedDocument, StoreError>;

    async fn list_non_signed(&self) -> Result<Vec<StoredResume>, StoreError>;
}

/// Builds a store context for one authenticated caller.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, access_token: &str) -> Result<StoreContext, StoreError>;
}

/// Storage handles bound to a single access token. Created once per
/// authenticated session and passed explicitly to whatever needs it; a new
/// token means a new context.
#[derive(Clone)]
pub struct StoreContext {
    documents: Arc<dyn DocumentStore>,
}

impl StoreContext {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &dyn DocumentStore {
        self.documents.as_ref()
    }
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext").finish_non_exhaustive()
    }
}
