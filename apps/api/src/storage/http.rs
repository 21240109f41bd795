use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{
    DocumentStore, RetrievedDocument, StoreConnector, StoreContext, StoreError, StoredResume,
};

/// Hands out token-bound HTTP stores sharing one connection pool.
#[derive(Clone)]
pub struct HttpConnector {
    client: Client,
    base_url: Url,
}

impl HttpConnector {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let base_url =
            Url::parse(base_url).map_err(|e| StoreError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }
}

impl StoreConnector for HttpConnector {
    fn connect(&self, access_token: &str) -> Result<StoreContext, StoreError> {
        if access_token.trim().is_empty() {
            return Err(StoreError::MissingCredential);
        }
        Ok(StoreContext::new(std::sync::Arc::new(HttpDocumentStore {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            access_token: access_token.to_string(),
        })))
    }
}

/// Credential store client for a single access token. No retries: one
/// attempt per call, failures go straight back to the caller.
pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
    access_token: String,
}

impl HttpDocumentStore {
    /// `segments` appended to the base path, each encoded as exactly one
    /// path segment (`/`, `?` and `#` included).
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, StoreError> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    warn!("Storage request failed with {status}: {message}");
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn retrieve(&self, document_id: &str) -> Result<RetrievedDocument, StoreError> {
        let url = self.endpoint(&["documents", document_id])?;
        let document: RetrievedDocument = self.get_json(url).await?;
        if document.data.is_null() {
            return Err(StoreError::MissingPayload(document_id.to_string()));
        }
        Ok(document)
    }

    async fn list_non_signed(&self) -> Result<Vec<StoredResume>, StoreError> {
        let mut url = self.endpoint(&["resumes"])?;
        url.query_pairs_mut().append_pair("signed", "false");
        self.get_json(url).await
    }
}
