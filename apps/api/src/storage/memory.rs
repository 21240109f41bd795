use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use super::{
    DocumentStore, RetrievedDocument, StoreConnector, StoreContext, StoreError, StoredResume,
};

/// In-process store for tests. `gate`, when set, holds every `retrieve`
/// until it is notified.
#[derive(Default)]
pub struct MemoryStore {
    pub documents: HashMap<String, Value>,
    pub unsigned: Vec<StoredResume>,
    pub gate: Option<Arc<Notify>>,
    pub calls: Mutex<u32>,
}

impl MemoryStore {
    pub fn with_document(mut self, id: &str, data: Value) -> Self {
        self.documents.insert(id.to_string(), data);
        self
    }

    pub fn with_unsigned(mut self, id: &str, content: Value) -> Self {
        self.unsigned.push(StoredResume {
            id: id.to_string(),
            name: None,
            content,
        });
        self
    }

    pub fn retrieve_calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn retrieve(&self, document_id: &str) -> Result<RetrievedDocument, StoreError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.documents
            .get(document_id)
            .cloned()
            .map(|data| RetrievedDocument { data })
            .ok_or_else(|| StoreError::Status {
                status: 404,
                message: format!("document {document_id} not found"),
            })
    }

    async fn list_non_signed(&self) -> Result<Vec<StoredResume>, StoreError> {
        Ok(self.unsigned.clone())
    }
}

pub struct MemoryConnector(pub Arc<MemoryStore>);

impl StoreConnector for MemoryConnector {
    fn connect(&self, access_token: &str) -> Result<StoreContext, StoreError> {
        if access_token.is_empty() {
            return Err(StoreError::MissingCredential);
        }
        Ok(StoreContext::new(self.0.clone()))
    }
}
