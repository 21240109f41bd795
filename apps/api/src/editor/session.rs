use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::sections::SectionState;
use super::store::{EditorStore, StoreEvent};
use crate::models::resume::{Resume, SectionKey};
use crate::normalizer::normalize;
use crate::storage::StoreContext;

/// Sessions untouched for this long are dropped by `evict_idle`.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
pub const SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error("Session {id} is {status}")]
    NotReady { id: Uuid, status: &'static str },
}

/// Load lifecycle of a session. There is no state between `Loading` and
/// the outcome of the single retrieve call.
#[derive(Debug)]
pub enum LoadState {
    Loading,
    Ready(Box<EditorStore>),
    Errored(String),
}

impl LoadState {
    pub fn label(&self) -> &'static str {
        match self {
            LoadState::Loading => "loading",
            LoadState::Ready(_) => "ready",
            LoadState::Errored(_) => "errored",
        }
    }
}

#[derive(Debug)]
pub struct EditorSession {
    pub id: Uuid,
    pub document_id: String,
    pub created_at: DateTime<Utc>,
    pub context: StoreContext,
    pub state: LoadState,
    last_touched: Mutex<Instant>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub document_id: String,
    pub created_at: DateTime<Utc>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<Resume>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<SectionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_sections: Option<Vec<SectionKey>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_text: Option<String>,
}

impl EditorSession {
    fn touch(&self) {
        *self.last_touched.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_touched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    /// An open event stream keeps the session alive.
    fn is_watched(&self) -> bool {
        matches!(&self.state, LoadState::Ready(store) if store.has_subscribers())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot {
            id: self.id,
            document_id: self.document_id.clone(),
            created_at: self.created_at,
            status: self.state.label(),
            error: None,
            resume: None,
            sections: None,
            available_sections: None,
            highlighted_text: None,
        };
        match &self.state {
            LoadState::Loading => {}
            LoadState::Errored(message) => snapshot.error = Some(message.clone()),
            LoadState::Ready(store) => {
                snapshot.resume = Some(store.resume().clone());
                snapshot.sections = Some(store.sections().clone());
                snapshot.available_sections = Some(store.list_available_sections());
                snapshot.highlighted_text = store.highlighted().map(String::from);
            }
        }
        snapshot
    }
}

/// All live editing sessions. Idle ones are dropped by `evict_idle`.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, EditorSession>>>,
    idle_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TTL)
    }
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_ttl,
        }
    }

    /// Registers a session in `Loading` and starts its one load attempt in
    /// the background.
    pub async fn open(&self, context: StoreContext, document_id: String) -> Uuid {
        let id = self.insert_loading(context, document_id).await;
        let registry = self.clone();
        tokio::spawn(async move {
            registry.load(id).await;
        });
        id
    }

    pub async fn insert_loading(&self, context: StoreContext, document_id: String) -> Uuid {
        let id = Uuid::new_v4();
        let session = EditorSession {
            id,
            document_id,
            created_at: Utc::now(),
            context,
            state: LoadState::Loading,
            last_touched: Mutex::new(Instant::now()),
        };
        self.sessions.write().await.insert(id, session);
        info!("Opened editing session {id}");
        id
    }

    /// Retrieves and normalizes the session's document through its own store
    /// context, then resolves the session. Exactly one attempt; a session
    /// ended meanwhile is left alone.
    pub async fn load(&self, id: Uuid) {
        let Some((context, document_id)) = self
            .sessions
            .read()
            .await
            .get(&id)
            .map(|s| (s.context.clone(), s.document_id.clone()))
        else {
            warn!("Session {id} ended before its load started");
            return;
        };

        let outcome = match context.documents().retrieve(&document_id).await {
            Ok(document) => normalize(&document.data).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&id) else {
            warn!("Session {id} ended before document {document_id} loaded; discarding result");
            return;
        };
        session.state = match outcome {
            Ok(resume) => {
                info!("Session {id} ready with resume '{}'", resume.name);
                LoadState::Ready(Box::new(EditorStore::new(resume)))
            }
            Err(message) => {
                error!("Session {id} failed to load document {document_id}: {message}");
                LoadState::Errored(message)
            }
        };
        session.touch();
    }

    pub async fn end(&self, id: Uuid) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!("Ended editing session {id}"))
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        session.touch();
        Ok(session.snapshot())
    }

    pub async fn available_sections(&self, id: Uuid) -> Result<Vec<SectionKey>, SessionError> {
        self.read_ready(id, EditorStore::list_available_sections).await
    }

    pub async fn subscribe(&self, id: Uuid) -> Result<broadcast::Receiver<StoreEvent>, SessionError> {
        self.read_ready(id, EditorStore::subscribe).await
    }

    async fn read_ready<T, F>(&self, id: Uuid, f: F) -> Result<T, SessionError>
    where
        F: FnOnce(&EditorStore) -> T,
    {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        session.touch();
        match &session.state {
            LoadState::Ready(store) => Ok(f(store.as_ref())),
            other => Err(SessionError::NotReady {
                id,
                status: other.label(),
            }),
        }
    }

    /// Runs `f` against a ready session's store and returns the snapshot
    /// taken right after.
    pub async fn update<F>(&self, id: Uuid, f: F) -> Result<SessionSnapshot, SessionError>
    where
        F: FnOnce(&mut EditorStore),
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.touch();
        match &mut session.state {
            LoadState::Ready(store) => f(store.as_mut()),
            other => {
                return Err(SessionError::NotReady {
                    id,
                    status: other.label(),
                })
            }
        }
        Ok(session.snapshot())
    }

    /// Drops every unwatched session idle for at least the TTL. Returns how
    /// many were dropped.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session.is_watched() || session.idle_for() < self.idle_ttl;
            if !keep {
                info!("Evicting idle editing session {id}");
            }
            keep
        });
        before - sessions.len()
    }

    /// Runs `evict_idle` every `period` for the life of the process.
    pub fn spawn_sweeper(&self, period: Duration) {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_idle().await;
                if evicted > 0 {
                    debug!("Sweep dropped {evicted} idle sessions");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::SectionContent;
    use crate::storage::memory::MemoryStore;
    use serde_json::json;
    use tokio::sync::Notify;

    fn context(store: MemoryStore) -> (StoreContext, Arc<MemoryStore>) {
        let store = Arc::new(store);
        (StoreContext::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_load_moves_to_ready() {
        let (ctx, store) = context(MemoryStore::default().with_document(
            "doc-1",
            json!({ "credentialSubject": { "person": { "name": { "formattedName": "Jo Lee" } } } }),
        ));
        let registry = SessionRegistry::default();
        let id = registry.insert_loading(ctx, "doc-1".into()).await;
        assert_eq!(registry.snapshot(id).await.unwrap().status, "loading");

        registry.load(id).await;

        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.status, "ready");
        assert_eq!(snapshot.resume.unwrap().name, "Jo Lee");
        assert_eq!(store.retrieve_calls(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_is_errored_without_retry() {
        let (ctx, store) = context(MemoryStore::default());
        let registry = SessionRegistry::default();
        let id = registry.insert_loading(ctx, "missing".into()).await;

        registry.load(id).await;

        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.status, "errored");
        assert!(snapshot.error.unwrap().contains("not found"));
        assert!(snapshot.resume.is_none());
        assert_eq!(store.retrieve_calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_document_is_errored() {
        let (ctx, _) = context(MemoryStore::default().with_document("doc", json!("text")));
        let registry = SessionRegistry::default();
        let id = registry.insert_loading(ctx, "doc".into()).await;
        registry.load(id).await;
        assert_eq!(registry.snapshot(id).await.unwrap().status, "errored");
    }

    #[tokio::test]
    async fn test_ended_session_discards_late_load() {
        let gate = Arc::new(Notify::new());
        let (ctx, store) = context(MemoryStore {
            gate: Some(gate.clone()),
            ..MemoryStore::default().with_document("doc", json!({ "name": "Late" }))
        });
        let registry = SessionRegistry::default();
        let id = registry.insert_loading(ctx, "doc".into()).await;

        let loader = tokio::spawn({
            let registry = registry.clone();
            async move { registry.load(id).await }
        });
        while store.retrieve_calls() == 0 {
            tokio::task::yield_now().await;
        }

        // retrieve is in flight and held by the gate
        registry.end(id).await.unwrap();
        gate.notify_one();
        loader.await.unwrap();

        assert_eq!(store.retrieve_calls(), 1);
        assert_eq!(
            registry.snapshot(id).await.unwrap_err(),
            SessionError::NotFound(id)
        );
        assert!(registry.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_requires_ready() {
        let (ctx, _) = context(MemoryStore::default());
        let registry = SessionRegistry::default();
        let id = registry.insert_loading(ctx, "doc".into()).await;
        let err = registry.update(id, |_| {}).await.unwrap_err();
        assert_eq!(err, SessionError::NotReady { id, status: "loading" });
    }

    #[tokio::test]
    async fn test_update_applies_edit_cycle() {
        let (ctx, _) = context(
            MemoryStore::default().with_document("doc", json!({ "summary": "Before" })),
        );
        let registry = SessionRegistry::default();
        let id = registry.insert_loading(ctx, "doc".into()).await;
        registry.load(id).await;

        let snapshot = registry
            .update(id, |store| {
                store.begin_edit(SectionKey::Summary);
                store.update_draft(SectionKey::Summary, SectionContent::Text("After".into()));
                store.commit(SectionKey::Summary);
            })
            .await
            .unwrap();
        assert_eq!(snapshot.resume.unwrap().summary, "After");
    }

    #[tokio::test]
    async fn test_subscribers_see_replacements() {
        let (ctx, _) = context(MemoryStore::default().with_document("doc", json!({})));
        let registry = SessionRegistry::default();
        let id = registry.insert_loading(ctx, "doc".into()).await;
        assert!(registry.subscribe(id).await.is_err());
        registry.load(id).await;

        let mut events = registry.subscribe(id).await.unwrap();
        registry
            .update(id, |store| store.set_selected_resume(Resume::blank(Utc::now())))
            .await
            .unwrap();
        assert_eq!(events.recv().await.unwrap(), StoreEvent::ResumeReplaced);
    }

    #[tokio::test]
    async fn test_available_sections_reads_ready_store() {
        let (ctx, _) = context(MemoryStore::default().with_document("doc", json!({})));
        let registry = SessionRegistry::default();
        let id = registry.insert_loading(ctx, "doc".into()).await;
        assert_eq!(
            registry.available_sections(id).await.unwrap_err(),
            SessionError::NotReady { id, status: "loading" }
        );

        registry.load(id).await;
        let available = registry.available_sections(id).await.unwrap();
        assert!(available.contains(&SectionKey::Skills));
        assert!(!available.contains(&SectionKey::Summary));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted() {
        let (ctx, _) = context(MemoryStore::default().with_document("doc", json!({})));
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let idle = registry.insert_loading(ctx.clone(), "doc".into()).await;
        let active = registry.insert_loading(ctx, "doc".into()).await;
        registry.load(active).await;

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(registry.evict_idle().await, 0);
        registry.snapshot(active).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(registry.evict_idle().await, 1);
        assert_eq!(
            registry.snapshot(idle).await.unwrap_err(),
            SessionError::NotFound(idle)
        );
        assert_eq!(registry.snapshot(active).await.unwrap().status, "ready");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_keeps_watched_sessions() {
        let (ctx, _) = context(MemoryStore::default().with_document("doc", json!({})));
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let watched = registry.insert_loading(ctx.clone(), "doc".into()).await;
        registry.load(watched).await;
        let _events = registry.subscribe(watched).await.unwrap();
        let idle = registry.insert_loading(ctx, "doc".into()).await;

        registry.spawn_sweeper(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(
            registry.snapshot(idle).await.unwrap_err(),
            SessionError::NotFound(idle)
        );
        assert_eq!(registry.snapshot(watched).await.unwrap().status, "ready");
    }
}
