use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::editor::session::SessionSnapshot;
use crate::errors::AppError;
use crate::models::resume::{SectionContent, SectionKey};
use crate::normalizer::normalize_canonical;
use crate::state::AppState;
use crate::storage::StoredResume;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    pub document_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionResponse {
    pub session_id: Uuid,
    pub status: &'static str,
}

#[derive(Deserialize)]
pub struct AddSectionRequest {
    pub key: SectionKey,
}

#[derive(Deserialize)]
pub struct DraftRequest {
    pub content: SectionContent,
}

#[derive(Deserialize)]
pub struct HighlightRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct SelectResumeRequest {
    pub content: Value,
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// POST /api/v1/sessions
pub async fn handle_open_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<OpenSessionResponse>), AppError> {
    let context = state.connector.connect(bearer_token(&headers)?)?;
    let session_id = state.sessions.open(context, req.document_id).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(OpenSessionResponse {
            session_id,
            status: "loading",
        }),
    ))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.sessions.snapshot(id).await?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.end(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/sessions/:id/events (SSE)
pub async fn handle_session_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let rx = state.sessions.subscribe(id).await?;

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let json = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().event("store").data(json)))
        }
        Err(_) => None, // Lagged: the next snapshot fetch catches up
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

/// GET /api/v1/sessions/:id/sections/available
pub async fn handle_available_sections(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SectionKey>>, AppError> {
    Ok(Json(state.sessions.available_sections(id).await?))
}

/// POST /api/v1/sessions/:id/sections
pub async fn handle_add_section(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddSectionRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .sessions
        .update(id, |store| {
            store.add_section(req.key);
        })
        .await?;
    Ok(Json(snapshot))
}

/// DELETE /api/v1/sessions/:id/sections/:key
pub async fn handle_remove_section(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, SectionKey)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .sessions
        .update(id, |store| {
            store.remove_section(key);
        })
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/v1/sessions/:id/sections/:key/visibility
pub async fn handle_toggle_visibility(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, SectionKey)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .sessions
        .update(id, |store| store.toggle_visibility(key))
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/v1/sessions/:id/sections/:key/edit
pub async fn handle_begin_edit(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, SectionKey)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .sessions
        .update(id, |store| store.begin_edit(key))
        .await?;
    Ok(Json(snapshot))
}

/// PUT /api/v1/sessions/:id/sections/:key/draft
pub async fn handle_update_draft(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, SectionKey)>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .sessions
        .update(id, |store| store.update_draft(key, req.content))
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/v1/sessions/:id/sections/:key/commit
pub async fn handle_commit(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, SectionKey)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .sessions
        .update(id, |store| {
            store.commit(key);
        })
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/v1/sessions/:id/sections/:key/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, SectionKey)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .sessions
        .update(id, |store| store.cancel(key))
        .await?;
    Ok(Json(snapshot))
}

/// PUT /api/v1/sessions/:id/highlight
pub async fn handle_highlight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<HighlightRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .sessions
        .update(id, |store| store.record_selection(&req.text))
        .await?;
    Ok(Json(snapshot))
}

/// GET /api/v1/resumes/unsigned
pub async fn handle_list_unsigned(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<StoredResume>>, AppError> {
    let context = state.connector.connect(bearer_token(&headers)?)?;
    Ok(Json(context.documents().list_non_signed().await?))
}

/// POST /api/v1/sessions/:id/resume
///
/// Listed resumes are taken as canonical: the content goes through the
/// canonical branch only, never credential detection.
pub async fn handle_select_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectResumeRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let resume = normalize_canonical(&req.content)?;
    let snapshot = state
        .sessions
        .update(id, |store| store.set_selected_resume(resume))
        .await?;
    Ok(Json(snapshot))
}
