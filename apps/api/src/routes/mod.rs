pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::editor::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Editing sessions
        .route("/api/v1/sessions", post(handlers::handle_open_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:id/events",
            get(handlers::handle_session_events),
        )
        .route(
            "/api/v1/sessions/:id/sections/available",
            get(handlers::handle_available_sections),
        )
        .route(
            "/api/v1/sessions/:id/sections",
            post(handlers::handle_add_section),
        )
        .route(
            "/api/v1/sessions/:id/sections/:key",
            delete(handlers::handle_remove_section),
        )
        .route(
            "/api/v1/sessions/:id/sections/:key/visibility",
            post(handlers::handle_toggle_visibility),
        )
        .route(
            "/api/v1/sessions/:id/sections/:key/edit",
            post(handlers::handle_begin_edit),
        )
        .route(
            "/api/v1/sessions/:id/sections/:key/draft",
            put(handlers::handle_update_draft),
        )
        .route(
            "/api/v1/sessions/:id/sections/:key/commit",
            post(handlers::handle_commit),
        )
        .route(
            "/api/v1/sessions/:id/sections/:key/cancel",
            post(handlers::handle_cancel),
        )
        .route(
            "/api/v1/sessions/:id/highlight",
            put(handlers::handle_highlight),
        )
        .route(
            "/api/v1/sessions/:id/resume",
            post(handlers::handle_select_resume),
        )
        // Credential store listing
        .route(
            "/api/v1/resumes/unsigned",
            get(handlers::handle_list_unsigned),
        )
        .with_state(state)
}
