use std::sync::Arc;

use crate::editor::SessionRegistry;
use crate::storage::StoreConnector;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    /// Builds a token-bound store context per authenticated caller.
    pub connector: Arc<dyn StoreConnector>,
}
