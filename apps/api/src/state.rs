use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Constructed once at startup; every pipeline run borrows it.
    pub llm: Arc<dyn LlmGateway>,
    pub config: Config,
}
