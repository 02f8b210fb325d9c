//! Glance HTTP server: the article endpoint and its configuration.
pub mod api;
pub mod config;

use std::sync::Arc;

use glance_engine::ArticleService;

pub use api::{router, status_for, ApiError};
pub use config::{ConfigError, FetchConfig, ServerConfig};

/// Router wired to a production [`ArticleService`] built from `config`.
pub fn build_router(config: &ServerConfig) -> axum::Router {
    let service = ArticleService::with_settings(config.fetch_settings(), config.guard_settings());
    router(Arc::new(service))
}
