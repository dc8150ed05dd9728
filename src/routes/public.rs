use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines the **unauthenticated** endpoints backing the portfolio's display
/// surfaces. Everything here is read-only; the repository degrades list
/// failures to empty results so a flaky store never takes down the page.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /editions
        // Every newspaper edition, newest date first.
        .route("/editions", get(handlers::get_editions))
        // GET /editions/active
        // Today's active edition, falling back to the latest seeded edition.
        .route("/editions/active", get(handlers::get_active_edition))
        // GET /repos
        // Cached GitHub repository snapshots (refreshed only by admin sync).
        .route("/repos", get(handlers::get_repos))
        // GET /settings
        // Display settings consumed by the frontend modes.
        .route("/settings", get(handlers::get_settings))
}
