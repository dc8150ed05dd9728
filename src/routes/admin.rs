use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Session Routes
///
/// Login, logout, and the session probe. These sit inside the CSRF layer
/// (login and logout are mutating) but outside the admin-session layer:
/// login cannot require the session it is about to create, and clearing a
/// cookie is harmless without one.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/session
        // Reports whether the request carries a valid admin session.
        .route("/session", get(handlers::get_session))
        // POST /admin/login
        // Password check; issues the signed admin_session cookie.
        .route("/login", post(handlers::login))
        // POST /admin/logout
        // Expires the admin_session cookie.
        .route("/logout", post(handlers::logout))
}

/// Admin Router Module
///
/// Content-management routes, all mutating. The caller wraps this router in
/// two layers: the CSRF origin check (outermost, runs first) and the admin
/// session middleware. Handlers additionally take the `AdminSession`
/// extractor themselves, so a route accidentally mounted without the layer
/// still refuses anonymous requests.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/editions
        // Stores a new edition (seeded fallback or generated issue).
        .route("/editions", post(handlers::create_edition))
        // POST /admin/editions/activate
        // Enforces the single-active-edition-per-day invariant.
        .route("/editions/activate", post(handlers::activate_edition))
        // POST /admin/editions/purge-fallback
        // Maintenance bulk delete of fallback/empty rows.
        .route(
            "/editions/purge-fallback",
            post(handlers::purge_fallback_editions),
        )
        // DELETE /admin/editions/{id}
        .route("/editions/{id}", delete(handlers::delete_edition))
        // POST /admin/repos/sync
        // Refreshes the GitHub repository cache.
        .route("/repos/sync", post(handlers::sync_repos))
        // PUT /admin/settings
        // Upserts display settings.
        .route("/settings", put(handlers::update_settings))
}
