use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod csrf;
pub mod error;
pub mod github;
pub mod handlers;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Admin).
pub mod routes;
use auth::AdminSession;
use error::ApiError;
use routes::{admin, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry
// point and to tests.
pub use config::AppConfig;
pub use github::{GithubClient, GithubState, MockGithubService};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application, aggregating every handler decorated with `#[utoipa::path]`
/// and every schema with `#[derive(utoipa::ToSchema)]`.
/// Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_editions, handlers::get_active_edition, handlers::get_repos,
        handlers::get_settings, handlers::get_session, handlers::login, handlers::logout,
        handlers::activate_edition, handlers::create_edition, handlers::delete_edition,
        handlers::purge_fallback_editions, handlers::sync_repos, handlers::update_settings,
    ),
    components(
        schemas(
            models::Repo, models::EditionResponse, models::EditionListResponse,
            models::ActivateEditionRequest, models::ActivateEditionResponse,
            models::CreateEditionRequest, models::LoginRequest, models::SessionResponse,
            models::SettingsResponse, models::UpdateSettingsRequest,
            models::SyncReposResponse, models::PurgeEditionsResponse,
            models::RepoListResponse,
        )
    ),
    tags(
        (name = "portfolio-api", description = "Developer portfolio backend API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all essential
/// application services and configuration, shared across all incoming
/// requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// GitHub Layer: abstracts the GitHub REST API for cache refreshes.
    pub github: GithubState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors to selectively pull components from
// the shared AppState (the AdminSession extractor only needs AppConfig).

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for GithubState {
    fn from_ref(app_state: &AppState) -> GithubState {
        app_state.github.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// csrf_middleware
///
/// Applies the pure Origin/Referer decision function to every route it wraps.
/// Runs **before** the admin session middleware: a cross-site request is
/// rejected with 403 without the session cookie ever being inspected.
async fn csrf_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let verdict = {
        let headers = request.headers();
        let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
        let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());
        let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
        csrf::validate_origin(
            request.method(),
            origin,
            referer,
            host,
            &state.config.allowed_origins,
        )
    };

    match verdict {
        Ok(()) => next.run(request).await,
        Err(err) => {
            tracing::warn!(method = %request.method(), uri = %request.uri(), "csrf rejection: {}", err);
            ApiError::from(err).into_response()
        }
    }
}

/// admin_middleware
///
/// Enforces the admin session for the content-management routes.
///
/// *Mechanism*: attempts to extract `AdminSession` from the request. Since
/// `AdminSession` implements `FromRequestParts`, if cookie verification
/// fails, the extractor immediately rejects the request with 401, preventing
/// execution of the handler.
async fn admin_middleware(_session: AdminSession, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    // Cookies ride along on admin requests, so credentials must be allowed;
    // that in turn forbids wildcards, hence the explicit origin list.
    let cors_origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(cors_origins)
        .allow_credentials(true);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Admin Router Assembly
    // Layer ordering matters: route_layer wraps outward, so the CSRF layer
    // (added last) runs first, then the session check, then the handler.
    let admin_router = admin::session_routes()
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_middleware,
            )),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            csrf_middleware,
        ));

    // 3. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Admin surface: CSRF + session layers applied above.
        .nest("/admin", admin_router)
        // Apply the unified state to all routes.
        .with_state(state);

    // 4. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID generation: unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. Request tracing: wraps the request/response lifecycle in
                // a span correlated by the generated request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: pulls the
/// `x-request-id` header (if present) into the structured logging metadata
/// alongside the HTTP method and URI, so every log line for a single request
/// is correlated by a unique id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
