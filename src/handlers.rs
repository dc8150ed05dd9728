use crate::{
    AppState,
    auth::{self, AdminSession},
    error::ApiError,
    models::{
        ActivateEditionRequest, ActivateEditionResponse, CreateEditionRequest,
        EditionListResponse, EditionResponse, LoginRequest, PurgeEditionsResponse,
        RepoListResponse, SessionResponse, SettingsResponse, SyncReposResponse,
        UpdateSettingsRequest,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

// --- Public Handlers ---

/// get_editions
///
/// [Public Route] Lists every newspaper edition, newest date first. This
/// backs a non-critical display surface, so a store failure degrades to an
/// empty list inside the repository rather than failing the page.
#[utoipa::path(
    get,
    path = "/editions",
    responses((status = 200, description = "All editions", body = EditionListResponse))
)]
pub async fn get_editions(State(state): State<AppState>) -> Json<EditionListResponse> {
    let editions = state
        .repo
        .list_editions()
        .await
        .into_iter()
        .map(EditionResponse::from)
        .collect();
    Json(EditionListResponse { editions })
}

/// get_active_edition
///
/// [Public Route] Returns the edition selected for public display today.
/// When no edition is active for the current day, the most recent statically
/// seeded fallback edition is served instead; 404 only when neither exists.
#[utoipa::path(
    get,
    path = "/editions/active",
    responses(
        (status = 200, description = "Active or fallback edition", body = EditionResponse),
        (status = 404, description = "No edition available")
    )
)]
pub async fn get_active_edition(
    State(state): State<AppState>,
) -> Result<Json<EditionResponse>, ApiError> {
    // Read-path degradation: a store error here is logged and treated as
    // "nothing active", letting the fallback query still run.
    let active = state
        .repo
        .active_edition_for(Utc::now())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("active edition lookup failed: {:?}", e);
            None
        });

    if let Some(edition) = active {
        return Ok(Json(edition.into()));
    }

    match state.repo.latest_fallback_edition().await? {
        Some(edition) => Ok(Json(edition.into())),
        None => Err(ApiError::NotFound),
    }
}

/// get_repos
///
/// [Public Route] Serves the cached GitHub repository snapshots. The GitHub
/// API is never consulted on this path; only the admin sync endpoint
/// refreshes the cache.
#[utoipa::path(
    get,
    path = "/repos",
    responses((status = 200, description = "Cached repositories", body = RepoListResponse))
)]
pub async fn get_repos(State(state): State<AppState>) -> Json<RepoListResponse> {
    Json(RepoListResponse {
        repos: state.repo.list_repos().await,
    })
}

/// get_settings
///
/// [Public Route] Display settings consumed by the frontend (theme defaults,
/// feature toggles). Degrades to an empty map on store failure.
#[utoipa::path(
    get,
    path = "/settings",
    responses((status = 200, description = "Display settings", body = SettingsResponse))
)]
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let settings = state
        .repo
        .list_settings()
        .await
        .into_iter()
        .map(|s| (s.key, s.value))
        .collect();
    Json(SettingsResponse { settings })
}

// --- Session Handlers ---

/// get_session
///
/// [Public Route] Reports whether the request carries a valid admin session,
/// so the frontend can decide whether to render admin chrome without probing
/// a mutating endpoint. Uses the fallible form of the extractor: an invalid
/// session is an answer here, not a rejection.
#[utoipa::path(
    get,
    path = "/admin/session",
    responses((status = 200, description = "Session state", body = SessionResponse))
)]
pub async fn get_session(session: Result<AdminSession, ApiError>) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: session.is_ok(),
    })
}

/// login
///
/// [CSRF-guarded Route] Verifies the admin password and issues the signed
/// session cookie. The password is compared against configuration and never
/// logged. A wrong password is a plain 401 with no further detail.
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued"),
        (status = 401, description = "Wrong password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.password != state.config.admin_password {
        return Err(ApiError::Unauthorized);
    }

    let cookie = auth::issue_session_cookie(&state.config)?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "success": true })),
    ))
}

/// logout
///
/// [CSRF-guarded Route] Clears the admin session cookie. Idempotent: calling
/// it without a session still returns success.
#[utoipa::path(
    post,
    path = "/admin/logout",
    responses((status = 200, description = "Session cleared"))
)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, auth::clear_session_cookie(&state.config))],
        Json(serde_json::json!({ "success": true })),
    )
}

// --- Admin Edition Handlers ---

/// activate_edition
///
/// [Admin Route] Makes one edition the active edition for its calendar day.
/// The repository performs the deactivate-window-then-activate-target
/// sequence in a single transaction, so after success exactly one edition is
/// active for that day.
///
/// The id arrives as an opaque string: missing or malformed values are a
/// 400 validation error (the store is never consulted), an unknown id a 404
/// (the store is untouched).
#[utoipa::path(
    post,
    path = "/admin/editions/activate",
    request_body = ActivateEditionRequest,
    responses(
        (status = 200, description = "Edition activated", body = ActivateEditionResponse),
        (status = 400, description = "Missing or malformed editionId"),
        (status = 404, description = "Edition not found")
    )
)]
pub async fn activate_edition(
    _session: AdminSession,
    State(state): State<AppState>,
    Json(payload): Json<ActivateEditionRequest>,
) -> Result<Json<ActivateEditionResponse>, ApiError> {
    let raw_id = payload
        .edition_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("editionId is required".to_string()))?;

    let id = Uuid::parse_str(raw_id)
        .map_err(|_| ApiError::Validation("editionId is malformed".to_string()))?;

    match state.repo.activate_edition(id).await? {
        Some(edition) => Ok(Json(ActivateEditionResponse {
            success: true,
            edition: edition.into(),
        })),
        None => Err(ApiError::NotFound),
    }
}

/// create_edition
///
/// [Admin Route] Stores a new edition (seeded fallback or generated issue).
/// New editions are always inactive; visibility only changes through
/// activation.
#[utoipa::path(
    post,
    path = "/admin/editions",
    request_body = CreateEditionRequest,
    responses(
        (status = 201, description = "Edition created", body = EditionResponse),
        (status = 400, description = "Missing headline")
    )
)]
pub async fn create_edition(
    _session: AdminSession,
    State(state): State<AppState>,
    Json(payload): Json<CreateEditionRequest>,
) -> Result<(StatusCode, Json<EditionResponse>), ApiError> {
    if payload.headline.trim().is_empty() {
        return Err(ApiError::Validation("headline is required".to_string()));
    }

    let edition = state.repo.create_edition(payload).await?;
    Ok((StatusCode::CREATED, Json(edition.into())))
}

/// delete_edition
///
/// [Admin Route] Removes a single edition by id.
#[utoipa::path(
    delete,
    path = "/admin/editions/{id}",
    params(("id" = Uuid, Path, description = "Edition ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_edition(
    _session: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_edition(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// purge_fallback_editions
///
/// [Admin Route] Maintenance: bulk-deletes statically seeded fallback rows
/// and rows with empty content, reporting how many were removed.
#[utoipa::path(
    post,
    path = "/admin/editions/purge-fallback",
    responses((status = 200, description = "Purged", body = PurgeEditionsResponse))
)]
pub async fn purge_fallback_editions(
    _session: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<PurgeEditionsResponse>, ApiError> {
    let deleted = state.repo.purge_fallback_editions().await?;
    Ok(Json(PurgeEditionsResponse { deleted }))
}

// --- Admin Data Handlers ---

/// sync_repos
///
/// [Admin Route] Refreshes the GitHub repository cache: fetches the
/// configured user's repositories and atomically replaces the cache table.
/// Upstream failures surface as a generic 502; the detail stays in the logs.
#[utoipa::path(
    post,
    path = "/admin/repos/sync",
    responses(
        (status = 200, description = "Cache refreshed", body = SyncReposResponse),
        (status = 502, description = "GitHub unavailable")
    )
)]
pub async fn sync_repos(
    _session: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<SyncReposResponse>, ApiError> {
    let repos = state
        .github
        .fetch_repos(&state.config.github_user)
        .await
        .map_err(ApiError::Upstream)?;

    let count = state.repo.replace_repos(repos).await?;
    Ok(Json(SyncReposResponse {
        success: true,
        count,
    }))
}

/// update_settings
///
/// [Admin Route] Upserts the provided display settings. Keys not present in
/// the payload are left untouched; an empty payload is rejected.
#[utoipa::path(
    put,
    path = "/admin/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = SettingsResponse),
        (status = 400, description = "Empty settings map")
    )
)]
pub async fn update_settings(
    _session: AdminSession,
    State(state): State<AppState>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    if payload.settings.is_empty() {
        return Err(ApiError::Validation("settings map is empty".to_string()));
    }

    for (key, value) in &payload.settings {
        state.repo.put_setting(key, value).await?;
    }

    let settings = state
        .repo
        .list_settings()
        .await
        .into_iter()
        .map(|s| (s.key, s.value))
        .collect();
    Ok(Json(SettingsResponse { settings }))
}
