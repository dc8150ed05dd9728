use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// NewspaperEdition
///
/// One generated (or statically seeded) newspaper issue, stored in the
/// `newspaper_editions` table. This is the primary record of the satirical
/// "newspaper edition" feature.
///
/// Invariant: across all editions sharing a calendar date, at most one may
/// have `is_active = true`. Only the activation service flips that flag.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct NewspaperEdition {
    pub id: Uuid,
    /// Calendar date the edition belongs to. Time-of-day is ignored for
    /// grouping; the activation service truncates to the UTC day.
    pub date: DateTime<Utc>,
    pub headline: String,
    /// Structured article content serialized as JSON text. Deserialized into
    /// a `serde_json::Value` when the edition is returned to clients.
    pub body_content: String,
    pub is_active: bool,
    /// Marks editions seeded as static placeholders rather than generated.
    pub is_fallback: bool,
    /// Tag identifying the generation source (e.g. "fallback").
    pub generated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repo
///
/// Cached snapshot of one GitHub repository, refreshed by the admin sync
/// endpoint and served from the `repos` table. The site never talks to the
/// GitHub API on the public read path.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Repo {
    pub id: Uuid,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub url: String,
    pub homepage: Option<String>,
    pub language: Option<String>,
    pub stars: i32,
    pub forks: i32,
    pub topics: Vec<String>,
    #[ts(type = "string | null")]
    pub pushed_at: Option<DateTime<Utc>>,
    /// When this snapshot was taken from the GitHub API.
    #[ts(type = "string")]
    pub fetched_at: DateTime<Utc>,
}

/// Setting
///
/// One key/value display-settings row from the `settings` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for POST /admin/login. The password is compared against the
/// configured admin password and never persisted or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub password: String,
}

/// ActivateEditionRequest
///
/// Input payload for POST /admin/editions/activate. The id is an opaque
/// string on the wire; a missing or malformed value is a validation error
/// (400), an absent edition a 404.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ActivateEditionRequest {
    pub edition_id: Option<String>,
}

/// CreateEditionRequest
///
/// Input payload for POST /admin/editions, used both to seed fallback
/// editions and to store generated ones.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateEditionRequest {
    /// Calendar date of the issue. Defaults to today (UTC) when omitted.
    #[ts(type = "string | null")]
    pub date: Option<DateTime<Utc>>,
    pub headline: String,
    /// Structured article content; stored serialized.
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub is_fallback: bool,
    /// Generation-source tag. Defaults to "manual".
    pub generated_by: Option<String>,
}

// --- Response Schemas (Output) ---

/// EditionResponse
///
/// Wire representation of an edition with `body_content` deserialized back
/// into structured JSON. Content that fails to parse (e.g. hand-seeded rows)
/// is wrapped as a plain string rather than dropped.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EditionResponse {
    pub id: Uuid,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    pub headline: String,
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub body: serde_json::Value,
    pub is_active: bool,
    pub is_fallback: bool,
    pub generated_by: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<NewspaperEdition> for EditionResponse {
    fn from(edition: NewspaperEdition) -> Self {
        let body = serde_json::from_str(&edition.body_content)
            .unwrap_or_else(|_| serde_json::Value::String(edition.body_content.clone()));
        Self {
            id: edition.id,
            date: edition.date,
            headline: edition.headline,
            body,
            is_active: edition.is_active,
            is_fallback: edition.is_fallback,
            generated_by: edition.generated_by,
            created_at: edition.created_at,
        }
    }
}

/// EditionListResponse
///
/// Output of GET /editions, ordered by date descending. A store failure on
/// this read path degrades to an empty list instead of failing the render.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EditionListResponse {
    pub editions: Vec<EditionResponse>,
}

/// ActivateEditionResponse
///
/// Output of a successful activation: the freshly-activated edition.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ActivateEditionResponse {
    pub success: bool,
    pub edition: EditionResponse,
}

/// RepoListResponse
///
/// Output of GET /repos. Degrades to an empty list on store failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RepoListResponse {
    pub repos: Vec<Repo>,
}

/// SessionResponse
///
/// Output of GET /admin/session; lets the frontend decide whether to show
/// the admin chrome without attempting a mutating call first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionResponse {
    pub authenticated: bool,
}

/// SyncReposResponse
///
/// Output of POST /admin/repos/sync: how many repositories the refreshed
/// cache now holds.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SyncReposResponse {
    pub success: bool,
    pub count: usize,
}

/// SettingsResponse
///
/// Output of GET /settings and PUT /admin/settings: the full key/value map.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SettingsResponse {
    #[ts(type = "Record<string, string>")]
    #[schema(value_type = Object)]
    pub settings: std::collections::BTreeMap<String, String>,
}

/// UpdateSettingsRequest
///
/// Input payload for PUT /admin/settings. Every key present is upserted;
/// keys absent from the map are left untouched. An empty map is a
/// validation error.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateSettingsRequest {
    #[ts(type = "Record<string, string>")]
    #[schema(value_type = Object)]
    pub settings: std::collections::BTreeMap<String, String>,
}

/// PurgeEditionsResponse
///
/// Output of the fallback-purge maintenance endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PurgeEditionsResponse {
    pub deleted: u64,
}
