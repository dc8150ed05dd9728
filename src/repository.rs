use crate::models::{CreateEditionRequest, NewspaperEdition, Repo, Setting};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// day_window
///
/// Computes the half-open UTC day window `[start, start + 1 day)` containing
/// the given instant. Editions are grouped by calendar day, so the activation
/// service deactivates everything inside this window before activating the
/// target.
pub fn day_window(date: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing the
/// handlers to interact with the data layer without knowing the concrete
/// implementation (Postgres, in-memory, etc.).
///
/// Error policy: list reads swallow store errors and degrade to an empty
/// result (they back non-critical display content); everything else returns
/// `sqlx::Error` for the handler boundary to map to a generic 500.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's async task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Editions ---
    /// All editions, newest date first. Degrades to empty on store failure.
    async fn list_editions(&self) -> Vec<NewspaperEdition>;
    /// The active edition for the calendar day containing `at`, if any.
    async fn active_edition_for(
        &self,
        at: DateTime<Utc>,
    ) -> Result<Option<NewspaperEdition>, sqlx::Error>;
    /// Most recent statically seeded edition, served when nothing is active.
    async fn latest_fallback_edition(&self) -> Result<Option<NewspaperEdition>, sqlx::Error>;
    async fn create_edition(
        &self,
        req: CreateEditionRequest,
    ) -> Result<NewspaperEdition, sqlx::Error>;
    /// Atomically deactivates every edition in the target's day window and
    /// activates the target. Returns None (store untouched) when the id is
    /// unknown. After a successful call exactly one edition is active for
    /// that day; concurrent calls are serialized by the store transaction.
    async fn activate_edition(&self, id: Uuid) -> Result<Option<NewspaperEdition>, sqlx::Error>;
    async fn delete_edition(&self, id: Uuid) -> Result<bool, sqlx::Error>;
    /// Maintenance: removes fallback rows and rows with empty content.
    async fn purge_fallback_editions(&self) -> Result<u64, sqlx::Error>;

    // --- GitHub cache ---
    /// Cached repository snapshots. Degrades to empty on store failure.
    async fn list_repos(&self) -> Vec<Repo>;
    /// Replaces the whole cache with a freshly fetched snapshot.
    async fn replace_repos(&self, repos: Vec<Repo>) -> Result<usize, sqlx::Error>;

    // --- Settings ---
    /// All display settings. Degrades to empty on store failure.
    async fn list_settings(&self) -> Vec<Setting>;
    async fn put_setting(&self, key: &str, value: &str) -> Result<Setting, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const EDITION_COLUMNS: &str =
    "id, date, headline, body_content, is_active, is_fallback, generated_by, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    /// list_editions
    ///
    /// Newest date first. Backs the public editions listing, so failures
    /// degrade to an empty page instead of a 500.
    async fn list_editions(&self) -> Vec<NewspaperEdition> {
        let sql = format!(
            "SELECT {EDITION_COLUMNS} FROM newspaper_editions ORDER BY date DESC, created_at DESC"
        );
        match sqlx::query_as::<_, NewspaperEdition>(&sql)
            .fetch_all(&self.pool)
            .await
        {
            Ok(editions) => editions,
            Err(e) => {
                tracing::error!("list_editions error: {:?}", e);
                vec![]
            }
        }
    }

    async fn active_edition_for(
        &self,
        at: DateTime<Utc>,
    ) -> Result<Option<NewspaperEdition>, sqlx::Error> {
        let (start, end) = day_window(at);
        let sql = format!(
            "SELECT {EDITION_COLUMNS} FROM newspaper_editions \
             WHERE is_active = true AND date >= $1 AND date < $2 \
             ORDER BY updated_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, NewspaperEdition>(&sql)
            .bind(start)
            .bind(end)
            .fetch_optional(&self.pool)
            .await
    }

    async fn latest_fallback_edition(&self) -> Result<Option<NewspaperEdition>, sqlx::Error> {
        let sql = format!(
            "SELECT {EDITION_COLUMNS} FROM newspaper_editions \
             WHERE is_fallback = true ORDER BY date DESC LIMIT 1"
        );
        sqlx::query_as::<_, NewspaperEdition>(&sql)
            .fetch_optional(&self.pool)
            .await
    }

    /// create_edition
    ///
    /// Inserts a new edition. New rows are always inactive; visibility is only
    /// granted through the activation service.
    async fn create_edition(
        &self,
        req: CreateEditionRequest,
    ) -> Result<NewspaperEdition, sqlx::Error> {
        let edition = new_edition(req);
        let sql = format!(
            "INSERT INTO newspaper_editions \
             (id, date, headline, body_content, is_active, is_fallback, generated_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, false, $5, $6, $7, $8) \
             RETURNING {EDITION_COLUMNS}"
        );
        sqlx::query_as::<_, NewspaperEdition>(&sql)
            .bind(edition.id)
            .bind(edition.date)
            .bind(&edition.headline)
            .bind(&edition.body_content)
            .bind(edition.is_fallback)
            .bind(&edition.generated_by)
            .bind(edition.created_at)
            .bind(edition.updated_at)
            .fetch_one(&self.pool)
            .await
    }

    /// activate_edition
    ///
    /// The deactivate-all-then-activate-one sequence runs inside a single
    /// transaction; a failure at any step rolls the whole thing back so
    /// readers never observe a partially-updated day. The row lock taken by
    /// `FOR UPDATE` serializes concurrent activations targeting the same
    /// edition.
    async fn activate_edition(&self, id: Uuid) -> Result<Option<NewspaperEdition>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let select_sql =
            format!("SELECT {EDITION_COLUMNS} FROM newspaper_editions WHERE id = $1 FOR UPDATE");
        let Some(edition) = sqlx::query_as::<_, NewspaperEdition>(&select_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            // Unknown id: dropping the transaction leaves the store untouched.
            return Ok(None);
        };

        let (start, end) = day_window(edition.date);

        sqlx::query(
            "UPDATE newspaper_editions SET is_active = false, updated_at = NOW() \
             WHERE date >= $1 AND date < $2 AND is_active = true",
        )
        .bind(start)
        .bind(end)
        .execute(&mut *tx)
        .await?;

        let update_sql = format!(
            "UPDATE newspaper_editions SET is_active = true, updated_at = NOW() \
             WHERE id = $1 RETURNING {EDITION_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, NewspaperEdition>(&update_sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_edition(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM newspaper_editions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_fallback_editions(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM newspaper_editions WHERE is_fallback = true OR body_content = ''",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_repos(&self) -> Vec<Repo> {
        match sqlx::query_as::<_, Repo>(
            "SELECT id, name, full_name, description, url, homepage, language, stars, forks, \
             topics, pushed_at, fetched_at \
             FROM repos ORDER BY pushed_at DESC NULLS LAST",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(repos) => repos,
            Err(e) => {
                tracing::error!("list_repos error: {:?}", e);
                vec![]
            }
        }
    }

    /// replace_repos
    ///
    /// Swaps the whole cache in one transaction so readers see either the old
    /// snapshot or the new one, never a half-written mix.
    async fn replace_repos(&self, repos: Vec<Repo>) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM repos").execute(&mut *tx).await?;

        for repo in &repos {
            sqlx::query(
                "INSERT INTO repos \
                 (id, name, full_name, description, url, homepage, language, stars, forks, topics, pushed_at, fetched_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(repo.id)
            .bind(&repo.name)
            .bind(&repo.full_name)
            .bind(&repo.description)
            .bind(&repo.url)
            .bind(&repo.homepage)
            .bind(&repo.language)
            .bind(repo.stars)
            .bind(repo.forks)
            .bind(&repo.topics)
            .bind(repo.pushed_at)
            .bind(repo.fetched_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(repos.len())
    }

    async fn list_settings(&self) -> Vec<Setting> {
        match sqlx::query_as::<_, Setting>(
            "SELECT key, value, updated_at FROM settings ORDER BY key ASC",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("list_settings error: {:?}", e);
                vec![]
            }
        }
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<Setting, sqlx::Error> {
        sqlx::query_as::<_, Setting>(
            "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW() \
             RETURNING key, value, updated_at",
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await
    }
}

/// new_edition
///
/// Materializes a `CreateEditionRequest` into a full row: fresh id, defaulted
/// date and generation tag, body serialized to text.
fn new_edition(req: CreateEditionRequest) -> NewspaperEdition {
    let now = Utc::now();
    let generated_by = req.generated_by.unwrap_or_else(|| {
        if req.is_fallback {
            "fallback".to_string()
        } else {
            "manual".to_string()
        }
    });
    NewspaperEdition {
        id: Uuid::new_v4(),
        date: req.date.unwrap_or(now),
        headline: req.headline,
        body_content: req.body.to_string(),
        is_active: false,
        is_fallback: req.is_fallback,
        generated_by,
        created_at: now,
        updated_at: now,
    }
}

// --- In-Memory Implementation (For Tests) ---

/// MemoryRepository
///
/// An in-memory implementation of `Repository` used by unit and integration
/// tests. The single mutex makes each operation atomic, mirroring what the
/// Postgres implementation gets from its transaction: the activation sequence
/// (deactivate window, activate target) is never observable half-done.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
    /// When true, every fallible operation reports a store failure.
    should_fail: bool,
}

#[derive(Default)]
struct MemoryState {
    editions: Vec<NewspaperEdition>,
    repos: Vec<Repo>,
    settings: Vec<Setting>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            should_fail: true,
        }
    }

    pub fn with_editions(editions: Vec<NewspaperEdition>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                editions,
                ..MemoryState::default()
            }),
            should_fail: false,
        }
    }

    /// Snapshot of the edition table, used by tests to assert the store was
    /// (or was not) modified by a request.
    pub fn snapshot_editions(&self) -> Vec<NewspaperEdition> {
        self.state.lock().unwrap().editions.clone()
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::PoolClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_editions(&self) -> Vec<NewspaperEdition> {
        if self.should_fail {
            return vec![];
        }
        let mut editions = self.state.lock().unwrap().editions.clone();
        editions.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        editions
    }

    async fn active_edition_for(
        &self,
        at: DateTime<Utc>,
    ) -> Result<Option<NewspaperEdition>, sqlx::Error> {
        self.check()?;
        let (start, end) = day_window(at);
        let state = self.state.lock().unwrap();
        Ok(state
            .editions
            .iter()
            .find(|e| e.is_active && e.date >= start && e.date < end)
            .cloned())
    }

    async fn latest_fallback_edition(&self) -> Result<Option<NewspaperEdition>, sqlx::Error> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .editions
            .iter()
            .filter(|e| e.is_fallback)
            .max_by_key(|e| e.date)
            .cloned())
    }

    async fn create_edition(
        &self,
        req: CreateEditionRequest,
    ) -> Result<NewspaperEdition, sqlx::Error> {
        self.check()?;
        let edition = new_edition(req);
        let mut state = self.state.lock().unwrap();
        state.editions.push(edition.clone());
        Ok(edition)
    }

    async fn activate_edition(&self, id: Uuid) -> Result<Option<NewspaperEdition>, sqlx::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();

        let Some(target_date) = state.editions.iter().find(|e| e.id == id).map(|e| e.date)
        else {
            return Ok(None);
        };
        let (start, end) = day_window(target_date);

        // Same two-step sequence as the Postgres transaction, atomic under
        // the state mutex.
        let now = Utc::now();
        for edition in state.editions.iter_mut() {
            if edition.date >= start && edition.date < end && edition.is_active {
                edition.is_active = false;
                edition.updated_at = now;
            }
        }
        let target = state
            .editions
            .iter_mut()
            .find(|e| e.id == id)
            .expect("target edition present under lock");
        target.is_active = true;
        target.updated_at = now;
        Ok(Some(target.clone()))
    }

    async fn delete_edition(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let before = state.editions.len();
        state.editions.retain(|e| e.id != id);
        Ok(state.editions.len() < before)
    }

    async fn purge_fallback_editions(&self) -> Result<u64, sqlx::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let before = state.editions.len();
        state
            .editions
            .retain(|e| !e.is_fallback && !e.body_content.is_empty());
        Ok((before - state.editions.len()) as u64)
    }

    async fn list_repos(&self) -> Vec<Repo> {
        if self.should_fail {
            return vec![];
        }
        self.state.lock().unwrap().repos.clone()
    }

    async fn replace_repos(&self, repos: Vec<Repo>) -> Result<usize, sqlx::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let count = repos.len();
        state.repos = repos;
        Ok(count)
    }

    async fn list_settings(&self) -> Vec<Setting> {
        if self.should_fail {
            return vec![];
        }
        self.state.lock().unwrap().settings.clone()
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<Setting, sqlx::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = state.settings.iter_mut().find(|s| s.key == key) {
            existing.value = value.to_string();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let setting = Setting {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: now,
        };
        state.settings.push(setting.clone());
        Ok(setting)
    }
}
