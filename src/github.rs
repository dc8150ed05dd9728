use crate::models::Repo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// GithubService
///
/// Defines the abstract contract for fetching repository data from GitHub.
/// This trait allows us to swap the concrete implementation from the real
/// HTTP client (GithubClient) in production to the in-memory mock
/// (MockGithubService) during testing, without affecting the sync handler.
#[async_trait]
pub trait GithubService: Send + Sync {
    /// Fetches the user's repositories, already filtered and mapped into
    /// cache rows. Errors carry upstream detail for server-side logging only.
    async fn fetch_repos(&self, user: &str) -> Result<Vec<Repo>, String>;
}

/// GithubState
///
/// The concrete type used to share the GitHub service across the application state.
pub type GithubState = Arc<dyn GithubService>;

/// GithubRepoPayload
///
/// Minimal deserialization target for the GitHub `/users/{user}/repos`
/// response; only the fields the cache keeps.
#[derive(Debug, Deserialize)]
struct GithubRepoPayload {
    name: String,
    full_name: String,
    description: Option<String>,
    html_url: String,
    homepage: Option<String>,
    language: Option<String>,
    stargazers_count: i32,
    forks_count: i32,
    #[serde(default)]
    topics: Vec<String>,
    pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    archived: bool,
}

/// GithubClient
///
/// The real implementation backed by the GitHub REST API via reqwest. An
/// optional token raises the rate limit; unauthenticated access works for
/// public profiles.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
        }
    }
}

#[async_trait]
impl GithubService for GithubClient {
    /// fetch_repos
    ///
    /// One page of up to 100 repositories sorted by push date, which covers a
    /// personal portfolio comfortably. Forked and archived repositories are
    /// dropped; an empty homepage string becomes None.
    async fn fetch_repos(&self, user: &str) -> Result<Vec<Repo>, String> {
        let url = format!(
            "https://api.github.com/users/{}/repos?per_page=100&sort=pushed",
            user
        );

        let mut request = self
            .http
            .get(&url)
            // GitHub rejects requests without a User-Agent.
            .header("User-Agent", "portfolio-api")
            .header("Accept", "application/vnd.github+json");

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("github responded with {}", response.status()));
        }

        let payload = response
            .json::<Vec<GithubRepoPayload>>()
            .await
            .map_err(|e| e.to_string())?;

        let fetched_at = Utc::now();
        Ok(payload
            .into_iter()
            .filter(|r| !r.fork && !r.archived)
            .map(|r| Repo {
                id: Uuid::new_v4(),
                name: r.name,
                full_name: r.full_name,
                description: r.description,
                url: r.html_url,
                homepage: r.homepage.filter(|h| !h.is_empty()),
                language: r.language,
                stars: r.stargazers_count,
                forks: r.forks_count,
                topics: r.topics,
                pushed_at: r.pushed_at,
                fetched_at,
            })
            .collect())
    }
}

// --- Mock Implementation (For Tests) ---

/// MockGithubService
///
/// Returns a canned repository list without touching the network, isolating
/// the sync handler's test boundary.
#[derive(Clone, Default)]
pub struct MockGithubService {
    /// When true, fetch_repos returns a simulated upstream failure.
    pub should_fail: bool,
}

impl MockGithubService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl GithubService for MockGithubService {
    async fn fetch_repos(&self, user: &str) -> Result<Vec<Repo>, String> {
        if self.should_fail {
            return Err("mock github error: simulation requested".to_string());
        }

        let fetched_at = Utc::now();
        Ok(vec![
            Repo {
                id: Uuid::new_v4(),
                name: "portfolio".to_string(),
                full_name: format!("{}/portfolio", user),
                description: Some("Personal site".to_string()),
                url: format!("https://github.com/{}/portfolio", user),
                homepage: None,
                language: Some("TypeScript".to_string()),
                stars: 12,
                forks: 1,
                topics: vec!["nextjs".to_string()],
                pushed_at: Some(fetched_at),
                fetched_at,
            },
            Repo {
                id: Uuid::new_v4(),
                name: "dotfiles".to_string(),
                full_name: format!("{}/dotfiles", user),
                description: None,
                url: format!("https://github.com/{}/dotfiles", user),
                homepage: None,
                language: Some("Shell".to_string()),
                stars: 3,
                forks: 0,
                topics: vec![],
                pushed_at: None,
                fetched_at,
            },
        ])
    }
}
