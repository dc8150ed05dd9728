use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use portfolio_api::{
    AppConfig, AppState, MemoryRepository, MockGithubService, create_router,
    github::GithubState, models::NewspaperEdition, repository::RepositoryState,
};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

fn app_with(repo: Arc<MemoryRepository>) -> axum::Router {
    let state = AppState {
        repo: repo as RepositoryState,
        github: Arc::new(MockGithubService::new()) as GithubState,
        config: AppConfig::default(),
    };
    create_router(state)
}

async fn login(app: &axum::Router, password: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/login")
                .header("Content-Type", "application/json")
                .header("Origin", "https://example.com")
                .body(Body::from(format!(r#"{{"password":"{}"}}"#, password)))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
    let app = app_with(Arc::new(MemoryRepository::new()));
    let response = login(&app, "guess").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn login_issues_httponly_session_cookie() {
    let app = app_with(Arc::new(MemoryRepository::new()));
    let response = login(&app, "test-admin-password").await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set the session cookie")
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("admin_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    // Local config: no Secure attribute so the dev server can use it.
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn session_cookie_grants_access_to_admin_routes() {
    let now = Utc::now();
    let seeded = NewspaperEdition {
        id: Uuid::new_v4(),
        date: now,
        headline: "Seed".to_string(),
        body_content: "[]".to_string(),
        is_active: false,
        is_fallback: false,
        generated_by: "manual".to_string(),
        created_at: now,
        updated_at: now,
    };
    let edition_id = seeded.id;
    let repo = Arc::new(MemoryRepository::with_editions(vec![seeded]));
    let app = app_with(repo);

    let response = login(&app, "test-admin-password").await;
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    // "admin_session=<token>; Path=/; ..." -> "admin_session=<token>"
    let cookie_pair = set_cookie.split(';').next().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/editions/activate")
                .header("Content-Type", "application/json")
                .header("Origin", "https://example.com")
                .header(header::COOKIE, cookie_pair)
                .body(Body::from(format!(r#"{{"editionId":"{}"}}"#, edition_id)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tampered_session_cookie_is_rejected() {
    let app = app_with(Arc::new(MemoryRepository::new()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/editions/activate")
                .header("Content-Type", "application/json")
                .header("Origin", "https://example.com")
                .header(header::COOKIE, "admin_session=eyJhbGciOiJIUzI1NiJ9.forged.sig")
                .body(Body::from(format!(r#"{{"editionId":"{}"}}"#, Uuid::new_v4())))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_probe_reflects_cookie_state() {
    let app = app_with(Arc::new(MemoryRepository::new()));

    let response = login(&app, "test-admin-password").await;
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    let cookie_pair = set_cookie.split(';').next().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/session")
                .header(header::COOKIE, cookie_pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["authenticated"], true);
}

#[tokio::test]
async fn logout_expires_the_cookie() {
    let app = app_with(Arc::new(MemoryRepository::new()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/logout")
                .header("Origin", "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("admin_session=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn dev_bypass_requires_the_exact_password() {
    let app = app_with(Arc::new(MemoryRepository::new()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/editions/purge-fallback")
                .header("Origin", "https://example.com")
                .header("x-admin-token", "wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
