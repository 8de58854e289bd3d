//! Integration tests for the URL tracker.
//!
//! The end-to-end tests run the real server and a fake validator on
//! loopback ports with the in-memory store. The Postgres tests require a
//! reachable database configured through the `DB_*` variables.
//! Run those with: cargo test --test integration -- --ignored

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::{routing::get, Router};
use tokio::net::TcpListener;

use url_tracker::api::{create_router, AppState};
use url_tracker::auth::HttpTokenValidator;
use url_tracker::config::Config;
use url_tracker::error::StoreError;
use url_tracker::store::{InMemoryStore, PostgresStore, TrackedUrlStore};

const GOOD_TOKEN: &str = "good-token";
const DOWN_TOKEN: &str = "down-token";

/// Fake auth service: 200 for the good token, 503 for the down token,
/// 401 for anything else.
async fn spawn_validator() -> String {
    async fn check(headers: HeaderMap) -> StatusCode {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if auth == format!("Bearer {}", GOOD_TOKEN) {
            StatusCode::OK
        } else if auth == format!("Bearer {}", DOWN_TOKEN) {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::UNAUTHORIZED
        }
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/validate", get(check));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/validate", addr)
}

/// Start the tracker against `store` and return its base URL.
async fn spawn_tracker(store: Arc<dyn TrackedUrlStore>) -> String {
    let validation_url = spawn_validator().await;
    let validator = HttpTokenValidator::new(
        &validation_url,
        url_tracker::auth::client::DEFAULT_TIMEOUT,
    )
    .unwrap();

    let router = create_router(AppState::new(store, Arc::new(validator)));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post_track(base: &str, token: &str, target_url: &str) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(format!("{}/track/", base))
        .bearer_auth(token)
        .json(&serde_json::json!({ "target_url": target_url }))
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn repeated_track_yields_one_created_then_conflicts() {
    let store = InMemoryStore::new();
    let base = spawn_tracker(Arc::new(store.clone())).await;

    let mut statuses = Vec::new();
    for _ in 0..5 {
        statuses.push(post_track(&base, GOOD_TOKEN, "https://example.com").await);
    }

    assert_eq!(statuses[0], reqwest::StatusCode::CREATED);
    assert!(statuses[1..]
        .iter()
        .all(|s| *s == reqwest::StatusCode::CONFLICT));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn concurrent_track_admits_exactly_one() {
    let store = InMemoryStore::new();
    let base = spawn_tracker(Arc::new(store.clone())).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let base = base.clone();
        handles.push(tokio::spawn(async move {
            post_track(&base, GOOD_TOKEN, "https://race.example").await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            reqwest::StatusCode::CREATED => created += 1,
            reqwest::StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 9);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn validator_503_means_401() {
    let store = InMemoryStore::new();
    let base = spawn_tracker(Arc::new(store.clone())).await;

    let status = post_track(&base, DOWN_TOKEN, "https://example.com").await;

    assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
    assert!(store.is_empty());
}

#[tokio::test]
async fn empty_target_url_is_400() {
    let store = InMemoryStore::new();
    let base = spawn_tracker(Arc::new(store.clone())).await;

    let status = post_track(&base, GOOD_TOKEN, "").await;

    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    assert!(store.is_empty());
}

#[tokio::test]
async fn health_is_independent_of_dependencies() {
    let base = spawn_tracker(Arc::new(InMemoryStore::failing())).await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "Service is up and running");
}

/// Connect to the configured database in a throwaway schema.
async fn test_store() -> Option<PostgresStore> {
    dotenvy::dotenv().ok();
    std::env::var("DB_HOST").ok()?;

    let config = Config {
        db_host: std::env::var("DB_HOST").ok()?,
        db_port: std::env::var("DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432),
        db_name: std::env::var("DB_NAME").unwrap_or_else(|_| "postgres".to_string()),
        db_user: std::env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
        db_password: std::env::var("DB_PASSWORD").ok(),
        db_schema: format!("url_tracker_test_{}", std::process::id()),
        ..Config::default()
    };

    Some(PostgresStore::connect(&config).await.unwrap())
}

#[tokio::test]
#[ignore = "requires a Postgres database (DB_HOST)"]
async fn postgres_insert_find_and_duplicate() {
    let store = match test_store().await {
        Some(s) => s,
        None => {
            println!("Skipping: DB_HOST not set");
            return;
        }
    };

    let url = "https://example.com/postgres";
    assert!(store.find_by_target_url(url).await.unwrap().is_none());

    let row = store.insert(url).await.unwrap();
    assert_eq!(row.target_url, url);
    assert!(row.deleted_at.is_none());

    let found = store.find_by_target_url(url).await.unwrap().unwrap();
    assert_eq!(found.id, row.id);

    let err = store.insert(url).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate { .. }));

    // Migration is idempotent.
    store.migrate().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Postgres database (DB_HOST)"]
async fn postgres_racing_inserts_hit_unique_index() {
    let store = match test_store().await {
        Some(s) => Arc::new(s),
        None => {
            println!("Skipping: DB_HOST not set");
            return;
        }
    };

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.insert("https://example.com/race").await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StoreError::Duplicate { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(created, 1);
}
