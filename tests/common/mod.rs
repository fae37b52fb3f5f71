//! Shared helpers for integration tests: token minting and an in-process
//! stand-in for the marketplace REST API.

#![allow(dead_code)]

use axum::{
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{encode, DecodingKey, EncodingKey, Header, Validation};
use marketdesk::auth::{Claims, MemoryStorage, SessionStore};
use marketdesk::config::ApiConfig;
use marketdesk::AuthGateway;
use serde_json::{json, Value};
use std::sync::Arc;

const API_SECRET: &[u8] = b"mock-api-secret";

pub const VALID_EMAIL: &str = "a@b.com";
pub const VALID_PASSWORD: &str = "x";
pub const TAKEN_EMAIL: &str = "taken@b.com";

/// Mint a signed token expiring `secs` from now (negative for the past)
pub fn token_expiring_in(secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        exp: now + secs,
        sub: Some(json!(1)),
        role: Some("customer".to_string()),
        iat: Some(now),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(API_SECRET))
        .expect("Failed to create token")
}

fn bearer_is_valid(headers: &HeaderMap) -> bool {
    let Some(token) = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return false;
    };
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(API_SECRET),
        &Validation::default(),
    )
    .is_ok()
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"] == VALID_EMAIL && body["password"] == VALID_PASSWORD {
        (
            StatusCode::OK,
            Json(json!({
                "user": { "id": 1, "role": "customer", "email": VALID_EMAIL },
                "token": token_expiring_in(3600),
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
    }
}

async fn signup(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"] == TAKEN_EMAIL {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email already registered" })),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "user": {
                "_id": "u-42",
                "role": "Provider",
                "name": body["name"],
                "email": body["email"],
            },
            "token": token_expiring_in(3600),
            "refreshToken": "opaque-refresh-token",
        })),
    )
}

async fn list_todos(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !bearer_is_valid(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid token" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!([{ "_id": "t1", "title": "Fix the sink", "completed": false }])),
    )
}

async fn create_todo(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !bearer_is_valid(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid token" })),
        );
    }
    let mut todo = body;
    todo["_id"] = json!("t2");
    (StatusCode::CREATED, Json(todo))
}

/// A running mock API; aborted on drop
pub struct MockApi {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_api() -> MockApi {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/revoked",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Token revoked" })),
                )
            }),
        )
        .route(
            "/broken",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Database unavailable" })),
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock API");
    let addr = listener.local_addr().expect("Mock API has no address");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockApi {
        base_url: format!("http://{}", addr),
        handle,
    }
}

/// Gateway over fresh in-memory storage, pointed at `api`
pub fn gateway_for(api: &MockApi) -> (Arc<MemoryStorage>, AuthGateway) {
    let storage = Arc::new(MemoryStorage::new());
    let session = SessionStore::hydrate(storage.clone());
    let config = ApiConfig {
        base_url: api.base_url.clone(),
        ..ApiConfig::default()
    };
    let gateway = AuthGateway::new(&config, session).expect("Failed to build gateway");
    (storage, gateway)
}
