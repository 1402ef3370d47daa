#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use storage::memory::InMemoryStore;
use tower::ServiceExt;
use web::middleware::auth::ApiKeys;
use web::payment::PaymentPolicy;
use web::{AppState, routes};

pub const ADMIN_KEY: &str = "test-admin-key";

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub router: Router,
}

pub fn test_app() -> TestApp {
    test_app_with(PaymentPolicy::Disabled)
}

pub fn test_app_with(payment_policy: PaymentPolicy) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::in_memory(
        store.clone(),
        payment_policy,
        ApiKeys::from_comma_separated(ADMIN_KEY),
    );
    TestApp {
        store,
        router: routes::router(state),
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Registers `username` and returns its session token.
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "correct-horse",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Submits an analysis and returns its id.
    pub async fn submit(&self, token: &str, handle: &str) -> String {
        let (status, body) = self
            .post(
                "/api/analyses",
                token,
                json!({
                    "chess_handle": handle,
                    "end_date": "2024-06-30",
                    "game_mode": "blitz",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "submit failed: {body}");
        body["analysis_id"].as_str().unwrap().to_string()
    }
}
