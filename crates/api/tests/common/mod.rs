//! Shared helpers for API integration tests.
//!
//! The app is wired over the in-memory store, the in-process event bus, a
//! memory cache and a temporary upload directory, through the same router
//! builder the binary uses.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sheetflow_api::auth::jwt::{generate_access_token, JwtConfig};
use sheetflow_api::config::ServerConfig;
use sheetflow_api::router::build_app_router;
use sheetflow_api::state::AppState;
use sheetflow_core::types::{new_id, EntityId};
use sheetflow_db::MemoryStore;
use sheetflow_events::{EventBus, EventEnvelope};
use sheetflow_pipeline::{LocalFileStorage, MemoryCache, PipelineConfig, ServiceContext};
use tempfile::TempDir;
use tokio::sync::broadcast;
use tower::ServiceExt;

pub const BOUNDARY: &str = "sheetflow-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        database_url: String::new(),
        completion_consumer_enabled: false,
    }
}

pub struct TestApp {
    pub router: Router,
    pub ctx: ServiceContext,
    pub store: Arc<MemoryStore>,
    pub bus: Arc<EventBus>,
    pub cache: Arc<MemoryCache>,
    pub config: ServerConfig,
    pub upload_dir: TempDir,
}

impl TestApp {
    /// Must be called inside a tokio runtime.
    pub fn new() -> Self {
        let upload_dir = tempfile::tempdir().expect("temp dir");
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(EventBus::default());
        let cache = Arc::new(MemoryCache::new());
        let (ctx, _invalidator) = ServiceContext::new(
            store.clone(),
            bus.clone(),
            Arc::new(LocalFileStorage::new(upload_dir.path())),
            cache.clone(),
            PipelineConfig {
                upload_dir: upload_dir.path().to_path_buf(),
                ..PipelineConfig::default()
            },
        );

        let config = test_config();
        let state = AppState {
            ctx: ctx.clone(),
            pool: None,
            config: Arc::new(config.clone()),
        };
        let router = build_app_router(state, &config);

        Self {
            router,
            ctx,
            store,
            bus,
            cache,
            config,
            upload_dir,
        }
    }

    /// A fresh user id and a valid token for it.
    pub fn user(&self) -> (EntityId, String) {
        let user_id = new_id();
        let token = generate_access_token(user_id, &self.config.jwt).expect("token");
        (user_id, token)
    }

    pub fn outbound(&self) -> broadcast::Receiver<EventEnvelope> {
        self.bus.subscribe()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(authed(Method::GET, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(authed(Method::POST, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, token: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            authed(Method::POST, uri, token)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(authed(Method::DELETE, uri, token).body(Body::empty()).unwrap())
            .await
    }

    /// POST a multipart body of `file` parts plus an optional `material` field.
    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        files: &[(&str, &[u8])],
        material: Option<&str>,
    ) -> Response<Body> {
        self.send(
            authed(Method::POST, uri, token)
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(files, material)))
                .unwrap(),
        )
        .await
    }

    /// Create a project over HTTP and return its id.
    pub async fn create_project(&self, token: &str, title: &str) -> EntityId {
        let response = self
            .post_json(
                "/api/v1/projects",
                token,
                serde_json::json!({ "title": title, "description": "Test project" }),
            )
            .await;
        let json = body_json(response).await;
        json["data"]["id"].as_str().unwrap().parse().unwrap()
    }
}

fn authed(method: Method, uri: &str, token: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
}

/// Encode a `multipart/form-data` body by hand.
pub fn multipart_body(files: &[(&str, &[u8])], material: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(material) = material {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"material\"\r\n\r\n{material}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Drain whatever is buffered on a raw bus subscription.
pub fn drain(rx: &mut broadcast::Receiver<EventEnvelope>) -> Vec<EventEnvelope> {
    let mut out = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        out.push(envelope);
    }
    out
}
