//! Test utilities and common setup.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use illuminate::api::{self, AppState};
use illuminate::auth::{Claims, DEFAULT_TOKEN_TTL_SECS, ExtensionAuth, Role};
use illuminate::dispatch::{BroadcastTransport, DispatchError, Dispatcher, MessageEnvelope};
use illuminate::registry::SessionRegistry;

pub fn test_secret() -> String {
    STANDARD.encode(b"integration-test-extension-secret")
}

pub fn test_auth() -> ExtensionAuth {
    ExtensionAuth::from_base64_secret(&test_secret(), DEFAULT_TOKEN_TTL_SECS)
        .expect("test secret is valid base64")
}

/// Sign a token the way the extension host would.
pub fn token(role: Role, channel_id: &str, user_id: &str) -> String {
    let claims = Claims {
        exp: Utc::now().timestamp() + 3600,
        user_id: Some(user_id.to_string()),
        opaque_user_id: Some(format!("U{user_id}")),
        role,
        channel_id: Some(channel_id.to_string()),
        pubsub_perms: None,
    };
    test_auth().sign(&claims).expect("sign test token")
}

pub fn broadcaster_token(channel_id: &str) -> String {
    token(Role::Broadcaster, channel_id, channel_id)
}

/// A published message as seen by the transport.
#[derive(Debug, Clone)]
pub struct Published {
    pub channel_id: String,
    pub credential: String,
    pub envelope: MessageEnvelope,
}

impl Published {
    pub fn message(&self) -> Value {
        serde_json::from_str(&self.envelope.message).expect("message is JSON")
    }
}

/// In-memory transport that records every publish.
#[derive(Default)]
pub struct RecordingTransport {
    published: Mutex<Vec<Published>>,
    fail: AtomicBool,
}

impl RecordingTransport {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl BroadcastTransport for RecordingTransport {
    async fn publish(
        &self,
        channel_id: &str,
        credential: &str,
        envelope: &MessageEnvelope,
    ) -> Result<(), DispatchError> {
        self.published.lock().unwrap().push(Published {
            channel_id: channel_id.to_string(),
            credential: credential.to_string(),
            envelope: envelope.clone(),
        });

        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::Rejected {
                status: 503,
                body: "pubsub unavailable".to_string(),
            });
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub registry: Arc<SessionRegistry>,
    pub transport: Arc<RecordingTransport>,
}

impl TestApp {
    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .method(Method::POST)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }
}

/// Router wired to a fresh registry and a recording transport.
pub fn test_app() -> TestApp {
    let registry = Arc::new(SessionRegistry::new());
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = Arc::new(Dispatcher::new(test_auth(), transport.clone()));
    let state = AppState::new(registry.clone(), dispatcher, test_auth());

    TestApp {
        router: api::create_router(state, None),
        registry,
        transport,
    }
}
