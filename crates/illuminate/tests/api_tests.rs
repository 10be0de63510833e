//! API integration tests.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};

use illuminate::auth::Role;

mod common;
use common::{broadcaster_token, test_app, test_auth, token};

#[tokio::test]
async fn test_status_endpoint() {
    let app = test_app();

    let (status, json) = app
        .send(
            Request::builder()
                .uri("/status")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true}));
}

#[tokio::test]
async fn test_hello_registers_and_dispatches() {
    let app = test_app();

    let (status, json) = app
        .post(
            "/hello",
            json!({
                "token": broadcaster_token("100"),
                "talents": ["t1", "t2"],
                "displayingTalents": true
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["gameState"]["talents"], json!(["t1", "t2"]));

    let published = app.transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].channel_id, "100");
    assert_eq!(
        published[0].message(),
        json!({"talents": ["t1", "t2"], "displayingTalents": true})
    );
    assert_eq!(published[0].envelope.content_type, "application/json");

    let claims = test_auth().verify(&published[0].credential).unwrap();
    assert_eq!(claims.role, Role::External);
    assert_eq!(claims.channel_id(), Some("100"));
}

#[tokio::test]
async fn test_hello_without_changes_does_not_dispatch() {
    let app = test_app();

    let (status, json) = app
        .post("/hello", json!({"token": broadcaster_token("100")}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true}));
    assert!(app.registry.contains("100"));
    assert!(app.transport.published().is_empty());
}

#[tokio::test]
async fn test_repeated_hello_keeps_one_session_with_field_wise_state() {
    let app = test_app();
    let token = broadcaster_token("100");

    app.post("/hello", json!({"token": token, "talents": ["a"]}))
        .await;
    app.post(
        "/hello",
        json!({"token": token, "displayingTalents": true, "talents": []}),
    )
    .await;
    app.post(
        "/hello",
        json!({"token": token, "chosenTalents": [2], "displayingTalents": false}),
    )
    .await;

    assert_eq!(app.registry.len(), 1);
    let session = app.registry.get("100").unwrap();
    assert_eq!(
        serde_json::to_value(&session.game_state).unwrap(),
        json!({"talents": ["a"], "displayingTalents": false, "chosenTalents": [2]})
    );
    assert_eq!(app.transport.published().len(), 3);
}

#[tokio::test]
async fn test_hello_with_viewer_token_is_rejected() {
    let app = test_app();

    let (status, json) = app
        .post(
            "/hello",
            json!({"token": token(Role::Viewer, "100", "7"), "talents": ["a"]}),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Not a broadcaster token");
    assert!(app.registry.is_empty());
    assert!(app.transport.published().is_empty());
}

#[tokio::test]
async fn test_hello_without_token() {
    let app = test_app();

    let (status, json) = app.post("/hello", json!({"talents": ["a"]})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No valid request body provided.");
    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn test_hello_with_forged_token() {
    let app = test_app();

    let (status, json) = app
        .post("/hello", json!({"token": "abc.def.ghi", "talents": ["a"]}))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn test_hello_token_from_authorization_header() {
    let app = test_app();

    let (status, json) = app
        .send(
            Request::builder()
                .uri("/hello")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", broadcaster_token("100")),
                )
                .body(Body::from(r#"{"displayingTalents": true}"#))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["gameState"]["displayingTalents"], true);
}

#[tokio::test]
async fn test_dispatch_failure_is_reported_not_raised() {
    let app = test_app();
    app.transport.set_failing(true);

    let (status, json) = app
        .post(
            "/hello",
            json!({"token": broadcaster_token("100"), "talents": ["a"]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("503"));
    // State is kept even though viewers were not told.
    assert!(app.registry.contains("100"));
}

#[tokio::test]
async fn test_register_viewer_returns_game_state() {
    let app = test_app();
    app.post(
        "/hello",
        json!({"token": broadcaster_token("100"), "talents": ["a"]}),
    )
    .await;

    let (status, json) = app
        .post(
            "/register-viewer",
            json!({
                "token": token(Role::Viewer, "100", "7"),
                "userId": "7",
                "channelId": "100"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["gameState"], json!({"talents": ["a"]}));
}

#[tokio::test]
async fn test_register_viewer_with_opaque_id() {
    let app = test_app();
    app.registry.upsert("100");

    let (status, _) = app
        .post(
            "/register-viewer",
            json!({
                "token": token(Role::Viewer, "100", "7"),
                "userId": "U7",
                "channelId": "100"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(app.registry.get("100").unwrap().viewers.contains("U7"));
}

#[tokio::test]
async fn test_register_viewer_is_idempotent() {
    let app = test_app();
    app.registry.upsert("100");
    let body = json!({
        "token": token(Role::Viewer, "100", "7"),
        "userId": "7",
        "channelId": "100"
    });

    app.post("/register-viewer", body.clone()).await;
    app.post("/register-viewer", body).await;

    assert_eq!(app.registry.get("100").unwrap().viewers.len(), 1);
}

#[tokio::test]
async fn test_register_viewer_unknown_channel() {
    let app = test_app();

    let (status, json) = app
        .post(
            "/register-viewer",
            json!({
                "token": token(Role::Viewer, "404", "7"),
                "userId": "7",
                "channelId": "404"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid broadcaster");
    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn test_register_viewer_identity_mismatch() {
    let app = test_app();
    app.registry.upsert("100");

    let cases = [
        json!({"token": token(Role::Viewer, "100", "7"), "userId": "8", "channelId": "100"}),
        json!({"token": token(Role::Viewer, "200", "7"), "userId": "7", "channelId": "100"}),
    ];

    for body in cases {
        let (status, json) = app.post("/register-viewer", body).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "Token payload and post data mismatch");
    }
    assert!(app.registry.get("100").unwrap().viewers.is_empty());
}

#[tokio::test]
async fn test_register_viewer_missing_fields() {
    let app = test_app();
    app.registry.upsert("100");

    let (status, json) = app
        .post("/register-viewer", json!({"userId": "7", "channelId": "100"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json,
        json!({"success": false, "error": "Missing required data", "code": "BAD_REQUEST"})
    );
}

#[tokio::test]
async fn test_byebye_resets_viewers_and_removes_session() {
    let app = test_app();
    let token = broadcaster_token("100");
    app.post("/hello", json!({"token": token, "talents": ["a"]}))
        .await;

    let (status, json) = app.post("/byebye", json!({"token": token})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true}));
    assert!(!app.registry.contains("100"));

    let published = app.transport.published();
    assert_eq!(published.len(), 2);
    assert_eq!(
        published[1].message(),
        json!({"displayingTalents": false, "talents": []})
    );

    let (status, json) = app
        .post(
            "/register-viewer",
            json!({
                "token": common::token(Role::Viewer, "100", "7"),
                "userId": "7",
                "channelId": "100"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Invalid broadcaster");
}

#[tokio::test]
async fn test_hello_after_byebye_starts_fresh_session() {
    let app = test_app();
    let token = broadcaster_token("100");
    app.post("/hello", json!({"token": token, "talents": ["a"]}))
        .await;
    app.post("/byebye", json!({"token": token})).await;

    let (status, json) = app
        .post("/hello", json!({"token": token, "displayingTalents": true}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["gameState"], json!({"displayingTalents": true}));
    assert_eq!(app.registry.get("100").unwrap().viewers.len(), 0);
}

#[tokio::test]
async fn test_byebye_unknown_broadcaster() {
    let app = test_app();

    let (status, json) = app
        .post("/byebye", json!({"token": broadcaster_token("100")}))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "No broadcaster found with that id");
    assert!(app.transport.published().is_empty());
}

#[tokio::test]
async fn test_byebye_requires_broadcaster_role() {
    let app = test_app();
    app.registry.upsert("100");

    let (status, json) = app
        .post("/byebye", json!({"token": token(Role::Viewer, "100", "7")}))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "Invalid termination token");
    assert!(app.registry.contains("100"));
}

#[tokio::test]
async fn test_byebye_dispatch_failure_still_removes_session() {
    let app = test_app();
    app.registry.upsert("100");
    app.transport.set_failing(true);

    let (status, json) = app
        .post("/byebye", json!({"token": broadcaster_token("100")}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert!(!app.registry.contains("100"));
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = test_app();

    let (status, json) = app
        .send(
            Request::builder()
                .uri("/hello")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], Value::Bool(false));
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = test_app();

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        Request::builder()
            .uri("/hello")
            .method(Method::OPTIONS)
            .header(header::ORIGIN, "https://extension.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
