//! Event stream integration tests.

mod helpers;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};

use feedwire_entity::Article;
use helpers::{EventReader, NextEvent, TestApp, feed};

async fn open_stream(app: &TestApp, token: &str) -> EventReader {
    let response = app.get(&format!("/v2/events?token={token}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    EventReader::new(response)
}

#[tokio::test]
async fn test_stream_requires_token() {
    let app = TestApp::new().await;

    let response = app.get("/v2/events").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/v2/events?token=garbage").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = helpers::body_json(response).await;
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_stream_accepts_bearer_header() {
    let app = TestApp::new().await;
    let token = app.token("alice");

    let response = app
        .request(
            Request::get("/v2/events")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.state.events.connection_count().await, 1);
}

#[tokio::test]
async fn test_stream_receives_updates_for_followed_feeds_only() {
    let app = TestApp::new().await;
    let followed = app.follow("alice", feed(1));
    let other = app.follow("bob", feed(2));

    let mut stream = open_stream(&app, &app.token("alice")).await;

    let article = Article {
        title: "Hello".to_string(),
        feed_id: followed.id,
        ..Article::default()
    };
    app.state.monitors.feed_updated(&other, &[]).await;
    app.state.monitors.feed_updated(&followed, &[article]).await;

    let event = stream.expect_event().await;
    assert_eq!(event["type"], "feed-update");
    assert_eq!(event["data"]["feed"]["id"], 1);
    assert_eq!(event["data"]["articles"][0]["title"], "Hello");

    assert!(matches!(
        stream.next(Duration::from_millis(200)).await,
        NextEvent::Silent
    ));
}

#[tokio::test]
async fn test_revoked_token_ends_stream_on_next_event() {
    let app = TestApp::new().await;
    let followed = app.follow("alice", feed(1));
    let token = app.token("alice");

    let mut stream = open_stream(&app, &token).await;
    app.state.jwt_decoder.revoke(&token).await.unwrap();
    app.state.monitors.feed_updated(&followed, &[]).await;

    assert!(matches!(
        stream.next(Duration::from_secs(3)).await,
        NextEvent::Ended
    ));
    assert_eq!(app.state.events.connection_count().await, 0);
}

#[tokio::test]
async fn test_dropping_response_releases_registration() {
    let app = TestApp::new().await;
    app.follow("alice", feed(1));

    let stream = open_stream(&app, &app.token("alice")).await;
    assert_eq!(app.state.events.connection_count().await, 1);

    drop(stream);
    assert_eq!(app.state.events.connection_count().await, 0);
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let app = TestApp::new().await;
    app.follow("alice", feed(1));

    let mut stream = open_stream(&app, &app.token("alice")).await;
    app.shutdown.cancel();

    assert!(matches!(
        stream.next(Duration::from_secs(3)).await,
        NextEvent::Ended
    ));
}

#[tokio::test]
async fn test_health_reports_streams() {
    let app = TestApp::new().await;
    let _stream = open_stream(&app, &app.token("alice")).await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = helpers::body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["streams"], 1);
    assert!(body.get("subscriptions").is_none());
}
