//! Hub callback integration tests: intent verification, content
//! distribution, and the subscribe-to-stream path end to end.

mod helpers;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};

use feedwire_core::types::FeedId;
use feedwire_database::{FeedRepository, SubscriptionRepository};
use feedwire_entity::{Feed, Subscription};
use feedwire_hubbub::Hubbub;
use helpers::{EventReader, NextEvent, TestApp, feed, spawn_hub, spawn_slow_hub};

const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Example</title><link>https://example.com</link><description>d</description>
  <item><title>Pushed</title><link>https://example.com/p/1</link></item>
</channel></rss>"#;

fn verify_uri(feed: &Feed, query: &str) -> String {
    format!(
        "/v2/hubbub/{}?hub.topic={}&{query}",
        feed.id,
        urlencode(&feed.link)
    )
}

fn urlencode(value: &str) -> String {
    value.replace(':', "%3A").replace('/', "%2F")
}

async fn wait_for_active(hubbub: &Hubbub, count: usize) -> Vec<Subscription> {
    for _ in 0..150 {
        let active = hubbub.active_subscriptions().await;
        if active.len() == count {
            return active;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    hubbub.active_subscriptions().await
}

async fn post_content(app: &TestApp, feed_id: FeedId, body: &'static str) -> StatusCode {
    app.request(
        Request::post(format!("/v2/hubbub/{feed_id}"))
            .header(header::CONTENT_TYPE, "application/rss+xml")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .status()
}

/// A feed with a pending (pessimistic) subscription record.
async fn pending(app: &TestApp, id: i64) -> Feed {
    let f = feed(id).with_hub("https://hub.example.com/");
    app.store.insert_feed(f.clone());
    SubscriptionRepository::update(&*app.store, &Subscription::new("https://hub.example.com/", f.id))
        .await
        .unwrap();
    f
}

#[tokio::test]
async fn test_callback_routes_absent_without_callback_url() {
    let app = TestApp::new().await;
    let f = pending(&app, 1).await;

    let response = app.get(&verify_uri(&f, "hub.mode=subscribe&hub.challenge=x")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscribe_verification_confirms_and_echoes_challenge() {
    let app = TestApp::with_hubbub().await;
    let mut f = pending(&app, 7).await;
    f.subscribe_error = Some("previous failure".to_string());
    app.store.insert_feed(f.clone());

    let response = app
        .get(&verify_uri(
            &f,
            "hub.mode=subscribe&hub.challenge=c-123&hub.lease_seconds=600",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(helpers::body_string(response).await, "c-123");

    let sub = app.store.find_by_feed(f.id).await.unwrap().unwrap();
    assert!(!sub.subscription_failure);
    assert_eq!(sub.lease_seconds, 600);

    let stored = app.store.find_by_id(f.id).await.unwrap().unwrap();
    assert!(stored.subscribe_error.is_none());

    let active = app.state.hubbub.as_ref().unwrap().active_subscriptions().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].feed_id, f.id);

    let health = helpers::body_json(app.get("/health").await).await;
    assert_eq!(health["subscriptions"], 1);
}

#[tokio::test]
async fn test_subscribe_verification_rejects_out_of_range_lease() {
    let app = TestApp::with_hubbub().await;
    let f = pending(&app, 7).await;

    for lease in ["-5", "0", "9223372036854775807", "31536001"] {
        let response = app
            .get(&verify_uri(
                &f,
                &format!("hub.mode=subscribe&hub.challenge=c&hub.lease_seconds={lease}"),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "lease {lease}");
    }

    let sub = app.store.find_by_feed(f.id).await.unwrap().unwrap();
    assert!(sub.subscription_failure);
    assert_eq!(sub.lease_seconds, 0);
    assert!(app.state.hubbub.as_ref().unwrap().active_subscriptions().await.is_empty());

    let response = app
        .get(&verify_uri(
            &f,
            "hub.mode=subscribe&hub.challenge=c&hub.lease_seconds=31536000",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_verification_rejects_unknown_feed_and_wrong_topic() {
    let app = TestApp::with_hubbub().await;
    let f = pending(&app, 7).await;

    let unknown = feed(99);
    let response = app
        .get(&verify_uri(&unknown, "hub.mode=subscribe&hub.challenge=x"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .get(&format!(
            "/v2/hubbub/{}?hub.mode=subscribe&hub.challenge=x&hub.topic=https%3A%2F%2Fother.example.com",
            f.id
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(app.state.hubbub.as_ref().unwrap().active_subscriptions().await.is_empty());
}

#[tokio::test]
async fn test_verification_requires_challenge_and_known_mode() {
    let app = TestApp::with_hubbub().await;
    let f = pending(&app, 7).await;

    let response = app.get(&verify_uri(&f, "hub.mode=subscribe")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get(&verify_uri(&f, "hub.mode=bogus&hub.challenge=x")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsubscribe_verification_echoes_without_record() {
    let app = TestApp::with_hubbub().await;
    let f = feed(7).with_hub("https://hub.example.com/");
    app.store.insert_feed(f.clone());

    let response = app
        .get(&verify_uri(&f, "hub.mode=unsubscribe&hub.challenge=bye"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(helpers::body_string(response).await, "bye");
}

#[tokio::test]
async fn test_unsubscribe_verification_refused_while_subscribed() {
    let app = TestApp::with_hubbub().await;
    let f = pending(&app, 7).await;

    let response = app
        .get(&verify_uri(&f, "hub.mode=unsubscribe&hub.challenge=bye"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.store.find_by_feed(f.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_unsubscribe_verification_echoes_while_unsubscribing() {
    let (hub_url, hub) = spawn_slow_hub(StatusCode::ACCEPTED, 500).await;
    let app = TestApp::with_hubbub().await;
    let hubbub = app.state.hubbub.clone().unwrap();
    let f = app.follow("alice", feed(7).with_hub(&hub_url));

    hubbub.subscribe(&f).await.unwrap();
    hub.wait_for_requests(1).await;
    wait_for_active(&hubbub, 1).await;

    hubbub.unsubscribe(&f).await.unwrap();
    hub.wait_for_requests(2).await;

    let response = app
        .get(&verify_uri(&f, "hub.mode=unsubscribe&hub.challenge=bye"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(helpers::body_string(response).await, "bye");
}

#[tokio::test]
async fn test_denied_records_reason() {
    let app = TestApp::with_hubbub().await;
    let f = pending(&app, 7).await;

    let response = app
        .get(&verify_uri(&f, "hub.mode=denied&hub.reason=not%20allowed"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app.store.find_by_id(f.id).await.unwrap().unwrap();
    assert_eq!(stored.subscribe_error.as_deref(), Some("not allowed"));
    let sub = app.store.find_by_feed(f.id).await.unwrap().unwrap();
    assert!(sub.subscription_failure);
    assert!(app.state.hubbub.as_ref().unwrap().active_subscriptions().await.is_empty());
}

#[tokio::test]
async fn test_unparseable_content_is_bad_request() {
    let app = TestApp::with_hubbub().await;
    let f = pending(&app, 7).await;

    assert_eq!(post_content(&app, f.id, "<html>nope").await, StatusCode::BAD_REQUEST);
    assert_eq!(post_content(&app, FeedId(99), RSS).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscribe_then_push_reaches_stream_once() {
    let (hub_url, hub) = spawn_hub(StatusCode::ACCEPTED).await;
    let app = TestApp::with_hubbub().await;
    let f = app.follow("alice", feed(7).with_hub(&hub_url));

    // The poller reports the feed; the manager subscribes with the hub.
    app.state.monitors.feed_updated(&f, &[]).await;
    hub.wait_for_requests(1).await;
    let requests = hub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["hub.mode"], "subscribe");
    assert_eq!(
        requests[0]["hub.callback"],
        "https://reader.example.com/v2/hubbub/7"
    );

    let active = wait_for_active(app.state.hubbub.as_ref().unwrap(), 1).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].feed_id, f.id);
    assert!(!active[0].subscription_failure);

    let response = app.get(&format!("/v2/events?token={}", app.token("alice"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut stream = EventReader::new(response);

    assert_eq!(post_content(&app, f.id, RSS).await, StatusCode::OK);

    let event = stream.expect_event().await;
    assert_eq!(event["type"], "feed-update");
    assert_eq!(event["data"]["feed"]["id"], 7);
    assert_eq!(event["data"]["articles"][0]["title"], "Pushed");

    assert!(matches!(
        stream.next(Duration::from_millis(300)).await,
        NextEvent::Silent
    ));
    // The content push does not trigger a second handshake.
    assert_eq!(hub.requests().len(), 1);
}

#[tokio::test]
async fn test_rejected_handshake_hands_feed_back() {
    let (hub_url, _hub) = spawn_hub(StatusCode::INTERNAL_SERVER_ERROR).await;
    let mut app = TestApp::with_hubbub().await;
    let f = app.follow("alice", feed(3).with_hub(&hub_url));

    app.state.monitors.feed_updated(&f, &[]).await;

    let returned = tokio::time::timeout(Duration::from_secs(3), app.resume.recv())
        .await
        .expect("feed should be handed back")
        .expect("channel open");
    assert_eq!(returned.id, f.id);
    assert!(returned.subscribe_error.is_some());
}
