//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Form, State};
use axum::http::{Request, StatusCode};
use axum::routing::post;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use feedwire_api::AppState;
use feedwire_auth::{JwtDecoder, JwtEncoder, MemoryTokenStore, TokenStore};
use feedwire_core::config::AppConfig;
use feedwire_core::types::FeedId;
use feedwire_database::{FeedRepository, MemoryStore, SubscriptionRepository};
use feedwire_entity::{Feed, FeedMonitors};
use feedwire_hubbub::Hubbub;
use feedwire_realtime::EventHub;

pub const CALLBACK: &str = "https://reader.example.com";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state the router was built from
    pub state: AppState,
    /// Backing store for direct setup and assertions
    pub store: Arc<MemoryStore>,
    /// Token signer sharing the server's secret
    pub encoder: JwtEncoder,
    /// Feeds handed back by the subscription manager
    pub resume: mpsc::Receiver<Feed>,
    /// Process shutdown token
    pub shutdown: CancellationToken,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl TestApp {
    /// Application without push subscriptions.
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    /// Application with push subscriptions enabled.
    pub async fn with_hubbub() -> Self {
        let mut config = AppConfig::default();
        config.hubbub.callback_url = CALLBACK.to_string();
        Self::with_config(config).await
    }

    pub async fn with_config(mut config: AppConfig) -> Self {
        config.auth.jwt_secret = "integration-test-secret".to_string();
        config.realtime.write_timeout_seconds = 2;
        let config = Arc::new(config);

        let shutdown = CancellationToken::new();
        let store = Arc::new(MemoryStore::new());
        let feeds: Arc<dyn FeedRepository> = store.clone();
        let subscriptions: Arc<dyn SubscriptionRepository> = store.clone();

        let token_store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new(&config.auth));
        let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth, token_store));
        let encoder = JwtEncoder::new(&config.auth);

        let events = EventHub::start(&config.realtime, shutdown.clone());

        let (resume_tx, resume) = mpsc::channel(8);
        let hubbub = if config.hubbub.is_configured() {
            let hubbub = Hubbub::start(
                &config,
                Arc::clone(&feeds),
                Arc::clone(&subscriptions),
                resume_tx,
                shutdown.clone(),
            )
            .expect("Failed to start hubbub");
            Some(hubbub)
        } else {
            None
        };

        let mut monitors = FeedMonitors::new();
        if let Some(hubbub) = &hubbub {
            monitors.add(Arc::new(hubbub.clone()));
        }
        monitors.add(Arc::new(events.clone()));

        let state = AppState {
            config,
            jwt_decoder,
            feeds,
            subscriptions,
            events,
            hubbub,
            monitors,
        };

        Self {
            router: feedwire_api::build_router(state.clone()),
            state,
            store,
            encoder,
            resume,
            shutdown,
        }
    }

    /// A valid token for `login`.
    pub fn token(&self, login: &str) -> String {
        self.encoder
            .issue(login, chrono::Duration::hours(1))
            .expect("Failed to issue token")
    }

    /// Store a feed and attach it to `login`.
    pub fn follow(&self, login: &str, feed: Feed) -> Feed {
        self.store.insert_feed(feed.clone());
        self.store.attach_feed(login, feed.id);
        feed
    }

    /// Send a request through the router.
    pub async fn request(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }

    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }
}

pub fn feed(id: i64) -> Feed {
    Feed::new(FeedId(id), format!("https://example.com/{id}.xml"))
}

/// Collect a finite response body as a string.
pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_string(response).await).expect("Body is not JSON")
}

/// Reads server-sent events off a streaming response body.
pub struct EventReader {
    stream: axum::body::BodyDataStream,
}

/// Outcome of waiting for the next event.
#[derive(Debug)]
pub enum NextEvent {
    Event(Value),
    Ended,
    Silent,
}

impl EventReader {
    pub fn new(response: axum::response::Response) -> Self {
        Self {
            stream: response.into_body().into_data_stream(),
        }
    }

    pub async fn next(&mut self, wait: Duration) -> NextEvent {
        match tokio::time::timeout(wait, self.stream.next()).await {
            Err(_) => NextEvent::Silent,
            Ok(None) | Ok(Some(Err(_))) => NextEvent::Ended,
            Ok(Some(Ok(chunk))) => {
                let text = String::from_utf8_lossy(&chunk).into_owned();
                assert!(text.starts_with("data: "), "unexpected frame {text:?}");
                assert!(text.ends_with("\n\n"), "unexpected frame {text:?}");
                let json = text.trim_start_matches("data: ").trim_end();
                NextEvent::Event(serde_json::from_str(json).expect("Frame is not JSON"))
            }
        }
    }

    pub async fn expect_event(&mut self) -> Value {
        match self.next(Duration::from_secs(3)).await {
            NextEvent::Event(value) => value,
            other => panic!("expected an event, got {other:?}"),
        }
    }
}

/// Hub that records handshakes and answers with a configurable status.
#[derive(Clone, Default)]
pub struct MockHub {
    pub requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub status: Arc<AtomicU16>,
    pub delay_ms: Arc<AtomicU64>,
}

impl MockHub {
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn wait_for_requests(&self, count: usize) {
        for _ in 0..150 {
            if self.requests().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

async fn record(State(hub): State<MockHub>, Form(form): Form<HashMap<String, String>>) -> StatusCode {
    hub.requests.lock().unwrap().push(form);
    let delay = hub.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    StatusCode::from_u16(hub.status.load(Ordering::SeqCst)).unwrap()
}

/// Spawn a hub answering every handshake with `status`.
pub async fn spawn_hub(status: StatusCode) -> (String, MockHub) {
    spawn_slow_hub(status, 0).await
}

/// Spawn a hub that answers each handshake `delay_ms` after receiving it.
pub async fn spawn_slow_hub(status: StatusCode, delay_ms: u64) -> (String, MockHub) {
    let hub = MockHub::default();
    hub.status.store(status.as_u16(), Ordering::SeqCst);
    hub.delay_ms.store(delay_ms, Ordering::SeqCst);

    let app = Router::new()
        .route("/hub", post(record))
        .with_state(hub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/hub"), hub)
}
