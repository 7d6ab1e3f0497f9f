//! Shared refresh behaviour, driven by a scripted transport
//!
//! The refresh call is held until the test releases it, so every request
//! is known to be queued before the refresh settles.

use async_trait::async_trait;
use bytes::Bytes;
use kolabo_core::{MemoryStorage, TokenPair};
use kolabo_http::{
    ApiClient, ApiRequest, ApiResponse, ClientError, RefreshError, SessionEnded, Transport,
};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Rejects `A1`, accepts `A2`, and holds the refresh until released
#[derive(Default)]
struct ScriptedTransport {
    release: Notify,
    refresh_calls: AtomicUsize,
    replays: Mutex<Vec<String>>,
    reject_refresh: bool,
}

impl ScriptedTransport {
    fn rejecting_refresh() -> Self {
        Self {
            reject_refresh: true,
            ..Self::default()
        }
    }

    fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        if request.path() == "/auth/refresh" {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            return Ok(if self.reject_refresh {
                ApiResponse::new(
                    StatusCode::UNAUTHORIZED,
                    HeaderMap::new(),
                    Bytes::from_static(br#"{"message":"refresh token revoked"}"#),
                )
            } else {
                ApiResponse::new(
                    StatusCode::OK,
                    HeaderMap::new(),
                    Bytes::from_static(br#"{"access_token":"A2","refresh_token":"R2"}"#),
                )
            });
        }

        if request.bearer() == Some("A2") {
            self.replays.lock().unwrap().push(request.path().to_string());
            Ok(ApiResponse::new(StatusCode::OK, HeaderMap::new(), "{}"))
        } else {
            Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, HeaderMap::new(), ""))
        }
    }
}

struct Fixture {
    transport: Arc<ScriptedTransport>,
    client: ApiClient,
    events: Arc<Mutex<Vec<SessionEnded>>>,
}

impl Fixture {
    fn new(transport: ScriptedTransport) -> Self {
        let transport = Arc::new(transport);
        let events = Arc::new(Mutex::new(Vec::new()));
        let hook = {
            let events = events.clone();
            move |event: &SessionEnded| events.lock().unwrap().push(event.clone())
        };

        let client = ApiClient::builder()
            .base_url("http://kolabo.test/api")
            .storage(Arc::new(MemoryStorage::new()))
            .transport(transport.clone())
            .on_session_end(Arc::new(hook))
            .build()
            .unwrap();
        client.session().establish(TokenPair::new("A1", "R1"));

        Self {
            transport,
            client,
            events,
        }
    }

    fn get(&self, route: &'static str) -> JoinHandle<Result<ApiResponse, ClientError>> {
        let client = self.client.clone();
        tokio::spawn(async move { client.send(client.request(Method::GET, route)).await })
    }

    async fn wait_for_waiters(&self, count: usize) {
        while self.client.session().refresh_waiters() < count {
            tokio::task::yield_now().await;
        }
    }

    async fn wait_for_refresh(&self) {
        while !self.client.session().is_refreshing() {
            tokio::task::yield_now().await;
        }
    }

    fn titles(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.title.clone())
            .collect()
    }
}

#[tokio::test(flavor = "current_thread")]
async fn queued_requests_replay_in_arrival_order() {
    let f = Fixture::new(ScriptedTransport::default());

    let x = f.get("/x");
    f.wait_for_refresh().await;
    let y = f.get("/y");
    f.wait_for_waiters(1).await;
    let z = f.get("/z");
    f.wait_for_waiters(2).await;

    f.transport.release.notify_one();
    for handle in [x, y, z] {
        assert!(handle.await.unwrap().unwrap().is_success());
    }

    assert_eq!(f.transport.refresh_calls(), 1);
    assert_eq!(*f.transport.replays.lock().unwrap(), vec!["/x", "/y", "/z"]);
    assert_eq!(
        f.client.session().tokens().snapshot(),
        TokenPair::new("A2", "R2")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_refresh() {
    let f = Fixture::new(ScriptedTransport::default());

    let first = f.get("/a");
    f.wait_for_refresh().await;
    let others = [f.get("/b"), f.get("/c"), f.get("/d")];
    f.wait_for_waiters(3).await;

    f.transport.release.notify_one();
    assert!(first.await.unwrap().unwrap().is_success());
    for handle in others {
        assert!(handle.await.unwrap().unwrap().is_success());
    }

    assert_eq!(f.transport.refresh_calls(), 1);
    assert_eq!(f.transport.replays.lock().unwrap().len(), 4);
    assert!(!f.client.session().is_refreshing());
    assert!(f.titles().is_empty());
}

#[tokio::test]
async fn failed_refresh_rejects_every_caller_and_ends_session_once() {
    let f = Fixture::new(ScriptedTransport::rejecting_refresh());

    let first = f.get("/a");
    f.wait_for_refresh().await;
    let others = [f.get("/b"), f.get("/c")];
    f.wait_for_waiters(2).await;

    f.transport.release.notify_one();

    let expected = RefreshError::Rejected {
        status: 401,
        message: "refresh token revoked".into(),
    };
    for handle in std::iter::once(first).chain(others) {
        match handle.await.unwrap() {
            Err(ClientError::RefreshFailed(e)) => assert_eq!(e, expected),
            other => panic!("expected refresh failure, got {other:?}"),
        }
    }

    assert_eq!(f.transport.refresh_calls(), 1);
    assert!(f.client.session().tokens().snapshot().is_empty());
    assert_eq!(f.titles(), vec!["Session Ended".to_string()]);

    let events = f.events.lock().unwrap();
    assert_eq!(events[0].message, "Session expired, please login again");
    assert_eq!(events[0].login_route, "/login-register");
    assert_eq!(events[0].delay, Duration::from_millis(40));
}

#[tokio::test(flavor = "current_thread")]
async fn timed_out_leader_hands_refresh_to_queued_request() {
    let f = Fixture::new(ScriptedTransport::default());

    let leader = {
        let client = f.client.clone();
        tokio::spawn(async move {
            tokio::time::timeout(
                Duration::from_millis(50),
                client.send(client.request(Method::GET, "/x")),
            )
            .await
        })
    };
    f.wait_for_refresh().await;
    let follower = f.get("/y");
    f.wait_for_waiters(1).await;

    assert!(leader.await.unwrap().is_err(), "leader should time out");

    // The queued request takes over and issues its own refresh
    while f.transport.refresh_calls() < 2 {
        tokio::task::yield_now().await;
    }
    f.transport.release.notify_one();

    assert!(follower.await.unwrap().unwrap().is_success());
    assert!(!f.client.session().has_terminated());
    assert_eq!(
        f.client.session().tokens().snapshot(),
        TokenPair::new("A2", "R2")
    );
    assert_eq!(*f.transport.replays.lock().unwrap(), vec!["/y"]);
    assert!(f.titles().is_empty());
}

#[tokio::test]
async fn refresh_now_without_refresh_token_ends_session() {
    let transport = Arc::new(ScriptedTransport::default());
    let client = ApiClient::builder()
        .base_url("http://kolabo.test/api")
        .transport(transport.clone())
        .build()
        .unwrap();
    client.session().establish(TokenPair::access_only("A1"));

    let result = client.refresh_now().await;

    assert!(matches!(result, Err(ClientError::RefreshFailed(_))));
    assert_eq!(transport.refresh_calls(), 0);
    assert!(client.session().has_terminated());
    assert!(!client.session().is_authenticated());
}
