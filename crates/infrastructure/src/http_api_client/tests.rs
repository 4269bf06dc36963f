use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shopdesk_application::{
    ApiMethod, ApiRequest, ApiTransport, ClientStorage, Notice, Notifier, REQUEST_ID_HEADER,
    SESSION_EXPIRED_MESSAGE, SessionContext, UnauthorizedHandler,
};
use shopdesk_core::{AppError, AuthMode};
use shopdesk_domain::SessionPhase;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::InMemoryKeyValueStore;

use super::{HttpApiClient, HttpApiClientConfig};

const FRESH_TOKEN: &str = "fresh-token";

#[derive(Default)]
struct MockApi {
    refresh_succeeds: bool,
    expected_failures: usize,
    resource_hits: AtomicUsize,
    refresh_calls: AtomicUsize,
    csrf_calls: AtomicUsize,
    request_ids: Mutex<Vec<String>>,
    authorization_headers: Mutex<Vec<Option<String>>>,
    teardown: Mutex<Option<ClientStorage>>,
}

impl MockApi {
    fn record(&self, headers: &HeaderMap) -> Option<String> {
        let authorization = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        if let Some(request_id) = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            self.request_ids
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request_id.to_owned());
        }
        self.authorization_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(authorization.clone());
        self.resource_hits.fetch_add(1, Ordering::SeqCst);
        authorization
    }

    fn request_ids(&self) -> Vec<String> {
        self.request_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn unauthenticated() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Unauthenticated."})),
    )
}

async fn list_users(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let authorization = api.record(&headers);
    if authorization == Some(format!("Bearer {FRESH_TOKEN}")) {
        (StatusCode::OK, Json(json!({"data": [{"id": 1}]})))
    } else {
        unauthenticated()
    }
}

async fn always_unauthorized(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    api.record(&headers);
    unauthenticated()
}

async fn session_ended(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    api.record(&headers);
    if let Some(storage) = api
        .teardown
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        storage.clear_session();
    }
    unauthenticated()
}

async fn refresh(State(api): State<Arc<MockApi>>) -> (StatusCode, Json<Value>) {
    api.refresh_calls.fetch_add(1, Ordering::SeqCst);
    for _ in 0..200 {
        if api.resource_hits.load(Ordering::SeqCst) >= api.expected_failures {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    if api.refresh_succeeds {
        (
            StatusCode::OK,
            Json(json!({"data": {"access_token": FRESH_TOKEN, "refresh_token": "refresh-2"}})),
        )
    } else {
        unauthenticated()
    }
}

async fn csrf_cookie(State(api): State<Arc<MockApi>>) -> StatusCode {
    api.csrf_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

async fn spawn_api(api: Arc<MockApi>) -> String {
    let router = Router::new()
        .route("/api/v1/admin/users", get(list_users))
        .route("/api/v1/admin/reports", get(always_unauthorized))
        .route("/api/v1/admin/session-ended", get(session_ended))
        .route("/api/v1/admin/auth/login", post(always_unauthorized))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/sanctum/csrf-cookie", get(csrf_cookie))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await;
    assert!(listener.is_ok());
    let listener = listener.unwrap_or_else(|_| unreachable!());
    let address = listener.local_addr();
    assert!(address.is_ok());
    let address = address.unwrap_or_else(|_| unreachable!());

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    format!("http://{address}/api/v1")
}

#[derive(Default)]
struct CountingHandler {
    calls: AtomicUsize,
}

impl UnauthorizedHandler for CountingHandler {
    fn on_unauthorized(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

fn storage_with_token(token: &str) -> ClientStorage {
    let storage = ClientStorage::new(Arc::new(InMemoryKeyValueStore::new()));
    storage.set_token(token);
    storage.set_refresh_token("refresh-1");
    storage
}

fn client(
    root: &str,
    auth_mode: AuthMode,
    storage: ClientStorage,
    handler: Arc<dyn UnauthorizedHandler>,
) -> Arc<HttpApiClient> {
    let client = HttpApiClient::new(
        HttpApiClientConfig {
            auth_mode,
            base_url: format!("{root}/admin"),
            api_root_url: root.to_owned(),
            timeout: Duration::from_secs(5),
            refresh_path: "/auth/refresh".to_owned(),
            csrf_path: "/sanctum/csrf-cookie".to_owned(),
        },
        storage,
        handler,
    );
    assert!(client.is_ok());
    Arc::new(client.unwrap_or_else(|_| unreachable!()))
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let api = Arc::new(MockApi {
        refresh_succeeds: true,
        expected_failures: 4,
        ..MockApi::default()
    });
    let root = spawn_api(api.clone()).await;
    let storage = storage_with_token("stale-token");
    let handler = Arc::new(CountingHandler::default());
    let client = client(&root, AuthMode::Jwt, storage.clone(), handler.clone());

    let mut requests = JoinSet::new();
    for _ in 0..4 {
        let client = client.clone();
        requests.spawn(async move { client.send(ApiRequest::get("/users")).await });
    }
    let results = requests.join_all().await;

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    assert_eq!(storage.token().as_deref(), Some(FRESH_TOKEN));
    assert_eq!(storage.refresh_token().as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn failed_refresh_rejects_waiters_and_expires_session_once() {
    let api = Arc::new(MockApi {
        refresh_succeeds: false,
        expected_failures: 3,
        ..MockApi::default()
    });
    let root = spawn_api(api.clone()).await;
    let storage = storage_with_token("stale-token");
    let notifier = Arc::new(RecordingNotifier::default());
    let context = Arc::new(SessionContext::new(storage.clone(), notifier.clone()));
    let client = client(&root, AuthMode::Jwt, storage.clone(), context.clone());

    let mut requests = JoinSet::new();
    for _ in 0..3 {
        let client = client.clone();
        requests.spawn(async move { client.send(ApiRequest::get("/users")).await });
    }
    let results = requests.join_all().await;

    assert!(
        results
            .iter()
            .all(|result| matches!(result, Err(error) if error.status() == Some(401)))
    );
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(context.snapshot().phase(), SessionPhase::Anonymous);
    assert_eq!(storage.token(), None);

    let notices = notifier
        .notices
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, SESSION_EXPIRED_MESSAGE);
}

#[tokio::test]
async fn request_id_is_generated_once_and_kept_on_replay() {
    let api = Arc::new(MockApi {
        refresh_succeeds: true,
        expected_failures: 1,
        ..MockApi::default()
    });
    let root = spawn_api(api.clone()).await;
    let handler = Arc::new(CountingHandler::default());
    let client = client(
        &root,
        AuthMode::Jwt,
        storage_with_token("stale-token"),
        handler,
    );

    let result = client.send(ApiRequest::get("/users")).await;

    assert!(matches!(result, Ok(ref body) if body["data"][0]["id"] == 1));
    let request_ids = api.request_ids();
    assert_eq!(request_ids.len(), 2);
    assert_eq!(request_ids[0], request_ids[1]);
    assert!(Uuid::parse_str(&request_ids[0]).is_ok());
}

#[tokio::test]
async fn caller_supplied_request_id_is_preserved() {
    let api = Arc::new(MockApi::default());
    let root = spawn_api(api.clone()).await;
    let handler = Arc::new(CountingHandler::default());
    let client = client(&root, AuthMode::Jwt, storage_with_token(FRESH_TOKEN), handler);

    let result = client
        .send(ApiRequest::get("/users").with_header("x-request-id", "trace-42"))
        .await;

    assert!(result.is_ok());
    assert_eq!(api.request_ids(), ["trace-42"]);
}

#[tokio::test]
async fn exempt_request_returns_unauthorized_without_refresh() {
    let api = Arc::new(MockApi::default());
    let root = spawn_api(api.clone()).await;
    let handler = Arc::new(CountingHandler::default());
    let client = client(
        &root,
        AuthMode::Jwt,
        storage_with_token("stale-token"),
        handler.clone(),
    );

    let result = client
        .send(
            ApiRequest::new(ApiMethod::Post, "/auth/login")
                .with_body(json!({"email": "a@b.co", "password": "wrong"}))
                .exempt_from_auth(),
        )
        .await;

    assert!(matches!(
        result,
        Err(AppError::Api(ref failure))
            if failure.status == 401 && failure.message.as_deref() == Some("Unauthenticated.")
    ));
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cookie_mode_sends_stored_bearer_and_skips_refresh() {
    let api = Arc::new(MockApi::default());
    let root = spawn_api(api.clone()).await;
    let handler = Arc::new(CountingHandler::default());
    let client = client(
        &root,
        AuthMode::Sanctum,
        storage_with_token("sanctum-token"),
        handler.clone(),
    );

    let result = client.send(ApiRequest::get("/reports")).await;

    assert!(matches!(result, Err(ref error) if error.is_unauthenticated()));
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    let authorization = api
        .authorization_headers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    assert_eq!(authorization, [Some("Bearer sanctum-token".to_owned())]);
}

#[tokio::test]
async fn unauthorized_after_session_teardown_neither_refreshes_nor_notifies() {
    let storage = storage_with_token("stale-token");
    let api = Arc::new(MockApi {
        teardown: Mutex::new(Some(storage.clone())),
        ..MockApi::default()
    });
    let root = spawn_api(api.clone()).await;
    let handler = Arc::new(CountingHandler::default());
    let client = client(&root, AuthMode::Jwt, storage.clone(), handler.clone());

    let result = client.send(ApiRequest::get("/session-ended")).await;

    assert!(matches!(result, Err(ref error) if error.is_unauthenticated()));
    assert_eq!(storage.token(), None);
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn replay_that_fails_again_calls_handler() {
    let api = Arc::new(MockApi {
        refresh_succeeds: true,
        expected_failures: 1,
        ..MockApi::default()
    });
    let root = spawn_api(api.clone()).await;
    let handler = Arc::new(CountingHandler::default());
    let client = client(
        &root,
        AuthMode::Jwt,
        storage_with_token("stale-token"),
        handler.clone(),
    );

    let result = client.send(ApiRequest::get("/reports")).await;

    assert!(matches!(result, Err(ref error) if error.is_unauthenticated()));
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.resource_hits.load(Ordering::SeqCst), 2);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn csrf_cookie_is_requested_only_in_cookie_mode() {
    let api = Arc::new(MockApi::default());
    let root = spawn_api(api.clone()).await;
    let handler: Arc<dyn UnauthorizedHandler> = Arc::new(CountingHandler::default());
    let jwt = client(
        &root,
        AuthMode::Jwt,
        storage_with_token(FRESH_TOKEN),
        handler.clone(),
    );
    let sanctum = client(&root, AuthMode::Sanctum, storage_with_token(FRESH_TOKEN), handler);

    assert!(jwt.request_csrf_cookie().await.is_ok());
    assert!(sanctum.request_csrf_cookie().await.is_ok());

    assert_eq!(api.csrf_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_api_maps_to_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0");
    assert!(listener.is_ok());
    let address = listener
        .and_then(|listener| listener.local_addr())
        .unwrap_or_else(|_| unreachable!());
    let handler = Arc::new(CountingHandler::default());
    let client = client(
        &format!("http://{address}/api/v1"),
        AuthMode::Jwt,
        storage_with_token(FRESH_TOKEN),
        handler,
    );

    let result = client.send(ApiRequest::get("/users")).await;

    assert!(matches!(result, Err(AppError::Transport(_))));
}
