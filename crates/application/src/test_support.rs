//! Fakes shared by the application service tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use shopdesk_core::{ApiFailure, AppError, AppResult, AuthMode};

use crate::{
    ApiMethod, ApiRequest, ApiTransport, ClientStorage, KeyValueStore, Notice, Notifier,
    SessionContext,
};

#[derive(Default)]
pub(crate) struct FakeKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl FakeKeyValueStore {
    pub(crate) fn raw(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl KeyValueStore for FakeKeyValueStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

type ScriptedResponses = HashMap<(ApiMethod, String), VecDeque<AppResult<Value>>>;

/// Transport answering from per-route queues; unscripted routes answer 404.
pub(crate) struct ScriptedTransport {
    auth_mode: AuthMode,
    responses: Mutex<ScriptedResponses>,
    requests: Mutex<Vec<ApiRequest>>,
    csrf_requests: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new(auth_mode: AuthMode) -> Self {
        Self {
            auth_mode,
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            csrf_requests: AtomicUsize::new(0),
        }
    }

    pub(crate) fn respond(&self, method: ApiMethod, path: &str, result: AppResult<Value>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(result);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn csrf_requests(&self) -> usize {
        self.csrf_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    async fn send(&self, request: ApiRequest) -> AppResult<Value> {
        let key = (request.method, request.path.clone());
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(api_failure(404)))
    }

    async fn request_csrf_cookie(&self) -> AppResult<()> {
        self.csrf_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn api_failure(status: u16) -> AppError {
    AppError::Api(ApiFailure {
        status,
        message: None,
        field_errors: Vec::new(),
    })
}

pub(crate) struct Harness {
    pub(crate) store: Arc<FakeKeyValueStore>,
    pub(crate) notifier: Arc<RecordingNotifier>,
    pub(crate) context: Arc<SessionContext>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let store = Arc::new(FakeKeyValueStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let context = Arc::new(SessionContext::new(
            ClientStorage::new(store.clone()),
            notifier.clone(),
        ));

        Self {
            store,
            notifier,
            context,
        }
    }
}
