use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use shopdesk_application::{
    ApiMethod, ApiRequest, ApiTransport, ClientStorage, REQUEST_ID_HEADER, UnauthorizedHandler,
};
use shopdesk_core::{ApiFailure, AppError, AppResult, AuthMode, CredentialPair};
use shopdesk_domain::{ACCESS_TOKEN_PATHS, REFRESH_TOKEN_PATHS, first_string};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::single_flight::{Flight, SingleFlight};

/// Connection settings for the admin API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpApiClientConfig {
    /// Bearer tokens or cookie session.
    pub auth_mode: AuthMode,
    /// Base URL for resource calls, without trailing slash.
    pub base_url: String,
    /// Root URL for refresh and CSRF calls, without trailing slash.
    pub api_root_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Refresh endpoint relative to the root URL.
    pub refresh_path: String,
    /// CSRF cookie endpoint relative to the root URL.
    pub csrf_path: String,
}

/// reqwest-backed implementation of the authenticated API pipeline.
///
/// Attaches the stored token as a bearer header in every auth mode, plus a
/// request id. In jwt mode a 401 on a non-exempt request triggers one shared
/// token refresh; every request that failed meanwhile waits for it and is
/// replayed once. A 401 after the session was torn down is returned as-is.
pub struct HttpApiClient {
    http_client: reqwest::Client,
    config: HttpApiClientConfig,
    storage: ClientStorage,
    unauthorized_handler: Arc<dyn UnauthorizedHandler>,
    refresh: SingleFlight<String>,
}

impl HttpApiClient {
    /// Creates the pipeline and its shared HTTP client.
    pub fn new(
        config: HttpApiClientConfig,
        storage: ClientStorage,
        unauthorized_handler: Arc<dyn UnauthorizedHandler>,
    ) -> AppResult<Self> {
        for (name, value) in [
            ("base", config.base_url.as_str()),
            ("root", config.api_root_url.as_str()),
        ] {
            Url::parse(value).map_err(|error| {
                AppError::Validation(format!("invalid API {name} URL '{value}': {error}"))
            })?;
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .cookie_store(!config.auth_mode.uses_bearer_tokens())
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http_client,
            config,
            storage,
            unauthorized_handler,
            refresh: SingleFlight::new(),
        })
    }

    async fn dispatch(&self, request: &ApiRequest, bearer: Option<&str>) -> AppResult<Value> {
        let url = join_url(&self.config.base_url, &request.path, &request.query)?;
        let mut builder = self.http_client.request(http_method(request.method), url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        self.execute(
            builder,
            request.method,
            &request.path,
            request.header(REQUEST_ID_HEADER),
        )
        .await
    }

    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
        method: ApiMethod,
        path: &str,
        request_id: Option<&str>,
    ) -> AppResult<Value> {
        let response = builder.send().await.map_err(|error| {
            debug!(method = method.as_str(), path, request_id, error = %error, "api request failed");
            AppError::Transport(format!("{} {path} failed: {error}", method.as_str()))
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|error| {
            AppError::Transport(format!(
                "{} {path} response could not be read: {error}",
                method.as_str()
            ))
        })?;
        let body = decode_body(&bytes);

        debug!(
            method = method.as_str(),
            path,
            status = status.as_u16(),
            request_id,
            "api request completed"
        );

        if status.is_success() {
            Ok(body)
        } else {
            Err(AppError::Api(ApiFailure::from_response_body(
                status.as_u16(),
                &body,
            )))
        }
    }

    async fn recover(
        &self,
        request: ApiRequest,
        sent_token: Option<String>,
        error: AppError,
    ) -> AppResult<Value> {
        if request.auth_exempt {
            return Err(error);
        }

        if !self.config.auth_mode.uses_bearer_tokens() || request.retried {
            self.unauthorized_handler.on_unauthorized();
            return Err(error);
        }

        let stored_token = self.storage.token();
        if sent_token.is_some() && stored_token.is_none() {
            debug!(path = %request.path, "session ended while request was in flight");
            return Err(error);
        }
        if stored_token.is_some() && stored_token != sent_token {
            debug!(path = %request.path, "token changed while request was in flight; replaying");
            return self.replay(request, stored_token).await;
        }

        let token = match self.refresh.join() {
            Flight::Owner(guard) => {
                let outcome = self.refresh_credentials().await;
                guard.settle(outcome.clone());
                match outcome {
                    Ok(token) => token,
                    Err(refresh_error) => {
                        warn!(error = %refresh_error, "token refresh failed");
                        self.unauthorized_handler.on_unauthorized();
                        return Err(refresh_error);
                    }
                }
            }
            Flight::Waiter(waiter) => waiter.outcome().await?,
        };

        self.replay(request, Some(token)).await
    }

    async fn replay(&self, mut request: ApiRequest, token: Option<String>) -> AppResult<Value> {
        request.retried = true;
        match self.dispatch(&request, token.as_deref()).await {
            Err(error) if error.is_unauthenticated() => {
                self.unauthorized_handler.on_unauthorized();
                Err(error)
            }
            result => result,
        }
    }

    async fn refresh_credentials(&self) -> AppResult<String> {
        let body = match self.storage.refresh_token() {
            Some(refresh_token) => json!({ "refresh_token": refresh_token }),
            None => json!({}),
        };
        let url = join_url(&self.config.api_root_url, &self.config.refresh_path, &[])?;
        let builder = self.http_client.post(url).json(&body);

        let response = self
            .execute(builder, ApiMethod::Post, &self.config.refresh_path, None)
            .await?;

        let access_token = first_string(&response, ACCESS_TOKEN_PATHS).ok_or_else(|| {
            AppError::Unauthorized("refresh response did not include an access token".to_owned())
        })?;
        let credentials =
            CredentialPair::new(access_token, first_string(&response, REFRESH_TOKEN_PATHS))?;
        self.storage.store_credentials(&credentials);

        info!("access token refreshed");
        Ok(credentials.access_token().to_owned())
    }
}

#[async_trait]
impl ApiTransport for HttpApiClient {
    fn auth_mode(&self) -> AuthMode {
        self.config.auth_mode
    }

    async fn send(&self, request: ApiRequest) -> AppResult<Value> {
        let request = if request.header(REQUEST_ID_HEADER).is_some() {
            request
        } else {
            request.with_header(REQUEST_ID_HEADER, Uuid::new_v4().to_string())
        };

        let sent_token = self.storage.token();
        match self.dispatch(&request, sent_token.as_deref()).await {
            Err(error) if error.is_unauthenticated() => {
                self.recover(request, sent_token, error).await
            }
            result => result,
        }
    }

    async fn request_csrf_cookie(&self) -> AppResult<()> {
        if self.config.auth_mode != AuthMode::Sanctum {
            return Ok(());
        }

        let url = join_url(&self.config.api_root_url, &self.config.csrf_path, &[])?;
        self.execute(
            self.http_client.get(url),
            ApiMethod::Get,
            &self.config.csrf_path,
            None,
        )
        .await?;
        Ok(())
    }
}

fn http_method(method: ApiMethod) -> reqwest::Method {
    match method {
        ApiMethod::Get => reqwest::Method::GET,
        ApiMethod::Post => reqwest::Method::POST,
        ApiMethod::Put => reqwest::Method::PUT,
        ApiMethod::Patch => reqwest::Method::PATCH,
        ApiMethod::Delete => reqwest::Method::DELETE,
    }
}

fn join_url(root: &str, path: &str, query: &[(String, String)]) -> AppResult<Url> {
    let mut url = Url::parse(&format!("{}{path}", root.trim_end_matches('/')))
        .map_err(|error| AppError::Validation(format!("invalid request path '{path}': {error}")))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    Ok(url)
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }

    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests;
