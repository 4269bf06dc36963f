use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use shopdesk_core::{AppError, AuthMode};
use shopdesk_infrastructure::HttpApiClientConfig;
use tracing_subscriber::EnvFilter;

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
const DEFAULT_CSRF_PATH: &str = "/sanctum/csrf-cookie";
const DEFAULT_STATE_PATH: &str = ".shopdesk/state.json";

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub api: HttpApiClientConfig,
    pub state_path: PathBuf,
}

impl ConsoleConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let auth_mode = optional("API_AUTH_MODE")
            .map(|value| AuthMode::from_str(&value))
            .transpose()?
            .unwrap_or_default();

        let timeout_ms = match optional("API_TIMEOUT_MS") {
            Some(value) => value.parse::<u64>().map_err(|error| {
                AppError::Validation(format!("invalid API_TIMEOUT_MS '{value}': {error}"))
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };
        if timeout_ms == 0 {
            return Err(AppError::Validation(
                "API_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        let base_url = match lookup("API_BASE_URL") {
            Some(value) => value.trim().trim_end_matches('/').to_owned(),
            None => DEFAULT_BASE_URL.to_owned(),
        };
        if base_url.is_empty() {
            return Err(AppError::Validation(
                "API_BASE_URL must not be empty".to_owned(),
            ));
        }

        let api_root_url = optional("API_ROOT_URL")
            .map(|value| value.trim_end_matches('/').to_owned())
            .unwrap_or_else(|| api_root_from_base(&base_url));

        Ok(Self {
            api: HttpApiClientConfig {
                auth_mode,
                base_url,
                api_root_url,
                timeout: Duration::from_millis(timeout_ms),
                refresh_path: endpoint_path(optional("AUTH_REFRESH_PATH"), DEFAULT_REFRESH_PATH),
                csrf_path: endpoint_path(optional("SANCTUM_CSRF_PATH"), DEFAULT_CSRF_PATH),
            },
            state_path: optional("CONSOLE_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn api_root_from_base(base_url: &str) -> String {
    base_url
        .strip_suffix("/admin")
        .unwrap_or(base_url)
        .to_owned()
}

fn endpoint_path(value: Option<String>, default: &str) -> String {
    match value {
        Some(path) if path.starts_with('/') => path,
        Some(path) => format!("/{path}"),
        None => default.to_owned(),
    }
}
