//! Shopdesk admin console composition root.

#![forbid(unsafe_code)]

mod console_command;
mod console_config;

use std::env;
use std::sync::Arc;

use serde_json::{Value, json};
use shopdesk_application::{
    ApiTransport, AuthorizationGate, ClientStorage, DenialContext, GuardDecision, LANDING_ROUTE,
    LOGIN_ROUTE, ListLoader, LoadOutcome, LoginOutcome, ResourceAction, ResourceKind,
    ResourceService, RouteGuard, SessionContext, SessionService, post_login_destination,
};
use shopdesk_core::{AppError, LoginCredentials};
use shopdesk_domain::{ListQuery, SessionSnapshot, group_permissions};
use shopdesk_infrastructure::{FileKeyValueStore, HttpApiClient, TracingNotifier};
use tracing::info;

use crate::console_command::{ConsoleCommand, ThemeChange};
use crate::console_config::{ConsoleConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = ConsoleCommand::parse(&args)?;
    let config = ConsoleConfig::load()?;

    let storage = ClientStorage::new(Arc::new(FileKeyValueStore::open(&config.state_path)?));
    let context = Arc::new(SessionContext::new(
        storage.clone(),
        Arc::new(TracingNotifier::new()),
    ));
    let transport: Arc<dyn ApiTransport> = Arc::new(HttpApiClient::new(
        config.api.clone(),
        storage.clone(),
        context.clone(),
    )?);

    let sessions = SessionService::new(context.clone(), transport.clone());
    let gate = AuthorizationGate::new(context);
    let console = Console {
        sessions,
        guard: RouteGuard::new(gate.clone()),
        gate,
        resources: ResourceService::new(transport),
        storage,
    };

    info!(
        auth_mode = config.api.auth_mode.as_str(),
        base_url = %config.api.base_url,
        state_path = %config.state_path.display(),
        "console starting"
    );
    console.sessions.hydrate().await;

    let output = console.run(command).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&output).map_err(|error| {
            AppError::Internal(format!("failed to render console output: {error}"))
        })?
    );

    Ok(())
}

struct Console {
    sessions: SessionService,
    gate: AuthorizationGate,
    guard: RouteGuard,
    resources: ResourceService,
    storage: ClientStorage,
}

impl Console {
    async fn run(&self, command: ConsoleCommand) -> Result<Value, AppError> {
        match command {
            ConsoleCommand::Login { email, password } => {
                let credentials = LoginCredentials::new(email, password)?;
                match self.sessions.login(&credentials).await {
                    LoginOutcome::Ok => Ok(json!({
                        "session": session_json(&self.sessions.snapshot()),
                        "destination": post_login_destination(None),
                    })),
                    LoginOutcome::Failed { message } => Err(AppError::Unauthorized(message)),
                }
            }
            ConsoleCommand::Logout => {
                self.sessions.logout().await;
                Ok(session_json(&self.sessions.snapshot()))
            }
            ConsoleCommand::WhoAmI => Ok(session_json(&self.sessions.snapshot())),
            ConsoleCommand::List { kind, search } => {
                self.require(kind, ResourceAction::View)?;
                let query = ListQuery {
                    search,
                    ..ListQuery::default()
                };

                let loader = ListLoader::new();
                match loader.load(self.resources.list(kind, &query)).await {
                    LoadOutcome::Applied(page) if kind == ResourceKind::Permissions => Ok(json!({
                        "groups": group_permissions(&page.items),
                        "meta": page.meta,
                    })),
                    LoadOutcome::Applied(page) => to_json(&page),
                    LoadOutcome::Failed(error) => Err(error),
                    LoadOutcome::Superseded => Ok(Value::Null),
                }
            }
            ConsoleCommand::Show { kind, id } => {
                self.require(kind, ResourceAction::View)?;
                self.resources.get(kind, &id).await
            }
            ConsoleCommand::Open { path } => Ok(match self.guard.guard(&path) {
                GuardDecision::Loading => json!({"decision": "loading"}),
                GuardDecision::RedirectToLogin { from } => {
                    json!({"decision": "redirect", "to": LOGIN_ROUTE, "from": from})
                }
                GuardDecision::RedirectToLanding => {
                    json!({"decision": "redirect", "to": LANDING_ROUTE})
                }
                GuardDecision::Render => json!({"decision": "render", "path": path}),
            }),
            ConsoleCommand::Audit => to_json(&self.storage.audit_log()),
            ConsoleCommand::Theme(change) => {
                let theme = match change {
                    None => return Ok(json!({"theme": self.storage.theme().as_str()})),
                    Some(ThemeChange::Set(theme)) => theme,
                    Some(ThemeChange::Toggle) => self.storage.theme().toggled(),
                };
                self.storage.set_theme(theme);
                Ok(json!({"theme": theme.as_str()}))
            }
        }
    }

    fn require(&self, kind: ResourceKind, action: ResourceAction) -> Result<(), AppError> {
        let Some(permission) = kind.permission(action) else {
            return Ok(());
        };

        let denial = DenialContext::for_action(permission.as_str());
        if self.gate.assert_permission(&[permission.as_str()], &denial) {
            Ok(())
        } else {
            Err(AppError::Forbidden(denial.denied_message))
        }
    }
}

fn session_json(snapshot: &SessionSnapshot) -> Value {
    json!({
        "phase": snapshot.phase().as_str(),
        "user": snapshot.user_payload(),
        "roles": snapshot.roles(),
        "permissions": snapshot.permissions(),
        "superAdmin": snapshot.is_super_admin(),
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|error| AppError::Internal(format!("failed to encode console output: {error}")))
}
