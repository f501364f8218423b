use common::{
    AdminAction, AdminStats, AdminUser, ApiKeyRecord, ApiService, Toast, ADMIN_ADJUSTMENT_REASON,
    ADMIN_USERS_LIMIT,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Mutex;
use thiserror::Error;

use crate::resource::{Phase, Resource};
use crate::session::SessionContext;
use crate::views::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminTab {
    #[default]
    Stats,
    Users,
    ApiKeys,
}

impl AdminTab {
    pub const ALL: [AdminTab; 3] = [AdminTab::Stats, AdminTab::Users, AdminTab::ApiKeys];

    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "users" => Self::Users,
            "api-keys" => Self::ApiKeys,
            _ => Self::Stats,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::Users => "users",
            Self::ApiKeys => "api-keys",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Stats => "Statistics",
            Self::Users => "Users",
            Self::ApiKeys => "API Keys",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdminError {
    #[error("Please select user and enter amount")]
    MissingSelection,
    #[error("Credits must be a whole number")]
    InvalidAmount,
    #[error("Please enter an API key")]
    MissingApiKey,
    #[error("Unknown service")]
    UnknownService,
    #[error("Failed to fetch stats")]
    FetchStats,
    #[error("Failed to fetch users")]
    FetchUsers,
    #[error("Failed to fetch API keys")]
    FetchApiKeys,
    #[error("Failed to update credits")]
    UpdateCredits,
    #[error("Failed to update API key")]
    UpsertApiKey,
}

#[derive(Debug, Clone, Default)]
pub struct AdminState {
    pub active_tab: AdminTab,
    pub stats: Resource<AdminStats>,
    pub users: Resource<Vec<AdminUser>>,
    pub api_keys: Resource<Vec<ApiKeyRecord>>,
    pub selected_user: Option<AdminUser>,
    pub credit_input: String,
}

impl AdminState {
    fn phase(&self, tab: AdminTab) -> Phase {
        match tab {
            AdminTab::Stats => self.stats.phase(),
            AdminTab::Users => self.users.phase(),
            AdminTab::ApiKeys => self.api_keys.phase(),
        }
    }

    pub fn api_key(&self, service: ApiService) -> Option<&ApiKeyRecord> {
        self.api_keys
            .data()?
            .iter()
            .find(|k| k.service_name == service.as_str())
    }
}

pub enum Access {
    Granted(SessionContext),
    Unauthenticated,
    Forbidden,
}

/// Client-side gate for the admin view. The backend repeats the check on
/// every admin operation.
pub fn check_access(ctx: Option<SessionContext>) -> Access {
    match ctx {
        None => Access::Unauthenticated,
        Some(ctx) if ctx.is_admin() => Access::Granted(ctx),
        Some(_) => Access::Forbidden,
    }
}

fn stats_of(s: &mut AdminState) -> &mut Resource<AdminStats> {
    &mut s.stats
}

fn users_of(s: &mut AdminState) -> &mut Resource<Vec<AdminUser>> {
    &mut s.users
}

fn api_keys_of(s: &mut AdminState) -> &mut Resource<Vec<ApiKeyRecord>> {
    &mut s.api_keys
}

fn decode<T: DeserializeOwned + Default>(data: Option<Value>) -> anyhow::Result<T> {
    match data {
        None => Ok(T::default()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

async fn fetch_into<T>(
    ctx: &SessionContext,
    state: &Mutex<AdminState>,
    action: AdminAction,
    slot: fn(&mut AdminState) -> &mut Resource<T>,
    failure: AdminError,
) -> Result<(), AdminError>
where
    T: DeserializeOwned + Default,
{
    let ticket = slot(&mut lock(state)).begin();
    let outcome = match ctx.service().admin_operation(&ctx.user, &action).await {
        Ok(data) => decode::<T>(data),
        Err(e) => Err(e),
    };
    let mut guard = lock(state);
    let resource = slot(&mut guard);
    match outcome {
        Ok(value) => {
            if !resource.complete(ticket, value) {
                log::debug!("Discarding stale response for {:?}", action);
            }
            Ok(())
        }
        Err(e) => {
            log::error!("admin-operations {:?} failed: {e:#}", action);
            resource.fail(ticket);
            Err(failure)
        }
    }
}

async fn fetch(
    ctx: &SessionContext,
    state: &Mutex<AdminState>,
    tab: AdminTab,
) -> Result<(), AdminError> {
    match tab {
        AdminTab::Stats => {
            fetch_into(ctx, state, AdminAction::GetStats, stats_of, AdminError::FetchStats).await
        }
        AdminTab::Users => {
            fetch_into(
                ctx,
                state,
                AdminAction::GetUsers {
                    limit: ADMIN_USERS_LIMIT,
                },
                users_of,
                AdminError::FetchUsers,
            )
            .await
        }
        AdminTab::ApiKeys => {
            fetch_into(
                ctx,
                state,
                AdminAction::GetApiKeys,
                api_keys_of,
                AdminError::FetchApiKeys,
            )
            .await
        }
    }
}

/// Switches to `tab`, fetching its data only if it has never been fetched.
pub async fn activate(
    ctx: &SessionContext,
    state: &Mutex<AdminState>,
    tab: AdminTab,
    notices: &mut Vec<Toast>,
) {
    let needs_fetch = {
        let mut s = lock(state);
        s.active_tab = tab;
        s.phase(tab) == Phase::NotFetched
    };
    if needs_fetch {
        if let Err(e) = fetch(ctx, state, tab).await {
            notices.push(Toast::error(e));
        }
    }
}

/// Manual refresh: always refetches.
pub async fn refresh(
    ctx: &SessionContext,
    state: &Mutex<AdminState>,
    tab: AdminTab,
    notices: &mut Vec<Toast>,
) {
    lock(state).active_tab = tab;
    if let Err(e) = fetch(ctx, state, tab).await {
        notices.push(Toast::error(e));
    }
}

/// Opens the credit editor for a listed user. Returns false if the id is
/// not in the loaded list.
pub fn select_user(state: &Mutex<AdminState>, user_id: &str) -> bool {
    let mut s = lock(state);
    let found = s
        .users
        .data()
        .and_then(|users| users.iter().find(|u| u.id == user_id))
        .cloned();
    s.active_tab = AdminTab::Users;
    s.credit_input.clear();
    s.selected_user = found;
    s.selected_user.is_some()
}

pub fn cancel_edit(state: &Mutex<AdminState>) {
    let mut s = lock(state);
    s.selected_user = None;
    s.credit_input.clear();
}

/// Overwrites the selected user's balance with `amount`.
///
/// This is an absolute set, not a delta. On success the editor closes and
/// the user list is refetched.
pub async fn update_credits(
    ctx: &SessionContext,
    state: &Mutex<AdminState>,
    amount: &str,
    notices: &mut Vec<Toast>,
) -> bool {
    let amount = amount.trim();
    let selected = {
        let mut s = lock(state);
        s.credit_input = amount.to_string();
        s.selected_user.clone()
    };
    let Some(user) = selected.filter(|_| !amount.is_empty()) else {
        notices.push(Toast::error(AdminError::MissingSelection));
        return false;
    };
    let Ok(credits) = amount.parse::<i64>() else {
        notices.push(Toast::error(AdminError::InvalidAmount));
        return false;
    };

    let action = AdminAction::UpdateUserCredits {
        user_id: user.id.clone(),
        credits,
        reason: ADMIN_ADJUSTMENT_REASON.to_string(),
    };
    if let Err(e) = ctx.service().admin_operation(&ctx.user, &action).await {
        log::error!("Failed to update credits for {}: {e:#}", user.id);
        notices.push(Toast::error(AdminError::UpdateCredits));
        return false;
    }

    log::info!(
        "{} set credits of {} from {} to {}",
        ctx.user.id,
        user.id,
        user.credits,
        credits
    );
    notices.push(Toast::success("Credits updated successfully"));
    cancel_edit(state);
    if let Err(e) = fetch(ctx, state, AdminTab::Users).await {
        notices.push(Toast::error(e));
    }
    true
}

/// Stores a provider key. The key itself is never kept or echoed back.
pub async fn upsert_api_key(
    ctx: &SessionContext,
    state: &Mutex<AdminState>,
    service: &str,
    api_key: &str,
    notices: &mut Vec<Toast>,
) -> bool {
    let Some(service) = ApiService::parse(service) else {
        notices.push(Toast::error(AdminError::UnknownService));
        return false;
    };
    if api_key.trim().is_empty() {
        notices.push(Toast::error(AdminError::MissingApiKey));
        return false;
    }

    let action = AdminAction::UpsertApiKey {
        service: service.as_str().to_string(),
        api_key: api_key.to_string(),
    };
    if let Err(e) = ctx.service().admin_operation(&ctx.user, &action).await {
        log::error!("Failed to update {} API key: {e:#}", service.as_str());
        notices.push(Toast::error(AdminError::UpsertApiKey));
        return false;
    }

    notices.push(Toast::success(format!("{} API key updated", service.as_str())));
    lock(state).active_tab = AdminTab::ApiKeys;
    if let Err(e) = fetch(ctx, state, AdminTab::ApiKeys).await {
        notices.push(Toast::error(e));
    }
    true
}
