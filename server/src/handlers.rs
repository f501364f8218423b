use axum::extract::{Form, Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use common::{Toast, ToolTab};
use myerrors::AppError;
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use crate::admin::{self, check_access, Access, AdminState, AdminTab};
use crate::dashboard::{self, DashboardState};
use crate::notify;
use crate::pages::{self, make_path};
use crate::service::PlatformService;
use crate::session::SessionContext;
use crate::views::{lock, ViewStore};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn PlatformService>,
    pub base_path: String,
    pub dashboards: Arc<ViewStore<DashboardState>>,
    pub admin_views: Arc<ViewStore<AdminState>>,
}

impl AppState {
    pub fn new(service: Arc<dyn PlatformService>, base_path: String) -> Self {
        Self {
            service,
            base_path,
            dashboards: Arc::new(ViewStore::default()),
            admin_views: Arc::new(ViewStore::default()),
        }
    }

    fn redirect(&self, suffix: &str) -> Response {
        Redirect::to(&make_path(&self.base_path, suffix)).into_response()
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct TabParams {
    pub tab: Option<String>,
}

#[derive(Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub tab: String,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Deserialize)]
pub struct RefreshForm {
    #[serde(default)]
    pub tab: String,
}

#[derive(Deserialize)]
pub struct CreditsForm {
    #[serde(default)]
    pub credits: String,
}

#[derive(Deserialize)]
pub struct ApiKeyForm {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub api_key: String,
}

async fn require_login(session: &Session, state: &AppState) -> Result<SessionContext, Response> {
    match SessionContext::load(session, state.service.clone()).await {
        Ok(Some(ctx)) => Ok(ctx),
        Ok(None) => Err(state.redirect("/login")),
        Err(e) => Err(AppError(e).into_response()),
    }
}

async fn require_admin(session: &Session, state: &AppState) -> Result<SessionContext, Response> {
    let mut ctx = match SessionContext::load(session, state.service.clone()).await {
        Ok(ctx) => ctx,
        Err(e) => return Err(AppError(e).into_response()),
    };
    if let Some(ctx) = ctx.as_mut() {
        if let Err(e) = ctx.sync_profile(session).await {
            return Err(AppError(e).into_response());
        }
    }
    match check_access(ctx) {
        Access::Granted(ctx) => Ok(ctx),
        Access::Unauthenticated => Err(state.redirect("/login")),
        Access::Forbidden => {
            if let Err(e) = notify::push(session, Toast::error("Access denied")).await {
                return Err(AppError(e).into_response());
            }
            Err(state.redirect("/dashboard"))
        }
    }
}

fn admin_tab_path(tab: AdminTab) -> String {
    format!("/admin?tab={}", tab.as_str())
}

pub async fn root(State(state): State<AppState>) -> Response {
    state.redirect("/dashboard")
}

pub async fn login_page(
    session: Session,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if SessionContext::load(&session, state.service.clone())
        .await?
        .is_some()
    {
        return Ok(state.redirect("/dashboard"));
    }
    let toasts = notify::take(&session).await?;
    Ok(Html(pages::login::render(&state.base_path, "", toasts)).into_response())
}

pub async fn login(
    session: Session,
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let email = form.email.trim();
    match state.service.sign_in(email, &form.password).await {
        Ok(user) => {
            let ctx = SessionContext::establish(&session, state.service.clone(), user).await?;
            log::info!("{} signed in", ctx.user.email);
            Ok(state.redirect("/dashboard"))
        }
        Err(e) => {
            log::warn!("Sign-in failed for {}: {e:#}", email);
            let mut toasts = notify::take(&session).await?;
            toasts.push(Toast::error(e));
            Ok(Html(pages::login::render(&state.base_path, email, toasts)).into_response())
        }
    }
}

pub async fn logout(session: Session, State(state): State<AppState>) -> Result<Response, AppError> {
    if let Some(ctx) = SessionContext::load(&session, state.service.clone()).await? {
        state.dashboards.remove(&ctx.user.id);
        state.admin_views.remove(&ctx.user.id);
        log::info!("{} signed out", ctx.user.email);
        ctx.sign_out(&session).await?;
    }
    Ok(state.redirect("/login"))
}

pub async fn dashboard(
    session: Session,
    State(state): State<AppState>,
    Query(params): Query<TabParams>,
) -> Result<Response, AppError> {
    let mut ctx = match require_login(&session, &state).await {
        Ok(ctx) => ctx,
        Err(redirect) => return Ok(redirect),
    };
    ctx.sync_profile(&session).await?;

    let view = state.dashboards.get(&ctx.user.id);
    if let Some(tab) = params.tab.as_deref() {
        lock(&view).active_tab = ToolTab::parse_or_default(tab);
    }
    dashboard::refresh_history(&ctx, &view).await;

    let toasts = notify::take(&session).await?;
    let snapshot = lock(&view).clone();
    Ok(Html(pages::dashboard::render(
        &state.base_path,
        &ctx,
        &snapshot,
        "",
        toasts,
    ))
    .into_response())
}

pub async fn generate(
    session: Session,
    State(state): State<AppState>,
    Form(form): Form<GenerateForm>,
) -> Result<Response, AppError> {
    let mut ctx = match require_login(&session, &state).await {
        Ok(ctx) => ctx,
        Err(redirect) => return Ok(redirect),
    };

    let tab = ToolTab::parse_or_default(&form.tab);
    let view = state.dashboards.get(&ctx.user.id);
    lock(&view).active_tab = tab;

    let mut toasts = notify::take(&session).await?;
    match dashboard::generate(&mut ctx, &view, tab, &form.prompt).await {
        Ok(_) => {
            ctx.save(&session).await?;
            toasts.push(Toast::success("Generation completed!"));
        }
        Err(e) => toasts.push(Toast::error(e)),
    }

    let snapshot = lock(&view).clone();
    Ok(Html(pages::dashboard::render(
        &state.base_path,
        &ctx,
        &snapshot,
        &form.prompt,
        toasts,
    ))
    .into_response())
}

pub async fn admin_panel(
    session: Session,
    State(state): State<AppState>,
    Query(params): Query<TabParams>,
) -> Result<Response, AppError> {
    let ctx = match require_admin(&session, &state).await {
        Ok(ctx) => ctx,
        Err(redirect) => return Ok(redirect),
    };

    let view = state.admin_views.get(&ctx.user.id);
    let tab = match params.tab.as_deref() {
        Some(tab) => AdminTab::parse_or_default(tab),
        None => lock(&view).active_tab,
    };
    let mut notices = Vec::new();
    admin::activate(&ctx, &view, tab, &mut notices).await;

    let mut toasts = notify::take(&session).await?;
    toasts.extend(notices);
    let snapshot = lock(&view).clone();
    Ok(Html(pages::admin::render(&state.base_path, &snapshot, toasts)).into_response())
}

pub async fn admin_refresh(
    session: Session,
    State(state): State<AppState>,
    Form(form): Form<RefreshForm>,
) -> Result<Response, AppError> {
    let ctx = match require_admin(&session, &state).await {
        Ok(ctx) => ctx,
        Err(redirect) => return Ok(redirect),
    };

    let tab = AdminTab::parse_or_default(&form.tab);
    let view = state.admin_views.get(&ctx.user.id);
    let mut notices = Vec::new();
    admin::refresh(&ctx, &view, tab, &mut notices).await;
    notify::push_all(&session, notices).await?;
    Ok(state.redirect(&admin_tab_path(tab)))
}

pub async fn edit_user(
    session: Session,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let ctx = match require_admin(&session, &state).await {
        Ok(ctx) => ctx,
        Err(redirect) => return Ok(redirect),
    };

    let view = state.admin_views.get(&ctx.user.id);
    if !admin::select_user(&view, &user_id) {
        log::warn!("Edit requested for unlisted user {}", user_id);
    }
    Ok(state.redirect(&admin_tab_path(AdminTab::Users)))
}

pub async fn cancel_edit(
    session: Session,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let ctx = match require_admin(&session, &state).await {
        Ok(ctx) => ctx,
        Err(redirect) => return Ok(redirect),
    };

    admin::cancel_edit(&state.admin_views.get(&ctx.user.id));
    Ok(state.redirect(&admin_tab_path(AdminTab::Users)))
}

pub async fn update_credits(
    session: Session,
    State(state): State<AppState>,
    Form(form): Form<CreditsForm>,
) -> Result<Response, AppError> {
    let ctx = match require_admin(&session, &state).await {
        Ok(ctx) => ctx,
        Err(redirect) => return Ok(redirect),
    };

    let view = state.admin_views.get(&ctx.user.id);
    let mut notices = Vec::new();
    admin::update_credits(&ctx, &view, &form.credits, &mut notices).await;
    notify::push_all(&session, notices).await?;
    Ok(state.redirect(&admin_tab_path(AdminTab::Users)))
}

pub async fn upsert_api_key(
    session: Session,
    State(state): State<AppState>,
    Form(form): Form<ApiKeyForm>,
) -> Result<Response, AppError> {
    let ctx = match require_admin(&session, &state).await {
        Ok(ctx) => ctx,
        Err(redirect) => return Ok(redirect),
    };

    let view = state.admin_views.get(&ctx.user.id);
    let mut notices = Vec::new();
    admin::upsert_api_key(&ctx, &view, &form.service, &form.api_key, &mut notices).await;
    notify::push_all(&session, notices).await?;
    Ok(state.redirect(&admin_tab_path(AdminTab::ApiKeys)))
}
