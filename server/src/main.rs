mod admin;
mod config;
mod dashboard;
mod handlers;
mod notify;
mod pages;
mod resource;
pub mod service;
mod session;
mod views;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use handlers::AppState;
use service::{DemoPlatformService, RealPlatformService};
use std::sync::Arc;
use tower_sessions::{ExpiredDeletion, Expiry, MemoryStore, SessionManagerLayer};

use crate::config::load_config;

#[derive(Parser)]
#[command(name = "ai-platform")]
struct Args {
    #[arg(long, default_value = "config")]
    config_file: String,

    #[arg(long)]
    demo: bool,
}

pub fn build_router(state: AppState) -> Router {
    let base = state.base_path.clone();

    let routes = Router::new()
        .route("/", get(handlers::root))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/dashboard/generate", post(handlers::generate))
        .route("/admin", get(handlers::admin_panel))
        .route("/admin/refresh", post(handlers::admin_refresh))
        .route("/admin/users/{id}/edit", post(handlers::edit_user))
        .route("/admin/users/cancel", post(handlers::cancel_edit))
        .route("/admin/users/credits", post(handlers::update_credits))
        .route("/admin/api-keys", post(handlers::upsert_api_key))
        .with_state(state);

    if base == "/" {
        routes
    } else {
        Router::new().nest(&base, routes)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("server=info"));

    let args = Args::parse();

    if args.demo {
        log::info!("Running in DEMO mode");
        log::info!("Sign in as alice@example.com (admin), bob@example.com or charlie@example.com with any password");

        let session_store = MemoryStore::default();
        let session_layer = SessionManagerLayer::new(session_store)
            .with_expiry(Expiry::OnInactivity(time::Duration::seconds(86400)))
            .with_same_site(tower_sessions::cookie::SameSite::Lax);

        let state = AppState::new(Arc::new(DemoPlatformService::new()), "/".to_string());
        let app = build_router(state).layer(session_layer);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
        log::info!("Listening on http://127.0.0.1:8080");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal_simple())
            .await?;

        return Ok(());
    }

    let app_config = load_config(&args.config_file).await?;

    if app_config.backend_url.is_empty() || app_config.backend_anon_key.is_empty() {
        anyhow::bail!(
            "Missing backend_url or backend_anon_key. Check config file or environment variables."
        );
    }

    let pool = db::init_pool(&app_config.database_url).await?;

    let session_store = tower_sessions_sqlx_store::PostgresStore::new(pool.clone());
    session_store.migrate().await?;

    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(3600)),
    );

    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(86400)))
        .with_same_site(tower_sessions::cookie::SameSite::Lax);

    let service = RealPlatformService {
        gateway: gateway::Client::new(&app_config.backend_url, &app_config.backend_anon_key),
        pool,
    };
    let state = AppState::new(Arc::new(service), app_config.base_path);

    let app = build_router(state).layer(session_layer);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", app_config.host, app_config.port)).await?;
    log::info!(
        "Listening on http://{}:{}",
        app_config.host,
        app_config.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(deletion_task.abort_handle()))
        .await?;

    match deletion_task.await {
        Ok(result) => result?,
        Err(e) if e.is_cancelled() => {}
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

async fn shutdown_signal(deletion_task_abort_handle: tokio::task::AbortHandle) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { deletion_task_abort_handle.abort() },
        _ = terminate => { deletion_task_abort_handle.abort() },
    }
}

async fn shutdown_signal_simple() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
