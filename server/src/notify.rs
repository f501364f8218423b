use common::Toast;
use tower_sessions::Session;

const TOASTS_KEY: &str = "toasts";

/// Queues toasts for the next rendered page.
pub async fn push_all(session: &Session, toasts: Vec<Toast>) -> anyhow::Result<()> {
    if toasts.is_empty() {
        return Ok(());
    }
    let mut queued = session
        .get::<Vec<Toast>>(TOASTS_KEY)
        .await?
        .unwrap_or_default();
    queued.extend(toasts);
    session.insert(TOASTS_KEY, queued).await?;
    Ok(())
}

pub async fn push(session: &Session, toast: Toast) -> anyhow::Result<()> {
    push_all(session, vec![toast]).await
}

/// Drains the queue; every page calls this once while rendering.
pub async fn take(session: &Session) -> anyhow::Result<Vec<Toast>> {
    Ok(session
        .remove::<Vec<Toast>>(TOASTS_KEY)
        .await?
        .unwrap_or_default())
}
