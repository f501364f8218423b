use common::{GenerationRecord, GenerationRequest, GenerationResult, ToolTab, RECENT_GENERATIONS_LIMIT};
use std::sync::Mutex;
use thiserror::Error;

use crate::resource::Resource;
use crate::session::SessionContext;
use crate::views::lock;

pub const DEFAULT_GENERATION_ERROR: &str =
    "Generation failed. Please ensure AI API keys are configured.";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    #[error("Please enter a prompt")]
    EmptyPrompt,
    #[error("Insufficient credits. Please purchase more.")]
    InsufficientCredits,
    #[error("A generation is already in progress")]
    InProgress,
    #[error("No data received")]
    NoData,
    #[error("{0}")]
    Remote(String),
}

impl GenerateError {
    fn remote(err: &anyhow::Error) -> Self {
        let message = err.to_string();
        if message.trim().is_empty() {
            Self::Remote(DEFAULT_GENERATION_ERROR.to_string())
        } else {
            Self::Remote(message)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LastResult {
    pub tab: ToolTab,
    pub result: GenerationResult,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub active_tab: ToolTab,
    pub generating: bool,
    pub result: Option<LastResult>,
    pub history: Resource<Vec<GenerationRecord>>,
}

impl DashboardState {
    pub fn generations(&self) -> &[GenerationRecord] {
        self.history.data().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Holds the view's single generation slot; releases it on drop.
struct InFlight<'a> {
    state: &'a Mutex<DashboardState>,
}

impl<'a> InFlight<'a> {
    fn acquire(state: &'a Mutex<DashboardState>) -> Option<Self> {
        let mut s = lock(state);
        if s.generating {
            return None;
        }
        s.generating = true;
        s.result = None;
        Some(Self { state })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.state).generating = false;
    }
}

/// Replaces the feed with the newest generations. Failures are logged and
/// leave the previous list in place.
pub async fn refresh_history(ctx: &SessionContext, state: &Mutex<DashboardState>) {
    let ticket = lock(state).history.begin();
    match ctx
        .service()
        .recent_generations(&ctx.user, RECENT_GENERATIONS_LIMIT)
        .await
    {
        Ok(records) => {
            if !lock(state).history.complete(ticket, records) {
                log::debug!("Discarding stale generations for {}", ctx.user.id);
            }
        }
        Err(e) => {
            log::error!("Error fetching generations: {e:#}");
            lock(state).history.fail(ticket);
        }
    }
}

/// Runs one generation for `tab`.
///
/// Validation failures return before any remote call. On success the profile
/// is refreshed and the feed refetched, once each; on failure neither happens.
pub async fn generate(
    ctx: &mut SessionContext,
    state: &Mutex<DashboardState>,
    tab: ToolTab,
    prompt: &str,
) -> Result<GenerationResult, GenerateError> {
    if prompt.trim().is_empty() {
        return Err(GenerateError::EmptyPrompt);
    }
    if ctx.credits() < 1 {
        return Err(GenerateError::InsufficientCredits);
    }
    let _slot = InFlight::acquire(state).ok_or(GenerateError::InProgress)?;

    let request = GenerationRequest::for_tab(tab, prompt);
    log::info!(
        "Generating {} with {}/{} for {}",
        request.kind,
        request.service,
        request.model,
        ctx.user.id
    );

    let result = match ctx.service().generate(&ctx.user, &request).await {
        Ok(Some(result)) => result,
        Ok(None) => {
            log::error!("Generation error: no data received");
            return Err(GenerateError::NoData);
        }
        Err(e) => {
            log::error!("Generation error: {e:#}");
            return Err(GenerateError::remote(&e));
        }
    };

    lock(state).result = Some(LastResult {
        tab,
        result: result.clone(),
    });

    if let Err(e) = ctx.refresh_profile().await {
        log::warn!("Failed to refresh profile for {}: {e:#}", ctx.user.id);
    }
    refresh_history(ctx, state).await;

    Ok(result)
}
