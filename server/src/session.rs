use common::{AuthUser, UserProfile};
use std::sync::Arc;
use tower_sessions::Session;

use crate::service::PlatformService;

const AUTH_USER_KEY: &str = "auth_user";
const PROFILE_KEY: &str = "profile";

/// The signed-in user as seen by a view: identity, a cached (possibly stale)
/// profile and the operations that mutate them.
///
/// Built from the server-side session on every request and passed explicitly
/// to the view logic. Changes are written back with [`SessionContext::save`].
pub struct SessionContext {
    pub user: AuthUser,
    pub profile: Option<UserProfile>,
    service: Arc<dyn PlatformService>,
}

impl SessionContext {
    pub fn new(
        user: AuthUser,
        profile: Option<UserProfile>,
        service: Arc<dyn PlatformService>,
    ) -> Self {
        Self {
            user,
            profile,
            service,
        }
    }

    /// Returns `None` when nobody is signed in.
    pub async fn load(
        session: &Session,
        service: Arc<dyn PlatformService>,
    ) -> anyhow::Result<Option<Self>> {
        let Some(user) = session.get::<AuthUser>(AUTH_USER_KEY).await? else {
            return Ok(None);
        };
        let profile = session.get::<UserProfile>(PROFILE_KEY).await?;
        Ok(Some(Self::new(user, profile, service)))
    }

    /// Starts a session for a freshly signed-in user.
    pub async fn establish(
        session: &Session,
        service: Arc<dyn PlatformService>,
        user: AuthUser,
    ) -> anyhow::Result<Self> {
        session.cycle_id().await?;
        let mut ctx = Self::new(user, None, service);
        if let Err(e) = ctx.refresh_profile().await {
            log::warn!("Failed to load profile for {}: {e:#}", ctx.user.id);
        }
        ctx.save(session).await?;
        Ok(ctx)
    }

    pub fn service(&self) -> &Arc<dyn PlatformService> {
        &self.service
    }

    /// Cached balance; a missing profile counts as zero.
    pub fn credits(&self) -> i64 {
        self.profile.as_ref().map(|p| p.credits).unwrap_or(0)
    }

    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(UserProfile::is_admin)
    }

    pub fn tier_label(&self) -> &str {
        self.profile
            .as_ref()
            .map(UserProfile::tier_label)
            .unwrap_or("Free")
    }

    pub async fn refresh_profile(&mut self) -> anyhow::Result<()> {
        self.profile = self.service.get_profile(&self.user).await?;
        Ok(())
    }

    /// Re-reads the profile and stores it in the session. A failed read is
    /// logged and the cached copy kept.
    pub async fn sync_profile(&mut self, session: &Session) -> anyhow::Result<()> {
        if let Err(e) = self.refresh_profile().await {
            log::warn!("Failed to refresh profile for {}: {e:#}", self.user.id);
            return Ok(());
        }
        self.save(session).await
    }

    pub async fn save(&self, session: &Session) -> anyhow::Result<()> {
        session.insert(AUTH_USER_KEY, &self.user).await?;
        match &self.profile {
            Some(profile) => session.insert(PROFILE_KEY, profile).await?,
            None => {
                session.remove::<UserProfile>(PROFILE_KEY).await?;
            }
        }
        Ok(())
    }

    pub async fn sign_out(self, session: &Session) -> anyhow::Result<()> {
        if let Err(e) = self.service.sign_out(&self.user).await {
            log::warn!("Backend sign-out failed for {}: {e:#}", self.user.id);
        }
        session.flush().await?;
        Ok(())
    }
}
