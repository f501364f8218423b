use anyhow::bail;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use common::{
    AdminAction, AdminStats, AdminUser, ApiKeyRecord, AuthUser, GenerationRecord,
    GenerationRequest, GenerationResult, GenerationStatus, UserProfile,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::service::PlatformService;
use crate::session::SessionContext;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SignIn(String),
    SignOut,
    GetProfile,
    RecentGenerations(i64),
    Generate(GenerationRequest),
    Admin(AdminAction),
}

pub enum GenerateOutcome {
    Result(GenerationResult),
    NoData,
    Fail(String),
}

/// Scriptable backend that records every call it receives.
pub struct MockPlatformService {
    pub calls: Mutex<Vec<Call>>,
    pub profiles: Mutex<Vec<UserProfile>>,
    pub history: Mutex<Vec<GenerationRecord>>,
    pub fail_history: Mutex<bool>,
    pub fail_profile: Mutex<bool>,
    pub generate_outcome: Mutex<GenerateOutcome>,
    pub users: Mutex<Vec<AdminUser>>,
    pub api_keys: Mutex<Vec<ApiKeyRecord>>,
    pub fail_admin: Mutex<bool>,
}

pub fn profile(id: &str, credits: i64, role: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        credits,
        subscription_tier: Some("free".to_string()),
        role: Some(role.to_string()),
    }
}

pub fn auth_user(id: &str) -> AuthUser {
    AuthUser {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        access_token: format!("token-{}", id),
    }
}

pub fn record(prompt: &str) -> GenerationRecord {
    GenerationRecord {
        id: format!("gen-{}", prompt),
        user_id: "user".to_string(),
        kind: "text".to_string(),
        prompt: prompt.to_string(),
        status: GenerationStatus::Completed,
        credits_used: 2,
        created_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
    }
}

impl MockPlatformService {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(vec![]),
            profiles: Mutex::new(vec![
                profile("admin", 100, "admin"),
                profile("user", 5, "user"),
                profile("broke", 0, "user"),
            ]),
            history: Mutex::new(vec![record("first")]),
            fail_history: Mutex::new(false),
            fail_profile: Mutex::new(false),
            generate_outcome: Mutex::new(GenerateOutcome::Result(GenerationResult {
                text: Some("generated".to_string()),
                url: None,
                credits_used: 2,
            })),
            users: Mutex::new(vec![AdminUser {
                id: "u1".to_string(),
                credits: 10,
                subscription_tier: "free".to_string(),
                role: "user".to_string(),
            }]),
            api_keys: Mutex::new(vec![]),
            fail_admin: Mutex::new(false),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn admin_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Admin(_)))
    }

    pub fn generate_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Generate(_)))
    }

    pub fn context(self: &Arc<Self>, user_id: &str) -> SessionContext {
        let profile = self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == user_id)
            .cloned();
        let service: Arc<dyn PlatformService> = self.clone();
        SessionContext::new(auth_user(user_id), profile, service)
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn sign_in(&self, email: &str, _password: &str) -> anyhow::Result<AuthUser> {
        self.record_call(Call::SignIn(email.to_string()));
        match email.split('@').next() {
            Some(id @ ("admin" | "user" | "broke")) => Ok(auth_user(id)),
            _ => bail!("Invalid login credentials"),
        }
    }

    async fn sign_out(&self, _user: &AuthUser) -> anyhow::Result<()> {
        self.record_call(Call::SignOut);
        Ok(())
    }

    async fn get_profile(&self, user: &AuthUser) -> anyhow::Result<Option<UserProfile>> {
        self.record_call(Call::GetProfile);
        if *self.fail_profile.lock().unwrap() {
            bail!("connection refused");
        }
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == user.id)
            .cloned())
    }

    async fn recent_generations(
        &self,
        _user: &AuthUser,
        limit: i64,
    ) -> anyhow::Result<Vec<GenerationRecord>> {
        self.record_call(Call::RecentGenerations(limit));
        if *self.fail_history.lock().unwrap() {
            bail!("relation \"generations\" does not exist");
        }
        Ok(self.history.lock().unwrap().clone())
    }

    async fn generate(
        &self,
        user: &AuthUser,
        request: &GenerationRequest,
    ) -> anyhow::Result<Option<GenerationResult>> {
        self.record_call(Call::Generate(request.clone()));
        match &*self.generate_outcome.lock().unwrap() {
            GenerateOutcome::Result(result) => {
                if let Some(p) = self
                    .profiles
                    .lock()
                    .unwrap()
                    .iter_mut()
                    .find(|p| p.id == user.id)
                {
                    p.credits -= result.credits_used;
                }
                self.history
                    .lock()
                    .unwrap()
                    .insert(0, record(&request.prompt));
                Ok(Some(result.clone()))
            }
            GenerateOutcome::NoData => Ok(None),
            GenerateOutcome::Fail(message) => Err(anyhow::anyhow!(message.clone())),
        }
    }

    async fn admin_operation(
        &self,
        _user: &AuthUser,
        action: &AdminAction,
    ) -> anyhow::Result<Option<Value>> {
        self.record_call(Call::Admin(action.clone()));
        if *self.fail_admin.lock().unwrap() {
            bail!("Admin access required");
        }
        match action {
            AdminAction::GetStats => Ok(Some(serde_json::to_value(AdminStats {
                total_users: 3,
                total_generations: 42,
                total_revenue: 12345,
                active_subscriptions: 2,
            })?)),
            AdminAction::GetUsers { .. } => {
                Ok(Some(serde_json::to_value(&*self.users.lock().unwrap())?))
            }
            AdminAction::GetApiKeys => {
                Ok(Some(serde_json::to_value(&*self.api_keys.lock().unwrap())?))
            }
            AdminAction::UpdateUserCredits {
                user_id, credits, ..
            } => {
                if let Some(u) = self
                    .users
                    .lock()
                    .unwrap()
                    .iter_mut()
                    .find(|u| &u.id == user_id)
                {
                    u.credits = *credits;
                }
                Ok(Some(json!({"success": true})))
            }
            AdminAction::UpsertApiKey { service, .. } => {
                self.api_keys.lock().unwrap().push(ApiKeyRecord {
                    service_name: service.clone(),
                    last_used_at: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
                });
                Ok(Some(json!({"success": true})))
            }
        }
    }
}
