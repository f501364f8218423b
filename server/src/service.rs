use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{
    AdminAction, AdminStats, AdminUser, ApiKeyRecord, ApiService, AuthUser, GenerationRecord,
    GenerationRequest, GenerationResult, GenerationStatus, ToolTab, UserProfile,
};
use gateway::{ADMIN_OPERATIONS, AI_PROXY};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Mutex;
use uuid::Uuid;

use crate::views::lock;

/// Everything the views need from the backend: identity, the record store
/// and the two remote functions.
#[async_trait]
pub trait PlatformService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<AuthUser>;
    async fn sign_out(&self, user: &AuthUser) -> anyhow::Result<()>;
    async fn get_profile(&self, user: &AuthUser) -> anyhow::Result<Option<UserProfile>>;
    async fn recent_generations(
        &self,
        user: &AuthUser,
        limit: i64,
    ) -> anyhow::Result<Vec<GenerationRecord>>;
    /// `ai-proxy`. `Ok(None)` means the call succeeded without a data payload.
    async fn generate(
        &self,
        user: &AuthUser,
        request: &GenerationRequest,
    ) -> anyhow::Result<Option<GenerationResult>>;
    /// `admin-operations`, returning the raw `data` payload.
    async fn admin_operation(
        &self,
        user: &AuthUser,
        action: &AdminAction,
    ) -> anyhow::Result<Option<Value>>;
}

pub struct RealPlatformService {
    pub gateway: gateway::Client,
    pub pool: PgPool,
}

fn parse_user_id(user: &AuthUser) -> anyhow::Result<Uuid> {
    Uuid::parse_str(&user.id).with_context(|| format!("invalid user id {}", user.id))
}

#[async_trait]
impl PlatformService for RealPlatformService {
    async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<AuthUser> {
        Ok(self.gateway.sign_in_with_password(email, password).await?)
    }

    async fn sign_out(&self, user: &AuthUser) -> anyhow::Result<()> {
        Ok(self.gateway.sign_out(&user.access_token).await?)
    }

    async fn get_profile(&self, user: &AuthUser) -> anyhow::Result<Option<UserProfile>> {
        db::get_profile(&self.pool, parse_user_id(user)?).await
    }

    async fn recent_generations(
        &self,
        user: &AuthUser,
        limit: i64,
    ) -> anyhow::Result<Vec<GenerationRecord>> {
        db::list_recent_generations(&self.pool, parse_user_id(user)?, limit).await
    }

    async fn generate(
        &self,
        user: &AuthUser,
        request: &GenerationRequest,
    ) -> anyhow::Result<Option<GenerationResult>> {
        Ok(self
            .gateway
            .invoke(AI_PROXY, &user.access_token, request)
            .await?)
    }

    async fn admin_operation(
        &self,
        user: &AuthUser,
        action: &AdminAction,
    ) -> anyhow::Result<Option<Value>> {
        Ok(self
            .gateway
            .invoke(ADMIN_OPERATIONS, &user.access_token, action)
            .await?)
    }
}

// --- Demo service for --demo mode ---

const ALICE_ID: &str = "00000000-0000-0000-0000-000000000001";
const BOB_ID: &str = "00000000-0000-0000-0000-000000000002";
const CHARLIE_ID: &str = "00000000-0000-0000-0000-000000000003";

struct DemoAccount {
    email: &'static str,
    profile: UserProfile,
}

struct DemoData {
    accounts: Vec<DemoAccount>,
    generations: Vec<GenerationRecord>,
    api_keys: Vec<ApiKeyRecord>,
    /// Minor units.
    revenue: i64,
}

/// In-memory backend with three seeded accounts: an admin, a regular user
/// and a user without credits. Stability and Replicate start without keys so
/// the failure path can be exercised.
pub struct DemoPlatformService {
    data: Mutex<DemoData>,
}

impl Default for DemoPlatformService {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoPlatformService {
    pub fn new() -> Self {
        let account = |id: &str, email, credits, tier: &str, role: &str| DemoAccount {
            email,
            profile: UserProfile {
                id: id.to_string(),
                credits,
                subscription_tier: Some(tier.to_string()),
                role: Some(role.to_string()),
            },
        };
        let now = Utc::now();
        let generations = vec![
            GenerationRecord {
                id: Uuid::new_v4().to_string(),
                user_id: BOB_ID.to_string(),
                kind: "text".to_string(),
                prompt: "Write a haiku about autumn".to_string(),
                status: GenerationStatus::Completed,
                credits_used: 2,
                created_at: now - Duration::hours(3),
            },
            GenerationRecord {
                id: Uuid::new_v4().to_string(),
                user_id: BOB_ID.to_string(),
                kind: "video".to_string(),
                prompt: "A drone shot over a fjord".to_string(),
                status: GenerationStatus::Failed,
                credits_used: 0,
                created_at: now - Duration::hours(2),
            },
        ];
        Self {
            data: Mutex::new(DemoData {
                accounts: vec![
                    account(ALICE_ID, "alice@example.com", 250, "pro", "admin"),
                    account(BOB_ID, "bob@example.com", 10, "free", "user"),
                    account(CHARLIE_ID, "charlie@example.com", 0, "starter", "user"),
                ],
                generations,
                api_keys: vec![
                    ApiKeyRecord {
                        service_name: "openai".to_string(),
                        last_used_at: Some(now - Duration::days(1)),
                    },
                    ApiKeyRecord {
                        service_name: "elevenlabs".to_string(),
                        last_used_at: None,
                    },
                ],
                revenue: 4_900,
            }),
        }
    }

    fn tab_for_model(model: &str) -> Option<ToolTab> {
        ToolTab::ALL
            .into_iter()
            .find(|t| t.service_config().model == model)
    }
}

impl DemoData {
    fn account_mut(&mut self, user_id: &str) -> Option<&mut DemoAccount> {
        self.accounts.iter_mut().find(|a| a.profile.id == user_id)
    }

    fn require_admin(&self, user: &AuthUser) -> anyhow::Result<()> {
        let is_admin = self
            .accounts
            .iter()
            .any(|a| a.profile.id == user.id && a.profile.is_admin());
        if !is_admin {
            bail!("Admin access required");
        }
        Ok(())
    }

    fn stats(&self) -> AdminStats {
        AdminStats {
            total_users: self.accounts.len() as i64,
            total_generations: self.generations.len() as i64,
            total_revenue: self.revenue,
            active_subscriptions: self
                .accounts
                .iter()
                .filter(|a| a.profile.tier_label() != "free")
                .count() as i64,
        }
    }
}

#[async_trait]
impl PlatformService for DemoPlatformService {
    async fn sign_in(&self, email: &str, _password: &str) -> anyhow::Result<AuthUser> {
        let data = lock(&self.data);
        let account = data
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email.trim()));
        match account {
            Some(a) => Ok(AuthUser {
                id: a.profile.id.clone(),
                email: a.email.to_string(),
                access_token: format!("demo-{}", a.profile.id),
            }),
            None => bail!("Invalid login credentials"),
        }
    }

    async fn sign_out(&self, _user: &AuthUser) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get_profile(&self, user: &AuthUser) -> anyhow::Result<Option<UserProfile>> {
        let mut data = lock(&self.data);
        Ok(data.account_mut(&user.id).map(|a| a.profile.clone()))
    }

    async fn recent_generations(
        &self,
        user: &AuthUser,
        limit: i64,
    ) -> anyhow::Result<Vec<GenerationRecord>> {
        let data = lock(&self.data);
        let mut records: Vec<_> = data
            .generations
            .iter()
            .filter(|g| g.user_id == user.id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    async fn generate(
        &self,
        user: &AuthUser,
        request: &GenerationRequest,
    ) -> anyhow::Result<Option<GenerationResult>> {
        let mut data = lock(&self.data);
        let cost = Self::tab_for_model(&request.model)
            .map(|t| t.cost())
            .unwrap_or(1);
        let Some(account) = data.account_mut(&user.id) else {
            bail!("Profile not found");
        };
        if account.profile.credits < cost {
            bail!("Insufficient credits: {} required", cost);
        }

        let id = Uuid::new_v4().to_string();
        let mut record = GenerationRecord {
            id: id.clone(),
            user_id: user.id.clone(),
            kind: request.kind.clone(),
            prompt: request.prompt.clone(),
            status: GenerationStatus::Failed,
            credits_used: 0,
            created_at: Utc::now(),
        };

        let Some(key) = data
            .api_keys
            .iter_mut()
            .find(|k| k.service_name == request.service)
        else {
            data.generations.push(record);
            bail!("{} API key is not configured", request.service);
        };
        key.last_used_at = Some(Utc::now());

        if let Some(account) = data.account_mut(&user.id) {
            account.profile.credits -= cost;
        }
        record.status = GenerationStatus::Completed;
        record.credits_used = cost;
        data.generations.push(record);

        let result = if request.kind == "text" {
            GenerationResult {
                text: Some(format!("Demo response to: {}", request.prompt)),
                url: None,
                credits_used: cost,
            }
        } else {
            GenerationResult {
                text: None,
                url: Some(format!("https://demo.invalid/{}/{}", request.kind, id)),
                credits_used: cost,
            }
        };
        Ok(Some(result))
    }

    async fn admin_operation(
        &self,
        user: &AuthUser,
        action: &AdminAction,
    ) -> anyhow::Result<Option<Value>> {
        let mut data = lock(&self.data);
        data.require_admin(user)?;
        match action {
            AdminAction::GetStats => Ok(Some(serde_json::to_value(data.stats())?)),
            AdminAction::GetUsers { limit } => {
                let users: Vec<AdminUser> = data
                    .accounts
                    .iter()
                    .take(*limit as usize)
                    .map(|a| AdminUser {
                        id: a.profile.id.clone(),
                        credits: a.profile.credits,
                        subscription_tier: a.profile.tier_label().to_string(),
                        role: a.profile.role.clone().unwrap_or_default(),
                    })
                    .collect();
                Ok(Some(serde_json::to_value(users)?))
            }
            AdminAction::GetApiKeys => Ok(Some(serde_json::to_value(&data.api_keys)?)),
            AdminAction::UpdateUserCredits {
                user_id,
                credits,
                reason,
            } => {
                let Some(account) = data.account_mut(user_id) else {
                    bail!("User not found");
                };
                log::info!("Demo credits for {user_id} set to {credits} ({reason})");
                account.profile.credits = *credits;
                Ok(Some(json!({"success": true})))
            }
            AdminAction::UpsertApiKey { service, api_key } => {
                if ApiService::parse(service).is_none() {
                    bail!("Unknown service {}", service);
                }
                if api_key.is_empty() {
                    bail!("API key is required");
                }
                data.api_keys.retain(|k| &k.service_name != service);
                data.api_keys.push(ApiKeyRecord {
                    service_name: service.clone(),
                    last_used_at: None,
                });
                Ok(Some(json!({"success": true})))
            }
        }
    }
}
