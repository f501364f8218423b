use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Reason sent with every credit overwrite issued from the admin panel.
pub const ADMIN_ADJUSTMENT_REASON: &str = "Admin adjustment";

/// Page size of the recent generations feed.
pub const RECENT_GENERATIONS_LIMIT: i64 = 10;

/// Page size requested by the admin users tab.
pub const ADMIN_USERS_LIMIT: u32 = 100;

/// Reads an explicit JSON `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub subscription_tier: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    pub fn tier_label(&self) -> &str {
        match self.subscription_tier.as_deref() {
            Some(tier) if !tier.is_empty() => tier,
            _ => "Free",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Completed,
    Failed,
}

impl GenerationStatus {
    /// Unknown values are treated as still pending.
    pub fn parse(value: &str) -> Self {
        match value {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt: String,
    pub status: GenerationStatus,
    pub credits_used: i64,
    pub created_at: DateTime<Utc>,
}

/// Provider triple a tool tab dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub service: &'static str,
    pub model: &'static str,
    pub kind: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolTab {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Music,
}

impl ToolTab {
    pub const ALL: [ToolTab; 5] = [
        ToolTab::Text,
        ToolTab::Image,
        ToolTab::Video,
        ToolTab::Audio,
        ToolTab::Music,
    ];

    /// Unknown tab ids fall back to the text tool.
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "music" => Self::Music,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Music => "music",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Image => "Image",
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Music => "Music",
        }
    }

    /// Nominal price shown next to the tab. The backend decides the real charge.
    pub fn cost(&self) -> i64 {
        match self {
            Self::Text => 2,
            Self::Image => 15,
            Self::Video => 25,
            Self::Audio => 3,
            Self::Music => 5,
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        let (service, model, kind) = match self {
            Self::Text => ("openai", "gpt-4", "text"),
            Self::Image => ("openai", "dall-e-3", "image"),
            Self::Video => ("stability", "stable-video", "video"),
            Self::Audio => ("elevenlabs", "elevenlabs-tts", "audio"),
            Self::Music => ("replicate", "music-gen", "audio"),
        };
        ServiceConfig {
            service,
            model,
            kind,
        }
    }
}

/// Body of an `ai-proxy` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub service: String,
    pub model: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl GenerationRequest {
    pub fn for_tab(tab: ToolTab, prompt: &str) -> Self {
        let config = tab.service_config();
        Self {
            service: config.service.to_string(),
            model: config.model.to_string(),
            kind: config.kind.to_string(),
            prompt: prompt.to_string(),
            parameters: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "creditsUsed", default, deserialize_with = "null_as_default")]
    pub credits_used: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminStats {
    #[serde(deserialize_with = "null_as_default")]
    pub total_users: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_generations: i64,
    /// Minor currency units.
    #[serde(deserialize_with = "null_as_default")]
    pub total_revenue: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub active_subscriptions: i64,
}

impl AdminStats {
    pub fn revenue_display(&self) -> String {
        format!("${:.2}", self.total_revenue as f64 / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub credits: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subscription_tier: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
}

impl AdminUser {
    pub fn tier_label(&self) -> &str {
        if self.subscription_tier.is_empty() {
            "Free"
        } else {
            &self.subscription_tier
        }
    }

    pub fn short_id(&self) -> String {
        let prefix: String = self.id.chars().take(8).collect();
        format!("{}...", prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub service_name: String,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    pub fn last_used_display(&self) -> String {
        self.last_used_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "Never".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiService {
    Openai,
    Stability,
    Elevenlabs,
    Replicate,
}

impl ApiService {
    pub const ALL: [ApiService; 4] = [
        ApiService::Openai,
        ApiService::Stability,
        ApiService::Elevenlabs,
        ApiService::Replicate,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Stability => "stability",
            Self::Elevenlabs => "elevenlabs",
            Self::Replicate => "replicate",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Openai => "OpenAI",
            Self::Stability => "Stability AI",
            Self::Elevenlabs => "ElevenLabs",
            Self::Replicate => "Replicate",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Openai => "For GPT-4, DALL-E, and TTS",
            Self::Stability => "For Stable Diffusion",
            Self::Elevenlabs => "For voice synthesis",
            Self::Replicate => "For various AI models",
        }
    }
}

/// Body of an `admin-operations` call: `{"action": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum AdminAction {
    GetStats,
    GetUsers {
        limit: u32,
    },
    GetApiKeys,
    UpdateUserCredits {
        user_id: String,
        credits: i64,
        reason: String,
    },
    UpsertApiKey {
        service: String,
        api_key: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl ToString) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.to_string(),
        }
    }

    pub fn error(message: impl ToString) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.to_string(),
        }
    }
}
