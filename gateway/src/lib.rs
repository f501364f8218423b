use common::AuthUser;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const ADMIN_OPERATIONS: &str = "admin-operations";
pub const AI_PROXY: &str = "ai-proxy";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Message reported by the backend, surfaced verbatim.
    #[error("{0}")]
    Remote(String),
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

/// Client for the backend's function, auth and REST endpoints.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl Client {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Calls a named backend function and unwraps its `{data, error}` envelope.
    ///
    /// A missing or null `data` is returned as `Ok(None)`; any `error` becomes
    /// [`GatewayError::Remote`].
    pub async fn invoke<B, T>(
        &self,
        function: &str,
        access_token: &str,
        body: &B,
    ) -> Result<Option<T>, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .http
            .post(self.url(&format!("/functions/v1/{}", function)))
            .bearer_auth(access_token)
            .header("apikey", &self.anon_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            log::warn!("{function} returned {status}");
            return Err(remote_or_status(function, status.as_u16(), &text));
        }

        unwrap_envelope(parse_body(&text)?)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, GatewayError> {
        let resp = self
            .http
            .post(self.url("/auth/v1/token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(remote_or_status("token", status.as_u16(), &text));
        }

        let token: TokenResponse = serde_json::from_str(&text)?;
        Ok(AuthUser {
            id: token.user.id,
            email: token.user.email.unwrap_or_else(|| email.to_string()),
            access_token: token.access_token,
        })
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), GatewayError> {
        let resp = self
            .http
            .post(self.url("/auth/v1/logout"))
            .bearer_auth(access_token)
            .header("apikey", &self.anon_key)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await?;
        Err(remote_or_status("logout", status.as_u16(), &text))
    }
}

fn parse_body(text: &str) -> Result<Value, GatewayError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

/// Error for a non-success response. Bodies that are not JSON, such as a
/// proxy's HTML error page, fall back to the bare status.
fn remote_or_status(endpoint: &str, status: u16, body: &str) -> GatewayError {
    let payload = serde_json::from_str(body).unwrap_or(Value::Null);
    match error_message(&payload) {
        Some(message) => GatewayError::Remote(message),
        None => GatewayError::Status {
            endpoint: endpoint.to_string(),
            status,
        },
    }
}

fn unwrap_envelope<T: DeserializeOwned>(payload: Value) -> Result<Option<T>, GatewayError> {
    if let Some(message) = payload.get("error").and_then(message_of) {
        return Err(GatewayError::Remote(message));
    }
    match payload.get("data") {
        None | Some(Value::Null) => Ok(None),
        Some(data) => Ok(Some(T::deserialize(data)?)),
    }
}

/// Extracts a human readable message from the error shapes the backend uses.
pub fn error_message(payload: &Value) -> Option<String> {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(message_of))
}

fn message_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => ["message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string),
        _ => None,
    }
}
