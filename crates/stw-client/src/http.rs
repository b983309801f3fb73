//! HTTP implementations of the capability traits.
//!
//! Bodies are opaque JSON in both directions; the automation core never
//! sees a concrete game payload shape.

use crate::api::{ApiClient, ApiOutcome, BoxFuture};
use crate::auth::{AccessToken, DynAuthProvider};
use crate::error::{ClientError, ClientResult};
use crate::world::{WorldSnapshot, WorldStateClient};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use stw_core::{AccountId, ActionKind};
use tracing::{debug, warn};

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    /// Service base URL.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("stw-pilot/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:8443".to_string(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

/// Production `ApiClient` over HTTP.
pub struct HttpApiClient {
    http: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpApiClient {
    pub fn new(config: HttpClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn action_url(&self, account: &AccountId, kind: ActionKind) -> String {
        format!(
            "{}/automation/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            account,
            kind
        )
    }

    async fn post_action(
        &self,
        account: &AccountId,
        kind: ActionKind,
        params: Value,
        token: AccessToken,
    ) -> ClientResult<ApiOutcome> {
        let url = self.action_url(account, kind);
        debug!(%account, %kind, %url, "Dispatching action request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.as_str())
            .json(&params)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Unauthorized(truncate(&body)));
        }
        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ClientError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(classify_outcome(body))
    }
}

impl ApiClient for HttpApiClient {
    fn perform_action(
        &self,
        account: AccountId,
        kind: ActionKind,
        params: Value,
        token: AccessToken,
    ) -> BoxFuture<'_, ClientResult<ApiOutcome>> {
        Box::pin(async move { self.post_action(&account, kind, params, token).await })
    }
}

/// Production `WorldStateClient` over HTTP.
///
/// World info is fetched with the designated service account's token,
/// not a player token.
pub struct HttpWorldClient {
    http: reqwest::Client,
    config: HttpClientConfig,
    auth: DynAuthProvider,
    service_account: AccountId,
}

impl HttpWorldClient {
    pub fn new(
        config: HttpClientConfig,
        auth: DynAuthProvider,
        service_account: AccountId,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            http,
            config,
            auth,
            service_account,
        })
    }

    async fn fetch(&self) -> ClientResult<WorldSnapshot> {
        let token = self.auth.access_token(self.service_account.clone()).await?;
        let url = format!(
            "{}/world/info",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "World info request failed");
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        response
            .json::<WorldSnapshot>()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

impl WorldStateClient for HttpWorldClient {
    fn fetch_world_state(&self) -> BoxFuture<'_, ClientResult<WorldSnapshot>> {
        Box::pin(async move { self.fetch().await })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Network(e.to_string())
    }
}

/// A null body, empty object or empty array all mean "nothing to do".
fn classify_outcome(body: Value) -> ApiOutcome {
    let empty = match &body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        ApiOutcome::Nothing
    } else {
        ApiOutcome::Completed(body)
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 256;
    if body.chars().count() <= MAX {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX).collect();
        format!("{head}...")
    }
}
