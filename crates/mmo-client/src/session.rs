//! # Session
//!
//! Holds the signed-in user's access token, performs the OAuth2 password
//! grant that obtains it and the refresh grant that renews it.
//!
//! ## Authentication Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Password Grant Flow                              │
//! │                                                                         │
//! │  ┌────────────────┐                         ┌─────────────────┐        │
//! │  │   Session      │                         │  Backend        │        │
//! │  └───────┬────────┘                         └────────┬────────┘        │
//! │          │                                           │                 │
//! │          │  1. POST /o/token/ (form)                 │                 │
//! │          │     grant_type=password                   │                 │
//! │          │     username, password                    │                 │
//! │          │     client_id, client_secret              │                 │
//! │          │──────────────────────────────────────────►│                 │
//! │          │                                           │                 │
//! │          │  2. access_token, expires_in              │                 │
//! │          │◄──────────────────────────────────────────│                 │
//! │          │                                           │                 │
//! │          │  [Later: any authenticated call]          │                 │
//! │          │  Authorization: Bearer <access_token>     │                 │
//! │          │──────────────────────────────────────────►│                 │
//! │          │                                           │                 │
//! │          │  [Token within 30 s of expiry]            │                 │
//! │          │  3. POST /o/token/                        │                 │
//! │          │     grant_type=refresh_token              │                 │
//! │          │──────────────────────────────────────────►│                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session is an explicit value. It is cloned into [`crate::api::HttpApi`]
//! and into whatever else needs to ask "is someone signed in?". Clones share
//! the same token.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Tokens within this margin of expiry are treated as expired.
const EXPIRY_MARGIN_SECS: u64 = 30;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

// =============================================================================
// Token Info
// =============================================================================

/// Token information stored after a successful login.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// When the access token expires (local monotonic time).
    pub expires_at: Instant,
}

impl TokenInfo {
    /// Returns true if the token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        Instant::now() + Duration::from_secs(EXPIRY_MARGIN_SECS) >= self.expires_at
    }

    /// Remaining valid time in whole seconds.
    pub fn remaining_secs(&self) -> u64 {
        self.expires_at
            .saturating_duration_since(Instant::now())
            .as_secs()
    }
}

/// Token endpoint success body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Token endpoint error body (RFC 6749 §5.2).
#[derive(Debug, Default, Deserialize)]
struct TokenError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

// =============================================================================
// Session
// =============================================================================

struct SessionInner {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<TokenInfo>>,
}

/// Shared authentication state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Creates a signed-out session for the configured backend.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self::with_client(config, http))
    }

    /// Creates a signed-out session sharing an existing HTTP client.
    pub fn with_client(config: &ClientConfig, http: reqwest::Client) -> Self {
        Session {
            inner: Arc::new(SessionInner {
                http,
                token_url: format!("{}/o/token/", config.base_url()),
                client_id: config.auth.client_id.clone(),
                client_secret: config.auth.client_secret.clone(),
                token: RwLock::new(None),
            }),
        }
    }

    /// The HTTP client this session authenticates with.
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Signs in with the OAuth2 password grant.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<()> {
        let form = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.as_str()),
        ];

        debug!(username = %username, "Requesting access token");
        let token = self.request_token(&form).await.map_err(|e| {
            if let ClientError::LoginFailed(reason) = &e {
                warn!(username = %username, reason = %reason, "Login refused");
            }
            e
        })?;
        let lifetime = token.remaining_secs();
        self.store(token).await;

        info!(username = %username, expires_in = lifetime, "Signed in");
        Ok(())
    }

    /// Trades the stored refresh token for a new access token.
    ///
    /// ## Errors
    /// - `NotAuthenticated` if no refresh token is held
    /// - `LoginFailed` if the backend refuses the refresh token; the stored
    ///   token is cleared so the user has to sign in again
    pub async fn refresh(&self) -> ClientResult<String> {
        let mut guard = self.inner.token.write().await;
        self.refresh_locked(&mut guard).await
    }

    async fn refresh_locked(&self, slot: &mut Option<TokenInfo>) -> ClientResult<String> {
        let Some(refresh_token) = slot.as_ref().and_then(|t| t.refresh_token.clone()) else {
            return Err(ClientError::NotAuthenticated);
        };

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.as_str()),
        ];
        match self.request_token(&form).await {
            Ok(mut token) => {
                // Servers that do not rotate refresh tokens omit it.
                if token.refresh_token.is_none() {
                    token.refresh_token = Some(refresh_token);
                }
                info!(expires_in_secs = token.remaining_secs(), "Token refreshed");
                let access_token = token.access_token.clone();
                *slot = Some(token);
                Ok(access_token)
            }
            Err(e @ ClientError::LoginFailed(_)) => {
                warn!(error = %e, "Refresh token refused, signing out");
                *slot = None;
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                Err(e)
            }
        }
    }

    /// Posts one grant to the token endpoint.
    async fn request_token(&self, form: &[(&str, &str)]) -> ClientResult<TokenInfo> {
        let resp = self
            .inner
            .http
            .post(&self.inner.token_url)
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body: TokenError = resp.json().await.unwrap_or_default();
            let reason = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            debug!(status = status.as_u16(), reason = %reason, "Token endpoint refused grant");
            return Err(ClientError::LoginFailed(reason));
        }

        let token: TokenResponse = resp.json().await?;
        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        Ok(TokenInfo {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }

    /// Installs a token obtained elsewhere (restored from secure storage).
    pub async fn store(&self, token: TokenInfo) {
        *self.inner.token.write().await = Some(token);
    }

    /// Clears the stored token.
    pub async fn logout(&self) {
        if self.inner.token.write().await.take().is_some() {
            info!("Signed out");
        }
    }

    /// Returns true if a non-expired token is held, or an expired one that
    /// can still be refreshed.
    pub async fn is_authenticated(&self) -> bool {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .is_some_and(|t| !t.is_expired() || t.refresh_token.is_some())
    }

    /// Returns the access token for an authenticated call, refreshing it
    /// first when it is about to expire.
    pub async fn bearer(&self) -> ClientResult<String> {
        {
            let guard = self.inner.token.read().await;
            match guard.as_ref() {
                Some(token) if !token.is_expired() => {
                    debug!(remaining_secs = token.remaining_secs(), "Using cached token");
                    return Ok(token.access_token.clone());
                }
                Some(token) if token.refresh_token.is_some() => {}
                Some(_) => {
                    debug!("Access token expired");
                    return Err(ClientError::NotAuthenticated);
                }
                None => return Err(ClientError::NotAuthenticated),
            }
        }

        let mut guard = self.inner.token.write().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }
        self.refresh_locked(&mut guard).await.map_err(|e| match e {
            ClientError::LoginFailed(_) => ClientError::NotAuthenticated,
            other => other,
        })
    }

    /// Returns the access token when signed in, `None` otherwise.
    ///
    /// Used for endpoints that work anonymously but personalize results for
    /// signed-in users.
    pub async fn optional_bearer(&self) -> Option<String> {
        self.bearer().await.ok()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token_url", &self.inner.token_url)
            .field("client_id", &self.inner.client_id)
            .finish_non_exhaustive()
    }
}
