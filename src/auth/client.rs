//! HTTP client for the `/api/auth` endpoints. It keeps the current token
//! pair, publishes [`AuthEvent`]s on every change and implements
//! [`AuthProvider`] so a [`SessionManager`] can sit on top of it.
//!
//! [`SessionManager`]: crate::session::manager::SessionManager

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use super::dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest};
use crate::error::AuthError;
use crate::session::manager::{AuthEvent, AuthProvider};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Both values are required; a blank value counts as missing.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |name: &str| {
            var(name)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{name} must be set"))
        };
        Ok(Self {
            base_url: required("JOBBOARD_API_URL")?,
            api_key: required("JOBBOARD_API_KEY")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct AuthClient {
    http: Client,
    config: ClientConfig,
    current: RwLock<Option<AuthResponse>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;
        let (events, _) = broadcast::channel(32);
        Ok(Self {
            http,
            config,
            current: RwLock::new(None),
            events,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, AuthError> {
        let resp = req
            .header("apikey", &self.config.api_key)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            debug!(%status, %message, "auth request failed");
            return Err(match (status, message.as_str()) {
                (StatusCode::UNAUTHORIZED, "Invalid credentials") => AuthError::InvalidCredentials,
                (StatusCode::UNAUTHORIZED, "Invalid or expired token") => AuthError::InvalidToken,
                _ => AuthError::Provider(message),
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }

    async fn post_auth<B: Serialize>(&self, path: &str, body: &B) -> Result<AuthResponse, AuthError> {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn install(&self, resp: AuthResponse, event: fn(Session) -> AuthEvent) -> Session {
        let session = resp.session.clone();
        *self.current.write().await = Some(resp);
        // no subscribers is fine
        let _ = self.events.send(event(session.clone()));
        session
    }

    pub async fn sign_up(&self, req: &RegisterRequest) -> Result<Session, AuthError> {
        let resp = self.post_auth("/auth/register", req).await?;
        Ok(self.install(resp, AuthEvent::SignedIn).await)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self.post_auth("/auth/login", &body).await?;
        Ok(self.install(resp, AuthEvent::SignedIn).await)
    }

    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let refresh_token = match self.current.read().await.as_ref() {
            Some(current) => current.refresh_token.clone(),
            None => return Err(AuthError::MissingToken),
        };
        let resp = self
            .post_auth("/auth/refresh", &RefreshRequest { refresh_token })
            .await?;
        Ok(self.install(resp, AuthEvent::TokenRefreshed).await)
    }

    /// Clears local tokens even when the server call fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(current) = self.current.write().await.take() else {
            return Ok(());
        };
        let _ = self.events.send(AuthEvent::SignedOut);
        let resp = self
            .http
            .post(self.url("/auth/logout"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&current.access_token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "server sign-out failed");
        }
        Ok(())
    }

    pub async fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|c| c.access_token.clone())
    }
}

#[async_trait]
impl AuthProvider for AuthClient {
    /// Confirms the stored access token with the server, refreshing once when
    /// it has expired.
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(token) = self.access_token().await else {
            return Ok(None);
        };
        let req = self.http.get(self.url("/auth/session")).bearer_auth(token);
        match self.send::<Session>(req).await {
            Ok(session) => Ok(Some(session)),
            Err(AuthError::InvalidToken) => match self.refresh().await {
                Ok(session) => Ok(Some(session)),
                Err(e) => {
                    warn!(error = %e, "session refresh failed; signing out locally");
                    *self.current.write().await = None;
                    Ok(None)
                }
            },
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
