//! Sign-in for the hosted backend.
//!
//! The controller only sees a ready flag and an optional message; the
//! session mechanics (stored tokens, refresh, anonymous sign-in, email and
//! password) stay behind the `Authenticator` trait.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::{Result, SalesError};
use crate::storage::Session;
use crate::supabase::SupabaseClient;

const ANONYMOUS_DISABLED: &str = "Supabase 익명 로그인이 비활성화되어 있습니다. \
     Anonymous Provider를 활성화하거나 이메일로 로그인하세요.";

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Make sure a usable session exists, creating one if the backend
    /// allows it.
    async fn ensure_session(&self) -> Result<()>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<()>;

    /// Drop the session locally even if the backend call fails.
    async fn sign_out(&self) -> Result<()>;

    fn user_id(&self) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

impl From<TokenResponse> for Session {
    fn from(t: TokenResponse) -> Self {
        Session {
            access_token: Zeroizing::new(t.access_token),
            refresh_token: Zeroizing::new(t.refresh_token),
            user_id: t.user.id,
        }
    }
}

/// Turn a GoTrue failure into the auth class so views get blocked.
fn auth_failure(context: &str, err: SalesError) -> SalesError {
    match err {
        SalesError::Backend { message, .. } => SalesError::Auth(format!("{context}: {message}")),
        SalesError::Auth(m) => SalesError::Auth(m),
        other => SalesError::Auth(format!("{context}: {other}")),
    }
}

/// GoTrue answers a stale access token with 401 or 403. Either one means
/// the session is gone.
fn token_rejection(err: SalesError) -> SalesError {
    match err {
        SalesError::Backend {
            status: 401 | 403,
            message,
        } => SalesError::Auth(format!("세션 확인 실패: {message}")),
        other => other,
    }
}

pub struct SupabaseAuth {
    client: Arc<SupabaseClient>,
}

impl SupabaseAuth {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }

    /// Check the stored access token against `/auth/v1/user`.
    async fn validate(&self, session: &Session) -> Result<()> {
        let url = self.client.auth_url("user", &[])?;
        let request = self
            .client
            .request_with_token(Method::GET, url, &session.access_token);
        let user: AuthUser = self
            .client
            .send_json(request)
            .await
            .map_err(token_rejection)?;
        if user.id != session.user_id {
            warn!(stored = %session.user_id, actual = %user.id, "session user changed");
        }
        Ok(())
    }

    async fn refresh(&self, session: &Session) -> Result<Session> {
        if session.refresh_token.is_empty() {
            return Err(SalesError::Auth("no refresh token".into()));
        }
        let url = self
            .client
            .auth_url("token", &[("grant_type", "refresh_token".to_string())])?;
        let body = serde_json::json!({ "refresh_token": session.refresh_token.as_str() });
        let token: TokenResponse = self
            .client
            .send_json(self.client.request(Method::POST, url).json(&body))
            .await?;
        Ok(token.into())
    }

    async fn sign_in_anonymously(&self) -> Result<Session> {
        let url = self.client.auth_url("signup", &[])?;
        let body = serde_json::json!({ "data": {} });
        let token: TokenResponse = self
            .client
            .send_json(self.client.request(Method::POST, url).json(&body))
            .await?;
        Ok(token.into())
    }
}

#[async_trait]
impl Authenticator for SupabaseAuth {
    async fn ensure_session(&self) -> Result<()> {
        if let Some(session) = self.client.session() {
            match self.validate(&session).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_auth() => {
                    info!("stored session rejected, refreshing");
                    match self.refresh(&session).await {
                        Ok(fresh) => {
                            self.client.set_session(Some(fresh));
                            return Ok(());
                        }
                        Err(e) => {
                            warn!(error = %e, "session refresh failed");
                            self.client.set_session(None);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        match self.sign_in_anonymously().await {
            Ok(session) => {
                info!(user_id = %session.user_id, "anonymous session created");
                self.client.set_session(Some(session));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "anonymous sign-in failed");
                Err(SalesError::Auth(ANONYMOUS_DISABLED.to_string()))
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(SalesError::Validation(
                "이메일과 비밀번호를 입력하세요.".to_string(),
            ));
        }
        let url = self
            .client
            .auth_url("token", &[("grant_type", "password".to_string())])?;
        let body = Zeroizing::new(
            serde_json::json!({ "email": email, "password": password }).to_string(),
        );
        let request = self
            .client
            .request(Method::POST, url)
            .body(body.as_str().to_owned());
        let token: TokenResponse = self
            .client
            .send_json(request)
            .await
            .map_err(|e| auth_failure("로그인 실패", e))?;
        let session: Session = token.into();
        info!(user_id = %session.user_id, "signed in");
        self.client.set_session(Some(session));
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.client.session() {
            let url = self.client.auth_url("logout", &[])?;
            let request = self
                .client
                .request_with_token(Method::POST, url, &session.access_token);
            if let Err(e) = self.client.send(request).await {
                warn!(error = %e, "backend sign-out failed, clearing local session anyway");
            }
        }
        self.client.set_session(None);
        info!("signed out");
        Ok(())
    }

    fn user_id(&self) -> Option<String> {
        self.client.user_id()
    }
}
