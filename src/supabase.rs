//! HTTP plumbing for the hosted Supabase backend.
//!
//! Wraps the PostgREST (`/rest/v1`) and GoTrue (`/auth/v1`) endpoints with
//! the project's anon key and, once signed in, the user's access token.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::{Result, SalesError};
use crate::storage::{Session, SessionStore};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

pub struct SupabaseClient {
    base_url: String,
    anon_key: Zeroizing<String>,
    http: Client,
    session: Mutex<Option<Session>>,
    store: Arc<dyn SessionStore>,
}

/// Normalise a project URL: ensure a scheme (http for localhost) and strip
/// trailing slashes.
pub fn normalize_project_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }
    while url.ends_with('/') {
        url.pop();
    }
    url
}

/// User-facing message for a non-success status, with PostgREST/GoTrue
/// error details appended when the body carries them.
fn status_error(status: StatusCode, body: &str) -> SalesError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string());
    let summary = match status.as_u16() {
        401 => "authentication required or session expired".to_string(),
        403 => "not allowed by row level security".to_string(),
        404 => "resource not found".to_string(),
        s if s >= 500 => format!("server error (HTTP {s})"),
        s => format!("unexpected response (HTTP {s})"),
    };
    let message = if detail.is_empty() {
        summary
    } else {
        format!("{summary}: {detail}")
    };
    SalesError::Backend {
        status: status.as_u16(),
        message,
    }
}

impl SupabaseClient {
    pub fn new(url: &str, anon_key: &str, store: Arc<dyn SessionStore>) -> Result<Self> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        let session = store.load();
        if let Some(s) = &session {
            debug!(user_id = %s.user_id, "restored stored session");
        }
        Ok(Self {
            base_url: normalize_project_url(url),
            anon_key: Zeroizing::new(anon_key.trim().to_string()),
            http,
            session: Mutex::new(session),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> Option<Session> {
        self.session.lock().ok().and_then(|s| s.clone())
    }

    pub fn user_id(&self) -> Option<String> {
        self.session().map(|s| s.user_id)
    }

    /// Replace the current session and persist it. Persistence failures
    /// only cost the next run a sign-in, so they are logged.
    pub fn set_session(&self, session: Option<Session>) {
        let stored = match &session {
            Some(s) => self.store.save(s),
            None => self.store.clear(),
        };
        if let Err(e) = stored {
            warn!(error = %e, "failed to persist session");
        }
        if let Ok(mut slot) = self.session.lock() {
            *slot = session;
        }
    }

    pub fn rest_url(&self, table: &str, params: &[(&str, String)]) -> Result<Url> {
        self.url(&format!("rest/v1/{table}"), params)
    }

    pub fn auth_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        self.url(&format!("auth/v1/{path}"), params)
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{path}", self.base_url))
            .map_err(|e| SalesError::Validation(format!("Invalid Supabase URL: {e}")))?;
        if !params.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (k, v) in params {
                qp.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Request carrying the anon key and the best available bearer token.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.anon_key.clone());
        self.http
            .request(method, url)
            .header("apikey", self.anon_key.as_str())
            .header("Authorization", format!("Bearer {}", bearer.as_str()))
            .header("Content-Type", "application/json")
    }

    /// Request authenticated with a specific access token.
    pub fn request_with_token(&self, method: Method, url: Url, token: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.anon_key.as_str())
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
    }

    /// Send and map non-success statuses to `SalesError::Backend`.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!(status = %status, body = %body, "Supabase request failed");
            return Err(status_error(status, &body));
        }
        Ok(resp)
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = self.send(request).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.rest_url(table, params)?;
        self.send_json(self.request(Method::GET, url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySessionStore;

    fn client() -> SupabaseClient {
        SupabaseClient::new(
            "abc.supabase.co/",
            " anon-key ",
            Arc::new(MemorySessionStore::default()),
        )
        .expect("client")
    }

    #[test]
    fn test_normalize_project_url() {
        assert_eq!(
            normalize_project_url("abc.supabase.co/"),
            "https://abc.supabase.co"
        );
        assert_eq!(
            normalize_project_url("localhost:54321"),
            "http://localhost:54321"
        );
        assert_eq!(
            normalize_project_url("https://abc.supabase.co//"),
            "https://abc.supabase.co"
        );
    }

    #[test]
    fn test_rest_url_encodes_filters() {
        let c = client();
        let url = c
            .rest_url(
                "sales",
                &[
                    ("select", "id,menu_id".to_string()),
                    ("sold_date", "eq.2026-10-16".to_string()),
                ],
            )
            .expect("url");
        assert_eq!(url.path(), "/rest/v1/sales");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "id,menu_id".to_string()),
                ("sold_date".to_string(), "eq.2026-10-16".to_string()),
            ]
        );
    }

    #[test]
    fn test_auth_url() {
        let url = client()
            .auth_url("token", &[("grant_type", "password".to_string())])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_status_error_uses_body_detail() {
        let err = status_error(
            StatusCode::UNAUTHORIZED,
            r#"{"code":"PGRST301","message":"JWT expired"}"#,
        );
        assert!(err.is_auth());
        assert_eq!(
            err.to_string(),
            "backend error (HTTP 401): authentication required or session expired: JWT expired"
        );

        let err = status_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(
            err.to_string(),
            "backend error (HTTP 502): server error (HTTP 502)"
        );
    }

    #[test]
    fn test_session_lifecycle() {
        let c = client();
        assert!(c.user_id().is_none());
        c.set_session(Some(Session {
            access_token: Zeroizing::new("t".into()),
            refresh_token: Zeroizing::new("r".into()),
            user_id: "u-1".into(),
        }));
        assert_eq!(c.user_id().as_deref(), Some("u-1"));
        c.set_session(None);
        assert!(c.user_id().is_none());
    }
}
