//! Session persistence using the OS credential store.
//!
//! On Windows this uses the Credential Manager (via the `keyring` crate),
//! on macOS Keychain, and on Linux the kernel keyutils store. One entry per
//! Supabase project holds the signed-in session as JSON.

use keyring::Entry;
use serde_json::Value;
use std::sync::Mutex;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::{Result, SalesError};

const SERVICE_NAME: &str = "cafe-sales";

/// Signed-in Supabase session.
#[derive(Clone)]
pub struct Session {
    pub access_token: Zeroizing<String>,
    pub refresh_token: Zeroizing<String>,
    pub user_id: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl Session {
    fn to_json(&self) -> Zeroizing<String> {
        Zeroizing::new(
            serde_json::json!({
                "access_token": self.access_token.as_str(),
                "refresh_token": self.refresh_token.as_str(),
                "user_id": self.user_id,
            })
            .to_string(),
        )
    }

    fn from_json(raw: &str) -> Option<Session> {
        let v: Value = serde_json::from_str(raw).ok()?;
        let field = |key: &str| {
            v.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(Session {
            access_token: Zeroizing::new(field("access_token")?),
            refresh_token: Zeroizing::new(field("refresh_token").unwrap_or_default()),
            user_id: field("user_id")?,
        })
    }
}

/// Where a session survives between runs.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<Zeroizing<String>> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(Zeroizing::new(pw)),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

/// Store a credential in the OS keyring.
pub fn set_credential(key: &str, value: &str) -> Result<()> {
    let entry = Entry::new(SERVICE_NAME, key)?;
    entry.set_password(value)?;
    Ok(())
}

/// Delete a credential from the OS keyring. Silently succeeds if the entry
/// does not exist.
pub fn delete_credential(key: &str) -> Result<()> {
    let entry = Entry::new(SERVICE_NAME, key)?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(SalesError::from(e)),
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Keyring-backed store, one entry per Supabase project URL.
pub struct KeyringSessionStore {
    key: String,
}

impl KeyringSessionStore {
    pub fn new(project_url: &str) -> Self {
        Self {
            key: session_key(project_url),
        }
    }
}

fn session_key(project_url: &str) -> String {
    format!("session:{}", project_url.trim().trim_end_matches('/'))
}

impl SessionStore for KeyringSessionStore {
    fn load(&self) -> Option<Session> {
        let raw = get_credential(&self.key)?;
        let session = Session::from_json(&raw);
        if session.is_none() {
            warn!(key = %self.key, "stored session is unreadable, ignoring");
        }
        session
    }

    fn save(&self, session: &Session) -> Result<()> {
        set_credential(&self.key, &session.to_json())?;
        info!(user_id = %session.user_id, "session stored");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        delete_credential(&self.key)?;
        info!("stored session cleared");
        Ok(())
    }
}

/// Process-local store used when nothing should outlive the run.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<Session> {
        self.inner.lock().ok().and_then(|s| s.clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(session.clone());
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = None;
        }
        Ok(())
    }
}
