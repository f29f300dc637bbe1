//! Startup configuration.
//!
//! Built once in `main` from CLI flags layered over environment variables
//! and passed down explicitly.

use directories::ProjectDirs;
use std::path::PathBuf;
use zeroize::Zeroizing;

use crate::error::{Result, SalesError};

pub const ENV_BACKEND: &str = "CAFE_SALES_BACKEND";
pub const ENV_DATA_DIR: &str = "CAFE_SALES_DATA_DIR";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_OPEN_HOUR: &str = "CAFE_SALES_OPEN_HOUR";
pub const ENV_CLOSE_HOUR: &str = "CAFE_SALES_CLOSE_HOUR";

pub const DEFAULT_OPEN_HOUR: u32 = 9;
pub const DEFAULT_CLOSE_HOUR: u32 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Local,
    Supabase,
}

impl std::str::FromStr for BackendChoice {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "sqlite" => Ok(BackendChoice::Local),
            "supabase" | "remote" => Ok(BackendChoice::Supabase),
            other => Err(SalesError::Validation(format!("unknown backend: {other}"))),
        }
    }
}

#[derive(Clone)]
pub enum BackendConfig {
    Local,
    Supabase {
        url: String,
        anon_key: Zeroizing<String>,
    },
    /// Supabase selected but URL or key missing.
    Unconfigured,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Local => f.write_str("Local"),
            BackendConfig::Supabase { url, .. } => {
                f.debug_struct("Supabase").field("url", url).finish_non_exhaustive()
            }
            BackendConfig::Unconfigured => f.write_str("Unconfigured"),
        }
    }
}

/// Raw, optional settings from one source.
#[derive(Debug, Clone, Default)]
pub struct ConfigInputs {
    pub backend: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub open_hour: Option<u32>,
    pub close_hour: Option<u32>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ConfigInputs {
    /// Settings from the process environment. Blank values count as unset.
    pub fn from_env() -> Result<Self> {
        let hour = |key: &str| -> Result<Option<u32>> {
            env_string(key)
                .map(|raw| {
                    raw.parse::<u32>()
                        .map_err(|_| SalesError::Validation(format!("{key} must be an hour: {raw}")))
                })
                .transpose()
        };
        Ok(Self {
            backend: env_string(ENV_BACKEND),
            data_dir: env_string(ENV_DATA_DIR).map(PathBuf::from),
            supabase_url: env_string(ENV_SUPABASE_URL),
            supabase_anon_key: env_string(ENV_SUPABASE_ANON_KEY),
            open_hour: hour(ENV_OPEN_HOUR)?,
            close_hour: hour(ENV_CLOSE_HOUR)?,
        })
    }

    /// `self` with every field that `other` sets replaced.
    pub fn overridden_by(self, other: ConfigInputs) -> Self {
        Self {
            backend: other.backend.or(self.backend),
            data_dir: other.data_dir.or(self.data_dir),
            supabase_url: other.supabase_url.or(self.supabase_url),
            supabase_anon_key: other.supabase_anon_key.or(self.supabase_anon_key),
            open_hour: other.open_hour.or(self.open_hour),
            close_hour: other.close_hour.or(self.close_hour),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Fixed report slots cover `[open_hour, close_hour)`.
    pub open_hour: u32,
    pub close_hour: u32,
}

/// Platform data directory, falling back to the working directory.
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("app", "thesmall", "cafe-sales")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".cafe-sales"))
}

impl AppConfig {
    pub fn resolve(inputs: ConfigInputs) -> Result<Self> {
        let choice = match inputs.backend.as_deref() {
            Some(raw) => raw.parse::<BackendChoice>()?,
            None => BackendChoice::Local,
        };

        let backend = match choice {
            BackendChoice::Local => BackendConfig::Local,
            BackendChoice::Supabase => {
                let url = inputs.supabase_url.filter(|s| !s.trim().is_empty());
                let key = inputs.supabase_anon_key.filter(|s| !s.trim().is_empty());
                match (url, key) {
                    (Some(url), Some(key)) => BackendConfig::Supabase {
                        url,
                        anon_key: Zeroizing::new(key),
                    },
                    _ => BackendConfig::Unconfigured,
                }
            }
        };

        let open_hour = inputs.open_hour.unwrap_or(DEFAULT_OPEN_HOUR);
        let close_hour = inputs.close_hour.unwrap_or(DEFAULT_CLOSE_HOUR);
        if open_hour >= close_hour || close_hour > 24 {
            return Err(SalesError::Validation(format!(
                "report hours must satisfy open < close <= 24 (got {open_hour}..{close_hour})"
            )));
        }

        let data_dir = inputs.data_dir.unwrap_or_else(default_data_dir);
        let log_dir = crate::diagnostics::log_dir_in(&data_dir);

        Ok(Self {
            backend,
            data_dir,
            log_dir,
            open_hour,
            close_hour,
        })
    }
}
