//! Sales and catalog persistence.
//!
//! One capability, several implementations: the embedded SQLite file, the
//! hosted Supabase tables, and a null backend used when the hosted one is
//! selected but not configured.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{Authenticator, SupabaseAuth};
use crate::config::{AppConfig, BackendConfig};
use crate::db;
use crate::error::Result;
use crate::models::{Category, Menu, NewSale, SalePatch, SaleRecord};
use crate::storage::KeyringSessionStore;
use crate::supabase::SupabaseClient;

pub mod local;
pub mod supabase;
pub mod unconfigured;

pub use local::LocalRepository;
pub use supabase::SupabaseRepository;
pub use unconfigured::UnconfiguredRepository;

/// Append/query/update/delete of sale records.
///
/// Listing returns records in no guaranteed order. Failures are reported,
/// never retried.
#[async_trait]
pub trait SalesRepository: Send + Sync {
    /// Persist a sale and return its freshly assigned id.
    async fn add(&self, sale: NewSale) -> Result<i64>;

    /// Records with `start <= sold_at <= end`.
    async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SaleRecord>>;

    /// Records belonging to the calendar day `date`.
    async fn list_by_day(&self, date: NaiveDate) -> Result<Vec<SaleRecord>>;

    /// Apply a user correction. Unknown ids are `SalesError::NotFound`.
    async fn update(&self, id: i64, patch: &SalePatch) -> Result<()>;

    /// Remove a sale. Unknown ids are `SalesError::NotFound`.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// Read-only menu reference data.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Categories ordered by sort order (unset first), then name.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Active menus ordered by code.
    async fn list_menus(&self) -> Result<Vec<Menu>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Supabase,
    Unconfigured,
}

/// Repositories selected for this run, built once from the configuration.
#[derive(Clone)]
pub struct Backend {
    pub kind: BackendKind,
    pub sales: Arc<dyn SalesRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    /// `None` for backends without sign-in.
    pub auth: Option<Arc<dyn Authenticator>>,
    /// Local database handle, kept for the menu importer.
    pub local_db: Option<Arc<db::DbState>>,
}

impl Backend {
    pub fn open(config: &AppConfig) -> Result<Self> {
        match &config.backend {
            BackendConfig::Local => {
                let state = Arc::new(db::init(&config.data_dir)?);
                info!(path = %state.db_path.display(), "using local backend");
                Ok(Self::local(state))
            }
            BackendConfig::Supabase { url, anon_key } => {
                info!(url = %url, "using Supabase backend");
                let client = Arc::new(SupabaseClient::new(
                    url,
                    anon_key,
                    Arc::new(KeyringSessionStore::new(url)),
                )?);
                let auth = Arc::new(SupabaseAuth::new(client.clone()));
                let repo = Arc::new(SupabaseRepository::new(client, auth.clone()));
                Ok(Self {
                    kind: BackendKind::Supabase,
                    sales: repo.clone(),
                    catalog: repo,
                    auth: Some(auth),
                    local_db: None,
                })
            }
            BackendConfig::Unconfigured => {
                warn!("Supabase backend selected without URL/anon key; reads will be empty");
                Ok(Self::unconfigured())
            }
        }
    }

    pub fn local(state: Arc<db::DbState>) -> Self {
        let repo = Arc::new(LocalRepository::new(state.clone()));
        Self {
            kind: BackendKind::Local,
            sales: repo.clone(),
            catalog: repo,
            auth: None,
            local_db: Some(state),
        }
    }

    pub fn unconfigured() -> Self {
        let repo = Arc::new(UnconfiguredRepository);
        Self {
            kind: BackendKind::Unconfigured,
            sales: repo.clone(),
            catalog: repo,
            auth: None,
            local_db: None,
        }
    }
}
