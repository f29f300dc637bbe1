use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{CatalogRepository, SalesRepository};
use crate::error::{Result, SalesError};
use crate::models::{Category, Menu, NewSale, SalePatch, SaleRecord};

/// Stand-in for a hosted backend without URL or key: reads are empty,
/// writes are refused so nothing is shown as recorded when it was not.
pub struct UnconfiguredRepository;

#[async_trait]
impl SalesRepository for UnconfiguredRepository {
    async fn add(&self, _sale: NewSale) -> Result<i64> {
        Err(SalesError::NotConfigured)
    }

    async fn list_by_date_range(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<SaleRecord>> {
        Ok(Vec::new())
    }

    async fn list_by_day(&self, _date: NaiveDate) -> Result<Vec<SaleRecord>> {
        Ok(Vec::new())
    }

    async fn update(&self, _id: i64, _patch: &SalePatch) -> Result<()> {
        Err(SalesError::NotConfigured)
    }

    async fn delete(&self, _id: i64) -> Result<()> {
        Err(SalesError::NotConfigured)
    }
}

#[async_trait]
impl CatalogRepository for UnconfiguredRepository {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(Vec::new())
    }

    async fn list_menus(&self) -> Result<Vec<Menu>> {
        Ok(Vec::new())
    }
}
