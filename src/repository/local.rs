//! Embedded SQLite implementation of the repositories.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Row};
use std::sync::Arc;
use tracing::{debug, info};

use super::{CatalogRepository, SalesRepository};
use crate::db::DbState;
use crate::error::{Result, SalesError};
use crate::models::{Category, Menu, NewSale, SalePatch, SaleRecord, Temperature};
use crate::time_slot::{day_bounds_of, format_date};

const SALE_COLUMNS: &str =
    "id, menu_id, category, menu_name, temperature, price, sold_at_ms, sold_date, time_slot";

pub struct LocalRepository {
    db: Arc<DbState>,
}

impl LocalRepository {
    pub fn new(db: Arc<DbState>) -> Self {
        Self { db }
    }
}

fn map_sale_row(row: &Row) -> rusqlite::Result<SaleRecord> {
    let temperature_raw: String = row.get(4)?;
    let temperature = temperature_raw
        .parse::<Temperature>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    let sold_at_ms: i64 = row.get(6)?;
    let sold_at = DateTime::<Utc>::from_timestamp_millis(sold_at_ms)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(6, sold_at_ms))?;
    let sold_date_raw: String = row.get(7)?;
    let sold_date = NaiveDate::parse_from_str(&sold_date_raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(SaleRecord {
        id: row.get(0)?,
        menu_id: row.get(1)?,
        category: row.get(2)?,
        menu_name: row.get(3)?,
        temperature,
        price: row.get(5)?,
        sold_at,
        sold_date,
        time_slot: row.get(8)?,
    })
}

#[async_trait]
impl SalesRepository for LocalRepository {
    async fn add(&self, sale: NewSale) -> Result<i64> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO sales (menu_id, category, menu_name, temperature, price,
                                sold_at_ms, sold_date, time_slot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                sale.menu_id,
                sale.category,
                sale.menu_name,
                sale.temperature.label(),
                sale.price,
                sale.sold_at.timestamp_millis(),
                format_date(sale.sold_date),
                sale.time_slot,
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(
            sale_id = id,
            menu_id = %sale.menu_id,
            temperature = %sale.temperature,
            "sale recorded"
        );
        Ok(id)
    }

    async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SaleRecord>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE sold_at_ms BETWEEN ?1 AND ?2"
        ))?;
        let rows = stmt
            .query_map(
                params![start.timestamp_millis(), end.timestamp_millis()],
                map_sale_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(count = rows.len(), "loaded sales for range");
        Ok(rows)
    }

    async fn list_by_day(&self, date: NaiveDate) -> Result<Vec<SaleRecord>> {
        let (start, end) = day_bounds_of(date);
        self.list_by_date_range(start.with_timezone(&Utc), end.with_timezone(&Utc))
            .await
    }

    async fn update(&self, id: i64, patch: &SalePatch) -> Result<()> {
        if patch.is_empty() {
            debug!(sale_id = id, "empty patch, nothing to update");
            return Ok(());
        }
        let conn = self.db.lock()?;
        let tx = conn.unchecked_transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sales WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(SalesError::NotFound(id));
        }

        if let Some(menu_id) = &patch.menu_id {
            // Refresh the display snapshot along with the reference.
            tx.execute(
                "UPDATE sales SET
                    menu_id = ?1,
                    menu_name = (SELECT name FROM menus WHERE id = ?1),
                    category = (SELECT c.name FROM menus m
                                JOIN categories c ON c.id = m.category_id
                                WHERE m.id = ?1)
                 WHERE id = ?2",
                params![menu_id, id],
            )?;
        }
        if let Some(temperature) = patch.temperature {
            tx.execute(
                "UPDATE sales SET temperature = ?1 WHERE id = ?2",
                params![temperature.label(), id],
            )?;
        }
        if let Some(price) = patch.price {
            tx.execute(
                "UPDATE sales SET price = ?1 WHERE id = ?2",
                params![price, id],
            )?;
        }
        tx.commit()?;
        info!(sale_id = id, "sale updated");
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.lock()?;
        let affected = conn.execute("DELETE FROM sales WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(SalesError::NotFound(id));
        }
        info!(sale_id = id, "sale deleted");
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for LocalRepository {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.db.lock()?;
        // SQLite sorts NULL first in ascending order.
        let mut stmt = conn.prepare(
            "SELECT id, name, sort_order FROM categories ORDER BY sort_order ASC, name ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    sort_order: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn list_menus(&self) -> Result<Vec<Menu>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, category_id, code, name, price, hot_yn, ice_yn
             FROM menus WHERE is_active = 1 ORDER BY code ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Menu {
                    id: row.get(0)?,
                    category_id: row.get(1)?,
                    code: row.get(2)?,
                    name: row.get(3)?,
                    price: row.get(4)?,
                    hot_available: row.get(5)?,
                    ice_available: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{Duration, Local, TimeZone};

    fn repo() -> LocalRepository {
        LocalRepository::new(Arc::new(db::open_in_memory().expect("open db")))
    }

    fn seed_catalog(repo: &LocalRepository) {
        let conn = repo.db.lock().expect("lock");
        conn.execute_batch(
            "INSERT INTO categories (id, name, sort_order) VALUES
                ('tea', '티', 2), ('coffee', '커피', 1), ('seasonal', '시즌', NULL);
             INSERT INTO menus (id, category_id, code, name, price, is_active, hot_yn, ice_yn) VALUES
                ('latte', 'coffee', 'C02', '카페라떼', 4500, 1, 1, 1),
                ('americano', 'coffee', 'C01', '아메리카노', 4000, 1, 1, 1),
                ('ade', 'seasonal', 'S01', '레몬에이드', 5000, 1, 0, 1),
                ('old', 'coffee', 'C99', '단종', 3000, 0, 1, 1);",
        )
        .expect("seed catalog");
    }

    fn new_sale_at(
        menu_id: &str,
        temperature: Temperature,
        price: i64,
        sold_at: DateTime<Local>,
    ) -> NewSale {
        NewSale {
            menu_id: menu_id.into(),
            category: Some("커피".into()),
            menu_name: Some(menu_id.into()),
            temperature,
            price,
            sold_at: sold_at.with_timezone(&Utc),
            sold_date: sold_at.date_naive(),
            time_slot: crate::time_slot::time_slot_of(&sold_at),
        }
    }

    fn local_noon(date: NaiveDate) -> DateTime<Local> {
        Local
            .from_local_datetime(&date.and_hms_opt(12, 0, 0).expect("noon"))
            .earliest()
            .expect("local noon")
    }

    #[tokio::test]
    async fn test_add_assigns_fresh_ids() {
        let repo = repo();
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
        let a = repo
            .add(new_sale_at("americano", Temperature::Hot, 4000, local_noon(date)))
            .await
            .expect("add a");
        let b = repo
            .add(new_sale_at("latte", Temperature::Ice, 4500, local_noon(date)))
            .await
            .expect("add b");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_list_by_day_filters_to_local_day() {
        let repo = repo();
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
        let (start, end) = day_bounds_of(date);

        repo.add(new_sale_at("americano", Temperature::Hot, 4000, start))
            .await
            .expect("at start");
        repo.add(new_sale_at("americano", Temperature::Ice, 4000, end))
            .await
            .expect("at end");
        let before = start - Duration::milliseconds(1);
        let after = end + Duration::milliseconds(1);
        repo.add(new_sale_at("latte", Temperature::Hot, 4500, before))
            .await
            .expect("day before");
        repo.add(new_sale_at("latte", Temperature::Hot, 4500, after))
            .await
            .expect("day after");

        let rows = repo.list_by_day(date).await.expect("list");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.menu_id == "americano"));
        assert!(rows.iter().all(|r| r.sold_date == date));
    }

    #[tokio::test]
    async fn test_round_trips_all_fields() {
        let repo = repo();
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
        let sale = new_sale_at("latte", Temperature::Ice, 4500, local_noon(date));
        let id = repo.add(sale.clone()).await.expect("add");
        let rows = repo.list_by_day(date).await.expect("list");
        assert_eq!(rows, vec![sale.into_record(id)]);
    }

    #[tokio::test]
    async fn test_update_price_and_missing_id() {
        let repo = repo();
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
        let id = repo
            .add(new_sale_at("americano", Temperature::Hot, 4000, local_noon(date)))
            .await
            .expect("add");

        repo.update(id, &SalePatch::price(3500)).await.expect("update");
        let rows = repo.list_by_day(date).await.expect("list");
        assert_eq!(rows[0].price, 3500);
        assert_eq!(rows[0].temperature, Temperature::Hot);

        let err = repo
            .update(id + 100, &SalePatch::price(1))
            .await
            .expect_err("missing id");
        assert!(matches!(err, SalesError::NotFound(missing) if missing == id + 100));
    }

    #[tokio::test]
    async fn test_update_menu_refreshes_snapshot() {
        let repo = repo();
        seed_catalog(&repo);
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
        let id = repo
            .add(new_sale_at("americano", Temperature::Hot, 4000, local_noon(date)))
            .await
            .expect("add");
        let patch = SalePatch {
            menu_id: Some("latte".into()),
            temperature: Some(Temperature::Ice),
            price: None,
        };
        repo.update(id, &patch).await.expect("update");
        let rows = repo.list_by_day(date).await.expect("list");
        assert_eq!(rows[0].menu_id, "latte");
        assert_eq!(rows[0].menu_name.as_deref(), Some("카페라떼"));
        assert_eq!(rows[0].category.as_deref(), Some("커피"));
        assert_eq!(rows[0].temperature, Temperature::Ice);
        assert_eq!(rows[0].price, 4000);
    }

    #[tokio::test]
    async fn test_delete_reports_missing_id() {
        let repo = repo();
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
        let id = repo
            .add(new_sale_at("americano", Temperature::Hot, 4000, local_noon(date)))
            .await
            .expect("add");
        repo.delete(id).await.expect("delete");
        assert!(repo.list_by_day(date).await.expect("list").is_empty());
        assert!(matches!(
            repo.delete(id).await,
            Err(SalesError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_catalog_ordering_and_active_filter() {
        let repo = repo();
        seed_catalog(&repo);
        let categories = repo.list_categories().await.expect("categories");
        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["시즌", "커피", "티"]);

        let menus = repo.list_menus().await.expect("menus");
        let codes: Vec<_> = menus.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(codes, vec!["C01", "C02", "S01"]);
        let ade = menus.iter().find(|m| m.id == "ade").expect("ade");
        assert!(!ade.hot_available);
        assert!(ade.ice_available);
    }
}
