//! Hosted relational backend over PostgREST.
//!
//! Tables: `categories(id, name, sort_order)`, `menus(id, category_id, code,
//! name, price, is_active, hot_yn, ice_yn)` and `sales(id, menu_id,
//! temperature, price, sold_at, sold_date, time_slot, user_id)`. The server
//! fills `sold_at`, `sold_date` and `time_slot` on insert.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::{CatalogRepository, SalesRepository};
use crate::auth::{Authenticator, SupabaseAuth};
use crate::error::{Result, SalesError};
use crate::models::{Category, Menu, NewSale, SalePatch, SaleRecord, Temperature};
use crate::supabase::SupabaseClient;
use crate::time_slot::{format_date, local_time_slot};

const SALES_SELECT: &str = "id,menu_id,temperature,price,sold_at,time_slot,sold_date";
const RETURN_REPRESENTATION: &str = "return=representation";

#[derive(Debug, Deserialize)]
struct SalesRow {
    id: i64,
    menu_id: String,
    temperature: String,
    price: Option<i64>,
    sold_at: String,
    sold_date: Option<String>,
    time_slot: Option<String>,
}

impl SalesRow {
    /// Missing `sold_date`/`time_slot` are recomputed from `sold_at` on the
    /// local clock; a null price reads as 0.
    fn into_record(self) -> Result<SaleRecord> {
        let temperature: Temperature = self.temperature.parse()?;
        let sold_at = DateTime::parse_from_rfc3339(&self.sold_at)
            .map_err(|e| SalesError::Validation(format!("bad sold_at {}: {e}", self.sold_at)))?
            .with_timezone(&Utc);
        let sold_date = match self.sold_date.as_deref() {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| SalesError::Validation(format!("bad sold_date {raw}: {e}")))?,
            None => sold_at.with_timezone(&Local).date_naive(),
        };
        let time_slot = self
            .time_slot
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| local_time_slot(&sold_at));
        Ok(SaleRecord {
            id: self.id,
            menu_id: self.menu_id,
            category: None,
            menu_name: None,
            temperature,
            price: self.price.unwrap_or(0),
            sold_at,
            sold_date,
            time_slot,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MenuRow {
    id: String,
    category_id: String,
    #[serde(default)]
    code: Option<String>,
    name: String,
    price: Option<i64>,
    #[serde(default)]
    hot_yn: Option<bool>,
    #[serde(default)]
    ice_yn: Option<bool>,
}

impl From<MenuRow> for Menu {
    fn from(row: MenuRow) -> Self {
        Menu {
            code: row.code.unwrap_or_else(|| row.id.clone()),
            id: row.id,
            category_id: row.category_id,
            name: row.name,
            price: row.price,
            hot_available: row.hot_yn.unwrap_or(false),
            ice_available: row.ice_yn.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: i64,
}

fn patch_body(patch: &SalePatch) -> Value {
    let mut body = Map::new();
    if let Some(menu_id) = &patch.menu_id {
        body.insert("menu_id".into(), Value::String(menu_id.clone()));
    }
    if let Some(temperature) = patch.temperature {
        body.insert("temperature".into(), Value::String(temperature.wire().into()));
    }
    if let Some(price) = patch.price {
        body.insert("price".into(), Value::from(price));
    }
    Value::Object(body)
}

fn instant_param(op: &str, instant: DateTime<Utc>) -> String {
    format!("{op}.{}", instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn decode_sales(rows: Vec<SalesRow>) -> Result<Vec<SaleRecord>> {
    rows.into_iter().map(SalesRow::into_record).collect()
}

pub struct SupabaseRepository {
    client: Arc<SupabaseClient>,
    auth: Arc<SupabaseAuth>,
}

impl SupabaseRepository {
    pub fn new(client: Arc<SupabaseClient>, auth: Arc<SupabaseAuth>) -> Self {
        Self { client, auth }
    }

    /// Writes need a signed-in user for row level security.
    async fn write_session(&self) -> Result<String> {
        self.auth.ensure_session().await?;
        self.auth
            .user_id()
            .ok_or_else(|| SalesError::Auth("Supabase 사용자 세션이 필요합니다.".into()))
    }

    async fn mutate_one(&self, method: Method, id: i64, body: Option<Value>) -> Result<()> {
        let url = self.client.rest_url("sales", &[("id", format!("eq.{id}"))])?;
        let mut request = self
            .client
            .request(method, url)
            .header("Prefer", RETURN_REPRESENTATION);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let touched: Vec<IdRow> = self.client.send_json(request).await?;
        if touched.is_empty() {
            return Err(SalesError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl SalesRepository for SupabaseRepository {
    async fn add(&self, sale: NewSale) -> Result<i64> {
        let user_id = self.write_session().await?;
        let url = self.client.rest_url("sales", &[])?;
        let body = serde_json::json!({
            "menu_id": sale.menu_id,
            "temperature": sale.temperature.wire(),
            "price": sale.price,
            "user_id": user_id,
        });
        let request = self
            .client
            .request(Method::POST, url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&body);
        let inserted: Vec<IdRow> = self.client.send_json(request).await?;
        let id = inserted
            .first()
            .map(|r| r.id)
            .ok_or_else(|| SalesError::Backend {
                status: 200,
                message: "insert returned no row".into(),
            })?;
        info!(sale_id = id, menu_id = %sale.menu_id, "sale recorded");
        Ok(id)
    }

    async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SaleRecord>> {
        let rows: Vec<SalesRow> = self
            .client
            .get_rows(
                "sales",
                &[
                    ("select", SALES_SELECT.to_string()),
                    ("sold_at", instant_param("gte", start)),
                    ("sold_at", instant_param("lte", end)),
                    ("order", "sold_at.asc".to_string()),
                ],
            )
            .await?;
        debug!(count = rows.len(), "loaded sales for range");
        decode_sales(rows)
    }

    async fn list_by_day(&self, date: NaiveDate) -> Result<Vec<SaleRecord>> {
        let rows: Vec<SalesRow> = self
            .client
            .get_rows(
                "sales",
                &[
                    ("select", SALES_SELECT.to_string()),
                    ("sold_date", format!("eq.{}", format_date(date))),
                    ("order", "sold_at.asc".to_string()),
                ],
            )
            .await?;
        debug!(count = rows.len(), date = %date, "loaded sales for day");
        decode_sales(rows)
    }

    async fn update(&self, id: i64, patch: &SalePatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        self.write_session().await?;
        self.mutate_one(Method::PATCH, id, Some(patch_body(patch)))
            .await?;
        info!(sale_id = id, "sale updated");
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.write_session().await?;
        self.mutate_one(Method::DELETE, id, None).await?;
        info!(sale_id = id, "sale deleted");
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for SupabaseRepository {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.client
            .get_rows(
                "categories",
                &[
                    ("select", "id,name,sort_order".to_string()),
                    ("order", "sort_order.asc.nullsfirst,name.asc".to_string()),
                ],
            )
            .await
    }

    async fn list_menus(&self) -> Result<Vec<Menu>> {
        let rows: Vec<MenuRow> = self
            .client
            .get_rows(
                "menus",
                &[
                    ("select", "*".to_string()),
                    ("is_active", "eq.true".to_string()),
                    ("order", "code.asc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Menu::from).collect())
    }
}
