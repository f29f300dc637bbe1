//! Menu catalog import for the local backend.
//!
//! The menu file maps category names to their items, in display order:
//!
//! ```json
//! { "커피": [{ "id": "americano", "name": "아메리카노", "price": 4000 }],
//!   "티":   [{ "id": "earl-grey", "name": "얼그레이", "price": 4000, "ice": false }] }
//! ```
//!
//! `hot`/`ice` default to available. Importing replaces the active catalog:
//! items missing from the file are deactivated, never deleted, so past
//! sales keep resolving through their own snapshots.

use rusqlite::params;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::db::DbState;
use crate::error::{Result, SalesError};

#[derive(Debug, Clone, Deserialize)]
pub struct MenuFileItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default = "available")]
    pub hot: bool,
    #[serde(default = "available")]
    pub ice: bool,
}

fn available() -> bool {
    true
}

/// Parsed menu file, categories in file order.
#[derive(Debug, Clone, Default)]
pub struct MenuFile {
    pub categories: Vec<(String, Vec<MenuFileItem>)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub categories: usize,
    pub menus: usize,
    pub deactivated: usize,
}

impl MenuFile {
    pub fn parse(raw: &str) -> Result<Self> {
        let root: Map<String, Value> = serde_json::from_str(raw)?;
        let mut categories = Vec::with_capacity(root.len());
        for (name, items) in root {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(SalesError::Validation("빈 카테고리 이름이 있습니다.".into()));
            }
            let items: Vec<MenuFileItem> = serde_json::from_value(items)?;
            for item in &items {
                if item.id.trim().is_empty() || item.name.trim().is_empty() {
                    return Err(SalesError::Validation(format!(
                        "{name}: 메뉴 id와 이름은 비어 있을 수 없습니다."
                    )));
                }
                if item.price.is_some_and(|p| p < 0) {
                    return Err(SalesError::Validation(format!(
                        "{name}/{}: 가격은 0 이상이어야 합니다.",
                        item.id
                    )));
                }
            }
            categories.push((name, items));
        }
        Ok(Self { categories })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }
}

/// Replace the local catalog with `file`. Category ids are their names;
/// menu codes are zero-padded file positions so listing by code keeps the
/// file order.
pub fn import_menu(db: &DbState, file: &MenuFile) -> Result<ImportSummary> {
    let conn = db.lock()?;
    let tx = conn.unchecked_transaction()?;

    tx.execute("UPDATE menus SET is_active = 0", [])?;

    let mut summary = ImportSummary::default();
    let mut position = 0usize;
    for (order, (category, items)) in file.categories.iter().enumerate() {
        tx.execute(
            "INSERT INTO categories (id, name, sort_order) VALUES (?1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, sort_order = excluded.sort_order",
            params![category, order as i64],
        )?;
        summary.categories += 1;

        for item in items {
            position += 1;
            tx.execute(
                "INSERT INTO menus (id, category_id, code, name, price, is_active, hot_yn, ice_yn)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    category_id = excluded.category_id,
                    code = excluded.code,
                    name = excluded.name,
                    price = excluded.price,
                    is_active = 1,
                    hot_yn = excluded.hot_yn,
                    ice_yn = excluded.ice_yn",
                params![
                    item.id.trim(),
                    category,
                    format!("{position:04}"),
                    item.name.trim(),
                    item.price,
                    item.hot,
                    item.ice,
                ],
            )?;
            summary.menus += 1;
        }
    }

    let names: Vec<&str> = file.categories.iter().map(|(n, _)| n.as_str()).collect();
    let stale: Vec<String> = {
        let mut stmt = tx.prepare("SELECT id FROM categories")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids.into_iter().filter(|id| !names.contains(&id.as_str())).collect()
    };
    for id in &stale {
        tx.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
    }

    summary.deactivated = tx.query_row(
        "SELECT COUNT(*) FROM menus WHERE is_active = 0",
        [],
        |row| row.get::<_, i64>(0),
    )? as usize;

    tx.commit()?;
    info!(
        categories = summary.categories,
        menus = summary.menus,
        deactivated = summary.deactivated,
        removed_categories = stale.len(),
        "menu catalog imported"
    );
    Ok(summary)
}
