//! Sale records and menu reference data.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SalesError;
use crate::time_slot::time_slot_of;

/// Display label for a sale whose category can no longer be resolved.
pub const UNKNOWN_CATEGORY: &str = "기타";
/// Display label for a sale whose menu can no longer be resolved.
pub const UNKNOWN_MENU: &str = "알 수 없음";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Temperature {
    Hot,
    Ice,
}

impl Temperature {
    /// Upper-case label used on buttons and in CSV exports.
    pub fn label(self) -> &'static str {
        match self {
            Temperature::Hot => "HOT",
            Temperature::Ice => "ICE",
        }
    }

    /// Lower-case wire value used by the hosted `sales.temperature` column.
    pub fn wire(self) -> &'static str {
        match self {
            Temperature::Hot => "hot",
            Temperature::Ice => "ice",
        }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Temperature {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hot" => Ok(Temperature::Hot),
            "ice" | "iced" => Ok(Temperature::Ice),
            other => Err(SalesError::Validation(format!(
                "unknown temperature: {other}"
            ))),
        }
    }
}

/// One recorded drink sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: i64,
    pub menu_id: String,
    /// Denormalized at sale time by the embedded backend; `None` when the
    /// backend resolves names through the catalog instead.
    pub category: Option<String>,
    pub menu_name: Option<String>,
    pub temperature: Temperature,
    pub price: i64,
    pub sold_at: DateTime<Utc>,
    pub sold_date: NaiveDate,
    pub time_slot: String,
}

/// A sale about to be written. The repository assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub menu_id: String,
    pub category: Option<String>,
    pub menu_name: Option<String>,
    pub temperature: Temperature,
    pub price: i64,
    pub sold_at: DateTime<Utc>,
    pub sold_date: NaiveDate,
    pub time_slot: String,
}

impl NewSale {
    /// Sale of `menu` at `sold_at`, bucketed on the local wall clock. The
    /// menu's current price is snapshotted; later price changes do not
    /// touch this sale.
    pub fn from_menu(
        menu: &Menu,
        category_name: Option<String>,
        temperature: Temperature,
        sold_at: DateTime<Utc>,
    ) -> Self {
        let local = sold_at.with_timezone(&Local);
        Self {
            menu_id: menu.id.clone(),
            category: category_name,
            menu_name: Some(menu.name.clone()),
            temperature,
            price: menu.price.unwrap_or(0),
            sold_at,
            sold_date: local.date_naive(),
            time_slot: time_slot_of(&local),
        }
    }

    pub fn into_record(self, id: i64) -> SaleRecord {
        SaleRecord {
            id,
            menu_id: self.menu_id,
            category: self.category,
            menu_name: self.menu_name,
            temperature: self.temperature,
            price: self.price,
            sold_at: self.sold_at,
            sold_date: self.sold_date,
            time_slot: self.time_slot,
        }
    }
}

/// Fields a user correction may change. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Temperature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
}

impl SalePatch {
    pub fn price(price: i64) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.menu_id.is_none() && self.temperature.is_none() && self.price.is_none()
    }

    pub fn apply_to(&self, record: &mut SaleRecord) {
        if let Some(menu_id) = &self.menu_id {
            record.menu_id = menu_id.clone();
        }
        if let Some(temperature) = self.temperature {
            record.temperature = temperature;
        }
        if let Some(price) = self.price {
            record.price = price;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: String,
    pub category_id: String,
    pub code: String,
    pub name: String,
    pub price: Option<i64>,
    pub hot_available: bool,
    pub ice_available: bool,
}

impl Menu {
    pub fn allows(&self, temperature: Temperature) -> bool {
        match temperature {
            Temperature::Hot => self.hot_available,
            Temperature::Ice => self.ice_available,
        }
    }
}

/// Reference data with id lookups. Records keep only `menu_id`; display
/// fields are resolved here at read time.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: Vec<Category>,
    menus: Vec<Menu>,
    category_index: HashMap<String, usize>,
    menu_index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(categories: Vec<Category>, menus: Vec<Menu>) -> Self {
        let category_index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        let menu_index = menus
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
        Self {
            categories,
            menus,
            category_index,
            menu_index,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.menus.is_empty()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn menus(&self) -> &[Menu] {
        &self.menus
    }

    pub fn menu(&self, menu_id: &str) -> Option<&Menu> {
        self.menu_index.get(menu_id).map(|&i| &self.menus[i])
    }

    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.category_index
            .get(category_id)
            .map(|&i| &self.categories[i])
    }

    pub fn menus_in(&self, category_id: &str) -> impl Iterator<Item = &Menu> + '_ {
        let category_id = category_id.to_string();
        self.menus
            .iter()
            .filter(move |m| m.category_id == category_id)
    }

    /// Menu name for a record: the name captured at sale time, then the
    /// live catalog, then the fallback label.
    pub fn menu_name_for(&self, record: &SaleRecord) -> String {
        record
            .menu_name
            .clone()
            .or_else(|| self.menu(&record.menu_id).map(|m| m.name.clone()))
            .unwrap_or_else(|| UNKNOWN_MENU.to_string())
    }

    /// Category name for a record, resolved the same way as the menu name.
    pub fn category_name_for(&self, record: &SaleRecord) -> String {
        record
            .category
            .clone()
            .or_else(|| {
                self.menu(&record.menu_id)
                    .and_then(|m| self.category(&m.category_id))
                    .map(|c| c.name.clone())
            })
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_temperature_parse_and_labels() {
        assert_eq!("hot".parse::<Temperature>().expect("hot"), Temperature::Hot);
        assert_eq!("ICE".parse::<Temperature>().expect("ice"), Temperature::Ice);
        assert!("warm".parse::<Temperature>().is_err());
        assert_eq!(Temperature::Ice.label(), "ICE");
        assert_eq!(Temperature::Ice.wire(), "ice");
        assert_eq!(
            serde_json::to_string(&Temperature::Hot).expect("serialize"),
            "\"HOT\""
        );
    }

    #[test]
    fn test_catalog_resolves_live_names() {
        let catalog = catalog();
        let record = sale(1, "latte", Temperature::Ice, 4500, 9, 10);
        assert_eq!(catalog.menu_name_for(&record), "카페라떼");
        assert_eq!(catalog.category_name_for(&record), "커피");
        assert_eq!(catalog.menus_in("coffee").count(), 2);
    }

    #[test]
    fn test_dangling_menu_uses_snapshot_then_fallback() {
        let catalog = catalog();
        let mut record = sale(1, "discontinued", Temperature::Hot, 3000, 9, 0);
        assert_eq!(catalog.menu_name_for(&record), UNKNOWN_MENU);
        assert_eq!(catalog.category_name_for(&record), UNKNOWN_CATEGORY);

        record.menu_name = Some("바닐라라떼".into());
        record.category = Some("커피".into());
        assert_eq!(catalog.menu_name_for(&record), "바닐라라떼");
        assert_eq!(catalog.category_name_for(&record), "커피");
    }

    #[test]
    fn test_patch_applies_only_given_fields() {
        let mut record = sale(7, "americano", Temperature::Hot, 4000, 10, 0);
        let patch = SalePatch::price(3500);
        assert!(!patch.is_empty());
        patch.apply_to(&mut record);
        assert_eq!(record.price, 3500);
        assert_eq!(record.temperature, Temperature::Hot);
        assert!(SalePatch::default().is_empty());
        assert_eq!(
            serde_json::to_value(&patch).expect("serialize"),
            serde_json::json!({ "price": 3500 })
        );
    }

    #[test]
    fn test_new_sale_snapshots_menu_price() {
        let mut m = menu("latte", "coffee", "카페라떼", 4500);
        let sold_at = chrono::Utc::now();
        let sale = NewSale::from_menu(&m, Some("커피".into()), Temperature::Ice, sold_at);
        m.price = Some(5000);
        assert_eq!(sale.price, 4500);
        assert_eq!(sale.menu_name.as_deref(), Some("카페라떼"));
        assert_eq!(sale.time_slot.len(), 11);
        let record = sale.into_record(9);
        assert_eq!(record.id, 9);
        assert_eq!(record.price, 4500);
    }

    #[test]
    fn test_menu_availability() {
        let mut m = menu("americano", "coffee", "아메리카노", 4000);
        m.ice_available = false;
        assert!(m.allows(Temperature::Hot));
        assert!(!m.allows(Temperature::Ice));
    }
}
