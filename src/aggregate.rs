//! Derived sales summaries.
//!
//! Every function here is a pure function of the record slice it is given.
//! Record order is never assumed; summaries are recomputed from scratch on
//! each change.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{Catalog, SaleRecord, Temperature};

/// Dashboard "top menus" length.
pub const TOP_MENU_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotStats {
    pub total: u32,
    pub hot: u32,
    pub ice: u32,
    pub revenue: i64,
}

impl SlotStats {
    fn add(&mut self, record: &SaleRecord) {
        self.total += 1;
        match record.temperature {
            Temperature::Hot => self.hot += 1,
            Temperature::Ice => self.ice += 1,
        }
        self.revenue += record.price;
    }
}

/// Stats for every slot that has at least one sale, ascending by label.
/// Labels are zero-padded and fixed-width, so map order is time order.
pub fn timeslot_summary(records: &[SaleRecord]) -> BTreeMap<String, SlotStats> {
    let mut stats: BTreeMap<String, SlotStats> = BTreeMap::new();
    for record in records {
        stats.entry(record.time_slot.clone()).or_default().add(record);
    }
    stats
}

/// Stats for each slot of `slots`, in that order, zero-filled where nothing
/// sold. Sales outside the list are not counted.
pub fn fixed_timeslot_summary(records: &[SaleRecord], slots: &[String]) -> Vec<(String, SlotStats)> {
    let seen = timeslot_summary(records);
    slots
        .iter()
        .map(|slot| (slot.clone(), seen.get(slot).copied().unwrap_or_default()))
        .collect()
}

/// One row of the per-menu summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuStat {
    pub menu_id: String,
    pub menu_name: String,
    pub category: String,
    pub temperature: Temperature,
    pub count: u32,
    pub revenue: i64,
}

/// Sales grouped by `(menu_id, temperature)`, most sold first. Ties keep
/// the order in which each group was first seen.
pub fn menu_summary(records: &[SaleRecord], catalog: &Catalog) -> Vec<MenuStat> {
    let mut index: HashMap<(&str, Temperature), usize> = HashMap::new();
    let mut rows: Vec<MenuStat> = Vec::new();

    for record in records {
        let key = (record.menu_id.as_str(), record.temperature);
        let slot = *index.entry(key).or_insert_with(|| {
            rows.push(MenuStat {
                menu_id: record.menu_id.clone(),
                menu_name: catalog.menu_name_for(record),
                category: catalog.category_name_for(record),
                temperature: record.temperature,
                count: 0,
                revenue: 0,
            });
            rows.len() - 1
        });
        rows[slot].count += 1;
        rows[slot].revenue += record.price;
    }

    // sort_by is stable
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// First `n` rows of the menu summary.
pub fn top_menus(summary: &[MenuStat], n: usize) -> &[MenuStat] {
    &summary[..summary.len().min(n)]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStat {
    pub category: String,
    pub count: u32,
    pub revenue: i64,
}

/// Per-category totals: one row per catalog category in catalog order
/// (zero when nothing sold), then any names only seen in the sales, such
/// as the fallback label, in first-seen order.
pub fn category_summary(summary: &[MenuStat], catalog: &Catalog) -> Vec<CategoryStat> {
    let mut rows: Vec<CategoryStat> = catalog
        .categories()
        .iter()
        .map(|c| CategoryStat {
            category: c.name.clone(),
            count: 0,
            revenue: 0,
        })
        .collect();

    for stat in summary {
        let pos = match rows.iter().position(|r| r.category == stat.category) {
            Some(pos) => pos,
            None => {
                rows.push(CategoryStat {
                    category: stat.category.clone(),
                    count: 0,
                    revenue: 0,
                });
                rows.len() - 1
            }
        };
        rows[pos].count += stat.count;
        rows[pos].revenue += stat.revenue;
    }
    rows
}

/// Headline numbers for a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayTotals {
    pub cups: u32,
    pub revenue: i64,
    /// Number of distinct slots with at least one sale.
    pub active_hours: u32,
}

pub fn day_totals(records: &[SaleRecord]) -> DayTotals {
    let slots = timeslot_summary(records);
    DayTotals {
        cups: records.len() as u32,
        revenue: records.iter().map(|r| r.price).sum(),
        active_hours: slots.len() as u32,
    }
}
