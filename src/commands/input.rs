use std::fmt::Write as _;

use super::{flush_notice, format_won, pad, render_blocked};
use crate::controller::Controller;
use crate::models::Temperature;

/// Category tabs, then the selected category's menus with their sale
/// buttons. Unavailable temperatures render as `---`.
pub fn render_input(controller: &Controller) -> String {
    if let Some(blocked) = render_blocked(controller) {
        return blocked;
    }
    let mut out = String::new();
    let totals = controller.totals();
    let _ = writeln!(out, "[입력] {} · 오늘 {}잔", controller.date(), totals.cups);

    let tabs: Vec<String> = controller
        .catalog()
        .categories()
        .iter()
        .map(|c| {
            if Some(c.id.as_str()) == controller.selected_category() {
                format!("[{}]", c.name)
            } else {
                format!(" {} ", c.name)
            }
        })
        .collect();
    if tabs.is_empty() {
        out.push_str("등록된 메뉴가 없습니다.\n");
        return out;
    }
    let _ = writeln!(out, "{}", tabs.join(" "));

    for menu in controller.menus_in_selected() {
        let button = |t: Temperature| {
            if menu.allows(t) {
                format!("[{}]", t.label())
            } else {
                "---".to_string()
            }
        };
        let _ = writeln!(
            out,
            "  {} {} {} {}  ({})",
            pad(&menu.name, 16),
            pad(&format_won(menu.price.unwrap_or(0)), 9),
            pad(&button(Temperature::Hot), 5),
            pad(&button(Temperature::Ice), 5),
            menu.id
        );
    }
    out
}

pub fn show(controller: &mut Controller, category: Option<&str>) -> bool {
    if let Some(id) = category {
        if !controller.select_category(id) {
            flush_notice(controller);
            return false;
        }
    }
    print!("{}", render_input(controller));
    true
}

/// Record one sale and report the outcome. Returns true on success.
pub async fn sell(controller: &mut Controller, menu_id: &str, temperature: Temperature) -> bool {
    let recorded = controller.record_sale(menu_id, temperature).await.is_some();
    flush_notice(controller);
    recorded
}
