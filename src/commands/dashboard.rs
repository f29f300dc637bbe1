use std::fmt::Write as _;

use super::{format_won, pad, render_blocked};
use crate::controller::Controller;

pub fn render_dashboard(controller: &Controller) -> String {
    if let Some(blocked) = render_blocked(controller) {
        return blocked;
    }
    let mut out = String::new();
    let totals = controller.totals();
    let _ = writeln!(out, "[현황] {}", controller.date());
    let _ = writeln!(
        out,
        "총 판매 {}잔 · 매출 {} · 운영 시간 {}시간",
        totals.cups,
        format_won(totals.revenue),
        totals.active_hours
    );

    out.push_str("\n시간대별 판매 현황\n");
    let _ = writeln!(out, "{}{:>5}{:>5}{:>6}", pad("시간대", 12), "HOT", "ICE", "합계");
    let slots = controller.timeslot_summary();
    if slots.is_empty() {
        out.push_str("  판매 내역이 없습니다.\n");
    }
    for (slot, stats) in &slots {
        let _ = writeln!(
            out,
            "{}{:>5}{:>5}{:>6}",
            pad(slot, 12),
            stats.hot,
            stats.ice,
            stats.total
        );
    }

    out.push_str("\n인기 메뉴 TOP 5\n");
    for (rank, stat) in controller.top_menus().iter().enumerate() {
        let _ = writeln!(
            out,
            "#{} {} {} {}잔",
            rank + 1,
            pad(&stat.menu_name, 16),
            pad(stat.temperature.label(), 4),
            stat.count
        );
    }
    out
}

pub fn show(controller: &Controller) {
    print!("{}", render_dashboard(controller));
}
