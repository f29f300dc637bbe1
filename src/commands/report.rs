use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

use super::{flush_notice, format_won, pad, render_blocked};
use crate::controller::Controller;
use crate::report::copy_to_clipboard;

/// Daily report: management table (current page), category totals, menu
/// detail and the fixed business-hour slots.
pub fn render_report(controller: &Controller) -> String {
    if let Some(blocked) = render_blocked(controller) {
        return blocked;
    }
    let catalog = controller.catalog();
    let mut out = String::new();
    let _ = writeln!(out, "[일간 리포트] {}", controller.date());

    let _ = writeln!(
        out,
        "\n판매 내역 관리 ({}/{} 페이지)",
        controller.page(),
        controller.total_pages()
    );
    let rows = controller.page_rows();
    if rows.is_empty() {
        out.push_str("  판매 내역이 없습니다.\n");
    }
    for r in rows {
        let _ = writeln!(
            out,
            "{:>6}  {}  {} {} {}",
            r.id,
            r.time_slot,
            pad(&catalog.menu_name_for(r), 16),
            pad(r.temperature.label(), 4),
            format_won(r.price)
        );
    }

    out.push_str("\n카테고리별 판매 현황\n");
    for c in controller.category_summary() {
        let _ = writeln!(
            out,
            "  {} {}잔 {}",
            pad(&c.category, 12),
            c.count,
            format_won(c.revenue)
        );
    }

    out.push_str("\n메뉴별 상세 판매 내역\n");
    for m in controller.menu_summary() {
        let _ = writeln!(
            out,
            "  {} {} {} {}",
            pad(&m.category, 10),
            pad(&m.menu_name, 16),
            pad(m.temperature.label(), 4),
            m.count
        );
    }
    let _ = writeln!(out, "  합계 {}", controller.totals().cups);

    out.push_str("\n영업 시간대별 합계\n");
    for (slot, stats) in controller.fixed_timeslot_summary() {
        let _ = writeln!(out, "  {slot}  {}", stats.total);
    }
    out
}

pub fn show(controller: &Controller) {
    print!("{}", render_report(controller));
}

pub fn export_csv(controller: &mut Controller, dir: &Path) -> bool {
    let ok = controller.export_csv(dir).is_some();
    flush_notice(controller);
    ok
}

/// Copy the fixed-slot totals; when no clipboard is reachable the text is
/// printed instead so it can still be pasted.
pub fn copy_slots(controller: &Controller) -> bool {
    let text = controller.clipboard_text();
    match copy_to_clipboard(text.clone()) {
        Ok(()) => {
            println!("시간대별 합계를 클립보드에 복사했어요.");
            true
        }
        Err(e) => {
            warn!(error = %e, "clipboard copy failed, printing instead");
            println!("{text}");
            false
        }
    }
}

/// Print the CSV to stdout. Returns false when it could not be built.
pub fn print_csv(controller: &mut Controller) -> bool {
    match controller.csv() {
        Some(csv) => {
            print!("{csv}");
            true
        }
        None => {
            flush_notice(controller);
            false
        }
    }
}
