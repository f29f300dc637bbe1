//! Daily report output: CSV export, clipboard text and the paginated
//! management table.

use csv::{Terminator, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregate::SlotStats;
use crate::error::{Result, SalesError};
use crate::models::{Catalog, SaleRecord};
use crate::time_slot::format_date;

pub const CSV_HEADER: [&str; 6] = ["날짜", "시간", "카테고리", "메뉴명", "온도", "가격"];
pub const CLIPBOARD_HEADER: &str = "시간대\t합계";
pub const PAGE_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// `sales_<YYYY-MM-DD>.csv`
pub fn csv_file_name(date: chrono::NaiveDate) -> String {
    format!("sales_{}.csv", format_date(date))
}

/// One row per sale, oldest first, LF line endings. Fields are quoted only
/// when they contain a delimiter, quote or newline.
pub fn render_csv(records: &[SaleRecord], catalog: &Catalog) -> Result<String> {
    let mut rows: Vec<&SaleRecord> = records.iter().collect();
    rows.sort_by(|a, b| a.sold_at.cmp(&b.sold_at).then(a.id.cmp(&b.id)));

    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;
    for r in rows {
        wtr.write_record([
            format_date(r.sold_date),
            r.time_slot.clone(),
            catalog.category_name_for(r),
            catalog.menu_name_for(r),
            r.temperature.label().to_string(),
            r.price.to_string(),
        ])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| SalesError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| SalesError::Validation(format!("CSV not UTF-8: {e}")))
}

/// Write the day's CSV into `dir` and return the file path.
pub fn write_csv_file(
    dir: &Path,
    date: chrono::NaiveDate,
    records: &[SaleRecord],
    catalog: &Catalog,
) -> Result<PathBuf> {
    let content = render_csv(records, catalog)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(csv_file_name(date));
    fs::write(&path, content)?;
    info!(path = %path.display(), rows = records.len(), "CSV exported");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Clipboard
// ---------------------------------------------------------------------------

/// Two tab-separated columns, one line per fixed slot, for pasting into a
/// spreadsheet.
pub fn clipboard_text(fixed: &[(String, SlotStats)]) -> String {
    let mut lines = Vec::with_capacity(fixed.len() + 1);
    lines.push(CLIPBOARD_HEADER.to_string());
    lines.extend(fixed.iter().map(|(slot, s)| format!("{slot}\t{}", s.total)));
    lines.join("\n")
}

/// Put `text` on the system clipboard. Runs on its own thread since some
/// platforms tie the clipboard handle to the creating thread.
pub fn copy_to_clipboard(text: String) -> Result<()> {
    std::thread::spawn(move || {
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text)
    })
    .join()
    .map_err(|_| SalesError::Clipboard("clipboard thread panicked".into()))?
    .map_err(|e| SalesError::Clipboard(e.to_string()))
}

// ---------------------------------------------------------------------------
// Management table
// ---------------------------------------------------------------------------

/// Newest sale first; ids break ties so the order is total.
pub fn management_order(records: &[SaleRecord]) -> Vec<&SaleRecord> {
    let mut rows: Vec<&SaleRecord> = records.iter().collect();
    rows.sort_by(|a, b| b.sold_at.cmp(&a.sold_at).then(b.id.cmp(&a.id)));
    rows
}

/// 1-based page cursor over the management table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: usize,
    page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Never less than 1, even for an empty table.
    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.page_size).max(1)
    }

    /// Keep the cursor inside `[1, total_pages]` after the set shrank.
    pub fn clamp(&mut self, len: usize) {
        self.page = self.page.clamp(1, self.total_pages(len));
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn go_to(&mut self, page: usize, len: usize) {
        self.page = page;
        self.clamp(len);
    }

    pub fn next(&mut self, len: usize) {
        self.go_to(self.page + 1, len);
    }

    pub fn prev(&mut self, len: usize) {
        self.go_to(self.page.saturating_sub(1), len);
    }

    /// Rows of the current page.
    pub fn slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        let start = (self.page - 1) * self.page_size;
        if start >= rows.len() {
            return &[];
        }
        let end = (start + self.page_size).min(rows.len());
        &rows[start..end]
    }
}
