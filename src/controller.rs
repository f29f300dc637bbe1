//! View controller.
//!
//! Holds what the screens show (selected date, view, catalog, the day's
//! records, page cursor, last notice) and turns user actions into
//! repository calls. User-facing failures never propagate: they become a
//! `Notice::Error` and the state stays consistent.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::aggregate::{self, CategoryStat, DayTotals, MenuStat, SlotStats};
use crate::error::SalesError;
use crate::models::{Catalog, Menu, NewSale, SalePatch, SaleRecord, Temperature};
use crate::report::{self, Paginator};
use crate::repository::Backend;
use crate::time_slot::today;

pub const MSG_SALE_RECORDED: &str = "판매 내용이 기록됐어요.";
pub const MSG_SIGNED_IN: &str = "로그인 됐어요.";
pub const MSG_SIGNED_OUT: &str = "로그아웃 됐어요.";
pub const MSG_NEED_NUMBER: &str = "숫자를 입력하세요.";
pub const MSG_NEED_SIGN_IN: &str = "로그인이 필요합니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Input,
    Dashboard,
    Report,
}

impl std::str::FromStr for View {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "input" | "입력" => Ok(View::Input),
            "dashboard" | "현황" => Ok(View::Dashboard),
            "report" | "리포트" => Ok(View::Report),
            other => Err(SalesError::Validation(format!("unknown view: {other}"))),
        }
    }
}

/// Transient message shown after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(t) | Notice::Error(t) => t,
        }
    }
}

pub struct Controller {
    backend: Backend,
    view: View,
    authenticated: bool,
    auth_error: Option<String>,
    date: NaiveDate,
    catalog: Catalog,
    selected_category: Option<String>,
    records: Vec<SaleRecord>,
    pager: Paginator,
    notice: Option<Notice>,
    report_slots: Vec<String>,
    next_provisional_id: i64,
}

impl Controller {
    /// `report_slots` is the fixed slot list of the printable report.
    pub fn new(backend: Backend, report_slots: Vec<String>) -> Self {
        Self {
            backend,
            view: View::default(),
            authenticated: false,
            auth_error: None,
            date: today(),
            catalog: Catalog::default(),
            selected_category: None,
            records: Vec::new(),
            pager: Paginator::default(),
            notice: None,
            report_slots,
            next_provisional_id: -1,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Establish a session (when the backend has sign-in), then load the
    /// catalog and the selected day.
    pub async fn start(&mut self) {
        if let Some(auth) = self.backend.auth.clone() {
            if let Err(e) = auth.ensure_session().await {
                warn!(error = %e, "no session at startup");
                self.enter_unauthenticated(Some(e.to_string()));
                return;
            }
        }
        self.authenticated = true;
        self.auth_error = None;
        self.load_catalog().await;
        self.refresh().await;
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) {
        let Some(auth) = self.backend.auth.clone() else {
            self.start().await;
            return;
        };
        match auth.sign_in(email, password).await {
            Ok(()) => {
                self.authenticated = true;
                self.auth_error = None;
                self.notice = Some(Notice::Info(MSG_SIGNED_IN.into()));
                self.load_catalog().await;
                self.refresh().await;
            }
            Err(e) => {
                self.auth_error = Some(e.to_string());
            }
        }
    }

    /// Backends without sign-in stay ready; there is no session to drop.
    pub async fn sign_out(&mut self) {
        let Some(auth) = self.backend.auth.clone() else {
            debug!("sign-out ignored, backend has no sign-in");
            return;
        };
        if let Err(e) = auth.sign_out().await {
            warn!(error = %e, "sign-out failed");
        }
        self.enter_unauthenticated(None);
        self.notice = Some(Notice::Info(MSG_SIGNED_OUT.into()));
    }

    /// Drop everything tied to the previous session.
    fn enter_unauthenticated(&mut self, error: Option<String>) {
        self.authenticated = false;
        self.auth_error = error;
        self.catalog = Catalog::default();
        self.selected_category = None;
        self.records.clear();
        self.pager.reset();
    }

    fn require_auth(&mut self) -> bool {
        if !self.authenticated {
            self.notice = Some(Notice::Error(MSG_NEED_SIGN_IN.into()));
        }
        self.authenticated
    }

    /// Report a failed action. Authentication failures block the views.
    fn fail(&mut self, context: &str, err: SalesError) {
        warn!(error = %err, "{context}");
        if err.is_auth() && self.backend.auth.is_some() {
            self.enter_unauthenticated(Some(err.to_string()));
        }
        self.notice = Some(Notice::Error(format!("{context}: {err}")));
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    pub async fn load_catalog(&mut self) {
        let categories = self.backend.catalog.list_categories().await;
        let menus = self.backend.catalog.list_menus().await;
        match (categories, menus) {
            (Ok(categories), Ok(menus)) => {
                debug!(
                    categories = categories.len(),
                    menus = menus.len(),
                    "catalog loaded"
                );
                self.catalog = Catalog::new(categories, menus);
                let still_there = self
                    .selected_category
                    .as_deref()
                    .is_some_and(|id| self.catalog.category(id).is_some());
                if !still_there {
                    self.selected_category =
                        self.catalog.categories().first().map(|c| c.id.clone());
                }
            }
            (Err(e), _) | (_, Err(e)) => self.fail("메뉴 불러오기 실패", e),
        }
    }

    /// Re-fetch the selected day.
    pub async fn refresh(&mut self) {
        if !self.authenticated {
            return;
        }
        match self.backend.sales.list_by_day(self.date).await {
            Ok(records) => {
                debug!(date = %self.date, count = records.len(), "day loaded");
                self.records = records;
                self.pager.clamp(self.records.len());
            }
            Err(e) => self.fail("판매 내역 불러오기 실패", e),
        }
    }

    pub async fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
        self.pager.reset();
        self.refresh().await;
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    pub fn select_category(&mut self, category_id: &str) -> bool {
        if self.catalog.category(category_id).is_some() {
            self.selected_category = Some(category_id.to_string());
            true
        } else {
            self.notice = Some(Notice::Error(format!(
                "카테고리를 찾을 수 없습니다: {category_id}"
            )));
            false
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub async fn record_sale(&mut self, menu_id: &str, temperature: Temperature) -> Option<i64> {
        self.record_sale_at(menu_id, temperature, Utc::now()).await
    }

    /// Record a sale at `sold_at`. The record is shown immediately under a
    /// provisional negative id and removed again if the durable write
    /// fails. Returns the durable id.
    pub async fn record_sale_at(
        &mut self,
        menu_id: &str,
        temperature: Temperature,
        sold_at: DateTime<Utc>,
    ) -> Option<i64> {
        if !self.require_auth() {
            return None;
        }
        let Some(menu) = self.catalog.menu(menu_id).cloned() else {
            self.notice = Some(Notice::Error(format!("메뉴를 찾을 수 없습니다: {menu_id}")));
            return None;
        };
        if !menu.allows(temperature) {
            self.notice = Some(Notice::Error(format!(
                "{}은(는) {} 판매가 불가합니다.",
                menu.name,
                temperature.label()
            )));
            return None;
        }

        let category = self.catalog.category(&menu.category_id).map(|c| c.name.clone());
        let sale = NewSale::from_menu(&menu, category, temperature, sold_at);

        let provisional = self.next_provisional_id;
        self.next_provisional_id -= 1;
        let shown = sale.sold_date == self.date;
        if shown {
            self.records.push(sale.clone().into_record(provisional));
        }

        match self.backend.sales.add(sale).await {
            Ok(id) => {
                if let Some(r) = self.records.iter_mut().find(|r| r.id == provisional) {
                    r.id = id;
                }
                info!(sale_id = id, menu_id = %menu.id, temperature = %temperature, "sale recorded");
                self.notice = Some(Notice::Info(MSG_SALE_RECORDED.into()));
                Some(id)
            }
            Err(e) => {
                self.records.retain(|r| r.id != provisional);
                self.fail("판매 기록 실패", e);
                None
            }
        }
    }

    /// Correct the price of a sale. `raw` must be a non-negative integer.
    pub async fn edit_price(&mut self, id: i64, raw: &str) -> bool {
        let price = match parse_price(raw) {
            Ok(p) => p,
            Err(e) => {
                self.notice = Some(Notice::Error(e.to_string()));
                return false;
            }
        };
        let patch = SalePatch::price(price);
        match self.backend.sales.update(id, &patch).await {
            Ok(()) => {
                if let Some(r) = self.records.iter_mut().find(|r| r.id == id) {
                    patch.apply_to(r);
                }
                info!(sale_id = id, price, "price corrected");
                true
            }
            Err(e) => {
                self.fail("수정 실패", e);
                false
            }
        }
    }

    /// Delete a sale. The durable delete is issued even when `id` is not
    /// in the loaded day; a "not found" answer becomes a notice.
    pub async fn delete_sale(&mut self, id: i64) -> bool {
        match self.backend.sales.delete(id).await {
            Ok(()) => {
                self.records.retain(|r| r.id != id);
                self.pager.clamp(self.records.len());
                true
            }
            Err(e) => {
                self.fail("삭제 실패", e);
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pagination
    // -----------------------------------------------------------------------

    pub fn next_page(&mut self) {
        self.pager.next(self.records.len());
    }

    pub fn prev_page(&mut self) {
        self.pager.prev(self.records.len());
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.pager.go_to(page, self.records.len());
    }

    pub fn page(&self) -> usize {
        self.pager.page()
    }

    pub fn total_pages(&self) -> usize {
        self.pager.total_pages(self.records.len())
    }

    /// Current page of the management table, newest first.
    pub fn page_rows(&self) -> Vec<&SaleRecord> {
        let ordered = report::management_order(&self.records);
        self.pager.slice(&ordered).to_vec()
    }

    // -----------------------------------------------------------------------
    // Derived data
    // -----------------------------------------------------------------------

    pub fn timeslot_summary(&self) -> BTreeMap<String, SlotStats> {
        aggregate::timeslot_summary(&self.records)
    }

    pub fn fixed_timeslot_summary(&self) -> Vec<(String, SlotStats)> {
        aggregate::fixed_timeslot_summary(&self.records, &self.report_slots)
    }

    pub fn menu_summary(&self) -> Vec<MenuStat> {
        aggregate::menu_summary(&self.records, &self.catalog)
    }

    pub fn top_menus(&self) -> Vec<MenuStat> {
        let summary = self.menu_summary();
        aggregate::top_menus(&summary, aggregate::TOP_MENU_COUNT).to_vec()
    }

    pub fn category_summary(&self) -> Vec<CategoryStat> {
        aggregate::category_summary(&self.menu_summary(), &self.catalog)
    }

    pub fn totals(&self) -> DayTotals {
        aggregate::day_totals(&self.records)
    }

    /// The day's CSV; failures become a notice.
    pub fn csv(&mut self) -> Option<String> {
        if !self.require_auth() {
            return None;
        }
        match report::render_csv(&self.records, &self.catalog) {
            Ok(csv) => Some(csv),
            Err(e) => {
                self.fail("CSV 만들기 실패", e);
                None
            }
        }
    }

    /// Write the day's CSV into `dir`; failures become a notice.
    pub fn export_csv(&mut self, dir: &Path) -> Option<PathBuf> {
        if !self.require_auth() {
            return None;
        }
        match report::write_csv_file(dir, self.date, &self.records, &self.catalog) {
            Ok(path) => {
                self.notice = Some(Notice::Info(format!("CSV 저장: {}", path.display())));
                Some(path)
            }
            Err(e) => {
                self.fail("CSV 내보내기 실패", e);
                None
            }
        }
    }

    pub fn clipboard_text(&self) -> String {
        report::clipboard_text(&self.fixed_timeslot_summary())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn auth_error(&self) -> Option<&str> {
        self.auth_error.as_deref()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn records(&self) -> &[SaleRecord] {
        &self.records
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.selected_category.as_deref()
    }

    pub fn menus_in_selected(&self) -> Vec<&Menu> {
        match self.selected_category.as_deref() {
            Some(id) => self.catalog.menus_in(id).collect(),
            None => Vec::new(),
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}

/// Non-negative integer price from user input.
pub fn parse_price(raw: &str) -> Result<i64, SalesError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|p| *p >= 0)
        .ok_or_else(|| SalesError::Validation(MSG_NEED_NUMBER.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Authenticator;
    use crate::error::Result;
    use crate::models::fixtures::{catalog, sale};
    use crate::models::{Category, Menu};
    use crate::repository::{BackendKind, CatalogRepository, SalesRepository};
    use crate::time_slot::business_slots;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scripted in-memory backend with failure injection.
    #[derive(Default)]
    struct FakeRepo {
        rows: Mutex<Vec<SaleRecord>>,
        next_id: Mutex<i64>,
        fail_add: AtomicBool,
        fail_auth: AtomicBool,
        fail_forbidden: AtomicBool,
        delete_calls: AtomicUsize,
        day_loads: AtomicUsize,
    }

    impl FakeRepo {
        fn with_rows(rows: Vec<SaleRecord>) -> Self {
            let next = rows.iter().map(|r| r.id).max().unwrap_or(0);
            Self {
                rows: Mutex::new(rows),
                next_id: Mutex::new(next),
                ..Self::default()
            }
        }

        fn stored(&self) -> usize {
            self.rows.lock().expect("rows").len()
        }

        fn check_auth(&self) -> Result<()> {
            if self.fail_auth.load(Ordering::SeqCst) {
                return Err(SalesError::Backend {
                    status: 401,
                    message: "JWT expired".into(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SalesRepository for FakeRepo {
        async fn add(&self, sale: NewSale) -> Result<i64> {
            self.check_auth()?;
            if self.fail_forbidden.load(Ordering::SeqCst) {
                return Err(SalesError::Backend {
                    status: 403,
                    message: "not allowed by row level security".into(),
                });
            }
            if self.fail_add.load(Ordering::SeqCst) {
                return Err(SalesError::Backend {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            let mut next = self.next_id.lock().expect("id");
            *next += 1;
            let id = *next;
            self.rows.lock().expect("rows").push(sale.into_record(id));
            Ok(id)
        }

        async fn list_by_date_range(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<SaleRecord>> {
            self.check_auth()?;
            Ok(self
                .rows
                .lock()
                .expect("rows")
                .iter()
                .filter(|r| r.sold_at >= start && r.sold_at <= end)
                .cloned()
                .collect())
        }

        async fn list_by_day(&self, date: NaiveDate) -> Result<Vec<SaleRecord>> {
            self.check_auth()?;
            self.day_loads.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .rows
                .lock()
                .expect("rows")
                .iter()
                .filter(|r| r.sold_date == date)
                .cloned()
                .collect())
        }

        async fn update(&self, id: i64, patch: &SalePatch) -> Result<()> {
            self.check_auth()?;
            let mut rows = self.rows.lock().expect("rows");
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(SalesError::NotFound(id))?;
            patch.apply_to(row);
            Ok(())
        }

        async fn delete(&self, id: i64) -> Result<()> {
            self.check_auth()?;
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().expect("rows");
            let before = rows.len();
            rows.retain(|r| r.id != id);
            if rows.len() == before {
                return Err(SalesError::NotFound(id));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CatalogRepository for FakeRepo {
        async fn list_categories(&self) -> Result<Vec<Category>> {
            self.check_auth()?;
            Ok(catalog().categories().to_vec())
        }

        async fn list_menus(&self) -> Result<Vec<Menu>> {
            self.check_auth()?;
            let mut menus = catalog().menus().to_vec();
            for m in &mut menus {
                if m.id == "earl-grey" {
                    m.ice_available = false;
                }
            }
            Ok(menus)
        }
    }

    #[derive(Default)]
    struct FakeAuth {
        signed_in: AtomicBool,
        reject_ensure: AtomicBool,
        ensure_calls: AtomicUsize,
    }

    #[async_trait]
    impl Authenticator for FakeAuth {
        async fn ensure_session(&self) -> Result<()> {
            self.ensure_calls.fetch_add(1, Ordering::SeqCst);
            if self.reject_ensure.load(Ordering::SeqCst) {
                return Err(SalesError::Auth("익명 로그인이 비활성화되어 있습니다.".into()));
            }
            self.signed_in.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
            if email == "staff@cafe.kr" && password == "pw" {
                self.signed_in.store(true, Ordering::SeqCst);
                Ok(())
            } else {
                Err(SalesError::Auth("로그인 실패: Invalid login credentials".into()))
            }
        }

        async fn sign_out(&self) -> Result<()> {
            self.signed_in.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn user_id(&self) -> Option<String> {
            self.signed_in
                .load(Ordering::SeqCst)
                .then(|| "user-1".to_string())
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("date")
    }

    /// A sale instant that falls on `day()` on the local wall clock.
    fn local_noon() -> DateTime<Utc> {
        chrono::Local
            .from_local_datetime(&day().and_hms_opt(12, 0, 0).expect("time"))
            .earliest()
            .expect("local noon")
            .with_timezone(&Utc)
    }

    fn backend(repo: Arc<FakeRepo>, auth: Option<Arc<FakeAuth>>) -> Backend {
        Backend {
            kind: if auth.is_some() {
                BackendKind::Supabase
            } else {
                BackendKind::Local
            },
            sales: repo.clone(),
            catalog: repo,
            auth: auth.map(|a| a as Arc<dyn Authenticator>),
            local_db: None,
        }
    }

    async fn started(repo: Arc<FakeRepo>, auth: Option<Arc<FakeAuth>>) -> Controller {
        let mut c = Controller::new(backend(repo, auth), business_slots(9, 17));
        c.start().await;
        c.set_date(day()).await;
        c
    }

    #[tokio::test]
    async fn test_start_loads_catalog_and_selects_first_category() {
        let repo = Arc::new(FakeRepo::with_rows(vec![sale(
            1,
            "americano",
            Temperature::Hot,
            4000,
            9,
            0,
        )]));
        let c = started(repo, None).await;
        assert!(c.is_authenticated());
        assert_eq!(c.selected_category(), Some("coffee"));
        assert_eq!(c.menus_in_selected().len(), 2);
        assert_eq!(c.records().len(), 1);
        assert_eq!(c.view(), View::Input);
    }

    #[tokio::test]
    async fn test_record_sale_replaces_provisional_id() {
        let repo = Arc::new(FakeRepo::default());
        let mut c = started(repo.clone(), None).await;

        let id = c
            .record_sale_at("latte", Temperature::Ice, local_noon())
            .await
            .expect("recorded");
        assert_eq!(id, 1);
        assert_eq!(c.records().len(), 1);
        assert_eq!(c.records()[0].id, 1);
        assert_eq!(c.records()[0].price, 4500);
        assert_eq!(c.notice(), Some(&Notice::Info(MSG_SALE_RECORDED.into())));
        assert_eq!(repo.stored(), 1);
        assert_eq!(c.totals().cups, 1);
    }

    #[tokio::test]
    async fn test_failed_add_rolls_back_optimistic_entry() {
        let repo = Arc::new(FakeRepo::default());
        let mut c = started(repo.clone(), None).await;
        repo.fail_add.store(true, Ordering::SeqCst);

        let id = c
            .record_sale_at("americano", Temperature::Hot, local_noon())
            .await;
        assert!(id.is_none());
        assert!(c.records().is_empty());
        assert!(matches!(c.notice(), Some(Notice::Error(_))));
        assert_eq!(repo.stored(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_temperature_is_rejected_before_write() {
        let repo = Arc::new(FakeRepo::default());
        let mut c = started(repo.clone(), None).await;

        assert!(c
            .record_sale_at("earl-grey", Temperature::Ice, local_noon())
            .await
            .is_none());
        assert!(c
            .record_sale_at("missing", Temperature::Hot, local_noon())
            .await
            .is_none());
        assert_eq!(repo.stored(), 0);
        assert!(c.records().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_still_calls_backend() {
        let repo = Arc::new(FakeRepo::with_rows(vec![sale(
            1,
            "americano",
            Temperature::Hot,
            4000,
            9,
            0,
        )]));
        let mut c = started(repo.clone(), None).await;

        assert!(!c.delete_sale(99).await);
        assert_eq!(repo.delete_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.records().len(), 1);
        match c.notice() {
            Some(Notice::Error(text)) => assert!(text.contains("sale 99 not found")),
            other => panic!("expected error notice, got {other:?}"),
        }
        assert!(c.is_authenticated());
    }

    #[tokio::test]
    async fn test_delete_clamps_page() {
        let rows: Vec<SaleRecord> = (1..=23)
            .map(|i| sale(i, "americano", Temperature::Hot, 4000, 9 + (i as u32 % 8), 0))
            .collect();
        let repo = Arc::new(FakeRepo::with_rows(rows));
        let mut c = started(repo, None).await;

        assert_eq!(c.total_pages(), 3);
        c.go_to_page(3);
        assert_eq!(c.page(), 3);
        assert_eq!(c.page_rows().len(), 3);

        for id in 11..=23 {
            assert!(c.delete_sale(id).await);
        }
        assert_eq!(c.records().len(), 10);
        assert_eq!(c.page(), 1);
        assert_eq!(c.total_pages(), 1);
    }

    #[tokio::test]
    async fn test_set_date_resets_page() {
        let rows: Vec<SaleRecord> = (1..=15)
            .map(|i| sale(i, "latte", Temperature::Ice, 4500, 10, i as u32))
            .collect();
        let repo = Arc::new(FakeRepo::with_rows(rows));
        let mut c = started(repo, None).await;
        c.next_page();
        assert_eq!(c.page(), 2);

        c.set_date(day().succ_opt().expect("next")).await;
        assert_eq!(c.page(), 1);
        assert!(c.records().is_empty());
    }

    #[tokio::test]
    async fn test_edit_price_validation_and_update() {
        let repo = Arc::new(FakeRepo::with_rows(vec![sale(
            1,
            "americano",
            Temperature::Hot,
            4000,
            9,
            0,
        )]));
        let mut c = started(repo, None).await;

        for bad in ["abc", "", "-100", "12.5"] {
            assert!(!c.edit_price(1, bad).await, "{bad}");
            assert_eq!(c.notice(), Some(&Notice::Error(MSG_NEED_NUMBER.into())));
        }
        assert_eq!(c.records()[0].price, 4000);

        assert!(c.edit_price(1, " 3500 ").await);
        assert_eq!(c.records()[0].price, 3500);
        assert_eq!(c.totals().revenue, 3500);

        assert!(!c.edit_price(42, "1000").await);
    }

    #[tokio::test]
    async fn test_auth_failure_blocks_and_clears() {
        let repo = Arc::new(FakeRepo::default());
        let auth = Arc::new(FakeAuth::default());
        auth.reject_ensure.store(true, Ordering::SeqCst);

        let mut c = Controller::new(backend(repo.clone(), Some(auth.clone())), business_slots(9, 17));
        c.start().await;
        assert!(!c.is_authenticated());
        assert!(c.auth_error().is_some());
        assert!(c.catalog().is_empty());
        assert!(c
            .record_sale_at("americano", Temperature::Hot, local_noon())
            .await
            .is_none());
        assert_eq!(repo.stored(), 0);

        c.sign_in("staff@cafe.kr", "wrong").await;
        assert!(!c.is_authenticated());
        assert!(c.auth_error().is_some_and(|m| m.contains("Invalid login")));

        c.sign_in("staff@cafe.kr", "pw").await;
        assert!(c.is_authenticated());
        assert!(c.auth_error().is_none());
        assert_eq!(c.notice(), Some(&Notice::Info(MSG_SIGNED_IN.into())));
        assert!(!c.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_data() {
        let repo = Arc::new(FakeRepo::with_rows(vec![sale(
            1,
            "americano",
            Temperature::Hot,
            4000,
            9,
            0,
        )]));
        let auth = Arc::new(FakeAuth::default());
        let mut c = started(repo, Some(auth.clone())).await;
        assert!(!c.records().is_empty());

        c.sign_out().await;
        assert!(!c.is_authenticated());
        assert!(c.records().is_empty());
        assert!(c.catalog().is_empty());
        assert!(c.selected_category().is_none());
        assert!(auth.user_id().is_none());
        assert_eq!(c.take_notice(), Some(Notice::Info(MSG_SIGNED_OUT.into())));
        assert!(c.notice().is_none());
    }

    #[tokio::test]
    async fn test_rejected_token_during_refresh_signs_out() {
        let repo = Arc::new(FakeRepo::with_rows(vec![sale(
            1,
            "americano",
            Temperature::Hot,
            4000,
            9,
            0,
        )]));
        let auth = Arc::new(FakeAuth::default());
        let mut c = started(repo.clone(), Some(auth)).await;
        repo.fail_auth.store(true, Ordering::SeqCst);

        c.refresh().await;
        assert!(!c.is_authenticated());
        assert!(c.records().is_empty());
        assert!(c.auth_error().is_some());
    }

    #[tokio::test]
    async fn test_views_and_derived_data() {
        let repo = Arc::new(FakeRepo::with_rows(vec![
            sale(1, "americano", Temperature::Hot, 4000, 9, 0),
            sale(2, "latte", Temperature::Ice, 4500, 9, 30),
            sale(3, "americano", Temperature::Hot, 4000, 10, 0),
        ]));
        let mut c = started(repo, None).await;

        for view in [View::Report, View::Dashboard, View::Input, View::Report] {
            c.set_view(view);
            assert_eq!(c.view(), view);
        }
        assert_eq!(c.top_menus()[0].menu_id, "americano");
        assert_eq!(c.category_summary()[0].revenue, 12500);
        assert_eq!(c.fixed_timeslot_summary().len(), 8);
        assert!(c.clipboard_text().starts_with("시간대\t합계\n"));
        assert_eq!(c.csv().map(|s| s.lines().count()), Some(4));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = c.export_csv(dir.path()).expect("exported");
        assert!(path.ends_with("sales_2026-10-16.csv"));
    }

    #[tokio::test]
    async fn test_local_sign_out_keeps_day_and_sign_in_restarts() {
        let repo = Arc::new(FakeRepo::with_rows(vec![sale(
            1,
            "americano",
            Temperature::Hot,
            4000,
            9,
            0,
        )]));
        let mut c = started(repo.clone(), None).await;

        c.sign_out().await;
        assert!(c.is_authenticated());
        assert_eq!(c.records().len(), 1);
        assert!(!c.catalog().is_empty());

        let mut fresh = Controller::new(backend(repo, None), business_slots(9, 17));
        fresh.set_date(day()).await;
        fresh.sign_in("", "").await;
        assert!(fresh.is_authenticated());
        assert_eq!(fresh.selected_category(), Some("coffee"));
        assert_eq!(fresh.records().len(), 1);
        assert!(fresh
            .record_sale_at("latte", Temperature::Ice, local_noon())
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_date_set_before_start_loads_once() {
        let repo = Arc::new(FakeRepo::with_rows(vec![sale(
            1,
            "americano",
            Temperature::Hot,
            4000,
            9,
            0,
        )]));
        let mut c = Controller::new(backend(repo.clone(), None), business_slots(9, 17));
        c.set_date(day()).await;
        assert_eq!(repo.day_loads.load(Ordering::SeqCst), 0);

        c.start().await;
        assert_eq!(repo.day_loads.load(Ordering::SeqCst), 1);
        assert_eq!(c.date(), day());
        assert_eq!(c.records().len(), 1);
    }

    #[tokio::test]
    async fn test_explicit_sign_in_skips_anonymous_session() {
        let repo = Arc::new(FakeRepo::default());
        let auth = Arc::new(FakeAuth::default());
        let mut c = Controller::new(backend(repo, Some(auth.clone())), business_slots(9, 17));

        c.sign_in("staff@cafe.kr", "pw").await;
        assert!(c.is_authenticated());
        assert!(!c.catalog().is_empty());
        assert_eq!(auth.ensure_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_forbidden_write_keeps_session() {
        let repo = Arc::new(FakeRepo::default());
        let auth = Arc::new(FakeAuth::default());
        let mut c = started(repo.clone(), Some(auth)).await;
        repo.fail_forbidden.store(true, Ordering::SeqCst);

        assert!(c
            .record_sale_at("americano", Temperature::Hot, local_noon())
            .await
            .is_none());
        assert!(c.is_authenticated());
        assert!(c.auth_error().is_none());
        assert!(!c.catalog().is_empty());
        assert!(c.records().is_empty());
        assert!(matches!(c.notice(), Some(Notice::Error(m)) if m.contains("403")));
    }

    #[tokio::test]
    async fn test_csv_requires_sign_in() {
        let repo = Arc::new(FakeRepo::default());
        let auth = Arc::new(FakeAuth::default());
        auth.reject_ensure.store(true, Ordering::SeqCst);
        let mut c = Controller::new(backend(repo, Some(auth)), business_slots(9, 17));
        c.start().await;

        assert!(c.csv().is_none());
        assert_eq!(c.take_notice(), Some(Notice::Error(MSG_NEED_SIGN_IN.into())));
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(c.export_csv(dir.path()).is_none());
        assert!(std::fs::read_dir(dir.path()).expect("dir").next().is_none());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("0").expect("zero"), 0);
        assert_eq!(parse_price(" 4500\n").expect("trimmed"), 4500);
        assert!(parse_price("4,500").is_err());
        assert!(parse_price("-1").is_err());
    }

    #[test]
    fn test_view_from_str() {
        assert_eq!("dashboard".parse::<View>().expect("view"), View::Dashboard);
        assert_eq!("리포트".parse::<View>().expect("view"), View::Report);
        assert!("settings".parse::<View>().is_err());
    }
}
