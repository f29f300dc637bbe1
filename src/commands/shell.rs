//! Interactive session: one line per action, the current view is redrawn
//! after every state change.

use std::path::{Path, PathBuf};

use super::{auth, dashboard, diagnostics, flush_notice, input, menu, records, report, Console};
use crate::controller::{Controller, View};
use crate::error::{Result, SalesError};
use crate::models::Temperature;
use crate::time_slot::{parse_date, today};

pub const HELP: &str = "\
명령어:
  view <input|dashboard|report>   화면 전환
  cat <카테고리>                  카테고리 선택
  sell <메뉴 id> <hot|ice>        판매 기록
  date <YYYY-MM-DD|today>         날짜 변경
  next | prev | page <n>          리포트 페이지 이동
  edit <판매 id> <가격>           가격 수정
  delete <판매 id>                판매 내역 삭제
  csv [폴더]                      CSV 저장
  copy                            시간대별 합계 복사
  login <이메일> | logout         로그인/로그아웃
  import <메뉴 파일>              메뉴 불러오기 (로컬)
  refresh | about | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    View(View),
    Category(String),
    Sell(String, Temperature),
    Date(chrono::NaiveDate),
    NextPage,
    PrevPage,
    Page(usize),
    Edit(i64, String),
    Delete(i64),
    Csv(Option<PathBuf>),
    Copy,
    Login(String),
    Logout,
    Import(PathBuf),
    Refresh,
    About,
    Help,
    Quit,
}

fn usage(text: &str) -> SalesError {
    SalesError::Validation(format!("사용법: {text}"))
}

fn sale_id(raw: Option<&str>, text: &str) -> Result<i64> {
    raw.and_then(|s| s.parse().ok()).ok_or_else(|| usage(text))
}

impl ShellCommand {
    /// `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        let cmd = match head.to_ascii_lowercase().as_str() {
            "view" | "v" => ShellCommand::View(arg.ok_or_else(|| usage("view <화면>"))?.parse()?),
            "input" | "dashboard" | "report" | "입력" | "현황" | "리포트" => {
                ShellCommand::View(head.parse()?)
            }
            "cat" | "category" => {
                ShellCommand::Category(arg.ok_or_else(|| usage("cat <카테고리>"))?.to_string())
            }
            "sell" | "s" => {
                let menu = arg.ok_or_else(|| usage("sell <메뉴 id> <hot|ice>"))?;
                let temp = words.next().ok_or_else(|| usage("sell <메뉴 id> <hot|ice>"))?;
                ShellCommand::Sell(menu.to_string(), temp.parse()?)
            }
            "date" => match arg {
                Some("today") | None => ShellCommand::Date(today()),
                Some(raw) => ShellCommand::Date(parse_date(raw)?),
            },
            "next" | "n" => ShellCommand::NextPage,
            "prev" | "p" => ShellCommand::PrevPage,
            "page" => ShellCommand::Page(
                arg.and_then(|s| s.parse().ok()).ok_or_else(|| usage("page <n>"))?,
            ),
            "edit" => {
                let id = sale_id(arg, "edit <판매 id> <가격>")?;
                let price = words.next().ok_or_else(|| usage("edit <판매 id> <가격>"))?;
                ShellCommand::Edit(id, price.to_string())
            }
            "delete" | "del" => ShellCommand::Delete(sale_id(arg, "delete <판매 id>")?),
            "csv" => ShellCommand::Csv(arg.map(PathBuf::from)),
            "copy" => ShellCommand::Copy,
            "login" => ShellCommand::Login(arg.ok_or_else(|| usage("login <이메일>"))?.to_string()),
            "logout" => ShellCommand::Logout,
            "import" => ShellCommand::Import(PathBuf::from(
                arg.ok_or_else(|| usage("import <메뉴 파일>"))?,
            )),
            "refresh" | "r" => ShellCommand::Refresh,
            "about" => ShellCommand::About,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => {
                return Err(SalesError::Validation(format!(
                    "알 수 없는 명령어: {other} (help 참고)"
                )))
            }
        };
        Ok(Some(cmd))
    }
}

/// Print whatever view is active.
pub fn render_current(controller: &mut Controller) {
    match controller.view() {
        View::Input => {
            input::show(controller, None);
        }
        View::Dashboard => dashboard::show(controller),
        View::Report => report::show(controller),
    }
}

/// Run until `quit` or end of input. `export_dir` is where `csv` writes
/// when no folder is given.
pub async fn run(
    controller: &mut Controller,
    console: &mut Console,
    export_dir: &Path,
) -> std::io::Result<()> {
    println!("{HELP}\n");
    render_current(controller);
    flush_notice(controller);

    while let Some(line) = console.ask("> ").await? {
        let cmd = match ShellCommand::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        let redraw = match cmd {
            ShellCommand::Quit => break,
            ShellCommand::Help => {
                println!("{HELP}");
                false
            }
            ShellCommand::About => {
                if let Err(e) = diagnostics::show(controller) {
                    eprintln!("{e}");
                }
                false
            }
            ShellCommand::View(view) => {
                controller.set_view(view);
                true
            }
            ShellCommand::Category(id) => {
                controller.set_view(View::Input);
                input::show(controller, Some(&id));
                false
            }
            ShellCommand::Sell(menu_id, temp) => {
                input::sell(controller, &menu_id, temp).await;
                true
            }
            ShellCommand::Date(date) => {
                controller.set_date(date).await;
                flush_notice(controller);
                true
            }
            ShellCommand::NextPage => {
                controller.next_page();
                true
            }
            ShellCommand::PrevPage => {
                controller.prev_page();
                true
            }
            ShellCommand::Page(n) => {
                controller.go_to_page(n);
                true
            }
            ShellCommand::Edit(id, price) => records::edit(controller, id, &price).await,
            ShellCommand::Delete(id) => {
                if records::confirm_delete(console, false).await? {
                    records::delete(controller, id).await
                } else {
                    false
                }
            }
            ShellCommand::Csv(dir) => {
                report::export_csv(controller, dir.as_deref().unwrap_or(export_dir));
                false
            }
            ShellCommand::Copy => {
                report::copy_slots(controller);
                false
            }
            ShellCommand::Login(email) => auth::login(controller, console, &email, None).await?,
            ShellCommand::Logout => {
                auth::logout(controller).await;
                true
            }
            ShellCommand::Import(path) => menu::import(controller, &path).await,
            ShellCommand::Refresh => {
                controller.load_catalog().await;
                controller.refresh().await;
                flush_notice(controller);
                true
            }
        };
        if redraw {
            println!();
            render_current(controller);
        }
    }
    Ok(())
}
