//! Command-line handlers.
//!
//! Each screen has a `render_*` function returning plain text and a handler
//! that performs the action through the `Controller` and prints the result.

pub mod auth;
pub mod dashboard;
pub mod diagnostics;
pub mod input;
pub mod menu;
pub mod records;
pub mod report;
pub mod shell;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use crate::controller::{Controller, Notice};

/// Line-oriented stdin shared by prompts and the interactive shell.
pub struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `prompt` and read one line. `None` at end of input.
    pub async fn ask(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        self.lines.next_line().await
    }

    /// y/N question; anything but an explicit yes declines.
    pub async fn confirm(&mut self, question: &str) -> std::io::Result<bool> {
        let answer = self.ask(&format!("{question} [y/N] ")).await?;
        Ok(is_yes(answer.as_deref().unwrap_or("")))
    }
}

pub(crate) fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "예" | "네")
}

/// Print and clear the controller's notice. Returns true for errors.
pub fn flush_notice(controller: &mut Controller) -> bool {
    match controller.take_notice() {
        Some(Notice::Info(text)) => {
            println!("{text}");
            false
        }
        Some(Notice::Error(text)) => {
            eprintln!("{text}");
            true
        }
        None => false,
    }
}

/// Blocked-view banner shown instead of the screen when not signed in.
pub fn render_blocked(controller: &Controller) -> Option<String> {
    if controller.is_authenticated() {
        return None;
    }
    let mut out = String::from("로그인이 필요합니다. `cafe-sales login --email <이메일>`로 로그인하세요.\n");
    if let Some(err) = controller.auth_error() {
        out.push_str(&format!("오류: {err}\n"));
    }
    Some(out)
}

/// `12500` -> `12,500원`
pub fn format_won(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped}원")
}

/// Pad `text` with spaces to `width` display columns. Hangul and other
/// wide characters count as two columns.
pub(crate) fn pad(text: &str, width: usize) -> String {
    let used: usize = text.chars().map(display_width).sum();
    let mut out = text.to_string();
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(used)));
    out
}

fn display_width(ch: char) -> usize {
    match ch as u32 {
        0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF | 0xFF00..=0xFF60 => 2,
        _ => 1,
    }
}
