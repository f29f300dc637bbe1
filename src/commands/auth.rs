use super::{flush_notice, Console};
use crate::controller::Controller;

const NO_SIGN_IN: &str = "이 백엔드는 로그인이 필요 없습니다.";

/// Sign in with email and password. Without `password` the console asks
/// for it.
pub async fn login(
    controller: &mut Controller,
    console: &mut Console,
    email: &str,
    password: Option<String>,
) -> std::io::Result<bool> {
    if controller.backend().auth.is_none() {
        println!("{NO_SIGN_IN}");
        if !controller.is_authenticated() {
            controller.sign_in(email, "").await;
        }
        return Ok(controller.is_authenticated());
    }
    let password = match password {
        Some(p) => p,
        None => match console.ask("비밀번호: ").await? {
            Some(p) => p,
            None => return Ok(false),
        },
    };
    Ok(sign_in(controller, email, &password).await)
}

async fn sign_in(controller: &mut Controller, email: &str, password: &str) -> bool {
    controller.sign_in(email, password).await;
    flush_notice(controller);
    if controller.is_authenticated() {
        return true;
    }
    if let Some(err) = controller.auth_error() {
        eprintln!("로그인 실패: {err}");
    }
    false
}

pub async fn logout(controller: &mut Controller) {
    if controller.backend().auth.is_none() {
        println!("{NO_SIGN_IN}");
        return;
    }
    controller.sign_out().await;
    flush_notice(controller);
}
