use super::{flush_notice, Console};
use crate::controller::Controller;

pub const CONFIRM_DELETE: &str = "이 판매 내역을 삭제할까요?";

/// Correct the price of a sale.
pub async fn edit(controller: &mut Controller, id: i64, price_raw: &str) -> bool {
    let ok = controller.edit_price(id, price_raw).await;
    if ok {
        println!("#{id} 가격을 수정했어요.");
    }
    flush_notice(controller);
    ok
}

/// Ask before deleting unless `yes` was given. End of input declines.
pub async fn confirm_delete(console: &mut Console, yes: bool) -> std::io::Result<bool> {
    if yes {
        return Ok(true);
    }
    console.confirm(CONFIRM_DELETE).await
}

pub async fn delete(controller: &mut Controller, id: i64) -> bool {
    let ok = controller.delete_sale(id).await;
    if ok {
        println!("#{id} 판매 내역을 삭제했어요.");
    }
    flush_notice(controller);
    ok
}
