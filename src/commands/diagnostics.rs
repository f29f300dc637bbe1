use serde_json::{json, Value};

use crate::controller::Controller;
use crate::diagnostics;
use crate::error::Result;

/// About info, plus store health for the local backend.
pub fn collect(controller: &Controller) -> Result<Value> {
    let mut about = diagnostics::get_about_info();
    about["backend"] = json!(format!("{:?}", controller.backend().kind).to_lowercase());
    if let Some(db) = &controller.backend().local_db {
        about["store"] = diagnostics::get_store_health(db)?;
    }
    Ok(about)
}

pub fn show(controller: &Controller) -> Result<()> {
    let info = collect(controller)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
