use std::path::Path;
use tracing::error;

use crate::controller::Controller;
use crate::error::{Result, SalesError};
use crate::menu::{import_menu, ImportSummary, MenuFile};

/// Load a menu file into the local database and reload the catalog.
pub async fn import(controller: &mut Controller, path: &Path) -> bool {
    match import_file(controller, path) {
        Ok(summary) => {
            controller.load_catalog().await;
            println!(
                "메뉴를 불러왔어요: 카테고리 {}개, 메뉴 {}개, 비활성 {}개",
                summary.categories, summary.menus, summary.deactivated
            );
            true
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "menu import failed");
            eprintln!("메뉴 불러오기 실패: {e}");
            false
        }
    }
}

fn import_file(controller: &Controller, path: &Path) -> Result<ImportSummary> {
    let db = controller.backend().local_db.clone().ok_or_else(|| {
        SalesError::Validation("메뉴 파일은 로컬 백엔드에서만 불러올 수 있습니다.".into())
    })?;
    let file = MenuFile::load(path)?;
    import_menu(&db, &file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Backend;

    #[tokio::test]
    async fn test_import_reloads_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("menu.json");
        std::fs::write(
            &path,
            r#"{ "디저트": [{ "id": "cake", "name": "치즈케이크", "price": 6000 }] }"#,
        )
        .expect("write");

        let mut c = crate::commands::testing::controller().await;
        assert!(import(&mut c, &path).await);
        assert_eq!(c.catalog().categories().len(), 1);
        assert_eq!(c.selected_category(), Some("디저트"));
        assert!(c.catalog().menu("americano").is_none());
    }

    #[tokio::test]
    async fn test_import_needs_local_backend() {
        let mut c = Controller::new(Backend::unconfigured(), Vec::new());
        c.start().await;
        assert!(!import(&mut c, Path::new("menu.json")).await);
    }
}
