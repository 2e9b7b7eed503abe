// ==========================================
// 防汛救灾物资调配系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 所有仓储共享同一个数据库连接，
//       调拨事务的互斥由连接锁 + SQLite 事务共同保证
// ==========================================

use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};

use crate::api::{AllocationApi, RequestApi, StockApi};
use crate::config::ConfigManager;
use crate::engine::allocation::AllocationEngine;
use crate::engine::events::LoggingEventPublisher;
use crate::engine::flood_risk::StaticFloodRiskProvider;
use crate::engine::status::StatusClassifier;
use crate::engine::workflow::RequestWorkflow;
use crate::importer::CsvIntakeImporter;
use crate::repository::{
    AllocationLogRepository, ResourceRequestRepository, StockRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
/// 在桌面端应用中作为全局状态管理
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 调拨API
    pub allocation_api: Arc<AllocationApi>,

    /// 物资请求API
    pub request_api: Arc<RequestApi>,

    /// 库存查询API
    pub stock_api: Arc<StockApi>,

    /// 入库导入器
    pub intake_importer: Arc<CsvIntakeImporter>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建并装配全部仓储/引擎/API
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在则建库）
    pub fn new(db_path: String) -> Result<Self, Box<dyn Error>> {
        let mut conn = crate::db::open_sqlite_connection(&db_path)?;
        crate::perf::install_sqlite_tracing(&mut conn);
        crate::db::init_schema(&conn)?;

        if let Some(version) = crate::db::read_schema_version(&conn)? {
            if version != crate::db::CURRENT_SCHEMA_VERSION {
                tracing::warn!(
                    found = version,
                    expected = crate::db::CURRENT_SCHEMA_VERSION,
                    "数据库 schema 版本与代码不一致"
                );
            }
        }

        let conn: Arc<Mutex<Connection>> = Arc::new(Mutex::new(conn));

        // ===== 仓储层 =====
        let stock_repo = Arc::new(StockRepository::from_connection(conn.clone()));
        let allocation_log_repo = Arc::new(AllocationLogRepository::from_connection(conn.clone()));
        let request_repo = Arc::new(ResourceRequestRepository::from_connection(conn.clone()));

        // ===== 配置层 =====
        let config_manager = Arc::new(ConfigManager::from_connection(conn)?);
        let classifier = StatusClassifier::with_thresholds(config_manager.status_thresholds()?);
        let flood_risk = Arc::new(StaticFloodRiskProvider::new(
            config_manager.default_flood_risk_label()?,
        ));

        // ===== 引擎层 =====
        let allocation_engine = Arc::new(AllocationEngine::with_classifier(
            stock_repo.clone(),
            Arc::new(LoggingEventPublisher),
            classifier.clone(),
        ));
        let workflow = Arc::new(RequestWorkflow::new(
            request_repo.clone(),
            allocation_engine.clone(),
        ));

        // ===== API 层 =====
        let allocation_api = Arc::new(AllocationApi::new(
            allocation_engine,
            stock_repo.clone(),
            classifier.clone(),
        ));
        let request_api = Arc::new(RequestApi::new(workflow, request_repo.clone()));
        let stock_api = Arc::new(StockApi::new(
            stock_repo.clone(),
            allocation_log_repo,
            request_repo,
            classifier,
            flood_risk,
        ));
        let intake_importer = Arc::new(CsvIntakeImporter::new(stock_repo));

        Ok(Self {
            db_path,
            allocation_api,
            request_api,
            stock_api,
            intake_importer,
            config_manager,
        })
    }
}

/// 解析默认数据库路径
///
/// 优先级: 环境变量 > 用户数据目录 > 当前目录回退
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("RELIEF_ALLOCATION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./relief_allocation.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("relief-allocation-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("relief-allocation");
        }

        if let Err(e) = std::fs::create_dir_all(&path) {
            tracing::warn!(error = %e, "无法创建数据目录，回退到当前目录");
            return "./relief_allocation.db".to_string();
        }
        path = path.join("relief_allocation.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_new_with_temp_db() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);

        // 装配完成后可直接走只读查询
        let summary = state.stock_api.get_stock_summary("NATIONAL").unwrap();
        assert!(summary.items.is_empty());
    }
}
