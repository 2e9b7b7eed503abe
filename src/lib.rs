// ==========================================
// 防汛救灾物资调配系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite (可选 Tauri 桌面端)
// 系统定位: 四级物资调配决策支持系统 (人工最终控制权)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能观测
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 桌面端集成
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    Priority, RequestStatus, ResourceType, StockStatus, Tier, NATIONAL_OWNER_ID,
};

// 领域实体
pub use domain::{AllocationEvent, ResourceRequest, StockAvailability, StockRecord};

// 引擎
pub use engine::{
    AllocationEngine, RequestWorkflow, StatusClassifier, StatusThresholds,
};

// API
pub use api::{AllocationApi, RequestApi, StockApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "防汛救灾物资调配系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
