// ==========================================
// 防汛救灾物资调配系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod allocation_log_repo;
pub mod error;
pub mod request_repo;
pub mod stock_repo;

// 重导出核心仓储
pub use allocation_log_repo::AllocationLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use request_repo::ResourceRequestRepository;
pub use stock_repo::{StockRepository, StockSummaryRow};
