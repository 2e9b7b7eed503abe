// ==========================================
// 防汛救灾物资调配系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod allocation;
pub mod request;
pub mod stock;
pub mod types;

// 重导出核心类型
pub use allocation::AllocationEvent;
pub use request::ResourceRequest;
pub use stock::{StockAvailability, StockRecord};
pub use types::{
    Priority, RequestStatus, ResourceType, StockStatus, Tier, NATIONAL_OWNER_ID,
};
