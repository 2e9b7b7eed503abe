// ==========================================
// 防汛救灾物资调配系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 校验失败必须带可解释原因
// ==========================================

pub mod allocation;
pub mod events;
pub mod flood_risk;
pub mod replay;
pub mod status;
pub mod workflow;

// 重导出核心引擎
pub use allocation::{AllocateCommand, AllocationEngine, AllocationError, AllocationOutcome};
pub use events::{
    AllocationEventPublisher, AllocationNotice, LoggingEventPublisher, NoOpEventPublisher,
};
pub use flood_risk::{FloodRiskProvider, RiskLabel, StaticFloodRiskProvider};
pub use replay::{build_history_rows, remaining_after_event, HistoryRow};
pub use status::{StatusClassifier, StatusThresholds};
pub use workflow::{FieldViolation, RequestWorkflow, SubmitCommand, WorkflowError};
