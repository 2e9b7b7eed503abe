// ==========================================
// 防汛救灾物资调配系统 - 引擎层事件发布
// ==========================================
// 职责: 定义调拨事件通知 trait，实现依赖倒置
// 说明: Engine 层定义 trait，通知/前端适配层实现
// 约定: 通知失败只记日志，不影响调拨结果（调拨以台账提交为准）
// ==========================================

use crate::domain::types::{ResourceType, StockStatus, Tier};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;

// ==========================================
// 调拨通知
// ==========================================

/// 调拨完成通知
///
/// Engine 在台账事务提交后发布，供外部通知系统（站内信/推送）消费
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationNotice {
    /// 调拨事件ID
    pub event_id: String,
    /// 物资类型
    pub resource_type: ResourceType,
    /// 调出方
    pub source_tier: Tier,
    pub source_owner_id: String,
    /// 调入方
    pub dest_tier: Tier,
    pub dest_owner_id: String,
    /// 调拨数量
    pub quantity: i64,
    /// 调拨后双方健康状态
    pub source_status: StockStatus,
    pub dest_status: StockStatus,
    /// 事件时间
    pub event_ts: NaiveDateTime,
}

// ==========================================
// AllocationEventPublisher Trait
// ==========================================
// 用途: 调拨通知出口
// 实现者: NoOpEventPublisher / LoggingEventPublisher / 外部通知适配器
pub trait AllocationEventPublisher: Send + Sync {
    /// 发布调拨通知
    fn publish(&self, notice: &AllocationNotice) -> Result<(), Box<dyn Error>>;
}

/// 空实现（测试与纯库模式）
pub struct NoOpEventPublisher;

impl AllocationEventPublisher for NoOpEventPublisher {
    fn publish(&self, _notice: &AllocationNotice) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// 日志实现: 把调拨通知写入 tracing 日志
pub struct LoggingEventPublisher;

impl AllocationEventPublisher for LoggingEventPublisher {
    fn publish(&self, notice: &AllocationNotice) -> Result<(), Box<dyn Error>> {
        tracing::info!(
            event_id = %notice.event_id,
            resource_type = %notice.resource_type,
            source = %format!("{}:{}", notice.source_tier, notice.source_owner_id),
            dest = %format!("{}:{}", notice.dest_tier, notice.dest_owner_id),
            quantity = notice.quantity,
            source_status = %notice.source_status,
            dest_status = %notice.dest_status,
            "物资调拨完成"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::NATIONAL_OWNER_ID;
    use chrono::Utc;

    fn make_notice() -> AllocationNotice {
        AllocationNotice {
            event_id: "evt-1".to_string(),
            resource_type: ResourceType::Food,
            source_tier: Tier::National,
            source_owner_id: NATIONAL_OWNER_ID.to_string(),
            dest_tier: Tier::Provincial,
            dest_owner_id: "punjab".to_string(),
            quantity: 2000,
            source_status: StockStatus::Moderate,
            dest_status: StockStatus::Adequate,
            event_ts: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_noop_publisher_always_ok() {
        let publisher = NoOpEventPublisher;
        assert!(publisher.publish(&make_notice()).is_ok());
    }

    #[test]
    fn test_logging_publisher_ok() {
        let publisher = LoggingEventPublisher;
        assert!(publisher.publish(&make_notice()).is_ok());
    }
}
