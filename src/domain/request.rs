// ==========================================
// 防汛救灾物资调配系统 - 物资请求领域模型
// ==========================================
// 下级向直接上级发起的物资请求
// 状态机: PENDING -> APPROVED / REJECTED（单次决定，终态不可变）
// ==========================================

use crate::domain::types::{Priority, RequestStatus, ResourceType, Tier};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ResourceRequest - 物资请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// 请求ID (uuid)
    pub request_id: String,

    /// 请求方（下级层级实例）
    pub requesting_tier: Tier,
    pub requesting_owner_id: String,

    /// 请求内容
    pub resource_type: ResourceType,
    pub quantity: i64,
    pub priority: Priority,
    pub justification: String, // 申请理由，必填

    /// 状态
    pub status: RequestStatus,

    /// 时间
    pub created_at: NaiveDateTime,
    pub decided_at: Option<NaiveDateTime>,

    /// 批准后关联的调拨事件ID（驳回/待审批为空）
    pub fulfilled_event_id: Option<String>,
}

impl ResourceRequest {
    /// 构造新请求（初始 PENDING）
    pub fn new(
        requesting_tier: Tier,
        requesting_owner_id: &str,
        resource_type: ResourceType,
        quantity: i64,
        priority: Priority,
        justification: &str,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            requesting_tier,
            requesting_owner_id: requesting_owner_id.to_string(),
            resource_type,
            quantity,
            priority,
            justification: justification.to_string(),
            status: RequestStatus::Pending,
            created_at,
            decided_at: None,
            fulfilled_event_id: None,
        }
    }

    /// 是否仍待审批
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// 审批来源层级（请求方的直接上级）
    pub fn parent_tier(&self) -> Option<Tier> {
        self.requesting_tier.parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_new_request_is_pending() {
        let request = ResourceRequest::new(
            Tier::Provincial,
            "punjab",
            ResourceType::Food,
            2000,
            Priority::High,
            "洪灾安置点口粮告急",
            Utc::now().naive_utc(),
        );

        assert!(request.is_pending());
        assert_eq!(request.parent_tier(), Some(Tier::National));
        assert!(request.decided_at.is_none());
        assert!(request.fulfilled_event_id.is_none());
    }

    #[test]
    fn test_national_has_no_parent_tier() {
        let request = ResourceRequest::new(
            Tier::National,
            "NATIONAL",
            ResourceType::Food,
            1,
            Priority::Low,
            "x",
            Utc::now().naive_utc(),
        );
        assert_eq!(request.parent_tier(), None);
    }
}
