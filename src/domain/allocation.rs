// ==========================================
// 防汛救灾物资调配系统 - 调拨事件领域模型
// ==========================================
// 调拨事件是只追加的审计记录，一经写入不再修改
// seq 为提交顺序号，由数据库在提交时分配
// ==========================================

use crate::domain::types::{ResourceType, Tier};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// AllocationEvent - 调拨事件
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationEvent {
    /// 提交顺序号（落库时分配，同一单元的事件按 seq 单调递增）
    pub seq: Option<i64>,

    /// 事件ID (uuid)
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

    /// 备注（可选）
    pub note: Option<String>,

    /// 事件时间
    pub event_ts: NaiveDateTime,
}

impl AllocationEvent {
    /// 构造新调拨事件（尚未落库，seq 为空）
    pub fn new(
        resource_type: ResourceType,
        source_tier: Tier,
        source_owner_id: &str,
        dest_tier: Tier,
        dest_owner_id: &str,
        quantity: i64,
        note: Option<String>,
        event_ts: NaiveDateTime,
    ) -> Self {
        Self {
            seq: None,
            event_id: uuid::Uuid::new_v4().to_string(),
            resource_type,
            source_tier,
            source_owner_id: source_owner_id.to_string(),
            dest_tier,
            dest_owner_id: dest_owner_id.to_string(),
            quantity,
            note,
            event_ts,
        }
    }

    /// 判断指定库存单元是否为本事件的调出方
    pub fn is_source_cell(&self, tier: Tier, owner_id: &str, resource_type: ResourceType) -> bool {
        self.source_tier == tier
            && self.source_owner_id == owner_id
            && self.resource_type == resource_type
    }

    /// 判断指定库存单元是否为本事件的调入方
    pub fn is_dest_cell(&self, tier: Tier, owner_id: &str, resource_type: ResourceType) -> bool {
        self.dest_tier == tier
            && self.dest_owner_id == owner_id
            && self.resource_type == resource_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::NATIONAL_OWNER_ID;
    use chrono::Utc;

    #[test]
    fn test_cell_matching() {
        let event = AllocationEvent::new(
            ResourceType::Water,
            Tier::National,
            NATIONAL_OWNER_ID,
            Tier::Provincial,
            "punjab",
            3000,
            None,
            Utc::now().naive_utc(),
        );

        assert!(event.is_source_cell(Tier::National, NATIONAL_OWNER_ID, ResourceType::Water));
        assert!(event.is_dest_cell(Tier::Provincial, "punjab", ResourceType::Water));
        // 物资类型不同则不匹配
        assert!(!event.is_source_cell(Tier::National, NATIONAL_OWNER_ID, ResourceType::Food));
        assert!(!event.is_dest_cell(Tier::Provincial, "sindh", ResourceType::Water));
    }
}
