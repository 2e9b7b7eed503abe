// ==========================================
// 防汛救灾物资调配系统 - 库存单元领域模型
// ==========================================
// 库存单元 (stock cell): (tier, owner_id, resource_type) 唯一
// 不变量: 0 <= allocated <= quantity 任何时刻成立
// ==========================================

use crate::domain::types::{ResourceType, Tier};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// StockRecord - 库存记录
// ==========================================
// quantity:  该层级该物资累计接收总量（入库 + 上级下拨）
// allocated: 已下拨给下级的数量
// available: quantity - allocated（派生值，不落库）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    // ===== 主键 =====
    pub stock_id: String, // 不透明ID (uuid)

    // ===== 库存单元坐标 =====
    pub tier: Tier,             // 行政层级
    pub owner_id: String,       // 层级实例ID（省代码/区县ID/安置点ID）
    pub resource_type: ResourceType, // 物资类型

    // ===== 数量 =====
    pub quantity: i64,  // 累计接收总量
    pub allocated: i64, // 已下拨总量

    // ===== 审计 =====
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl StockRecord {
    /// 创建零值库存记录（首次流入时惰性建档）
    pub fn zero(tier: Tier, owner_id: &str, resource_type: ResourceType, now: NaiveDateTime) -> Self {
        Self {
            stock_id: uuid::Uuid::new_v4().to_string(),
            tier,
            owner_id: owner_id.to_string(),
            resource_type,
            quantity: 0,
            allocated: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 零值瞬态记录（查询未建档单元时返回，不落库）
    pub fn transient(tier: Tier, owner_id: &str, resource_type: ResourceType, now: NaiveDateTime) -> Self {
        let mut record = Self::zero(tier, owner_id, resource_type, now);
        record.stock_id = String::new();
        record
    }

    /// 检查不变量 0 <= allocated <= quantity
    pub fn invariant_holds(&self) -> bool {
        0 <= self.allocated && self.allocated <= self.quantity
    }
}

// ==========================================
// Trait: StockAvailability
// ==========================================
// 用途: 调拨引擎可用量检查接口
pub trait StockAvailability {
    /// 当前可下拨量
    fn available(&self) -> i64;

    /// 检查是否可再下拨 amount
    fn can_allocate(&self, amount: i64) -> bool;

    /// 使用率 allocated/quantity（quantity=0 时为 0）
    fn usage_ratio(&self) -> f64;
}

impl StockAvailability for StockRecord {
    fn available(&self) -> i64 {
        self.quantity - self.allocated
    }

    fn can_allocate(&self, amount: i64) -> bool {
        amount >= 1 && self.allocated + amount <= self.quantity
    }

    fn usage_ratio(&self) -> f64 {
        if self.quantity == 0 {
            0.0
        } else {
            self.allocated as f64 / self.quantity as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::NATIONAL_OWNER_ID;
    use chrono::Utc;

    fn make_record(quantity: i64, allocated: i64) -> StockRecord {
        let mut record = StockRecord::zero(
            Tier::National,
            NATIONAL_OWNER_ID,
            ResourceType::Food,
            Utc::now().naive_utc(),
        );
        record.quantity = quantity;
        record.allocated = allocated;
        record
    }

    #[test]
    fn test_available_is_derived() {
        let record = make_record(15000, 6500);
        assert_eq!(record.available(), 8500);
        assert!(record.invariant_holds());
    }

    #[test]
    fn test_can_allocate_boundaries() {
        let record = make_record(100, 40);
        assert!(record.can_allocate(60)); // 正好用尽
        assert!(!record.can_allocate(61));
        assert!(!record.can_allocate(0)); // 数量必须 >= 1
        assert!(!record.can_allocate(-5));
    }

    #[test]
    fn test_usage_ratio_zero_quantity() {
        let record = make_record(0, 0);
        assert_eq!(record.usage_ratio(), 0.0);

        let record = make_record(200, 50);
        assert!((record.usage_ratio() - 0.25).abs() < f64::EPSILON);
    }
}
