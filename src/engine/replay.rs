// ==========================================
// 防汛救灾物资调配系统 - 审计回放引擎
// ==========================================
// 职责: 由事件序列推导"某事件发生后该单元剩余可用量"
// 约定: 剩余量是派生值，只在读取时回放计算，从不落库
// 公式: remaining(i) = 当前可用量 + sum(第 i 条之后该单元作为调出方的事件数量)
// ==========================================

use crate::domain::allocation::AllocationEvent;
use crate::domain::stock::{StockAvailability, StockRecord};
use serde::{Deserialize, Serialize};

// ==========================================
// 回放结果行
// ==========================================

/// 审计视图的一行: 事件 + 该事件发生后的剩余可用量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRow {
    pub event: AllocationEvent,
    pub remaining_after: i64,
}

/// 计算第 index 条事件发生后该单元的剩余可用量
///
/// events 必须是该单元的事件序列（升序，与 AllocationLogRepository
/// find_by_cell 的返回一致）；只有该单元作为调出方的后续事件会影响剩余量，
/// 调入事件出现在序列中但不参与此推导
pub fn remaining_after_event(record: &StockRecord, events: &[AllocationEvent], index: usize) -> i64 {
    let outgoing_after: i64 = events
        .iter()
        .skip(index + 1)
        .filter(|e| e.is_source_cell(record.tier, &record.owner_id, record.resource_type))
        .map(|e| e.quantity)
        .sum();

    record.available() + outgoing_after
}

/// 为整个事件序列构建审计视图（历史弹窗的"剩余库存"列）
pub fn build_history_rows(record: &StockRecord, events: Vec<AllocationEvent>) -> Vec<HistoryRow> {
    (0..events.len())
        .map(|i| {
            let remaining_after = remaining_after_event(record, &events, i);
            HistoryRow {
                event: events[i].clone(),
                remaining_after,
            }
        })
        .collect()
}
