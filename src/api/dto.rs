// ==========================================
// 防汛救灾物资调配系统 - API DTO 定义
// ==========================================
// 职责: 定义 API 层的请求和响应结构
// 约定: 对外枚举一律用 SCREAMING_SNAKE_CASE 字符串，
//       时间一律 "YYYY-MM-DD HH:MM:SS" 字符串
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::allocation::AllocationEvent;
use crate::domain::request::ResourceRequest;
use crate::domain::stock::{StockAvailability, StockRecord};
use crate::domain::types::{Priority, ResourceType, StockStatus, Tier};
use crate::engine::replay::HistoryRow;
use serde::{Deserialize, Serialize};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// 入参解析辅助
// ==========================================

pub(crate) fn parse_tier(s: &str) -> ApiResult<Tier> {
    Tier::parse(s).ok_or_else(|| ApiError::InvalidInput(format!("未知层级: {}", s)))
}

pub(crate) fn parse_resource_type(s: &str) -> ApiResult<ResourceType> {
    ResourceType::parse(s).ok_or_else(|| ApiError::InvalidInput(format!("未知物资类型: {}", s)))
}

pub(crate) fn parse_priority(s: &str) -> ApiResult<Priority> {
    Priority::parse(s).ok_or_else(|| ApiError::InvalidInput(format!("未知优先级: {}", s)))
}

// ==========================================
// 调拨
// ==========================================

/// 调拨请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateResourcesRequest {
    /// 物资类型（"FOOD" | "WATER" | "MEDICAL" | "SHELTER" | "CLOTHING"）
    pub resource_type: String,

    /// 调出方
    pub source_tier: String,
    pub source_owner_id: String,

    /// 调入方（必须是调出方的直接下一级）
    pub dest_tier: String,
    pub dest_owner_id: String,

    /// 调拨数量（正整数）
    pub quantity: i64,

    /// 备注（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 库存单元视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockViewDto {
    pub tier: String,
    pub owner_id: String,
    pub resource_type: String,
    /// 计量单位（tons/liters/kits/units/bales）
    pub unit: String,
    pub quantity: i64,
    pub allocated: i64,
    /// 派生: quantity - allocated
    pub available: i64,
    /// 健康状态（"ADEQUATE" | "MODERATE" | "LOW" | "CRITICAL"）
    pub status: String,
    /// 使用率百分比 (0-100)
    pub usage_pct: f64,
}

impl StockViewDto {
    pub fn from_record(record: &StockRecord, status: StockStatus) -> Self {
        Self {
            tier: record.tier.to_string(),
            owner_id: record.owner_id.clone(),
            resource_type: record.resource_type.to_string(),
            unit: record.resource_type.unit().to_string(),
            quantity: record.quantity,
            allocated: record.allocated,
            available: record.available(),
            status: status.to_string(),
            usage_pct: record.usage_ratio() * 100.0,
        }
    }
}

/// 调拨事件视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationEventDto {
    pub seq: Option<i64>,
    pub event_id: String,
    pub resource_type: String,
    pub source_tier: String,
    pub source_owner_id: String,
    pub dest_tier: String,
    pub dest_owner_id: String,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub event_ts: String,
}

impl AllocationEventDto {
    pub fn from_event(event: &AllocationEvent) -> Self {
        Self {
            seq: event.seq,
            event_id: event.event_id.clone(),
            resource_type: event.resource_type.to_string(),
            source_tier: event.source_tier.to_string(),
            source_owner_id: event.source_owner_id.clone(),
            dest_tier: event.dest_tier.to_string(),
            dest_owner_id: event.dest_owner_id.clone(),
            quantity: event.quantity,
            note: event.note.clone(),
            event_ts: event.event_ts.format(TS_FORMAT).to_string(),
        }
    }
}

/// 调拨响应: 事件 + 双方最新快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResponse {
    pub event: AllocationEventDto,
    pub source: StockViewDto,
    pub dest: StockViewDto,
}

// ==========================================
// 补货（国家级入库）
// ==========================================

/// 补货请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplenishStockRequest {
    pub resource_type: String,
    /// 入库数量（正整数）
    pub quantity: i64,
    /// 备注（可选，仅记日志）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ==========================================
// 物资请求工作流
// ==========================================

/// 请求提交
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResourceRequestDto {
    pub requesting_tier: String,
    pub requesting_owner_id: String,
    pub resource_type: String,
    pub quantity: i64,
    /// 优先级（"LOW" | "MEDIUM" | "HIGH" | "CRITICAL"）
    pub priority: String,
    /// 申请理由（必填）
    pub justification: String,
}

/// 物资请求视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequestDto {
    pub request_id: String,
    pub requesting_tier: String,
    pub requesting_owner_id: String,
    pub resource_type: String,
    pub quantity: i64,
    pub priority: String,
    pub justification: String,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfilled_event_id: Option<String>,
}

impl ResourceRequestDto {
    pub fn from_request(request: &ResourceRequest) -> Self {
        Self {
            request_id: request.request_id.clone(),
            requesting_tier: request.requesting_tier.to_string(),
            requesting_owner_id: request.requesting_owner_id.clone(),
            resource_type: request.resource_type.to_string(),
            quantity: request.quantity,
            priority: request.priority.to_string(),
            justification: request.justification.clone(),
            status: request.status.to_string(),
            created_at: request.created_at.format(TS_FORMAT).to_string(),
            decided_at: request.decided_at.map(|ts| ts.format(TS_FORMAT).to_string()),
            fulfilled_event_id: request.fulfilled_event_id.clone(),
        }
    }
}

/// 审批决定响应（批准时附带调拨结果，驳回时为空）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDecisionResponse {
    pub request: ResourceRequestDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationResponse>,
}

// ==========================================
// 审计视图
// ==========================================

/// 调拨历史行: 事件 + 该事件发生后的剩余可用量（回放派生）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationHistoryRowDto {
    #[serde(flatten)]
    pub event: AllocationEventDto,
    /// 事件发生后该单元剩余可用量
    pub remaining_after: i64,
}

impl AllocationHistoryRowDto {
    pub fn from_history_row(row: &HistoryRow) -> Self {
        Self {
            event: AllocationEventDto::from_event(&row.event),
            remaining_after: row.remaining_after,
        }
    }
}

/// 调拨历史响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationHistoryResponse {
    pub tier: String,
    pub owner_id: String,
    pub resource_type: String,
    /// 查询时间戳
    pub as_of: String,
    pub items: Vec<AllocationHistoryRowDto>,
    pub total_count: u32,
}

// ==========================================
// 驾驶舱汇总
// ==========================================

/// 层级汇总行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSummaryRowDto {
    pub resource_type: String,
    pub unit: String,
    pub total_quantity: i64,
    pub total_allocated: i64,
    pub total_available: i64,
    pub status: String,
    pub usage_pct: f64,
}

/// 层级汇总响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSummaryResponse {
    pub tier: String,
    pub as_of: String,
    pub items: Vec<StockSummaryRowDto>,
}

/// 区域概览: 库存 + 待审批请求数 + 洪灾风险标签
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionOverviewResponse {
    pub tier: String,
    pub owner_id: String,
    /// 洪灾风险标签（外部服务不可用时为空）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_label: Option<String>,
    pub stocks: Vec<StockViewDto>,
    pub pending_requests: i64,
}
