// ==========================================
// 防汛救灾物资调配系统 - Tauri 命令
// ==========================================
// 职责: 前端驾驶舱 IPC 入口，只做参数透传 + 错误映射
// 约定: 同步 API 统一走 spawn_blocking，避免阻塞 IPC 线程
// ==========================================

use crate::api::dto::{
    AllocateResourcesRequest, ReplenishStockRequest, SubmitResourceRequestDto,
};
use crate::api::error::ApiError;
use crate::app::state::AppState;
use serde::{Deserialize, Serialize};

// ==========================================
// 公共工具: 错误映射
// ==========================================

/// 错误响应（返回给前端）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    pub details: Option<serde_json::Value>,
}

/// 将ApiError转换为JSON字符串（Tauri要求）
pub(super) fn map_api_error(err: ApiError) -> String {
    let error_response = ErrorResponse {
        code: match &err {
            ApiError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            ApiError::InvalidTierTransition { .. } => "INVALID_TIER_TRANSITION",
            ApiError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            ApiError::ValidationFailed { .. } => "VALIDATION_FAILED",
            ApiError::AlreadyDecided { .. } => "ALREADY_DECIDED",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::ImportFailed(_) => "IMPORT_FAILED",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
        .to_string(),
        message: err.to_string(),
        details: match &err {
            // 前端据此提示"不能调拨超过 N 可用量"
            ApiError::InsufficientStock { available, requested } => Some(serde_json::json!({
                "available": available,
                "requested": requested,
            })),
            ApiError::ValidationFailed { violations } => {
                Some(serde_json::json!({ "violations": violations }))
            }
            ApiError::AlreadyDecided { request_id, status } => Some(serde_json::json!({
                "request_id": request_id,
                "status": status.to_string(),
            })),
            _ => None,
        },
    };

    serde_json::to_string(&error_response)
        .unwrap_or_else(|_| format!("{{\"code\":\"INTERNAL_ERROR\",\"message\":\"{}\"}}", err))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("序列化失败: {}", e))
}

// ==========================================
// 调拨相关命令
// ==========================================

/// 执行调拨
#[tauri::command(rename_all = "snake_case")]
pub async fn allocate_resources(
    state: tauri::State<'_, AppState>,
    resource_type: String,
    source_tier: String,
    source_owner_id: String,
    dest_tier: String,
    dest_owner_id: String,
    quantity: i64,
    note: Option<String>,
) -> Result<String, String> {
    let allocation_api = state.allocation_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.allocate_resources");
        allocation_api.allocate(AllocateResourcesRequest {
            resource_type,
            source_tier,
            source_owner_id,
            dest_tier,
            dest_owner_id,
            quantity,
            note,
        })
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

/// 国家级补货入库
#[tauri::command(rename_all = "snake_case")]
pub async fn replenish_stock(
    state: tauri::State<'_, AppState>,
    resource_type: String,
    quantity: i64,
    note: Option<String>,
) -> Result<String, String> {
    let allocation_api = state.allocation_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.replenish_stock");
        allocation_api.replenish(ReplenishStockRequest {
            resource_type,
            quantity,
            note,
        })
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

// ==========================================
// 物资请求相关命令
// ==========================================

/// 提交物资请求
#[tauri::command(rename_all = "snake_case")]
pub async fn submit_resource_request(
    state: tauri::State<'_, AppState>,
    requesting_tier: String,
    requesting_owner_id: String,
    resource_type: String,
    quantity: i64,
    priority: String,
    justification: String,
) -> Result<String, String> {
    let request_api = state.request_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.submit_resource_request");
        request_api.submit_request(SubmitResourceRequestDto {
            requesting_tier,
            requesting_owner_id,
            resource_type,
            quantity,
            priority,
            justification,
        })
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

/// 批准物资请求
#[tauri::command(rename_all = "snake_case")]
pub async fn approve_resource_request(
    state: tauri::State<'_, AppState>,
    request_id: String,
    parent_owner_id: String,
) -> Result<String, String> {
    let request_api = state.request_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.approve_resource_request");
        request_api.approve_request(&request_id, &parent_owner_id)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

/// 驳回物资请求
#[tauri::command(rename_all = "snake_case")]
pub async fn reject_resource_request(
    state: tauri::State<'_, AppState>,
    request_id: String,
) -> Result<String, String> {
    let request_api = state.request_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.reject_resource_request");
        request_api.reject_request(&request_id)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

/// 查询请求列表（默认 PENDING 收件箱）
#[tauri::command(rename_all = "snake_case")]
pub async fn list_resource_requests(
    state: tauri::State<'_, AppState>,
    status: Option<String>,
) -> Result<String, String> {
    let request_api = state.request_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.list_resource_requests");
        request_api.list_requests(status)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

// ==========================================
// 库存查询相关命令
// ==========================================

/// 查询单个库存单元
#[tauri::command(rename_all = "snake_case")]
pub async fn get_stock(
    state: tauri::State<'_, AppState>,
    tier: String,
    owner_id: String,
    resource_type: String,
) -> Result<String, String> {
    let stock_api = state.stock_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.get_stock");
        stock_api.get_stock(&tier, &owner_id, &resource_type)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

/// 查询某层级实例名下全部库存
#[tauri::command(rename_all = "snake_case")]
pub async fn list_stock(
    state: tauri::State<'_, AppState>,
    tier: String,
    owner_id: String,
) -> Result<String, String> {
    let stock_api = state.stock_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.list_stock");
        stock_api.list_stock(&tier, &owner_id)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

/// 层级库存汇总
#[tauri::command(rename_all = "snake_case")]
pub async fn get_stock_summary(
    state: tauri::State<'_, AppState>,
    tier: String,
) -> Result<String, String> {
    let stock_api = state.stock_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.get_stock_summary");
        stock_api.get_stock_summary(&tier)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

/// 查询调拨历史（含剩余库存列）
#[tauri::command(rename_all = "snake_case")]
pub async fn get_allocation_history(
    state: tauri::State<'_, AppState>,
    tier: String,
    owner_id: String,
    resource_type: String,
) -> Result<String, String> {
    let stock_api = state.stock_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.get_allocation_history");
        stock_api.get_allocation_history(&tier, &owner_id, &resource_type)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

/// 最近调拨动态
#[tauri::command(rename_all = "snake_case")]
pub async fn get_recent_allocations(
    state: tauri::State<'_, AppState>,
    limit: u32,
) -> Result<String, String> {
    let stock_api = state.stock_api.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new("ipc.get_recent_allocations");
        stock_api.get_recent_allocations(limit)
    })
    .await
    .map_err(|e| format!("任务执行失败: {}", e))?
    .map_err(map_api_error)?;

    to_json(&result)
}

/// 区域概览（库存 + 待审批请求 + 洪灾风险标签）
#[tauri::command(rename_all = "snake_case")]
pub async fn get_region_overview(
    state: tauri::State<'_, AppState>,
    tier: String,
    owner_id: String,
) -> Result<String, String> {
    let _perf = crate::perf::PerfGuard::new("ipc.get_region_overview");
    let result = state
        .stock_api
        .get_region_overview(&tier, &owner_id)
        .await
        .map_err(map_api_error)?;

    to_json(&result)
}

// ==========================================
// 导入相关命令
// ==========================================

/// 导入国家级入库单（CSV）
#[tauri::command(rename_all = "snake_case")]
pub async fn import_intake_csv(
    state: tauri::State<'_, AppState>,
    file_path: String,
) -> Result<String, String> {
    use crate::importer::IntakeImporter;

    let _perf = crate::perf::PerfGuard::new("ipc.import_intake_csv");
    let report = state
        .intake_importer
        .import_from_csv(std::path::PathBuf::from(file_path))
        .await
        .map_err(|e| map_api_error(e.into()))?;

    to_json(&report)
}
