// ==========================================
// 防汛救灾物资调配系统 - 调拨 API
// ==========================================
// 职责: 封装调拨引擎与补货入口，供前端命令层调用
// 架构: API 层 → Engine 层 → Repository 层
// ==========================================

use crate::api::dto::{
    parse_resource_type, parse_tier, AllocateResourcesRequest, AllocationEventDto,
    AllocationResponse, ReplenishStockRequest, StockViewDto,
};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::{Tier, NATIONAL_OWNER_ID};
use crate::engine::allocation::{AllocateCommand, AllocationEngine};
use crate::engine::status::StatusClassifier;
use crate::repository::stock_repo::StockRepository;
use std::sync::Arc;

// ==========================================
// AllocationApi - 调拨 API
// ==========================================
pub struct AllocationApi {
    engine: Arc<AllocationEngine>,
    stock_repo: Arc<StockRepository>,
    classifier: StatusClassifier,
}

impl AllocationApi {
    /// 创建新的调拨 API 实例
    pub fn new(
        engine: Arc<AllocationEngine>,
        stock_repo: Arc<StockRepository>,
        classifier: StatusClassifier,
    ) -> Self {
        Self {
            engine,
            stock_repo,
            classifier,
        }
    }

    /// 执行一次调拨
    ///
    /// # 返回
    /// - Ok(AllocationResponse): 事件 + 双方最新快照与健康状态
    /// - Err(ApiError): InvalidQuantity / InvalidTierTransition /
    ///   InsufficientStock（带实际可用量）等
    pub fn allocate(&self, request: AllocateResourcesRequest) -> ApiResult<AllocationResponse> {
        let command = AllocateCommand {
            resource_type: parse_resource_type(&request.resource_type)?,
            source_tier: parse_tier(&request.source_tier)?,
            source_owner_id: request.source_owner_id,
            dest_tier: parse_tier(&request.dest_tier)?,
            dest_owner_id: request.dest_owner_id,
            quantity: request.quantity,
            note: request.note,
        };

        let outcome = self.engine.allocate(command)?;
        Ok(AllocationResponse {
            event: AllocationEventDto::from_event(&outcome.event),
            source: StockViewDto::from_record(&outcome.source, outcome.source_status),
            dest: StockViewDto::from_record(&outcome.dest, outcome.dest_status),
        })
    }

    /// 国家级补货入库（顶层物资进入系统的唯一入口）
    ///
    /// 下级层级的 quantity 只能经由上级调拨到账，不允许直接补货
    pub fn replenish(&self, request: ReplenishStockRequest) -> ApiResult<StockViewDto> {
        if request.quantity < 1 {
            return Err(ApiError::InvalidQuantity {
                given: request.quantity,
            });
        }
        let resource_type = parse_resource_type(&request.resource_type)?;

        let record = self.stock_repo.increase_quantity(
            Tier::National,
            NATIONAL_OWNER_ID,
            resource_type,
            request.quantity,
        )?;

        tracing::info!(
            resource_type = %resource_type,
            quantity = request.quantity,
            note = request.note.as_deref().unwrap_or(""),
            "国家级补货入库"
        );

        let status = self.classifier.classify_record(&record);
        Ok(StockViewDto::from_record(&record, status))
    }
}
