// ==========================================
// 防汛救灾物资调配系统 - 物资请求 API
// ==========================================
// 职责: 封装请求审批工作流，提供审批收件箱查询
// 架构: API 层 → Engine 层 (RequestWorkflow) → Repository 层
// ==========================================

use crate::api::dto::{
    parse_priority, parse_resource_type, parse_tier, AllocationEventDto, AllocationResponse,
    RequestDecisionResponse, ResourceRequestDto, StockViewDto, SubmitResourceRequestDto,
};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::RequestStatus;
use crate::engine::workflow::{RequestWorkflow, SubmitCommand};
use crate::repository::request_repo::ResourceRequestRepository;
use std::sync::Arc;

// ==========================================
// RequestApi - 物资请求 API
// ==========================================
pub struct RequestApi {
    workflow: Arc<RequestWorkflow>,
    request_repo: Arc<ResourceRequestRepository>,
}

impl RequestApi {
    /// 创建新的请求 API 实例
    pub fn new(
        workflow: Arc<RequestWorkflow>,
        request_repo: Arc<ResourceRequestRepository>,
    ) -> Self {
        Self {
            workflow,
            request_repo,
        }
    }

    /// 提交物资请求（落库为 PENDING，不触碰库存）
    pub fn submit_request(
        &self,
        request: SubmitResourceRequestDto,
    ) -> ApiResult<ResourceRequestDto> {
        let command = SubmitCommand {
            requesting_tier: parse_tier(&request.requesting_tier)?,
            requesting_owner_id: request.requesting_owner_id,
            resource_type: parse_resource_type(&request.resource_type)?,
            quantity: request.quantity,
            priority: parse_priority(&request.priority)?,
            justification: request.justification,
        };

        let submitted = self.workflow.submit(command)?;
        Ok(ResourceRequestDto::from_request(&submitted))
    }

    /// 批准请求: 从直接上级拨付请求数量
    ///
    /// 上级可用量不足时返回 InsufficientStock，请求保持 PENDING
    pub fn approve_request(
        &self,
        request_id: &str,
        parent_owner_id: &str,
    ) -> ApiResult<RequestDecisionResponse> {
        if request_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("请求ID不能为空".to_string()));
        }

        let (approved, outcome) = self.workflow.approve(request_id, parent_owner_id)?;
        Ok(RequestDecisionResponse {
            request: ResourceRequestDto::from_request(&approved),
            allocation: Some(AllocationResponse {
                event: AllocationEventDto::from_event(&outcome.event),
                source: StockViewDto::from_record(&outcome.source, outcome.source_status),
                dest: StockViewDto::from_record(&outcome.dest, outcome.dest_status),
            }),
        })
    }

    /// 驳回请求（终态，不触碰库存）
    pub fn reject_request(&self, request_id: &str) -> ApiResult<RequestDecisionResponse> {
        if request_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("请求ID不能为空".to_string()));
        }

        let rejected = self.workflow.reject(request_id)?;
        Ok(RequestDecisionResponse {
            request: ResourceRequestDto::from_request(&rejected),
            allocation: None,
        })
    }

    /// 按状态查询请求（审批收件箱），新请求在前
    ///
    /// status 为空时返回 PENDING 队列
    pub fn list_requests(&self, status: Option<String>) -> ApiResult<Vec<ResourceRequestDto>> {
        let status = match status.as_deref() {
            None | Some("") => RequestStatus::Pending,
            Some(raw) => RequestStatus::parse(raw)
                .ok_or_else(|| ApiError::InvalidInput(format!("未知请求状态: {}", raw)))?,
        };

        let requests = self.request_repo.list_by_status(status)?;
        Ok(requests.iter().map(ResourceRequestDto::from_request).collect())
    }

    /// 查询某层级实例发起的全部请求
    pub fn list_requests_by_requester(
        &self,
        tier: &str,
        owner_id: &str,
    ) -> ApiResult<Vec<ResourceRequestDto>> {
        let tier = parse_tier(tier)?;
        let requests = self.request_repo.list_by_requester(tier, owner_id)?;
        Ok(requests.iter().map(ResourceRequestDto::from_request).collect())
    }
}
