// ==========================================
// 防汛救灾物资调配系统 - 请求审批工作流引擎
// ==========================================
// 状态机: PENDING -> APPROVED / REJECTED，单次决定
// 红线: 库存不足时不强行部分满足，请求保持 PENDING
// ==========================================
// 职责: 提交校验 + 审批决定 + 批准时触发调拨
// 审批原子性: 先条件翻转 (WHERE status='PENDING') 预占决定权，
//             底层调拨失败再回退为 PENDING，避免同一请求被并发批准两次
// ==========================================

use crate::domain::request::ResourceRequest;
use crate::domain::types::{Priority, RequestStatus, ResourceType, Tier, NATIONAL_OWNER_ID};
use crate::engine::allocation::{AllocateCommand, AllocationEngine, AllocationError, AllocationOutcome};
use crate::repository::error::RepositoryError;
use crate::repository::request_repo::ResourceRequestRepository;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

// ==========================================
// 字段校验违规
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldViolation {
    /// 字段名
    pub field: String,
    /// 违规原因
    pub message: String,
}

// ==========================================
// 工作流错误
// ==========================================
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("请求校验失败: {} 项字段不合规", .violations.len())]
    ValidationFailed { violations: Vec<FieldViolation> },

    #[error("请求未找到: request_id={request_id}")]
    NotFound { request_id: String },

    #[error("请求已决定: request_id={request_id}, status={status}")]
    AlreadyDecided {
        request_id: String,
        status: RequestStatus,
    },

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// ==========================================
// 提交指令
// ==========================================
#[derive(Debug, Clone)]
pub struct SubmitCommand {
    pub requesting_tier: Tier,
    pub requesting_owner_id: String,
    pub resource_type: ResourceType,
    pub quantity: i64,
    pub priority: Priority,
    pub justification: String,
}

// ==========================================
// RequestWorkflow - 请求审批工作流
// ==========================================
pub struct RequestWorkflow {
    request_repo: Arc<ResourceRequestRepository>,
    allocation_engine: Arc<AllocationEngine>,
}

impl RequestWorkflow {
    /// 创建新的请求工作流引擎
    pub fn new(
        request_repo: Arc<ResourceRequestRepository>,
        allocation_engine: Arc<AllocationEngine>,
    ) -> Self {
        Self {
            request_repo,
            allocation_engine,
        }
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 提交物资请求（落库为 PENDING，不触碰库存）
    ///
    /// 校验规则（逐字段收集，一次性返回全部违规）:
    /// - quantity >= 1
    /// - justification 非空
    /// - requesting_owner_id 非空
    /// - requesting_tier 必须有直接上级（国家级不能发起请求）
    #[instrument(skip(self, command), fields(
        requester = %format!("{}:{}", command.requesting_tier, command.requesting_owner_id),
        resource_type = %command.resource_type,
        quantity = command.quantity,
    ))]
    pub fn submit(&self, command: SubmitCommand) -> Result<ResourceRequest, WorkflowError> {
        let mut violations = Vec::new();

        if command.quantity < 1 {
            violations.push(FieldViolation {
                field: "quantity".to_string(),
                message: format!("请求数量必须为正整数: {}", command.quantity),
            });
        }
        if command.justification.trim().is_empty() {
            violations.push(FieldViolation {
                field: "justification".to_string(),
                message: "申请理由不能为空".to_string(),
            });
        }
        if command.requesting_owner_id.trim().is_empty() {
            violations.push(FieldViolation {
                field: "requesting_owner_id".to_string(),
                message: "请求方ID不能为空".to_string(),
            });
        }
        if command.requesting_tier.parent().is_none() {
            violations.push(FieldViolation {
                field: "requesting_tier".to_string(),
                message: "国家级没有上级，不能发起物资请求".to_string(),
            });
        }

        if !violations.is_empty() {
            return Err(WorkflowError::ValidationFailed { violations });
        }

        let request = ResourceRequest::new(
            command.requesting_tier,
            &command.requesting_owner_id,
            command.resource_type,
            command.quantity,
            command.priority,
            command.justification.trim(),
            Utc::now().naive_utc(),
        );
        self.request_repo.insert(&request)?;

        tracing::info!(request_id = %request.request_id, "物资请求已提交");
        Ok(request)
    }

    // ==========================================
    // 审批
    // ==========================================

    /// 批准请求: 从直接上级向请求方调拨请求数量
    ///
    /// # 参数
    /// - parent_owner_id: 上级调出方实例ID（上级为国家级时可传任意值，
    ///   会被规范为固定的国家级所有者）
    ///
    /// # 失败
    /// - NotFound / AlreadyDecided: 请求不存在或已非 PENDING
    /// - Allocation(InsufficientStock): 上级可用量不足，请求保持 PENDING，
    ///   不做部分满足
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub fn approve(
        &self,
        request_id: &str,
        parent_owner_id: &str,
    ) -> Result<(ResourceRequest, AllocationOutcome), WorkflowError> {
        let request = self
            .request_repo
            .find_by_id(request_id)?
            .ok_or_else(|| WorkflowError::NotFound {
                request_id: request_id.to_string(),
            })?;

        if !request.is_pending() {
            return Err(WorkflowError::AlreadyDecided {
                request_id: request_id.to_string(),
                status: request.status,
            });
        }

        let parent_tier = request.parent_tier().ok_or_else(|| WorkflowError::ValidationFailed {
            violations: vec![FieldViolation {
                field: "requesting_tier".to_string(),
                message: "国家级请求无审批上级".to_string(),
            }],
        })?;
        let parent_owner_id = if parent_tier == Tier::National {
            NATIONAL_OWNER_ID
        } else {
            parent_owner_id
        };

        // 条件翻转预占决定权，并发审批只有一个能通过
        let now = Utc::now().naive_utc();
        let rows = self
            .request_repo
            .mark_decided(request_id, RequestStatus::Approved, now, None)?;
        if rows == 0 {
            return Err(WorkflowError::AlreadyDecided {
                request_id: request_id.to_string(),
                status: self
                    .request_repo
                    .find_by_id(request_id)?
                    .map(|r| r.status)
                    .unwrap_or(RequestStatus::Pending),
            });
        }

        // 触发调拨；失败则回退为 PENDING（保持"未决定"语义）
        let outcome = match self.allocation_engine.allocate(AllocateCommand {
            resource_type: request.resource_type,
            source_tier: parent_tier,
            source_owner_id: parent_owner_id.to_string(),
            dest_tier: request.requesting_tier,
            dest_owner_id: request.requesting_owner_id.clone(),
            quantity: request.quantity,
            note: Some(format!("审批拨付 request_id={}", request_id)),
        }) {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(revert_err) = self.request_repo.revert_to_pending(request_id) {
                    tracing::error!(
                        request_id = %request_id,
                        error = %revert_err,
                        "调拨失败后回退请求状态失败"
                    );
                }
                return Err(WorkflowError::Allocation(e));
            }
        };

        self.request_repo
            .attach_fulfillment(request_id, &outcome.event.event_id)?;

        let approved = self
            .request_repo
            .find_by_id(request_id)?
            .ok_or_else(|| WorkflowError::NotFound {
                request_id: request_id.to_string(),
            })?;

        tracing::info!(
            request_id = %request_id,
            event_id = %outcome.event.event_id,
            "请求已批准并完成拨付"
        );
        Ok((approved, outcome))
    }

    /// 驳回请求（终态，不触碰库存）
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub fn reject(&self, request_id: &str) -> Result<ResourceRequest, WorkflowError> {
        let request = self
            .request_repo
            .find_by_id(request_id)?
            .ok_or_else(|| WorkflowError::NotFound {
                request_id: request_id.to_string(),
            })?;

        if !request.is_pending() {
            return Err(WorkflowError::AlreadyDecided {
                request_id: request_id.to_string(),
                status: request.status,
            });
        }

        let rows = self.request_repo.mark_decided(
            request_id,
            RequestStatus::Rejected,
            Utc::now().naive_utc(),
            None,
        )?;
        if rows == 0 {
            return Err(WorkflowError::AlreadyDecided {
                request_id: request_id.to_string(),
                status: self
                    .request_repo
                    .find_by_id(request_id)?
                    .map(|r| r.status)
                    .unwrap_or(RequestStatus::Pending),
            });
        }

        let rejected = self
            .request_repo
            .find_by_id(request_id)?
            .ok_or_else(|| WorkflowError::NotFound {
                request_id: request_id.to_string(),
            })?;

        tracing::info!(request_id = %request_id, "请求已驳回");
        Ok(rejected)
    }
}
