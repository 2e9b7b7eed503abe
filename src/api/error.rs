// ==========================================
// 防汛救灾物资调配系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换引擎/仓储错误为用户友好的错误消息
// 约定: 每个错误必须包含显式原因，前端据此生成提示文案
// ==========================================

use crate::domain::types::RequestStatus;
use crate::engine::allocation::AllocationError;
use crate::engine::workflow::{FieldViolation, WorkflowError};
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调拨业务错误
    // ==========================================
    #[error("无效调拨数量: {given}（必须为正整数）")]
    InvalidQuantity { given: i64 },

    #[error("无效层级流向: from={from} to={to}（只允许调拨给直接下一级）")]
    InvalidTierTransition { from: String, to: String },

    /// 错误中携带实际可用量，前端提示"不能调拨超过 {available} 可用量"
    #[error("库存不足: 可用={available}, 请求={requested}")]
    InsufficientStock { available: i64, requested: i64 },

    // ==========================================
    // 请求工作流错误
    // ==========================================
    #[error("请求校验失败: {} 项字段不合规", .violations.len())]
    ValidationFailed { violations: Vec<FieldViolation> },

    #[error("请求已决定: request_id={request_id}, status={status}")]
    AlreadyDecided {
        request_id: String,
        status: RequestStatus,
    },

    // ==========================================
    // 通用业务错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportFailed(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将仓储层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InsufficientStock { available, requested } => {
                ApiError::InsufficientStock { available, requested }
            }
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("CHECK约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 AllocationError 转换
// ==========================================
impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InvalidQuantity { given } => ApiError::InvalidQuantity { given },
            AllocationError::InvalidTierTransition { from, to } => ApiError::InvalidTierTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            AllocationError::InvalidOwner { expected, given } => ApiError::InvalidInput(format!(
                "国家级库存所有者固定为 {}，收到 {}",
                expected, given
            )),
            AllocationError::InsufficientStock { available, requested } => {
                ApiError::InsufficientStock { available, requested }
            }
            AllocationError::Repository(err) => err.into(),
        }
    }
}

// ==========================================
// 从 WorkflowError 转换
// ==========================================
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::ValidationFailed { violations } => {
                ApiError::ValidationFailed { violations }
            }
            WorkflowError::NotFound { request_id } => {
                ApiError::NotFound(format!("ResourceRequest(id={})不存在", request_id))
            }
            WorkflowError::AlreadyDecided { request_id, status } => {
                ApiError::AlreadyDecided { request_id, status }
            }
            WorkflowError::Allocation(err) => err.into(),
            WorkflowError::Repository(err) => err.into(),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(repo_err) => repo_err.into(),
            other => ApiError::ImportFailed(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
