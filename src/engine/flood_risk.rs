// ==========================================
// 防汛救灾物资调配系统 - 洪灾风险外部协作接口
// ==========================================
// 职责: 定义洪灾风险评估的调用边界（模型本身在外部服务）
// 说明: Engine 只消费风险标签，不关心预测实现
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

// ==========================================
// 风险标签 (Risk Label)
// ==========================================
// 顺序: Low < Medium < High < Severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLabel {
    Low,    // 低风险
    Medium, // 中风险
    High,   // 高风险
    Severe, // 重大风险
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "LOW",
            RiskLabel::Medium => "MEDIUM",
            RiskLabel::High => "HIGH",
            RiskLabel::Severe => "SEVERE",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// FloodRiskProvider Trait
// ==========================================
// 用途: 区域洪灾风险查询接口
// 实现者: StaticFloodRiskProvider（默认占位） / 外部模型服务适配器
#[async_trait]
pub trait FloodRiskProvider: Send + Sync {
    /// 查询指定区域的当前洪灾风险标签
    async fn assess(&self, owner_id: &str) -> Result<RiskLabel, Box<dyn Error + Send + Sync>>;
}

/// 静态实现: 对所有区域返回固定标签
///
/// 外部预测服务不可用或未接入时的默认实现
pub struct StaticFloodRiskProvider {
    label: RiskLabel,
}

impl StaticFloodRiskProvider {
    pub fn new(label: RiskLabel) -> Self {
        Self { label }
    }
}

impl Default for StaticFloodRiskProvider {
    fn default() -> Self {
        Self::new(RiskLabel::Low)
    }
}

#[async_trait]
impl FloodRiskProvider for StaticFloodRiskProvider {
    async fn assess(&self, _owner_id: &str) -> Result<RiskLabel, Box<dyn Error + Send + Sync>> {
        Ok(self.label)
    }
}
