// ==========================================
// 防汛救灾物资调配系统 - 库存健康状态判定引擎
// ==========================================
// 红线: 全层级共用同一套阈值，卡片/徽章/仪表盘语义一致
// ==========================================
// 职责: 按使用率 allocated/quantity 判定健康状态
// 输入: quantity + allocated（或 StockRecord）
// 输出: StockStatus（纯函数，无副作用，不落库）
// ==========================================

use crate::domain::stock::StockRecord;
use crate::domain::types::StockStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// 状态阈值
// ==========================================
// usage <= adequate_max          -> Adequate
// adequate_max < usage <= moderate_max -> Moderate
// moderate_max < usage <= low_max      -> Low
// usage > low_max                -> Critical
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    pub adequate_max: f64,
    pub moderate_max: f64,
    pub low_max: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            adequate_max: 0.50,
            moderate_max: 0.70,
            low_max: 0.85,
        }
    }
}

// ==========================================
// StatusClassifier - 健康状态判定引擎
// ==========================================
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    thresholds: StatusThresholds,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusClassifier {
    /// 使用默认阈值创建判定引擎
    pub fn new() -> Self {
        Self {
            thresholds: StatusThresholds::default(),
        }
    }

    /// 使用自定义阈值创建（阈值来自 ConfigManager）
    pub fn with_thresholds(thresholds: StatusThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> StatusThresholds {
        self.thresholds
    }

    /// 使用率: allocated / quantity（quantity=0 视为 0）
    pub fn usage_ratio(quantity: i64, allocated: i64) -> f64 {
        if quantity == 0 {
            0.0
        } else {
            allocated as f64 / quantity as f64
        }
    }

    /// 判定库存健康状态
    pub fn classify(&self, quantity: i64, allocated: i64) -> StockStatus {
        let usage = Self::usage_ratio(quantity, allocated);
        if usage <= self.thresholds.adequate_max {
            StockStatus::Adequate
        } else if usage <= self.thresholds.moderate_max {
            StockStatus::Moderate
        } else if usage <= self.thresholds.low_max {
            StockStatus::Low
        } else {
            StockStatus::Critical
        }
    }

    /// 判定库存记录的健康状态
    pub fn classify_record(&self, record: &StockRecord) -> StockStatus {
        self.classify(record.quantity, record.allocated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_table() {
        let classifier = StatusClassifier::new();

        assert_eq!(classifier.classify(100, 0), StockStatus::Adequate);
        assert_eq!(classifier.classify(100, 50), StockStatus::Adequate); // 边界含
        assert_eq!(classifier.classify(100, 55), StockStatus::Moderate);
        assert_eq!(classifier.classify(100, 70), StockStatus::Moderate); // 边界含
        assert_eq!(classifier.classify(100, 75), StockStatus::Low);
        assert_eq!(classifier.classify(100, 85), StockStatus::Low); // 边界含
        assert_eq!(classifier.classify(100, 90), StockStatus::Critical);
    }

    #[test]
    fn test_zero_quantity_is_adequate() {
        let classifier = StatusClassifier::new();
        assert_eq!(classifier.classify(0, 0), StockStatus::Adequate);
    }

    #[test]
    fn test_classify_is_pure() {
        let classifier = StatusClassifier::new();
        // 重复调用结果一致
        for _ in 0..3 {
            assert_eq!(classifier.classify(200, 150), StockStatus::Low);
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let classifier = StatusClassifier::with_thresholds(StatusThresholds {
            adequate_max: 0.30,
            moderate_max: 0.60,
            low_max: 0.90,
        });
        assert_eq!(classifier.classify(100, 40), StockStatus::Moderate);
        assert_eq!(classifier.classify(100, 88), StockStatus::Low);
    }
}
