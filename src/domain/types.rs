// ==========================================
// 防汛救灾物资调配系统 - 领域类型定义
// ==========================================
// 依据: 四级行政层级（国家/省/区县/安置点）
// 红线: 调拨只能从某一级流向其直接下一级
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 国家级唯一隐式所有者ID
///
/// 国家级只有一个库存所有者，所有国家级库存单元均挂在该ID下
pub const NATIONAL_OWNER_ID: &str = "NATIONAL";

// ==========================================
// 行政层级 (Tier)
// ==========================================
// 顺序: National < Provincial < District < Shelter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    National,   // 国家级
    Provincial, // 省级
    District,   // 区县级
    Shelter,    // 安置点
}

impl Tier {
    /// 直接下一级（安置点无下级）
    pub fn child(&self) -> Option<Tier> {
        match self {
            Tier::National => Some(Tier::Provincial),
            Tier::Provincial => Some(Tier::District),
            Tier::District => Some(Tier::Shelter),
            Tier::Shelter => None,
        }
    }

    /// 直接上一级（国家级无上级）
    pub fn parent(&self) -> Option<Tier> {
        match self {
            Tier::National => None,
            Tier::Provincial => Some(Tier::National),
            Tier::District => Some(Tier::Provincial),
            Tier::Shelter => Some(Tier::District),
        }
    }

    /// 判断 other 是否为本级的直接下一级
    pub fn is_immediate_child(&self, other: Tier) -> bool {
        self.child() == Some(other)
    }

    /// 转换为数据库存储字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::National => "NATIONAL",
            Tier::Provincial => "PROVINCIAL",
            Tier::District => "DISTRICT",
            Tier::Shelter => "SHELTER",
        }
    }

    /// 从字符串解析层级
    pub fn parse(s: &str) -> Option<Tier> {
        match s.trim().to_uppercase().as_str() {
            "NATIONAL" => Some(Tier::National),
            "PROVINCIAL" => Some(Tier::Provincial),
            "DISTRICT" => Some(Tier::District),
            "SHELTER" => Some(Tier::Shelter),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 物资类型 (Resource Type)
// ==========================================
// 不可变参考数据: 类型 + 计量单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Food,     // 食品
    Water,    // 饮用水
    Medical,  // 医疗物资
    Shelter,  // 帐篷/安置物资
    Clothing, // 衣物
}

impl ResourceType {
    /// 计量单位
    pub fn unit(&self) -> &'static str {
        match self {
            ResourceType::Food => "tons",
            ResourceType::Water => "liters",
            ResourceType::Medical => "kits",
            ResourceType::Shelter => "units",
            ResourceType::Clothing => "bales",
        }
    }

    /// 转换为数据库存储字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Food => "FOOD",
            ResourceType::Water => "WATER",
            ResourceType::Medical => "MEDICAL",
            ResourceType::Shelter => "SHELTER",
            ResourceType::Clothing => "CLOTHING",
        }
    }

    /// 从字符串解析物资类型
    pub fn parse(s: &str) -> Option<ResourceType> {
        match s.trim().to_uppercase().as_str() {
            "FOOD" => Some(ResourceType::Food),
            "WATER" => Some(ResourceType::Water),
            "MEDICAL" => Some(ResourceType::Medical),
            "SHELTER" => Some(ResourceType::Shelter),
            "CLOTHING" => Some(ResourceType::Clothing),
            _ => None,
        }
    }

    /// 全部物资类型（汇总查询用）
    pub fn all() -> [ResourceType; 5] {
        [
            ResourceType::Food,
            ResourceType::Water,
            ResourceType::Medical,
            ResourceType::Shelter,
            ResourceType::Clothing,
        ]
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 请求优先级 (Request Priority)
// ==========================================
// 顺序: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,      // 低
    Medium,   // 中
    High,     // 高
    Critical, // 紧急
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Some(Priority::Low),
            "MEDIUM" => Some(Priority::Medium),
            "HIGH" => Some(Priority::High),
            "CRITICAL" => Some(Priority::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 请求状态 (Request Status)
// ==========================================
// 状态机: PENDING -> APPROVED / REJECTED，终态不可再变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,  // 待审批
    Approved, // 已批准
    Rejected, // 已驳回
}

impl RequestStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<RequestStatus> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(RequestStatus::Pending),
            "APPROVED" => Some(RequestStatus::Approved),
            "REJECTED" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 库存健康状态 (Stock Status)
// ==========================================
// 由使用率 allocated/quantity 判定，各层级共用同一套阈值
// 顺序: Adequate < Moderate < Low < Critical（严重度递增）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Adequate, // 充足
    Moderate, // 一般
    Low,      // 偏低
    Critical, // 告急
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Adequate => "ADEQUATE",
            StockStatus::Moderate => "MODERATE",
            StockStatus::Low => "LOW",
            StockStatus::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::National < Tier::Provincial);
        assert!(Tier::Provincial < Tier::District);
        assert!(Tier::District < Tier::Shelter);
    }

    #[test]
    fn test_tier_child_parent() {
        assert_eq!(Tier::National.child(), Some(Tier::Provincial));
        assert_eq!(Tier::Shelter.child(), None);
        assert_eq!(Tier::National.parent(), None);
        assert_eq!(Tier::Shelter.parent(), Some(Tier::District));

        assert!(Tier::National.is_immediate_child(Tier::Provincial));
        // 跨级不允许
        assert!(!Tier::National.is_immediate_child(Tier::District));
        assert!(!Tier::Provincial.is_immediate_child(Tier::Provincial));
    }

    #[test]
    fn test_tier_roundtrip() {
        for tier in [Tier::National, Tier::Provincial, Tier::District, Tier::Shelter] {
            assert_eq!(Tier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(Tier::parse("province"), None);
    }

    #[test]
    fn test_resource_type_unit() {
        assert_eq!(ResourceType::Food.unit(), "tons");
        assert_eq!(ResourceType::Water.unit(), "liters");
        assert_eq!(ResourceType::Medical.unit(), "kits");
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Critical);
        assert_eq!(Priority::parse("high"), Some(Priority::High));
    }

    #[test]
    fn test_request_status_terminal() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
    }
}
