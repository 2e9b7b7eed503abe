// ==========================================
// 防汛救灾物资调配系统 - 库存查询 API
// ==========================================
// 职责: 驾驶舱只读查询（库存卡片/汇总/调拨历史/区域概览）
// 约定: 全部为纯读取，无副作用，可重复调用
// ==========================================

use crate::api::dto::{
    parse_resource_type, parse_tier, AllocationEventDto, AllocationHistoryResponse,
    AllocationHistoryRowDto, RegionOverviewResponse, StockSummaryResponse, StockSummaryRowDto,
    StockViewDto,
};
use crate::api::error::ApiResult;
use crate::engine::flood_risk::FloodRiskProvider;
use crate::engine::replay::build_history_rows;
use crate::engine::status::StatusClassifier;
use crate::repository::allocation_log_repo::AllocationLogRepository;
use crate::repository::request_repo::ResourceRequestRepository;
use crate::repository::stock_repo::StockRepository;
use chrono::Utc;
use std::sync::Arc;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// StockApi - 库存查询 API
// ==========================================
pub struct StockApi {
    stock_repo: Arc<StockRepository>,
    allocation_log_repo: Arc<AllocationLogRepository>,
    request_repo: Arc<ResourceRequestRepository>,
    classifier: StatusClassifier,
    flood_risk: Arc<dyn FloodRiskProvider>,
}

impl StockApi {
    /// 创建新的库存查询 API 实例
    pub fn new(
        stock_repo: Arc<StockRepository>,
        allocation_log_repo: Arc<AllocationLogRepository>,
        request_repo: Arc<ResourceRequestRepository>,
        classifier: StatusClassifier,
        flood_risk: Arc<dyn FloodRiskProvider>,
    ) -> Self {
        Self {
            stock_repo,
            allocation_log_repo,
            request_repo,
            classifier,
            flood_risk,
        }
    }

    // ==========================================
    // 库存卡片
    // ==========================================

    /// 查询单个库存单元（未建档返回零值视图，永不失败）
    pub fn get_stock(
        &self,
        tier: &str,
        owner_id: &str,
        resource_type: &str,
    ) -> ApiResult<StockViewDto> {
        let tier = parse_tier(tier)?;
        let resource_type = parse_resource_type(resource_type)?;

        let record = self.stock_repo.get_or_transient(tier, owner_id, resource_type)?;
        let status = self.classifier.classify_record(&record);
        Ok(StockViewDto::from_record(&record, status))
    }

    /// 查询某层级实例名下全部库存卡片
    pub fn list_stock(&self, tier: &str, owner_id: &str) -> ApiResult<Vec<StockViewDto>> {
        let tier = parse_tier(tier)?;
        let records = self.stock_repo.find_by_owner(tier, owner_id)?;

        Ok(records
            .iter()
            .map(|record| {
                let status = self.classifier.classify_record(record);
                StockViewDto::from_record(record, status)
            })
            .collect())
    }

    // ==========================================
    // 驾驶舱汇总
    // ==========================================

    /// 按层级汇总各物资类型的总量/已拨量/健康状态
    pub fn get_stock_summary(&self, tier: &str) -> ApiResult<StockSummaryResponse> {
        let tier = parse_tier(tier)?;
        let rows = self.stock_repo.summarize_tier(tier)?;

        let items = rows
            .iter()
            .map(|row| {
                let status = self.classifier.classify(row.total_quantity, row.total_allocated);
                let usage =
                    StatusClassifier::usage_ratio(row.total_quantity, row.total_allocated);
                StockSummaryRowDto {
                    resource_type: row.resource_type.to_string(),
                    unit: row.resource_type.unit().to_string(),
                    total_quantity: row.total_quantity,
                    total_allocated: row.total_allocated,
                    total_available: row.total_quantity - row.total_allocated,
                    status: status.to_string(),
                    usage_pct: usage * 100.0,
                }
            })
            .collect();

        Ok(StockSummaryResponse {
            tier: tier.to_string(),
            as_of: Utc::now().naive_utc().format(TS_FORMAT).to_string(),
            items,
        })
    }

    // ==========================================
    // 审计视图
    // ==========================================

    /// 查询某库存单元的调拨历史（含回放推导的"剩余库存"列）
    pub fn get_allocation_history(
        &self,
        tier: &str,
        owner_id: &str,
        resource_type: &str,
    ) -> ApiResult<AllocationHistoryResponse> {
        let tier = parse_tier(tier)?;
        let resource_type = parse_resource_type(resource_type)?;

        let record = self.stock_repo.get_or_transient(tier, owner_id, resource_type)?;
        let events = self.allocation_log_repo.find_by_cell(tier, owner_id, resource_type)?;

        let rows = build_history_rows(&record, events);
        let items: Vec<AllocationHistoryRowDto> =
            rows.iter().map(AllocationHistoryRowDto::from_history_row).collect();

        Ok(AllocationHistoryResponse {
            tier: tier.to_string(),
            owner_id: owner_id.to_string(),
            resource_type: resource_type.to_string(),
            as_of: Utc::now().naive_utc().format(TS_FORMAT).to_string(),
            total_count: items.len() as u32,
            items,
        })
    }

    /// 最近调拨动态（驾驶舱事件流）
    pub fn get_recent_allocations(&self, limit: u32) -> ApiResult<Vec<AllocationEventDto>> {
        let events = self.allocation_log_repo.find_recent(limit)?;
        Ok(events.iter().map(AllocationEventDto::from_event).collect())
    }

    // ==========================================
    // 区域概览
    // ==========================================

    /// 区域概览: 库存卡片 + 待审批请求数 + 洪灾风险标签
    ///
    /// 风险标签来自外部预测服务；服务不可用时降级为空，不影响库存数据
    pub async fn get_region_overview(
        &self,
        tier: &str,
        owner_id: &str,
    ) -> ApiResult<RegionOverviewResponse> {
        let parsed_tier = parse_tier(tier)?;

        let stocks = self.list_stock(tier, owner_id)?;
        let pending_requests =
            self.request_repo.count_pending_for_requester(parsed_tier, owner_id)?;

        let risk_label = match self.flood_risk.assess(owner_id).await {
            Ok(label) => Some(label.to_string()),
            Err(e) => {
                tracing::warn!(owner_id = owner_id, error = %e, "洪灾风险查询失败，概览降级");
                None
            }
        };

        Ok(RegionOverviewResponse {
            tier: parsed_tier.to_string(),
            owner_id: owner_id.to_string(),
            risk_label,
            stocks,
            pending_requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ResourceType, Tier, NATIONAL_OWNER_ID};
    use crate::engine::allocation::{AllocateCommand, AllocationEngine};
    use crate::engine::events::NoOpEventPublisher;
    use crate::engine::flood_risk::{RiskLabel, StaticFloodRiskProvider};
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup() -> (StockApi, Arc<AllocationEngine>, Arc<StockRepository>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        let stock_repo = Arc::new(StockRepository::from_connection(conn.clone()));
        let allocation_log_repo = Arc::new(AllocationLogRepository::from_connection(conn.clone()));
        let request_repo = Arc::new(ResourceRequestRepository::from_connection(conn));
        let engine = Arc::new(AllocationEngine::new(
            stock_repo.clone(),
            Arc::new(NoOpEventPublisher),
        ));

        let api = StockApi::new(
            stock_repo.clone(),
            allocation_log_repo,
            request_repo,
            StatusClassifier::new(),
            Arc::new(StaticFloodRiskProvider::new(RiskLabel::High)),
        );
        (api, engine, stock_repo)
    }

    fn allocate(engine: &AllocationEngine, quantity: i64) {
        engine
            .allocate(AllocateCommand {
                resource_type: ResourceType::Food,
                source_tier: Tier::National,
                source_owner_id: NATIONAL_OWNER_ID.to_string(),
                dest_tier: Tier::Provincial,
                dest_owner_id: "punjab".to_string(),
                quantity,
                note: None,
            })
            .unwrap();
    }

    #[test]
    fn test_get_stock_transient_for_unknown_cell() {
        let (api, _, _) = setup();
        let view = api.get_stock("SHELTER", "s-404", "WATER").unwrap();
        assert_eq!(view.quantity, 0);
        assert_eq!(view.available, 0);
        assert_eq!(view.status, "ADEQUATE");
        assert_eq!(view.unit, "liters");
    }

    #[test]
    fn test_history_with_remaining_column() {
        let (api, engine, stock_repo) = setup();
        stock_repo
            .increase_quantity(Tier::National, NATIONAL_OWNER_ID, ResourceType::Food, 10000)
            .unwrap();
        allocate(&engine, 1000);
        allocate(&engine, 2000);

        let history = api
            .get_allocation_history("NATIONAL", NATIONAL_OWNER_ID, "FOOD")
            .unwrap();
        assert_eq!(history.total_count, 2);
        // 当前可用 7000; 第一条事件后剩 9000
        assert_eq!(history.items[0].remaining_after, 9000);
        assert_eq!(history.items[1].remaining_after, 7000);
    }

    #[test]
    fn test_summary_classifies_aggregate() {
        let (api, engine, stock_repo) = setup();
        stock_repo
            .increase_quantity(Tier::National, NATIONAL_OWNER_ID, ResourceType::Food, 1000)
            .unwrap();
        allocate(&engine, 900); // 使用率 0.9 -> CRITICAL

        let summary = api.get_stock_summary("NATIONAL").unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].status, "CRITICAL");
        assert_eq!(summary.items[0].total_available, 100);
    }

    #[tokio::test]
    async fn test_region_overview_includes_risk_label() {
        let (api, engine, stock_repo) = setup();
        stock_repo
            .increase_quantity(Tier::National, NATIONAL_OWNER_ID, ResourceType::Food, 5000)
            .unwrap();
        allocate(&engine, 2000);

        let overview = api.get_region_overview("PROVINCIAL", "punjab").await.unwrap();
        assert_eq!(overview.risk_label.as_deref(), Some("HIGH"));
        assert_eq!(overview.stocks.len(), 1);
        assert_eq!(overview.stocks[0].quantity, 2000);
        assert_eq!(overview.pending_requests, 0);
    }
}
