// ==========================================
// 防汛救灾物资调配系统 - 调拨引擎
// ==========================================
// 红线: 只允许向直接下一级调拨；可用量检查与递增在
//       同一数据库事务内完成（仓储层保证）
// ==========================================
// 职责: 校验并执行一次跨层级物资调拨
// 输入: 调拨指令（物资/调出方/调入方/数量/备注）
// 输出: 调拨事件 + 双方最新库存快照 + 健康状态
// ==========================================

use crate::domain::allocation::AllocationEvent;
use crate::domain::stock::StockRecord;
use crate::domain::types::{ResourceType, StockStatus, Tier, NATIONAL_OWNER_ID};
use crate::engine::events::{AllocationEventPublisher, AllocationNotice};
use crate::engine::status::StatusClassifier;
use crate::repository::error::RepositoryError;
use crate::repository::stock_repo::StockRepository;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

// ==========================================
// 调拨错误
// ==========================================
#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("无效调拨数量: {given}（必须为正整数）")]
    InvalidQuantity { given: i64 },

    #[error("无效层级流向: from={from} to={to}（只允许调拨给直接下一级）")]
    InvalidTierTransition { from: Tier, to: Tier },

    #[error("无效所有者: 国家级库存所有者固定为 {expected}，收到 {given}")]
    InvalidOwner { expected: &'static str, given: String },

    #[error("库存不足: 可用={available}, 请求={requested}")]
    InsufficientStock { available: i64, requested: i64 },

    #[error(transparent)]
    Repository(RepositoryError),
}

// ==========================================
// 调拨指令
// ==========================================
#[derive(Debug, Clone)]
pub struct AllocateCommand {
    pub resource_type: ResourceType,
    pub source_tier: Tier,
    pub source_owner_id: String,
    pub dest_tier: Tier,
    pub dest_owner_id: String,
    pub quantity: i64,
    pub note: Option<String>,
}

// ==========================================
// 调拨结果
// ==========================================
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    /// 已落库的调拨事件（seq 已分配）
    pub event: AllocationEvent,
    /// 调出方最新快照
    pub source: StockRecord,
    pub source_status: StockStatus,
    /// 调入方最新快照
    pub dest: StockRecord,
    pub dest_status: StockStatus,
}

// ==========================================
// AllocationEngine - 调拨引擎
// ==========================================
pub struct AllocationEngine {
    stock_repo: Arc<StockRepository>,
    classifier: StatusClassifier,
    publisher: Arc<dyn AllocationEventPublisher>,
}

impl AllocationEngine {
    /// 创建新的调拨引擎（默认阈值）
    pub fn new(
        stock_repo: Arc<StockRepository>,
        publisher: Arc<dyn AllocationEventPublisher>,
    ) -> Self {
        Self {
            stock_repo,
            classifier: StatusClassifier::new(),
            publisher,
        }
    }

    /// 使用指定健康状态判定引擎创建
    pub fn with_classifier(
        stock_repo: Arc<StockRepository>,
        publisher: Arc<dyn AllocationEventPublisher>,
        classifier: StatusClassifier,
    ) -> Self {
        Self {
            stock_repo,
            classifier,
            publisher,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行一次调拨
    ///
    /// 校验失败不产生任何落库（无部分应用）:
    /// - InvalidQuantity: 数量非正
    /// - InvalidTierTransition: 调入方不是调出方的直接下一级
    /// - InsufficientStock: 超出调出方可用量（错误中带实际可用量，
    ///   供前端提示"不能超过 X 可用量"）
    #[instrument(skip(self, command), fields(
        resource_type = %command.resource_type,
        source = %format!("{}:{}", command.source_tier, command.source_owner_id),
        dest = %format!("{}:{}", command.dest_tier, command.dest_owner_id),
        quantity = command.quantity,
    ))]
    pub fn allocate(&self, command: AllocateCommand) -> Result<AllocationOutcome, AllocationError> {
        // 1. 数量校验
        if command.quantity < 1 {
            return Err(AllocationError::InvalidQuantity {
                given: command.quantity,
            });
        }

        // 2. 层级流向校验（逐级下拨，跨级由上层组合多次调用）
        if !command.source_tier.is_immediate_child(command.dest_tier) {
            return Err(AllocationError::InvalidTierTransition {
                from: command.source_tier,
                to: command.dest_tier,
            });
        }

        // 3. 国家级所有者固定
        for (tier, owner) in [
            (command.source_tier, &command.source_owner_id),
            (command.dest_tier, &command.dest_owner_id),
        ] {
            if tier == Tier::National && owner != NATIONAL_OWNER_ID {
                return Err(AllocationError::InvalidOwner {
                    expected: NATIONAL_OWNER_ID,
                    given: owner.clone(),
                });
            }
        }

        // 4. 单事务转账: 建档 + 可用量检查 + 递增 + 到账 + 追加事件
        let mut event = AllocationEvent::new(
            command.resource_type,
            command.source_tier,
            &command.source_owner_id,
            command.dest_tier,
            &command.dest_owner_id,
            command.quantity,
            command.note,
            Utc::now().naive_utc(),
        );

        let (source, dest, seq) = self.stock_repo.execute_transfer(&event).map_err(|e| match e {
            RepositoryError::InsufficientStock { available, requested } => {
                AllocationError::InsufficientStock { available, requested }
            }
            other => AllocationError::Repository(other),
        })?;
        event.seq = Some(seq);

        // 5. 重算双方健康状态（纯函数，不落库）
        let source_status = self.classifier.classify_record(&source);
        let dest_status = self.classifier.classify_record(&dest);

        // 6. 发布通知（失败只记日志，调拨以台账提交为准）
        let notice = AllocationNotice {
            event_id: event.event_id.clone(),
            resource_type: event.resource_type,
            source_tier: event.source_tier,
            source_owner_id: event.source_owner_id.clone(),
            dest_tier: event.dest_tier,
            dest_owner_id: event.dest_owner_id.clone(),
            quantity: event.quantity,
            source_status,
            dest_status,
            event_ts: event.event_ts,
        };
        if let Err(e) = self.publisher.publish(&notice) {
            tracing::warn!(event_id = %event.event_id, error = %e, "调拨通知发布失败");
        }

        Ok(AllocationOutcome {
            event,
            source,
            source_status,
            dest,
            dest_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stock::StockAvailability;
    use crate::engine::events::NoOpEventPublisher;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup_engine() -> (AllocationEngine, Arc<StockRepository>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let stock_repo = Arc::new(StockRepository::from_connection(Arc::new(Mutex::new(conn))));
        let engine = AllocationEngine::new(stock_repo.clone(), Arc::new(NoOpEventPublisher));
        (engine, stock_repo)
    }

    fn command(quantity: i64) -> AllocateCommand {
        AllocateCommand {
            resource_type: ResourceType::Food,
            source_tier: Tier::National,
            source_owner_id: NATIONAL_OWNER_ID.to_string(),
            dest_tier: Tier::Provincial,
            dest_owner_id: "punjab".to_string(),
            quantity,
            note: None,
        }
    }

    #[test]
    fn test_allocate_happy_path() {
        let (engine, stock_repo) = setup_engine();
        stock_repo
            .increase_quantity(Tier::National, NATIONAL_OWNER_ID, ResourceType::Food, 15000)
            .unwrap();

        let outcome = engine.allocate(command(2000)).unwrap();

        assert_eq!(outcome.source.allocated, 2000);
        assert_eq!(outcome.source.available(), 13000);
        assert_eq!(outcome.dest.quantity, 2000);
        assert_eq!(outcome.event.seq, Some(1));
        assert_eq!(outcome.source_status, crate::domain::types::StockStatus::Adequate);
    }

    #[test]
    fn test_allocate_rejects_non_positive_quantity() {
        let (engine, _) = setup_engine();
        for bad in [0, -100] {
            match engine.allocate(command(bad)) {
                Err(AllocationError::InvalidQuantity { given }) => assert_eq!(given, bad),
                other => panic!("Expected InvalidQuantity, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_allocate_rejects_tier_skip() {
        let (engine, stock_repo) = setup_engine();
        stock_repo
            .increase_quantity(Tier::National, NATIONAL_OWNER_ID, ResourceType::Food, 1000)
            .unwrap();

        // 国家级直接拨区县: 跨级禁止
        let mut cmd = command(100);
        cmd.dest_tier = Tier::District;
        cmd.dest_owner_id = "d-001".to_string();

        match engine.allocate(cmd) {
            Err(AllocationError::InvalidTierTransition { from, to }) => {
                assert_eq!(from, Tier::National);
                assert_eq!(to, Tier::District);
            }
            other => panic!("Expected InvalidTierTransition, got {:?}", other.map(|_| ())),
        }

        // 同级调拨同样禁止
        let mut cmd = command(100);
        cmd.source_tier = Tier::Provincial;
        cmd.source_owner_id = "punjab".to_string();
        cmd.dest_tier = Tier::Provincial;
        cmd.dest_owner_id = "sindh".to_string();
        assert!(matches!(
            engine.allocate(cmd),
            Err(AllocationError::InvalidTierTransition { .. })
        ));
    }

    #[test]
    fn test_allocate_insufficient_reports_available() {
        let (engine, stock_repo) = setup_engine();
        stock_repo
            .increase_quantity(Tier::National, NATIONAL_OWNER_ID, ResourceType::Food, 500)
            .unwrap();

        match engine.allocate(command(501)) {
            Err(AllocationError::InsufficientStock { available, requested }) => {
                assert_eq!(available, 500);
                assert_eq!(requested, 501);
            }
            other => panic!("Expected InsufficientStock, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_allocate_rejects_wrong_national_owner() {
        let (engine, _) = setup_engine();
        let mut cmd = command(100);
        cmd.source_owner_id = "beijing".to_string();
        assert!(matches!(
            engine.allocate(cmd),
            Err(AllocationError::InvalidOwner { .. })
        ));
    }

    #[test]
    fn test_allocate_auto_provisions_dest() {
        let (engine, stock_repo) = setup_engine();
        stock_repo
            .increase_quantity(Tier::National, NATIONAL_OWNER_ID, ResourceType::Medical, 300)
            .unwrap();

        let mut cmd = command(120);
        cmd.resource_type = ResourceType::Medical;
        engine.allocate(cmd).unwrap();

        // 省级单元此前未建档，调拨后自动建档并到账
        let dest = stock_repo
            .find_by_cell(Tier::Provincial, "punjab", ResourceType::Medical)
            .unwrap()
            .unwrap();
        assert_eq!(dest.quantity, 120);
        assert_eq!(dest.allocated, 0);
    }
}
