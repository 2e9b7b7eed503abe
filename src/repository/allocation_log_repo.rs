// ==========================================
// 防汛救灾物资调配系统 - 调拨事件仓储
// ==========================================
// 职责: allocation_event 表的追加与审计查询
// 约定: 事件只追加不修改；同一单元的查询按 seq 升序，
//       与提交顺序一致（审计回放依赖该顺序）
// ==========================================

use crate::domain::allocation::AllocationEvent;
use crate::domain::types::{ResourceType, Tier};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// AllocationLogRepository - 调拨事件仓储
// ==========================================
pub struct AllocationLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AllocationLogRepository {
    /// 创建新的调拨事件仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 追加调拨事件
    ///
    /// 正常调拨路径由 StockRepository::execute_transfer 在同一事务内落库；
    /// 此方法供审计补录与测试使用
    pub fn insert(&self, event: &AllocationEvent) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO allocation_event (
                event_id, resource_type, source_tier, source_owner_id,
                dest_tier, dest_owner_id, quantity, note, event_ts
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                event.event_id,
                event.resource_type.as_str(),
                event.source_tier.as_str(),
                event.source_owner_id,
                event.dest_tier.as_str(),
                event.dest_owner_id,
                event.quantity,
                event.note,
                event.event_ts.format(TS_FORMAT).to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // ==========================================
    // 审计查询
    // ==========================================

    /// 查询某库存单元的全部调拨事件（调出或调入），按提交顺序升序
    ///
    /// 有限结果集，可随时重查（无流式状态）
    pub fn find_by_cell(
        &self,
        tier: Tier,
        owner_id: &str,
        resource_type: ResourceType,
    ) -> RepositoryResult<Vec<AllocationEvent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT seq, event_id, resource_type, source_tier, source_owner_id,
                   dest_tier, dest_owner_id, quantity, note, event_ts
            FROM allocation_event
            WHERE resource_type = ?1
              AND (
                    (source_tier = ?2 AND source_owner_id = ?3)
                 OR (dest_tier = ?2 AND dest_owner_id = ?3)
              )
            ORDER BY seq ASC
            "#,
        )?;

        let raw = stmt
            .query_map(
                params![resource_type.as_str(), tier.as_str(), owner_id],
                row_to_raw,
            )?
            .collect::<rusqlite::Result<Vec<RawEventRow>>>()?;

        raw.into_iter().map(raw_to_event).collect()
    }

    /// 查询事件总数（分页/概览用）
    pub fn count_for_cell(
        &self,
        tier: Tier,
        owner_id: &str,
        resource_type: ResourceType,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM allocation_event
            WHERE resource_type = ?1
              AND (
                    (source_tier = ?2 AND source_owner_id = ?3)
                 OR (dest_tier = ?2 AND dest_owner_id = ?3)
              )
            "#,
            params![resource_type.as_str(), tier.as_str(), owner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 最近事件（驾驶舱动态流），按提交顺序降序
    pub fn find_recent(&self, limit: u32) -> RepositoryResult<Vec<AllocationEvent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT seq, event_id, resource_type, source_tier, source_owner_id,
                   dest_tier, dest_owner_id, quantity, note, event_ts
            FROM allocation_event
            ORDER BY seq DESC
            LIMIT ?1
            "#,
        )?;

        let raw = stmt
            .query_map(params![limit], row_to_raw)?
            .collect::<rusqlite::Result<Vec<RawEventRow>>>()?;

        raw.into_iter().map(raw_to_event).collect()
    }
}

// ==========================================
// 行映射
// ==========================================

struct RawEventRow {
    seq: i64,
    event_id: String,
    resource_type: String,
    source_tier: String,
    source_owner_id: String,
    dest_tier: String,
    dest_owner_id: String,
    quantity: i64,
    note: Option<String>,
    event_ts: String,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEventRow> {
    Ok(RawEventRow {
        seq: row.get(0)?,
        event_id: row.get(1)?,
        resource_type: row.get(2)?,
        source_tier: row.get(3)?,
        source_owner_id: row.get(4)?,
        dest_tier: row.get(5)?,
        dest_owner_id: row.get(6)?,
        quantity: row.get(7)?,
        note: row.get(8)?,
        event_ts: row.get(9)?,
    })
}

fn raw_to_event(raw: RawEventRow) -> RepositoryResult<AllocationEvent> {
    let parse_tier = |s: &str| {
        Tier::parse(s).ok_or_else(|| RepositoryError::FieldValueError {
            field: "tier".to_string(),
            message: format!("未知层级: {}", s),
        })
    };

    Ok(AllocationEvent {
        seq: Some(raw.seq),
        event_id: raw.event_id,
        resource_type: ResourceType::parse(&raw.resource_type).ok_or_else(|| {
            RepositoryError::FieldValueError {
                field: "resource_type".to_string(),
                message: format!("未知物资类型: {}", raw.resource_type),
            }
        })?,
        source_tier: parse_tier(&raw.source_tier)?,
        source_owner_id: raw.source_owner_id,
        dest_tier: parse_tier(&raw.dest_tier)?,
        dest_owner_id: raw.dest_owner_id,
        quantity: raw.quantity,
        note: raw.note,
        event_ts: NaiveDateTime::parse_from_str(&raw.event_ts, TS_FORMAT).unwrap_or_else(|_| {
            chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        }),
    })
}
