// ==========================================
// 防汛救灾物资调配系统 - 库存台账仓储
// ==========================================
// 职责: stock_record 表的原子读写 + 调拨转账事务
// 红线: 可用量检查与 allocated 递增必须在同一事务内完成，
//       杜绝 "先查后改" 的并发超拨
// ==========================================

use crate::domain::allocation::AllocationEvent;
use crate::domain::stock::StockRecord;
use crate::domain::types::{ResourceType, Tier};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 时间戳统一落库格式
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).unwrap_or_else(|_| {
        chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    })
}

// ==========================================
// 层级汇总行（驾驶舱汇总查询用）
// ==========================================
#[derive(Debug, Clone)]
pub struct StockSummaryRow {
    pub resource_type: ResourceType,
    pub total_quantity: i64,
    pub total_allocated: i64,
}

// ==========================================
// StockRepository - 库存台账仓储
// ==========================================
pub struct StockRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StockRepository {
    /// 创建新的库存仓储实例
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 读取操作
    // ==========================================

    /// 按库存单元坐标查询
    pub fn find_by_cell(
        &self,
        tier: Tier,
        owner_id: &str,
        resource_type: ResourceType,
    ) -> RepositoryResult<Option<StockRecord>> {
        let conn = self.get_conn()?;
        select_cell(&conn, tier, owner_id, resource_type)
    }

    /// 查询库存单元；未建档时返回零值瞬态记录（不落库，永不失败）
    pub fn get_or_transient(
        &self,
        tier: Tier,
        owner_id: &str,
        resource_type: ResourceType,
    ) -> RepositoryResult<StockRecord> {
        match self.find_by_cell(tier, owner_id, resource_type)? {
            Some(record) => Ok(record),
            None => Ok(StockRecord::transient(
                tier,
                owner_id,
                resource_type,
                Utc::now().naive_utc(),
            )),
        }
    }

    /// 查询某层级实例名下全部库存
    pub fn find_by_owner(&self, tier: Tier, owner_id: &str) -> RepositoryResult<Vec<StockRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT stock_id, tier, owner_id, resource_type,
                   quantity, allocated, created_at, updated_at
            FROM stock_record
            WHERE tier = ?1 AND owner_id = ?2
            ORDER BY resource_type
            "#,
        )?;

        let raw_rows = stmt
            .query_map(params![tier.as_str(), owner_id], row_to_raw)?
            .collect::<rusqlite::Result<Vec<RawStockRow>>>()?;

        raw_rows.into_iter().map(raw_to_record).collect()
    }

    /// 按层级汇总各物资类型的总量/已拨量
    pub fn summarize_tier(&self, tier: Tier) -> RepositoryResult<Vec<StockSummaryRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT resource_type, SUM(quantity), SUM(allocated)
            FROM stock_record
            WHERE tier = ?1
            GROUP BY resource_type
            ORDER BY resource_type
            "#,
        )?;

        let raw = stmt
            .query_map(params![tier.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<(String, i64, i64)>>>()?;

        raw.into_iter()
            .map(|(rt, total_quantity, total_allocated)| {
                Ok(StockSummaryRow {
                    resource_type: parse_resource_type(&rt)?,
                    total_quantity,
                    total_allocated,
                })
            })
            .collect()
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 确保库存单元已建档（自动建档: quantity=0, allocated=0）
    ///
    /// 首次有物资流入该层级实例时惰性建档，已存在则原样返回
    pub fn ensure(
        &self,
        tier: Tier,
        owner_id: &str,
        resource_type: ResourceType,
    ) -> RepositoryResult<StockRecord> {
        let conn = self.get_conn()?;
        insert_ignore_cell(&conn, tier, owner_id, resource_type)?;
        select_cell(&conn, tier, owner_id, resource_type)?.ok_or_else(|| {
            RepositoryError::InternalError(format!(
                "库存单元建档后查询为空: ({}, {}, {})",
                tier, owner_id, resource_type
            ))
        })
    }

    /// 增加累计接收总量（入库/上级下拨到账）
    ///
    /// # 参数
    /// - amount: 必须 > 0，否则返回 FieldValueError
    pub fn increase_quantity(
        &self,
        tier: Tier,
        owner_id: &str,
        resource_type: ResourceType,
        amount: i64,
    ) -> RepositoryResult<StockRecord> {
        if amount <= 0 {
            return Err(RepositoryError::FieldValueError {
                field: "amount".to_string(),
                message: format!("入库数量必须为正整数: {}", amount),
            });
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = fmt_ts(Utc::now().naive_utc());

        insert_ignore_cell(&tx, tier, owner_id, resource_type)?;
        tx.execute(
            r#"
            UPDATE stock_record
            SET quantity = quantity + ?1, updated_at = ?2
            WHERE tier = ?3 AND owner_id = ?4 AND resource_type = ?5
            "#,
            params![amount, now, tier.as_str(), owner_id, resource_type.as_str()],
        )?;

        let record = select_cell(&tx, tier, owner_id, resource_type)?.ok_or_else(|| {
            RepositoryError::InternalError("入库后库存单元查询为空".to_string())
        })?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(record)
    }

    /// 增加已拨量（quantity 不变，available 因此缩减的唯一途径）
    ///
    /// # 失败
    /// - FieldValueError: amount <= 0
    /// - InsufficientStock: allocated + amount > quantity
    pub fn increase_allocated(
        &self,
        tier: Tier,
        owner_id: &str,
        resource_type: ResourceType,
        amount: i64,
    ) -> RepositoryResult<StockRecord> {
        if amount <= 0 {
            return Err(RepositoryError::FieldValueError {
                field: "amount".to_string(),
                message: format!("下拨数量必须为正整数: {}", amount),
            });
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = fmt_ts(Utc::now().naive_utc());

        apply_allocated_increment(&tx, tier, owner_id, resource_type, amount, &now)?;

        let record = select_cell(&tx, tier, owner_id, resource_type)?.ok_or_else(|| {
            RepositoryError::InternalError("下拨后库存单元查询为空".to_string())
        })?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(record)
    }

    /// 执行一次完整的调拨转账（单事务）
    ///
    /// 事务内依次完成:
    /// 1. 调出方自动建档
    /// 2. 可用量检查（不足则整体回滚，返回 InsufficientStock）
    /// 3. 调出方 allocated += q
    /// 4. 调入方自动建档
    /// 5. 调入方 quantity += q（跨层守恒: 上级拨出 == 下级到账）
    /// 6. 追加调拨事件（seq 由数据库提交顺序分配）
    ///
    /// # 返回
    /// - (调出方最新记录, 调入方最新记录, 事件seq)
    pub fn execute_transfer(
        &self,
        event: &AllocationEvent,
    ) -> RepositoryResult<(StockRecord, StockRecord, i64)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = fmt_ts(event.event_ts);

        // 1-3. 调出方建档 + 检查 + 递增（同一事务内，杜绝竞态）
        insert_ignore_cell(&tx, event.source_tier, &event.source_owner_id, event.resource_type)?;
        apply_allocated_increment(
            &tx,
            event.source_tier,
            &event.source_owner_id,
            event.resource_type,
            event.quantity,
            &now,
        )?;

        // 4-5. 调入方建档 + 到账
        insert_ignore_cell(&tx, event.dest_tier, &event.dest_owner_id, event.resource_type)?;
        tx.execute(
            r#"
            UPDATE stock_record
            SET quantity = quantity + ?1, updated_at = ?2
            WHERE tier = ?3 AND owner_id = ?4 AND resource_type = ?5
            "#,
            params![
                event.quantity,
                now,
                event.dest_tier.as_str(),
                event.dest_owner_id,
                event.resource_type.as_str()
            ],
        )?;

        // 6. 追加调拨事件
        tx.execute(
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
                fmt_ts(event.event_ts),
            ],
        )?;
        let seq = tx.last_insert_rowid();

        let source = select_cell(&tx, event.source_tier, &event.source_owner_id, event.resource_type)?
            .ok_or_else(|| RepositoryError::InternalError("调拨后调出方查询为空".to_string()))?;
        let dest = select_cell(&tx, event.dest_tier, &event.dest_owner_id, event.resource_type)?
            .ok_or_else(|| RepositoryError::InternalError("调拨后调入方查询为空".to_string()))?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok((source, dest, seq))
    }
}

// ==========================================
// 内部 SQL 辅助（Transaction 可解引用为 Connection，事务内复用）
// ==========================================

struct RawStockRow {
    stock_id: String,
    tier: String,
    owner_id: String,
    resource_type: String,
    quantity: i64,
    allocated: i64,
    created_at: String,
    updated_at: String,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawStockRow> {
    Ok(RawStockRow {
        stock_id: row.get(0)?,
        tier: row.get(1)?,
        owner_id: row.get(2)?,
        resource_type: row.get(3)?,
        quantity: row.get(4)?,
        allocated: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn parse_tier(s: &str) -> RepositoryResult<Tier> {
    Tier::parse(s).ok_or_else(|| RepositoryError::FieldValueError {
        field: "tier".to_string(),
        message: format!("未知层级: {}", s),
    })
}

fn parse_resource_type(s: &str) -> RepositoryResult<ResourceType> {
    ResourceType::parse(s).ok_or_else(|| RepositoryError::FieldValueError {
        field: "resource_type".to_string(),
        message: format!("未知物资类型: {}", s),
    })
}

fn raw_to_record(raw: RawStockRow) -> RepositoryResult<StockRecord> {
    Ok(StockRecord {
        stock_id: raw.stock_id,
        tier: parse_tier(&raw.tier)?,
        owner_id: raw.owner_id,
        resource_type: parse_resource_type(&raw.resource_type)?,
        quantity: raw.quantity,
        allocated: raw.allocated,
        created_at: parse_ts(&raw.created_at),
        updated_at: parse_ts(&raw.updated_at),
    })
}

fn select_cell(
    conn: &Connection,
    tier: Tier,
    owner_id: &str,
    resource_type: ResourceType,
) -> RepositoryResult<Option<StockRecord>> {
    let raw = conn
        .query_row(
            r#"
            SELECT stock_id, tier, owner_id, resource_type,
                   quantity, allocated, created_at, updated_at
            FROM stock_record
            WHERE tier = ?1 AND owner_id = ?2 AND resource_type = ?3
            "#,
            params![tier.as_str(), owner_id, resource_type.as_str()],
            row_to_raw,
        )
        .optional()?;

    raw.map(raw_to_record).transpose()
}

fn insert_ignore_cell(
    conn: &Connection,
    tier: Tier,
    owner_id: &str,
    resource_type: ResourceType,
) -> RepositoryResult<()> {
    let now = fmt_ts(Utc::now().naive_utc());
    conn.execute(
        r#"
        INSERT OR IGNORE INTO stock_record (
            stock_id, tier, owner_id, resource_type,
            quantity, allocated, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?5)
        "#,
        params![
            uuid::Uuid::new_v4().to_string(),
            tier.as_str(),
            owner_id,
            resource_type.as_str(),
            now
        ],
    )?;
    Ok(())
}

/// 事务内的可用量检查 + allocated 递增
///
/// 未建档单元按零库存处理（available=0），与检查语义一致
fn apply_allocated_increment(
    conn: &Connection,
    tier: Tier,
    owner_id: &str,
    resource_type: ResourceType,
    amount: i64,
    now: &str,
) -> RepositoryResult<()> {
    let counts: Option<(i64, i64)> = conn
        .query_row(
            r#"
            SELECT quantity, allocated FROM stock_record
            WHERE tier = ?1 AND owner_id = ?2 AND resource_type = ?3
            "#,
            params![tier.as_str(), owner_id, resource_type.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (quantity, allocated) = counts.unwrap_or((0, 0));
    let available = quantity - allocated;
    if allocated + amount > quantity {
        return Err(RepositoryError::InsufficientStock {
            available,
            requested: amount,
        });
    }

    conn.execute(
        r#"
        UPDATE stock_record
        SET allocated = allocated + ?1, updated_at = ?2
        WHERE tier = ?3 AND owner_id = ?4 AND resource_type = ?5
        "#,
        params![amount, now, tier.as_str(), owner_id, resource_type.as_str()],
    )?;
    Ok(())
}
