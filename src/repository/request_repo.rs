// ==========================================
// 防汛救灾物资调配系统 - 物资请求仓储
// ==========================================
// 职责: resource_request 表的CRUD与状态翻转
// 约定: 状态翻转使用条件更新 (WHERE status='PENDING')，
//       返回受影响行数，由引擎层据此判定 AlreadyDecided
// ==========================================

use crate::domain::request::ResourceRequest;
use crate::domain::types::{Priority, RequestStatus, ResourceType, Tier};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

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
// ResourceRequestRepository - 物资请求仓储
// ==========================================
pub struct ResourceRequestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ResourceRequestRepository {
    /// 创建新的请求仓储实例
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

    /// 插入新请求
    pub fn insert(&self, request: &ResourceRequest) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO resource_request (
                request_id, requesting_tier, requesting_owner_id, resource_type,
                quantity, priority, justification, status,
                created_at, decided_at, fulfilled_event_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                request.request_id,
                request.requesting_tier.as_str(),
                request.requesting_owner_id,
                request.resource_type.as_str(),
                request.quantity,
                request.priority.as_str(),
                request.justification,
                request.status.as_str(),
                fmt_ts(request.created_at),
                request.decided_at.map(fmt_ts),
                request.fulfilled_event_id,
            ],
        )?;
        Ok(request.request_id.clone())
    }

    /// 条件翻转: PENDING -> 终态
    ///
    /// # 返回
    /// - Ok(1): 翻转成功
    /// - Ok(0): 请求不存在或已非 PENDING（由调用方区分）
    pub fn mark_decided(
        &self,
        request_id: &str,
        status: RequestStatus,
        decided_at: NaiveDateTime,
        fulfilled_event_id: Option<&str>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE resource_request
            SET status = ?1, decided_at = ?2, fulfilled_event_id = ?3
            WHERE request_id = ?4 AND status = 'PENDING'
            "#,
            params![
                status.as_str(),
                fmt_ts(decided_at),
                fulfilled_event_id,
                request_id
            ],
        )?;
        Ok(rows)
    }

    /// 回填批准请求关联的调拨事件ID
    pub fn attach_fulfillment(
        &self,
        request_id: &str,
        event_id: &str,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE resource_request
            SET fulfilled_event_id = ?1
            WHERE request_id = ?2 AND status = 'APPROVED'
            "#,
            params![event_id, request_id],
        )?;
        Ok(rows)
    }

    /// 将已预占的请求回退为 PENDING（审批中底层调拨失败时使用）
    pub fn revert_to_pending(&self, request_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE resource_request
            SET status = 'PENDING', decided_at = NULL, fulfilled_event_id = NULL
            WHERE request_id = ?1
            "#,
            params![request_id],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 读取操作
    // ==========================================

    /// 按ID查询请求
    pub fn find_by_id(&self, request_id: &str) -> RepositoryResult<Option<ResourceRequest>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("{} WHERE request_id = ?1", SELECT_BASE),
                params![request_id],
                row_to_raw,
            )
            .optional()?;
        raw.map(raw_to_request).transpose()
    }

    /// 按状态查询请求（审批收件箱），新请求在前
    pub fn list_by_status(&self, status: RequestStatus) -> RepositoryResult<Vec<ResourceRequest>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE status = ?1 ORDER BY created_at DESC, request_id",
            SELECT_BASE
        ))?;

        let raw = stmt
            .query_map(params![status.as_str()], row_to_raw)?
            .collect::<rusqlite::Result<Vec<RawRequestRow>>>()?;
        raw.into_iter().map(raw_to_request).collect()
    }

    /// 查询某层级实例发起的全部请求，新请求在前
    pub fn list_by_requester(
        &self,
        tier: Tier,
        owner_id: &str,
    ) -> RepositoryResult<Vec<ResourceRequest>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE requesting_tier = ?1 AND requesting_owner_id = ?2
             ORDER BY created_at DESC, request_id",
            SELECT_BASE
        ))?;

        let raw = stmt
            .query_map(params![tier.as_str(), owner_id], row_to_raw)?
            .collect::<rusqlite::Result<Vec<RawRequestRow>>>()?;
        raw.into_iter().map(raw_to_request).collect()
    }

    /// 某层级实例的待审批请求数（区域概览用）
    pub fn count_pending_for_requester(
        &self,
        tier: Tier,
        owner_id: &str,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            r#"
            SELECT COUNT(*) FROM resource_request
            WHERE requesting_tier = ?1 AND requesting_owner_id = ?2 AND status = 'PENDING'
            "#,
            params![tier.as_str(), owner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ==========================================
// 行映射
// ==========================================

const SELECT_BASE: &str = r#"
    SELECT request_id, requesting_tier, requesting_owner_id, resource_type,
           quantity, priority, justification, status,
           created_at, decided_at, fulfilled_event_id
    FROM resource_request
"#;

struct RawRequestRow {
    request_id: String,
    requesting_tier: String,
    requesting_owner_id: String,
    resource_type: String,
    quantity: i64,
    priority: String,
    justification: String,
    status: String,
    created_at: String,
    decided_at: Option<String>,
    fulfilled_event_id: Option<String>,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRequestRow> {
    Ok(RawRequestRow {
        request_id: row.get(0)?,
        requesting_tier: row.get(1)?,
        requesting_owner_id: row.get(2)?,
        resource_type: row.get(3)?,
        quantity: row.get(4)?,
        priority: row.get(5)?,
        justification: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        decided_at: row.get(9)?,
        fulfilled_event_id: row.get(10)?,
    })
}

fn raw_to_request(raw: RawRequestRow) -> RepositoryResult<ResourceRequest> {
    let field_err = |field: &str, value: &str| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("无法解析: {}", value),
    };

    Ok(ResourceRequest {
        request_id: raw.request_id,
        requesting_tier: Tier::parse(&raw.requesting_tier)
            .ok_or_else(|| field_err("requesting_tier", &raw.requesting_tier))?,
        requesting_owner_id: raw.requesting_owner_id,
        resource_type: ResourceType::parse(&raw.resource_type)
            .ok_or_else(|| field_err("resource_type", &raw.resource_type))?,
        quantity: raw.quantity,
        priority: Priority::parse(&raw.priority)
            .ok_or_else(|| field_err("priority", &raw.priority))?,
        justification: raw.justification,
        status: RequestStatus::parse(&raw.status)
            .ok_or_else(|| field_err("status", &raw.status))?,
        created_at: parse_ts(&raw.created_at),
        decided_at: raw.decided_at.as_deref().map(parse_ts),
        fulfilled_event_id: raw.fulfilled_event_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn setup_repo() -> ResourceRequestRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        ResourceRequestRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn make_request(owner: &str) -> ResourceRequest {
        ResourceRequest::new(
            Tier::Provincial,
            owner,
            ResourceType::Food,
            2000,
            Priority::High,
            "洪灾安置点口粮告急",
            Utc::now().naive_utc(),
        )
    }

    #[test]
    fn test_insert_and_find_by_id() {
        let repo = setup_repo();
        let request = make_request("punjab");
        repo.insert(&request).unwrap();

        let found = repo.find_by_id(&request.request_id).unwrap().unwrap();
        assert_eq!(found.requesting_owner_id, "punjab");
        assert_eq!(found.quantity, 2000);
        assert_eq!(found.priority, Priority::High);
        assert!(found.is_pending());
    }

    #[test]
    fn test_mark_decided_is_single_shot() {
        let repo = setup_repo();
        let request = make_request("punjab");
        repo.insert(&request).unwrap();
        let now = Utc::now().naive_utc();

        let rows = repo
            .mark_decided(&request.request_id, RequestStatus::Approved, now, Some("evt-1"))
            .unwrap();
        assert_eq!(rows, 1);

        // 二次翻转失败（已非 PENDING）
        let rows = repo
            .mark_decided(&request.request_id, RequestStatus::Rejected, now, None)
            .unwrap();
        assert_eq!(rows, 0);

        let found = repo.find_by_id(&request.request_id).unwrap().unwrap();
        assert_eq!(found.status, RequestStatus::Approved);
        assert_eq!(found.fulfilled_event_id.as_deref(), Some("evt-1"));
        assert!(found.decided_at.is_some());
    }

    #[test]
    fn test_revert_to_pending() {
        let repo = setup_repo();
        let request = make_request("punjab");
        repo.insert(&request).unwrap();
        let now = Utc::now().naive_utc();

        repo.mark_decided(&request.request_id, RequestStatus::Approved, now, None)
            .unwrap();
        repo.revert_to_pending(&request.request_id).unwrap();

        let found = repo.find_by_id(&request.request_id).unwrap().unwrap();
        assert!(found.is_pending());
        assert!(found.decided_at.is_none());
    }

    #[test]
    fn test_list_by_status_and_requester() {
        let repo = setup_repo();
        let r1 = make_request("punjab");
        let r2 = make_request("sindh");
        repo.insert(&r1).unwrap();
        repo.insert(&r2).unwrap();
        repo.mark_decided(&r2.request_id, RequestStatus::Rejected, Utc::now().naive_utc(), None)
            .unwrap();

        let pending = repo.list_by_status(RequestStatus::Pending).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].requesting_owner_id, "punjab");

        let punjab = repo.list_by_requester(Tier::Provincial, "punjab").unwrap();
        assert_eq!(punjab.len(), 1);
        assert_eq!(
            repo.count_pending_for_requester(Tier::Provincial, "punjab").unwrap(),
            1
        );
        assert_eq!(
            repo.count_pending_for_requester(Tier::Provincial, "sindh").unwrap(),
            0
        );
    }
}
