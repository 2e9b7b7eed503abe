// ==========================================
// 防汛救灾物资调配系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供幂等建库入口，测试与种子脚本共用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：版本号用于**提示/告警**（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等初始化数据库 schema
///
/// 库存单元以 (tier, owner_id, resource_type) 唯一；
/// CHECK 约束兜底核心不变量 0 <= allocated <= quantity，
/// 正常路径由仓储层事务保证，约束只防御绕过仓储的直写。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS stock_record (
            stock_id TEXT PRIMARY KEY,
            tier TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            resource_type TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0,
            allocated INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (tier, owner_id, resource_type),
            CHECK (quantity >= 0),
            CHECK (allocated >= 0 AND allocated <= quantity)
        );

        CREATE TABLE IF NOT EXISTS allocation_event (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT NOT NULL UNIQUE,
            resource_type TEXT NOT NULL,
            source_tier TEXT NOT NULL,
            source_owner_id TEXT NOT NULL,
            dest_tier TEXT NOT NULL,
            dest_owner_id TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            note TEXT,
            event_ts TEXT NOT NULL,
            CHECK (quantity >= 1)
        );

        CREATE INDEX IF NOT EXISTS idx_allocation_event_source
            ON allocation_event (source_tier, source_owner_id, resource_type);
        CREATE INDEX IF NOT EXISTS idx_allocation_event_dest
            ON allocation_event (dest_tier, dest_owner_id, resource_type);

        CREATE TABLE IF NOT EXISTS resource_request (
            request_id TEXT PRIMARY KEY,
            requesting_tier TEXT NOT NULL,
            requesting_owner_id TEXT NOT NULL,
            resource_type TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            priority TEXT NOT NULL,
            justification TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            created_at TEXT NOT NULL,
            decided_at TEXT,
            fulfilled_event_id TEXT,
            CHECK (quantity >= 1),
            CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED'))
        );

        CREATE INDEX IF NOT EXISTS idx_resource_request_status
            ON resource_request (status, created_at);

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);
        "#,
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
