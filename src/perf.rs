// ==========================================
// 性能观测工具
// ==========================================
// PerfGuard: IPC 入口耗时观测（Drop 时输出）
// install_sqlite_tracing: SQL 语句 trace（默认仅 Debug 构建开启）
// ==========================================

use rusqlite::Connection;
use std::time::Instant;

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn truncate_sql(sql: &str, max_len: usize) -> String {
    let s = sql.trim().replace('\n', " ");
    if s.len() <= max_len {
        return s;
    }
    let cut: String = s.chars().take(max_len).collect();
    format!("{}…", cut)
}

/// 安装 SQLite 语句 trace（SQL 日志）
///
/// 开关：
/// - Debug 默认开启；Release 默认关闭
/// - `RELIEF_ALLOCATION_PERF_SQL=1` 强制开启
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = match std::env::var("RELIEF_ALLOCATION_PERF_SQL") {
        Ok(v) => is_true(&v),
        Err(_) => cfg!(debug_assertions),
    };

    if !enabled {
        // 显式清理，避免复用连接导致残留 callback
        conn.trace(None);
        return;
    }

    conn.trace(Some(|sql: &str| {
        tracing::trace!(sql = %truncate_sql(sql, 200), "sqlite");
    }));
}

// ==========================================
// PerfGuard - 入口耗时观测
// ==========================================

/// 作用域耗时观测器，Drop 时输出耗时日志
pub struct PerfGuard {
    name: &'static str,
    started_at: Instant,
}

impl PerfGuard {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            started_at: Instant::now(),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        if elapsed_ms >= 100 {
            tracing::warn!(op = self.name, elapsed_ms = elapsed_ms as u64, "慢操作");
        } else {
            tracing::debug!(op = self.name, elapsed_ms = elapsed_ms as u64, "操作完成");
        }
    }
}
