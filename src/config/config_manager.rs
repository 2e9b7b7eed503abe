// ==========================================
// 防汛救灾物资调配系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value, scope_id='global')
// ==========================================

use crate::db::open_sqlite_connection;
use crate::engine::flood_risk::RiskLabel;
use crate::engine::status::StatusThresholds;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ===== 配置键 =====
const KEY_STATUS_ADEQUATE_MAX: &str = "status/adequate_max";
const KEY_STATUS_MODERATE_MAX: &str = "status/moderate_max";
const KEY_STATUS_LOW_MAX: &str = "status/low_max";
const KEY_FLOOD_RISK_DEFAULT: &str = "flood_risk/default_label";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(result)
    }

    /// 写入配置值（scope_id='global'，存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT (scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn get_f64(&self, key: &str) -> Result<Option<f64>, Box<dyn Error>> {
        match self.get_config_value(key)? {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(v) => Ok(Some(v)),
                Err(_) => {
                    tracing::warn!(key = key, value = %raw, "配置值无法解析为数值，使用默认值");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    // ==========================================
    // 类型化配置读取
    // ==========================================

    /// 库存健康状态阈值（未配置或非法时使用默认阈值表）
    ///
    /// 合法性要求: 0 < adequate_max < moderate_max < low_max <= 1
    pub fn status_thresholds(&self) -> Result<StatusThresholds, Box<dyn Error>> {
        let defaults = StatusThresholds::default();
        let thresholds = StatusThresholds {
            adequate_max: self.get_f64(KEY_STATUS_ADEQUATE_MAX)?.unwrap_or(defaults.adequate_max),
            moderate_max: self.get_f64(KEY_STATUS_MODERATE_MAX)?.unwrap_or(defaults.moderate_max),
            low_max: self.get_f64(KEY_STATUS_LOW_MAX)?.unwrap_or(defaults.low_max),
        };

        let valid = thresholds.adequate_max > 0.0
            && thresholds.adequate_max < thresholds.moderate_max
            && thresholds.moderate_max < thresholds.low_max
            && thresholds.low_max <= 1.0;
        if !valid {
            tracing::warn!(?thresholds, "状态阈值配置非法，回退到默认阈值表");
            return Ok(defaults);
        }
        Ok(thresholds)
    }

    /// 洪灾风险静态实现的默认标签（外部模型未接入时使用）
    pub fn default_flood_risk_label(&self) -> Result<RiskLabel, Box<dyn Error>> {
        let label = match self.get_config_value(KEY_FLOOD_RISK_DEFAULT)? {
            Some(raw) => match raw.trim().to_uppercase().as_str() {
                "LOW" => RiskLabel::Low,
                "MEDIUM" => RiskLabel::Medium,
                "HIGH" => RiskLabel::High,
                "SEVERE" => RiskLabel::Severe,
                other => {
                    tracing::warn!(value = other, "未知风险标签配置，使用 LOW");
                    RiskLabel::Low
                }
            },
            None => RiskLabel::Low,
        };
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_thresholds_default_when_unset() {
        let manager = setup_manager();
        let thresholds = manager.status_thresholds().unwrap();
        assert_eq!(thresholds, StatusThresholds::default());
    }

    #[test]
    fn test_thresholds_override_roundtrip() {
        let manager = setup_manager();
        manager.set_config_value(KEY_STATUS_ADEQUATE_MAX, "0.40").unwrap();
        manager.set_config_value(KEY_STATUS_MODERATE_MAX, "0.60").unwrap();
        manager.set_config_value(KEY_STATUS_LOW_MAX, "0.80").unwrap();

        let thresholds = manager.status_thresholds().unwrap();
        assert_eq!(thresholds.adequate_max, 0.40);
        assert_eq!(thresholds.moderate_max, 0.60);
        assert_eq!(thresholds.low_max, 0.80);
    }

    #[test]
    fn test_invalid_thresholds_fall_back() {
        let manager = setup_manager();
        // adequate_max >= moderate_max: 非法
        manager.set_config_value(KEY_STATUS_ADEQUATE_MAX, "0.90").unwrap();
        manager.set_config_value(KEY_STATUS_MODERATE_MAX, "0.60").unwrap();

        let thresholds = manager.status_thresholds().unwrap();
        assert_eq!(thresholds, StatusThresholds::default());
    }

    #[test]
    fn test_flood_risk_label() {
        let manager = setup_manager();
        assert_eq!(manager.default_flood_risk_label().unwrap(), RiskLabel::Low);

        manager.set_config_value(KEY_FLOOD_RISK_DEFAULT, "severe").unwrap();
        assert_eq!(manager.default_flood_risk_label().unwrap(), RiskLabel::Severe);
    }
}
