// ==========================================
// 防汛救灾物资调配系统 - 应用层
// ==========================================
// 职责: 桌面端集成,连接前端与后端
// ==========================================

pub mod state;

#[cfg(feature = "tauri-app")]
pub mod tauri_commands;

// 重导出
pub use state::{get_default_db_path, AppState};

#[cfg(feature = "tauri-app")]
pub use tauri_commands::*;
