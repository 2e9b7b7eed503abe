// ==========================================
// 防汛救灾物资调配系统 - 主入口
// ==========================================
// 技术栈: Rust + SQLite (可选 Tauri 桌面端)
// 系统定位: 决策支持系统
// ==========================================

// 禁止控制台窗口 (Windows)
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use relief_allocation::app::{get_default_db_path, AppState};

#[cfg(feature = "tauri-app")]
fn main() {
    use relief_allocation::app::tauri_commands::*;

    // 初始化日志系统
    relief_allocation::logging::init();

    tracing::info!("==================================================");
    tracing::info!("防汛救灾物资调配系统 - 决策支持系统");
    tracing::info!("系统版本: {}", relief_allocation::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState
    tracing::info!("正在初始化AppState...");
    let app_state = AppState::new(db_path).expect("无法初始化AppState");

    tracing::info!("AppState初始化成功");
    tracing::info!("启动Tauri应用...");

    // 启动Tauri应用
    tauri::Builder::default()
        .manage(app_state)
        .invoke_handler(tauri::generate_handler![
            // ==========================================
            // 调拨相关命令 (2个)
            // ==========================================
            allocate_resources,
            replenish_stock,

            // ==========================================
            // 物资请求相关命令 (4个)
            // ==========================================
            submit_resource_request,
            approve_resource_request,
            reject_resource_request,
            list_resource_requests,

            // ==========================================
            // 库存查询相关命令 (6个)
            // ==========================================
            get_stock,
            list_stock,
            get_stock_summary,
            get_allocation_history,
            get_recent_allocations,
            get_region_overview,

            // ==========================================
            // 导入相关命令 (1个)
            // ==========================================
            import_intake_csv,
        ])
        .run(tauri::generate_context!())
        .expect("启动Tauri应用失败");

    tracing::info!("Tauri应用已退出");
}

#[cfg(not(feature = "tauri-app"))]
fn main() {
    relief_allocation::logging::init();

    tracing::info!("==================================================");
    tracing::info!("防汛救灾物资调配系统 - 决策支持系统");
    tracing::info!("系统版本: {}", relief_allocation::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let app_state = AppState::new(db_path).expect("无法初始化AppState");
    tracing::info!("AppState初始化成功（库模式）");

    // 无桌面端特性时只做初始化自检: 打印各层级汇总后退出
    for tier in ["NATIONAL", "PROVINCIAL", "DISTRICT", "SHELTER"] {
        match app_state.stock_api.get_stock_summary(tier) {
            Ok(summary) => {
                tracing::info!(tier = tier, items = summary.items.len(), "库存汇总");
            }
            Err(e) => tracing::error!(tier = tier, error = %e, "库存汇总查询失败"),
        }
    }

    tracing::info!("桌面端驾驶舱需启用 tauri-app 特性: cargo run --features tauri-app");
}
