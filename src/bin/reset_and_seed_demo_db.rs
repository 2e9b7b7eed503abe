// ==========================================
// 防汛救灾物资调配系统 - 演示库重置与种子数据
// ==========================================
// 职责: 重建数据库并灌入演示场景，便于手工驱动 API
// 场景: 国家级食品 15000/6500，旁遮普省待审批请求 2000
// ==========================================

use relief_allocation::api::dto::{
    AllocateResourcesRequest, ReplenishStockRequest, SubmitResourceRequestDto,
};
use relief_allocation::app::{get_default_db_path, AppState};
use relief_allocation::domain::types::NATIONAL_OWNER_ID;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    relief_allocation::logging::init();

    let db_path = get_default_db_path();
    tracing::info!("重置演示数据库: {}", db_path);

    // 删除旧库（连同 WAL/SHM 残留）
    for suffix in ["", "-wal", "-shm"] {
        let path = format!("{}{}", db_path, suffix);
        if std::path::Path::new(&path).exists() {
            std::fs::remove_file(&path)?;
        }
    }

    let app_state = AppState::new(db_path.clone())?;

    // ===== 国家级储备 =====
    for (resource_type, quantity) in [
        ("FOOD", 15000_i64),
        ("WATER", 500_000),
        ("MEDICAL", 8000),
        ("SHELTER", 20000),
    ] {
        app_state
            .allocation_api
            .replenish(ReplenishStockRequest {
                resource_type: resource_type.to_string(),
                quantity,
                note: Some("中央储备入库".to_string()),
            })
            .map_err(|e| format!("种子补货失败: {}", e))?;
    }

    // ===== 历史下拨（构造 食品 6500 已拨的演示态）=====
    for (province, quantity) in [("punjab", 2500_i64), ("sindh", 2200), ("balochistan", 1800)] {
        app_state
            .allocation_api
            .allocate(AllocateResourcesRequest {
                resource_type: "FOOD".to_string(),
                source_tier: "NATIONAL".to_string(),
                source_owner_id: NATIONAL_OWNER_ID.to_string(),
                dest_tier: "PROVINCIAL".to_string(),
                dest_owner_id: province.to_string(),
                quantity,
                note: Some("首轮应急配给".to_string()),
            })
            .map_err(|e| format!("种子调拨失败: {}", e))?;
    }

    // ===== 待审批请求 =====
    let pending = app_state
        .request_api
        .submit_request(SubmitResourceRequestDto {
            requesting_tier: "PROVINCIAL".to_string(),
            requesting_owner_id: "punjab".to_string(),
            resource_type: "FOOD".to_string(),
            quantity: 2000,
            priority: "HIGH".to_string(),
            justification: "持续强降雨，沿河安置点口粮缺口扩大".to_string(),
        })
        .map_err(|e| format!("种子请求提交失败: {}", e))?;

    let summary = app_state.stock_api.get_stock_summary("NATIONAL")?;
    tracing::info!("==================================================");
    tracing::info!("演示数据灌入完成");
    for item in &summary.items {
        tracing::info!(
            resource = %item.resource_type,
            total = item.total_quantity,
            allocated = item.total_allocated,
            status = %item.status,
            "国家级库存"
        );
    }
    tracing::info!(request_id = %pending.request_id, "待审批请求 (punjab, FOOD 2000, HIGH)");
    tracing::info!("==================================================");

    Ok(())
}
