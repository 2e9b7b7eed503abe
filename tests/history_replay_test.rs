// ==========================================
// 审计回放与端到端场景测试
// ==========================================
// 职责: 验证调拨历史的顺序保证、剩余库存回放列，
//       以及 国家->省->区县 的完整业务场景
// ==========================================


#[cfg(test)]
mod history_replay_test {
    use relief_allocation::api::dto::{
        AllocateResourcesRequest, ReplenishStockRequest, SubmitResourceRequestDto,
    };
    use relief_allocation::api::error::ApiError;
    use relief_allocation::domain::types::NATIONAL_OWNER_ID;

    use crate::test_helpers::create_test_app;

    fn allocate_request(
        source_tier: &str,
        source_owner: &str,
        dest_tier: &str,
        dest_owner: &str,
        quantity: i64,
    ) -> AllocateResourcesRequest {
        AllocateResourcesRequest {
            resource_type: "FOOD".to_string(),
            source_tier: source_tier.to_string(),
            source_owner_id: source_owner.to_string(),
            dest_tier: dest_tier.to_string(),
            dest_owner_id: dest_owner.to_string(),
            quantity,
            note: None,
        }
    }

    // ==========================================
    // 历史顺序与回放列
    // ==========================================

    #[test]
    fn test_history_order_and_remaining_column() {
        let (_temp, app) = create_test_app().unwrap();
        app.allocation_api
            .replenish(ReplenishStockRequest {
                resource_type: "FOOD".to_string(),
                quantity: 10000,
                note: None,
            })
            .unwrap();

        for (dest, quantity) in [("punjab", 1000_i64), ("sindh", 2000), ("balochistan", 500)] {
            app.allocation_api
                .allocate(allocate_request("NATIONAL", NATIONAL_OWNER_ID, "PROVINCIAL", dest, quantity))
                .unwrap();
        }

        let history = app
            .stock_api
            .get_allocation_history("NATIONAL", NATIONAL_OWNER_ID, "FOOD")
            .unwrap();
        assert_eq!(history.total_count, 3);

        // 提交顺序单调（seq 升序）
        let seqs: Vec<i64> = history.items.iter().map(|row| row.event.seq.unwrap()).collect();
        assert!(seqs.windows(2).all(|pair| pair[0] < pair[1]));

        // 当前可用 6500；逐行回放:
        // 第1条(1000)后剩 6500+2000+500=9000，第2条(2000)后剩 7000，第3条(500)后剩 6500
        assert_eq!(history.items[0].remaining_after, 9000);
        assert_eq!(history.items[1].remaining_after, 7000);
        assert_eq!(history.items[2].remaining_after, 6500);

        // 重复查询结果一致（有限、可重启的审计读）
        let again = app
            .stock_api
            .get_allocation_history("NATIONAL", NATIONAL_OWNER_ID, "FOOD")
            .unwrap();
        assert_eq!(again.total_count, 3);
        assert_eq!(again.items[0].remaining_after, 9000);
    }

    #[test]
    fn test_dest_cell_sees_incoming_events() {
        let (_temp, app) = create_test_app().unwrap();
        app.allocation_api
            .replenish(ReplenishStockRequest {
                resource_type: "FOOD".to_string(),
                quantity: 4000,
                note: None,
            })
            .unwrap();
        app.allocation_api
            .allocate(allocate_request("NATIONAL", NATIONAL_OWNER_ID, "PROVINCIAL", "punjab", 1200))
            .unwrap();
        app.allocation_api
            .allocate(allocate_request("PROVINCIAL", "punjab", "DISTRICT", "multan", 300))
            .unwrap();

        // punjab 视角: 一条调入 + 一条调出
        let history = app
            .stock_api
            .get_allocation_history("PROVINCIAL", "punjab", "FOOD")
            .unwrap();
        assert_eq!(history.total_count, 2);
        assert_eq!(history.items[0].event.dest_owner_id, "punjab");
        assert_eq!(history.items[1].event.source_owner_id, "punjab");

        // punjab 当前可用 900；最后一条（调出300）之后剩 900；
        // 第一条（调入）之后按回放公式 = 900 + 300 = 1200
        assert_eq!(history.items[0].remaining_after, 1200);
        assert_eq!(history.items[1].remaining_after, 900);
    }

    // ==========================================
    // 端到端场景（国家 15000/6500 -> 旁遮普请求 2000 -> 区县 500）
    // ==========================================

    #[test]
    fn test_end_to_end_scenario() {
        let (_temp, app) = create_test_app().unwrap();

        // 国家级食品: 总量 15000，已拨 6500
        app.allocation_api
            .replenish(ReplenishStockRequest {
                resource_type: "FOOD".to_string(),
                quantity: 15000,
                note: Some("中央储备".to_string()),
            })
            .unwrap();
        for (dest, quantity) in [("sindh", 4000_i64), ("balochistan", 2500)] {
            app.allocation_api
                .allocate(allocate_request("NATIONAL", NATIONAL_OWNER_ID, "PROVINCIAL", dest, quantity))
                .unwrap();
        }

        let national = app
            .stock_api
            .get_stock("NATIONAL", NATIONAL_OWNER_ID, "FOOD")
            .unwrap();
        assert_eq!(national.quantity, 15000);
        assert_eq!(national.allocated, 6500);
        assert_eq!(national.available, 8500);

        // 旁遮普省请求 2000 (HIGH)，批准
        let submitted = app
            .request_api
            .submit_request(SubmitResourceRequestDto {
                requesting_tier: "PROVINCIAL".to_string(),
                requesting_owner_id: "punjab".to_string(),
                resource_type: "FOOD".to_string(),
                quantity: 2000,
                priority: "HIGH".to_string(),
                justification: "沿河安置点口粮缺口扩大".to_string(),
            })
            .unwrap();
        let decision = app
            .request_api
            .approve_request(&submitted.request_id, "ignored")
            .unwrap();

        let allocation = decision.allocation.unwrap();
        assert_eq!(allocation.source.allocated, 8500);
        assert_eq!(allocation.source.available, 6500);
        assert_eq!(allocation.dest.quantity, 2000);

        // 旁遮普向区县下拨 500: 可用 2000 足够
        let district = app
            .allocation_api
            .allocate(allocate_request("PROVINCIAL", "punjab", "DISTRICT", "multan", 500))
            .unwrap();
        assert_eq!(district.source.available, 1500);
        assert_eq!(district.dest.quantity, 500);

        // 继续下拨 1501: 超出旁遮普可用量
        match app
            .allocation_api
            .allocate(allocate_request("PROVINCIAL", "punjab", "DISTRICT", "multan", 1501))
        {
            Err(ApiError::InsufficientStock { available, .. }) => assert_eq!(available, 1500),
            other => panic!("Expected InsufficientStock, got {:?}", other.map(|_| ())),
        }
    }
}
