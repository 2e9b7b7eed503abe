// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证同一库存单元上的并发调拨不会超拨
// ==========================================


#[cfg(test)]
mod concurrent_control_test {
    use relief_allocation::api::dto::{AllocateResourcesRequest, ReplenishStockRequest};
    use relief_allocation::api::error::ApiError;
    use relief_allocation::domain::types::NATIONAL_OWNER_ID;
    use std::sync::Arc;
    use std::thread;

    use crate::test_helpers::create_test_app;

    fn allocate_request(dest_owner: &str, quantity: i64) -> AllocateResourcesRequest {
        AllocateResourcesRequest {
            resource_type: "FOOD".to_string(),
            source_tier: "NATIONAL".to_string(),
            source_owner_id: NATIONAL_OWNER_ID.to_string(),
            dest_tier: "PROVINCIAL".to_string(),
            dest_owner_id: dest_owner.to_string(),
            quantity,
            note: None,
        }
    }

    // ==========================================
    // 同一调出单元的并发竞争
    // ==========================================
    // 可用 500，10 个线程各尝试调 100: 恰好 5 个成功，
    // 其余全部 InsufficientStock，总拨出绝不超过 500
    #[test]
    fn test_no_over_allocation_under_contention() {
        let (_temp, app) = create_test_app().unwrap();
        let app = Arc::new(app);

        app.allocation_api
            .replenish(ReplenishStockRequest {
                resource_type: "FOOD".to_string(),
                quantity: 500,
                note: None,
            })
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let app = app.clone();
            handles.push(thread::spawn(move || {
                let dest = format!("province-{}", i);
                app.allocation_api.allocate(allocate_request(&dest, 100))
            }));
        }

        let mut succeeded = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => succeeded += 1,
                Err(ApiError::InsufficientStock { .. }) => insufficient += 1,
                Err(other) => panic!("Unexpected error: {:?}", other),
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(insufficient, 5);

        let national = app
            .stock_api
            .get_stock("NATIONAL", NATIONAL_OWNER_ID, "FOOD")
            .unwrap();
        assert_eq!(national.allocated, 500);
        assert_eq!(national.available, 0);
        assert!(national.allocated <= national.quantity);
    }

    // ==========================================
    // 不同单元互不干扰
    // ==========================================
    #[test]
    fn test_independent_cells_do_not_contend() {
        let (_temp, app) = create_test_app().unwrap();
        let app = Arc::new(app);

        for resource_type in ["FOOD", "WATER", "MEDICAL"] {
            app.allocation_api
                .replenish(ReplenishStockRequest {
                    resource_type: resource_type.to_string(),
                    quantity: 1000,
                    note: None,
                })
                .unwrap();
        }

        let mut handles = Vec::new();
        for resource_type in ["FOOD", "WATER", "MEDICAL"] {
            let app = app.clone();
            handles.push(thread::spawn(move || {
                let mut request = allocate_request("punjab", 200);
                request.resource_type = resource_type.to_string();
                app.allocation_api.allocate(request)
            }));
        }

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }

        for resource_type in ["FOOD", "WATER", "MEDICAL"] {
            let view = app
                .stock_api
                .get_stock("NATIONAL", NATIONAL_OWNER_ID, resource_type)
                .unwrap();
            assert_eq!(view.allocated, 200);
        }
    }

    // ==========================================
    // 同一请求的并发审批
    // ==========================================
    // 只有一个线程能批准成功，库存只扣一次
    #[test]
    fn test_concurrent_approval_decides_once() {
        let (_temp, app) = create_test_app().unwrap();
        let app = Arc::new(app);

        app.allocation_api
            .replenish(ReplenishStockRequest {
                resource_type: "FOOD".to_string(),
                quantity: 5000,
                note: None,
            })
            .unwrap();

        let submitted = app
            .request_api
            .submit_request(relief_allocation::api::dto::SubmitResourceRequestDto {
                requesting_tier: "PROVINCIAL".to_string(),
                requesting_owner_id: "punjab".to_string(),
                resource_type: "FOOD".to_string(),
                quantity: 1000,
                priority: "CRITICAL".to_string(),
                justification: "堤坝决口，紧急转移".to_string(),
            })
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let app = app.clone();
            let request_id = submitted.request_id.clone();
            handles.push(thread::spawn(move || {
                app.request_api.approve_request(&request_id, "ignored")
            }));
        }

        let mut approved = 0;
        let mut already_decided = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => approved += 1,
                Err(ApiError::AlreadyDecided { .. }) => already_decided += 1,
                Err(other) => panic!("Unexpected error: {:?}", other),
            }
        }

        assert_eq!(approved, 1);
        assert_eq!(already_decided, 3);

        // 库存只扣了一次
        let national = app
            .stock_api
            .get_stock("NATIONAL", NATIONAL_OWNER_ID, "FOOD")
            .unwrap();
        assert_eq!(national.allocated, 1000);
    }
}
