use rust_decimal::Decimal;

use super::common::*;
use crate::domain::{AreaCode, InspectionStatus, RequestStatus, ServiceCategory};
use crate::indicators::IndicatorError;
use crate::repository::MemoryStore;

#[test]
fn complaint_rate_over_the_whole_system() {
    let requests = (1..=5)
        .map(|day| {
            request(
                ServiceCategory::BulkPickup,
                RequestStatus::Executed,
                AreaCode::Santana,
                at(day, 10),
                Some(48),
            )
        })
        .collect();
    let store = store_with(requests, Vec::new());

    let snapshot = engine()
        .complaint_rate(&store.requests, &november(), None)
        .expect("indicator computes");
    assert_eq!(snapshot.value, Decimal::new(10, 3));
    assert_eq!(snapshot.points, Decimal::from(20));
    assert_eq!(snapshot.details["households"], 511_093);
    assert_eq!(snapshot.details["complaints"], 5);
}

#[test]
fn complaint_rate_ignores_demand_driven_and_open_requests() {
    let store = store_with(
        vec![
            request(ServiceCategory::Sweeping, RequestStatus::Finalized, AreaCode::Jacana, at(3, 9), None),
            request(ServiceCategory::Debris, RequestStatus::Executed, AreaCode::Jacana, at(3, 9), Some(2)),
            request(ServiceCategory::Sweeping, RequestStatus::InExecution, AreaCode::Jacana, at(3, 9), None),
            request(ServiceCategory::Sweeping, RequestStatus::Finalized, AreaCode::Santana, at(3, 9), None),
        ],
        Vec::new(),
    );

    let snapshot = engine()
        .complaint_rate(&store.requests, &november(), Some(AreaCode::Jacana))
        .expect("indicator computes");
    assert_eq!(snapshot.details["complaints"], 1);
    assert_eq!(snapshot.details["households"], 112_924);
    // 1 / 112924 * 1000 = 0.00885... -> 0.009
    assert_eq!(snapshot.value, Decimal::new(9, 3));
    assert_eq!(snapshot.scope, Some(AreaCode::Jacana));
}

#[test]
fn response_rate_counts_only_executed_demand_requests() {
    let store = store_with(
        vec![
            // on time: 72h SLA, executed after 70h
            request(ServiceCategory::Debris, RequestStatus::Executed, AreaCode::CasaVerde, at(2, 8), Some(70)),
            // boundary counts as on time
            request(ServiceCategory::DeadAnimal, RequestStatus::Finalized, AreaCode::CasaVerde, at(2, 8), Some(12)),
            // late
            request(ServiceCategory::DeadAnimal, RequestStatus::ExecutionConfirmed, AreaCode::CasaVerde, at(2, 8), Some(13)),
            // terminal without execution timestamp: excluded entirely
            request(ServiceCategory::Debris, RequestStatus::Executed, AreaCode::CasaVerde, at(2, 8), None),
            // scheduled category: exempt
            request(ServiceCategory::BulkPickup, RequestStatus::Executed, AreaCode::CasaVerde, at(2, 8), Some(5_000)),
            // not terminal
            request(ServiceCategory::Debris, RequestStatus::InExecution, AreaCode::CasaVerde, at(2, 8), Some(200)),
        ],
        Vec::new(),
    );

    let snapshot = engine()
        .response_rate(&store.requests, &november(), None)
        .expect("indicator computes");
    assert_eq!(snapshot.details["eligible"], 3);
    assert_eq!(snapshot.details["on_time"], 2);
    assert_eq!(snapshot.value, Decimal::new(6667, 2));
    assert_eq!(snapshot.points, Decimal::from(8));
}

#[test]
fn window_end_is_exclusive() {
    let window = november();
    let store = store_with(
        vec![request(
            ServiceCategory::Debris,
            RequestStatus::Executed,
            AreaCode::Santana,
            window.end(),
            Some(1),
        )],
        Vec::new(),
    );
    let snapshot = engine()
        .response_rate(&store.requests, &window, None)
        .expect("indicator computes");
    assert_eq!(snapshot.details["eligible"], 0);
}

#[test]
fn inspection_quality_scopes_by_area_name() {
    let store = store_with(
        Vec::new(),
        vec![
            inspection(AreaCode::VilaMaria, InspectionStatus::Regularized, at(4, 9)),
            inspection(AreaCode::VilaMaria, InspectionStatus::Regularized, at(5, 9)),
            inspection(AreaCode::VilaMaria, InspectionStatus::Pending, at(6, 9)),
            inspection(AreaCode::Santana, InspectionStatus::Pending, at(6, 9)),
        ],
    );

    let scoped = engine()
        .inspection_quality(&store.inspections, &november(), Some(AreaCode::VilaMaria))
        .expect("indicator computes");
    assert_eq!(scoped.value, Decimal::new(6667, 2));
    assert_eq!(scoped.points, Decimal::from(14));
    assert_eq!(scoped.details["area_name"], "Vila Maria/Vila Guilherme");

    let system = engine()
        .inspection_quality(&store.inspections, &november(), None)
        .expect("indicator computes");
    assert_eq!(system.value, Decimal::from(50));
    assert_eq!(system.points, Decimal::from(12));
}

#[test]
fn empty_windows_score_zero_without_failing() {
    let store = MemoryStore::default();
    let engine = engine();
    let window = november();

    let response = engine
        .response_rate(&store.requests, &window, None)
        .expect("indicator computes");
    assert_eq!(response.value, Decimal::ZERO);
    assert_eq!(response.points, Decimal::ZERO);

    let quality = engine
        .inspection_quality(&store.inspections, &window, Some(AreaCode::Santana))
        .expect("indicator computes");
    assert_eq!(quality.value, Decimal::ZERO);
    assert_eq!(quality.points, Decimal::ZERO);

    let complaints = engine
        .complaint_rate(&store.requests, &window, None)
        .expect("indicator computes");
    assert_eq!(complaints.value, Decimal::ZERO);
}

#[test]
fn work_plan_is_an_equal_weight_average() {
    let snapshot = engine()
        .work_plan(&november(), Decimal::new(855, 1), Decimal::new(7201, 2))
        .expect("indicator computes");
    // (85.5 + 72.01) / 2 = 78.755 -> 78.76
    assert_eq!(snapshot.value, Decimal::new(7876, 2));
    assert_eq!(snapshot.points, Decimal::from(36));
    assert_eq!(snapshot.scope, None);
    assert_eq!(snapshot.computed_at, at(30, 23));
}

#[test]
fn work_plan_rejects_out_of_range_percentages() {
    let error = engine()
        .work_plan(&november(), Decimal::from(101), Decimal::from(50))
        .expect_err("labor above 100");
    assert!(matches!(
        error,
        IndicatorError::PercentageOutOfRange { field: "labor", .. }
    ));
    assert!(engine()
        .work_plan(&november(), Decimal::from(50), Decimal::from(-1))
        .is_err());
}
