use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::domain::{
    next_record_id, AreaCode, InspectionRecord, InspectionStatus, ReportingWindow, RequestStatus,
    ServiceCategory, ServiceRequest,
};
use crate::indicators::{ComplianceTables, IndicatorEngine};
use crate::repository::{MemoryStore, RecordStore};

pub(super) fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, day)
        .expect("valid date")
        .and_hms_opt(hour, 0, 0)
        .expect("valid time")
}

pub(super) fn november() -> ReportingWindow {
    ReportingWindow::calendar_month(NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid date"))
        .expect("month window")
}

pub(super) fn engine() -> IndicatorEngine {
    IndicatorEngine::with_clock(
        Arc::new(ComplianceTables::default()),
        Arc::new(|| at(30, 23)),
    )
}

pub(super) fn request(
    category: ServiceCategory,
    status: RequestStatus,
    area: AreaCode,
    created_at: NaiveDateTime,
    executed_after_hours: Option<i64>,
) -> ServiceRequest {
    let id = next_record_id();
    ServiceRequest {
        id,
        business_key: format!("SAC-{}", id.0),
        category,
        status,
        area,
        address: "Rua Alfredo Pujol, 500".to_string(),
        neighborhood: None,
        coordinates: None,
        created_at,
        inspected_at: None,
        scheduled_at: None,
        executed_at: executed_after_hours.map(|hours| created_at + Duration::hours(hours)),
        sla_hours: crate::deadline::effective_sla(category, None),
        evidence: Vec::new(),
        area_mismatch: false,
        bulk_imported: false,
    }
}

pub(super) fn inspection(
    area: AreaCode,
    status: InspectionStatus,
    opened_at: NaiveDateTime,
) -> InspectionRecord {
    let id = next_record_id();
    InspectionRecord {
        id,
        business_key: format!("BFS-{}", id.0),
        notice_number: None,
        area_name: area.display_name().to_string(),
        zone: None,
        sector: None,
        shift: None,
        service: None,
        opened_at,
        synced_at: None,
        inspected_at: Some(opened_at),
        executed_at: None,
        deadline_hours: 24,
        status,
        situation: None,
        address: None,
        coordinates: None,
        contractor_inspector: None,
        inspector: None,
        bulk_imported: false,
    }
}

pub(super) fn store_with(
    requests: Vec<ServiceRequest>,
    inspections: Vec<InspectionRecord>,
) -> MemoryStore {
    let store = MemoryStore::default();
    for record in requests {
        store.requests.insert(record).expect("seed request");
    }
    for record in inspections {
        store.inspections.insert(record).expect("seed inspection");
    }
    store
}
