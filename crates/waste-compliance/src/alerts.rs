//! Operational alerts raised from the persisted records.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::{
    AreaCode, InspectionStatus, RecordId, RequestStatus, ServiceCategory, ServiceRequest,
};
use crate::repository::{ComplianceStore, InspectionQueries, RepositoryError, RequestQueries};

pub const AWAITING_ANALYSIS_LIMIT_HOURS: i64 = 24;
pub const SCHEDULED_EXECUTION_LIMIT_HOURS: i64 = 72;
pub const INSPECTION_DEADLINE_WARNING_PERCENT: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    /// Debris or dead-animal request still awaiting analysis.
    AwaitingAnalysis {
        request_id: RecordId,
        business_key: String,
        hours_waiting: i64,
    },
    /// Request in execution long after it was scheduled.
    StalledExecution {
        request_id: RecordId,
        business_key: String,
        hours_since_scheduling: i64,
    },
    InspectionDeadline {
        inspection_id: RecordId,
        business_key: String,
        deadline_used_percent: f64,
        hours_remaining: f64,
    },
    MissingEvidence {
        request_id: RecordId,
        business_key: String,
    },
    AreaMismatch {
        request_id: RecordId,
        business_key: String,
        assigned_area: AreaCode,
    },
}

impl Alert {
    pub fn business_key(&self) -> &str {
        match self {
            Alert::AwaitingAnalysis { business_key, .. }
            | Alert::StalledExecution { business_key, .. }
            | Alert::InspectionDeadline { business_key, .. }
            | Alert::MissingEvidence { business_key, .. }
            | Alert::AreaMismatch { business_key, .. } => business_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertReport {
    pub generated_at: NaiveDateTime,
    pub alerts: Vec<Alert>,
}

fn hours_between(earlier: NaiveDateTime, later: NaiveDateTime) -> i64 {
    (later - earlier).num_hours()
}

fn awaiting_analysis(
    requests: &[ServiceRequest],
    now: NaiveDateTime,
) -> impl Iterator<Item = Alert> + '_ {
    requests
        .iter()
        .filter(move |request| {
            matches!(
                request.category,
                ServiceCategory::Debris | ServiceCategory::DeadAnimal
            ) && (now - request.created_at).num_seconds() > AWAITING_ANALYSIS_LIMIT_HOURS * 3600
        })
        .map(move |request| Alert::AwaitingAnalysis {
            request_id: request.id,
            business_key: request.business_key.clone(),
            hours_waiting: hours_between(request.created_at, now),
        })
}

pub fn scan_alerts<S>(store: &S, now: NaiveDateTime) -> Result<AlertReport, RepositoryError>
where
    S: ComplianceStore + ?Sized,
{
    let requests = store.requests();
    let mut alerts = Vec::new();

    let waiting = requests.with_status(&[RequestStatus::AwaitingAnalysis])?;
    alerts.extend(awaiting_analysis(&waiting, now));

    for request in requests.with_status(&[RequestStatus::InExecution])? {
        let Some(scheduled_at) = request.scheduled_at else {
            continue;
        };
        if (now - scheduled_at).num_seconds() > SCHEDULED_EXECUTION_LIMIT_HOURS * 3600 {
            alerts.push(Alert::StalledExecution {
                request_id: request.id,
                hours_since_scheduling: hours_between(scheduled_at, now),
                business_key: request.business_key,
            });
        }
    }

    for inspection in store.inspections().with_status(InspectionStatus::Pending)? {
        let used = inspection.deadline_used_percent(now);
        if inspection.deadline_hours > 0 && used >= INSPECTION_DEADLINE_WARNING_PERCENT {
            let elapsed_hours = (now - inspection.opened_at).num_seconds() as f64 / 3600.0;
            alerts.push(Alert::InspectionDeadline {
                inspection_id: inspection.id,
                deadline_used_percent: (used * 10.0).round() / 10.0,
                hours_remaining: (f64::from(inspection.deadline_hours) - elapsed_hours).max(0.0),
                business_key: inspection.business_key,
            });
        }
    }

    let executed =
        requests.with_status(&[RequestStatus::Executed, RequestStatus::ExecutionConfirmed])?;
    alerts.extend(
        executed
            .into_iter()
            .filter(|request| !request.has_evidence())
            .map(|request| Alert::MissingEvidence {
                request_id: request.id,
                business_key: request.business_key,
            }),
    );

    alerts.extend(
        requests
            .area_mismatches()?
            .into_iter()
            .map(|request| Alert::AreaMismatch {
                request_id: request.id,
                business_key: request.business_key,
                assigned_area: request.area,
            }),
    );

    Ok(AlertReport {
        generated_at: now,
        alerts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{next_record_id, InspectionRecord};
    use crate::repository::{MemoryStore, RecordStore};
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 20)
            .expect("valid date")
            .and_hms_opt(12, 0, 0)
            .expect("valid time")
    }

    fn request(
        key: &str,
        category: ServiceCategory,
        status: RequestStatus,
        age_hours: i64,
    ) -> ServiceRequest {
        ServiceRequest {
            id: next_record_id(),
            business_key: key.to_string(),
            category,
            status,
            area: AreaCode::Santana,
            address: "Rua Dr. César, 80".to_string(),
            neighborhood: None,
            coordinates: None,
            created_at: now() - Duration::hours(age_hours),
            inspected_at: None,
            scheduled_at: None,
            executed_at: None,
            sla_hours: 72,
            evidence: vec!["photos/before.jpg".to_string()],
            area_mismatch: false,
            bulk_imported: true,
        }
    }

    fn pending_inspection(key: &str, age_hours: i64, deadline_hours: u32) -> InspectionRecord {
        InspectionRecord {
            id: next_record_id(),
            business_key: key.to_string(),
            notice_number: None,
            area_name: "Santana/Tucuruvi".to_string(),
            zone: None,
            sector: None,
            shift: None,
            service: None,
            opened_at: now() - Duration::hours(age_hours),
            synced_at: None,
            inspected_at: None,
            executed_at: None,
            deadline_hours,
            status: InspectionStatus::Pending,
            situation: None,
            address: None,
            coordinates: None,
            contractor_inspector: None,
            inspector: None,
            bulk_imported: true,
        }
    }

    fn keys(report: &AlertReport) -> Vec<&str> {
        report.alerts.iter().map(Alert::business_key).collect()
    }

    #[test]
    fn raises_each_alert_family() {
        let store = MemoryStore::default();
        let requests = &store.requests;

        requests
            .insert(request("OLD-DEBRIS", ServiceCategory::Debris, RequestStatus::AwaitingAnalysis, 30))
            .expect("seed");
        requests
            .insert(request("NEW-DEBRIS", ServiceCategory::Debris, RequestStatus::AwaitingAnalysis, 5))
            .expect("seed");
        requests
            .insert(request("OLD-SWEEP", ServiceCategory::Sweeping, RequestStatus::AwaitingAnalysis, 90))
            .expect("seed");

        let mut stalled = request("STALLED", ServiceCategory::BulkPickup, RequestStatus::InExecution, 200);
        stalled.scheduled_at = Some(now() - Duration::hours(80));
        requests.insert(stalled).expect("seed");

        let mut no_photos = request("NO-PHOTOS", ServiceCategory::Debris, RequestStatus::Executed, 10);
        no_photos.evidence.clear();
        requests.insert(no_photos).expect("seed");

        let mut mismatched = request("MISMATCH", ServiceCategory::Sweeping, RequestStatus::Finalized, 10);
        mismatched.area_mismatch = true;
        requests.insert(mismatched).expect("seed");

        store
            .inspections
            .insert(pending_inspection("BFS-LATE", 18, 24))
            .expect("seed");
        store
            .inspections
            .insert(pending_inspection("BFS-FRESH", 2, 24))
            .expect("seed");

        let report = scan_alerts(&store, now()).expect("scan");
        let mut found = keys(&report);
        found.sort_unstable();
        assert_eq!(
            found,
            vec!["BFS-LATE", "MISMATCH", "NO-PHOTOS", "OLD-DEBRIS", "STALLED"]
        );

        let deadline = report
            .alerts
            .iter()
            .find_map(|alert| match alert {
                Alert::InspectionDeadline {
                    deadline_used_percent,
                    hours_remaining,
                    ..
                } => Some((*deadline_used_percent, *hours_remaining)),
                _ => None,
            })
            .expect("deadline alert");
        assert!((deadline.0 - 75.0).abs() < f64::EPSILON);
        assert!((deadline.1 - 6.0).abs() < 1e-9);
    }

    #[test]
    fn empty_store_raises_nothing() {
        let report = scan_alerts(&MemoryStore::default(), now()).expect("scan");
        assert!(report.alerts.is_empty());
        assert_eq!(report.generated_at, now());
    }
}
