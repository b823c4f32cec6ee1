use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::{
    AreaCode, CategoryGroup, InspectionStatus, RequestStatus, ServiceCategory, ViolationStatus,
};
use super::{Coordinates, RecordId};

/// Citizen service request classified into a canonical category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: RecordId,
    pub business_key: String,
    pub category: ServiceCategory,
    pub status: RequestStatus,
    pub area: AreaCode,
    pub address: String,
    pub neighborhood: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub created_at: NaiveDateTime,
    pub inspected_at: Option<NaiveDateTime>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub executed_at: Option<NaiveDateTime>,
    pub sla_hours: u32,
    pub evidence: Vec<String>,
    /// Set when the source area name matched no known code and the default
    /// area was applied.
    pub area_mismatch: bool,
    pub bulk_imported: bool,
}

/// Outcome of comparing a request's execution time against its SLA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineOutcome {
    /// Scheduled categories are never late.
    Exempt,
    NotExecuted,
    OnTime,
    Late,
}

impl ServiceRequest {
    pub fn group(&self) -> CategoryGroup {
        self.category.group()
    }

    pub fn elapsed_seconds(&self) -> Option<i64> {
        self.executed_at
            .map(|executed| (executed - self.created_at).num_seconds())
    }

    pub fn deadline_outcome(&self) -> DeadlineOutcome {
        if !self.category.is_demand_driven() {
            return DeadlineOutcome::Exempt;
        }

        match self.elapsed_seconds() {
            None => DeadlineOutcome::NotExecuted,
            Some(elapsed) if elapsed <= i64::from(self.sla_hours) * 3600 => DeadlineOutcome::OnTime,
            Some(_) => DeadlineOutcome::Late,
        }
    }

    pub fn has_evidence(&self) -> bool {
        !self.evidence.is_empty()
    }

    /// Append photo or document references. Blank and already attached
    /// references are ignored; returns how many were added.
    pub fn attach_evidence<I>(&mut self, references: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.evidence.len();
        for reference in references {
            let reference = reference.trim();
            if !reference.is_empty() && !self.evidence.iter().any(|known| known == reference) {
                self.evidence.push(reference.to_string());
            }
        }
        self.evidence.len() - before
    }
}

/// Field inspection bulletin raised against the contractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub id: RecordId,
    pub business_key: String,
    pub notice_number: Option<String>,
    /// Administrative area as written by the inspection system.
    pub area_name: String,
    pub zone: Option<String>,
    pub sector: Option<String>,
    pub shift: Option<String>,
    pub service: Option<String>,
    pub opened_at: NaiveDateTime,
    pub synced_at: Option<NaiveDateTime>,
    pub inspected_at: Option<NaiveDateTime>,
    pub executed_at: Option<NaiveDateTime>,
    pub deadline_hours: u32,
    pub status: InspectionStatus,
    pub situation: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub contractor_inspector: Option<String>,
    pub inspector: Option<String>,
    pub bulk_imported: bool,
}

impl InspectionRecord {
    pub fn is_regularized(&self) -> bool {
        self.status == InspectionStatus::Regularized
    }

    /// Fraction of the deadline consumed at `now`, as a percentage.
    pub fn deadline_used_percent(&self, now: NaiveDateTime) -> f64 {
        if self.deadline_hours == 0 {
            return 0.0;
        }
        let elapsed_hours = (now - self.opened_at).num_seconds() as f64 / 3600.0;
        elapsed_hours / f64::from(self.deadline_hours) * 100.0
    }
}

/// Contractor irregularity notice, optionally linked to the inspection that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub id: RecordId,
    pub business_key: String,
    pub inspection_number: Option<String>,
    pub notice_number: Option<String>,
    pub inspection_id: Option<RecordId>,
    pub status: Option<ViolationStatus>,
    pub inspected_at: Option<NaiveDateTime>,
    pub synced_at: Option<NaiveDateTime>,
    pub executed_at: Option<NaiveDateTime>,
    pub issued_at: Option<NaiveDateTime>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub service: Option<String>,
    pub responsible: Option<String>,
    pub inspector: Option<String>,
    pub contractor: Option<String>,
    pub area_name: Option<String>,
    pub zone: Option<String>,
    pub description: Option<String>,
    pub fine_amount: Option<Decimal>,
    pub contract_clause: Option<String>,
    pub remarks: Option<String>,
    pub address: Option<String>,
    pub bulk_imported: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn request(category: ServiceCategory, sla_hours: u32, elapsed: Option<i64>) -> ServiceRequest {
        let created_at = NaiveDate::from_ymd_opt(2025, 11, 3)
            .expect("valid date")
            .and_hms_opt(8, 0, 0)
            .expect("valid time");
        ServiceRequest {
            id: RecordId(1),
            business_key: "2025-000001".to_string(),
            category,
            status: RequestStatus::Executed,
            area: AreaCode::Santana,
            address: "Rua Voluntários da Pátria, 100".to_string(),
            neighborhood: None,
            coordinates: None,
            created_at,
            inspected_at: None,
            scheduled_at: None,
            executed_at: elapsed.map(|hours| created_at + Duration::hours(hours)),
            sla_hours,
            evidence: Vec::new(),
            area_mismatch: false,
            bulk_imported: false,
        }
    }

    #[test]
    fn evidence_ignores_blank_and_repeated_references() {
        let mut record = request(ServiceCategory::Sweeping, 72, Some(4));
        let added = record.attach_evidence(vec![
            "fotos/antes.jpg".to_string(),
            "  ".to_string(),
            " fotos/antes.jpg ".to_string(),
            "fotos/depois.jpg".to_string(),
        ]);
        assert_eq!(added, 2);
        assert_eq!(record.evidence, vec!["fotos/antes.jpg", "fotos/depois.jpg"]);
        assert_eq!(record.attach_evidence(vec!["fotos/depois.jpg".to_string()]), 0);
        assert!(record.has_evidence());
    }

    #[test]
    fn scheduled_categories_are_exempt_regardless_of_elapsed_time() {
        let record = request(ServiceCategory::BulkPickup, 720, Some(10_000));
        assert_eq!(record.deadline_outcome(), DeadlineOutcome::Exempt);
    }

    #[test]
    fn deadline_boundary_counts_as_on_time() {
        assert_eq!(
            request(ServiceCategory::DeadAnimal, 12, Some(12)).deadline_outcome(),
            DeadlineOutcome::OnTime
        );
        assert_eq!(
            request(ServiceCategory::DeadAnimal, 12, Some(13)).deadline_outcome(),
            DeadlineOutcome::Late
        );
        assert_eq!(
            request(ServiceCategory::Debris, 72, None).deadline_outcome(),
            DeadlineOutcome::NotExecuted
        );
    }
}
