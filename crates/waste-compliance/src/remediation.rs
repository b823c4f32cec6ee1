use std::time::Duration;

use tracing::{info, warn};

use crate::deadline::SlaDefaults;
use crate::domain::{ServiceCategory, ServiceRequest};
use crate::repository::{ChangeSet, RecordStore, RepositoryError, RequestQueries};

/// SLA written by the old importer for bulk pickups it misfiled as debris.
pub const LEGACY_MISFILED_SLA_HOURS: u32 = 5;

/// Reclassify debris requests carrying the legacy 5h SLA as scheduled bulk
/// pickup with the bulk-pickup SLA, in one commit. Returns the patched count.
///
/// This is a heuristic: a genuine debris request that was given a 5h
/// responsiveness is indistinguishable and gets patched too.
pub fn remediate_legacy_bulk_pickup<S>(
    requests: &S,
    sla: &SlaDefaults,
    timeout: Duration,
) -> Result<usize, RepositoryError>
where
    S: RecordStore<ServiceRequest> + RequestQueries + ?Sized,
{
    let updates: Vec<ServiceRequest> = requests
        .with_category(ServiceCategory::Debris)?
        .into_iter()
        .filter(|request| request.sla_hours == LEGACY_MISFILED_SLA_HOURS)
        .map(|mut request| {
            request.category = ServiceCategory::BulkPickup;
            request.sla_hours = sla.bulk_pickup_hours;
            request
        })
        .collect();

    let patched = updates.len();
    if patched == 0 {
        return Ok(0);
    }

    requests
        .apply(
            ChangeSet {
                inserts: Vec::new(),
                updates,
            },
            timeout,
        )
        .map_err(|error| {
            warn!(%error, patched, "legacy bulk-pickup remediation rolled back");
            error
        })?;

    info!(patched, "legacy bulk-pickup requests reclassified");
    Ok(patched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{next_record_id, AreaCode, RequestStatus};
    use crate::repository::MemoryTable;
    use chrono::NaiveDateTime;

    fn debris(sla_hours: u32) -> ServiceRequest {
        let id = next_record_id();
        ServiceRequest {
            id,
            business_key: format!("SAC-{}", id.0),
            category: ServiceCategory::Debris,
            status: RequestStatus::AwaitingScheduling,
            area: AreaCode::VilaMaria,
            address: "Rua Curuçá, 12".to_string(),
            neighborhood: None,
            coordinates: None,
            created_at: NaiveDateTime::default(),
            inspected_at: None,
            scheduled_at: None,
            executed_at: None,
            sla_hours,
            evidence: Vec::new(),
            area_mismatch: false,
            bulk_imported: true,
        }
    }

    #[test]
    fn only_five_hour_debris_is_reclassified() {
        let table = MemoryTable::default();
        let misfiled = table.insert(debris(5)).expect("seed");
        let genuine = table.insert(debris(72)).expect("seed");

        let patched = remediate_legacy_bulk_pickup(
            &table,
            &SlaDefaults::default(),
            Duration::from_millis(50),
        )
        .expect("remediation commits");
        assert_eq!(patched, 1);

        let fixed = table.fetch(misfiled.id).expect("fetch").expect("present");
        assert_eq!(fixed.category, ServiceCategory::BulkPickup);
        assert_eq!(fixed.sla_hours, 720);

        let untouched = table.fetch(genuine.id).expect("fetch").expect("present");
        assert_eq!(untouched, genuine);
    }

    #[test]
    fn running_twice_patches_nothing_the_second_time() {
        let table = MemoryTable::default();
        table.insert(debris(5)).expect("seed");
        let timeout = Duration::from_millis(50);
        let sla = SlaDefaults::default();

        assert_eq!(remediate_legacy_bulk_pickup(&table, &sla, timeout), Ok(1));
        assert_eq!(remediate_legacy_bulk_pickup(&table, &sla, timeout), Ok(0));
    }
}
