use serde::{Deserialize, Serialize};

use crate::domain::ServiceCategory;

/// Default SLA hours per category family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaDefaults {
    /// Forced for bulk pickup even when a responsiveness value is supplied;
    /// for that category the source value is the inspection lead time.
    pub bulk_pickup_hours: u32,
    pub debris_hours: u32,
    pub dead_animal_hours: u32,
    pub receptacle_hours: u32,
    pub scheduled_hours: u32,
}

impl Default for SlaDefaults {
    fn default() -> Self {
        Self {
            bulk_pickup_hours: 720,
            debris_hours: 72,
            dead_animal_hours: 12,
            receptacle_hours: 72,
            scheduled_hours: 720,
        }
    }
}

impl SlaDefaults {
    /// Effective SLA for a classified category. A zero responsiveness is
    /// treated as not supplied.
    pub fn effective_sla(&self, category: ServiceCategory, responsiveness: Option<u32>) -> u32 {
        if category == ServiceCategory::BulkPickup {
            return self.bulk_pickup_hours;
        }

        if let Some(hours) = responsiveness.filter(|hours| *hours > 0) {
            return hours;
        }

        match category {
            ServiceCategory::Debris => self.debris_hours,
            ServiceCategory::DeadAnimal => self.dead_animal_hours,
            ServiceCategory::WasteReceptacle => self.receptacle_hours,
            _ => self.scheduled_hours,
        }
    }
}

/// [`SlaDefaults::effective_sla`] against the regulator's default table.
pub fn effective_sla(category: ServiceCategory, responsiveness: Option<u32>) -> u32 {
    SlaDefaults::default().effective_sla(category, responsiveness)
}
