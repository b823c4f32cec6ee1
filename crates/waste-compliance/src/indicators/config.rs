use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::steps::StepTable;
use crate::deadline::SlaDefaults;
use crate::domain::AreaCode;

/// Served households used as the complaint-rate denominator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdTable {
    pub total: u32,
    pub by_area: BTreeMap<AreaCode, u32>,
}

impl HouseholdTable {
    /// Area count, falling back to the system-wide total for unknown areas.
    pub fn for_scope(&self, scope: Option<AreaCode>) -> u32 {
        scope
            .and_then(|area| self.by_area.get(&area).copied())
            .unwrap_or(self.total)
    }
}

impl Default for HouseholdTable {
    fn default() -> Self {
        let by_area = BTreeMap::from([
            (AreaCode::CasaVerde, 130_030),
            (AreaCode::Jacana, 112_924),
            (AreaCode::Santana, 147_969),
            (AreaCode::VilaMaria, 120_170),
        ]);
        Self {
            total: 511_093,
            by_area,
        }
    }
}

/// Immutable scoring configuration passed into the indicator engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceTables {
    pub sla: SlaDefaults,
    pub households: HouseholdTable,
    pub complaint_rate_steps: StepTable,
    pub response_rate_steps: StepTable,
    pub inspection_quality_steps: StepTable,
    pub work_plan_steps: StepTable,
    /// Area names as written by the inspection system, used to scope the
    /// inspection-quality index.
    pub inspection_area_names: BTreeMap<AreaCode, String>,
}

impl ComplianceTables {
    pub fn inspection_area_name(&self, area: AreaCode) -> &str {
        self.inspection_area_names
            .get(&area)
            .map(String::as_str)
            .unwrap_or(area.display_name())
    }
}

impl Default for ComplianceTables {
    fn default() -> Self {
        Self {
            sla: SlaDefaults::default(),
            households: HouseholdTable::default(),
            complaint_rate_steps: StepTable::at_most(&[(1, 20), (2, 15), (5, 10), (10, 5)], 0),
            response_rate_steps: StepTable::at_least(
                &[(90, 20), (80, 16), (70, 12), (60, 8), (50, 4)],
                0,
            ),
            inspection_quality_steps: StepTable::at_least(
                &[
                    (90, 20),
                    (80, 18),
                    (70, 16),
                    (60, 14),
                    (50, 12),
                    (40, 10),
                    (30, 8),
                    (20, 6),
                    (10, 4),
                ],
                0,
            ),
            work_plan_steps: StepTable::at_least(
                &[
                    (90, 40),
                    (80, 38),
                    (70, 36),
                    (60, 32),
                    (50, 28),
                    (40, 24),
                    (30, 20),
                    (20, 16),
                    (10, 12),
                ],
                0,
            ),
            inspection_area_names: AreaCode::ordered()
                .into_iter()
                .map(|area| (area, area.display_name().to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn household_lookup_falls_back_to_total() {
        let households = HouseholdTable::default();
        assert_eq!(households.for_scope(Some(AreaCode::Santana)), 147_969);
        assert_eq!(households.for_scope(None), 511_093);

        let partial = HouseholdTable {
            total: 10,
            by_area: BTreeMap::new(),
        };
        assert_eq!(partial.for_scope(Some(AreaCode::Jacana)), 10);
    }

    #[test]
    fn default_tables_cap_the_composite_at_one_hundred() {
        let tables = ComplianceTables::default();
        let total = tables.complaint_rate_steps.max_points()
            + tables.response_rate_steps.max_points()
            + tables.inspection_quality_steps.max_points()
            + tables.work_plan_steps.max_points();
        assert_eq!(total, Decimal::from(100));
    }

    #[test]
    fn tables_round_trip_through_json() {
        let tables = ComplianceTables::default();
        let encoded = serde_json::to_string(&tables).expect("encode tables");
        let decoded: ComplianceTables = serde_json::from_str(&encoded).expect("decode tables");
        assert_eq!(decoded, tables);
        assert_eq!(
            decoded.inspection_area_name(AreaCode::VilaMaria),
            "Vila Maria/Vila Guilherme"
        );
    }
}
