use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::AreaCode;
use super::{RecordId, ReportingWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    ComplaintRate,
    ResponseRate,
    InspectionQuality,
    WorkPlanExecution,
}

impl IndicatorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ComplaintRate => "Household complaint rate",
            Self::ResponseRate => "Response rate",
            Self::InspectionQuality => "Inspection quality",
            Self::WorkPlanExecution => "Work plan execution",
        }
    }

    /// Only the work-plan indicator may be overwritten once saved.
    pub const fn supports_upsert(self) -> bool {
        matches!(self, Self::WorkPlanExecution)
    }
}

/// Computed indicator value for one window and optional area scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub kind: IndicatorKind,
    pub value: Decimal,
    pub points: Decimal,
    pub window: ReportingWindow,
    /// `None` means system-wide.
    pub scope: Option<AreaCode>,
    pub computed_at: NaiveDateTime,
    pub details: serde_json::Value,
}

impl IndicatorSnapshot {
    pub fn same_slot(&self, other: &IndicatorSnapshot) -> bool {
        self.kind == other.kind && self.window == other.window && self.scope == other.scope
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub id: RecordId,
    #[serde(flatten)]
    pub snapshot: IndicatorSnapshot,
}
