//! Compliance indicators computed for a reporting window and optional area.
//!
//! Every indicator resolves to value 0 when its denominator is empty; nothing
//! here returns NaN or fails on missing data.

mod config;
mod steps;

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::json;
use tracing::debug;

use crate::domain::{
    AreaCode, DeadlineOutcome, IndicatorKind, IndicatorSnapshot, ReportingWindow, ServiceCategory,
};
use crate::repository::{InspectionQueries, RepositoryError, RequestQueries};

pub use config::{ComplianceTables, HouseholdTable};
pub use steps::{Step, StepDirection, StepTable};

/// Source of "now" for snapshot timestamps.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().naive_utc())
}

pub(crate) fn round_half_up(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator * 100` at two decimals, 0 for an empty denominator.
pub(crate) fn percentage(numerator: usize, denominator: usize) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    round_half_up(
        Decimal::from(numerator) * Decimal::ONE_HUNDRED / Decimal::from(denominator),
        2,
    )
}

#[derive(Debug, thiserror::Error)]
pub enum IndicatorError {
    #[error("{field} must be between 0 and 100, got {value}")]
    PercentageOutOfRange { field: &'static str, value: Decimal },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub(crate) fn check_percentage(field: &'static str, value: Decimal) -> Result<Decimal, IndicatorError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(IndicatorError::PercentageOutOfRange { field, value });
    }
    Ok(value)
}

/// Indicator calculator bound to one immutable set of tables.
#[derive(Clone)]
pub struct IndicatorEngine {
    tables: Arc<ComplianceTables>,
    clock: Clock,
}

impl IndicatorEngine {
    pub fn new(tables: Arc<ComplianceTables>) -> Self {
        Self::with_clock(tables, system_clock())
    }

    pub fn with_clock(tables: Arc<ComplianceTables>, clock: Clock) -> Self {
        Self { tables, clock }
    }

    pub fn tables(&self) -> &ComplianceTables {
        &self.tables
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    fn snapshot(
        &self,
        kind: IndicatorKind,
        value: Decimal,
        points: Decimal,
        window: &ReportingWindow,
        scope: Option<AreaCode>,
        details: serde_json::Value,
    ) -> IndicatorSnapshot {
        debug!(indicator = kind.label(), %value, %points, "indicator computed");
        IndicatorSnapshot {
            kind,
            value,
            points,
            window: *window,
            scope,
            computed_at: self.now(),
            details,
        }
    }

    /// Completed scheduled-category requests per thousand served households.
    pub fn complaint_rate<Q>(
        &self,
        requests: &Q,
        window: &ReportingWindow,
        scope: Option<AreaCode>,
    ) -> Result<IndicatorSnapshot, RepositoryError>
    where
        Q: RequestQueries + ?Sized,
    {
        let complaints = requests
            .created_in(window, scope)?
            .into_iter()
            .filter(|request| !request.category.is_demand_driven() && request.status.is_terminal())
            .count();
        let households = self.tables.households.for_scope(scope);

        let value = if households == 0 {
            Decimal::ZERO
        } else {
            round_half_up(
                Decimal::from(complaints) * Decimal::ONE_THOUSAND / Decimal::from(households),
                3,
            )
        };
        let points = self.tables.complaint_rate_steps.points(value);

        let details = json!({
            "complaints": complaints,
            "households": households,
            "categories": ServiceCategory::in_group(crate::domain::CategoryGroup::Scheduled),
        });
        Ok(self.snapshot(IndicatorKind::ComplaintRate, value, points, window, scope, details))
    }

    /// Share of executed demand-driven requests finished within their SLA.
    ///
    /// Completed requests without an execution timestamp are left out of both
    /// the numerator and the denominator.
    pub fn response_rate<Q>(
        &self,
        requests: &Q,
        window: &ReportingWindow,
        scope: Option<AreaCode>,
    ) -> Result<IndicatorSnapshot, RepositoryError>
    where
        Q: RequestQueries + ?Sized,
    {
        let outcomes: Vec<DeadlineOutcome> = requests
            .created_in(window, scope)?
            .into_iter()
            .filter(|request| {
                request.category.is_demand_driven()
                    && request.status.is_terminal()
                    && request.executed_at.is_some()
            })
            .map(|request| request.deadline_outcome())
            .collect();

        let eligible = outcomes.len();
        let on_time = outcomes
            .iter()
            .filter(|outcome| **outcome == DeadlineOutcome::OnTime)
            .count();
        let value = percentage(on_time, eligible);
        let points = self.tables.response_rate_steps.points(value);

        let details = json!({
            "eligible": eligible,
            "on_time": on_time,
            "late": eligible - on_time,
            "categories": ServiceCategory::in_group(crate::domain::CategoryGroup::DemandDriven),
        });
        Ok(self.snapshot(IndicatorKind::ResponseRate, value, points, window, scope, details))
    }

    /// Share of inspections opened in the window that found no irregularity.
    pub fn inspection_quality<Q>(
        &self,
        inspections: &Q,
        window: &ReportingWindow,
        scope: Option<AreaCode>,
    ) -> Result<IndicatorSnapshot, RepositoryError>
    where
        Q: InspectionQueries + ?Sized,
    {
        let area_name = scope.map(|area| self.tables.inspection_area_name(area));
        let opened = inspections.opened_in(window, area_name)?;
        let total = opened.len();
        let regularized = opened
            .iter()
            .filter(|inspection| inspection.is_regularized())
            .count();
        let value = percentage(regularized, total);
        let points = self.tables.inspection_quality_steps.points(value);

        let details = json!({
            "inspections": total,
            "regularized": regularized,
            "area_name": area_name,
        });
        Ok(self.snapshot(IndicatorKind::InspectionQuality, value, points, window, scope, details))
    }

    /// Equal-weight average of the labor and equipment execution percentages.
    pub fn work_plan(
        &self,
        window: &ReportingWindow,
        labor: Decimal,
        equipment: Decimal,
    ) -> Result<IndicatorSnapshot, IndicatorError> {
        let labor = check_percentage("labor", labor)?;
        let equipment = check_percentage("equipment", equipment)?;
        let half = Decimal::new(5, 1);
        let value = round_half_up(labor * half + equipment * half, 2);
        let points = self.tables.work_plan_steps.points(value);

        let details = json!({
            "labor": labor,
            "equipment": equipment,
        });
        Ok(self.snapshot(IndicatorKind::WorkPlanExecution, value, points, window, None, details))
    }

    /// Points for an externally computed work-plan value.
    pub fn work_plan_points(&self, value: Decimal) -> Result<Decimal, IndicatorError> {
        let value = check_percentage("work_plan", value)?;
        Ok(self.tables.work_plan_steps.points(value))
    }
}

#[cfg(test)]
mod tests;
