//! Composite score and the cascading payment/discount schedule.

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{
    AreaCode, IndicatorKind, IndicatorSnapshot, RecordId, ReportingWindow, StoredSnapshot,
};
use crate::indicators::{IndicatorEngine, IndicatorError};
use crate::repository::{ComplianceStore, RepositoryError, SnapshotRepository};

/// Payment and discount percentages applied to the contract invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaymentOutcome {
    pub payment_percent: Decimal,
    pub discount_percent: Decimal,
}

/// Map total points (0..=100) through the regulator's discount bands. Each
/// band starts from the discount accumulated at the previous band's edge.
pub fn payment_schedule(total: Decimal) -> PaymentOutcome {
    let ninety = Decimal::from(90);
    let seventy = Decimal::from(70);
    let fifty = Decimal::from(50);
    let thirty = Decimal::from(30);

    let first_rate = Decimal::new(20, 2);
    let second_rate = Decimal::new(25, 2);
    let third_rate = Decimal::new(5, 1);
    let first_band = (ninety - seventy) * first_rate;
    let second_band = (seventy - fifty) * second_rate;

    let (floor, discount) = if total >= ninety {
        return PaymentOutcome {
            payment_percent: Decimal::ONE_HUNDRED,
            discount_percent: Decimal::ZERO,
        };
    } else if total >= seventy {
        (Decimal::from(95), (ninety - total) * first_rate)
    } else if total >= fifty {
        (Decimal::from(90), first_band + (seventy - total) * second_rate)
    } else if total >= thirty {
        (
            Decimal::from(80),
            first_band + second_band + (fifty - total) * third_rate,
        )
    } else {
        return PaymentOutcome {
            payment_percent: seventy,
            discount_percent: thirty,
        };
    };

    PaymentOutcome {
        payment_percent: floor.max(Decimal::ONE_HUNDRED - discount).normalize(),
        discount_percent: discount.normalize(),
    }
}

/// How the work-plan indicator enters the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WorkPlanInput {
    /// Externally computed indicator value, scored through the step table.
    Precomputed { value: Decimal },
    Components { labor: Decimal, equipment: Decimal },
    /// The stored system-wide snapshot for the period.
    Saved,
    Omitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum WorkPlanSource {
    Precomputed,
    Components,
    Saved { snapshot_id: RecordId },
    /// Omitted, or `Saved` with nothing stored for the period.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkPlanContribution {
    pub value: Option<Decimal>,
    pub points: Decimal,
    #[serde(flatten)]
    pub source: WorkPlanSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeScore {
    pub window: ReportingWindow,
    pub scope: Option<AreaCode>,
    pub complaint_rate: IndicatorSnapshot,
    pub response_rate: IndicatorSnapshot,
    pub inspection_quality: IndicatorSnapshot,
    pub work_plan: WorkPlanContribution,
    pub total_points: Decimal,
    #[serde(flatten)]
    pub payment: PaymentOutcome,
}

/// Stored system-wide work-plan snapshot for `window`: the most recently
/// computed one whose window intersects, else one starting in the same
/// calendar month.
pub fn find_saved_work_plan<R>(
    snapshots: &R,
    window: &ReportingWindow,
) -> Result<Option<StoredSnapshot>, RepositoryError>
where
    R: SnapshotRepository + ?Sized,
{
    let stored = snapshots.list(IndicatorKind::WorkPlanExecution, None)?;
    let latest = |candidates: Vec<&StoredSnapshot>| {
        candidates
            .into_iter()
            .max_by_key(|candidate| candidate.snapshot.computed_at)
            .cloned()
    };

    let intersecting: Vec<_> = stored
        .iter()
        .filter(|candidate| candidate.snapshot.window.intersects(window))
        .collect();
    if let Some(found) = latest(intersecting) {
        return Ok(Some(found));
    }

    let start = window.start();
    let same_month: Vec<_> = stored
        .iter()
        .filter(|candidate| {
            let candidate_start = candidate.snapshot.window.start();
            candidate_start.year() == start.year() && candidate_start.month() == start.month()
        })
        .collect();
    Ok(latest(same_month))
}

fn work_plan_contribution<S>(
    engine: &IndicatorEngine,
    store: &S,
    window: &ReportingWindow,
    input: WorkPlanInput,
) -> Result<WorkPlanContribution, IndicatorError>
where
    S: ComplianceStore + ?Sized,
{
    let contribution = match input {
        WorkPlanInput::Precomputed { value } => WorkPlanContribution {
            value: Some(value),
            points: engine.work_plan_points(value)?,
            source: WorkPlanSource::Precomputed,
        },
        WorkPlanInput::Components { labor, equipment } => {
            let snapshot = engine.work_plan(window, labor, equipment)?;
            WorkPlanContribution {
                value: Some(snapshot.value),
                points: snapshot.points,
                source: WorkPlanSource::Components,
            }
        }
        WorkPlanInput::Saved => match find_saved_work_plan(store.snapshots(), window)? {
            Some(stored) => WorkPlanContribution {
                value: Some(stored.snapshot.value),
                points: stored.snapshot.points,
                source: WorkPlanSource::Saved {
                    snapshot_id: stored.id,
                },
            },
            None => missing_work_plan(),
        },
        WorkPlanInput::Omitted => missing_work_plan(),
    };
    Ok(contribution)
}

fn missing_work_plan() -> WorkPlanContribution {
    WorkPlanContribution {
        value: None,
        points: Decimal::ZERO,
        source: WorkPlanSource::Missing,
    }
}

/// Compute the three event-derived indicators, resolve the work-plan input
/// and map the summed points to payment and discount.
pub fn composite_score<S>(
    engine: &IndicatorEngine,
    store: &S,
    window: &ReportingWindow,
    scope: Option<AreaCode>,
    work_plan: WorkPlanInput,
) -> Result<CompositeScore, IndicatorError>
where
    S: ComplianceStore + ?Sized,
{
    let complaint_rate = engine.complaint_rate(store.requests(), window, scope)?;
    let response_rate = engine.response_rate(store.requests(), window, scope)?;
    let inspection_quality = engine.inspection_quality(store.inspections(), window, scope)?;
    let work_plan = work_plan_contribution(engine, store, window, work_plan)?;

    let total_points = complaint_rate.points
        + response_rate.points
        + inspection_quality.points
        + work_plan.points;
    let payment = payment_schedule(total_points);

    info!(
        total_points = %total_points,
        payment = %payment.payment_percent,
        discount = %payment.discount_percent,
        "composite score computed"
    );

    Ok(CompositeScore {
        window: *window,
        scope,
        complaint_rate,
        response_rate,
        inspection_quality,
        work_plan,
        total_points,
        payment,
    })
}
