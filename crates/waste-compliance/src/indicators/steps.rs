use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a step threshold is compared against an indicator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDirection {
    /// Lower values are better: the first step whose threshold is >= value wins.
    AtMost,
    /// Higher values are better: the first step whose threshold is <= value wins.
    AtLeast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub threshold: Decimal,
    pub points: Decimal,
}

/// Monotonic threshold table mapping an indicator value to points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTable {
    pub direction: StepDirection,
    pub steps: Vec<Step>,
    /// Points when no step matches.
    pub fallback: Decimal,
}

impl StepTable {
    pub fn at_most(steps: &[(i64, i64)], fallback: i64) -> Self {
        Self::build(StepDirection::AtMost, steps, fallback)
    }

    pub fn at_least(steps: &[(i64, i64)], fallback: i64) -> Self {
        Self::build(StepDirection::AtLeast, steps, fallback)
    }

    fn build(direction: StepDirection, steps: &[(i64, i64)], fallback: i64) -> Self {
        Self {
            direction,
            steps: steps
                .iter()
                .map(|(threshold, points)| Step {
                    threshold: Decimal::from(*threshold),
                    points: Decimal::from(*points),
                })
                .collect(),
            fallback: Decimal::from(fallback),
        }
    }

    pub fn points(&self, value: Decimal) -> Decimal {
        self.steps
            .iter()
            .find(|step| match self.direction {
                StepDirection::AtMost => value <= step.threshold,
                StepDirection::AtLeast => value >= step.threshold,
            })
            .map(|step| step.points)
            .unwrap_or(self.fallback)
    }

    pub fn max_points(&self) -> Decimal {
        self.steps
            .iter()
            .map(|step| step.points)
            .fold(self.fallback, Decimal::max)
    }
}
