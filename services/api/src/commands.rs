use crate::infra::{in_memory_service, parse_area, parse_date, parse_percentage};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use waste_compliance::config::AppConfig;
use waste_compliance::domain::{AreaCode, IndicatorSnapshot, ReportingWindow};
use waste_compliance::error::AppError;
use waste_compliance::repository::MemoryStore;
use waste_compliance::scoring::{CompositeScore, WorkPlanInput, WorkPlanSource};
use waste_compliance::{ComplianceService, ComplianceServiceError, ImportKind, ImportReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum KindArg {
    ServiceRequests,
    Inspections,
    Violations,
}

impl From<KindArg> for ImportKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::ServiceRequests => ImportKind::ServiceRequests,
            KindArg::Inspections => ImportKind::Inspections,
            KindArg::Violations => ImportKind::Violations,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Export layout of the file
    #[arg(long, value_enum)]
    pub(crate) kind: KindArg,
    /// Semicolon-delimited export to reconcile
    pub(crate) path: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Service request export
    #[arg(long)]
    pub(crate) requests: PathBuf,
    /// Inspection bulletin export
    #[arg(long)]
    pub(crate) inspections: PathBuf,
    /// First day of the reporting window (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: NaiveDate,
    /// Day after the reporting window (YYYY-MM-DD, exclusive)
    #[arg(long, value_parser = parse_date)]
    pub(crate) end: NaiveDate,
    /// Restrict the indicators to one area (CV, JT, ST, MG)
    #[arg(long, value_parser = parse_area)]
    pub(crate) area: Option<AreaCode>,
    /// Labor execution percentage for the work plan
    #[arg(long, value_parser = parse_percentage, requires = "equipment", conflicts_with = "work_plan")]
    pub(crate) labor: Option<Decimal>,
    /// Equipment execution percentage for the work plan
    #[arg(long, value_parser = parse_percentage, requires = "labor")]
    pub(crate) equipment: Option<Decimal>,
    /// Precomputed work-plan indicator value
    #[arg(long, value_parser = parse_percentage)]
    pub(crate) work_plan: Option<Decimal>,
}

impl ScoreArgs {
    fn work_plan_input(&self) -> WorkPlanInput {
        match (self.labor, self.equipment, self.work_plan) {
            (Some(labor), Some(equipment), _) => WorkPlanInput::Components { labor, equipment },
            (_, _, Some(value)) => WorkPlanInput::Precomputed { value },
            _ => WorkPlanInput::Omitted,
        }
    }
}

/// In-memory service honouring the environment's ingest settings.
fn configured_service() -> Result<Arc<ComplianceService<MemoryStore>>, AppError> {
    let config = AppConfig::load()?;
    Ok(in_memory_service(config.ingest))
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let bytes = std::fs::read(&args.path)?;
    let service = configured_service()?;
    let report = service.import(args.kind.into(), &bytes)?;
    render_import(&report);
    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let window = ReportingWindow::new(
        args.start.and_time(NaiveTime::MIN),
        args.end.and_time(NaiveTime::MIN),
    )
    .map_err(ComplianceServiceError::from)?;

    let service = configured_service()?;
    let requests = service.import_service_requests(&std::fs::read(&args.requests)?)?;
    render_import(&requests);
    let inspections = service.import_inspections(&std::fs::read(&args.inspections)?)?;
    render_import(&inspections);

    let score = service.composite_score(&window, args.area, args.work_plan_input())?;
    render_score(&score);
    Ok(())
}

fn render_import(report: &ImportReport) {
    let summary = report.summary;
    println!("Imported {} ({} rows)", report.kind.label(), summary.total_seen);
    println!(
        "- created {} | updated {} | skipped invalid {} | skipped duplicate {}",
        summary.created, summary.updated, summary.skipped_invalid, summary.skipped_duplicate
    );
    if let Some(linked) = report.linked_inspections {
        println!("- {linked} violations linked to inspections");
    }
}

fn render_indicator(snapshot: &IndicatorSnapshot) {
    println!(
        "- {}: {} ({} pts)",
        snapshot.kind.label(),
        snapshot.value,
        snapshot.points
    );
}

fn render_score(score: &CompositeScore) {
    let scope = score
        .scope
        .map(|area| area.display_name())
        .unwrap_or("System-wide");
    println!(
        "\nCompliance score {} to {} ({scope})",
        score.window.start().date(),
        score.window.end().date()
    );
    render_indicator(&score.complaint_rate);
    render_indicator(&score.response_rate);
    render_indicator(&score.inspection_quality);

    let work_plan = &score.work_plan;
    match (work_plan.value, work_plan.source) {
        (Some(value), source) => println!(
            "- Work plan execution: {value} ({} pts, {})",
            work_plan.points,
            source_label(source)
        ),
        (None, _) => println!("- Work plan execution: not provided (0 pts)"),
    }

    println!("Total: {} pts", score.total_points);
    println!(
        "Payment: {}% | Discount: {}%",
        score.payment.payment_percent, score.payment.discount_percent
    );
}

fn source_label(source: WorkPlanSource) -> &'static str {
    match source {
        WorkPlanSource::Precomputed => "precomputed",
        WorkPlanSource::Components => "labor/equipment",
        WorkPlanSource::Saved { .. } => "saved snapshot",
        WorkPlanSource::Missing => "missing",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        score: ScoreArgs,
    }

    fn parse(extra: &[&str]) -> Result<ScoreArgs, clap::Error> {
        let base = [
            "score",
            "--requests",
            "requests.csv",
            "--inspections",
            "inspections.csv",
            "--start",
            "2025-11-01",
            "--end",
            "2025-12-01",
        ];
        Harness::try_parse_from(base.iter().chain(extra.iter())).map(|harness| harness.score)
    }

    #[test]
    fn components_take_the_work_plan_slot() {
        let args = parse(&["--labor", "80", "--equipment", "90"]).expect("parses");
        assert_eq!(
            args.work_plan_input(),
            WorkPlanInput::Components {
                labor: Decimal::from(80),
                equipment: Decimal::from(90),
            }
        );
    }

    #[test]
    fn labor_requires_equipment_and_excludes_precomputed_value() {
        assert!(parse(&["--labor", "80"]).is_err());
        assert!(parse(&["--labor", "80", "--equipment", "90", "--work-plan", "70"]).is_err());
    }

    #[test]
    fn commands_read_the_batch_timeout_from_the_environment() {
        use std::sync::{Mutex, OnceLock};
        use waste_compliance::config::ConfigError;

        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        let _lock = GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env guard");

        std::env::set_var("APP_BATCH_TIMEOUT_SECS", "0");
        let rejected = configured_service();
        std::env::set_var("APP_BATCH_TIMEOUT_SECS", "7");
        let accepted = configured_service();
        std::env::remove_var("APP_BATCH_TIMEOUT_SECS");

        assert!(matches!(
            rejected,
            Err(AppError::Config(ConfigError::InvalidBatchTimeout))
        ));
        assert!(accepted.is_ok());
    }

    #[test]
    fn no_work_plan_flags_mean_omitted() {
        let args = parse(&["--area", "jt"]).expect("parses");
        assert_eq!(args.area, Some(AreaCode::Jacana));
        assert_eq!(args.work_plan_input(), WorkPlanInput::Omitted);
    }
}
