use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use waste_compliance::config::IngestConfig;
use waste_compliance::domain::AreaCode;
use waste_compliance::indicators::ComplianceTables;
use waste_compliance::repository::MemoryStore;
use waste_compliance::ComplianceService;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Service over a fresh in-memory store with the regulator's tables.
pub(crate) fn in_memory_service(ingest: IngestConfig) -> Arc<ComplianceService<MemoryStore>> {
    Arc::new(ComplianceService::new(
        Arc::new(MemoryStore::default()),
        ComplianceTables::default(),
        ingest,
    ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_area(raw: &str) -> Result<AreaCode, String> {
    AreaCode::from_code(raw).ok_or_else(|| {
        let known: Vec<&str> = AreaCode::ordered().into_iter().map(AreaCode::code).collect();
        format!("unknown area '{raw}', expected one of {}", known.join(", "))
    })
}

pub(crate) fn parse_percentage(raw: &str) -> Result<Decimal, String> {
    let value = Decimal::from_str(raw.trim().replace(',', ".").as_str())
        .map_err(|err| format!("failed to parse '{raw}' as a decimal ({err})"))?;
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(format!("'{raw}' is outside 0..=100"));
    }
    Ok(value)
}
