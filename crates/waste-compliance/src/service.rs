use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alerts::{self, AlertReport};
use crate::classification::{explain, Classification};
use crate::config::IngestConfig;
use crate::domain::{
    AreaCode, CategoryGroup, IndicatorSnapshot, ReportingWindow, ServiceCategory, ServiceRequest,
    StoredSnapshot, WindowError,
};
use crate::indicators::{Clock, ComplianceTables, IndicatorEngine, IndicatorError};
use crate::ingest::{
    link_inspections, parse_inspections, parse_service_requests, parse_violations, Geocoder,
    IngestError, NoopGeocoder,
};
use crate::reconcile::{ReconcileError, ReconcileSummary, Reconciler};
use crate::remediation;
use crate::repository::{
    ComplianceStore, RecordStore, RepositoryError, SnapshotRepository, UpsertOutcome,
};
use crate::scoring::{self, CompositeScore, WorkPlanInput};

/// Export accepted by the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    ServiceRequests,
    Inspections,
    Violations,
}

impl ImportKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ServiceRequests => "service-requests",
            Self::Inspections => "inspections",
            Self::Violations => "violations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub kind: ImportKind,
    #[serde(flatten)]
    pub summary: ReconcileSummary,
    /// Violations linked to a stored inspection; absent for other kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_inspections: Option<usize>,
}

/// Classifier answer enriched with the category's group and default SLA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationView {
    pub text: String,
    pub category: ServiceCategory,
    pub label: &'static str,
    pub group: CategoryGroup,
    pub rule: &'static str,
    pub default_sla_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedSnapshot {
    #[serde(flatten)]
    pub stored: StoredSnapshot,
    pub outcome: UpsertOutcome,
}

/// Facade composing the record store, scoring tables, geocoder and the
/// bounded reconciler.
pub struct ComplianceService<S> {
    store: Arc<S>,
    engine: IndicatorEngine,
    geocoder: Arc<dyn Geocoder>,
    reconciler: Reconciler,
}

impl<S> ComplianceService<S>
where
    S: ComplianceStore + 'static,
{
    pub fn new(store: Arc<S>, tables: ComplianceTables, ingest: IngestConfig) -> Self {
        Self {
            store,
            engine: IndicatorEngine::new(Arc::new(tables)),
            geocoder: Arc::new(NoopGeocoder),
            reconciler: Reconciler::new(ingest.batch_timeout),
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    /// Replace the clock used for snapshot timestamps, import fallbacks and
    /// alert ages.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        let tables = Arc::new(self.engine.tables().clone());
        self.engine = IndicatorEngine::with_clock(tables, clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tables(&self) -> &ComplianceTables {
        self.engine.tables()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.engine.now()
    }

    pub fn import(
        &self,
        kind: ImportKind,
        bytes: &[u8],
    ) -> Result<ImportReport, ComplianceServiceError> {
        match kind {
            ImportKind::ServiceRequests => self.import_service_requests(bytes),
            ImportKind::Inspections => self.import_inspections(bytes),
            ImportKind::Violations => self.import_violations(bytes),
        }
    }

    pub fn import_service_requests(
        &self,
        bytes: &[u8],
    ) -> Result<ImportReport, ComplianceServiceError> {
        let batch = parse_service_requests(bytes, &self.tables().sla, self.geocoder.as_ref())?;
        let summary = self
            .reconciler
            .reconcile(self.store.requests(), batch, self.now())?;
        Ok(ImportReport {
            kind: ImportKind::ServiceRequests,
            summary,
            linked_inspections: None,
        })
    }

    pub fn import_inspections(&self, bytes: &[u8]) -> Result<ImportReport, ComplianceServiceError> {
        let batch = parse_inspections(bytes, self.geocoder.as_ref())?;
        let summary = self
            .reconciler
            .reconcile(self.store.inspections(), batch, self.now())?;
        Ok(ImportReport {
            kind: ImportKind::Inspections,
            summary,
            linked_inspections: None,
        })
    }

    /// Violations are linked to already-imported inspections before they are
    /// reconciled, so import inspections first.
    pub fn import_violations(&self, bytes: &[u8]) -> Result<ImportReport, ComplianceServiceError> {
        let mut batch = parse_violations(bytes)?;
        let linked = link_inspections(
            &mut batch,
            self.store.inspections(),
            self.reconciler.timeout(),
        );
        let summary = self
            .reconciler
            .reconcile(self.store.violations(), batch, self.now())?;
        Ok(ImportReport {
            kind: ImportKind::Violations,
            summary,
            linked_inspections: Some(linked),
        })
    }

    pub fn complaint_rate(
        &self,
        window: &ReportingWindow,
        scope: Option<AreaCode>,
    ) -> Result<IndicatorSnapshot, ComplianceServiceError> {
        Ok(self
            .engine
            .complaint_rate(self.store.requests(), window, scope)?)
    }

    pub fn response_rate(
        &self,
        window: &ReportingWindow,
        scope: Option<AreaCode>,
    ) -> Result<IndicatorSnapshot, ComplianceServiceError> {
        Ok(self
            .engine
            .response_rate(self.store.requests(), window, scope)?)
    }

    pub fn inspection_quality(
        &self,
        window: &ReportingWindow,
        scope: Option<AreaCode>,
    ) -> Result<IndicatorSnapshot, ComplianceServiceError> {
        Ok(self
            .engine
            .inspection_quality(self.store.inspections(), window, scope)?)
    }

    pub fn work_plan(
        &self,
        window: &ReportingWindow,
        labor: Decimal,
        equipment: Decimal,
    ) -> Result<IndicatorSnapshot, ComplianceServiceError> {
        Ok(self.engine.work_plan(window, labor, equipment)?)
    }

    /// Persist a computed snapshot. Kinds that allow it replace the snapshot
    /// already stored for the same window and scope; the others are appended.
    pub fn save_snapshot(
        &self,
        snapshot: IndicatorSnapshot,
    ) -> Result<SavedSnapshot, ComplianceServiceError> {
        let kind = snapshot.kind;
        let (stored, outcome) = if kind.supports_upsert() {
            self.store.snapshots().upsert(snapshot)?
        } else {
            (self.store.snapshots().insert(snapshot)?, UpsertOutcome::Created)
        };
        info!(
            indicator = kind.label(),
            snapshot_id = %stored.id,
            ?outcome,
            "indicator snapshot saved"
        );
        Ok(SavedSnapshot { stored, outcome })
    }

    pub fn save_work_plan(
        &self,
        window: &ReportingWindow,
        labor: Decimal,
        equipment: Decimal,
    ) -> Result<SavedSnapshot, ComplianceServiceError> {
        let snapshot = self.work_plan(window, labor, equipment)?;
        self.save_snapshot(snapshot)
    }

    pub fn composite_score(
        &self,
        window: &ReportingWindow,
        scope: Option<AreaCode>,
        work_plan: WorkPlanInput,
    ) -> Result<CompositeScore, ComplianceServiceError> {
        Ok(scoring::composite_score(
            &self.engine,
            self.store.as_ref(),
            window,
            scope,
            work_plan,
        )?)
    }

    pub fn scan_alerts(&self) -> Result<AlertReport, ComplianceServiceError> {
        Ok(alerts::scan_alerts(self.store.as_ref(), self.now())?)
    }

    pub fn remediate_legacy_bulk_pickup(&self) -> Result<usize, ComplianceServiceError> {
        Ok(remediation::remediate_legacy_bulk_pickup(
            self.store.requests(),
            &self.tables().sla,
            self.reconciler.timeout(),
        )?)
    }

    /// Attach evidence references to a stored request. Bulk imports never
    /// touch evidence, so attached references survive later re-imports.
    pub fn attach_evidence(
        &self,
        business_key: &str,
        references: Vec<String>,
    ) -> Result<ServiceRequest, ComplianceServiceError> {
        if references.iter().all(|reference| reference.trim().is_empty()) {
            return Err(ComplianceServiceError::EmptyEvidence);
        }

        let requests = self.store.requests();
        let mut request = requests
            .fetch_by_key(business_key)?
            .ok_or_else(|| ComplianceServiceError::UnknownRequest(business_key.to_string()))?;
        let added = request.attach_evidence(references);
        if added > 0 {
            requests.update(request.clone())?;
        }
        info!(
            business_key,
            added,
            total = request.evidence.len(),
            "evidence attached"
        );
        Ok(request)
    }

    pub fn classify(&self, text: &str) -> ClassificationView {
        let Classification { category, rule } = explain(text);
        ClassificationView {
            text: text.to_string(),
            category,
            label: category.label(),
            group: category.group(),
            rule,
            default_sla_hours: self.tables().sla.effective_sla(category, None),
        }
    }
}

/// Error raised by the compliance service.
#[derive(Debug, thiserror::Error)]
pub enum ComplianceServiceError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error("no service request with key {0}")]
    UnknownRequest(String),
    #[error("at least one evidence reference is required")]
    EmptyEvidence,
}

impl ComplianceServiceError {
    /// Failures caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Ingest(_)
                | Self::Window(_)
                | Self::EmptyEvidence
                | Self::Indicator(IndicatorError::PercentageOutOfRange { .. })
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownRequest(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Repository(RepositoryError::Timeout(_))
                | Self::Indicator(IndicatorError::Repository(RepositoryError::Timeout(_)))
                | Self::Reconcile(ReconcileError::Commit {
                    source: RepositoryError::Timeout(_),
                    ..
                })
        )
    }
}
