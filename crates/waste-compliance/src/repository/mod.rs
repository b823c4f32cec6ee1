//! Record-store abstraction consumed by the reconciler and the indicator
//! engine, plus an in-memory implementation.

mod memory;

use std::time::Duration;

use serde::Serialize;

use crate::domain::{
    AreaCode, IndicatorKind, IndicatorSnapshot, InspectionRecord, InspectionStatus, RecordId,
    ReportingWindow, RequestStatus, ServiceCategory, ServiceRequest, StoredSnapshot,
    ViolationRecord,
};

pub use memory::{MemorySnapshots, MemoryStore, MemoryTable};

/// Entity addressable both by surrogate id and by its external business key.
pub trait KeyedRecord: Clone + Send + Sync + 'static {
    fn id(&self) -> RecordId;
    fn business_key(&self) -> &str;
}

impl KeyedRecord for ServiceRequest {
    fn id(&self) -> RecordId {
        self.id
    }

    fn business_key(&self) -> &str {
        &self.business_key
    }
}

impl KeyedRecord for InspectionRecord {
    fn id(&self) -> RecordId {
        self.id
    }

    fn business_key(&self) -> &str {
        &self.business_key
    }
}

impl KeyedRecord for ViolationRecord {
    fn id(&self) -> RecordId {
        self.id
    }

    fn business_key(&self) -> &str {
        &self.business_key
    }
}

/// Staged inserts and updates applied as a single atomic unit.
#[derive(Debug, Clone)]
pub struct ChangeSet<R> {
    pub inserts: Vec<R>,
    pub updates: Vec<R>,
}

impl<R> ChangeSet<R> {
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R> Default for ChangeSet<R> {
    fn default() -> Self {
        Self {
            inserts: Vec::new(),
            updates: Vec::new(),
        }
    }
}

/// CRUD by surrogate id and business key with an all-or-nothing batch apply.
pub trait RecordStore<R: KeyedRecord>: Send + Sync {
    fn fetch(&self, id: RecordId) -> Result<Option<R>, RepositoryError>;
    fn fetch_by_key(&self, key: &str) -> Result<Option<R>, RepositoryError>;
    /// Bulk lookup; keys without a stored record are simply absent from the
    /// result. Waiting longer than `timeout` fails with
    /// [`RepositoryError::Timeout`].
    fn fetch_by_keys(&self, keys: &[String], timeout: Duration)
        -> Result<Vec<R>, RepositoryError>;
    fn insert(&self, record: R) -> Result<R, RepositoryError>;
    fn update(&self, record: R) -> Result<(), RepositoryError>;
    /// Apply every change or none. Waiting for the store longer than
    /// `timeout` fails with [`RepositoryError::Timeout`].
    fn apply(&self, changes: ChangeSet<R>, timeout: Duration) -> Result<(), RepositoryError>;
    fn count(&self) -> Result<usize, RepositoryError>;
}

pub trait RequestQueries: Send + Sync {
    /// Requests whose creation timestamp falls inside the window.
    fn created_in(
        &self,
        window: &ReportingWindow,
        area: Option<AreaCode>,
    ) -> Result<Vec<ServiceRequest>, RepositoryError>;
    fn with_status(&self, statuses: &[RequestStatus])
        -> Result<Vec<ServiceRequest>, RepositoryError>;
    fn with_category(&self, category: ServiceCategory)
        -> Result<Vec<ServiceRequest>, RepositoryError>;
    fn area_mismatches(&self) -> Result<Vec<ServiceRequest>, RepositoryError>;
}

pub trait InspectionQueries: Send + Sync {
    /// Inspections opened inside the window, optionally restricted to an
    /// area name exactly as the inspection system writes it.
    fn opened_in(
        &self,
        window: &ReportingWindow,
        area_name: Option<&str>,
    ) -> Result<Vec<InspectionRecord>, RepositoryError>;
    fn with_status(&self, status: InspectionStatus)
        -> Result<Vec<InspectionRecord>, RepositoryError>;
}

/// Result of a save-or-update on an indicator slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

pub trait SnapshotRepository: Send + Sync {
    fn insert(&self, snapshot: IndicatorSnapshot) -> Result<StoredSnapshot, RepositoryError>;
    /// Overwrite the snapshot stored for the same (kind, window, scope), or
    /// create it. Atomic per slot.
    fn upsert(
        &self,
        snapshot: IndicatorSnapshot,
    ) -> Result<(StoredSnapshot, UpsertOutcome), RepositoryError>;
    fn list(
        &self,
        kind: IndicatorKind,
        scope: Option<AreaCode>,
    ) -> Result<Vec<StoredSnapshot>, RepositoryError>;
}

/// Aggregate of every store the compliance workflow touches.
pub trait ComplianceStore: Send + Sync {
    type Requests: RecordStore<ServiceRequest> + RequestQueries;
    type Inspections: RecordStore<InspectionRecord> + InspectionQueries;
    type Violations: RecordStore<ViolationRecord>;
    type Snapshots: SnapshotRepository;

    fn requests(&self) -> &Self::Requests;
    fn inspections(&self) -> &Self::Inspections;
    fn violations(&self) -> &Self::Violations;
    fn snapshots(&self) -> &Self::Snapshots;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("store did not respond within {0:?}")]
    Timeout(Duration),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
