use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use super::{
    ChangeSet, ComplianceStore, InspectionQueries, KeyedRecord, RecordStore, RepositoryError,
    RequestQueries, SnapshotRepository, UpsertOutcome,
};
use crate::domain::{
    next_record_id, AreaCode, IndicatorKind, IndicatorSnapshot, InspectionRecord,
    InspectionStatus, RecordId, ReportingWindow, RequestStatus, ServiceCategory, ServiceRequest,
    StoredSnapshot, ViolationRecord,
};

const LOCK_POLL: Duration = Duration::from_millis(1);

struct TableState<R> {
    rows: BTreeMap<RecordId, R>,
    keys: HashMap<String, RecordId>,
}

impl<R: KeyedRecord> TableState<R> {
    fn put(&mut self, record: R) {
        self.keys
            .insert(record.business_key().to_string(), record.id());
        self.rows.insert(record.id(), record);
    }
}

/// Mutex-guarded table keyed by surrogate id with a business-key index.
pub struct MemoryTable<R> {
    state: Mutex<TableState<R>>,
}

impl<R> Default for MemoryTable<R> {
    fn default() -> Self {
        Self {
            state: Mutex::new(TableState {
                rows: BTreeMap::new(),
                keys: HashMap::new(),
            }),
        }
    }
}

impl<R: KeyedRecord> MemoryTable<R> {
    fn lock(&self) -> Result<MutexGuard<'_, TableState<R>>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("record table lock poisoned".to_string()))
    }

    fn lock_within(
        &self,
        timeout: Duration,
    ) -> Result<MutexGuard<'_, TableState<R>>, RepositoryError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.state.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(_)) => {
                    return Err(RepositoryError::Unavailable(
                        "record table lock poisoned".to_string(),
                    ))
                }
                Err(TryLockError::WouldBlock) if Instant::now() >= deadline => {
                    return Err(RepositoryError::Timeout(timeout))
                }
                Err(TryLockError::WouldBlock) => thread::sleep(LOCK_POLL),
            }
        }
    }

    /// Every stored row ordered by id.
    pub fn all(&self) -> Result<Vec<R>, RepositoryError> {
        self.matching(|_| true)
    }

    fn matching(&self, predicate: impl Fn(&R) -> bool) -> Result<Vec<R>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .rows
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect())
    }
}

impl<R: KeyedRecord> RecordStore<R> for MemoryTable<R> {
    fn fetch(&self, id: RecordId) -> Result<Option<R>, RepositoryError> {
        Ok(self.lock()?.rows.get(&id).cloned())
    }

    fn fetch_by_key(&self, key: &str) -> Result<Option<R>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .keys
            .get(key)
            .and_then(|id| guard.rows.get(id))
            .cloned())
    }

    fn fetch_by_keys(
        &self,
        keys: &[String],
        timeout: Duration,
    ) -> Result<Vec<R>, RepositoryError> {
        let guard = self.lock_within(timeout)?;
        Ok(keys
            .iter()
            .filter_map(|key| guard.keys.get(key))
            .filter_map(|id| guard.rows.get(id))
            .cloned()
            .collect())
    }

    fn insert(&self, record: R) -> Result<R, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.keys.contains_key(record.business_key()) || guard.rows.contains_key(&record.id())
        {
            return Err(RepositoryError::Conflict(record.business_key().to_string()));
        }
        guard.put(record.clone());
        Ok(record)
    }

    fn update(&self, record: R) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if !guard.rows.contains_key(&record.id()) {
            return Err(RepositoryError::NotFound);
        }
        guard.put(record);
        Ok(())
    }

    fn apply(&self, changes: ChangeSet<R>, timeout: Duration) -> Result<(), RepositoryError> {
        let mut guard = self.lock_within(timeout)?;

        let mut staged_keys = HashSet::new();
        for record in &changes.inserts {
            let key = record.business_key();
            if guard.keys.contains_key(key)
                || guard.rows.contains_key(&record.id())
                || !staged_keys.insert(key)
            {
                return Err(RepositoryError::Conflict(key.to_string()));
            }
        }
        for record in &changes.updates {
            match guard.keys.get(record.business_key()) {
                Some(id) if *id == record.id() => {}
                Some(_) => return Err(RepositoryError::Conflict(record.business_key().to_string())),
                None => return Err(RepositoryError::NotFound),
            }
        }

        for record in changes.inserts.into_iter().chain(changes.updates) {
            guard.put(record);
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.rows.len())
    }
}

impl RequestQueries for MemoryTable<ServiceRequest> {
    fn created_in(
        &self,
        window: &ReportingWindow,
        area: Option<AreaCode>,
    ) -> Result<Vec<ServiceRequest>, RepositoryError> {
        self.matching(|request| {
            window.contains(request.created_at) && area.map_or(true, |code| request.area == code)
        })
    }

    fn with_status(
        &self,
        statuses: &[RequestStatus],
    ) -> Result<Vec<ServiceRequest>, RepositoryError> {
        self.matching(|request| statuses.contains(&request.status))
    }

    fn with_category(
        &self,
        category: ServiceCategory,
    ) -> Result<Vec<ServiceRequest>, RepositoryError> {
        self.matching(|request| request.category == category)
    }

    fn area_mismatches(&self) -> Result<Vec<ServiceRequest>, RepositoryError> {
        self.matching(|request| request.area_mismatch)
    }
}

impl InspectionQueries for MemoryTable<InspectionRecord> {
    fn opened_in(
        &self,
        window: &ReportingWindow,
        area_name: Option<&str>,
    ) -> Result<Vec<InspectionRecord>, RepositoryError> {
        self.matching(|inspection| {
            window.contains(inspection.opened_at)
                && area_name.map_or(true, |name| inspection.area_name == name)
        })
    }

    fn with_status(
        &self,
        status: InspectionStatus,
    ) -> Result<Vec<InspectionRecord>, RepositoryError> {
        self.matching(|inspection| inspection.status == status)
    }
}

#[derive(Default)]
pub struct MemorySnapshots {
    rows: Mutex<Vec<StoredSnapshot>>,
}

impl MemorySnapshots {
    fn lock(&self) -> Result<MutexGuard<'_, Vec<StoredSnapshot>>, RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("snapshot lock poisoned".to_string()))
    }
}

impl SnapshotRepository for MemorySnapshots {
    fn insert(&self, snapshot: IndicatorSnapshot) -> Result<StoredSnapshot, RepositoryError> {
        let stored = StoredSnapshot {
            id: next_record_id(),
            snapshot,
        };
        self.lock()?.push(stored.clone());
        Ok(stored)
    }

    fn upsert(
        &self,
        snapshot: IndicatorSnapshot,
    ) -> Result<(StoredSnapshot, UpsertOutcome), RepositoryError> {
        let mut guard = self.lock()?;
        if let Some(existing) = guard
            .iter_mut()
            .find(|stored| stored.snapshot.same_slot(&snapshot))
        {
            existing.snapshot = snapshot;
            return Ok((existing.clone(), UpsertOutcome::Updated));
        }

        let stored = StoredSnapshot {
            id: next_record_id(),
            snapshot,
        };
        guard.push(stored.clone());
        Ok((stored, UpsertOutcome::Created))
    }

    fn list(
        &self,
        kind: IndicatorKind,
        scope: Option<AreaCode>,
    ) -> Result<Vec<StoredSnapshot>, RepositoryError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|stored| stored.snapshot.kind == kind && stored.snapshot.scope == scope)
            .cloned()
            .collect())
    }
}

/// In-process store backing the API service and the test suites.
#[derive(Default)]
pub struct MemoryStore {
    pub requests: MemoryTable<ServiceRequest>,
    pub inspections: MemoryTable<InspectionRecord>,
    pub violations: MemoryTable<ViolationRecord>,
    pub snapshots: MemorySnapshots,
}

impl ComplianceStore for MemoryStore {
    type Requests = MemoryTable<ServiceRequest>;
    type Inspections = MemoryTable<InspectionRecord>;
    type Violations = MemoryTable<ViolationRecord>;
    type Snapshots = MemorySnapshots;

    fn requests(&self) -> &Self::Requests {
        &self.requests
    }

    fn inspections(&self) -> &Self::Inspections {
        &self.inspections
    }

    fn violations(&self) -> &Self::Violations {
        &self.violations
    }

    fn snapshots(&self) -> &Self::Snapshots {
        &self.snapshots
    }
}
