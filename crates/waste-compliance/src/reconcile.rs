//! Idempotent insert/merge/skip of a parsed batch against the record store.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::domain::{next_record_id, RecordId};
use crate::ingest::Batch;
use crate::repository::{ChangeSet, KeyedRecord, RecordStore, RepositoryError};

/// Record type that can be created from, or merged with, an ingestion draft.
pub trait Reconcilable: KeyedRecord {
    type Draft;

    fn draft_key(draft: &Self::Draft) -> &str;
    /// Build a new record; `imported_at` stands in for a missing creation time.
    fn create(id: RecordId, draft: Self::Draft, imported_at: NaiveDateTime) -> Self;
    /// Overwrite only the fields the draft actually carries and flag the
    /// record as bulk-imported.
    fn merge(&mut self, draft: Self::Draft);
}

/// Counts reported for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped_invalid: usize,
    pub skipped_duplicate: usize,
    pub total_seen: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("could not load existing records: {0}")]
    Load(#[source] RepositoryError),
    #[error("batch commit failed, {lost} staged changes discarded: {source}")]
    Commit {
        #[source]
        source: RepositoryError,
        lost: usize,
    },
}

/// Staged changes against one store. Dropping without [`UnitOfWork::commit`]
/// discards everything staged.
struct UnitOfWork<'s, R: KeyedRecord, S: RecordStore<R> + ?Sized> {
    store: &'s S,
    timeout: Duration,
    changes: Option<ChangeSet<R>>,
}

impl<'s, R: KeyedRecord, S: RecordStore<R> + ?Sized> UnitOfWork<'s, R, S> {
    fn begin(store: &'s S, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            changes: Some(ChangeSet::default()),
        }
    }

    fn stage_insert(&mut self, record: R) {
        if let Some(changes) = self.changes.as_mut() {
            changes.inserts.push(record);
        }
    }

    fn stage_update(&mut self, record: R) {
        if let Some(changes) = self.changes.as_mut() {
            changes.updates.push(record);
        }
    }

    fn commit(mut self) -> Result<(), RepositoryError> {
        let changes = self.changes.take().unwrap_or_default();
        if changes.is_empty() {
            return Ok(());
        }
        self.store.apply(changes, self.timeout)
    }
}

impl<R: KeyedRecord, S: RecordStore<R> + ?Sized> Drop for UnitOfWork<'_, R, S> {
    fn drop(&mut self) {
        if let Some(changes) = self.changes.take() {
            if !changes.is_empty() {
                debug!(discarded = changes.len(), "unit of work rolled back");
            }
        }
    }
}

/// Reconciles batches within a bounded store wait.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    timeout: Duration,
}

impl Reconciler {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn reconcile<R, S>(
        &self,
        store: &S,
        batch: Batch<R::Draft>,
        imported_at: NaiveDateTime,
    ) -> Result<ReconcileSummary, ReconcileError>
    where
        R: Reconcilable,
        S: RecordStore<R> + ?Sized,
    {
        let mut summary = ReconcileSummary {
            total_seen: batch.len(),
            ..ReconcileSummary::default()
        };

        let keys: Vec<String> = batch
            .drafts()
            .map(|draft| R::draft_key(draft).to_string())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let mut existing: HashMap<String, R> = store
            .fetch_by_keys(&keys, self.timeout)
            .map_err(ReconcileError::Load)?
            .into_iter()
            .map(|record| (record.business_key().to_string(), record))
            .collect();

        let mut unit = UnitOfWork::begin(store, self.timeout);
        let mut seen: HashSet<String> = HashSet::new();
        let mut merged: Vec<String> = Vec::new();

        for row in batch.rows {
            let draft = match row.parsed {
                Ok(draft) => draft,
                Err(reason) => {
                    // The first occurrence claims its key even when it fails.
                    if let Some(key) = row.key {
                        if !seen.insert(key.clone()) {
                            debug!(business_key = %key, row = row.row, "duplicate key in batch");
                            summary.skipped_duplicate += 1;
                            continue;
                        }
                    }
                    warn!(row = row.row, %reason, "skipping invalid row");
                    summary.skipped_invalid += 1;
                    continue;
                }
            };

            let key = R::draft_key(&draft).to_string();
            if !seen.insert(key.clone()) {
                debug!(business_key = %key, row = row.row, "duplicate key in batch");
                summary.skipped_duplicate += 1;
                continue;
            }

            match existing.get_mut(&key) {
                Some(record) => {
                    record.merge(draft);
                    merged.push(key);
                    summary.updated += 1;
                }
                None => {
                    unit.stage_insert(R::create(next_record_id(), draft, imported_at));
                    summary.created += 1;
                }
            }
        }

        for key in merged {
            if let Some(record) = existing.remove(&key) {
                unit.stage_update(record);
            }
        }

        if let Err(source) = unit.commit() {
            let lost = summary.created + summary.updated;
            error!(%source, lost, "batch commit failed");
            return Err(ReconcileError::Commit { source, lost });
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            skipped_invalid = summary.skipped_invalid,
            skipped_duplicate = summary.skipped_duplicate,
            total_seen = summary.total_seen,
            "batch reconciled"
        );
        Ok(summary)
    }
}

/// Replace `slot` only when the incoming value is present.
pub(crate) fn overwrite<T>(slot: &mut T, incoming: Option<T>) {
    if let Some(value) = incoming {
        *slot = value;
    }
}

pub(crate) fn overwrite_opt<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}
