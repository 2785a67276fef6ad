// src/editing/table.rs
//! Optimistic edit reconciliation for one table of records.
//!
//! An edit is written to the local rows immediately and then sent to the
//! remote store as a single-field update. Each cell carries a revision
//! counter and the last value the store confirmed. A failed request only
//! rolls the cell back when no later edit or refresh has touched it since;
//! otherwise the failure is stale and the newer local value stands.
//! Requests for the same cell go out one at a time, in edit order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::cell::{CellKey, EditableCell};
use super::notice::{Notice, Notifier};
use crate::api::{RemoteStore, Resource};
use crate::error::AppError;
use crate::models::{EditableRecord, FieldValue};

pub const DEFAULT_SAVED_FLAG: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The store accepted the change.
    Saved,
    /// The store refused and the cell was restored to its last confirmed value.
    RolledBack,
    /// The store refused, but a later edit or refresh already replaced the
    /// value, so nothing was restored.
    Superseded,
    /// The value already matched; no request was sent.
    Unchanged,
    /// The record is not in this table.
    Missing,
}

#[derive(Debug)]
struct CellTrack {
    revision: u64,
    confirmed: FieldValue,
    in_flight: usize,
    request_lock: Arc<tokio::sync::Mutex<()>>,
}

impl CellTrack {
    fn new(confirmed: FieldValue) -> Self {
        Self {
            revision: 0,
            confirmed,
            in_flight: 0,
            request_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

#[derive(Debug, Default)]
struct TableState {
    records: Vec<EditableRecord>,
    active: Option<(CellKey, EditableCell)>,
    cells: HashMap<CellKey, CellTrack>,
    saved: HashMap<i64, u64>,
    saved_generation: u64,
    epoch: u64,
}

impl TableState {
    fn value(&self, key: &CellKey) -> Option<FieldValue> {
        self.records
            .iter()
            .find(|r| r.id == key.id)
            .map(|r| r.get(&key.field).cloned().unwrap_or(FieldValue::Null))
    }

    fn set_value(&mut self, key: &CellKey, value: FieldValue) -> bool {
        match self.records.iter_mut().find(|r| r.id == key.id) {
            Some(record) => {
                record.set(&key.field, value);
                true
            }
            None => false,
        }
    }
}

/// Local half of an edit, taken synchronously so the new value shows at once.
#[derive(Debug)]
struct PendingEdit {
    key: CellKey,
    value: FieldValue,
    revision: u64,
    epoch: u64,
    request_lock: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Clone)]
pub struct EditableTable {
    resource: Resource,
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    saved_flag: Duration,
    state: Arc<Mutex<TableState>>,
}

impl std::fmt::Debug for EditableTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditableTable")
            .field("resource", &self.resource)
            .field("saved_flag", &self.saved_flag)
            .finish_non_exhaustive()
    }
}

fn lock(state: &Mutex<TableState>) -> MutexGuard<'_, TableState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EditableTable {
    pub fn new(resource: Resource, store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            resource,
            store,
            notifier,
            saved_flag: DEFAULT_SAVED_FLAG,
            state: Arc::new(Mutex::new(TableState::default())),
        }
    }

    pub fn with_saved_flag(mut self, duration: Duration) -> Self {
        self.saved_flag = duration;
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    // ==================== Collection ====================

    /// Replaces every row, as a (re)load does. Responses to requests sent
    /// before the swap no longer roll anything back.
    pub fn replace_records(&self, records: Vec<EditableRecord>) {
        let mut guard = lock(&self.state);
        let st = &mut *guard;
        st.records = records;
        st.epoch += 1;
        st.active = None;

        let records = &st.records;
        st.cells.retain(|key, track| {
            if track.in_flight == 0 {
                return false;
            }
            track.confirmed = records
                .iter()
                .find(|r| r.id == key.id)
                .and_then(|r| r.get(&key.field).cloned())
                .unwrap_or(FieldValue::Null);
            true
        });
    }

    pub fn records(&self) -> Vec<EditableRecord> {
        lock(&self.state).records.clone()
    }

    pub fn record(&self, id: i64) -> Option<EditableRecord> {
        lock(&self.state).records.iter().find(|r| r.id == id).cloned()
    }

    pub fn value(&self, id: i64, field: &str) -> Option<FieldValue> {
        lock(&self.state).value(&CellKey::new(id, field))
    }

    pub fn len(&self) -> usize {
        lock(&self.state).records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove(&self, id: i64) -> bool {
        self.retain(|r| r.id != id) > 0
    }

    /// Keeps rows matching `keep`; returns how many were dropped.
    pub fn retain(&self, keep: impl Fn(&EditableRecord) -> bool) -> usize {
        let mut st = lock(&self.state);
        let before = st.records.len();
        st.records.retain(|r| keep(r));
        if st.active.as_ref().is_some_and(|(key, _)| !st.records.iter().any(|r| r.id == key.id)) {
            st.active = None;
        }
        before - st.records.len()
    }

    pub fn is_recently_saved(&self, id: i64) -> bool {
        lock(&self.state).saved.contains_key(&id)
    }

    // ==================== Edit mode ====================

    /// The cell currently in edit mode, if any.
    pub fn editing(&self) -> Option<CellKey> {
        lock(&self.state).active.as_ref().map(|(key, _)| key.clone())
    }

    pub fn draft(&self) -> Option<FieldValue> {
        lock(&self.state)
            .active
            .as_ref()
            .and_then(|(_, cell)| cell.draft().cloned())
    }

    /// Puts one cell into edit mode. Another cell that was editing loses
    /// focus first, which commits it; the returned handle is that save.
    pub fn activate(&self, id: i64, field: &str) -> Result<Option<JoinHandle<EditOutcome>>, AppError> {
        let key = CellKey::new(id, field);
        let mut st = lock(&self.state);
        let current = st
            .value(&key)
            .ok_or_else(|| AppError::not_found(format!("{} {id} not found", self.resource.label())))?;

        if st.active.as_ref().is_some_and(|(k, _)| *k == key) {
            return Ok(None);
        }

        let previous = st.active.take().and_then(|(k, mut cell)| cell.blur().map(|v| (k, v)));
        let mut cell = EditableCell::new();
        cell.activate(&current);
        st.active = Some((key, cell));

        let pending = previous.and_then(|(k, v)| self.begin(&mut st, k, v).ok());
        drop(st);
        Ok(pending.map(|p| self.spawn_finish(p)))
    }

    pub fn input(&self, value: impl Into<FieldValue>) {
        if let Some((_, cell)) = lock(&self.state).active.as_mut() {
            cell.input(value.into());
        }
    }

    /// Focus left the cell.
    pub fn blur(&self) -> Option<JoinHandle<EditOutcome>> {
        self.commit_active(|cell| cell.blur())
    }

    /// Confirm key pressed.
    pub fn confirm(&self) -> Option<JoinHandle<EditOutcome>> {
        self.commit_active(|cell| cell.confirm())
    }

    /// Cancel key pressed; the cell shows its previous value again.
    pub fn cancel(&self) {
        if let Some((_, mut cell)) = lock(&self.state).active.take() {
            cell.cancel();
        }
    }

    fn commit_active(
        &self,
        exit: impl FnOnce(&mut EditableCell) -> Option<FieldValue>,
    ) -> Option<JoinHandle<EditOutcome>> {
        let mut st = lock(&self.state);
        let (key, mut cell) = st.active.take()?;
        let value = exit(&mut cell)?;
        let pending = self.begin(&mut st, key, value).ok()?;
        drop(st);
        Some(self.spawn_finish(pending))
    }

    fn spawn_finish(&self, pending: PendingEdit) -> JoinHandle<EditOutcome> {
        let table = self.clone();
        tokio::spawn(async move { table.finish(pending).await })
    }

    // ==================== Reconciler ====================

    /// Writes `value` locally, sends it to the store and reconciles the
    /// answer. Failures are reported through the notifier, never returned.
    #[instrument(skip(self, value), fields(resource = self.resource.path()))]
    pub async fn apply_edit(&self, id: i64, field: &str, value: FieldValue) -> EditOutcome {
        let pending = {
            let mut st = lock(&self.state);
            match self.begin(&mut st, CellKey::new(id, field), value) {
                Ok(p) => p,
                Err(outcome) => return outcome,
            }
        };
        self.finish(pending).await
    }

    fn begin(&self, st: &mut TableState, key: CellKey, value: FieldValue) -> Result<PendingEdit, EditOutcome> {
        let current = st.value(&key).ok_or(EditOutcome::Missing)?;
        if current.loosely_eq(&value) {
            return Err(EditOutcome::Unchanged);
        }
        st.set_value(&key, value.clone());

        let epoch = st.epoch;
        let track = st
            .cells
            .entry(key.clone())
            .or_insert_with(|| CellTrack::new(current.clone()));
        if track.in_flight == 0 {
            track.confirmed = current;
        }
        track.revision += 1;
        track.in_flight += 1;

        Ok(PendingEdit {
            key,
            value,
            revision: track.revision,
            epoch,
            request_lock: Arc::clone(&track.request_lock),
        })
    }

    async fn finish(&self, pending: PendingEdit) -> EditOutcome {
        let PendingEdit { key, value, revision, epoch, request_lock } = pending;

        // one request per cell at a time, held until reconciled
        let _turn = request_lock.lock().await;
        let result = self
            .store
            .partial_update(self.resource, key.id, &key.field, &value)
            .await;

        let mut guard = lock(&self.state);
        let st = &mut *guard;
        let current_epoch = st.epoch == epoch;
        let latest = match st.cells.get_mut(&key) {
            Some(track) => {
                track.in_flight = track.in_flight.saturating_sub(1);
                if result.is_ok() && current_epoch {
                    track.confirmed = value.clone();
                }
                (track.revision == revision).then(|| track.confirmed.clone())
            }
            None => None,
        };

        match result {
            Ok(_) => {
                debug!(id = key.id, field = %key.field, "Saved");
                if st.records.iter().any(|r| r.id == key.id) {
                    self.mark_saved(st, key.id);
                }
                EditOutcome::Saved
            }
            Err(e) => {
                warn!(error = %e, id = key.id, field = %key.field, "Update failed");
                self.notifier.notify(Notice::UpdateFailed);
                match latest {
                    Some(confirmed) if current_epoch => {
                        if st.set_value(&key, confirmed) {
                            EditOutcome::RolledBack
                        } else {
                            EditOutcome::Superseded
                        }
                    }
                    _ => EditOutcome::Superseded,
                }
            }
        }
    }

    fn mark_saved(&self, st: &mut TableState, id: i64) {
        st.saved_generation += 1;
        let generation = st.saved_generation;
        st.saved.insert(id, generation);

        let state = Arc::clone(&self.state);
        let clear_at = Instant::now() + self.saved_flag;
        tokio::spawn(async move {
            tokio::time::sleep_until(clear_at).await;
            let mut st = lock(&state);
            // a newer save re-armed the flag
            if st.saved.get(&id) == Some(&generation) {
                st.saved.remove(&id);
            }
        });
    }
}
