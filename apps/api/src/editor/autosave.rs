//! Debounced per-field auto-save for one editor session.
//!
//! Each field group (`FieldEdit::key`) owns at most one scheduled save. Scheduling
//! the same key again cancels the earlier save, so the last edit wins; different
//! keys never interfere. Dropping the session aborts everything still pending.
//! A save that fails in the background stays reported until that field saves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::cv::FieldEdit;
use crate::store::{CvStore, StoreError};

struct PendingSave {
    handle: JoinHandle<Result<(), StoreError>>,
    flush: oneshot::Sender<()>,
}

/// Outcome of forcing pending saves through.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub saved: Vec<&'static str>,
    pub failed: Vec<FailedSave>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSave {
    pub field: &'static str,
    pub message: String,
}

type FailureLog = Arc<Mutex<HashMap<&'static str, String>>>;

pub struct AutosaveSession {
    cv_id: Uuid,
    store: Arc<dyn CvStore>,
    debounce: Duration,
    pending: HashMap<&'static str, PendingSave>,
    failures: FailureLog,
}

impl AutosaveSession {
    pub fn new(cv_id: Uuid, store: Arc<dyn CvStore>, debounce: Duration) -> Self {
        Self {
            cv_id,
            store,
            debounce,
            pending: HashMap::new(),
            failures: FailureLog::default(),
        }
    }

    pub fn cv_id(&self) -> Uuid {
        self.cv_id
    }

    /// Queues `edit` to be written after the debounce window.
    ///
    /// Returns the key the edit was queued under. Invalid edits are rejected
    /// up front and never scheduled.
    pub fn schedule(&mut self, edit: FieldEdit) -> Result<&'static str, String> {
        edit.validate()?;
        let key = edit.key();

        self.pending.retain(|_, save| !save.handle.is_finished());
        if let Some(previous) = self.pending.remove(key) {
            previous.handle.abort();
            debug!(cv_id = %self.cv_id, field = key, "superseded pending save");
        }

        let (flush_tx, flush_rx) = oneshot::channel();
        let store = Arc::clone(&self.store);
        let cv_id = self.cv_id;
        let debounce = self.debounce;
        let failures = Arc::clone(&self.failures);

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => {}
                _ = flush_rx => {}
            }
            let result = store.apply_edit(cv_id, edit).await;
            let mut log = failures.lock().unwrap_or_else(PoisonError::into_inner);
            match result {
                Ok(_) => {
                    log.remove(key);
                    debug!(%cv_id, field = key, "auto-saved");
                    Ok(())
                }
                Err(e) => {
                    log.insert(key, e.to_string());
                    warn!(%cv_id, field = key, "auto-save failed: {e}");
                    Err(e)
                }
            }
        });

        self.pending.insert(
            key,
            PendingSave {
                handle,
                flush: flush_tx,
            },
        );
        Ok(key)
    }

    /// Field keys with a save that has not completed yet, sorted.
    pub fn pending_fields(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = self
            .pending
            .iter()
            .filter(|(_, save)| !save.handle.is_finished())
            .map(|(key, _)| *key)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Fields whose most recent save attempt failed, sorted.
    pub fn failed_fields(&self) -> Vec<FailedSave> {
        let log = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let mut failed: Vec<FailedSave> = log
            .iter()
            .map(|(field, message)| FailedSave {
                field: *field,
                message: message.clone(),
            })
            .collect();
        failed.sort_by_key(|f| f.field);
        failed
    }

    /// Runs every pending save now and waits for all of them.
    pub async fn flush(&mut self) -> FlushReport {
        let mut drained: Vec<(&'static str, PendingSave)> = self.pending.drain().collect();
        drained.sort_by_key(|(key, _)| *key);

        // Release every timer first so the saves run concurrently.
        let handles: Vec<(&'static str, JoinHandle<Result<(), StoreError>>)> = drained
            .into_iter()
            .map(|(key, save)| {
                let _ = save.flush.send(());
                (key, save.handle)
            })
            .collect();

        let mut report = FlushReport::default();
        for (field, handle) in handles {
            match handle.await {
                Ok(Ok(())) => report.saved.push(field),
                Ok(Err(e)) => report.failed.push(FailedSave {
                    field,
                    message: e.to_string(),
                }),
                Err(e) => report.failed.push(FailedSave {
                    field,
                    message: format!("save task did not complete: {e}"),
                }),
            }
        }
        report
    }
}

impl Drop for AutosaveSession {
    fn drop(&mut self) {
        for (_, save) in self.pending.drain() {
            save.handle.abort();
        }
    }
}
