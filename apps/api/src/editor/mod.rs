// Editor sessions: one auto-save session per open editor tab, owned by the
// application state and addressed by a session id. Tabs that disappear without
// closing their session are flushed and dropped by the idle sweeper.

pub mod autosave;
pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::cv::FieldEdit;
use crate::store::CvStore;

pub use autosave::{AutosaveSession, FailedSave, FlushReport};

/// Lower bound on how often the sweeper looks for idle sessions.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// What the editor shows next to its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub pending: Vec<&'static str>,
    pub failed: Vec<FailedSave>,
}

struct TrackedSession {
    session: AutosaveSession,
    last_active: Instant,
    closed: bool,
}

impl TrackedSession {
    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            pending: self.session.pending_fields(),
            failed: self.session.failed_fields(),
        }
    }
}

type SharedSession = Arc<Mutex<TrackedSession>>;

pub struct EditorSessions {
    store: Arc<dyn CvStore>,
    debounce: Duration,
    // The map lock is only held for lookups; saves run under the session's own lock.
    sessions: Mutex<HashMap<Uuid, SharedSession>>,
}

impl EditorSessions {
    pub fn new(store: Arc<dyn CvStore>, debounce: Duration) -> Self {
        Self {
            store,
            debounce,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Opens a session for an existing CV and returns its id.
    pub async fn open(&self, cv_id: Uuid) -> Result<Uuid, AppError> {
        let doc = self.store.get_cv(cv_id).await?;
        if doc.is_archived() {
            return Err(AppError::Conflict(format!(
                "CV {cv_id} is archived; restore it before editing"
            )));
        }

        let session_id = Uuid::new_v4();
        let tracked = TrackedSession {
            session: AutosaveSession::new(cv_id, Arc::clone(&self.store), self.debounce),
            last_active: Instant::now(),
            closed: false,
        };
        self.sessions
            .lock()
            .await
            .insert(session_id, Arc::new(Mutex::new(tracked)));
        info!(%session_id, %cv_id, "editor session opened");
        Ok(session_id)
    }

    async fn lookup(&self, session_id: Uuid) -> Result<SharedSession, AppError> {
        self.sessions
            .lock()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| session_not_found(session_id))
    }

    /// Queues an edit and returns the session's save state.
    pub async fn schedule(
        &self,
        session_id: Uuid,
        edit: FieldEdit,
    ) -> Result<SessionSnapshot, AppError> {
        let shared = self.lookup(session_id).await?;
        let mut tracked = shared.lock().await;
        if tracked.closed {
            return Err(session_not_found(session_id));
        }
        tracked.touch();
        tracked.session.schedule(edit).map_err(AppError::Validation)?;
        Ok(tracked.snapshot())
    }

    /// Pending and failed fields. Polling counts as activity.
    pub async fn status(&self, session_id: Uuid) -> Result<SessionSnapshot, AppError> {
        let shared = self.lookup(session_id).await?;
        let mut tracked = shared.lock().await;
        if tracked.closed {
            return Err(session_not_found(session_id));
        }
        tracked.touch();
        Ok(tracked.snapshot())
    }

    pub async fn flush(&self, session_id: Uuid) -> Result<FlushReport, AppError> {
        let shared = self.lookup(session_id).await?;
        let mut tracked = shared.lock().await;
        if tracked.closed {
            return Err(session_not_found(session_id));
        }
        tracked.touch();
        Ok(tracked.session.flush().await)
    }

    /// Flushes pending saves, then discards the session.
    pub async fn close(&self, session_id: Uuid) -> Result<FlushReport, AppError> {
        let shared = self
            .sessions
            .lock()
            .await
            .remove(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;

        let mut tracked = shared.lock().await;
        tracked.closed = true;
        let report = tracked.session.flush().await;
        info!(
            %session_id,
            cv_id = %tracked.session.cv_id(),
            saved = report.saved.len(),
            failed = report.failed.len(),
            "editor session closed"
        );
        Ok(report)
    }

    /// Flushes and drops every session idle for at least `ttl`. Returns how many
    /// were evicted. Sessions busy with a request are skipped.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let candidates: Vec<(Uuid, SharedSession)> = self
            .sessions
            .lock()
            .await
            .iter()
            .map(|(id, shared)| (*id, Arc::clone(shared)))
            .collect();

        let mut evicted = 0;
        for (session_id, shared) in candidates {
            let Ok(mut tracked) = shared.try_lock() else {
                continue;
            };
            if tracked.closed || tracked.last_active.elapsed() < ttl {
                continue;
            }

            self.sessions.lock().await.remove(&session_id);
            tracked.closed = true;
            let report = tracked.session.flush().await;
            evicted += 1;

            if report.failed.is_empty() {
                info!(
                    %session_id,
                    cv_id = %tracked.session.cv_id(),
                    saved = report.saved.len(),
                    "idle editor session evicted"
                );
            } else {
                warn!(
                    %session_id,
                    cv_id = %tracked.session.cv_id(),
                    failed = report.failed.len(),
                    "idle editor session evicted with unsaved fields"
                );
            }
        }
        evicted
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Spawns the background task that evicts sessions idle for longer than `ttl`.
///
/// The task runs for the lifetime of the process; abort the returned handle to
/// stop it early.
pub fn start_idle_sweeper(sessions: Arc<EditorSessions>, ttl: Duration) -> JoinHandle<()> {
    let period = (ttl / 4).max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = sessions.evict_idle(ttl).await;
            debug!(evicted, "editor session sweep");
        }
    })
}

fn session_not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Editor session {session_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cv::CvDocument;
    use crate::store::MemoryStore;

    async fn store_with_cv() -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let doc = store
            .create_cv(CvDocument::new(Uuid::new_v4(), "CV".to_string()))
            .await
            .unwrap();
        (store, doc.id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_pending_edits() {
        let (store, cv_id) = store_with_cv().await;
        let sessions = EditorSessions::new(store.clone(), Duration::from_secs(5));

        let sid = sessions.open(cv_id).await.unwrap();
        let snapshot = sessions
            .schedule(sid, FieldEdit::Tagline(Some("Pragmatic".to_string())))
            .await
            .unwrap();
        assert_eq!(snapshot.pending, vec!["tagline"]);

        let report = sessions.close(sid).await.unwrap();
        assert_eq!(report.saved, vec!["tagline"]);
        assert_eq!(sessions.active_count().await, 0);

        let saved = store.get_cv(cv_id).await.unwrap();
        assert_eq!(saved.content.tagline.as_deref(), Some("Pragmatic"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let sessions = EditorSessions::new(Arc::new(MemoryStore::new()), Duration::from_millis(10));
        let result = sessions.flush(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_archived_cv_cannot_be_opened() {
        let (store, cv_id) = store_with_cv().await;
        store.set_archived(cv_id, true).await.unwrap();

        let sessions = EditorSessions::new(store, Duration::from_millis(10));
        assert!(matches!(sessions.open(cv_id).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_sessions_are_swept_and_saved() {
        let (store, cv_id) = store_with_cv().await;
        // Debounce longer than the TTL: only the eviction flush can save the edit in time.
        let sessions = Arc::new(EditorSessions::new(store.clone(), Duration::from_secs(3600)));

        let mut ids = Vec::new();
        for _ in 0..100 {
            ids.push(sessions.open(cv_id).await.unwrap());
        }
        sessions
            .schedule(ids[0], FieldEdit::ProfileSummary(Some("Unsaved".to_string())))
            .await
            .unwrap();

        let sweeper = start_idle_sweeper(Arc::clone(&sessions), Duration::from_secs(1800));
        tokio::time::sleep(Duration::from_secs(2700)).await;

        assert_eq!(sessions.active_count().await, 0);
        let saved = store.get_cv(cv_id).await.unwrap();
        assert_eq!(saved.content.profile_summary.as_deref(), Some("Unsaved"));

        tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        sweeper.abort();
        assert_eq!(sessions.active_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_activity_keeps_session_alive() {
        let (store, cv_id) = store_with_cv().await;
        let sessions = EditorSessions::new(store, Duration::from_millis(10));
        let ttl = Duration::from_secs(60);

        let busy = sessions.open(cv_id).await.unwrap();
        let idle = sessions.open(cv_id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(40)).await;
        sessions.status(busy).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(sessions.evict_idle(ttl).await, 1);
        assert!(sessions.status(busy).await.is_ok());
        assert!(matches!(sessions.status(idle).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_does_not_block_other_sessions() {
        let (store, cv_id) = store_with_cv().await;
        let sessions = Arc::new(EditorSessions::new(store, Duration::from_secs(5)));
        let first = sessions.open(cv_id).await.unwrap();
        let second = sessions.open(cv_id).await.unwrap();

        // Hold the first session's lock as an in-progress flush would.
        let shared = sessions.lookup(first).await.unwrap();
        let held = shared.lock().await;

        let snapshot = tokio::time::timeout(
            Duration::from_secs(1),
            sessions.schedule(second, FieldEdit::Tagline(Some("Quick".to_string()))),
        )
        .await
        .expect("second session must not wait on the first")
        .unwrap();
        assert_eq!(snapshot.pending, vec!["tagline"]);
        assert_eq!(sessions.active_count().await, 2);

        drop(held);
    }
}
