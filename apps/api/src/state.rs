use std::sync::Arc;
use std::time::Duration;

use crate::editor::EditorSessions;
use crate::generation::{ContentGenerator, InFlight};
use crate::pdf::PdfRenderer;
use crate::store::CvStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend, Postgres or in-memory.
    pub store: Arc<dyn CvStore>,
    pub generator: Arc<dyn ContentGenerator>,
    pub pdf: Arc<dyn PdfRenderer>,
    pub editor: Arc<EditorSessions>,
    /// Guards against duplicate concurrent generation requests.
    pub in_flight: Arc<InFlight>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CvStore>,
        generator: Arc<dyn ContentGenerator>,
        pdf: Arc<dyn PdfRenderer>,
        autosave_debounce: Duration,
    ) -> Self {
        Self {
            editor: Arc::new(EditorSessions::new(Arc::clone(&store), autosave_debounce)),
            store,
            generator,
            pdf,
            in_flight: Arc::new(InFlight::default()),
        }
    }
}
