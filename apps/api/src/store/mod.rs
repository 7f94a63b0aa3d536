// Persistence boundary. Handlers only ever see `dyn CvStore`; the backend is
// picked at startup (`STORE_BACKEND`).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::cv::{CvDocument, DisplaySettings, FieldEdit};
use crate::models::profile::{Profile, ProfileItem};
use crate::models::selection::{Selection, SelectionIndex};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn cv_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound(format!("CV {id}"))
}

#[async_trait]
pub trait CvStore: Send + Sync {
    // CV documents
    async fn create_cv(&self, doc: CvDocument) -> Result<CvDocument, StoreError>;
    async fn get_cv(&self, id: Uuid) -> Result<CvDocument, StoreError>;
    async fn list_cvs(
        &self,
        user_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<CvDocument>, StoreError>;
    /// Applies one field group atomically. Other groups are left as stored.
    async fn apply_edit(&self, id: Uuid, edit: FieldEdit) -> Result<CvDocument, StoreError>;
    /// Sets or clears `archived_at`.
    async fn set_archived(&self, id: Uuid, archived: bool) -> Result<CvDocument, StoreError>;
    /// Removes the CV together with its selections.
    async fn delete_cv(&self, id: Uuid) -> Result<(), StoreError>;

    // Profile library
    async fn list_profile(&self, user_id: Uuid) -> Result<Vec<ProfileItem>, StoreError>;
    async fn upsert_profile_item(&self, item: ProfileItem) -> Result<ProfileItem, StoreError>;
    /// Removes the item and every selection that references it.
    async fn delete_profile_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), StoreError>;

    // Per-CV selections
    async fn list_selections(&self, cv_id: Uuid) -> Result<Vec<Selection>, StoreError>;
    async fn upsert_selections(
        &self,
        cv_id: Uuid,
        selections: Vec<Selection>,
    ) -> Result<Vec<Selection>, StoreError>;

    async fn update_display_settings(
        &self,
        id: Uuid,
        settings: DisplaySettings,
    ) -> Result<CvDocument, StoreError> {
        self.apply_edit(id, FieldEdit::DisplaySettings(settings))
            .await
    }
}

/// Everything the layout pipeline needs for one CV.
#[derive(Debug, Clone)]
pub struct CvBundle {
    pub doc: CvDocument,
    pub profile: Profile,
    pub selections: SelectionIndex,
}

/// Loads a CV, its owner's profile and the CV's selections.
pub async fn load_bundle(store: &dyn CvStore, cv_id: Uuid) -> Result<CvBundle, StoreError> {
    let doc = store.get_cv(cv_id).await?;
    let items = store.list_profile(doc.user_id).await?;
    let selections = store.list_selections(cv_id).await?;

    Ok(CvBundle {
        doc,
        profile: Profile::from_items(items),
        selections: SelectionIndex::new(selections),
    })
}
