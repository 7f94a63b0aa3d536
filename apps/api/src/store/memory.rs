use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::cv::{CvDocument, FieldEdit};
use crate::models::profile::ProfileItem;
use crate::models::selection::Selection;
use crate::store::{cv_not_found, CvStore, StoreError};

#[derive(Default)]
struct Tables {
    cvs: HashMap<Uuid, CvDocument>,
    profile: HashMap<Uuid, ProfileItem>,
    /// cv_id -> item_id -> selection
    selections: HashMap<Uuid, HashMap<Uuid, Selection>>,
}

/// Process-local store used for development and tests.
///
/// A single `RwLock` guards all tables, so every trait method is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CvStore for MemoryStore {
    async fn create_cv(&self, doc: CvDocument) -> Result<CvDocument, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.cvs.contains_key(&doc.id) {
            return Err(StoreError::Conflict(format!("CV {} already exists", doc.id)));
        }
        tables.cvs.insert(doc.id, doc.clone());
        Ok(doc)
    }

    async fn get_cv(&self, id: Uuid) -> Result<CvDocument, StoreError> {
        self.tables
            .read()
            .await
            .cvs
            .get(&id)
            .cloned()
            .ok_or_else(|| cv_not_found(id))
    }

    async fn list_cvs(
        &self,
        user_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<CvDocument>, StoreError> {
        let tables = self.tables.read().await;
        let mut cvs: Vec<CvDocument> = tables
            .cvs
            .values()
            .filter(|cv| cv.user_id == user_id && (include_archived || !cv.is_archived()))
            .cloned()
            .collect();
        cvs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(cvs)
    }

    async fn apply_edit(&self, id: Uuid, edit: FieldEdit) -> Result<CvDocument, StoreError> {
        let mut tables = self.tables.write().await;
        let doc = tables.cvs.get_mut(&id).ok_or_else(|| cv_not_found(id))?;
        edit.apply(doc);
        Ok(doc.clone())
    }

    async fn set_archived(&self, id: Uuid, archived: bool) -> Result<CvDocument, StoreError> {
        let mut tables = self.tables.write().await;
        let doc = tables.cvs.get_mut(&id).ok_or_else(|| cv_not_found(id))?;
        let now = Utc::now();
        doc.archived_at = archived.then_some(now);
        doc.updated_at = now;
        Ok(doc.clone())
    }

    async fn delete_cv(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.cvs.remove(&id).ok_or_else(|| cv_not_found(id))?;
        tables.selections.remove(&id);
        Ok(())
    }

    async fn list_profile(&self, user_id: Uuid) -> Result<Vec<ProfileItem>, StoreError> {
        let tables = self.tables.read().await;
        let mut items: Vec<ProfileItem> = tables
            .profile
            .values()
            .filter(|item| item.user_id() == user_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.kind(), item.display_order(), item.id()));
        Ok(items)
    }

    async fn upsert_profile_item(&self, item: ProfileItem) -> Result<ProfileItem, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.profile.get(&item.id()) {
            if existing.user_id() != item.user_id() {
                return Err(StoreError::Conflict(format!(
                    "profile item {} belongs to another user",
                    item.id()
                )));
            }
        }
        tables.profile.insert(item.id(), item.clone());
        Ok(item)
    }

    async fn delete_profile_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match tables.profile.get(&item_id) {
            Some(item) if item.user_id() == user_id => {}
            _ => return Err(StoreError::NotFound(format!("profile item {item_id}"))),
        }
        tables.profile.remove(&item_id);
        for per_cv in tables.selections.values_mut() {
            per_cv.remove(&item_id);
        }
        Ok(())
    }

    async fn list_selections(&self, cv_id: Uuid) -> Result<Vec<Selection>, StoreError> {
        let tables = self.tables.read().await;
        if !tables.cvs.contains_key(&cv_id) {
            return Err(cv_not_found(cv_id));
        }
        let mut selections: Vec<Selection> = tables
            .selections
            .get(&cv_id)
            .map(|per_cv| per_cv.values().cloned().collect())
            .unwrap_or_default();
        selections.sort_by_key(|s| (s.display_order.unwrap_or(i32::MAX), s.item_id));
        Ok(selections)
    }

    async fn upsert_selections(
        &self,
        cv_id: Uuid,
        selections: Vec<Selection>,
    ) -> Result<Vec<Selection>, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.cvs.contains_key(&cv_id) {
            return Err(cv_not_found(cv_id));
        }
        let per_cv = tables.selections.entry(cv_id).or_default();
        for mut selection in selections {
            selection.cv_id = cv_id;
            per_cv.insert(selection.item_id, selection);
        }
        let mut stored: Vec<Selection> = per_cv.values().cloned().collect();
        stored.sort_by_key(|s| (s.display_order.unwrap_or(i32::MAX), s.item_id));
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::SkillCategory;
    use crate::store::load_bundle;

    fn skill(user_id: Uuid) -> ProfileItem {
        ProfileItem::SkillCategory(SkillCategory {
            id: Uuid::new_v4(),
            user_id,
            name: "Backend".to_string(),
            skills: vec!["Rust".to_string()],
            display_order: 0,
        })
    }

    #[tokio::test]
    async fn test_edits_to_different_fields_do_not_clobber() {
        let store = MemoryStore::new();
        let doc = store
            .create_cv(CvDocument::new(Uuid::new_v4(), "Draft".to_string()))
            .await
            .unwrap();

        store
            .apply_edit(doc.id, FieldEdit::Tagline(Some("Builder".to_string())))
            .await
            .unwrap();
        let updated = store
            .apply_edit(doc.id, FieldEdit::Title("Final".to_string()))
            .await
            .unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(updated.content.tagline.as_deref(), Some("Builder"));
    }

    #[tokio::test]
    async fn test_archived_cvs_are_hidden_unless_requested() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let doc = store
            .create_cv(CvDocument::new(user, "Old".to_string()))
            .await
            .unwrap();
        store.set_archived(doc.id, true).await.unwrap();

        assert!(store.list_cvs(user, false).await.unwrap().is_empty());
        assert_eq!(store.list_cvs(user, true).await.unwrap().len(), 1);

        let restored = store.set_archived(doc.id, false).await.unwrap();
        assert!(!restored.is_archived());
    }

    #[tokio::test]
    async fn test_deleting_profile_item_drops_its_selections() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let doc = store
            .create_cv(CvDocument::new(user, "CV".to_string()))
            .await
            .unwrap();
        let item = store.upsert_profile_item(skill(user)).await.unwrap();
        store
            .upsert_selections(doc.id, vec![Selection::default_for(doc.id, item.id(), 0)])
            .await
            .unwrap();

        store.delete_profile_item(user, item.id()).await.unwrap();

        let bundle = load_bundle(&store, doc.id).await.unwrap();
        assert!(bundle.profile.is_empty());
        assert!(bundle.selections.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_profile_item_cannot_be_overwritten() {
        let store = MemoryStore::new();
        let item = store.upsert_profile_item(skill(Uuid::new_v4())).await.unwrap();

        let mut hijack = item.clone();
        if let ProfileItem::SkillCategory(s) = &mut hijack {
            s.user_id = Uuid::new_v4();
        }
        let result = store.upsert_profile_item(hijack).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_missing_cv_is_not_found() {
        let store = MemoryStore::new();
        let result = store.get_cv(Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}
