//! Per-CV inclusion and override records layered over the shared profile.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How much detail a work-experience entry shows in a given CV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Title line only: no description, no bullets.
    Simple,
    /// Description only; bullet selection is ignored.
    WithDescription,
    /// Description override plus the bullet index filter.
    #[default]
    Custom,
}

/// Join record between a CV and one profile item.
///
/// `selected_indices = None` means "every sub-item". `display_order = None`
/// falls back to the item's own profile order. The legacy per-kind names are
/// accepted on input so older clients keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub cv_id: Uuid,
    pub item_id: Uuid,
    #[serde(default = "default_true")]
    pub is_selected: bool,
    #[serde(default)]
    pub display_order: Option<i32>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub description_override: Option<String>,
    #[serde(
        default,
        alias = "bullets_override",
        alias = "skills_override",
        alias = "highlights_override"
    )]
    pub sub_items_override: Option<Vec<String>>,
    #[serde(
        default,
        alias = "selected_bullet_indices",
        alias = "selected_skill_indices",
        alias = "selected_highlight_indices"
    )]
    pub selected_indices: Option<Vec<usize>>,
    #[serde(default)]
    pub display_mode: Option<DisplayMode>,
}

fn default_true() -> bool {
    true
}

impl Selection {
    /// The implicit selection used when an item has no stored record for a CV.
    pub fn default_for(cv_id: Uuid, item_id: Uuid, display_order: i32) -> Self {
        Self {
            cv_id,
            item_id,
            is_selected: true,
            display_order: Some(display_order),
            is_favorite: false,
            description_override: None,
            sub_items_override: None,
            selected_indices: None,
            display_mode: None,
        }
    }
}

/// Selections of one CV, keyed by profile item id.
///
/// Duplicate records for the same item keep the last one seen.
#[derive(Debug, Clone, Default)]
pub struct SelectionIndex {
    by_item: HashMap<Uuid, Selection>,
}

impl SelectionIndex {
    pub fn new(selections: impl IntoIterator<Item = Selection>) -> Self {
        Self {
            by_item: selections.into_iter().map(|s| (s.item_id, s)).collect(),
        }
    }

    pub fn get(&self, item_id: &Uuid) -> Option<&Selection> {
        self.by_item.get(item_id)
    }

    pub fn len(&self) -> usize {
        self.by_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }
}

/// Gives selections that arrive without a `display_order` the order already
/// stored for the same item, so partial updates never move an entry.
pub fn keep_stored_order(incoming: &mut [Selection], stored: &SelectionIndex) {
    for selection in incoming.iter_mut().filter(|s| s.display_order.is_none()) {
        selection.display_order = stored
            .get(&selection.item_id)
            .and_then(|previous| previous.display_order);
    }
}

/// Rewrites `display_order` so that `ordered_item_ids` appear in the given order.
///
/// Items absent from `existing` get a default selection. Existing selections not
/// named in `ordered_item_ids` keep their relative order and are renumbered to
/// follow the reordered ones. This is the data-model effect of a drag-and-drop
/// reorder.
pub fn reorder_selections(
    cv_id: Uuid,
    existing: Vec<Selection>,
    ordered_item_ids: &[Uuid],
) -> Vec<Selection> {
    let mut by_item: HashMap<Uuid, Selection> =
        existing.into_iter().map(|s| (s.item_id, s)).collect();

    let mut out = Vec::with_capacity(by_item.len().max(ordered_item_ids.len()));
    for (position, item_id) in ordered_item_ids.iter().enumerate() {
        let mut selection = by_item
            .remove(item_id)
            .unwrap_or_else(|| Selection::default_for(cv_id, *item_id, 0));
        selection.display_order = Some(position as i32);
        out.push(selection);
    }

    let mut rest: Vec<Selection> = by_item.into_values().collect();
    rest.sort_by_key(|s| (s.display_order.unwrap_or(i32::MAX), s.item_id));
    let first_free = ordered_item_ids.len() as i32;
    for (offset, mut selection) in rest.into_iter().enumerate() {
        selection.display_order = Some(first_free + offset as i32);
        out.push(selection);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::selector::select;
    use crate::models::profile::SkillCategory;
    use serde_json::json;

    #[test]
    fn test_legacy_index_field_names_are_accepted() {
        let cv_id = Uuid::new_v4();
        let item_id = Uuid::new_v4();
        let selection: Selection = serde_json::from_value(json!({
            "cv_id": cv_id,
            "item_id": item_id,
            "selected_skill_indices": [0, 2]
        }))
        .unwrap();

        assert!(selection.is_selected, "is_selected defaults to true");
        assert_eq!(selection.selected_indices, Some(vec![0, 2]));
        assert_eq!(selection.display_mode, None);
    }

    #[test]
    fn test_null_indices_mean_all() {
        let selection: Selection = serde_json::from_value(json!({
            "cv_id": Uuid::new_v4(),
            "item_id": Uuid::new_v4(),
            "selected_bullet_indices": null,
            "display_mode": "with_description"
        }))
        .unwrap();
        assert_eq!(selection.selected_indices, None);
        assert_eq!(selection.display_mode, Some(DisplayMode::WithDescription));
    }

    #[test]
    fn test_reorder_assigns_positions_and_creates_defaults() {
        let cv_id = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let mut sel_a = Selection::default_for(cv_id, a, 0);
        sel_a.is_favorite = true;
        let sel_b = Selection::default_for(cv_id, b, 1);

        let reordered = reorder_selections(cv_id, vec![sel_a, sel_b], &[c, a]);

        assert_eq!(reordered.len(), 3);
        assert_eq!(reordered[0].item_id, c);
        assert_eq!(reordered[0].display_order, Some(0));
        assert_eq!(reordered[1].item_id, a);
        assert_eq!(reordered[1].display_order, Some(1));
        assert!(reordered[1].is_favorite, "existing fields survive a reorder");
        assert_eq!(reordered[2].item_id, b, "unlisted selections are kept");
        assert_eq!(reordered[2].display_order, Some(2));
    }

    #[test]
    fn test_partial_reorder_renders_dragged_items_first() {
        let cv_id = Uuid::new_v4();
        let categories: Vec<SkillCategory> = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(order, name)| SkillCategory {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                name: name.to_string(),
                skills: Vec::new(),
                display_order: order as i32,
            })
            .collect();
        let existing: Vec<Selection> = categories
            .iter()
            .map(|c| Selection::default_for(cv_id, c.id, c.display_order))
            .collect();

        let reordered = reorder_selections(
            cv_id,
            existing,
            &[categories[2].id, categories[1].id],
        );
        let out = select(&categories, &SelectionIndex::new(reordered));

        let names: Vec<&str> = out.iter().map(|e| e.item.name.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_missing_display_order_keeps_stored_position() {
        let cv_id = Uuid::new_v4();
        let item = Uuid::new_v4();
        let stored = SelectionIndex::new(vec![Selection::default_for(cv_id, item, 4)]);

        let mut incoming: Vec<Selection> = vec![serde_json::from_value(json!({
            "cv_id": cv_id,
            "item_id": item,
            "is_favorite": true
        }))
        .unwrap()];
        assert_eq!(incoming[0].display_order, None);

        keep_stored_order(&mut incoming, &stored);
        assert_eq!(incoming[0].display_order, Some(4));
        assert!(incoming[0].is_favorite);
    }

    #[test]
    fn test_unordered_selection_follows_profile_order() {
        let categories: Vec<SkillCategory> = [2, 0]
            .iter()
            .map(|order| SkillCategory {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                name: format!("order {order}"),
                skills: Vec::new(),
                display_order: *order,
            })
            .collect();
        let mut favorite = Selection::default_for(Uuid::nil(), categories[0].id, 0);
        favorite.display_order = None;
        favorite.is_favorite = true;

        let out = select(&categories, &SelectionIndex::new(vec![favorite]));
        assert_eq!(out[0].item.display_order, 0);
        assert_eq!(out[1].item.display_order, 2);
    }

    #[test]
    fn test_selection_index_keeps_last_duplicate() {
        let cv_id = Uuid::new_v4();
        let item = Uuid::new_v4();
        let first = Selection::default_for(cv_id, item, 0);
        let mut second = Selection::default_for(cv_id, item, 0);
        second.is_selected = false;

        let index = SelectionIndex::new(vec![first, second]);
        assert_eq!(index.len(), 1);
        assert!(!index.get(&item).unwrap().is_selected);
    }
}
