//! Content Selector: narrows a user's profile down to what one CV shows.
//!
//! Pure and infallible: unknown selections are ignored, stale sub-item indices are
//! dropped, and missing selections fall back to "include everything as-is".

use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use crate::layout::catalog::SectionKind;
use crate::models::cv::CvContent;
use crate::models::profile::{
    Certification, Education, KeyCompetence, Profile, ProfileEntry, ProfileKind, Project,
    Reference, SkillCategory, WorkExperience,
};
use crate::models::selection::{DisplayMode, Selection, SelectionIndex};

/// A profile item as it appears in one CV, with overrides already applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntry<'a, T> {
    pub item: &'a T,
    pub description: Option<String>,
    /// `None` when the kind has no sub-list or the display mode hides it.
    pub sub_items: Option<Vec<String>>,
    pub is_favorite: bool,
    pub display_mode: DisplayMode,
}

/// Filters `items` to the selected ones, orders them for the CV, and resolves
/// description and sub-list overrides.
///
/// Ordering: selection `display_order`, then the item's own `display_order`,
/// then input position.
pub fn select<'a, T: ProfileEntry>(
    items: &'a [T],
    selections: &SelectionIndex,
) -> Vec<ResolvedEntry<'a, T>> {
    let mut chosen: Vec<((i32, i32, usize), ResolvedEntry<'a, T>)> = items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let selection = selections.get(&item.id());
            if !selection.map_or(true, |s| s.is_selected) {
                return None;
            }
            let order = selection
                .and_then(|s| s.display_order)
                .unwrap_or_else(|| item.display_order());
            let key = (order, item.display_order(), position);
            Some((key, resolve_entry(item, selection)))
        })
        .collect();

    chosen.sort_by_key(|(key, _)| *key);
    chosen.into_iter().map(|(_, entry)| entry).collect()
}

fn resolve_entry<'a, T: ProfileEntry>(
    item: &'a T,
    selection: Option<&Selection>,
) -> ResolvedEntry<'a, T> {
    // Display modes only exist for work experience; every other kind behaves as custom.
    let display_mode = if T::KIND == ProfileKind::WorkExperience {
        selection.and_then(|s| s.display_mode).unwrap_or_default()
    } else {
        DisplayMode::Custom
    };
    let is_favorite = selection.is_some_and(|s| s.is_favorite);

    let (description, sub_items) = match display_mode {
        DisplayMode::Simple => (None, None),
        DisplayMode::WithDescription => (resolve_description(item, selection), None),
        DisplayMode::Custom => (
            resolve_description(item, selection),
            resolve_sub_items(item, selection),
        ),
    };

    ResolvedEntry {
        item,
        description,
        sub_items,
        is_favorite,
        display_mode,
    }
}

fn resolve_description<T: ProfileEntry>(item: &T, selection: Option<&Selection>) -> Option<String> {
    selection
        .and_then(|s| non_blank(s.description_override.as_deref()))
        .or_else(|| non_blank(item.description()))
        .map(str::to_string)
}

fn resolve_sub_items<T: ProfileEntry>(
    item: &T,
    selection: Option<&Selection>,
) -> Option<Vec<String>> {
    let profile_list = item.sub_items()?;
    let source = selection
        .and_then(|s| s.sub_items_override.as_deref())
        .unwrap_or(profile_list);
    let indices = selection.and_then(|s| s.selected_indices.as_deref());
    Some(filter_by_indices(source, indices))
}

/// Keeps the sub-items named by `indices`, in list order.
///
/// `None` keeps everything. Out-of-range and repeated indices are ignored.
pub fn filter_by_indices(source: &[String], indices: Option<&[usize]>) -> Vec<String> {
    match indices {
        None => source.to_vec(),
        Some(indices) => {
            let wanted: BTreeSet<usize> =
                indices.iter().copied().filter(|i| *i < source.len()).collect();
            wanted.into_iter().map(|i| source[i].clone()).collect()
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Per-CV view over every collection
// ────────────────────────────────────────────────────────────────────────────

/// Everything a renderer needs about one CV, already filtered and ordered.
#[derive(Debug, Clone, Serialize)]
pub struct CvView<'a> {
    pub content: &'a CvContent,
    pub experience: Vec<ResolvedEntry<'a, WorkExperience>>,
    pub education: Vec<ResolvedEntry<'a, Education>>,
    pub skills: Vec<ResolvedEntry<'a, SkillCategory>>,
    pub key_competences: Vec<ResolvedEntry<'a, KeyCompetence>>,
    pub projects: Vec<ResolvedEntry<'a, Project>>,
    pub references: Vec<ResolvedEntry<'a, Reference>>,
    pub certifications: Vec<ResolvedEntry<'a, Certification>>,
}

impl<'a> CvView<'a> {
    pub fn build(content: &'a CvContent, profile: &'a Profile, selections: &SelectionIndex) -> Self {
        Self {
            content,
            experience: select(&profile.work_experience, selections),
            education: select(&profile.education, selections),
            skills: select(&profile.skill_categories, selections),
            key_competences: select(&profile.key_competences, selections),
            projects: select(&profile.projects, selections),
            references: select(&profile.references, selections),
            certifications: select(&profile.certifications, selections),
        }
    }

    /// Ids of the resolved items of a per-item section, in CV order.
    pub fn item_ids(&self, section: SectionKind) -> Vec<Uuid> {
        match section {
            SectionKind::Experience => ids(&self.experience),
            SectionKind::Education => ids(&self.education),
            SectionKind::Projects => ids(&self.projects),
            SectionKind::References => ids(&self.references),
            SectionKind::Skills => ids(&self.skills),
            SectionKind::KeyCompetences => ids(&self.key_competences),
            SectionKind::Certifications => ids(&self.certifications),
            SectionKind::Header | SectionKind::Summary | SectionKind::Languages => Vec::new(),
        }
    }
}

fn ids<T: ProfileEntry>(entries: &[ResolvedEntry<'_, T>]) -> Vec<Uuid> {
    entries.iter().map(|e| e.item.id()).collect()
}

/// Finds the resolved entry for `id` in a section list.
pub fn find_entry<'v, 'a, T: ProfileEntry>(
    entries: &'v [ResolvedEntry<'a, T>],
    id: Uuid,
) -> Option<&'v ResolvedEntry<'a, T>> {
    entries.iter().find(|e| e.item.id() == id)
}
