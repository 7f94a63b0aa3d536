//! Preview tree: the presentation-neutral document both render targets walk.
//!
//! The browser preview receives this tree as JSON and maps nodes onto components;
//! the print renderer turns the very same tree into markup. Node ids match the
//! ones the overflow probes report back.

use serde::Serialize;
use uuid::Uuid;

use crate::layout::catalog::SectionKind;
use crate::layout::overflow::{page_node_id, section_node_id};
use crate::layout::page_format::{PageFormat, PageGeometry};
use crate::layout::resolver::{placeholder_message, Page, PagePlan};
use crate::layout::selector::{find_entry, CvView};
use crate::models::cv::{CvDocument, FontFamily, LayoutMode, Locale};
use crate::models::profile::WorkExperience;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewDocument {
    pub cv_id: Uuid,
    pub title: String,
    pub format: PageFormat,
    pub geometry: PageGeometry,
    pub layout_mode: LayoutMode,
    pub locale: Locale,
    pub accent_color: String,
    pub font_family: FontFamily,
    pub pages: Vec<PreviewPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewPage {
    pub number: usize,
    pub node_id: String,
    pub photo_url: Option<String>,
    pub placeholder: Option<String>,
    pub sidebar: Vec<PreviewSection>,
    pub main: Vec<PreviewSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewSection {
    pub node_id: String,
    pub section: SectionKind,
    /// `None` on continuation slices and for the header.
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        full_name: String,
        tagline: Option<String>,
        contacts: Vec<String>,
    },
    Paragraph {
        text: String,
    },
    Entry {
        item_id: Uuid,
        heading: String,
        subheading: Option<String>,
        meta: Option<String>,
        description: Option<String>,
        bullets: Vec<String>,
        favorite: bool,
    },
    TagGroup {
        item_id: Uuid,
        label: String,
        tags: Vec<String>,
    },
    Lines {
        lines: Vec<String>,
    },
}

/// Builds the preview tree for a resolved CV.
pub fn build_preview(doc: &CvDocument, view: &CvView<'_>, plan: &PagePlan) -> PreviewDocument {
    let settings = &doc.display_settings;

    PreviewDocument {
        cv_id: doc.id,
        title: doc.title.clone(),
        format: plan.format,
        geometry: PageGeometry::for_format(plan.format),
        layout_mode: plan.layout_mode,
        locale: plan.locale,
        accent_color: settings.accent_color.clone(),
        font_family: settings.font_family,
        pages: plan
            .pages
            .iter()
            .map(|page| build_page(page, view, plan.locale))
            .collect(),
    }
}

fn build_page(page: &Page, view: &CvView<'_>, locale: Locale) -> PreviewPage {
    let sidebar = page
        .sidebar
        .iter()
        .map(|section| PreviewSection {
            node_id: section_node_id(page.number, section.key()),
            section: *section,
            title: Some(section.title(locale).to_string()),
            blocks: section_blocks(*section, &view.item_ids(*section), view, locale),
        })
        .collect();

    let main = page
        .main
        .iter()
        .map(|slice| {
            let title = (slice.show_title && slice.section != SectionKind::Header)
                .then(|| slice.section.title(locale).to_string());
            // Non-list sections are placed whole; list sections carry their own slice.
            let item_ids = if slice.section.breaks_per_item() {
                slice.item_ids.clone()
            } else {
                view.item_ids(slice.section)
            };
            PreviewSection {
                node_id: section_node_id(page.number, slice.section.key()),
                section: slice.section,
                title,
                blocks: section_blocks(slice.section, &item_ids, view, locale),
            }
        })
        .collect();

    PreviewPage {
        number: page.number,
        node_id: page_node_id(page.number),
        photo_url: if page.show_photo {
            view.content.personal.photo_url.clone()
        } else {
            None
        },
        placeholder: page
            .placeholder
            .then(|| placeholder_message(locale).to_string()),
        sidebar,
        main,
    }
}

fn section_blocks(
    section: SectionKind,
    item_ids: &[Uuid],
    view: &CvView<'_>,
    locale: Locale,
) -> Vec<Block> {
    match section {
        SectionKind::Header => vec![header_block(view)],
        SectionKind::Summary => view
            .content
            .profile_summary
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Block::Paragraph { text: s.clone() })
            .collect(),
        SectionKind::Experience => item_ids
            .iter()
            .filter_map(|id| find_entry(&view.experience, *id))
            .map(|e| Block::Entry {
                item_id: e.item.id,
                heading: e.item.position.clone(),
                subheading: Some(e.item.company.clone()),
                meta: experience_meta(e.item, locale),
                description: e.description.clone(),
                bullets: e.sub_items.clone().unwrap_or_default(),
                favorite: e.is_favorite,
            })
            .collect(),
        SectionKind::Education => item_ids
            .iter()
            .filter_map(|id| find_entry(&view.education, *id))
            .map(|e| Block::Entry {
                item_id: e.item.id,
                heading: match &e.item.field_of_study {
                    Some(field) if !field.trim().is_empty() => {
                        format!("{}, {}", e.item.degree, field)
                    }
                    _ => e.item.degree.clone(),
                },
                subheading: Some(e.item.institution.clone()),
                meta: date_range(
                    e.item.start_date.as_deref(),
                    e.item.end_date.as_deref(),
                    false,
                    locale,
                ),
                description: e.description.clone(),
                bullets: Vec::new(),
                favorite: e.is_favorite,
            })
            .collect(),
        SectionKind::Projects => item_ids
            .iter()
            .filter_map(|id| find_entry(&view.projects, *id))
            .map(|e| Block::Entry {
                item_id: e.item.id,
                heading: e.item.name.clone(),
                subheading: e.item.role.clone(),
                meta: e.item.url.clone(),
                description: e.description.clone(),
                bullets: e.sub_items.clone().unwrap_or_default(),
                favorite: e.is_favorite,
            })
            .collect(),
        SectionKind::References => item_ids
            .iter()
            .filter_map(|id| find_entry(&view.references, *id))
            .map(|e| Block::Entry {
                item_id: e.item.id,
                heading: e.item.name.clone(),
                subheading: join_present(&[e.item.position.as_deref(), e.item.company.as_deref()]),
                meta: e.item.contact.clone(),
                description: None,
                bullets: Vec::new(),
                favorite: e.is_favorite,
            })
            .collect(),
        SectionKind::KeyCompetences => item_ids
            .iter()
            .filter_map(|id| find_entry(&view.key_competences, *id))
            .map(|e| Block::Entry {
                item_id: e.item.id,
                heading: e.item.title.clone(),
                subheading: None,
                meta: None,
                description: e.description.clone(),
                bullets: Vec::new(),
                favorite: e.is_favorite,
            })
            .collect(),
        SectionKind::Skills => item_ids
            .iter()
            .filter_map(|id| find_entry(&view.skills, *id))
            .map(|e| Block::TagGroup {
                item_id: e.item.id,
                label: e.item.name.clone(),
                tags: e.sub_items.clone().unwrap_or_default(),
            })
            .collect(),
        SectionKind::Certifications => {
            let mut lines: Vec<String> = item_ids
                .iter()
                .filter_map(|id| find_entry(&view.certifications, *id))
                .map(|e| {
                    join_present(&[
                        Some(e.item.name.as_str()),
                        e.item.issuer.as_deref(),
                        e.item.issued_on.as_deref(),
                    ])
                    .unwrap_or_default()
                })
                .collect();
            lines.extend(
                view.content
                    .certifications
                    .iter()
                    .filter(|c| !c.trim().is_empty())
                    .cloned(),
            );
            vec![Block::Lines { lines }]
        }
        SectionKind::Languages => vec![Block::Lines {
            lines: view
                .content
                .languages
                .iter()
                .map(|l| match &l.level {
                    Some(level) if !level.trim().is_empty() => {
                        format!("{} ({})", l.language, level)
                    }
                    _ => l.language.clone(),
                })
                .collect(),
        }],
    }
}

fn header_block(view: &CvView<'_>) -> Block {
    let personal = &view.content.personal;
    let contacts = [
        personal.email.as_deref(),
        personal.phone.as_deref(),
        personal.location.as_deref(),
        personal.website.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|c| !c.trim().is_empty())
    .map(str::to_string)
    .collect();

    Block::Header {
        full_name: personal.full_name.clone(),
        tagline: view
            .content
            .tagline
            .clone()
            .filter(|t| !t.trim().is_empty()),
        contacts,
    }
}

fn experience_meta(item: &WorkExperience, locale: Locale) -> Option<String> {
    let dates = date_range(
        item.start_date.as_deref(),
        item.end_date.as_deref(),
        item.is_current,
        locale,
    );
    join_present(&[dates.as_deref(), item.location.as_deref()])
}

fn date_range(
    start: Option<&str>,
    end: Option<&str>,
    is_current: bool,
    locale: Locale,
) -> Option<String> {
    let present = match locale {
        Locale::En => "present",
        Locale::De => "heute",
    };
    let end = if is_current { Some(present) } else { end };
    match (start, end) {
        (Some(s), Some(e)) => Some(format!("{s} – {e}")),
        (Some(s), None) => Some(s.to_string()),
        (None, Some(e)) => Some(e.to_string()),
        (None, None) => None,
    }
}

fn join_present(parts: &[Option<&str>]) -> Option<String> {
    let present: Vec<&str> = parts
        .iter()
        .flatten()
        .copied()
        .filter(|p| !p.trim().is_empty())
        .collect();
    (!present.is_empty()).then(|| present.join(" · "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::resolver::resolve;
    use crate::models::cv::LanguageEntry;
    use crate::models::profile::{Profile, SkillCategory};
    use crate::models::selection::{DisplayMode, Selection, SelectionIndex};

    fn work(order: i32) -> WorkExperience {
        WorkExperience {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            company: "Acme".to_string(),
            position: format!("Engineer {order}"),
            location: Some("Berlin".to_string()),
            start_date: Some("2020".to_string()),
            end_date: None,
            is_current: true,
            description: Some("Built things".to_string()),
            bullets: vec!["one".to_string(), "two".to_string()],
            display_order: order,
        }
    }

    fn sample() -> (CvDocument, Profile) {
        let mut doc = CvDocument::new(Uuid::new_v4(), "Main".to_string());
        doc.content.personal.full_name = "Alex Muster".to_string();
        doc.content.personal.email = Some("alex@example.com".to_string());
        doc.content.languages = vec![LanguageEntry {
            language: "German".to_string(),
            level: Some("native".to_string()),
        }];
        let profile = Profile {
            work_experience: vec![work(0), work(1)],
            skill_categories: vec![SkillCategory {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                name: "Languages".to_string(),
                skills: vec!["Go".to_string(), "Rust".to_string()],
                display_order: 0,
            }],
            ..Profile::default()
        };
        (doc, profile)
    }

    #[test]
    fn test_preview_follows_plan_sections() {
        let (doc, profile) = sample();
        let view = CvView::build(&doc.content, &profile, &SelectionIndex::default());
        let plan = resolve(&view, &doc.display_settings);
        let preview = build_preview(&doc, &view, &plan);

        assert_eq!(preview.pages.len(), plan.pages.len());
        for (page, planned) in preview.pages.iter().zip(&plan.pages) {
            let got: Vec<SectionKind> = page.main.iter().map(|s| s.section).collect();
            let want: Vec<SectionKind> = planned.main.iter().map(|s| s.section).collect();
            assert_eq!(got, want);
        }
        assert_eq!(preview.pages[0].node_id, "page-1");
        assert_eq!(preview.pages[0].main[0].node_id, "page-1-header");
    }

    #[test]
    fn test_experience_entry_carries_resolved_fields() {
        let (doc, profile) = sample();
        let mut selection =
            Selection::default_for(doc.id, profile.work_experience[0].id, 0);
        selection.display_mode = Some(DisplayMode::WithDescription);
        let view = CvView::build(&doc.content, &profile, &SelectionIndex::new(vec![selection]));
        let plan = resolve(&view, &doc.display_settings);
        let preview = build_preview(&doc, &view, &plan);

        let experience = preview.pages[0]
            .main
            .iter()
            .find(|s| s.section == SectionKind::Experience)
            .unwrap();
        assert_eq!(experience.title.as_deref(), Some("Work experience"));
        match &experience.blocks[0] {
            Block::Entry {
                heading,
                meta,
                description,
                bullets,
                ..
            } => {
                assert_eq!(heading, "Engineer 0");
                assert_eq!(meta.as_deref(), Some("2020 – present · Berlin"));
                assert_eq!(description.as_deref(), Some("Built things"));
                assert!(bullets.is_empty());
            }
            other => panic!("expected entry block, got {other:?}"),
        }
    }

    #[test]
    fn test_placeholder_page_carries_message() {
        let mut doc = CvDocument::new(Uuid::new_v4(), "Empty".to_string());
        doc.display_settings.hidden_sections = vec![SectionKind::Header];
        let profile = Profile::default();
        let view = CvView::build(&doc.content, &profile, &SelectionIndex::default());
        let plan = resolve(&view, &doc.display_settings);
        let preview = build_preview(&doc, &view, &plan);

        assert_eq!(preview.pages.len(), 1);
        assert!(preview.pages[0].placeholder.is_some());
    }

    #[test]
    fn test_languages_render_with_level() {
        let (doc, profile) = sample();
        let view = CvView::build(&doc.content, &profile, &SelectionIndex::default());
        let blocks = section_blocks(SectionKind::Languages, &[], &view, Locale::En);
        assert_eq!(
            blocks,
            vec![Block::Lines {
                lines: vec!["German (native)".to_string()]
            }]
        );
    }
}
