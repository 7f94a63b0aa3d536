//! Layout Resolver: assigns sections and items to numbered pages.
//!
//! The pass is greedy and non-measuring: it only honours page breaks the user
//! placed explicitly. Whether a page actually fits is left to the preview's
//! overflow check.
//!
//! Both renderers consume the resulting `PagePlan`; neither re-derives layout.

use serde::Serialize;
use uuid::Uuid;

use crate::layout::catalog::SectionKind;
use crate::layout::page_format::PageFormat;
use crate::layout::selector::CvView;
use crate::models::cv::{DisplaySettings, LayoutMode, Locale, PageBreaks};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// One unit of main-column flow: a section heading or a single list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowUnit {
    /// Section key for section units, item uuid for item units.
    pub id: String,
    pub section: SectionKind,
    pub item_id: Option<Uuid>,
    pub can_break_before: bool,
}

impl FlowUnit {
    fn section(section: SectionKind) -> Self {
        Self {
            id: section.key().to_string(),
            section,
            item_id: None,
            can_break_before: section != SectionKind::Header,
        }
    }

    fn item(section: SectionKind, item_id: Uuid, can_break_before: bool) -> Self {
        Self {
            id: item_id.to_string(),
            section,
            item_id: Some(item_id),
            can_break_before,
        }
    }
}

/// The slice of a section that lands on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSection {
    pub section: SectionKind,
    /// False on continuation pages of a section that started earlier.
    pub show_title: bool,
    /// Items of per-item sections placed on this page; empty for other sections.
    pub item_ids: Vec<Uuid>,
}

impl PageSection {
    fn is_renderable(&self) -> bool {
        !self.section.breaks_per_item() || !self.item_ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: usize,
    /// Side-column sections, repeated on every page in two-column mode.
    pub sidebar: Vec<SectionKind>,
    pub show_photo: bool,
    pub main: Vec<PageSection>,
    /// Set on the single page emitted when the CV has no content yet.
    pub placeholder: bool,
}

/// Renderer-agnostic layout of one CV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagePlan {
    pub format: PageFormat,
    pub layout_mode: LayoutMode,
    pub locale: Locale,
    pub pages: Vec<Page>,
}

pub fn placeholder_message(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Start editing your CV to see it here.",
        Locale::De => "Beginne mit der Bearbeitung, um deinen Lebenslauf hier zu sehen.",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Flow construction
// ────────────────────────────────────────────────────────────────────────────

/// Builds the ordered main-column flow for a CV.
///
/// Hidden sections, sections without content and (in two-column mode) sidebar
/// sections are skipped. The first item of a section cannot break away from its
/// heading; a break there belongs on the section itself.
pub fn flow_units(view: &CvView<'_>, settings: &DisplaySettings) -> Vec<FlowUnit> {
    let mut units = Vec::new();

    for section in settings.effective_order() {
        if !settings.is_visible(section) || settings.is_sidebar(section) {
            continue;
        }
        if !section.has_content(view) {
            continue;
        }

        units.push(FlowUnit::section(section));

        if section.breaks_per_item() {
            for (position, item_id) in view.item_ids(section).into_iter().enumerate() {
                units.push(FlowUnit::item(section, item_id, position > 0));
            }
        }
    }

    units
}

/// Sidebar sections with content, in document order. Empty in single-column mode.
pub fn sidebar_sections(view: &CvView<'_>, settings: &DisplaySettings) -> Vec<SectionKind> {
    settings
        .effective_order()
        .into_iter()
        .filter(|s| settings.is_sidebar(*s) && settings.is_visible(*s) && s.has_content(view))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Pagination
// ────────────────────────────────────────────────────────────────────────────

/// Splits `units` into pages, starting a new page before every breakable unit
/// whose id is in `page_breaks`.
///
/// Single linear pass; never yields an empty page.
pub fn paginate<'u>(units: &'u [FlowUnit], page_breaks: &PageBreaks) -> Vec<Vec<&'u FlowUnit>> {
    let mut pages: Vec<Vec<&FlowUnit>> = Vec::new();
    let mut current: Vec<&FlowUnit> = Vec::new();

    for unit in units {
        if unit.can_break_before && page_breaks.contains(&unit.id) && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
        }
        current.push(unit);
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

/// Groups one page's units into per-section slices.
fn group_sections(units: &[&FlowUnit]) -> Vec<PageSection> {
    let mut sections: Vec<PageSection> = Vec::new();

    for unit in units {
        match unit.item_id {
            None => sections.push(PageSection {
                section: unit.section,
                show_title: true,
                item_ids: Vec::new(),
            }),
            Some(item_id) => match sections.last_mut() {
                Some(last) if last.section == unit.section => last.item_ids.push(item_id),
                _ => sections.push(PageSection {
                    section: unit.section,
                    show_title: false,
                    item_ids: vec![item_id],
                }),
            },
        }
    }

    sections
}

/// Resolves the complete page plan for a CV.
pub fn resolve(view: &CvView<'_>, settings: &DisplaySettings) -> PagePlan {
    let units = flow_units(view, settings);
    let sidebar = sidebar_sections(view, settings);

    let mut mains: Vec<Vec<PageSection>> = paginate(&units, &settings.page_breaks)
        .iter()
        .map(|page| {
            group_sections(page)
                .into_iter()
                .filter(PageSection::is_renderable)
                .collect::<Vec<_>>()
        })
        .filter(|sections| !sections.is_empty())
        .collect();

    // A section whose opening slice was dropped still needs its title once.
    let mut titled: Vec<SectionKind> = Vec::new();
    for sections in &mut mains {
        for slice in sections.iter_mut() {
            if !titled.contains(&slice.section) {
                slice.show_title = true;
                titled.push(slice.section);
            }
        }
    }

    let has_photo = settings.show_photo
        && view
            .content
            .personal
            .photo_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty());

    let placeholder = mains.is_empty() && sidebar.is_empty();
    if mains.is_empty() {
        mains.push(Vec::new());
    }

    let pages = mains
        .into_iter()
        .enumerate()
        .map(|(index, main)| Page {
            number: index + 1,
            sidebar: sidebar.clone(),
            show_photo: index == 0 && has_photo && !placeholder,
            main,
            placeholder,
        })
        .collect();

    PagePlan {
        format: settings.page_format,
        layout_mode: settings.layout_mode,
        locale: settings.locale,
        pages,
    }
}
