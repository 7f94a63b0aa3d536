use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::catalog::SectionKind;
use crate::layout::page_format::PageFormat;

/// Longest accepted page-break marker (section keys and uuids fit comfortably).
const MAX_PAGE_BREAK_ID_LEN: usize = 64;

// ────────────────────────────────────────────────────────────────────────────
// Display settings
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    SingleColumn,
    TwoColumn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    #[default]
    Inter,
    Lato,
    Roboto,
    Merriweather,
    EbGaramond,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    De,
}

/// Ids of flow units before which the user forced a new page.
///
/// Kept sorted and de-duplicated; serialized as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageBreaks(BTreeSet<String>);

impl PageBreaks {
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Adds the marker if absent, removes it otherwise. Returns whether it is now set.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.0.remove(id) {
            false
        } else {
            self.0.insert(id.to_string());
            true
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PageBreaks {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        PageBreaks(iter.into_iter().map(Into::into).collect())
    }
}

/// Per-CV presentation configuration, embedded in the CV document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub page_format: PageFormat,
    pub layout_mode: LayoutMode,
    pub hidden_sections: Vec<SectionKind>,
    pub section_order: Vec<SectionKind>,
    /// Sections moved into the side column when `layout_mode` is two-column.
    pub sidebar_sections: Vec<SectionKind>,
    pub accent_color: String,
    pub font_family: FontFamily,
    pub show_photo: bool,
    pub locale: Locale,
    pub page_breaks: PageBreaks,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            page_format: PageFormat::A4,
            layout_mode: LayoutMode::SingleColumn,
            hidden_sections: Vec::new(),
            section_order: SectionKind::ALL.to_vec(),
            sidebar_sections: vec![
                SectionKind::Skills,
                SectionKind::Languages,
                SectionKind::Certifications,
            ],
            accent_color: "#2b6cb0".to_string(),
            font_family: FontFamily::Inter,
            show_photo: true,
            locale: Locale::En,
            page_breaks: PageBreaks::default(),
        }
    }
}

impl DisplaySettings {
    pub fn is_visible(&self, section: SectionKind) -> bool {
        !self.hidden_sections.contains(&section)
    }

    pub fn is_sidebar(&self, section: SectionKind) -> bool {
        self.layout_mode == LayoutMode::TwoColumn && self.sidebar_sections.contains(&section)
    }

    /// The configured section order followed by any catalog sections it omits.
    ///
    /// The header always leads.
    pub fn effective_order(&self) -> Vec<SectionKind> {
        let mut seen = HashSet::new();
        let mut order = vec![SectionKind::Header];
        seen.insert(SectionKind::Header);
        for section in self.section_order.iter().chain(SectionKind::ALL.iter()) {
            if seen.insert(*section) {
                order.push(*section);
            }
        }
        order
    }
}

/// Checks settings before they are persisted.
pub fn validate_display_settings(settings: &DisplaySettings) -> Result<(), String> {
    if !is_hex_color(&settings.accent_color) {
        return Err(format!(
            "accent_color must be a #rrggbb hex colour, got '{}'",
            settings.accent_color
        ));
    }

    for (name, list) in [
        ("section_order", &settings.section_order),
        ("hidden_sections", &settings.hidden_sections),
        ("sidebar_sections", &settings.sidebar_sections),
    ] {
        let mut seen = HashSet::new();
        if let Some(dup) = list.iter().find(|s| !seen.insert(**s)) {
            return Err(format!("{name} lists '{}' more than once", dup.key()));
        }
    }

    if settings.sidebar_sections.contains(&SectionKind::Header) {
        return Err("the header cannot be placed in the sidebar".to_string());
    }

    if let Some(bad) = settings
        .page_breaks
        .iter()
        .find(|id| id.trim().is_empty() || id.len() > MAX_PAGE_BREAK_ID_LEN)
    {
        return Err(format!("invalid page break marker '{bad}'"));
    }

    Ok(())
}

pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

// ────────────────────────────────────────────────────────────────────────────
// CV content
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalDetails {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub language: String,
    #[serde(default)]
    pub level: Option<String>,
}

/// Free-text fields owned by a single CV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvContent {
    pub personal: PersonalDetails,
    pub tagline: Option<String>,
    pub profile_summary: Option<String>,
    pub languages: Vec<LanguageEntry>,
    pub certifications: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: CvContent,
    pub display_settings: DisplaySettings,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CvDocument {
    pub fn new(user_id: Uuid, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            content: CvContent::default(),
            display_settings: DisplaySettings::default(),
            archived_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("title cannot be empty".to_string());
    }
    if title.chars().count() > 200 {
        return Err("title must be at most 200 characters".to_string());
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Field-group edits (unit of auto-save)
// ────────────────────────────────────────────────────────────────────────────

/// One editable field group of a CV. Auto-save debounces per group, so two
/// groups never overwrite each other while edits to the same group coalesce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldEdit {
    Title(String),
    Personal(PersonalDetails),
    Tagline(Option<String>),
    ProfileSummary(Option<String>),
    Languages(Vec<LanguageEntry>),
    Certifications(Vec<String>),
    DisplaySettings(DisplaySettings),
}

impl FieldEdit {
    pub fn key(&self) -> &'static str {
        match self {
            FieldEdit::Title(_) => "title",
            FieldEdit::Personal(_) => "personal",
            FieldEdit::Tagline(_) => "tagline",
            FieldEdit::ProfileSummary(_) => "profile_summary",
            FieldEdit::Languages(_) => "languages",
            FieldEdit::Certifications(_) => "certifications",
            FieldEdit::DisplaySettings(_) => "display_settings",
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            FieldEdit::Title(title) => validate_title(title),
            FieldEdit::DisplaySettings(settings) => validate_display_settings(settings),
            FieldEdit::Languages(languages) => {
                if languages.iter().any(|l| l.language.trim().is_empty()) {
                    Err("language names cannot be empty".to_string())
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Writes this group into the document, leaving every other group untouched.
    pub fn apply(self, doc: &mut CvDocument) {
        match self {
            FieldEdit::Title(title) => doc.title = title,
            FieldEdit::Personal(personal) => doc.content.personal = personal,
            FieldEdit::Tagline(tagline) => doc.content.tagline = tagline,
            FieldEdit::ProfileSummary(summary) => doc.content.profile_summary = summary,
            FieldEdit::Languages(languages) => doc.content.languages = languages,
            FieldEdit::Certifications(certs) => doc.content.certifications = certs,
            FieldEdit::DisplaySettings(settings) => doc.display_settings = settings,
        }
        doc.updated_at = Utc::now();
    }
}
