//! Section Catalog: static registry of every CV section the renderers know about.
//!
//! Each entry carries the section's stable key, its localized title, whether its
//! items may carry their own page-break markers, and the predicate that decides
//! whether the section has anything to render for a given CV view.

use serde::{Deserialize, Serialize};

use crate::layout::selector::CvView;
use crate::models::cv::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Header,
    Summary,
    KeyCompetences,
    Experience,
    Education,
    Projects,
    Skills,
    Certifications,
    Languages,
    References,
}

impl SectionKind {
    /// Default document order.
    pub const ALL: [SectionKind; 10] = [
        SectionKind::Header,
        SectionKind::Summary,
        SectionKind::KeyCompetences,
        SectionKind::Experience,
        SectionKind::Education,
        SectionKind::Projects,
        SectionKind::Skills,
        SectionKind::Certifications,
        SectionKind::Languages,
        SectionKind::References,
    ];

    pub fn spec(&self) -> &'static SectionSpec {
        // SECTIONS is indexed in declaration order.
        &SECTIONS[*self as usize]
    }

    pub fn key(&self) -> &'static str {
        self.spec().key
    }

    pub fn from_key(key: &str) -> Option<SectionKind> {
        SECTIONS.iter().find(|s| s.key == key).map(|s| s.kind)
    }

    pub fn title(&self, locale: Locale) -> &'static str {
        let spec = self.spec();
        match locale {
            Locale::En => spec.title_en,
            Locale::De => spec.title_de,
        }
    }

    /// Whether individual items of this section are flow units of their own.
    pub fn breaks_per_item(&self) -> bool {
        self.spec().breaks_per_item
    }

    pub fn has_content(&self, view: &CvView<'_>) -> bool {
        (self.spec().has_content)(view)
    }
}

pub struct SectionSpec {
    pub kind: SectionKind,
    pub key: &'static str,
    pub title_en: &'static str,
    pub title_de: &'static str,
    pub breaks_per_item: bool,
    pub has_content: fn(&CvView<'_>) -> bool,
}

pub static SECTIONS: [SectionSpec; 10] = [
    SectionSpec {
        kind: SectionKind::Header,
        key: "header",
        title_en: "Personal details",
        title_de: "Persönliche Daten",
        breaks_per_item: false,
        has_content: always,
    },
    SectionSpec {
        kind: SectionKind::Summary,
        key: "summary",
        title_en: "Profile",
        title_de: "Profil",
        breaks_per_item: false,
        has_content: has_summary,
    },
    SectionSpec {
        kind: SectionKind::KeyCompetences,
        key: "key_competences",
        title_en: "Key competences",
        title_de: "Kernkompetenzen",
        breaks_per_item: false,
        has_content: has_key_competences,
    },
    SectionSpec {
        kind: SectionKind::Experience,
        key: "experience",
        title_en: "Work experience",
        title_de: "Berufserfahrung",
        breaks_per_item: true,
        has_content: has_experience,
    },
    SectionSpec {
        kind: SectionKind::Education,
        key: "education",
        title_en: "Education",
        title_de: "Ausbildung",
        breaks_per_item: true,
        has_content: has_education,
    },
    SectionSpec {
        kind: SectionKind::Projects,
        key: "projects",
        title_en: "Projects",
        title_de: "Projekte",
        breaks_per_item: true,
        has_content: has_projects,
    },
    SectionSpec {
        kind: SectionKind::Skills,
        key: "skills",
        title_en: "Skills",
        title_de: "Fähigkeiten",
        breaks_per_item: false,
        has_content: has_skills,
    },
    SectionSpec {
        kind: SectionKind::Certifications,
        key: "certifications",
        title_en: "Certifications",
        title_de: "Zertifikate",
        breaks_per_item: false,
        has_content: has_certifications,
    },
    SectionSpec {
        kind: SectionKind::Languages,
        key: "languages",
        title_en: "Languages",
        title_de: "Sprachen",
        breaks_per_item: false,
        has_content: has_languages,
    },
    SectionSpec {
        kind: SectionKind::References,
        key: "references",
        title_en: "References",
        title_de: "Referenzen",
        breaks_per_item: true,
        has_content: has_references,
    },
];

// ────────────────────────────────────────────────────────────────────────────
// Content predicates
// ────────────────────────────────────────────────────────────────────────────

fn always(_: &CvView<'_>) -> bool {
    true
}

fn has_summary(v: &CvView<'_>) -> bool {
    v.content
        .profile_summary
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty())
}

fn has_key_competences(v: &CvView<'_>) -> bool {
    !v.key_competences.is_empty()
}

fn has_experience(v: &CvView<'_>) -> bool {
    !v.experience.is_empty()
}

fn has_education(v: &CvView<'_>) -> bool {
    !v.education.is_empty()
}

fn has_projects(v: &CvView<'_>) -> bool {
    !v.projects.is_empty()
}

fn has_skills(v: &CvView<'_>) -> bool {
    !v.skills.is_empty()
}

fn has_certifications(v: &CvView<'_>) -> bool {
    !v.certifications.is_empty() || v.content.certifications.iter().any(|c| !c.trim().is_empty())
}

fn has_languages(v: &CvView<'_>) -> bool {
    !v.content.languages.is_empty()
}

fn has_references(v: &CvView<'_>) -> bool {
    !v.references.is_empty()
}

/// Catalog entry as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct SectionDescriptor {
    pub key: &'static str,
    pub title: &'static str,
    pub breaks_per_item: bool,
}

pub fn describe_sections(locale: Locale) -> Vec<SectionDescriptor> {
    SectionKind::ALL
        .iter()
        .map(|kind| SectionDescriptor {
            key: kind.key(),
            title: kind.title(locale),
            breaks_per_item: kind.breaks_per_item(),
        })
        .collect()
}
