// AI content generation for CV text fields.
// Generated values are written back exactly like user edits; the layout code
// never knows where a string came from. All model calls go through llm_client.

pub mod handlers;
pub mod llm;
pub mod prompts;

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::selector::CvView;
use crate::llm_client::LlmError;
use crate::models::cv::{CvContent, FieldEdit, LanguageEntry, Locale};

pub use llm::LlmContentGenerator;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// CV content fields the generator can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedField {
    Tagline,
    ProfileSummary,
    Languages,
    Certifications,
}

impl GeneratedField {
    pub const ALL: [GeneratedField; 4] = [
        GeneratedField::Tagline,
        GeneratedField::ProfileSummary,
        GeneratedField::Languages,
        GeneratedField::Certifications,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            GeneratedField::Tagline => "tagline",
            GeneratedField::ProfileSummary => "profile_summary",
            GeneratedField::Languages => "languages",
            GeneratedField::Certifications => "certifications",
        }
    }
}

/// Compact view of one work entry handed to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceDigest {
    pub position: String,
    pub company: String,
    pub period: Option<String>,
    pub highlights: Vec<String>,
}

/// Everything the generator may draw on for one CV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationContext {
    pub locale: Locale,
    pub full_name: String,
    /// Werbeflaechen questionnaire answers, keyed by question.
    pub werbeflaechen: BTreeMap<String, String>,
    pub experience: Vec<ExperienceDigest>,
    pub education: Vec<String>,
    pub skills: Vec<String>,
    pub competences: Vec<String>,
    pub current: CvContent,
    pub instructions: Option<String>,
}

impl GenerationContext {
    /// Builds the context from the CV as currently selected, so the model only
    /// sees what the user chose to show.
    pub fn from_view(
        view: &CvView<'_>,
        locale: Locale,
        werbeflaechen: BTreeMap<String, String>,
        instructions: Option<String>,
    ) -> Self {
        let experience = view
            .experience
            .iter()
            .map(|e| ExperienceDigest {
                position: e.item.position.clone(),
                company: e.item.company.clone(),
                period: match (&e.item.start_date, &e.item.end_date, e.item.is_current) {
                    (Some(start), _, true) => Some(format!("{start} - present")),
                    (Some(start), Some(end), false) => Some(format!("{start} - {end}")),
                    (Some(start), None, false) => Some(start.clone()),
                    (None, end, _) => end.clone(),
                },
                highlights: e.sub_items.clone().unwrap_or_default(),
            })
            .collect();

        Self {
            locale,
            full_name: view.content.personal.full_name.clone(),
            werbeflaechen: werbeflaechen
                .into_iter()
                .filter(|(_, answer)| !answer.trim().is_empty())
                .collect(),
            experience,
            education: view
                .education
                .iter()
                .map(|e| format!("{}, {}", e.item.degree, e.item.institution))
                .collect(),
            skills: view
                .skills
                .iter()
                .flat_map(|s| s.sub_items.clone().unwrap_or_default())
                .collect(),
            competences: view
                .key_competences
                .iter()
                .map(|c| c.item.title.clone())
                .collect(),
            current: view.content.clone(),
            instructions: instructions.filter(|i| !i.trim().is_empty()),
        }
    }
}

/// Values returned by the generator. Fields that were not requested stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedContent {
    pub tagline: Option<String>,
    pub profile_summary: Option<String>,
    pub languages: Option<Vec<LanguageEntry>>,
    pub certifications: Option<Vec<String>>,
}

impl GeneratedContent {
    /// Drops any field outside `fields` and any blank value.
    pub fn retain(mut self, fields: &[GeneratedField]) -> Self {
        let keep = |f: GeneratedField| fields.contains(&f);
        if !keep(GeneratedField::Tagline) {
            self.tagline = None;
        }
        if !keep(GeneratedField::ProfileSummary) {
            self.profile_summary = None;
        }
        if !keep(GeneratedField::Languages) {
            self.languages = None;
        }
        if !keep(GeneratedField::Certifications) {
            self.certifications = None;
        }

        self.tagline = self.tagline.filter(|t| !t.trim().is_empty());
        self.profile_summary = self.profile_summary.filter(|s| !s.trim().is_empty());
        if let Some(languages) = &mut self.languages {
            languages.retain(|l| !l.language.trim().is_empty());
        }
        if let Some(certs) = &mut self.certifications {
            certs.retain(|c| !c.trim().is_empty());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tagline.is_none()
            && self.profile_summary.is_none()
            && self.languages.is_none()
            && self.certifications.is_none()
    }

    /// Field edits that store the generated values as if the user typed them.
    pub fn into_edits(self) -> Vec<FieldEdit> {
        let mut edits = Vec::new();
        if let Some(tagline) = self.tagline {
            edits.push(FieldEdit::Tagline(Some(tagline)));
        }
        if let Some(summary) = self.profile_summary {
            edits.push(FieldEdit::ProfileSummary(Some(summary)));
        }
        if let Some(languages) = self.languages {
            edits.push(FieldEdit::Languages(languages));
        }
        if let Some(certs) = self.certifications {
            edits.push(FieldEdit::Certifications(certs));
        }
        edits
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generator trait
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generates the requested fields from scratch.
    async fn generate(
        &self,
        context: &GenerationContext,
        fields: &[GeneratedField],
    ) -> Result<GeneratedContent, LlmError>;

    /// Rewrites a single field, taking its current value into account.
    async fn regenerate(
        &self,
        context: &GenerationContext,
        field: GeneratedField,
    ) -> Result<GeneratedContent, LlmError> {
        self.generate(context, &[field]).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-flight tracking
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationAction {
    Generate,
    Regenerate(GeneratedField),
}

/// At most one outstanding request per (CV, action).
#[derive(Debug, Default)]
pub struct InFlight {
    active: Mutex<HashSet<(Uuid, GenerationAction)>>,
}

impl InFlight {
    /// Claims the slot, or returns `None` while an identical request is running.
    pub fn try_begin(self: &Arc<Self>, cv_id: Uuid, action: GenerationAction) -> Option<InFlightGuard> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert((cv_id, action)) {
            return None;
        }
        Some(InFlightGuard {
            registry: Arc::clone(self),
            key: (cv_id, action),
        })
    }

    pub fn is_active(&self, cv_id: Uuid, action: GenerationAction) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(cv_id, action))
    }
}

/// Releases the in-flight slot when dropped, including on error or cancellation.
pub struct InFlightGuard {
    registry: Arc<InFlight>,
    key: (Uuid, GenerationAction),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
