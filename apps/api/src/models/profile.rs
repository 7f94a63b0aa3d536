//! Reusable career-profile records owned by a user and shared by all of their CVs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminant of the profile collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    WorkExperience,
    Education,
    SkillCategory,
    KeyCompetence,
    Project,
    Reference,
    Certification,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::WorkExperience => "work_experience",
            ProfileKind::Education => "education",
            ProfileKind::SkillCategory => "skill_category",
            ProfileKind::KeyCompetence => "key_competence",
            ProfileKind::Project => "project",
            ProfileKind::Reference => "reference",
            ProfileKind::Certification => "certification",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-kind records
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institution: String,
    pub degree: String,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyCompetence {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub issued_on: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

// ────────────────────────────────────────────────────────────────────────────
// Shared accessors used by the content selector
// ────────────────────────────────────────────────────────────────────────────

/// Common view over every profile record kind.
///
/// `sub_items` is `None` for kinds that have no ordered sub-list, which lets the
/// selector tell "no list" apart from "empty list".
pub trait ProfileEntry {
    const KIND: ProfileKind;

    fn id(&self) -> Uuid;
    fn display_order(&self) -> i32;

    fn description(&self) -> Option<&str> {
        None
    }

    fn sub_items(&self) -> Option<&[String]> {
        None
    }
}

impl ProfileEntry for WorkExperience {
    const KIND: ProfileKind = ProfileKind::WorkExperience;

    fn id(&self) -> Uuid {
        self.id
    }
    fn display_order(&self) -> i32 {
        self.display_order
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    fn sub_items(&self) -> Option<&[String]> {
        Some(&self.bullets)
    }
}

impl ProfileEntry for Education {
    const KIND: ProfileKind = ProfileKind::Education;

    fn id(&self) -> Uuid {
        self.id
    }
    fn display_order(&self) -> i32 {
        self.display_order
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl ProfileEntry for SkillCategory {
    const KIND: ProfileKind = ProfileKind::SkillCategory;

    fn id(&self) -> Uuid {
        self.id
    }
    fn display_order(&self) -> i32 {
        self.display_order
    }
    fn sub_items(&self) -> Option<&[String]> {
        Some(&self.skills)
    }
}

impl ProfileEntry for KeyCompetence {
    const KIND: ProfileKind = ProfileKind::KeyCompetence;

    fn id(&self) -> Uuid {
        self.id
    }
    fn display_order(&self) -> i32 {
        self.display_order
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl ProfileEntry for Project {
    const KIND: ProfileKind = ProfileKind::Project;

    fn id(&self) -> Uuid {
        self.id
    }
    fn display_order(&self) -> i32 {
        self.display_order
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    fn sub_items(&self) -> Option<&[String]> {
        Some(&self.highlights)
    }
}

impl ProfileEntry for Reference {
    const KIND: ProfileKind = ProfileKind::Reference;

    fn id(&self) -> Uuid {
        self.id
    }
    fn display_order(&self) -> i32 {
        self.display_order
    }
}

impl ProfileEntry for Certification {
    const KIND: ProfileKind = ProfileKind::Certification;

    fn id(&self) -> Uuid {
        self.id
    }
    fn display_order(&self) -> i32 {
        self.display_order
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tagged union at the persistence boundary
// ────────────────────────────────────────────────────────────────────────────

/// A single profile record as it crosses the HTTP / storage boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileItem {
    WorkExperience(WorkExperience),
    Education(Education),
    SkillCategory(SkillCategory),
    KeyCompetence(KeyCompetence),
    Project(Project),
    Reference(Reference),
    Certification(Certification),
}

impl ProfileItem {
    pub fn kind(&self) -> ProfileKind {
        match self {
            ProfileItem::WorkExperience(_) => ProfileKind::WorkExperience,
            ProfileItem::Education(_) => ProfileKind::Education,
            ProfileItem::SkillCategory(_) => ProfileKind::SkillCategory,
            ProfileItem::KeyCompetence(_) => ProfileKind::KeyCompetence,
            ProfileItem::Project(_) => ProfileKind::Project,
            ProfileItem::Reference(_) => ProfileKind::Reference,
            ProfileItem::Certification(_) => ProfileKind::Certification,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ProfileItem::WorkExperience(i) => i.id,
            ProfileItem::Education(i) => i.id,
            ProfileItem::SkillCategory(i) => i.id,
            ProfileItem::KeyCompetence(i) => i.id,
            ProfileItem::Project(i) => i.id,
            ProfileItem::Reference(i) => i.id,
            ProfileItem::Certification(i) => i.id,
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            ProfileItem::WorkExperience(i) => i.user_id,
            ProfileItem::Education(i) => i.user_id,
            ProfileItem::SkillCategory(i) => i.user_id,
            ProfileItem::KeyCompetence(i) => i.user_id,
            ProfileItem::Project(i) => i.user_id,
            ProfileItem::Reference(i) => i.user_id,
            ProfileItem::Certification(i) => i.user_id,
        }
    }

    pub fn display_order(&self) -> i32 {
        match self {
            ProfileItem::WorkExperience(i) => i.display_order,
            ProfileItem::Education(i) => i.display_order,
            ProfileItem::SkillCategory(i) => i.display_order,
            ProfileItem::KeyCompetence(i) => i.display_order,
            ProfileItem::Project(i) => i.display_order,
            ProfileItem::Reference(i) => i.display_order,
            ProfileItem::Certification(i) => i.display_order,
        }
    }

    /// Checks the free-text fields every kind requires.
    pub fn validate(&self) -> Result<(), String> {
        let (field, value) = match self {
            ProfileItem::WorkExperience(i) => {
                if i.position.trim().is_empty() {
                    return Err("work_experience.position cannot be empty".to_string());
                }
                ("work_experience.company", &i.company)
            }
            ProfileItem::Education(i) => ("education.institution", &i.institution),
            ProfileItem::SkillCategory(i) => ("skill_category.name", &i.name),
            ProfileItem::KeyCompetence(i) => ("key_competence.title", &i.title),
            ProfileItem::Project(i) => ("project.name", &i.name),
            ProfileItem::Reference(i) => ("reference.name", &i.name),
            ProfileItem::Certification(i) => ("certification.name", &i.name),
        };
        if value.trim().is_empty() {
            return Err(format!("{field} cannot be empty"));
        }
        Ok(())
    }
}

/// All of a user's profile collections, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub work_experience: Vec<WorkExperience>,
    pub education: Vec<Education>,
    pub skill_categories: Vec<SkillCategory>,
    pub key_competences: Vec<KeyCompetence>,
    pub projects: Vec<Project>,
    pub references: Vec<Reference>,
    pub certifications: Vec<Certification>,
}

impl Profile {
    pub fn from_items(items: impl IntoIterator<Item = ProfileItem>) -> Self {
        let mut profile = Profile::default();
        for item in items {
            match item {
                ProfileItem::WorkExperience(i) => profile.work_experience.push(i),
                ProfileItem::Education(i) => profile.education.push(i),
                ProfileItem::SkillCategory(i) => profile.skill_categories.push(i),
                ProfileItem::KeyCompetence(i) => profile.key_competences.push(i),
                ProfileItem::Project(i) => profile.projects.push(i),
                ProfileItem::Reference(i) => profile.references.push(i),
                ProfileItem::Certification(i) => profile.certifications.push(i),
            }
        }
        profile
    }

    pub fn is_empty(&self) -> bool {
        self.work_experience.is_empty()
            && self.education.is_empty()
            && self.skill_categories.is_empty()
            && self.key_competences.is_empty()
            && self.projects.is_empty()
            && self.references.is_empty()
            && self.certifications.is_empty()
    }
}
