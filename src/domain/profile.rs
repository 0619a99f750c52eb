//! Persisted onboarding profile, keyed by owner id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::collections;
use super::{InterestToGrow, Skill};
use crate::model::{embed, Document, FieldMap, FromDocument, Schema, Value};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalExperience {
    pub uid: String,
    pub role: String,
    pub organization: String,
    pub description: String,
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub uid: String,
    pub title: String,
    pub institution: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of the onboarding wizard as stored.
///
/// `completed` is the terminal flag. A completed profile is never
/// rehydrated into wizard state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub owner_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed: bool,
    pub completed_step: i64,
    pub current_step: i64,
    pub interests: Vec<InterestToGrow>,
    pub skills: Vec<Skill>,
    pub experiences: Vec<ProfessionalExperience>,
    pub studies: Vec<Study>,
}

// ============================================================================
// Embedded records
// ============================================================================

impl FromDocument for ProfessionalExperience {
    fn from_document(doc: Document) -> Result<Self> {
        Ok(Self {
            uid: doc.require("uid")?,
            role: doc.require("role")?,
            organization: doc.require("organization")?,
            description: doc.optional("description")?.unwrap_or_default(),
            category: doc.optional("category")?.unwrap_or_default(),
            started_at: doc.require("startedAt")?,
            ended_at: doc.optional("endedAt")?,
            created_at: doc.require("createdAt")?,
        })
    }
}

impl ProfessionalExperience {
    pub fn to_fields(&self) -> FieldMap {
        let mut out = FieldMap::new();
        out.insert("uid".into(), Value::from(self.uid.as_str()));
        out.insert("role".into(), Value::from(self.role.as_str()));
        out.insert("organization".into(), Value::from(self.organization.as_str()));
        out.insert("description".into(), Value::from(self.description.as_str()));
        out.insert("category".into(), Value::from(self.category.as_str()));
        out.insert("startedAt".into(), Value::from(self.started_at));
        out.insert("endedAt".into(), Value::from(self.ended_at));
        out.insert("createdAt".into(), Value::from(self.created_at));
        out
    }
}

impl FromDocument for Study {
    fn from_document(doc: Document) -> Result<Self> {
        Ok(Self {
            uid: doc.require("uid")?,
            title: doc.require("title")?,
            institution: doc.require("institution")?,
            started_at: doc.require("startedAt")?,
            ended_at: doc.optional("endedAt")?,
            created_at: doc.require("createdAt")?,
        })
    }
}

impl Study {
    pub fn to_fields(&self) -> FieldMap {
        let mut out = FieldMap::new();
        out.insert("uid".into(), Value::from(self.uid.as_str()));
        out.insert("title".into(), Value::from(self.title.as_str()));
        out.insert("institution".into(), Value::from(self.institution.as_str()));
        out.insert("startedAt".into(), Value::from(self.started_at));
        out.insert("endedAt".into(), Value::from(self.ended_at));
        out.insert("createdAt".into(), Value::from(self.created_at));
        out
    }
}

// ============================================================================
// Profile
// ============================================================================

impl FromDocument for Profile {
    fn from_document(doc: Document) -> Result<Self> {
        let owner_id = match doc.optional::<String>("ownerId")? {
            Some(owner) => owner,
            None => doc.id.clone().ok_or_else(|| Error::MissingField("ownerId".into()))?,
        };
        let completed_step: i64 = doc.optional("completedStep")?.unwrap_or(0);
        Ok(Self {
            owner_id,
            created_at: doc.optional("createdAt")?,
            updated_at: doc.optional("updatedAt")?,
            completed: doc.optional("completed")?.unwrap_or(false),
            completed_step,
            current_step: doc.optional("currentStep")?.unwrap_or(completed_step),
            interests: doc.records("interests")?,
            skills: doc.records("skills")?,
            experiences: doc.records("experiences")?,
            studies: doc.records("studies")?,
        })
    }
}

impl Schema for Profile {
    const COLLECTION: &'static str = collections::PROFILES;

    fn to_fields(&self) -> FieldMap {
        let mut out = FieldMap::new();
        out.insert("ownerId".into(), Value::from(self.owner_id.as_str()));
        if let Some(t) = self.created_at {
            out.insert("createdAt".into(), Value::from(t));
        }
        if let Some(t) = self.updated_at {
            out.insert("updatedAt".into(), Value::from(t));
        }
        out.insert("completed".into(), Value::from(self.completed));
        out.insert("completedStep".into(), Value::from(self.completed_step));
        out.insert("currentStep".into(), Value::from(self.current_step));
        out.insert("interests".into(), embed(&self.interests, InterestToGrow::to_fields));
        out.insert("skills".into(), embed(&self.skills, Skill::to_fields));
        out.insert("experiences".into(), embed(&self.experiences, ProfessionalExperience::to_fields));
        out.insert("studies".into(), embed(&self.studies, Study::to_fields));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profile_fields_round_trip() {
        let t = Utc.with_ymd_and_hms(2025, 5, 2, 12, 0, 0).unwrap();
        let profile = Profile {
            owner_id: "u1".into(),
            created_at: None,
            updated_at: Some(t),
            completed: false,
            completed_step: 1,
            current_step: 1,
            interests: vec![InterestToGrow::new("i1", "DeFi")],
            skills: vec![Skill::new("s1", "Liderazgo")],
            experiences: vec![ProfessionalExperience {
                uid: "exp-1".into(),
                role: "Dev".into(),
                organization: "Acme".into(),
                description: String::new(),
                category: String::new(),
                started_at: t,
                ended_at: None,
                created_at: t,
            }],
            studies: vec![],
        };
        let doc = Document::new(profile.to_fields()).with_id("u1");
        assert_eq!(Profile::from_document(doc).unwrap(), profile);
    }

    #[test]
    fn test_sparse_profile_defaults() {
        let doc = Document::new(FieldMap::from([("completedStep".to_string(), Value::from(2))])).with_id("u9");
        let p = Profile::from_document(doc).unwrap();
        assert_eq!(p.owner_id, "u9");
        assert!(!p.completed);
        assert_eq!(p.current_step, 2);
        assert!(p.skills.is_empty());
    }
}
