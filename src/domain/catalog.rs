//! Reference catalog entries: skills and interests a user can pick.
//!
//! A catalog document's id is its uid, whatever `uid` field it stores.
//! Once embedded in a profile (no document id), the uid travels as a field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::collections;
use crate::model::{Document, FieldMap, FromDocument, Schema, Value};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub uid: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestToGrow {
    pub uid: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Skill {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self { uid: uid.into(), name: name.into(), description: None, category: None, created_at: None }
    }
}

impl InterestToGrow {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self { uid: uid.into(), name: name.into(), description: None, category: None, created_at: None }
    }
}

struct CatalogFields {
    uid: String,
    name: String,
    description: Option<String>,
    category: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

fn read_catalog(doc: &Document) -> Result<CatalogFields> {
    let uid = match &doc.id {
        Some(id) => id.clone(),
        None => doc.optional::<String>("uid")?.ok_or_else(|| Error::MissingField("uid".into()))?,
    };
    Ok(CatalogFields {
        uid,
        name: doc.optional("name")?.unwrap_or_default(),
        description: doc.optional("description")?,
        category: doc.optional("category")?,
        created_at: doc.optional("createdAt")?,
    })
}

fn write_catalog(
    uid: &str,
    name: &str,
    description: &Option<String>,
    category: &Option<String>,
    created_at: &Option<DateTime<Utc>>,
) -> FieldMap {
    let mut out = FieldMap::new();
    out.insert("uid".into(), Value::from(uid));
    out.insert("name".into(), Value::from(name));
    if let Some(d) = description {
        out.insert("description".into(), Value::from(d.as_str()));
    }
    if let Some(c) = category {
        out.insert("category".into(), Value::from(c.as_str()));
    }
    if let Some(t) = created_at {
        out.insert("createdAt".into(), Value::from(*t));
    }
    out
}

impl FromDocument for Skill {
    fn from_document(doc: Document) -> Result<Self> {
        let f = read_catalog(&doc)?;
        Ok(Self { uid: f.uid, name: f.name, description: f.description, category: f.category, created_at: f.created_at })
    }
}

impl Schema for Skill {
    const COLLECTION: &'static str = collections::SKILLS;

    fn to_fields(&self) -> FieldMap {
        write_catalog(&self.uid, &self.name, &self.description, &self.category, &self.created_at)
    }
}

impl FromDocument for InterestToGrow {
    fn from_document(doc: Document) -> Result<Self> {
        let f = read_catalog(&doc)?;
        Ok(Self { uid: f.uid, name: f.name, description: f.description, category: f.category, created_at: f.created_at })
    }
}

impl Schema for InterestToGrow {
    const COLLECTION: &'static str = collections::INTERESTS;

    fn to_fields(&self) -> FieldMap {
        write_catalog(&self.uid, &self.name, &self.description, &self.category, &self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fields;

    #[test]
    fn test_uid_is_document_id() {
        let doc = Document::new(fields([("name", "Liderazgo")])).with_id("doc-9");
        let skill = Skill::from_document(doc).unwrap();
        assert_eq!(skill.uid, "doc-9");
        assert_eq!(skill.name, "Liderazgo");
    }

    #[test]
    fn test_document_id_wins_over_stored_uid() {
        let doc = Document::new(fields([("uid", "stale"), ("name", "Rust")])).with_id("doc-1");
        assert_eq!(Skill::from_document(doc).unwrap().uid, "doc-1");
    }

    #[test]
    fn test_embedded_uid_only() {
        let doc = Document::new(fields([("uid", "s1")]));
        let skill = Skill::from_document(doc).unwrap();
        assert_eq!(skill, Skill::new("s1", ""));
    }

    #[test]
    fn test_no_uid_anywhere_is_rejected() {
        let doc = Document::new(fields([("name", "x")]));
        assert!(matches!(InterestToGrow::from_document(doc), Err(Error::MissingField(_))));
    }
}
