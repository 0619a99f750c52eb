//! Chat messages and conversation archives.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::collections;
use crate::model::{embed, Document, FieldMap, FromDocument, Schema, Value};
use crate::{Error, Result};

/// Status a freshly sent message carries unless told otherwise.
pub const DEFAULT_STATUS: &str = "sent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Assistant,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(MessageKind::User),
            "assistant" => Ok(MessageKind::Assistant),
            other => Err(Error::TypeError {
                expected: "message kind (user|assistant)".into(),
                got: other.into(),
            }),
        }
    }
}

/// One chat message. Created on send, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Option<String>,
    pub owner_id: String,
    pub content: String,
    pub kind: MessageKind,
    pub status: String,
    pub sent_at: DateTime<Utc>,
}

impl FromDocument for Message {
    fn from_document(doc: Document) -> Result<Self> {
        Ok(Self {
            owner_id: doc.require("ownerId")?,
            content: doc.require("content")?,
            kind: doc.require::<String>("kind")?.parse()?,
            status: doc.optional("status")?.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            sent_at: doc.require("sentAt")?,
            id: doc.id,
        })
    }
}

impl Schema for Message {
    const COLLECTION: &'static str = collections::MESSAGES;

    fn to_fields(&self) -> FieldMap {
        let mut out = FieldMap::new();
        out.insert("ownerId".into(), Value::from(self.owner_id.as_str()));
        out.insert("content".into(), Value::from(self.content.as_str()));
        out.insert("kind".into(), Value::from(self.kind.as_str()));
        out.insert("status".into(), Value::from(self.status.as_str()));
        out.insert("sentAt".into(), Value::from(self.sent_at));
        out
    }
}

/// A conversation archive with its messages embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Option<String>,
    pub owner_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl FromDocument for Conversation {
    fn from_document(doc: Document) -> Result<Self> {
        Ok(Self {
            owner_id: doc.require("ownerId")?,
            title: doc.optional("title")?,
            created_at: doc.require("createdAt")?,
            last_activity: doc.require("lastActivity")?,
            messages: doc.records("messages")?,
            id: doc.id,
        })
    }
}

impl Schema for Conversation {
    const COLLECTION: &'static str = collections::CONVERSATIONS;

    fn to_fields(&self) -> FieldMap {
        let mut out = FieldMap::new();
        out.insert("ownerId".into(), Value::from(self.owner_id.as_str()));
        if let Some(title) = &self.title {
            out.insert("title".into(), Value::from(title.as_str()));
        }
        out.insert("createdAt".into(), Value::from(self.created_at));
        out.insert("lastActivity".into(), Value::from(self.last_activity));
        out.insert("messages".into(), embed(&self.messages, Message::to_fields));
        out
    }
}
