//! # Owner-scoped message stream
//!
//! `MessageStream` keeps a live, chronologically ordered view of every
//! message one owner has sent or received. Each backend push replaces the
//! whole list.
//!
//! The subscription filters by owner only and orders on the client: the
//! backend cannot combine an equality filter with an order clause on a
//! different field without a composite index.

use chrono::{DateTime, Utc};

use crate::domain::chat::DEFAULT_STATUS;
use crate::domain::{Conversation, Message, MessageKind};
use crate::query::QueryOptions;
use crate::storage::StoreBackend;
use crate::subscription::Subscription;
use crate::{DocumentStore, Error, Result};

/// Stable sort by `sent_at`, oldest first. Ties keep their delivered order.
pub fn order_by_sent_at(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by_key(|m| m.sent_at);
    messages
}

// ============================================================================
// MessageStream
// ============================================================================

#[derive(Debug)]
pub struct MessageStream {
    owner_id: String,
    subscription: Subscription<Message>,
    messages: Vec<Message>,
}

impl MessageStream {
    /// Subscribe to every message owned by `owner_id`.
    // TODO: push the sent_at ordering into the query once a composite
    // (ownerId, sentAt) index exists, and drop `order_by_sent_at` here.
    pub async fn open<B: StoreBackend>(store: &DocumentStore<B>, owner_id: &str) -> Result<Self> {
        if owner_id.is_empty() {
            return Err(Error::Validation("message stream needs an owner id".into()));
        }
        let options = QueryOptions::new().where_eq("ownerId", owner_id);
        let subscription = store.collection::<Message>().watch(&options).await?;
        tracing::debug!(owner_id, "message stream opened");
        Ok(Self { owner_id: owner_id.to_string(), subscription, messages: Vec::new() })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// The most recently delivered list, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Wait for the next push and replace the held list with it.
    ///
    /// `None` once the underlying subscription has ended. A failure is
    /// delivered once and leaves the last good list in place.
    pub async fn changed(&mut self) -> Option<Result<&[Message]>> {
        match self.subscription.next().await? {
            Ok(batch) => {
                self.messages = order_by_sent_at(batch);
                Some(Ok(&self.messages))
            }
            Err(e) => Some(Err(e)),
        }
    }

    pub fn cancel(&mut self) {
        self.subscription.cancel();
    }
}

// ============================================================================
// Sending
// ============================================================================

/// A message about to be sent. `status` defaults to `"sent"`, `sent_at`
/// to now.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub owner_id: String,
    pub content: String,
    pub kind: MessageKind,
    pub status: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl NewMessage {
    pub fn new(owner_id: impl Into<String>, content: impl Into<String>, kind: MessageKind) -> Self {
        Self { owner_id: owner_id.into(), content: content.into(), kind, status: None, sent_at: None }
    }

    pub fn at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = Some(sent_at);
        self
    }

    fn into_message(self) -> Result<Message> {
        if self.owner_id.trim().is_empty() {
            return Err(Error::Validation("message owner must not be empty".into()));
        }
        if self.content.trim().is_empty() {
            return Err(Error::Validation("message content must not be empty".into()));
        }
        Ok(Message {
            id: None,
            owner_id: self.owner_id,
            content: self.content,
            kind: self.kind,
            status: self.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            sent_at: self.sent_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Persist a message and return its generated id.
pub async fn send_message<B: StoreBackend>(store: &DocumentStore<B>, message: NewMessage) -> Result<String> {
    let message = message.into_message()?;
    let id = store.collection::<Message>().create(&message).await?;
    tracing::debug!(owner_id = %message.owner_id, id = %id, kind = %message.kind, "message sent");
    Ok(id)
}

/// Archive a conversation. Writes in place when it already has an id.
pub async fn save_conversation<B: StoreBackend>(
    store: &DocumentStore<B>,
    conversation: &Conversation,
) -> Result<String> {
    let collection = store.collection::<Conversation>();
    match &conversation.id {
        Some(id) => {
            collection.create_with_id(id, conversation).await?;
            Ok(id.clone())
        }
        None => collection.create(conversation).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 2, h, m, 0).unwrap()
    }

    fn msg(content: &str, sent_at: DateTime<Utc>) -> Message {
        Message {
            id: None,
            owner_id: "u1".into(),
            content: content.into(),
            kind: MessageKind::User,
            status: DEFAULT_STATUS.into(),
            sent_at,
        }
    }

    #[test]
    fn test_orders_by_sent_at() {
        let ordered = order_by_sent_at(vec![msg("c", at(10, 2)), msg("a", at(10, 0)), msg("b", at(10, 1))]);
        let contents: Vec<_> = ordered.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a", "b", "c"]);
    }

    #[test]
    fn test_ties_keep_delivered_order() {
        let ordered = order_by_sent_at(vec![msg("x", at(9, 0)), msg("first", at(8, 0)), msg("second", at(8, 0))]);
        let contents: Vec<_> = ordered.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "x"]);
    }

    #[test]
    fn test_new_message_defaults_and_validation() {
        let m = NewMessage::new("u1", "hola", MessageKind::Assistant).into_message().unwrap();
        assert_eq!(m.status, "sent");
        assert!(matches!(
            NewMessage::new("u1", "  ", MessageKind::User).into_message(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            NewMessage::new("", "hola", MessageKind::User).into_message(),
            Err(Error::Validation(_))
        ));
    }
}
