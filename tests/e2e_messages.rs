//! End-to-end tests for the owner-scoped message stream.

use chrono::{DateTime, TimeZone, Utc};
use docstore::domain::collections;
use docstore::{
    fields, save_conversation, send_message, Conversation, DocumentStore, Error, Message,
    MessageKind, MessageStream, NewMessage, Value,
};
use pretty_assertions::assert_eq;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 2, h, m, 0).unwrap()
}

fn contents(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.content.as_str()).collect()
}

#[tokio::test]
async fn test_stream_is_owner_scoped_and_chronological() {
    let store = DocumentStore::open_memory();
    let mut stream = MessageStream::open(&store, "u1").await.unwrap();
    assert!(stream.changed().await.unwrap().unwrap().is_empty());

    send_message(&store, NewMessage::new("u1", "third", MessageKind::User).at(at(10, 2))).await.unwrap();
    assert_eq!(contents(stream.changed().await.unwrap().unwrap()), ["third"]);

    send_message(&store, NewMessage::new("u2", "not mine", MessageKind::User).at(at(9, 0))).await.unwrap();
    send_message(&store, NewMessage::new("u1", "first", MessageKind::Assistant).at(at(10, 0))).await.unwrap();
    assert_eq!(contents(stream.changed().await.unwrap().unwrap()), ["first", "third"]);

    send_message(&store, NewMessage::new("u1", "second", MessageKind::User).at(at(10, 1))).await.unwrap();
    assert_eq!(contents(stream.changed().await.unwrap().unwrap()), ["first", "second", "third"]);
    assert_eq!(contents(stream.messages()), ["first", "second", "third"]);
}

#[tokio::test]
async fn test_equal_timestamps_keep_backend_order() {
    let store = DocumentStore::open_memory();
    let t = at(12, 0);
    send_message(&store, NewMessage::new("u1", "a", MessageKind::User).at(t)).await.unwrap();
    send_message(&store, NewMessage::new("u1", "b", MessageKind::Assistant).at(t)).await.unwrap();

    let mut stream = MessageStream::open(&store, "u1").await.unwrap();
    assert_eq!(contents(stream.changed().await.unwrap().unwrap()), ["a", "b"]);
}

#[tokio::test]
async fn test_sent_message_defaults() {
    let store = DocumentStore::open_memory();
    let id = send_message(&store, NewMessage::new("u1", "hola", MessageKind::User)).await.unwrap();

    let stored = store.collection::<Message>().get(&id).await.unwrap().unwrap();
    assert_eq!(stored.id.as_deref(), Some(id.as_str()));
    assert_eq!(stored.status, "sent");
    assert_eq!(stored.kind, MessageKind::User);
}

#[tokio::test]
async fn test_empty_content_is_never_written() {
    let store = DocumentStore::open_memory();
    let err = send_message(&store, NewMessage::new("u1", "", MessageKind::User)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(store.backend().document_count(collections::MESSAGES), 0);
}

#[tokio::test]
async fn test_undecodable_message_fails_stream_once() {
    let store = DocumentStore::open_memory();
    let mut stream = MessageStream::open(&store, "u1").await.unwrap();
    stream.changed().await.unwrap().unwrap();

    store
        .create(collections::MESSAGES, fields([("ownerId", "u1"), ("content", "x"), ("kind", "robot")]))
        .await
        .unwrap();
    assert!(matches!(stream.changed().await, Some(Err(Error::Subscription(_)))));
    assert!(stream.changed().await.is_none());
    assert!(!stream.is_active());
    assert_eq!(store.backend().active_listeners(), 0);
}

#[tokio::test]
async fn test_cancel_stops_updates() {
    let store = DocumentStore::open_memory();
    let mut stream = MessageStream::open(&store, "u1").await.unwrap();
    stream.changed().await.unwrap().unwrap();
    stream.cancel();

    send_message(&store, NewMessage::new("u1", "late", MessageKind::User)).await.unwrap();
    assert!(stream.changed().await.is_none());
    assert!(stream.messages().is_empty());
}

#[tokio::test]
async fn test_conversation_archive_round_trip() {
    let store = DocumentStore::open_memory();
    let message = Message {
        id: None,
        owner_id: "u1".into(),
        content: "hola".into(),
        kind: MessageKind::User,
        status: "sent".into(),
        sent_at: at(10, 0),
    };
    let mut conversation = Conversation {
        id: None,
        owner_id: "u1".into(),
        title: Some("Intro".into()),
        created_at: at(10, 0),
        last_activity: at(10, 5),
        messages: vec![message],
    };

    let id = save_conversation(&store, &conversation).await.unwrap();
    conversation.id = Some(id.clone());
    let stored = store.collection::<Conversation>().get(&id).await.unwrap().unwrap();
    assert_eq!(stored, conversation);

    conversation.title = None;
    assert_eq!(save_conversation(&store, &conversation).await.unwrap(), id);
    let raw = store.get(collections::CONVERSATIONS, &id).await.unwrap().unwrap();
    assert_eq!(raw.get("title"), None::<&Value>);
}
