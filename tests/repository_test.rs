//! JSON file repository as feed and send provider

use std::fs;
use std::sync::Arc;

use conversation_sync::config::SyncConfig;
use conversation_sync::error::SyncError;
use conversation_sync::models::{AuthorKind, DeliveryState, Message, OutgoingMessage};
use conversation_sync::repository::{JsonFileRepository, MessageFeed, MessageSender};
use conversation_sync::SyncEngine;
use tempfile::tempdir;

#[tokio::test]
async fn test_missing_file_is_empty_conversation() {
    let dir = tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path());

    let messages = repo.fetch("conv-1").await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_fetch_reads_wire_format() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("conv-1.json"),
        r#"[
            {"id": "m1", "body": "hi, see example.com", "authorKind": "customer",
             "createdAt": "2024-05-01T09:30:00Z", "attachments": null},
            {"id": "m2", "body": "on it", "authorKind": "admin",
             "createdAt": "2024-05-01T09:31:00Z",
             "attachments": [{"name": "log.txt", "size": 2048, "url": "https://files.example.com/log.txt"}]}
        ]"#,
    )
    .unwrap();
    let repo = JsonFileRepository::new(dir.path());

    let messages = repo.fetch("conv-1").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].author_kind, AuthorKind::Customer);
    assert!(messages[0].attachments.is_empty());
    assert_eq!(messages[1].attachments[0].name, "log.txt");
    assert_eq!(messages[1].delivery_state, None);
}

#[tokio::test]
async fn test_corrupt_file_is_feed_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("conv-1.json"), "{not json").unwrap();
    let repo = JsonFileRepository::new(dir.path());

    let err = repo.fetch("conv-1").await.unwrap_err();
    assert!(matches!(err, SyncError::Feed { .. }));
}

#[tokio::test]
async fn test_invalid_id_never_touches_disk() {
    let dir = tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path());

    assert!(matches!(repo.fetch("../secret").await, Err(SyncError::InvalidInput(_))));
    assert!(matches!(
        repo.send("a/b", &OutgoingMessage::text("hi")).await,
        Err(SyncError::InvalidInput(_))
    ));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_send_appends_and_persists() {
    let dir = tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path().join("nested"));

    let first = repo.send("conv-1", &OutgoingMessage::text("first")).await.unwrap();
    let second = repo.send("conv-1", &OutgoingMessage::text("second")).await.unwrap();

    assert!(first.id.starts_with("msg-"));
    assert_ne!(first.id, second.id);
    assert_eq!(first.author_kind, AuthorKind::Admin);

    let stored = repo.fetch("conv-1").await.unwrap();
    let bodies: Vec<&str> = stored.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["first", "second"]);
}

#[tokio::test]
async fn test_concurrent_sends_are_serialized() {
    let dir = tempdir().unwrap();
    let repo = Arc::new(JsonFileRepository::new(dir.path()));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move {
                let draft = OutgoingMessage::text(format!("n{i}"));
                repo.send("conv-1", &draft).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(repo.fetch("conv-1").await.unwrap().len(), 8);
}

#[tokio::test]
async fn test_engine_round_trip_through_files() {
    let dir = tempdir().unwrap();
    let existing = vec![Message::new("m1", "hello", AuthorKind::Customer)];
    fs::write(
        dir.path().join("conv-1.json"),
        serde_json::to_string(&existing).unwrap(),
    )
    .unwrap();

    let repo = Arc::new(JsonFileRepository::new(dir.path()));
    let mut engine = SyncEngine::new(repo.clone(), repo.clone(), SyncConfig::default());
    engine.start("conv-1").await.unwrap();
    assert_eq!(engine.messages().len(), 1);

    let sent = engine.send(OutgoingMessage::text("reply")).await.unwrap();
    let local = engine.messages();
    assert!(local[1].id.starts_with("local-"));
    assert_eq!(local[1].server_id.as_deref(), Some(sent.id.as_str()));
    assert_eq!(local[1].delivery_state, Some(DeliveryState::Confirmed));

    // The stored copy supersedes the local one
    engine.refresh().await.unwrap();
    let after = engine.messages();
    let ids: Vec<&str> = after.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", sent.id.as_str()]);
    assert_eq!(after[1].delivery_state, None);
    engine.stop();
}
