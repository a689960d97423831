pub mod fixtures;

use fixtures::config;
use passio_vault::prelude::*;

#[tokio::test]
async fn sessions_are_independent_per_username() {
    let registry = SessionRegistry::new(MemoryPersistence::new(), config());
    let alice = registry.open("alice", "alice's secret").await.unwrap();
    let bob = registry.open("bob", "bob's secret").await.unwrap();

    alice.put(EntryDraft::new().description("alice only")).await.unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.usernames(), ["alice", "bob"]);
    assert!(bob.entries().is_empty());
    assert_eq!(registry.get("alice").unwrap().entries().len(), 1);
    assert_ne!(alice.authorization_token().unwrap(), bob.authorization_token().unwrap());
}

#[tokio::test]
async fn reopening_replaces_the_session() {
    let registry = SessionRegistry::new(MemoryPersistence::new(), config());
    let first = registry.open("alice", "secret").await.unwrap();
    first.put(EntryDraft::new().description("kept")).await.unwrap();

    let second = registry.open("alice", "secret").await.unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(second.entries().len(), 1);

    // The registry hands out the new session, not the old one.
    second.put(EntryDraft::new()).await.unwrap();
    assert_eq!(registry.get("alice").unwrap().entries().len(), 2);
    assert_eq!(first.entries().len(), 1);
}

#[tokio::test]
async fn failed_open_leaves_the_registry_unchanged() {
    let registry = SessionRegistry::new(MemoryPersistence::new(), config());
    registry.open("alice", "secret").await.unwrap();

    let err = registry.open("alice", "wrong").await.unwrap_err();
    assert_eq!(err.kind(), "DecryptionFailed");
    assert!(registry.get("alice").unwrap().is_ready());

    let err = registry.open("", "secret").await.unwrap_err();
    assert_eq!(err.kind(), "InvalidConfiguration");
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn clear_and_remove_close_sessions() {
    let registry = SessionRegistry::new(MemoryPersistence::new(), config());
    for name in ["a", "b", "c"] {
        registry.open(name, "secret").await.unwrap();
    }

    assert!(registry.remove("b").is_some());
    assert!(registry.remove("b").is_none());
    assert_eq!(registry.clear(), 2);
    assert!(registry.is_empty());
    assert!(registry.get("a").is_none());

    // Stored vaults survive logout.
    assert!(registry.persistence().value("a").is_some());
}
