use passio_storage::*;
use tempfile::TempDir;

async fn records(temp: &TempDir) -> RecordStore {
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();
    RecordStore::new(&storage).unwrap()
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let temp = TempDir::new().unwrap();
    let store = records(&temp).await;

    let err = store.load("nobody").await.unwrap_err();
    assert!(matches!(err, StorageError::FileNotFound { .. }));
    assert!(!store.contains("nobody").unwrap());
}

#[tokio::test]
async fn first_token_is_trusted_and_enforced() {
    let temp = TempDir::new().unwrap();
    let store = records(&temp).await;

    store.save("alice", "v1", Some("token-a")).await.unwrap();
    store.save("alice", "v2", Some("token-a")).await.unwrap();
    assert_eq!(store.load("alice").await.unwrap(), "v2");

    let wrong = store.save("alice", "v3", Some("token-b")).await.unwrap_err();
    let missing = store.save("alice", "v3", None).await.unwrap_err();
    assert_eq!(wrong.kind(), "Unauthorized");
    assert_eq!(missing.kind(), "Unauthorized");
    assert_eq!(store.load("alice").await.unwrap(), "v2");
}

#[tokio::test]
async fn records_are_isolated_per_key() {
    let temp = TempDir::new().unwrap();
    let store = records(&temp).await;

    store.save("alice", "a", Some("token-a")).await.unwrap();
    store.save("bob", "b", Some("token-b")).await.unwrap();

    assert_eq!(store.load("alice").await.unwrap(), "a");
    assert_eq!(store.load("bob").await.unwrap(), "b");
}

#[tokio::test]
async fn keys_never_appear_in_file_names() {
    let temp = TempDir::new().unwrap();
    let store = records(&temp).await;

    store.save("../../etc/passwd", "x", None).await.unwrap();
    assert_eq!(store.load("../../etc/passwd").await.unwrap(), "x");

    let stem = RecordStore::stem("../../etc/passwd");
    assert_eq!(stem.len(), 64);
    let shard = temp.path().canonicalize().unwrap().join("records").join(&stem[..2]).join(&stem[2..4]);
    assert!(shard.join(format!("{stem}.vault")).is_file());
}

#[tokio::test]
async fn remove_requires_the_registered_token() {
    let temp = TempDir::new().unwrap();
    let store = records(&temp).await;

    store.save("alice", "a", Some("token-a")).await.unwrap();
    assert_eq!(store.remove("alice", Some("nope")).await.unwrap_err().kind(), "Unauthorized");

    store.remove("alice", Some("token-a")).await.unwrap();
    assert!(!store.contains("alice").unwrap());

    // With the token gone the key can be claimed again.
    store.save("alice", "fresh", Some("token-c")).await.unwrap();
    assert_eq!(store.load("alice").await.unwrap(), "fresh");
}

#[tokio::test]
async fn non_utf8_record_is_corrupt() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();
    let store = RecordStore::new(&storage).unwrap();

    let file = format!("{}.vault", RecordStore::stem("alice"));
    storage.namespace("records").unwrap().write(&file, &[0xFF, 0xFE]).await.unwrap();

    assert_eq!(store.load("alice").await.unwrap_err().kind(), "CorruptRecord");
}
