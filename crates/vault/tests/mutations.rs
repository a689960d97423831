pub mod fixtures;

use fixtures::{ready_vault, visible};
use passio_vault::prelude::*;
use passio_vault::{
    Field, HistoryAction, HistoryOptions, HistoryTarget, PASSWORD_POOL, PropertyChange, PutOptions,
    RevertOptions,
};
use std::time::Duration;

#[tokio::test]
async fn create_then_rename_regenerates_the_password() {
    let (_, vault) = ready_vault().await;

    let created = vault
        .put(EntryDraft::new().description("Amazon").username("john").password("12345"))
        .await
        .unwrap();
    assert_eq!(vault.entries().len(), 1);
    assert_eq!(created.created, created.modified);
    assert!(!created.volatile);

    tokio::time::sleep(Duration::from_millis(5)).await;
    let renamed = vault
        .put(created.to_draft().username("mr_doe").password(""))
        .await
        .unwrap();

    assert_eq!(vault.entries().len(), 1);
    assert_eq!(renamed.username, "mr_doe");
    assert_ne!(renamed.password, "12345");
    assert!(!renamed.password.is_empty());
    assert!(renamed.modified > created.modified);
    assert_eq!(renamed.created, created.created);
}

#[tokio::test]
async fn missing_passwords_are_generated_from_the_pool() {
    let (_, vault) = ready_vault().await;

    for draft in [EntryDraft::new(), EntryDraft::new().password("")] {
        let entry = vault.put(draft).await.unwrap();
        assert_eq!(entry.password.chars().count(), 15);
        assert!(entry.password.chars().all(|c| PASSWORD_POOL.contains(&c)));
    }
}

#[tokio::test]
async fn editing_other_fields_keeps_modified() {
    let (_, vault) = ready_vault().await;
    let created = vault.put(EntryDraft::new().password("secret")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    let updated = vault.put(created.to_draft().url("https://example.com")).await.unwrap();

    assert_eq!(updated.modified, created.modified);
    assert_eq!(
        vault.undo_history().last(),
        Some(&HistoryAction::Update {
            id: created.id,
            properties: vec![PropertyChange {
                key: Field::Url,
                before: String::new(),
                after: "https://example.com".into(),
            }],
        })
    );
}

#[tokio::test]
async fn ids_are_never_reused() {
    let (_, vault) = ready_vault().await;
    let first = vault.put(EntryDraft::new()).await.unwrap();
    let second = vault.put(EntryDraft::new()).await.unwrap();
    vault.unput(second.id).await.unwrap();

    let third = vault.put(EntryDraft::new()).await.unwrap();
    assert_eq!((first.id, second.id, third.id), (1, 2, 3));
    assert_eq!(vault.document().next_id, 4);
}

#[tokio::test]
async fn unknown_ids_change_nothing() {
    let (store, vault) = ready_vault().await;
    vault.put(EntryDraft::new()).await.unwrap();
    let before = vault.document();
    let stores = store.store_count();

    let update = vault.put(EntryDraft::new().id(99).username("ghost")).await.unwrap_err();
    assert!(matches!(update, VaultError::EntryNotFound { id: 99, .. }));
    assert_eq!(vault.unput(99).await.unwrap_err().kind(), "EntryNotFound");

    assert_eq!(vault.document(), before);
    assert_eq!(store.store_count(), stores);
}

#[tokio::test]
async fn unchanged_updates_record_nothing() {
    let (store, vault) = ready_vault().await;
    let entry = vault.put(EntryDraft::new().password("pw")).await.unwrap();
    let stores = store.store_count();

    let same = vault.put(entry.to_draft()).await.unwrap();
    assert_eq!(same, entry);
    assert_eq!(vault.undo_history().len(), 1);
    assert_eq!(store.store_count(), stores);
}

#[tokio::test]
async fn force_create_keeps_the_requested_id() {
    let (_, vault) = ready_vault().await;
    vault.put(EntryDraft::new()).await.unwrap();

    let options = PutOptions { force_create: true, ..PutOptions::default() };
    let forced = vault.put_with(EntryDraft::new().id(10), options).await.unwrap();
    assert_eq!(forced.id, 10);
    assert_eq!(vault.document().next_id, 11);

    let duplicate = vault.put_with(EntryDraft::new().id(10), options).await.unwrap_err();
    assert_eq!(duplicate.kind(), "DuplicateEntry");
    assert_eq!(vault.entries().len(), 2);
}

#[tokio::test]
async fn returned_entries_are_copies() {
    let (_, vault) = ready_vault().await;
    let entry = vault.put(EntryDraft::new().username("john")).await.unwrap();

    let mut copy = vault.get(entry.id).unwrap();
    copy.username = "changed".into();
    let mut all = vault.entries();
    all.clear();

    assert_eq!(vault.get(entry.id).unwrap().username, "john");
    assert_eq!(vault.entries().len(), 1);
    assert!(vault.get(entry.id + 1).is_none());
}

#[tokio::test]
async fn undo_and_redo_of_a_create() {
    let (_, vault) = ready_vault().await;
    let before = visible(&vault.entries());
    vault.put(EntryDraft::new().description("Mail")).await.unwrap();
    let after = visible(&vault.entries());

    assert!(vault.undo().await.unwrap());
    assert_eq!(visible(&vault.entries()), before);
    assert!(vault.can_redo());

    assert!(vault.redo().await.unwrap());
    assert_eq!(visible(&vault.entries()), after);
    assert!(!vault.can_redo());
    assert!(vault.can_undo());
}

#[tokio::test]
async fn undo_and_redo_of_an_update() {
    let (_, vault) = ready_vault().await;
    let entry = vault.put(EntryDraft::new().description("old").password("one")).await.unwrap();
    let before = visible(&vault.entries());
    vault.put(entry.to_draft().description("new").password("two")).await.unwrap();
    let after = visible(&vault.entries());

    vault.undo().await.unwrap();
    assert_eq!(visible(&vault.entries()), before);

    vault.redo().await.unwrap();
    assert_eq!(visible(&vault.entries()), after);
}

#[tokio::test]
async fn undo_of_a_delete_restores_the_original_id() {
    let (_, vault) = ready_vault().await;
    vault.put(EntryDraft::new().username("john_doe")).await.unwrap();
    let snapshot = vault.entries();
    let id = snapshot[0].id;

    vault.unput(id).await.unwrap();
    assert!(vault.entries().is_empty());

    vault.undo().await.unwrap();
    let restored = vault.entries();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].username, "john_doe");
    assert_eq!(restored[0].id, id);
    assert_eq!(restored[0].created, snapshot[0].created);

    // Redo deletes it again, and undoing that restores the same id once more.
    vault.redo().await.unwrap();
    assert!(vault.entries().is_empty());
    vault.undo().await.unwrap();
    assert_eq!(vault.get(id).unwrap().username, "john_doe");
}

#[tokio::test]
async fn a_new_mutation_clears_the_redo_log() {
    let (_, vault) = ready_vault().await;
    vault.put(EntryDraft::new()).await.unwrap();
    vault.put(EntryDraft::new()).await.unwrap();
    vault.undo().await.unwrap();
    assert!(vault.can_redo());

    vault.put(EntryDraft::new()).await.unwrap();
    assert!(!vault.can_redo());
    assert!(!vault.redo().await.unwrap());
}

#[tokio::test]
async fn empty_logs_are_no_ops() {
    let (store, vault) = ready_vault().await;
    assert!(!vault.can_undo());
    assert!(!vault.undo().await.unwrap());
    assert!(!vault.redo().await.unwrap());
    assert_eq!(store.store_count(), 1);
}

#[tokio::test]
async fn failed_undo_keeps_the_action() {
    let (_, vault) = ready_vault().await;
    vault
        .add_history(HistoryAction::Create { id: 42 }, HistoryOptions::default())
        .unwrap();

    let err = vault.undo().await.unwrap_err();
    assert_eq!(err.kind(), "EntryNotFound");
    assert_eq!(vault.undo_history(), [HistoryAction::Create { id: 42 }]);
    assert!(vault.redo_history().is_empty());
}

#[tokio::test]
async fn add_history_targets_and_redo_invalidation() {
    let (_, vault) = ready_vault().await;
    let redo = HistoryOptions { target: HistoryTarget::Redo, keep_redo: true };
    vault.add_history(HistoryAction::Create { id: 1 }, redo).unwrap();
    assert_eq!(vault.redo_history().len(), 1);

    vault.add_history(HistoryAction::Create { id: 2 }, HistoryOptions::default()).unwrap();
    assert_eq!(vault.undo_history(), [HistoryAction::Create { id: 2 }]);
    assert!(vault.redo_history().is_empty());
}

#[tokio::test]
async fn revert_records_the_inverse_in_the_chosen_log() {
    let (_, vault) = ready_vault().await;
    let entry = vault.put(EntryDraft::new().username("john")).await.unwrap();

    let options = RevertOptions { target: HistoryTarget::Redo, ..RevertOptions::default() };
    vault.revert(HistoryAction::Create { id: entry.id }, options).await.unwrap();

    assert!(vault.entries().is_empty());
    assert_eq!(vault.undo_history(), [HistoryAction::Create { id: entry.id }]);
    assert!(matches!(
        vault.redo_history().as_slice(),
        [HistoryAction::Delete { entry: deleted }] if deleted.username == "john"
    ));
}
