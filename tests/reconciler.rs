// tests/reconciler.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use retail_ledger::api::memory::StoreCall;
use retail_ledger::api::{MemoryStore, Resource};
use retail_ledger::editing::{EditOutcome, EditableTable, Notice, RecordingNotifier};
use retail_ledger::models::{EditableRecord, FieldValue};
use retail_ledger::views::{LoadState, ProductsView};
use tokio::time::Instant;

async fn products(store: Arc<MemoryStore>) -> (ProductsView, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut view = ProductsView::new(store, notifier.clone());
    assert_eq!(view.load().await, LoadState::Ready);
    (view, notifier)
}

fn sent_names(store: &MemoryStore) -> Vec<FieldValue> {
    store
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            StoreCall::PartialUpdate { field, value, .. } if field == "name" => Some(value),
            _ => None,
        })
        .collect()
}

async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn saved_flag_clears_after_two_seconds() {
    let store = common::seeded_store();
    let (view, notifier) = products(store.clone()).await;

    let outcome = view.apply_edit(1, "stock_quantity", "7").await;

    assert_eq!(outcome, EditOutcome::Saved);
    assert_eq!(view.table().value(1, "stock_quantity"), Some(FieldValue::text("7")));
    assert_eq!(store.row(Resource::Products, 1).unwrap()["stock_quantity"], "7");
    assert!(view.table().is_recently_saved(1));
    assert!(notifier.snapshot().is_empty());

    tokio::time::sleep(Duration::from_millis(1999)).await;
    settle().await;
    assert!(view.table().is_recently_saved(1));

    tokio::time::sleep(Duration::from_millis(1)).await;
    settle().await;
    assert!(!view.table().is_recently_saved(1));
}

#[tokio::test(start_paused = true)]
async fn a_second_save_rearms_the_flag() {
    let store = common::seeded_store();
    let (view, _) = products(store).await;

    assert_eq!(view.apply_edit(1, "name", "Big Mug").await, EditOutcome::Saved);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(view.apply_edit(1, "name", "Huge Mug").await, EditOutcome::Saved);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    settle().await;
    assert!(view.table().is_recently_saved(1));

    tokio::time::sleep(Duration::from_millis(1000)).await;
    settle().await;
    assert!(!view.table().is_recently_saved(1));
}

#[tokio::test]
async fn rejected_edit_rolls_back_and_notifies() {
    let store = common::seeded_store();
    let (view, notifier) = products(store.clone()).await;
    store.set_fail_updates(true);

    let outcome = view.apply_edit(1, "name", "Broken").await;

    assert_eq!(outcome, EditOutcome::RolledBack);
    assert_eq!(view.table().value(1, "name"), Some(FieldValue::text("Mug")));
    assert_eq!(store.row(Resource::Products, 1).unwrap()["name"], "Mug");
    assert!(!view.table().is_recently_saved(1));
    assert_eq!(notifier.take(), vec![Notice::UpdateFailed]);
}

#[tokio::test]
async fn confirming_an_equal_value_sends_nothing() {
    let store = common::seeded_store();
    let (view, _) = products(store.clone()).await;
    let table = view.table();

    table.activate(1, "stock_quantity").unwrap();
    table.input("4");
    assert!(table.confirm().is_none());

    table.activate(1, "name").unwrap();
    table.input("Mug");
    assert!(table.blur().is_none());

    assert_eq!(store.update_calls(), 0);
    assert!(table.editing().is_none());
}

#[tokio::test]
async fn blur_commits_like_confirm() {
    let store = common::seeded_store();
    let (view, _) = products(store.clone()).await;
    let table = view.table();

    table.activate(2, "name").unwrap();
    table.input("Tea Cup");
    let save = table.blur().expect("draft differs");

    assert_eq!(table.value(2, "name"), Some(FieldValue::text("Tea Cup")));
    assert_eq!(save.await.unwrap(), EditOutcome::Saved);
    assert_eq!(store.row(Resource::Products, 2).unwrap()["name"], "Tea Cup");
}

#[tokio::test(start_paused = true)]
async fn edits_to_one_cell_go_out_in_order() {
    let store = common::seeded_store();
    let (view, _) = products(store.clone()).await;
    store.set_latency(Some(Duration::from_millis(100)));
    let table = view.table();
    let started = Instant::now();

    table.activate(1, "name").unwrap();
    table.input("A");
    let first = table.confirm().unwrap();
    table.activate(1, "name").unwrap();
    table.input("B");
    let second = table.confirm().unwrap();

    assert_eq!(table.value(1, "name"), Some(FieldValue::text("B")));
    assert_eq!(first.await.unwrap(), EditOutcome::Saved);
    assert_eq!(second.await.unwrap(), EditOutcome::Saved);

    // one request at a time
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(sent_names(&store), vec![FieldValue::text("A"), FieldValue::text("B")]);
    assert_eq!(store.row(Resource::Products, 1).unwrap()["name"], "B");
    assert_eq!(table.value(1, "name"), Some(FieldValue::text("B")));
}

#[tokio::test(start_paused = true)]
async fn stale_failure_does_not_undo_a_newer_edit() {
    let store = common::seeded_store();
    let (view, notifier) = products(store.clone()).await;
    store.set_latency(Some(Duration::from_millis(100)));
    store.set_fail_updates(true);
    let table = view.table();

    table.activate(1, "name").unwrap();
    table.input("A");
    let first = table.confirm().unwrap();
    table.activate(1, "name").unwrap();
    table.input("B");
    let second = table.confirm().unwrap();

    // the first request fails at 100ms; the second is answered at 200ms
    tokio::time::sleep(Duration::from_millis(150)).await;
    store.set_fail_updates(false);

    assert_eq!(first.await.unwrap(), EditOutcome::Superseded);
    assert_eq!(table.value(1, "name"), Some(FieldValue::text("B")));
    assert_eq!(second.await.unwrap(), EditOutcome::Saved);

    assert_eq!(table.value(1, "name"), Some(FieldValue::text("B")));
    assert_eq!(store.row(Resource::Products, 1).unwrap()["name"], "B");
    assert_eq!(notifier.take(), vec![Notice::UpdateFailed]);
}

#[tokio::test(start_paused = true)]
async fn latest_failure_restores_last_confirmed_value() {
    let store = common::seeded_store();
    let (view, _) = products(store.clone()).await;
    store.set_latency(Some(Duration::from_millis(100)));
    store.set_fail_updates(true);
    let table = view.table();

    table.activate(1, "name").unwrap();
    table.input("A");
    let first = table.confirm().unwrap();
    table.activate(1, "name").unwrap();
    table.input("B");
    let second = table.confirm().unwrap();

    assert_eq!(first.await.unwrap(), EditOutcome::Superseded);
    assert_eq!(second.await.unwrap(), EditOutcome::RolledBack);
    assert_eq!(table.value(1, "name"), Some(FieldValue::text("Mug")));
}

#[tokio::test(start_paused = true)]
async fn failure_after_refresh_keeps_refreshed_rows() {
    let store = Arc::new(MemoryStore::new());
    store.insert(Resource::Expenses, serde_json::json!({ "id": 1, "description": "Rent", "amount": "100.00" }));
    store.set_latency(Some(Duration::from_millis(100)));
    store.set_fail_updates(true);
    let notifier = Arc::new(RecordingNotifier::new());
    let table = EditableTable::new(Resource::Expenses, store.clone(), notifier.clone());
    table.replace_records(vec![EditableRecord::new(1).with_field("description", "Rent")]);

    let edit = {
        let table = table.clone();
        tokio::spawn(async move { table.apply_edit(1, "description", FieldValue::text("Office rent")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(table.value(1, "description"), Some(FieldValue::text("Office rent")));

    table.replace_records(vec![EditableRecord::new(1).with_field("description", "Rent (June)")]);

    assert_eq!(edit.await.unwrap(), EditOutcome::Superseded);
    assert_eq!(table.value(1, "description"), Some(FieldValue::text("Rent (June)")));
    assert_eq!(notifier.take(), vec![Notice::UpdateFailed]);
}

#[tokio::test]
async fn edits_to_different_cells_are_independent() {
    let store = common::seeded_store();
    let (view, _) = products(store.clone()).await;

    let (a, b) = tokio::join!(
        view.apply_edit(1, "name", "Big Mug"),
        view.apply_edit(2, "stock_quantity", 0.0),
    );

    assert_eq!((a, b), (EditOutcome::Saved, EditOutcome::Saved));
    assert_eq!(store.row(Resource::Products, 2).unwrap()["stock_quantity"], 0);
    assert_eq!(store.update_calls(), 2);
}
