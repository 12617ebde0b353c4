//! Integration tests for local override stores through the port trait.

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use ivy_core::LocalOverrideStore;
use ivy_domain::FlagValue;
use ivy_infra::InMemoryOverrideStore;

async fn exercise_store(store: Arc<dyn LocalOverrideStore>) {
    assert!(store.load_all().await.expect("load").is_empty());

    store.set("dark_mode_v2", &FlagValue::Bool(true)).await.expect("set");
    store.set("home_balance_style", &FlagValue::from("compact")).await.expect("set");
    store.set("home_balance_style", &FlagValue::from("hidden")).await.expect("overwrite");

    let all = store.load_all().await.expect("load");
    assert_eq!(all.len(), 2);
    assert_eq!(all.get("home_balance_style"), Some(&FlagValue::from("hidden")));

    assert!(store.remove("dark_mode_v2").await.expect("remove"));
    assert!(!store.remove("dark_mode_v2").await.expect("remove again"));
    assert_eq!(store.load_all().await.expect("load").len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sqlite_store_contract() {
    let test_store = support::TestStore::new();
    exercise_store(test_store.store.clone()).await;
}

#[tokio::test]
async fn test_in_memory_store_contract() {
    exercise_store(Arc::new(InMemoryOverrideStore::new())).await;
}

/// Tests that concurrent writers on one SQLite store do not lose updates.
#[tokio::test(flavor = "multi_thread")]
async fn test_sqlite_concurrent_writes() {
    let test_store = support::TestStore::new();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&test_store.store);
        tasks.push(tokio::spawn(async move {
            store.set(&format!("flag_{i:02}"), &FlagValue::Bool(i % 2 == 0)).await
        }));
    }
    for task in futures::future::join_all(tasks).await {
        task.expect("task should not panic").expect("write should succeed");
    }

    let all = test_store.reopen().load_all().await.expect("load");
    assert_eq!(all.len(), 16);
    assert_eq!(all.get("flag_03"), Some(&FlagValue::Bool(false)));
}
