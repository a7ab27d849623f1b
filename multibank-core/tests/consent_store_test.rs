//! Consent store persistence under concurrent writers
//!
//! Run with: cargo test --test consent_store_test

use std::sync::Arc;

use tempfile::TempDir;

use multibank_core::adapters::consent_store::{consent_file_name, ConsentStore};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_customers_all_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(consent_file_name("vbank"));
    let store = Arc::new(ConsentStore::open(&path));

    let mut handles = Vec::new();
    for i in 0..50 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let customer = format!("team-{}", i);
            store.insert(&customer, &format!("consent-{}", i)).await?;
            if i % 5 == 0 {
                store.remove(&customer).await?;
            }
            Ok::<_, multibank_core::Error>(())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let on_disk = ConsentStore::load(&path);
    assert_eq!(on_disk.len(), 40);
    assert!(!on_disk.contains_key("team-0"));
    assert_eq!(on_disk.get("team-1").map(String::as_str), Some("consent-1"));
    assert_eq!(on_disk, store.snapshot().await);
}

#[tokio::test]
async fn test_file_is_flat_string_map() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(consent_file_name("abank"));

    let store = ConsentStore::open(&path);
    store.insert("team-1", "c-1").await.unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value, serde_json::json!({ "team-1": "c-1" }));
}

#[tokio::test]
async fn test_no_temp_files_left_behind() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(consent_file_name("sbank"));

    let store = ConsentStore::open(&path);
    for i in 0..10 {
        store.insert(&format!("team-{}", i), "c").await.unwrap();
    }

    let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}
