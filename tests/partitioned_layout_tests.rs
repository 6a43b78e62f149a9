/// Partitioned layout tests
///
/// Per-namespace collections resolved through the engine's own registry
/// Run with: cargo test --test partitioned_layout_tests
use rainstore::{
    CollectionLayout, Database, DocumentStorageEngine, EngineConfig, MemoryDatabase, StorageEngine,
    StoreError, Value,
};
use std::sync::Arc;

async fn setup(config: EngineConfig) -> (Arc<MemoryDatabase>, DocumentStorageEngine) {
    let db = Arc::new(MemoryDatabase::new());
    let engine = DocumentStorageEngine::initialize(db.clone(), config)
        .await
        .unwrap();
    (db, engine)
}

#[tokio::test]
async fn test_entries_land_in_partition_collections() {
    let (db, engine) = setup(EngineConfig::new().layout(CollectionLayout::Partitioned)).await;

    engine.upsert("users.1", Value::from("ada")).await.unwrap();
    engine.upsert("guilds.1", Value::from("g")).await.unwrap();
    engine.add_to_list("users.online", "users.1".into()).await.unwrap();

    assert_eq!(db.memory_collection("raincache_users").await.len().await, 2);
    assert_eq!(db.memory_collection("raincache_guilds").await.len().await, 1);
    assert_eq!(db.memory_collection("raincachelists_users").await.len().await, 1);
    assert_eq!(engine.partitions().await, vec!["users", "guilds"]);
}

#[tokio::test]
async fn test_preregistered_partitions() {
    let (db, engine) = setup(EngineConfig::new().partition("users").partition("guilds")).await;

    assert_eq!(engine.partitions().await, vec!["users", "guilds"]);
    let names = db.collection_names().await.unwrap();
    assert!(names.contains(&"raincache_guilds".to_string()));
    assert!(names.contains(&"raincachelists_users".to_string()));
}

#[tokio::test]
async fn test_namespace_scan_stays_in_partition() {
    let (_, engine) = setup(EngineConfig::new().layout(CollectionLayout::Partitioned)).await;
    engine.upsert("users.1", Value::from(1)).await.unwrap();
    engine.upsert("users.admins.2", Value::from(2)).await.unwrap();
    engine.upsert("guilds.1", Value::from(3)).await.unwrap();

    let all = |_: &Value| true;
    assert_eq!(
        engine.filter(&all, None, "users").await.unwrap(),
        vec![Value::from(1), Value::from(2)]
    );
    assert_eq!(
        engine.filter(&all, None, "users.admins").await.unwrap(),
        vec![Value::from(2)]
    );
    assert_eq!(engine.find(&all, None, "guilds").await.unwrap(), Some(Value::from(3)));
}

#[tokio::test]
async fn test_root_scan_spans_partitions() {
    let (db, engine) = setup(EngineConfig::new().layout(CollectionLayout::Partitioned)).await;
    engine.upsert("users.1", Value::from(1)).await.unwrap();
    engine.upsert("guilds.1", Value::from(2)).await.unwrap();
    engine.upsert("solo", Value::from(3)).await.unwrap();

    let found = engine.filter(&|_| true, None, "").await.unwrap();
    assert_eq!(found, vec![Value::from(1), Value::from(2), Value::from(3)]);

    let first = engine
        .find(&|v| v.as_i64() == Some(2), None, "")
        .await
        .unwrap();
    assert_eq!(first, Some(Value::from(2)));
    assert_eq!(db.cursor_stats().open(), 0);
}

#[tokio::test]
async fn test_same_suffix_keys_do_not_collide() {
    let (_, engine) = setup(EngineConfig::new().layout(CollectionLayout::Partitioned)).await;

    engine.upsert("a.k", Value::from("in a")).await.unwrap();
    engine.add_to_list("b.k", "in b".into()).await.unwrap();

    assert_eq!(engine.get("a.k").await.unwrap(), Some(Value::from("in a")));
    assert!(matches!(engine.get("b.k").await, Err(StoreError::WrongKind { .. })));
    assert!(matches!(
        engine.get_list_count("a.k").await,
        Err(StoreError::WrongKind { .. })
    ));
}

#[tokio::test]
async fn test_root_scan_after_restart_sees_stored_partitions() {
    let (db, first) = setup(EngineConfig::new().layout(CollectionLayout::Partitioned)).await;
    first.upsert("users.1", Value::from(1)).await.unwrap();
    first.upsert("guilds.1", Value::from(2)).await.unwrap();
    first.add_to_list("users.online", "users.1".into()).await.unwrap();
    drop(first);

    let restarted = DocumentStorageEngine::initialize(
        db.clone(),
        EngineConfig::new().layout(CollectionLayout::Partitioned),
    )
    .await
    .unwrap();
    assert!(restarted.partitions().await.is_empty());

    let mut found: Vec<i64> = restarted
        .filter(&|_| true, None, "")
        .await
        .unwrap()
        .iter()
        .filter_map(Value::as_i64)
        .collect();
    found.sort();
    assert_eq!(found, vec![1, 2]);
    assert_eq!(
        restarted.find(&|v| v.as_i64() == Some(2), None, "").await.unwrap(),
        Some(Value::from(2))
    );
    assert_eq!(restarted.partitions().await, vec!["guilds", "users"]);
    assert_eq!(db.cursor_stats().open(), 0);
}
