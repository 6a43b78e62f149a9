use super::DocumentStorageEngine;
use super::registry::CollectionSet;
use crate::core::entry::fields;
use crate::core::{Document, Entry, EntryHead, EntryKind, Result, StoreError, Value};
use crate::storage::{Projection, Query, Scan, Update, ValuePredicate};
use std::ops::ControlFlow;
use tracing::{debug, warn};

impl DocumentStorageEngine {
    pub(super) async fn get_value(&self, id: &str) -> Result<Option<Value>> {
        let set = self.registry.for_key(id).await?;
        let Some(doc) = set.entries.find_one(&by_key(id), None).await? else {
            return Ok(None);
        };

        let entry = Entry::from_document(doc)?;
        if entry.is_list {
            return Err(StoreError::wrong_kind(id, EntryKind::Value, EntryKind::List));
        }
        Ok(Some(entry.value))
    }

    pub(super) async fn upsert_value(&self, id: &str, patch: Value) -> Result<()> {
        let set = self.registry.for_key(id).await?;
        let projection = Projection::only(&[fields::LIST, fields::VALUE]);

        if let Some(doc) = set.entries.find_one(&by_key(id), Some(&projection)).await? {
            return self.patch_entry(&set, id, doc, patch).await;
        }

        let entry = Entry::new_value(id, patch);
        match set.entries.insert_one(entry.to_document()).await {
            Ok(_) => {
                debug!(key = id, "entry created");
                Ok(())
            }
            Err(err) if err.is_duplicate_key() => {
                warn!(key = id, "entry created concurrently, applying as update");
                let doc = set
                    .entries
                    .find_one(&by_key(id), Some(&projection))
                    .await?
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
                self.patch_entry(&set, id, doc, entry.value).await
            }
            Err(err) => Err(err),
        }
    }

    async fn patch_entry(
        &self,
        set: &CollectionSet,
        id: &str,
        mut doc: Document,
        patch: Value,
    ) -> Result<()> {
        let head = EntryHead::from_document(&doc)?;
        if head.kind == EntryKind::List {
            return Err(StoreError::wrong_kind(id, EntryKind::Value, EntryKind::List));
        }

        let current = doc.take(fields::VALUE).unwrap_or_default();
        let value = current.apply_patch(patch);
        set.entries
            .update_one(head.id, Update::set(fields::VALUE, value))
            .await?;
        debug!(key = id, "entry updated");
        Ok(())
    }

    /// Missing keys are a no-op; lists must go through `remove_list`.
    pub(super) async fn remove_value(&self, id: &str) -> Result<()> {
        let set = self.registry.for_key(id).await?;
        let Some(head) = self.head(&set, id).await? else {
            return Ok(());
        };
        if head.kind == EntryKind::List {
            return Err(StoreError::wrong_kind(id, EntryKind::Value, EntryKind::List));
        }

        set.entries.remove(&Query::by_id(head.id)).await?;
        debug!(key = id, "entry removed");
        Ok(())
    }

    /// Values under `namespace` accepted by `predicate`; stops at the first
    /// match when `first_only` is set.
    pub(super) async fn scan_values(
        &self,
        predicate: ValuePredicate<'_>,
        ids: Option<&[String]>,
        namespace: &str,
        first_only: bool,
    ) -> Result<Vec<Value>> {
        let mut query = Query::new()
            .contains(fields::NAMESPACES, namespace)
            .eq(fields::LIST, false);
        if let Some(ids) = ids {
            let keys = ids.iter().map(|id| Value::from(id.as_str())).collect();
            query = query.is_in(fields::KEY, keys);
        }

        let mut matches = Vec::new();
        for set in self.registry.for_namespace(namespace).await? {
            let scan = Scan::open(set.entries.as_ref(), &query).await?;
            scan.visit(|doc| {
                let entry = Entry::from_document(doc)?;
                if predicate(&entry.value) {
                    matches.push(entry.value);
                    if first_only {
                        return Ok(ControlFlow::Break(()));
                    }
                }
                Ok(ControlFlow::Continue(()))
            })
            .await?;

            if first_only && !matches.is_empty() {
                break;
            }
        }
        Ok(matches)
    }
}

fn by_key(key: &str) -> Query {
    Query::new().eq(fields::KEY, key)
}

#[cfg(test)]
mod tests {
    use crate::adapter::DocumentStorageEngine;
    use crate::config::EngineConfig;
    use crate::core::{EntryKind, StoreError, Value};
    use crate::storage::{MemoryDatabase, StorageEngine};
    use std::sync::Arc;

    async fn engine() -> (Arc<MemoryDatabase>, DocumentStorageEngine) {
        let db = Arc::new(MemoryDatabase::new());
        let engine = DocumentStorageEngine::initialize(db.clone(), EngineConfig::new())
            .await
            .unwrap();
        (db, engine)
    }

    #[tokio::test]
    async fn test_get_absent() {
        let (_, engine) = engine().await;
        assert_eq!(engine.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_creates_with_namespaces() {
        let (db, engine) = engine().await;
        engine.upsert("a.b.c", Value::from(1)).await.unwrap();

        let docs = db.memory_collection("raincache").await.documents().await;
        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].get("namespaces"),
            Some(&Value::Array(vec!["".into(), "a".into(), "a.b".into()]))
        );
        assert_eq!(docs[0].get("list"), Some(&Value::Boolean(false)));
    }

    #[tokio::test]
    async fn test_upsert_scalar_over_object_replaces() {
        let (_, engine) = engine().await;
        engine.upsert("k", Value::object([("a", 1)])).await.unwrap();
        engine.upsert("k", Value::from("flat")).await.unwrap();
        assert_eq!(engine.get("k").await.unwrap(), Some(Value::from("flat")));
    }

    #[tokio::test]
    async fn test_upsert_null_is_replaced() {
        let (_, engine) = engine().await;
        engine.upsert("k", Value::Null).await.unwrap();
        engine.upsert("k", Value::object([("a", 1)])).await.unwrap();
        assert_eq!(engine.get("k").await.unwrap(), Some(Value::object([("a", 1)])));
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let (_, engine) = engine().await;
        engine.remove("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_list_rejected() {
        let (_, engine) = engine().await;
        engine.add_to_list("l", "x".into()).await.unwrap();

        let err = engine.remove("l").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::WrongKind {
                expected: EntryKind::Value,
                actual: EntryKind::List,
                ..
            }
        ));
        assert_eq!(engine.get_list_count("l").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_filter_restricted_to_ids() {
        let (_, engine) = engine().await;
        for key in ["ns.a", "ns.b", "ns.c"] {
            engine.upsert(key, Value::from(key)).await.unwrap();
        }

        let ids = vec!["ns.a".to_string(), "ns.c".to_string(), "other.x".to_string()];
        let found = engine.filter(&|_| true, Some(ids.as_slice()), "ns").await.unwrap();
        assert_eq!(found, vec![Value::from("ns.a"), Value::from("ns.c")]);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let (db, engine) = engine().await;
        db.memory_collection("raincache")
            .await
            .fail_next_write("connection reset")
            .unwrap();

        let err = engine.upsert("k", Value::from(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(ref m) if m == "connection reset"));
        assert_eq!(engine.get("k").await.unwrap(), None);
    }
}
