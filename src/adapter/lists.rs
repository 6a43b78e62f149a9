use super::DocumentStorageEngine;
use super::registry::CollectionSet;
use crate::core::entry::fields;
use crate::core::{DocumentId, Entry, ListElement, Result, StoreError, Value};
use crate::storage::{Query, Scan};
use tracing::{debug, warn};

impl DocumentStorageEngine {
    /// Collections and owner id of the list at `list_id`.
    async fn list_owner(&self, list_id: &str) -> Result<(CollectionSet, DocumentId)> {
        let set = self.registry.for_key(list_id).await?;
        let owner = self
            .head(&set, list_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(list_id.to_string()))?
            .expect_list(list_id)?;
        Ok((set, owner))
    }

    async fn create_list(&self, set: &CollectionSet, list_id: &str) -> Result<DocumentId> {
        match set.entries.insert_one(Entry::new_list(list_id).to_document()).await {
            Ok(id) => {
                debug!(key = list_id, "list created");
                Ok(id)
            }
            Err(err) if err.is_duplicate_key() => {
                warn!(key = list_id, "list created concurrently, reusing it");
                self.head(set, list_id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(list_id.to_string()))?
                    .expect_list(list_id)
            }
            Err(err) => Err(err),
        }
    }

    pub(super) async fn list_members(&self, list_id: &str) -> Result<Vec<Value>> {
        let (set, owner) = self.list_owner(list_id).await?;
        let docs = Scan::open(set.lists.as_ref(), &by_owner(owner))
            .await?
            .collect()
            .await?;

        docs.into_iter()
            .map(|doc| ListElement::from_document(doc).map(|element| element.value))
            .collect()
    }

    /// Insert the values not yet in the list, first occurrence wins.
    pub(super) async fn append_members(&self, list_id: &str, values: Vec<Value>) -> Result<()> {
        let set = self.registry.for_key(list_id).await?;
        let owner = match self.head(&set, list_id).await? {
            Some(head) => head.expect_list(list_id)?,
            None => self.create_list(&set, list_id).await?,
        };
        if values.is_empty() {
            return Ok(());
        }

        let existing = Scan::open(
            set.lists.as_ref(),
            &by_owner(owner).is_in(fields::VALUE, values.clone()),
        )
        .await?
        .collect()
        .await?;

        let mut seen = existing
            .into_iter()
            .map(|doc| ListElement::from_document(doc).map(|element| element.value))
            .collect::<Result<Vec<_>>>()?;
        let mut novel = Vec::new();
        for value in values {
            if !seen.contains(&value) {
                seen.push(value.clone());
                novel.push(value);
            }
        }

        if novel.is_empty() {
            debug!(key = list_id, "all members already present");
            return Ok(());
        }

        let docs = novel
            .iter()
            .map(|value| ListElement::new(owner, value.clone()).to_document())
            .collect();
        match set.lists.insert_many(docs).await {
            Ok(ids) => {
                debug!(key = list_id, inserted = ids.len(), "list members added");
                Ok(())
            }
            Err(err) if err.is_duplicate_key() => {
                warn!(key = list_id, "member added concurrently, inserting one by one");
                self.insert_each(&set, list_id, owner, novel).await
            }
            Err(err) => Err(err),
        }
    }

    // Unique-index fallback: members another writer already added are skipped.
    async fn insert_each(
        &self,
        set: &CollectionSet,
        list_id: &str,
        owner: DocumentId,
        values: Vec<Value>,
    ) -> Result<()> {
        let mut inserted = 0;
        for value in values {
            match set
                .lists
                .insert_one(ListElement::new(owner, value).to_document())
                .await
            {
                Ok(_) => inserted += 1,
                Err(err) if err.is_duplicate_key() => continue,
                Err(err) => return Err(err),
            }
        }
        debug!(key = list_id, inserted, "list members added");
        Ok(())
    }

    pub(super) async fn has_member(&self, list_id: &str, value: &Value) -> Result<bool> {
        let (set, owner) = self.list_owner(list_id).await?;
        let count = set
            .lists
            .count(&by_owner(owner).eq(fields::VALUE, value.clone()))
            .await?;
        Ok(count > 0)
    }

    pub(super) async fn remove_member(&self, list_id: &str, value: &Value) -> Result<()> {
        let (set, owner) = self.list_owner(list_id).await?;
        let removed = set
            .lists
            .remove(&by_owner(owner).eq(fields::VALUE, value.clone()))
            .await?;
        debug!(key = list_id, removed, "list member removed");
        Ok(())
    }

    /// Members go first; a failure in between leaves an empty list behind.
    pub(super) async fn drop_list(&self, list_id: &str) -> Result<()> {
        let (set, owner) = self.list_owner(list_id).await?;
        let removed = set.lists.remove(&by_owner(owner)).await?;
        set.entries.remove(&Query::by_id(owner)).await?;
        debug!(key = list_id, removed, "list removed");
        Ok(())
    }

    pub(super) async fn member_count(&self, list_id: &str) -> Result<u64> {
        let (set, owner) = self.list_owner(list_id).await?;
        set.lists.count(&by_owner(owner)).await
    }
}

fn by_owner(owner: DocumentId) -> Query {
    Query::new().eq(fields::LIST_ID, owner)
}

#[cfg(test)]
mod tests {
    use crate::adapter::DocumentStorageEngine;
    use crate::config::EngineConfig;
    use crate::core::{EntryKind, StoreError, Value};
    use crate::storage::{Members, MemoryDatabase, StorageEngine};
    use std::sync::Arc;

    async fn engine() -> (Arc<MemoryDatabase>, DocumentStorageEngine) {
        let db = Arc::new(MemoryDatabase::new());
        let engine = DocumentStorageEngine::initialize(db.clone(), EngineConfig::new())
            .await
            .unwrap();
        (db, engine)
    }

    #[tokio::test]
    async fn test_list_ops_on_missing_key() {
        let (_, engine) = engine().await;
        let x = Value::from("x");

        assert!(matches!(
            engine.get_list_members("l").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            engine.is_list_member("l", &x).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            engine.remove_from_list("l", &x).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            engine.remove_list("l").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            engine.get_list_count("l").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_ops_on_value() {
        let (_, engine) = engine().await;
        engine.upsert("v", Value::from(1)).await.unwrap();

        let err = engine.add_to_list("v", "x".into()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::WrongKind {
                expected: EntryKind::List,
                actual: EntryKind::Value,
                ..
            }
        ));
        assert!(matches!(
            engine.get_list_count("v").await,
            Err(StoreError::WrongKind { .. })
        ));
        assert_eq!(engine.get("v").await.unwrap(), Some(Value::from(1)));
    }

    #[tokio::test]
    async fn test_add_empty_creates_list() {
        let (_, engine) = engine().await;
        engine
            .add_to_list("l", Members::Many(Vec::new()))
            .await
            .unwrap();

        assert_eq!(engine.get_list_count("l").await.unwrap(), 0);
        assert!(engine.get_list_members("l").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_members_keep_insertion_order() {
        let (_, engine) = engine().await;
        engine.add_to_list("l", vec!["c", "a"].into()).await.unwrap();
        engine.add_to_list("l", vec!["a", "b", "c", "d"].into()).await.unwrap();

        let members = engine.get_list_members("l").await.unwrap();
        assert_eq!(members, vec![Value::from("c"), "a".into(), "b".into(), "d".into()]);
    }

    #[tokio::test]
    async fn test_structured_members_dedup() {
        let (_, engine) = engine().await;
        let member = Value::object([("id", 1)]);
        engine.add_to_list("l", member.clone().into()).await.unwrap();
        engine.add_to_list("l", member.clone().into()).await.unwrap();

        assert_eq!(engine.get_list_count("l").await.unwrap(), 1);
        assert!(engine.is_list_member("l", &member).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_list_deletes_members() {
        let (db, engine) = engine().await;
        engine.add_to_list("a", vec!["1", "2"].into()).await.unwrap();
        engine.add_to_list("b", "1".into()).await.unwrap();

        engine.remove_list("a").await.unwrap();

        let lists = db.memory_collection("raincachelists").await;
        assert_eq!(lists.len().await, 1);
        assert_eq!(engine.get_list_members("b").await.unwrap(), vec![Value::from("1")]);
        assert_eq!(engine.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_member_insert_leaves_empty_list() {
        let (db, engine) = engine().await;
        db.memory_collection("raincachelists")
            .await
            .fail_next_write("timeout")
            .unwrap();

        let err = engine.add_to_list("l", "x".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(engine.get_list_count("l").await.unwrap(), 0);
    }
}
