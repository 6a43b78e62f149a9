//! Storage engine backed by a document store.
//!
//! Entries live in one collection as `{key, value, list, namespaces}`
//! documents; list members live in a second collection as `{listID, value}`
//! documents pointing at their list entry. Namespace queries match against the
//! precomputed `namespaces` array, so keys are never parsed at query time.
//!
//! Check-then-act sequences (create on first upsert, list creation, member
//! dedup) are not atomic. A backend enforcing unique indexes on `key` and on
//! `(listID, value)` closes those races; the engine then treats the
//! duplicate-key rejection as "someone else got there first".

mod lists;
mod registry;
mod values;

use crate::config::EngineConfig;
use crate::core::entry::fields;
use crate::core::{EntryHead, Result, Value};
use crate::storage::{Database, Members, Projection, Query, StorageEngine, ValuePredicate};
use async_trait::async_trait;
use registry::{CollectionRegistry, CollectionSet};
use std::sync::Arc;
use tracing::info;

pub struct DocumentStorageEngine {
    registry: CollectionRegistry,
}

impl DocumentStorageEngine {
    /// Validate `config` and resolve the collections it names.
    pub async fn initialize(db: Arc<dyn Database>, config: EngineConfig) -> Result<Self> {
        config.validate().map_err(crate::core::StoreError::Config)?;
        let registry = CollectionRegistry::initialize(db, config).await?;
        info!(
            entries = %registry.config().entries_collection,
            lists = %registry.config().lists_collection,
            layout = ?registry.config().layout,
            "storage engine initialized"
        );
        Ok(Self { registry })
    }

    pub fn config(&self) -> &EngineConfig {
        self.registry.config()
    }

    /// Partitions known so far, in registration order.
    pub async fn partitions(&self) -> Vec<String> {
        self.registry.partition_names().await
    }

    async fn head(&self, set: &CollectionSet, key: &str) -> Result<Option<EntryHead>> {
        set.entries
            .find_one(
                &Query::new().eq(fields::KEY, key),
                Some(&Projection::only(&[fields::LIST])),
            )
            .await?
            .map(|doc| EntryHead::from_document(&doc))
            .transpose()
    }
}

#[async_trait]
impl StorageEngine for DocumentStorageEngine {
    async fn get(&self, id: &str) -> Result<Option<Value>> {
        self.get_value(id).await
    }

    async fn upsert(&self, id: &str, patch: Value) -> Result<()> {
        self.upsert_value(id, patch).await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.remove_value(id).await
    }

    async fn filter(
        &self,
        predicate: ValuePredicate<'_>,
        ids: Option<&[String]>,
        namespace: &str,
    ) -> Result<Vec<Value>> {
        self.scan_values(predicate, ids, namespace, false).await
    }

    async fn find(
        &self,
        predicate: ValuePredicate<'_>,
        ids: Option<&[String]>,
        namespace: &str,
    ) -> Result<Option<Value>> {
        let mut found = self.scan_values(predicate, ids, namespace, true).await?;
        Ok(found.pop())
    }

    async fn get_list_members(&self, list_id: &str) -> Result<Vec<Value>> {
        self.list_members(list_id).await
    }

    async fn add_to_list(&self, list_id: &str, members: Members) -> Result<()> {
        self.append_members(list_id, members.into_vec()).await
    }

    async fn is_list_member(&self, list_id: &str, value: &Value) -> Result<bool> {
        self.has_member(list_id, value).await
    }

    async fn remove_from_list(&self, list_id: &str, value: &Value) -> Result<()> {
        self.remove_member(list_id, value).await
    }

    async fn remove_list(&self, list_id: &str) -> Result<()> {
        self.drop_list(list_id).await
    }

    async fn get_list_count(&self, list_id: &str) -> Result<u64> {
        self.member_count(list_id).await
    }
}
