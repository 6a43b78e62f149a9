use crate::config::{CollectionLayout, EngineConfig};
use crate::core::{KeyPath, Result};
use crate::storage::{Collection, Database};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Entries and list members backing one partition.
#[derive(Clone)]
pub(crate) struct CollectionSet {
    pub entries: Arc<dyn Collection>,
    pub lists: Arc<dyn Collection>,
}

/// Maps keys to the collections holding them.
///
/// The flat layout resolves its single set once. The partitioned layout keeps
/// one set per first key component, in registration order.
pub(crate) struct CollectionRegistry {
    db: Arc<dyn Database>,
    config: EngineConfig,
    flat: Option<CollectionSet>,
    partitions: RwLock<Vec<(String, CollectionSet)>>,
}

impl CollectionRegistry {
    pub async fn initialize(db: Arc<dyn Database>, config: EngineConfig) -> Result<Self> {
        let mut registry = Self {
            db,
            config,
            flat: None,
            partitions: RwLock::new(Vec::new()),
        };

        match registry.config.layout {
            CollectionLayout::Flat => {
                registry.flat = Some(registry.resolve(None).await?);
            }
            CollectionLayout::Partitioned => {
                let mut partitions = Vec::with_capacity(registry.config.partitions.len());
                for name in &registry.config.partitions {
                    partitions.push((name.clone(), registry.resolve(Some(name)).await?));
                }
                registry.partitions = RwLock::new(partitions);
            }
        }

        Ok(registry)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn for_key(&self, key: &str) -> Result<CollectionSet> {
        match &self.flat {
            Some(set) => Ok(set.clone()),
            None => self.partition(KeyPath::new(key).partition()).await,
        }
    }

    /// Sets to scan for `namespace`; the root namespace spans every partition
    /// present in the store, not only the ones this registry has seen.
    pub async fn for_namespace(&self, namespace: &str) -> Result<Vec<CollectionSet>> {
        if let Some(set) = &self.flat {
            return Ok(vec![set.clone()]);
        }
        if namespace.is_empty() {
            self.discover().await?;
            let partitions = self.partitions.read().await;
            return Ok(partitions.iter().map(|(_, set)| set.clone()).collect());
        }
        Ok(vec![self.partition(KeyPath::new(namespace).partition()).await?])
    }

    pub async fn partition_names(&self) -> Vec<String> {
        let partitions = self.partitions.read().await;
        partitions.iter().map(|(name, _)| name.clone()).collect()
    }

    async fn discover(&self) -> Result<()> {
        for name in self.db.collection_names().await? {
            if let Some(partition) = self.config.partition_of(&name) {
                self.partition(partition).await?;
            }
        }
        Ok(())
    }

    async fn partition(&self, name: &str) -> Result<CollectionSet> {
        if let Some(set) = find_partition(&self.partitions.read().await, name) {
            return Ok(set);
        }

        let mut partitions = self.partitions.write().await;
        if let Some(set) = find_partition(&partitions, name) {
            return Ok(set);
        }
        let set = self.resolve(Some(name)).await?;
        partitions.push((name.to_string(), set.clone()));
        debug!(partition = name, "partition registered");
        Ok(set)
    }

    async fn resolve(&self, partition: Option<&str>) -> Result<CollectionSet> {
        let (entries, lists) = self.config.collection_names(partition);
        Ok(CollectionSet {
            entries: self.db.collection(&entries).await?,
            lists: self.db.collection(&lists).await?,
        })
    }
}

fn find_partition(partitions: &[(String, CollectionSet)], name: &str) -> Option<CollectionSet> {
    partitions
        .iter()
        .find(|(registered, _)| registered == name)
        .map(|(_, set)| set.clone())
}
