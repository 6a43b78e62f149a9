use super::backend::{Collection, Cursor, Database, Projection, Query, Update};
use crate::core::{Document, DocumentId, Result, StoreError, Value};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// In-process document store implementing the backend contract.
///
/// Collections are created on first use and keep documents in insertion
/// order. Unique indexes have to be declared before the collection is first
/// resolved.
pub struct MemoryDatabase {
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
    unique_indexes: HashMap<String, Vec<Vec<String>>>,
    cursors: Arc<CursorCounters>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            unique_indexes: HashMap::new(),
            cursors: Arc::new(CursorCounters::default()),
        }
    }

    /// Declare a unique index over `fields` (compound when more than one).
    pub fn with_unique_index(mut self, collection: &str, fields: &[&str]) -> Self {
        self.unique_indexes
            .entry(collection.to_string())
            .or_default()
            .push(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Concrete handle, for inspection in tests and tooling.
    pub async fn memory_collection(&self, name: &str) -> Arc<MemoryCollection> {
        if let Some(existing) = self.collections.read().await.get(name) {
            return Arc::clone(existing);
        }

        let mut collections = self.collections.write().await;
        let collection = collections.entry(name.to_string()).or_insert_with(|| {
            Arc::new(MemoryCollection {
                name: name.to_string(),
                docs: RwLock::new(Vec::new()),
                unique: self.unique_indexes.get(name).cloned().unwrap_or_default(),
                cursors: Arc::clone(&self.cursors),
                injected_failure: Mutex::new(None),
            })
        });
        Arc::clone(collection)
    }

    pub fn cursor_stats(&self) -> CursorStats {
        self.cursors.snapshot()
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn collection(&self, name: &str) -> Result<Arc<dyn Collection>> {
        let collection: Arc<dyn Collection> = self.memory_collection(name).await;
        Ok(collection)
    }

    async fn collection_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

pub struct MemoryCollection {
    name: String,
    docs: RwLock<Vec<Document>>,
    unique: Vec<Vec<String>>,
    cursors: Arc<CursorCounters>,
    injected_failure: Mutex<Option<String>>,
}

impl MemoryCollection {
    /// Make the next write on this collection fail with a backend error.
    pub fn fail_next_write(&self, message: &str) -> Result<()> {
        *self.injected_failure.lock()? = Some(message.to_string());
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.docs.read().await.clone()
    }

    fn take_injected_failure(&self) -> Result<()> {
        match self.injected_failure.lock()?.take() {
            Some(message) => Err(StoreError::Backend(message)),
            None => Ok(()),
        }
    }

    fn check_unique(&self, docs: &[Document], candidate: &Document) -> Result<()> {
        for index in &self.unique {
            let key = index_key(index, candidate);
            let clash = docs
                .iter()
                .filter(|doc| doc.id != candidate.id)
                .any(|doc| index_key(index, doc) == key);
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: self.name.clone(),
                    field: index.join(","),
                });
            }
        }
        Ok(())
    }

    fn stage(&self, docs: &[Document], mut doc: Document) -> Result<Document> {
        let id = *doc.id.get_or_insert_with(DocumentId::new);
        if docs.iter().any(|existing| existing.id == Some(id)) {
            return Err(StoreError::DuplicateKey {
                collection: self.name.clone(),
                field: "_id".into(),
            });
        }
        self.check_unique(docs, &doc)?;
        Ok(doc)
    }
}

fn index_key<'a>(fields: &[String], doc: &'a Document) -> Vec<Option<&'a Value>> {
    fields
        .iter()
        .map(|field| doc.get(field).filter(|v| !v.is_null()))
        .collect()
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|doc| query.matches(doc)).count() as u64)
    }

    async fn find_one(
        &self,
        query: &Query,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>> {
        let docs = self.docs.read().await;
        let found = docs.iter().find(|doc| query.matches(doc)).cloned();
        Ok(match projection {
            Some(projection) => found.map(|doc| projection.apply(doc)),
            None => found,
        })
    }

    async fn find(&self, query: &Query) -> Result<Box<dyn Cursor>> {
        let docs = self.docs.read().await;
        let matched: VecDeque<Document> =
            docs.iter().filter(|doc| query.matches(doc)).cloned().collect();
        self.cursors.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            docs: matched,
            counters: Arc::clone(&self.cursors),
            released: false,
        }))
    }

    async fn insert_one(&self, doc: Document) -> Result<DocumentId> {
        let mut docs = self.docs.write().await;
        self.take_injected_failure()?;
        let doc = self.stage(&docs, doc)?;
        let id = doc.id.unwrap_or_default();
        docs.push(doc);
        Ok(id)
    }

    async fn insert_many(&self, batch: Vec<Document>) -> Result<Vec<DocumentId>> {
        let mut docs = self.docs.write().await;
        self.take_injected_failure()?;
        let mut ids = Vec::with_capacity(batch.len());
        for doc in batch {
            let doc = self.stage(&docs, doc)?;
            ids.push(doc.id.unwrap_or_default());
            docs.push(doc);
        }
        Ok(ids)
    }

    async fn update_one(&self, id: DocumentId, update: Update) -> Result<bool> {
        let mut docs = self.docs.write().await;
        self.take_injected_failure()?;
        let Some(pos) = docs.iter().position(|doc| doc.id == Some(id)) else {
            return Ok(false);
        };

        let mut updated = docs[pos].clone();
        update.apply(&mut updated);
        self.check_unique(&docs, &updated)?;
        docs[pos] = updated;
        Ok(true)
    }

    async fn remove(&self, query: &Query) -> Result<u64> {
        let mut docs = self.docs.write().await;
        self.take_injected_failure()?;
        let before = docs.len();
        docs.retain(|doc| !query.matches(doc));
        Ok((before - docs.len()) as u64)
    }
}

/// Cursor over a snapshot taken when the query ran.
pub struct MemoryCursor {
    docs: VecDeque<Document>,
    counters: Arc<CursorCounters>,
    released: bool,
}

impl MemoryCursor {
    fn ensure_open(&self) -> Result<()> {
        if self.released {
            return Err(StoreError::Backend("cursor is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Cursor for MemoryCursor {
    async fn has_next(&mut self) -> Result<bool> {
        self.ensure_open()?;
        Ok(!self.docs.is_empty())
    }

    async fn next(&mut self) -> Result<Option<Document>> {
        self.ensure_open()?;
        Ok(self.docs.pop_front())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            self.docs.clear();
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        if !self.released {
            self.counters.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Default)]
struct CursorCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    dropped: AtomicUsize,
}

impl CursorCounters {
    fn snapshot(&self) -> CursorStats {
        CursorStats {
            opened: self.opened.load(Ordering::SeqCst),
            closed: self.closed.load(Ordering::SeqCst),
            dropped: self.dropped.load(Ordering::SeqCst),
        }
    }
}

/// Cursor accounting across every collection of a [`MemoryDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorStats {
    pub opened: usize,
    /// Released through an explicit close.
    pub closed: usize,
    /// Released by dropping an unclosed cursor.
    pub dropped: usize,
}

impl CursorStats {
    pub fn released(&self) -> usize {
        self.closed + self.dropped
    }

    pub fn open(&self) -> usize {
        self.opened.saturating_sub(self.released())
    }
}

impl std::fmt::Display for CursorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cursors: {} opened, {} closed, {} dropped",
            self.opened, self.closed, self.dropped
        )
    }
}
