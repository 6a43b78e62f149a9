//! Contract of the backing document store.
//!
//! The engine only needs equality, set-membership and array-containment
//! matches, `$set`-style partial updates and forward-only cursors. A driver for
//! a real document database implements these traits and maps its own failures
//! to [`StoreError::Backend`](crate::core::StoreError::Backend) or
//! [`StoreError::DuplicateKey`](crate::core::StoreError::DuplicateKey).

use crate::core::{Document, DocumentId, Fields, Result, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// Match applied to a single document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value.
    Eq(Value),
    /// Field equals one of the values.
    In(Vec<Value>),
    /// Field is an array holding the value.
    Contains(Value),
}

impl Condition {
    pub fn matches(&self, field: Option<&Value>) -> bool {
        let null = Value::Null;
        let field = field.unwrap_or(&null);
        match self {
            Self::Eq(expected) => field == expected,
            Self::In(candidates) => candidates.iter().any(|c| c == field),
            Self::Contains(expected) => field
                .as_array()
                .is_some_and(|items| items.iter().any(|item| item == expected)),
        }
    }
}

/// Conjunction of field conditions, optionally pinned to one document id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    id: Option<DocumentId>,
    conditions: Vec<(String, Condition)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: DocumentId) -> Self {
        Self {
            id: Some(id),
            conditions: Vec::new(),
        }
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.to_string(), Condition::Eq(value.into())));
        self
    }

    pub fn is_in(mut self, field: &str, values: Vec<Value>) -> Self {
        self.conditions.push((field.to_string(), Condition::In(values)));
        self
    }

    pub fn contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.to_string(), Condition::Contains(value.into())));
        self
    }

    pub fn id(&self) -> Option<DocumentId> {
        self.id
    }

    pub fn conditions(&self) -> &[(String, Condition)] {
        &self.conditions
    }

    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(id) = self.id {
            if doc.id != Some(id) {
                return false;
            }
        }
        self.conditions
            .iter()
            .all(|(field, condition)| condition.matches(doc.get(field)))
    }
}

/// Subset of fields to return from a lookup. The id is always returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    pub fn only(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn apply(&self, doc: Document) -> Document {
        let Document { id, mut fields } = doc;
        fields.retain(|name, _| self.fields.iter().any(|f| f == name));
        Document { id, fields }
    }
}

/// Partial update of a single document.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Overwrite the listed fields, leaving the others untouched.
    Set(Fields),
}

impl Update {
    pub fn set(field: &str, value: impl Into<Value>) -> Self {
        let mut fields = Fields::new();
        fields.insert(field.to_string(), value.into());
        Self::Set(fields)
    }

    pub fn apply(&self, doc: &mut Document) {
        match self {
            Self::Set(fields) => {
                for (name, value) in fields {
                    doc.set(name, value.clone());
                }
            }
        }
    }
}

/// Forward-only result set of a [`Collection::find`].
///
/// Implementations release their server-side resources in `close`. Dropping a
/// cursor without closing must release them too, best effort and without
/// blocking.
#[async_trait]
pub trait Cursor: Send {
    async fn has_next(&mut self) -> Result<bool>;

    /// Next document, `None` once exhausted.
    async fn next(&mut self) -> Result<Option<Document>>;

    /// Drain the remaining documents.
    async fn to_array(&mut self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        while let Some(doc) = self.next().await? {
            docs.push(doc);
        }
        Ok(docs)
    }

    async fn close(&mut self) -> Result<()>;
}

/// A named collection of documents.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    async fn count(&self, query: &Query) -> Result<u64>;

    async fn find_one(
        &self,
        query: &Query,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>>;

    async fn find(&self, query: &Query) -> Result<Box<dyn Cursor>>;

    /// Insert and return the id assigned by the backend.
    async fn insert_one(&self, doc: Document) -> Result<DocumentId>;

    /// Ordered insert; stops at the first failing document.
    async fn insert_many(&self, docs: Vec<Document>) -> Result<Vec<DocumentId>>;

    /// Returns whether a document matched.
    async fn update_one(&self, id: DocumentId, update: Update) -> Result<bool>;

    /// Returns how many documents were removed.
    async fn remove(&self, query: &Query) -> Result<u64>;
}

/// Resolves logical collection names to handles.
#[async_trait]
pub trait Database: Send + Sync {
    async fn collection(&self, name: &str) -> Result<Arc<dyn Collection>>;

    /// Names of the collections that currently exist, sorted.
    async fn collection_names(&self) -> Result<Vec<String>>;
}
