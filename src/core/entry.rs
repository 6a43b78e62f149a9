use super::document::{Document, DocumentId};
use super::error::{EntryKind, Result, StoreError};
use super::namespace::KeyPath;
use super::value::Value;

/// Document field names shared by the adapter and its queries.
pub mod fields {
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";
    pub const LIST: &str = "list";
    pub const NAMESPACES: &str = "namespaces";
    pub const LIST_ID: &str = "listID";
}

/// A key-value record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: Option<DocumentId>,
    pub key: String,
    pub value: Value,
    pub is_list: bool,
    pub namespaces: Vec<String>,
}

impl Entry {
    pub fn new_value(key: &str, value: Value) -> Self {
        Self {
            id: None,
            key: key.to_string(),
            value,
            is_list: false,
            namespaces: KeyPath::new(key).ancestors(),
        }
    }

    /// List entries carry no value; their members live in the list collection.
    pub fn new_list(key: &str) -> Self {
        Self {
            is_list: true,
            ..Self::new_value(key, Value::Null)
        }
    }

    pub fn kind(&self) -> EntryKind {
        EntryKind::from_list_flag(self.is_list)
    }

    pub fn to_document(&self) -> Document {
        let namespaces = self
            .namespaces
            .iter()
            .map(|ns| Value::from(ns.as_str()))
            .collect::<Vec<_>>();

        Document {
            id: self.id,
            fields: Default::default(),
        }
        .with(fields::KEY, self.key.as_str())
        .with(fields::VALUE, self.value.clone())
        .with(fields::LIST, self.is_list)
        .with(fields::NAMESPACES, namespaces)
    }

    pub fn from_document(mut doc: Document) -> Result<Self> {
        let key = match doc.take(fields::KEY) {
            Some(Value::Text(key)) => key,
            other => {
                return Err(StoreError::CorruptDocument(format!(
                    "entry key must be text, got {:?}",
                    other
                )));
            }
        };
        let is_list = list_flag(&doc)?;
        let namespaces = match doc.take(fields::NAMESPACES) {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Text(ns) => Ok(ns),
                    other => Err(StoreError::CorruptDocument(format!(
                        "namespace of '{}' must be text, got {}",
                        key,
                        other.type_name()
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            None => KeyPath::new(&key).ancestors(),
            Some(other) => {
                return Err(StoreError::CorruptDocument(format!(
                    "namespaces of '{}' must be an array, got {}",
                    key,
                    other.type_name()
                )));
            }
        };

        Ok(Self {
            id: doc.id,
            value: doc.take(fields::VALUE).unwrap_or_default(),
            key,
            is_list,
            namespaces,
        })
    }
}

/// Identity and kind of an entry, read through a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHead {
    pub id: DocumentId,
    pub kind: EntryKind,
}

impl EntryHead {
    pub fn from_document(doc: &Document) -> Result<Self> {
        let id = doc
            .id
            .ok_or_else(|| StoreError::CorruptDocument("stored entry has no id".into()))?;
        Ok(Self {
            id,
            kind: EntryKind::from_list_flag(list_flag(doc)?),
        })
    }

    pub fn expect_list(self, key: &str) -> Result<DocumentId> {
        match self.kind {
            EntryKind::List => Ok(self.id),
            actual => Err(StoreError::wrong_kind(key, EntryKind::List, actual)),
        }
    }
}

/// One member of a list entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ListElement {
    pub owner: DocumentId,
    pub value: Value,
}

impl ListElement {
    pub fn new(owner: DocumentId, value: Value) -> Self {
        Self { owner, value }
    }

    pub fn to_document(&self) -> Document {
        Document::new()
            .with(fields::LIST_ID, self.owner)
            .with(fields::VALUE, self.value.clone())
    }

    pub fn from_document(mut doc: Document) -> Result<Self> {
        let owner = doc
            .get(fields::LIST_ID)
            .and_then(Value::as_str)
            .and_then(DocumentId::parse)
            .ok_or_else(|| {
                StoreError::CorruptDocument(format!(
                    "list element has no valid owner: {:?}",
                    doc.get(fields::LIST_ID)
                ))
            })?;
        Ok(Self {
            owner,
            value: doc.take(fields::VALUE).unwrap_or_default(),
        })
    }
}

// A missing flag reads as a plain value, matching entries written before lists existed.
fn list_flag(doc: &Document) -> Result<bool> {
    match doc.get(fields::LIST) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Boolean(flag)) => Ok(*flag),
        Some(other) => Err(StoreError::CorruptDocument(format!(
            "list flag must be boolean, got {}",
            other.type_name()
        ))),
    }
}
