pub mod document;
pub mod entry;
pub mod error;
pub mod namespace;
pub mod value;

pub use document::{Document, DocumentId};
pub use entry::{Entry, EntryHead, ListElement};
pub use error::{EntryKind, Result, StoreError};
pub use namespace::{KeyPath, ancestor_prefixes};
pub use value::{Fields, Value, ValueShape};
