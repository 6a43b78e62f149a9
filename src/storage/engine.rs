use crate::core::{Result, Value};
use async_trait::async_trait;

/// Predicate applied to entry values by `filter` and `find`.
pub type ValuePredicate<'a> = &'a (dyn Fn(&Value) -> bool + Send + Sync);

/// One or more values passed to [`StorageEngine::add_to_list`].
#[derive(Debug, Clone, PartialEq)]
pub enum Members {
    One(Value),
    Many(Vec<Value>),
}

impl Members {
    pub fn into_vec(self) -> Vec<Value> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

impl From<Value> for Members {
    fn from(value: Value) -> Self {
        Self::One(value)
    }
}

impl From<&str> for Members {
    fn from(value: &str) -> Self {
        Self::One(value.into())
    }
}

impl From<String> for Members {
    fn from(value: String) -> Self {
        Self::One(value.into())
    }
}

impl From<Vec<Value>> for Members {
    fn from(values: Vec<Value>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<&str>> for Members {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(Value::from).collect())
    }
}

/// Storage engine trait - the surface a caching layer is written against.
///
/// Keys are dotted paths; a key holds either a plain value or a list, never
/// both. Every call writes through to the backing store before returning.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Value stored at `id`, `None` when absent. Fails on a list.
    async fn get(&self, id: &str) -> Result<Option<Value>>;

    /// Create `id` with `patch`, or apply `patch` to its current value.
    async fn upsert(&self, id: &str, patch: Value) -> Result<()>;

    /// Delete the value at `id`. Fails on a list.
    async fn remove(&self, id: &str) -> Result<()>;

    /// Values under `namespace` (optionally restricted to `ids`) accepted by
    /// `predicate`, in store order.
    async fn filter(
        &self,
        predicate: ValuePredicate<'_>,
        ids: Option<&[String]>,
        namespace: &str,
    ) -> Result<Vec<Value>>;

    /// First value `filter` would return.
    async fn find(
        &self,
        predicate: ValuePredicate<'_>,
        ids: Option<&[String]>,
        namespace: &str,
    ) -> Result<Option<Value>>;

    async fn get_list_members(&self, list_id: &str) -> Result<Vec<Value>>;

    /// Append members not already present, creating the list if needed.
    async fn add_to_list(&self, list_id: &str, members: Members) -> Result<()>;

    async fn is_list_member(&self, list_id: &str, value: &Value) -> Result<bool>;

    async fn remove_from_list(&self, list_id: &str, value: &Value) -> Result<()>;

    /// Delete every member and the list itself.
    async fn remove_list(&self, list_id: &str) -> Result<()>;

    async fn get_list_count(&self, list_id: &str) -> Result<u64>;
}
