use crate::core::namespace::SEPARATOR;

/// Default name of the collection holding key-value entries.
pub const DEFAULT_ENTRIES_COLLECTION: &str = "raincache";

/// Default name of the collection holding list members.
pub const DEFAULT_LISTS_COLLECTION: &str = "raincachelists";

/// How entries are spread across backend collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionLayout {
    /// One entries collection and one lists collection for every key.
    #[default]
    Flat,
    /// A pair of collections per top-level namespace, suffixed with it.
    Partitioned,
}

/// Storage engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Entries collection name (prefix of it, when partitioned)
    pub entries_collection: String,

    /// Lists collection name (prefix of it, when partitioned)
    pub lists_collection: String,

    pub layout: CollectionLayout,

    /// Partitions resolved at startup
    pub partitions: Vec<String>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            entries_collection: DEFAULT_ENTRIES_COLLECTION.to_string(),
            lists_collection: DEFAULT_LISTS_COLLECTION.to_string(),
            layout: CollectionLayout::Flat,
            partitions: Vec::new(),
        }
    }

    /// Set the entries collection name
    pub fn entries_collection(mut self, name: &str) -> Self {
        self.entries_collection = name.to_string();
        self
    }

    /// Set the lists collection name
    pub fn lists_collection(mut self, name: &str) -> Self {
        self.lists_collection = name.to_string();
        self
    }

    pub fn layout(mut self, layout: CollectionLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Switch to the partitioned layout and pre-register `partition`
    pub fn partition(mut self, partition: &str) -> Self {
        self.layout = CollectionLayout::Partitioned;
        if !self.partitions.iter().any(|p| p == partition) {
            self.partitions.push(partition.to_string());
        }
        self
    }

    /// Collection names `(entries, lists)` backing `partition`. Keys with an
    /// empty first component share the unsuffixed collections.
    pub fn collection_names(&self, partition: Option<&str>) -> (String, String) {
        match partition {
            Some(p) if self.layout == CollectionLayout::Partitioned && !p.is_empty() => (
                format!("{}_{}", self.entries_collection, p),
                format!("{}_{}", self.lists_collection, p),
            ),
            _ => (
                self.entries_collection.clone(),
                self.lists_collection.clone(),
            ),
        }
    }

    /// Partition whose entries live in `collection`, if it is one of ours.
    /// The unsuffixed entries collection maps to the empty partition.
    pub fn partition_of<'a>(&self, collection: &'a str) -> Option<&'a str> {
        if collection == self.entries_collection {
            return Some("");
        }
        if collection == self.lists_collection
            || collection.starts_with(&format!("{}_", self.lists_collection))
        {
            return None;
        }
        collection
            .strip_prefix(self.entries_collection.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|p| !p.is_empty() && !p.contains(SEPARATOR))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for (label, name) in [
            ("entries_collection", &self.entries_collection),
            ("lists_collection", &self.lists_collection),
        ] {
            if name.is_empty() {
                return Err(format!("{} cannot be empty", label));
            }
            if name.contains(SEPARATOR) {
                return Err(format!("{} cannot contain '{}'", label, SEPARATOR));
            }
        }

        if self.entries_collection == self.lists_collection {
            return Err("entries and lists collections must differ".to_string());
        }

        if self.layout == CollectionLayout::Flat && !self.partitions.is_empty() {
            return Err("partitions require the partitioned layout".to_string());
        }

        for partition in &self.partitions {
            if partition.is_empty() || partition.contains(SEPARATOR) {
                return Err(format!("invalid partition name '{}'", partition));
            }
            let (entries, lists) = self.collection_names(Some(partition.as_str()));
            for suffixed in [&entries, &lists] {
                if *suffixed == self.entries_collection || *suffixed == self.lists_collection {
                    return Err(format!(
                        "partition '{}' collides with collection '{}'",
                        partition, suffixed
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
