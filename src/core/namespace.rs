//! Dotted key decomposition.
//!
//! A key such as `"users.42.profile"` lives in every ancestor namespace of its
//! path. The root namespace is the empty string and is an ancestor of every key:
//!
//! | key                  | ancestors                    | partition | residual       |
//! |----------------------|------------------------------|-----------|----------------|
//! | `"users.42.profile"` | `["", "users", "users.42"]`  | `"users"` | `"42.profile"` |
//! | `"users"`            | `[""]`                       | `"users"` | `""`           |
//! | `""`                 | `[""]`                       | `""`      | `""`           |

/// Separator between key components.
pub const SEPARATOR: char = '.';

/// The namespace every key belongs to.
pub const ROOT_NAMESPACE: &str = "";

/// Borrowed view over a dotted key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPath<'a> {
    key: &'a str,
}

impl<'a> KeyPath<'a> {
    pub fn new(key: &'a str) -> Self {
        Self { key }
    }

    pub fn as_str(&self) -> &'a str {
        self.key
    }

    /// Number of dot-separated components; an empty key still has one.
    pub fn depth(&self) -> usize {
        self.key.matches(SEPARATOR).count() + 1
    }

    /// Ancestor namespaces, root first, excluding the key itself.
    pub fn ancestors(&self) -> Vec<String> {
        let mut prefixes = Vec::with_capacity(self.depth());
        prefixes.push(ROOT_NAMESPACE.to_string());
        prefixes.extend(
            self.key
                .match_indices(SEPARATOR)
                .map(|(idx, _)| self.key[..idx].to_string()),
        );
        prefixes
    }

    /// First component, used to pick a per-namespace collection.
    pub fn partition(&self) -> &'a str {
        self.split().0
    }

    /// Everything after the partition.
    pub fn residual(&self) -> &'a str {
        self.split().1
    }

    pub fn split(&self) -> (&'a str, &'a str) {
        self.key.split_once(SEPARATOR).unwrap_or((self.key, ""))
    }

    /// Whether this key is stored under `namespace`.
    pub fn is_within(&self, namespace: &str) -> bool {
        if namespace.is_empty() {
            return true;
        }
        self.key
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }
}

/// Shorthand for `KeyPath::new(key).ancestors()`.
pub fn ancestor_prefixes(key: &str) -> Vec<String> {
    KeyPath::new(key).ancestors()
}
