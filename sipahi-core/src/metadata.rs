//! Call metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key-value metadata attached to an inbound call.
///
/// Keys are case-insensitive and stored lowercase. A key may carry several
/// values; [`insert`](Metadata::insert) replaces them, [`append`](Metadata::append)
/// adds one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: BTreeMap<String, Vec<String>>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to a single value, replacing any existing values.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .insert(key.as_ref().to_ascii_lowercase(), vec![value.into()]);
    }

    /// Add a value for `key`, keeping existing ones.
    pub fn append(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .entry(key.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// The first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// All values for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Remove every value for `key`, returning them.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(&key.to_ascii_lowercase())
    }

    /// Whether `key` has at least one value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs, keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (k, v) in iter {
            metadata.append(k, v);
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut md = Metadata::new();
        md.insert("X-Request-Id", "abc");
        assert_eq!(md.get("x-request-id"), Some("abc"));
        assert_eq!(md.get("X-REQUEST-ID"), Some("abc"));
        assert!(md.contains_key("x-Request-id"));
    }

    #[test]
    fn test_insert_replaces_append_adds() {
        let mut md = Metadata::new();
        md.append("accept", "json");
        md.append("accept", "proto");
        assert_eq!(md.get_all("accept"), ["json", "proto"]);

        md.insert("accept", "text");
        assert_eq!(md.get_all("accept"), ["text"]);
        assert_eq!(md.len(), 1);
    }

    #[test]
    fn test_missing_key() {
        let md = Metadata::new();
        assert!(md.is_empty());
        assert_eq!(md.get("nope"), None);
        assert!(md.get_all("nope").is_empty());
    }

    #[test]
    fn test_from_iter_and_iter() {
        let md: Metadata = [("b", "2"), ("a", "1"), ("b", "3")].into_iter().collect();
        let pairs: Vec<_> = md.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2"), ("b", "3")]);
    }

    #[test]
    fn test_remove() {
        let mut md: Metadata = [("token", "t")].into_iter().collect();
        assert_eq!(md.remove("TOKEN"), Some(vec!["t".to_string()]));
        assert!(md.is_empty());
    }
}
