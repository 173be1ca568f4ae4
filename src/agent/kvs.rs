//! Key-multivalue configuration updates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A configuration update: each key maps to an ordered list of values.
///
/// The on-disk form is a TOML table of string arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KvPairs(BTreeMap<String, Vec<String>>);

impl KvPairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a structured document as `contents = [<text>]`.
    pub fn from_document(text: impl Into<String>) -> Self {
        let mut kvs = Self::new();
        kvs.insert("contents", [text.into()]);
        kvs
    }

    /// Set `key`, replacing any previous values.
    pub fn insert<I, S>(&mut self, key: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn get_values(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn first_value(&self, key: &str) -> Option<&str> {
        self.get_values(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for KvPairs
where
    K: Into<String>,
    V: IntoIterator,
    V::Item: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut kvs = Self::new();
        for (key, values) in iter {
            kvs.insert(key, values);
        }
        kvs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_form() {
        let kvs: KvPairs = toml::from_str(
            r#"
            pools = ["p1"]
            bindings = ["11300"]
            "pool-p1" = ["s1"]
            "svr-s1" = ["host=127.0.0.1", "port=11211"]
            "#,
        )
        .unwrap();

        assert_eq!(kvs.len(), 4);
        assert_eq!(kvs.first_value("pools"), Some("p1"));
        assert_eq!(kvs.get_values("svr-s1").unwrap().len(), 2);
        assert!(kvs.get_values("pool-p2").is_none());
    }

    #[test]
    fn test_from_document() {
        let kvs = KvPairs::from_document("{}");
        assert_eq!(kvs.first_value("contents"), Some("{}"));
    }

    #[test]
    fn test_collect() {
        let kvs: KvPairs = [("pools", vec!["a", "b"])].into_iter().collect();
        assert_eq!(kvs.get_values("pools").unwrap(), ["a", "b"]);
    }
}
