//! Process data: the key/value context of a running instance
//!
//! Values are JSON so conditions can compare numbers, strings and
//! booleans, and automated steps can store structured results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Mutable key/value context owned by a workflow instance
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessData(BTreeMap<String, Value>);

impl ProcessData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Resolve a dotted path such as `order.total` through nested objects
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ProcessData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for ProcessData {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_get() {
        let mut data = ProcessData::new().with("amount", 50);
        assert_eq!(data.get("amount"), Some(&json!(50)));
        data.insert("approved", true);
        assert_eq!(data.len(), 2);
        assert_eq!(data.remove("approved"), Some(json!(true)));
    }

    #[test]
    fn test_dotted_lookup() {
        let data = ProcessData::new().with("order", json!({"total": 120, "lines": [{"sku": "A-1"}]}));
        assert_eq!(data.lookup("order.total"), Some(&json!(120)));
        assert_eq!(data.lookup("order.lines.0.sku"), Some(&json!("A-1")));
        assert_eq!(data.lookup("order.missing"), None);
        assert_eq!(data.lookup("nothing"), None);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let data: ProcessData = [("a", 1)].into_iter().collect();
        assert_eq!(serde_json::to_value(&data).unwrap(), json!({"a": 1}));
    }
}
