//! Per-user map of durable facts extracted from conversation.
//!
//! Keys are free-text labels such as "Tên" or "Nghề nghiệp". The map keeps
//! insertion order so listings and prompts render facts in the order they were
//! learned. On the wire it is a plain JSON object.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactMap {
    entries: Vec<(String, String)>,
}

impl FactMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite. An existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Shallow last-write-wins merge. Returns how many entries changed.
    pub fn merge(&mut self, updates: &Self) -> usize {
        let mut changed = 0;
        for (key, value) in updates.iter() {
            if self.get(key) != Some(value) {
                self.insert(key, value);
                changed += 1;
            }
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// `- key: value` lines, one per fact, in insertion order.
    #[must_use]
    pub fn to_bullet_list(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("- {k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FactMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for FactMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct FactMapVisitor;

impl<'de> Visitor<'de> for FactMapVisitor {
    type Value = FactMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object of fact labels to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FactMap, A::Error> {
        let mut map = FactMap::new();
        while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
            let value = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                continue;
            }
            map.insert(key, value);
        }
        Ok(map)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<FactMap, E> {
        Ok(FactMap::new())
    }
}

impl<'de> Deserialize<'de> for FactMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FactMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FactMap {
        [("Tên", "An"), ("Nghề nghiệp", "kỹ sư")].into_iter().collect()
    }

    #[test]
    fn merge_overwrites_existing_keys() {
        let mut facts = sample();
        let updates: FactMap = [("Nghề nghiệp", "bác sĩ"), ("Sở thích", "đọc sách")]
            .into_iter()
            .collect();

        let changed = facts.merge(&updates);

        assert_eq!(changed, 2);
        assert_eq!(facts.get("Nghề nghiệp"), Some("bác sĩ"));
        assert_eq!(facts.keys(), vec!["Tên", "Nghề nghiệp", "Sở thích"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let updates: FactMap = [("Thành phố", "Huế"), ("Tên", "Bình")].into_iter().collect();

        let mut once = sample();
        once.merge(&updates);
        let mut twice = once.clone();
        let changed = twice.merge(&updates);

        assert_eq!(changed, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn json_keeps_insertion_order() {
        let facts: FactMap = [("Zeta", "1"), ("Alpha", "2"), ("Mid", "3")]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&facts).unwrap_or_default();
        assert_eq!(json, r#"{"Zeta":"1","Alpha":"2","Mid":"3"}"#);

        let back: FactMap = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(back.keys(), vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn non_string_values_are_coerced() {
        let parsed: FactMap =
            serde_json::from_str(r#"{"Tuổi": 30, "Trống": "", "Null": null, "Có con": true}"#)
                .unwrap_or_default();
        assert_eq!(parsed.get("Tuổi"), Some("30"));
        assert_eq!(parsed.get("Có con"), Some("true"));
        assert!(!parsed.contains_key("Trống"));
        assert!(!parsed.contains_key("Null"));
    }

    #[test]
    fn bullet_list_format() {
        assert_eq!(sample().to_bullet_list(), "- Tên: An\n- Nghề nghiệp: kỹ sư");
        assert_eq!(FactMap::new().to_bullet_list(), "");
    }

    #[test]
    fn remove_returns_old_value() {
        let mut facts = sample();
        assert_eq!(facts.remove("Tên").as_deref(), Some("An"));
        assert_eq!(facts.remove("Tên"), None);
        assert_eq!(facts.len(), 1);
    }
}
