//! `FrontmatterValue`: a dynamic, recursive frontmatter value.
//!
//! Generalizes the teacher's fixed-schema `IndexRecord` JSON-valued helpers
//! (`crates/adapt/src/mql/index.rs`, `as_string`/`as_string_vec`) into a
//! recursive tagged union that can represent any page's frontmatter, not
//! just a WordPress-ish fixed set of fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single dotted-path component: either a map key or a list index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathComponent {
    Key(String),
    Index(usize),
}

/// Recursive frontmatter value: string, bool, number, list, or map.
///
/// `Number`/`Null` round-trip through parsing and serialization but are not
/// indexable by C3 (which only understands `String`, `Bool`, `List`, and
/// `Map`); attempting to index one of those is an `InvalidValueType` error
/// raised by `wiki-index-fm`, not by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<FrontmatterValue>),
    Map(BTreeMap<String, FrontmatterValue>),
}

impl FrontmatterValue {
    pub fn empty_map() -> Self {
        FrontmatterValue::Map(BTreeMap::new())
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FrontmatterValue>> {
        match self {
            FrontmatterValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrontmatterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FrontmatterValue]> {
        match self {
            FrontmatterValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Parse a dotted key path like `inventory.items` into components.
    ///
    /// Pure key paths only; list traversal during lookup is handled by
    /// [`FrontmatterValue::get_path`] descending into every element of a
    /// `List` it encounters, since frontmatter lists are indexed
    /// element-wise (spec.md §4.3).
    pub fn parse_path(path: &str) -> Vec<PathComponent> {
        path.split('.')
            .filter(|s| !s.is_empty())
            .map(|s| PathComponent::Key(s.to_string()))
            .collect()
    }

    /// Look up a dotted path, returning every value reachable along it.
    ///
    /// Because intermediate nodes may be lists (e.g. `inventory.items` where
    /// `items` is a list of strings), a path lookup can yield more than one
    /// value: the index treats each list element as indexed individually at
    /// that path.
    pub fn get_path(&self, path: &[PathComponent]) -> Vec<&FrontmatterValue> {
        // Checked before the empty-path base case so that reaching a list
        // with no remaining path components still yields its elements
        // individually, rather than the list as one opaque value.
        if let FrontmatterValue::List(items) = self {
            return items.iter().flat_map(|item| item.get_path(path)).collect();
        }
        let Some((head, rest)) = path.split_first() else {
            return vec![self];
        };
        match (self, head) {
            (FrontmatterValue::Map(m), PathComponent::Key(k)) => m
                .get(k)
                .map(|v| v.get_path(rest))
                .unwrap_or_default(),
            _ => vec![],
        }
    }

    /// Recursively merge `other` on top of `self`: maps merge key-wise
    /// (each key merges its own prior/new value), anything else in `other`
    /// overwrites whatever `self` held at that point. `Merge(page, {})`
    /// leaves `self` bit-identical, since an empty `other` map has nothing
    /// to overwrite with.
    pub fn merge(&self, other: &FrontmatterValue) -> FrontmatterValue {
        match (self, other) {
            (FrontmatterValue::Map(base), FrontmatterValue::Map(incoming)) => {
                let mut merged = base.clone();
                for (key, value) in incoming {
                    let next = match merged.get(key) {
                        Some(existing) => existing.merge(value),
                        None => value.clone(),
                    };
                    merged.insert(key.clone(), next);
                }
                FrontmatterValue::Map(merged)
            }
            _ => other.clone(),
        }
    }

    /// Remove whatever is reachable by walking `path`, returning a new
    /// value with that one node deleted. Missing intermediate components
    /// are a no-op, not an error.
    pub fn remove_path(&self, path: &[PathComponent]) -> FrontmatterValue {
        let Some((head, rest)) = path.split_first() else {
            return self.clone();
        };
        match (self, head) {
            (FrontmatterValue::Map(map), PathComponent::Key(key)) => {
                let mut map = map.clone();
                if rest.is_empty() {
                    map.remove(key);
                } else if let Some(child) = map.get(key) {
                    map.insert(key.clone(), child.remove_path(rest));
                }
                FrontmatterValue::Map(map)
            }
            (FrontmatterValue::List(items), PathComponent::Index(index)) => {
                let mut items = items.clone();
                if rest.is_empty() {
                    if *index < items.len() {
                        items.remove(*index);
                    }
                } else if let Some(child) = items.get(*index) {
                    items[*index] = child.remove_path(rest);
                }
                FrontmatterValue::List(items)
            }
            _ => self.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FrontmatterValue::Null => serde_json::Value::Null,
            FrontmatterValue::Bool(b) => serde_json::Value::Bool(*b),
            FrontmatterValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FrontmatterValue::String(s) => serde_json::Value::String(s.clone()),
            FrontmatterValue::List(l) => {
                serde_json::Value::Array(l.iter().map(FrontmatterValue::to_json).collect())
            }
            FrontmatterValue::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for FrontmatterValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => FrontmatterValue::Null,
            serde_json::Value::Bool(b) => FrontmatterValue::Bool(b),
            serde_json::Value::Number(n) => {
                FrontmatterValue::Number(n.as_f64().unwrap_or(0.0))
            }
            serde_json::Value::String(s) => FrontmatterValue::String(s),
            serde_json::Value::Array(a) => {
                FrontmatterValue::List(a.into_iter().map(FrontmatterValue::from).collect())
            }
            serde_json::Value::Object(o) => FrontmatterValue::Map(
                o.into_iter().map(|(k, v)| (k, FrontmatterValue::from(v))).collect(),
            ),
        }
    }
}

impl From<toml::Value> for FrontmatterValue {
    fn from(v: toml::Value) -> Self {
        match v {
            toml::Value::String(s) => FrontmatterValue::String(s),
            toml::Value::Integer(i) => FrontmatterValue::Number(i as f64),
            toml::Value::Float(f) => FrontmatterValue::Number(f),
            toml::Value::Boolean(b) => FrontmatterValue::Bool(b),
            toml::Value::Datetime(dt) => FrontmatterValue::String(dt.to_string()),
            toml::Value::Array(a) => {
                FrontmatterValue::List(a.into_iter().map(FrontmatterValue::from).collect())
            }
            toml::Value::Table(t) => FrontmatterValue::Map(
                t.into_iter().map(|(k, v)| (k, FrontmatterValue::from(v))).collect(),
            ),
        }
    }
}

impl From<serde_yml::Value> for FrontmatterValue {
    fn from(v: serde_yml::Value) -> Self {
        match v {
            serde_yml::Value::Null => FrontmatterValue::Null,
            serde_yml::Value::Bool(b) => FrontmatterValue::Bool(b),
            serde_yml::Value::Number(n) => FrontmatterValue::Number(n.as_f64().unwrap_or(0.0)),
            serde_yml::Value::String(s) => FrontmatterValue::String(s),
            serde_yml::Value::Sequence(seq) => {
                FrontmatterValue::List(seq.into_iter().map(FrontmatterValue::from).collect())
            }
            serde_yml::Value::Mapping(map) => FrontmatterValue::Map(
                map.into_iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), FrontmatterValue::from(v))))
                    .collect(),
            ),
            serde_yml::Value::Tagged(tagged) => FrontmatterValue::from(tagged.value),
        }
    }
}

/// Reverse conversion, used by the `+++` writer in `block.rs`.
impl From<&FrontmatterValue> for toml::Value {
    fn from(v: &FrontmatterValue) -> Self {
        match v {
            FrontmatterValue::Null => toml::Value::String(String::new()),
            FrontmatterValue::Bool(b) => toml::Value::Boolean(*b),
            FrontmatterValue::Number(n) => toml::Value::Float(*n),
            FrontmatterValue::String(s) => toml::Value::String(s.clone()),
            FrontmatterValue::List(l) => {
                toml::Value::Array(l.iter().map(toml::Value::from).collect())
            }
            FrontmatterValue::Map(m) => toml::Value::Table(
                m.iter().map(|(k, v)| (k.clone(), toml::Value::from(v))).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FrontmatterValue {
        let mut inventory = BTreeMap::new();
        inventory.insert(
            "items".to_string(),
            FrontmatterValue::List(vec![
                FrontmatterValue::String("wrench".to_string()),
                FrontmatterValue::String("hammer".to_string()),
            ]),
        );
        let mut root = BTreeMap::new();
        root.insert("inventory".to_string(), FrontmatterValue::Map(inventory));
        root.insert("title".to_string(), FrontmatterValue::String("Garage".to_string()));
        FrontmatterValue::Map(root)
    }

    #[test]
    fn get_path_descends_maps() {
        let v = sample();
        let path = FrontmatterValue::parse_path("title");
        let found = v.get_path(&path);
        assert_eq!(found, vec![&FrontmatterValue::String("Garage".to_string())]);
    }

    #[test]
    fn get_path_descends_into_list_elements() {
        let v = sample();
        let path = FrontmatterValue::parse_path("inventory.items");
        let found = v.get_path(&path);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].as_str(), Some("wrench"));
        assert_eq!(found[1].as_str(), Some("hammer"));
    }

    #[test]
    fn get_path_missing_returns_empty() {
        let v = sample();
        let path = FrontmatterValue::parse_path("nonexistent.key");
        assert!(v.get_path(&path).is_empty());
    }

    #[test]
    fn json_round_trip_preserves_shape() {
        let v = sample();
        let json = v.to_json();
        let back: FrontmatterValue = json.into();
        assert_eq!(v, back);
    }

    #[test]
    fn merge_with_empty_map_is_bit_identical() {
        let v = sample();
        assert_eq!(v.merge(&FrontmatterValue::empty_map()), v);
    }

    #[test]
    fn merge_overlays_keys_without_discarding_untouched_siblings() {
        let v = sample();
        let mut overlay = BTreeMap::new();
        overlay.insert("tags".to_string(), FrontmatterValue::String("new".to_string()));
        let merged = v.merge(&FrontmatterValue::Map(overlay));

        let map = merged.as_map().unwrap();
        assert_eq!(map.get("title").unwrap().as_str(), Some("Garage"));
        assert_eq!(map.get("tags").unwrap().as_str(), Some("new"));
    }

    #[test]
    fn merge_recurses_into_nested_maps_instead_of_replacing_them() {
        let v = sample();
        let mut inventory_overlay = BTreeMap::new();
        inventory_overlay.insert("container".to_string(), FrontmatterValue::String("shelf".to_string()));
        let mut overlay = BTreeMap::new();
        overlay.insert("inventory".to_string(), FrontmatterValue::Map(inventory_overlay));
        let merged = v.merge(&FrontmatterValue::Map(overlay));

        let inventory = merged.as_map().unwrap().get("inventory").unwrap().as_map().unwrap();
        assert_eq!(inventory.get("container").unwrap().as_str(), Some("shelf"));
        assert!(inventory.contains_key("items"));
    }

    #[test]
    fn remove_path_deletes_a_leaf_key() {
        let v = sample();
        let removed = v.remove_path(&[PathComponent::Key("title".to_string())]);
        assert!(removed.as_map().unwrap().get("title").is_none());
    }

    #[test]
    fn remove_path_descends_into_nested_maps() {
        let v = sample();
        let removed = v.remove_path(&[
            PathComponent::Key("inventory".to_string()),
            PathComponent::Key("items".to_string()),
        ]);
        let inventory = removed.as_map().unwrap().get("inventory").unwrap().as_map().unwrap();
        assert!(inventory.get("items").is_none());
    }

    #[test]
    fn remove_path_on_missing_component_is_a_no_op() {
        let v = sample();
        let removed = v.remove_path(&[PathComponent::Key("nonexistent".to_string())]);
        assert_eq!(removed, v);
    }
}
