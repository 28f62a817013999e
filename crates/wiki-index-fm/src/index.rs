//! Generic dotted-path frontmatter inverted index (C3).
//!
//! Generalizes `crates/adapt/src/mql/index.rs`'s fixed `IndexRecord` schema
//! into a fully dynamic index over arbitrary nested frontmatter: any dotted
//! key path discovered while walking a page's frontmatter becomes queryable,
//! rather than a fixed WordPress-ish set of fields. Concurrency follows
//! spec.md §5: a single `RwLock` guards the whole index, read-mostly
//! workloads taking the shared path.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use wiki_core::{FrontmatterValue, Identifier};

use crate::error::Error;

#[derive(Default)]
struct Inner {
    /// Each page's full frontmatter, kept so `frontmatter_values_of` and
    /// `FrontmatterOf`-style lookups can answer without returning to C2.
    raw: BTreeMap<Identifier, FrontmatterValue>,
    /// path -> value string -> identifiers holding that value at that path.
    inverted: BTreeMap<String, BTreeMap<String, BTreeSet<Identifier>>>,
    /// path -> identifiers that have *any* value at that path.
    presence: BTreeMap<String, BTreeSet<Identifier>>,
    /// Bookkeeping so `upsert`/`remove` can retract exactly what a prior
    /// upsert added, without re-walking the old frontmatter tree.
    entries_by_id: BTreeMap<Identifier, Vec<(String, String)>>,
}

pub struct FmIndex {
    inner: RwLock<Inner>,
}

impl Default for FmIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FmIndex {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    /// Index (or re-index) `id`'s frontmatter.
    ///
    /// The whole new entry set is computed into a scratch buffer first; if
    /// any value in `frontmatter` is unindexable the live index is left
    /// completely untouched, so a bad edit never un-indexes a page's
    /// previous, valid entries (spec.md's "no partial state" read, recorded
    /// in SPEC_FULL.md §D.4).
    pub fn upsert(&self, id: Identifier, frontmatter: FrontmatterValue) -> Result<(), Error> {
        let mut scratch = Vec::new();
        collect_entries(&[], &frontmatter, &mut scratch)?;

        let mut inner = self.inner.write();
        retract(&mut inner, &id);
        for (path, value) in &scratch {
            inner
                .inverted
                .entry(path.clone())
                .or_default()
                .entry(value.clone())
                .or_default()
                .insert(id.clone());
            inner.presence.entry(path.clone()).or_default().insert(id.clone());
        }
        inner.entries_by_id.insert(id.clone(), scratch);
        inner.raw.insert(id, frontmatter);
        Ok(())
    }

    /// Remove `id` from the index entirely (its page was deleted).
    pub fn remove(&self, id: &Identifier) {
        let mut inner = self.inner.write();
        retract(&mut inner, id);
        inner.raw.remove(id);
    }

    /// Identifiers whose value at `path` equals `value` exactly.
    pub fn query_exact(&self, path: &str, value: &str) -> Vec<Identifier> {
        let inner = self.inner.read();
        inner
            .inverted
            .get(path)
            .and_then(|values| values.get(value))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Identifiers that have any value at all at `path`.
    pub fn query_key_exists(&self, path: &str) -> Vec<Identifier> {
        let inner = self.inner.read();
        inner
            .presence
            .get(path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Identifiers whose value at `path` starts with `value_prefix`.
    pub fn query_prefix(&self, path: &str, value_prefix: &str) -> Vec<Identifier> {
        let inner = self.inner.read();
        let Some(values) = inner.inverted.get(path) else {
            return vec![];
        };
        let mut out = BTreeSet::new();
        for (value, set) in values.iter() {
            if value.starts_with(value_prefix) {
                out.extend(set.iter().cloned());
            }
        }
        out.into_iter().collect()
    }

    /// Every value reachable at `path` within `id`'s indexed frontmatter.
    pub fn get_value(&self, id: &Identifier, path: &str) -> Vec<FrontmatterValue> {
        let inner = self.inner.read();
        let Some(fm) = inner.raw.get(id) else {
            return vec![];
        };
        let components = FrontmatterValue::parse_path(path);
        fm.get_path(&components).into_iter().cloned().collect()
    }

    /// `id`'s full indexed frontmatter tree, if it has been upserted.
    pub fn frontmatter_of(&self, id: &Identifier) -> Option<FrontmatterValue> {
        self.inner.read().raw.get(id).cloned()
    }

    pub fn is_indexed(&self, id: &Identifier) -> bool {
        self.inner.read().raw.contains_key(id)
    }
}

fn retract(inner: &mut Inner, id: &Identifier) {
    let Some(old) = inner.entries_by_id.remove(id) else {
        return;
    };
    for (path, value) in old {
        if let Some(values) = inner.inverted.get_mut(&path) {
            if let Some(set) = values.get_mut(&value) {
                set.remove(id);
                if set.is_empty() {
                    values.remove(&value);
                }
            }
            if values.is_empty() {
                inner.inverted.remove(&path);
            }
        }
        if let Some(set) = inner.presence.get_mut(&path) {
            set.remove(id);
            if set.is_empty() {
                inner.presence.remove(&path);
            }
        }
    }
}

/// Walk `value` depth-first, collecting `(dotted path, indexed string)`
/// pairs. List elements are indexed at their container's own path, so a
/// list of strings and a single string at the same path are queried the
/// same way.
fn collect_entries(
    path: &[String],
    value: &FrontmatterValue,
    out: &mut Vec<(String, String)>,
) -> Result<(), Error> {
    match value {
        FrontmatterValue::String(s) => {
            out.push((path.join("."), s.clone()));
            Ok(())
        }
        FrontmatterValue::Bool(b) => {
            // spec.md §3/§4.3: only `true` is indexed, with value `"true"`;
            // `false` is not indexed, not even as presence.
            if *b {
                out.push((path.join("."), "true".to_string()));
            }
            Ok(())
        }
        FrontmatterValue::List(items) => {
            if items.is_empty() {
                // Empty list: record presence at the path so `queryKeyExists`
                // still sees the key, per spec.md §4.3.
                out.push((path.join("."), String::new()));
                return Ok(());
            }
            for item in items {
                collect_entries(path, item, out)?;
            }
            Ok(())
        }
        FrontmatterValue::Map(map) => {
            if !path.is_empty() {
                // Interior map node: record presence at its own path so
                // `queryKeyExists` works for non-leaf keys too.
                out.push((path.join("."), String::new()));
            }
            for (key, val) in map {
                // `identifier` is never indexed at the top level.
                if path.is_empty() && key == "identifier" {
                    continue;
                }
                let mut child = path.to_vec();
                child.push(key.clone());
                collect_entries(&child, val, out)?;
            }
            Ok(())
        }
        FrontmatterValue::Number(_) | FrontmatterValue::Null => {
            Err(Error::InvalidValueType(path.join(".")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fm(pairs: &[(&str, FrontmatterValue)]) -> FrontmatterValue {
        let mut map = BTreeMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.clone());
        }
        FrontmatterValue::Map(map)
    }

    fn id(s: &str) -> Identifier {
        Identifier::normalize(s).unwrap()
    }

    #[test]
    fn query_exact_finds_matching_scalar() {
        let index = FmIndex::new();
        index
            .upsert(id("garage"), fm(&[("title", FrontmatterValue::String("Garage".into()))]))
            .unwrap();

        assert_eq!(index.query_exact("title", "Garage"), vec![id("garage")]);
        assert!(index.query_exact("title", "Nope").is_empty());
    }

    #[test]
    fn list_elements_are_indexed_individually() {
        let index = FmIndex::new();
        let mut inventory = BTreeMap::new();
        inventory.insert(
            "items".to_string(),
            FrontmatterValue::List(vec![
                FrontmatterValue::String("wrench".into()),
                FrontmatterValue::String("hammer".into()),
            ]),
        );
        index
            .upsert(id("toolbox"), fm(&[("inventory", FrontmatterValue::Map(inventory))]))
            .unwrap();

        assert_eq!(index.query_exact("inventory.items", "wrench"), vec![id("toolbox")]);
        assert_eq!(index.query_exact("inventory.items", "hammer"), vec![id("toolbox")]);
    }

    #[test]
    fn upsert_rejects_unsupported_scalar_without_touching_prior_entries() {
        let index = FmIndex::new();
        index
            .upsert(id("garage"), fm(&[("title", FrontmatterValue::String("Garage".into()))]))
            .unwrap();

        let bad = fm(&[("count", FrontmatterValue::Number(3.0))]);
        assert!(index.upsert(id("garage"), bad).is_err());

        // Previous, valid entry still present: the scratch computation
        // failed before the live index was ever mutated.
        assert_eq!(index.query_exact("title", "Garage"), vec![id("garage")]);
    }

    #[test]
    fn re_upsert_retracts_stale_entries() {
        let index = FmIndex::new();
        index
            .upsert(id("garage"), fm(&[("title", FrontmatterValue::String("Garage".into()))]))
            .unwrap();
        index
            .upsert(id("garage"), fm(&[("title", FrontmatterValue::String("Workshop".into()))]))
            .unwrap();

        assert!(index.query_exact("title", "Garage").is_empty());
        assert_eq!(index.query_exact("title", "Workshop"), vec![id("garage")]);
    }

    #[test]
    fn remove_clears_all_entries_for_an_identifier() {
        let index = FmIndex::new();
        index
            .upsert(id("garage"), fm(&[("title", FrontmatterValue::String("Garage".into()))]))
            .unwrap();
        index.remove(&id("garage"));

        assert!(index.query_exact("title", "Garage").is_empty());
        assert!(index.frontmatter_of(&id("garage")).is_none());
    }

    #[test]
    fn query_prefix_matches_values_starting_with_the_given_prefix_at_one_key() {
        let index = FmIndex::new();
        index
            .upsert(id("wrench"), fm(&[("tag", FrontmatterValue::String("hand-tool".into()))]))
            .unwrap();
        index
            .upsert(id("drill"), fm(&[("tag", FrontmatterValue::String("hand-drill".into()))]))
            .unwrap();
        index
            .upsert(id("saw"), fm(&[("tag", FrontmatterValue::String("power-saw".into()))]))
            .unwrap();

        let mut hits = index.query_prefix("tag", "hand-");
        hits.sort();
        assert_eq!(hits, vec![id("drill"), id("wrench")]);
    }

    #[test]
    fn query_key_exists_sees_interior_map_nodes_and_empty_lists() {
        let index = FmIndex::new();
        let mut inventory = BTreeMap::new();
        inventory.insert("container".to_string(), FrontmatterValue::String("shelf-1".into()));
        index
            .upsert(id("wrench"), fm(&[("inventory", FrontmatterValue::Map(inventory))]))
            .unwrap();
        index
            .upsert(id("bare_shelf"), fm(&[("inventory", FrontmatterValue::empty_map())]))
            .unwrap();
        let mut empty_items = BTreeMap::new();
        empty_items.insert("items".to_string(), FrontmatterValue::List(vec![]));
        index
            .upsert(id("empty_box"), fm(&[("inventory", FrontmatterValue::Map(empty_items))]))
            .unwrap();

        assert!(index.query_key_exists("inventory").contains(&id("wrench")));
        assert!(index.query_key_exists("inventory.items").contains(&id("empty_box")));
    }

    #[test]
    fn identifier_key_is_never_indexed_at_the_top_level() {
        let index = FmIndex::new();
        index
            .upsert(
                id("garage"),
                fm(&[
                    ("identifier", FrontmatterValue::String("garage".into())),
                    ("title", FrontmatterValue::String("Garage".into())),
                ]),
            )
            .unwrap();

        assert!(index.query_exact("identifier", "garage").is_empty());
        assert_eq!(index.query_exact("title", "Garage"), vec![id("garage")]);
    }

    #[test]
    fn bool_true_is_indexed_but_false_is_not_even_as_presence() {
        let index = FmIndex::new();
        index
            .upsert(id("garage"), fm(&[("published", FrontmatterValue::Bool(true))]))
            .unwrap();
        index
            .upsert(id("draft"), fm(&[("published", FrontmatterValue::Bool(false))]))
            .unwrap();

        assert_eq!(index.query_exact("published", "true"), vec![id("garage")]);
        assert_eq!(index.query_key_exists("published"), vec![id("garage")]);
    }

    #[test]
    fn get_value_reads_back_raw_frontmatter() {
        let index = FmIndex::new();
        index
            .upsert(id("garage"), fm(&[("title", FrontmatterValue::String("Garage".into()))]))
            .unwrap();

        let values = index.get_value(&id("garage"), "title");
        assert_eq!(values, vec![FrontmatterValue::String("Garage".into())]);
    }
}
