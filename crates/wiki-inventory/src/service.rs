//! Container/item domain layer (C9).
//!
//! New domain layer with no direct teacher analogue; grounded on the
//! teacher's dotted-path frontmatter convention
//! (`adapt::mql::index::IndexRecord`'s `tax.*`/`publish.*` fields) for the
//! `inventory.container`/`inventory.items` relations: an item's own page
//! carries `inventory.container = <id>` (spec.md §4.9's primary relation),
//! and a container page may additionally enumerate `inventory.items = [...]`
//! for items that don't have their own page yet.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use wiki_core::{compose_block, Error as CoreError, FrontmatterValue, Identifier};
use wiki_coordinator::Coordinator;
use wiki_index_fm::FmIndex;
use wiki_store::PageStore;

use crate::error::Error;

pub struct InventoryService {
    store: Arc<dyn PageStore>,
    fm_index: Arc<FmIndex>,
    coordinator: Arc<Coordinator>,
}

/// One entry in a (possibly recursive) container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentsEntry {
    pub identifier: Identifier,
    /// 0 for direct contents; >0 when reached by recursing into a nested
    /// container (`listContents(.., recursive = true)`).
    pub depth: usize,
}

impl InventoryService {
    pub fn new(store: Arc<dyn PageStore>, fm_index: Arc<FmIndex>, coordinator: Arc<Coordinator>) -> Self {
        Self { store, fm_index, coordinator }
    }

    /// A page is a container if something else references it: an item's
    /// `inventory.container` points here, or it enumerates its own
    /// `inventory.items` (spec.md §4.9).
    pub fn is_container(&self, id: &Identifier) -> bool {
        !self.fm_index.query_exact("inventory.container", id.as_str()).is_empty()
            || self.fm_index.query_key_exists("inventory.items").contains(id)
    }

    /// Create `item_id` as a standalone page under `container_id`, carrying
    /// `inventory.container = container_id`. Fails with `AlreadyExists` if
    /// the canonical identifier is already taken.
    pub fn create_item(
        &self,
        item_id: &Identifier,
        container_id: &Identifier,
        title: Option<&str>,
    ) -> Result<(), Error> {
        if self.store.exists(item_id) {
            return Err(CoreError::AlreadyExists(item_id.as_str().to_string()).into());
        }

        let title = title.unwrap_or_else(|| item_id.as_str()).to_string();
        let mut inventory = BTreeMap::new();
        inventory.insert(
            "container".to_string(),
            FrontmatterValue::String(container_id.as_str().to_string()),
        );
        let mut root = BTreeMap::new();
        root.insert("title".to_string(), FrontmatterValue::String(title.clone()));
        root.insert("inventory".to_string(), FrontmatterValue::Map(inventory));

        let body = format!("# {title}\n\nAn item in [{container_id}](/{container_id}).\n");
        let text = compose_block(&FrontmatterValue::Map(root), &body);
        self.store.write(item_id, text)?;
        self.coordinator.enqueue_index_job(item_id.clone())?;
        Ok(())
    }

    /// Move `item_id` into `dest_container`. If `item_id` exists only as an
    /// entry in some container's `inventory.items` list, it is first given
    /// its own page. `inventory.container` is then set to `dest_container`
    /// on that page, and every `inventory.items` list that mentioned
    /// `item_id` is pruned of it.
    pub fn move_item(&self, item_id: &Identifier, dest_container: &Identifier) -> Result<(), Error> {
        if !self.store.exists(item_id) {
            let mut root = BTreeMap::new();
            root.insert(
                "title".to_string(),
                FrontmatterValue::String(item_id.as_str().to_string()),
            );
            let text = compose_block(&FrontmatterValue::Map(root), "");
            self.store.write(item_id, text)?;
        }

        let page = self.store.read(item_id)?;
        let mut root = as_map(page.frontmatter);
        let mut inventory = match root.remove("inventory") {
            Some(FrontmatterValue::Map(m)) => m,
            _ => BTreeMap::new(),
        };
        inventory.insert(
            "container".to_string(),
            FrontmatterValue::String(dest_container.as_str().to_string()),
        );
        root.insert("inventory".to_string(), FrontmatterValue::Map(inventory));
        let new_text = compose_block(&FrontmatterValue::Map(root), &page.body);
        self.store.write(item_id, new_text)?;
        self.coordinator.enqueue_index_job(item_id.clone())?;

        for container in self.fm_index.query_exact("inventory.items", item_id.as_str()) {
            self.remove_from_items_list(&container, item_id)?;
        }
        Ok(())
    }

    /// Everything belonging to `container_id`: items whose own
    /// `inventory.container` names it, plus anything it enumerates under
    /// `inventory.items`, deduplicated preferring the former. When
    /// `recursive`, also descends into any returned identifier that is
    /// itself a container.
    pub fn list_contents(&self, container_id: &Identifier, recursive: bool) -> Vec<ContentsEntry> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_contents(container_id, 0, recursive, &mut seen, &mut out);
        out
    }

    fn collect_contents(
        &self,
        container_id: &Identifier,
        depth: usize,
        recursive: bool,
        seen: &mut HashSet<Identifier>,
        out: &mut Vec<ContentsEntry>,
    ) {
        let mut items = self.fm_index.query_exact("inventory.container", container_id.as_str());
        for item in self.items_list_of(container_id) {
            if !items.contains(&item) {
                items.push(item);
            }
        }

        for item in items {
            if !seen.insert(item.clone()) {
                continue;
            }
            out.push(ContentsEntry { identifier: item.clone(), depth });
            if recursive && self.is_container(&item) {
                self.collect_contents(&item, depth + 1, recursive, seen, out);
            }
        }
    }

    /// Every container that currently references `item_id`, via either
    /// relation. More than one entry is an anomaly the caller (or the
    /// normalization job) may choose to report.
    pub fn find_location(&self, item_id: &Identifier) -> Vec<Identifier> {
        let mut out: Vec<Identifier> = self
            .fm_index
            .get_value(item_id, "inventory.container")
            .into_iter()
            .filter_map(|v| v.as_str().and_then(|s| Identifier::normalize(s).ok()))
            .collect();
        for container in self.fm_index.query_exact("inventory.items", item_id.as_str()) {
            if !out.contains(&container) {
                out.push(container);
            }
        }
        out
    }

    pub(crate) fn items_list_of(&self, container_id: &Identifier) -> Vec<Identifier> {
        self.fm_index
            .get_value(container_id, "inventory.items")
            .into_iter()
            .filter_map(|v| v.as_str().and_then(|s| Identifier::normalize(s).ok()))
            .collect()
    }

    pub(crate) fn remove_from_items_list(
        &self,
        container_id: &Identifier,
        item_id: &Identifier,
    ) -> Result<(), Error> {
        let page = self.store.read(container_id)?;
        let mut root = as_map(page.frontmatter);
        let mut inventory = match root.remove("inventory") {
            Some(FrontmatterValue::Map(m)) => m,
            _ => BTreeMap::new(),
        };
        let mut items = match inventory.remove("items") {
            Some(FrontmatterValue::List(l)) => l,
            _ => Vec::new(),
        };
        let before = items.len();
        items.retain(|v| v.as_str() != Some(item_id.as_str()));
        if items.len() == before {
            return Ok(());
        }

        inventory.insert("items".to_string(), FrontmatterValue::List(items));
        root.insert("inventory".to_string(), FrontmatterValue::Map(inventory));
        let new_text = compose_block(&FrontmatterValue::Map(root), &page.body);
        self.store.write(container_id, new_text)?;
        self.coordinator.enqueue_index_job(container_id.clone())?;
        Ok(())
    }
}

fn as_map(value: FrontmatterValue) -> BTreeMap<String, FrontmatterValue> {
    match value {
        FrontmatterValue::Map(m) => m,
        _ => BTreeMap::new(),
    }
}
