//! Inventory normalization job: a scheduled audit pass (SPEC_FULL.md §D.2:
//! scheduled only, never run at cold start) that reconciles the two ways an
//! item can be placed — its own `inventory.container`, or a container's
//! `inventory.items` list — and reports what it cannot safely fix. Continues
//! past a per-container failure and records it, the same discipline
//! `crates/serve/src/indexer.rs::scan_and_process_docs` uses when walking
//! many documents.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use wiki_core::{compose_block, FrontmatterValue, Identifier};
use wiki_coordinator::Coordinator;
use wiki_index_fm::FmIndex;
use wiki_store::PageStore;

use crate::error::Error;
use crate::service::InventoryService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// `item` is referenced as belonging to more than one container.
    DuplicateLocation { item: Identifier, containers: Vec<Identifier> },
    /// A chain of containers-as-items loops back on itself.
    Cycle { path: Vec<Identifier> },
    /// `container` lists `item` in `inventory.items`, but no such page
    /// exists in the store and it could not be materialized.
    DanglingItem { container: Identifier, item: Identifier },
}

pub const AUDIT_REPORT_IDENTIFIER: &str = "inventory_audit_report";

pub struct Normalizer {
    store: Arc<dyn PageStore>,
    fm_index: Arc<FmIndex>,
    coordinator: Arc<Coordinator>,
    inventory: InventoryService,
}

impl Normalizer {
    pub fn new(store: Arc<dyn PageStore>, fm_index: Arc<FmIndex>, coordinator: Arc<Coordinator>) -> Self {
        let inventory = InventoryService::new(store.clone(), fm_index.clone(), coordinator.clone());
        Self { store, fm_index, coordinator, inventory }
    }

    /// Run one normalization pass, writing its findings to a real page
    /// (`AUDIT_REPORT_IDENTIFIER`) rather than only a log line, so the
    /// report is itself readable and searchable.
    pub fn run(&self) -> Result<Identifier, Error> {
        let mut anomalies = Vec::new();

        // Step 1: for every container's `inventory.items` list, materialize
        // a page for any item that has none yet, and drop the list entry
        // once the item's own page carries `inventory.container` (the two
        // relations would otherwise say the same thing twice).
        for container in self.fm_index.query_key_exists("inventory.items") {
            for item in self.items_list_of(&container) {
                if !self.store.exists(&item) {
                    if let Err(e) = self.inventory.create_item(&item, &container, None) {
                        warn!(container = %container, item = %item, error = %e, "could not materialize item page during normalization");
                        anomalies.push(Anomaly::DanglingItem { container: container.clone(), item });
                    }
                    continue;
                }
                let already_placed = !self.fm_index.get_value(&item, "inventory.container").is_empty();
                if already_placed {
                    if let Err(e) = self.inventory.remove_from_items_list(&container, &item) {
                        warn!(container = %container, item = %item, error = %e, "could not prune redundant inventory.items entry");
                    }
                }
            }
        }

        // Step 2: duplicate locations (an item whose `findLocation` would
        // return more than one container) are unfixable automatically —
        // report them.
        let mut locations: HashMap<Identifier, Vec<Identifier>> = HashMap::new();
        for item in self.all_known_items() {
            let here = self.inventory.find_location(&item);
            if here.len() > 1 {
                locations.insert(item, here);
            }
        }
        for (item, mut containers) in locations {
            containers.sort();
            anomalies.push(Anomaly::DuplicateLocation { item, containers });
        }

        // Step 3: circular containment among containers that are
        // themselves items of another container.
        let containers = self.fm_index.query_key_exists("inventory.items");
        let container_set: HashSet<&Identifier> = containers.iter().collect();
        let mut items_by_container: HashMap<Identifier, Vec<Identifier>> = HashMap::new();
        for container in &containers {
            items_by_container.insert(container.clone(), self.items_list_of(container));
        }
        for start in &containers {
            if let Some(path) = detect_cycle(start, &items_by_container, &container_set) {
                anomalies.push(Anomaly::Cycle { path });
            }
        }
        dedup_cycles(&mut anomalies);

        let report_id = Identifier::normalize(AUDIT_REPORT_IDENTIFIER)?;
        let text = render_report(&anomalies);
        self.store.write(&report_id, text)?;
        self.coordinator.enqueue_index_job(report_id.clone())?;
        Ok(report_id)
    }

    fn items_list_of(&self, container_id: &Identifier) -> Vec<Identifier> {
        self.fm_index
            .get_value(container_id, "inventory.items")
            .into_iter()
            .filter_map(|v| v.as_str().and_then(|s| Identifier::normalize(s).ok()))
            .collect()
    }

    /// Every identifier that participates in the inventory system at all:
    /// named as an item somewhere, or carrying its own `inventory.container`.
    fn all_known_items(&self) -> BTreeSet<Identifier> {
        let mut out: BTreeSet<Identifier> = self.fm_index.query_key_exists("inventory.container").into_iter().collect();
        for container in self.fm_index.query_key_exists("inventory.items") {
            out.extend(self.items_list_of(&container));
        }
        out
    }
}

fn detect_cycle(
    start: &Identifier,
    items_by_container: &HashMap<Identifier, Vec<Identifier>>,
    container_set: &HashSet<&Identifier>,
) -> Option<Vec<Identifier>> {
    let mut stack = vec![start.clone()];
    let mut on_stack: BTreeSet<Identifier> = BTreeSet::new();
    on_stack.insert(start.clone());

    fn walk(
        current: &Identifier,
        items_by_container: &HashMap<Identifier, Vec<Identifier>>,
        container_set: &HashSet<&Identifier>,
        stack: &mut Vec<Identifier>,
        on_stack: &mut BTreeSet<Identifier>,
    ) -> Option<Vec<Identifier>> {
        let Some(children) = items_by_container.get(current) else {
            return None;
        };
        for child in children {
            if !container_set.contains(child) {
                continue;
            }
            if on_stack.contains(child) {
                let cycle_start = stack.iter().position(|n| n == child).unwrap_or(0);
                let mut path = stack[cycle_start..].to_vec();
                path.push(child.clone());
                return Some(path);
            }
            stack.push(child.clone());
            on_stack.insert(child.clone());
            if let Some(found) = walk(child, items_by_container, container_set, stack, on_stack) {
                return Some(found);
            }
            stack.pop();
            on_stack.remove(child);
        }
        None
    }

    walk(start, items_by_container, container_set, &mut stack, &mut on_stack)
}

/// Cycle detection from every node finds the same loop once per node on it;
/// keep only one report per distinct cycle (compared as a rotation-free set
/// of members).
fn dedup_cycles(anomalies: &mut Vec<Anomaly>) {
    let mut seen: Vec<BTreeSet<Identifier>> = Vec::new();
    anomalies.retain(|a| {
        let Anomaly::Cycle { path } = a else { return true };
        let members: BTreeSet<Identifier> = path.iter().cloned().collect();
        if seen.contains(&members) {
            false
        } else {
            seen.push(members);
            true
        }
    });
}

fn render_report(anomalies: &[Anomaly]) -> String {
    let mut body = String::new();
    body.push_str(&format!("Inventory audit: {} anomalies found.\n\n", anomalies.len()));
    for anomaly in anomalies {
        match anomaly {
            Anomaly::DuplicateLocation { item, containers } => {
                let names: Vec<&str> = containers.iter().map(|c| c.as_str()).collect();
                body.push_str(&format!(
                    "- duplicate location: {} is listed in {}\n",
                    item.as_str(),
                    names.join(", ")
                ));
            }
            Anomaly::Cycle { path } => {
                let names: Vec<&str> = path.iter().map(|c| c.as_str()).collect();
                body.push_str(&format!("- cycle: {}\n", names.join(" -> ")));
            }
            Anomaly::DanglingItem { container, item } => {
                body.push_str(&format!(
                    "- dangling reference: {} lists {}, which no longer exists\n",
                    container.as_str(),
                    item.as_str()
                ));
            }
        }
    }

    let mut root = std::collections::BTreeMap::new();
    root.insert("generated_at".to_string(), FrontmatterValue::String(Utc::now().to_rfc3339()));
    root.insert("anomaly_count".to_string(), FrontmatterValue::Number(anomalies.len() as f64));
    compose_block(&FrontmatterValue::Map(root), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiki_index_text::TextIndex;
    use wiki_jobs::JobSystem;
    use wiki_store::FsPageStore;

    fn setup() -> (tempfile::TempDir, Normalizer, Arc<dyn PageStore>, Arc<Coordinator>) {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn PageStore> = Arc::new(FsPageStore::new(dir.path(), 4).unwrap());
        let fm_index = Arc::new(FmIndex::new());
        let text_index = Arc::new(TextIndex::create_in_ram().unwrap());
        let jobs = Arc::new(JobSystem::new());
        let coordinator =
            Arc::new(Coordinator::new(store.clone(), fm_index.clone(), text_index, jobs, 16).unwrap());
        let normalizer = Normalizer::new(store.clone(), fm_index, coordinator.clone());
        (dir, normalizer, store, coordinator)
    }

    fn id(s: &str) -> Identifier {
        Identifier::normalize(s).unwrap()
    }

    #[test]
    fn clean_inventory_produces_a_zero_anomaly_report() {
        let (_dir, normalizer, store, coordinator) = setup();
        store
            .write(&id("garage"), "+++\n[inventory]\nitems = [\"wrench\"]\n+++\n".to_string())
            .unwrap();
        coordinator.enqueue_index_job(id("garage")).unwrap();
        coordinator.wait_for_completion_with_timeout(Duration::from_secs(2)).unwrap();

        let report_id = normalizer.run().unwrap();
        let report = store.read(&report_id).unwrap();
        assert!(report.body.contains("0 anomalies"));
        // the dangling "wrench" reference was materialized into its own page
        assert!(store.exists(&id("wrench")));
    }

    #[test]
    fn item_only_in_items_list_is_materialized_into_its_own_page() {
        let (_dir, normalizer, store, coordinator) = setup();
        store
            .write(&id("drawer_a"), "+++\n[inventory]\nitems = [\"old_cable\"]\n+++\n".to_string())
            .unwrap();
        coordinator.enqueue_index_job(id("drawer_a")).unwrap();
        coordinator.wait_for_completion_with_timeout(Duration::from_secs(2)).unwrap();

        normalizer.run().unwrap();

        assert!(store.exists(&id("old_cable")));
        let page = store.read(&id("old_cable")).unwrap();
        assert_eq!(
            page.frontmatter
                .as_map()
                .unwrap()
                .get("inventory")
                .unwrap()
                .as_map()
                .unwrap()
                .get("container")
                .unwrap()
                .as_str(),
            Some("drawer_a")
        );
    }

    #[test]
    fn redundant_items_list_entry_is_pruned_once_the_item_has_its_own_container_field() {
        let (_dir, normalizer, store, coordinator) = setup();
        store
            .write(&id("garage"), "+++\n[inventory]\nitems = [\"wrench\"]\n+++\n".to_string())
            .unwrap();
        store
            .write(
                &id("wrench"),
                "+++\n[inventory]\ncontainer = \"garage\"\n+++\n".to_string(),
            )
            .unwrap();
        coordinator.enqueue_index_job(id("garage")).unwrap();
        coordinator.enqueue_index_job(id("wrench")).unwrap();
        coordinator.wait_for_completion_with_timeout(Duration::from_secs(2)).unwrap();

        normalizer.run().unwrap();
        coordinator.enqueue_index_job(id("garage")).unwrap();
        coordinator.wait_for_completion_with_timeout(Duration::from_secs(2)).unwrap();

        let garage = store.read(&id("garage")).unwrap();
        let items = garage
            .frontmatter
            .as_map()
            .unwrap()
            .get("inventory")
            .unwrap()
            .as_map()
            .unwrap()
            .get("items")
            .unwrap()
            .as_list()
            .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn duplicate_location_is_reported() {
        let (_dir, normalizer, store, coordinator) = setup();
        store
            .write(&id("garage"), "+++\n[inventory]\nitems = [\"wrench\"]\n+++\n".to_string())
            .unwrap();
        store
            .write(&id("shed"), "+++\n[inventory]\nitems = [\"wrench\"]\n+++\n".to_string())
            .unwrap();
        coordinator.enqueue_index_job(id("garage")).unwrap();
        coordinator.enqueue_index_job(id("shed")).unwrap();
        coordinator.wait_for_completion_with_timeout(Duration::from_secs(2)).unwrap();

        let report_id = normalizer.run().unwrap();
        let report = store.read(&report_id).unwrap();
        assert!(report.body.contains("duplicate location"));
    }

    #[test]
    fn container_cycle_is_detected_rather_than_looping() {
        let (_dir, normalizer, store, coordinator) = setup();
        store
            .write(&id("box_a"), "+++\n[inventory]\nitems = [\"box_b\"]\n+++\n".to_string())
            .unwrap();
        store
            .write(&id("box_b"), "+++\n[inventory]\nitems = [\"box_a\"]\n+++\n".to_string())
            .unwrap();
        coordinator.enqueue_index_job(id("box_a")).unwrap();
        coordinator.enqueue_index_job(id("box_b")).unwrap();
        coordinator.wait_for_completion_with_timeout(Duration::from_secs(2)).unwrap();

        let report_id = normalizer.run().unwrap();
        let report = store.read(&report_id).unwrap();
        assert!(report.body.contains("cycle:"));
    }
}
