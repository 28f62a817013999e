//! The query-function boundary templates are allowed to read through.
//!
//! Every helper in this crate reaches C2/C3/C4 exclusively through this
//! trait, never directly, per spec.md §9's design note ("All C2/C3/C4
//! access must route through an injected interface so tests can supply
//! fakes"). No implementation here touches the filesystem, network, or a
//! subprocess, which is what makes the template sandbox a sandbox: there is
//! simply nothing registered that could reach outside the wiki's own data.

use wiki_core::{FrontmatterValue, Identifier};

#[cfg_attr(test, mockall::automock)]
pub trait TemplateDataSource: Send + Sync {
    /// Every value reachable at `path` within `id`'s frontmatter.
    fn frontmatter_at(&self, id: &Identifier, path: &str) -> Vec<FrontmatterValue>;

    /// Identifiers that have any value at all at `path`.
    fn identifiers_with_key(&self, path: &str) -> Vec<Identifier>;

    /// Identifiers whose value at `path` equals `value` exactly.
    fn identifiers_with_value(&self, path: &str, value: &str) -> Vec<Identifier>;

    /// Identifiers whose value at `path` starts with `value_prefix`.
    fn identifiers_with_prefix(&self, path: &str, value_prefix: &str) -> Vec<Identifier>;

    /// Items belonging to `container_id`: everything whose own
    /// `inventory.container` points here, plus anything `container_id`
    /// enumerates under `inventory.items` that isn't already covered,
    /// preferring the former when both name the same identifier
    /// (spec.md §4.7, `InventoryContentsOf`).
    fn inventory_contents_of(&self, container_id: &Identifier) -> Vec<Identifier> {
        let mut out = self.identifiers_with_value("inventory.container", container_id.as_str());
        for value in self.frontmatter_at(container_id, "inventory.items") {
            if let Some(raw) = value.as_str() {
                if let Ok(id) = Identifier::normalize(raw) {
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
            }
        }
        out
    }
}
