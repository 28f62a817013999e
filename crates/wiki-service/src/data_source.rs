//! [`wiki_template::TemplateDataSource`] backed by the real store and
//! frontmatter index, rather than a test fake.
//!
//! `frontmatter_at` resolves SPEC_FULL.md §D.5: the frontmatter index is
//! queried first; when `id` hasn't been indexed yet (the window between a
//! write landing in C2 and the background job draining), it falls back to a
//! direct C2 read and walks the path itself, so a freshly-created page's own
//! templates still see its frontmatter immediately.

use std::sync::Arc;

use wiki_core::{FrontmatterValue, Identifier};
use wiki_index_fm::FmIndex;
use wiki_store::PageStore;
use wiki_template::TemplateDataSource;

pub struct WikiDataSource {
    store: Arc<dyn PageStore>,
    fm_index: Arc<FmIndex>,
}

impl WikiDataSource {
    pub fn new(store: Arc<dyn PageStore>, fm_index: Arc<FmIndex>) -> Self {
        Self { store, fm_index }
    }
}

impl TemplateDataSource for WikiDataSource {
    fn frontmatter_at(&self, id: &Identifier, path: &str) -> Vec<FrontmatterValue> {
        if self.fm_index.is_indexed(id) {
            return self.fm_index.get_value(id, path);
        }
        match self.store.read(id) {
            Ok(page) => {
                let components = FrontmatterValue::parse_path(path);
                page.frontmatter.get_path(&components).into_iter().cloned().collect()
            }
            Err(_) => vec![],
        }
    }

    fn identifiers_with_key(&self, path: &str) -> Vec<Identifier> {
        self.fm_index.query_key_exists(path)
    }

    fn identifiers_with_value(&self, path: &str, value: &str) -> Vec<Identifier> {
        self.fm_index.query_exact(path, value)
    }

    fn identifiers_with_prefix(&self, path: &str, value_prefix: &str) -> Vec<Identifier> {
        self.fm_index.query_prefix(path, value_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiki_store::FsPageStore;

    fn id(s: &str) -> Identifier {
        Identifier::normalize(s).unwrap()
    }

    #[test]
    fn falls_back_to_a_direct_store_read_before_the_page_is_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn PageStore> = Arc::new(FsPageStore::new(dir.path(), 4).unwrap());
        let fm_index = Arc::new(FmIndex::new());
        store.write(&id("garage"), "+++\ntitle = \"Garage\"\n+++\n".to_string()).unwrap();

        let source = WikiDataSource::new(store, fm_index);
        let values = source.frontmatter_at(&id("garage"), "title");
        assert_eq!(values, vec![FrontmatterValue::String("Garage".to_string())]);
    }

    #[test]
    fn prefers_the_index_once_the_page_has_been_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn PageStore> = Arc::new(FsPageStore::new(dir.path(), 4).unwrap());
        let fm_index = Arc::new(FmIndex::new());
        store.write(&id("garage"), "+++\ntitle = \"Garage\"\n+++\n".to_string()).unwrap();
        fm_index
            .upsert(id("garage"), store.read(&id("garage")).unwrap().frontmatter)
            .unwrap();

        let source = WikiDataSource::new(store, fm_index);
        let values = source.frontmatter_at(&id("garage"), "title");
        assert_eq!(values, vec![FrontmatterValue::String("Garage".to_string())]);
    }
}
