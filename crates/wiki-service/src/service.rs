//! `WikiService`: the RPC-contract-shaped operations of spec.md §6 (page
//! management, frontmatter, search), transport-agnostic by design. The HTTP
//! surface in `router.rs` is one caller of this type; nothing here knows
//! about Axum.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wiki_core::{compose_block, FrontmatterValue, Identifier, PathComponent};
use wiki_coordinator::Coordinator;
use wiki_index_fm::FmIndex;
use wiki_index_text::TextIndex;
use wiki_render::RenderPipeline;
use wiki_store::PageStore;

use crate::error::Error;

/// `PathComponent` carries no `serde` impl in `wiki-core` (it has no reason
/// to cross a wire there); this is the on-the-wire tagged union spec.md §6
/// describes for `RemoveKeyAtPath`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key { key: String },
    Index { index: usize },
}

impl From<&PathSegment> for PathComponent {
    fn from(seg: &PathSegment) -> Self {
        match seg {
            PathSegment::Key { key } => PathComponent::Key(key.clone()),
            PathSegment::Index { index } => PathComponent::Index(*index),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageView {
    pub markdown: String,
    pub frontmatter_toml: String,
    pub rendered_html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub identifier: String,
    pub title: String,
    pub fragment: String,
}

pub struct WikiService {
    store: Arc<dyn PageStore>,
    fm_index: Arc<FmIndex>,
    text_index: Arc<TextIndex>,
    coordinator: Arc<Coordinator>,
    render_pipeline: Arc<RenderPipeline>,
}

impl WikiService {
    pub fn new(
        store: Arc<dyn PageStore>,
        fm_index: Arc<FmIndex>,
        text_index: Arc<TextIndex>,
        coordinator: Arc<Coordinator>,
        render_pipeline: Arc<RenderPipeline>,
    ) -> Self {
        Self { store, fm_index, text_index, coordinator, render_pipeline }
    }

    fn parse_toml(frontmatter_toml: &str) -> Result<FrontmatterValue, Error> {
        if frontmatter_toml.trim().is_empty() {
            return Ok(FrontmatterValue::empty_map());
        }
        let value: toml::Value = toml::from_str(frontmatter_toml)
            .map_err(|e| Error::FrontmatterParse(e.to_string()))?;
        Ok(value.into())
    }

    fn to_toml(frontmatter: &FrontmatterValue) -> String {
        toml::to_string(&toml::Value::from(frontmatter)).unwrap_or_default()
    }

    fn enqueue_and_invalidate(&self, id: &Identifier) -> Result<(), Error> {
        self.render_pipeline.invalidate(id);
        self.coordinator.enqueue_index_job(id.clone())?;
        Ok(())
    }

    pub fn create(&self, name: &str, markdown: &str, frontmatter_toml: &str) -> Result<(), Error> {
        let id = Identifier::normalize(name)?;
        if self.store.exists(&id) {
            return Err(wiki_core::Error::AlreadyExists(id.as_str().to_string()).into());
        }
        let frontmatter = Self::parse_toml(frontmatter_toml)?;
        let text = compose_block(&frontmatter, markdown);
        self.store.write(&id, text)?;
        self.enqueue_and_invalidate(&id)?;
        Ok(())
    }

    pub fn read(&self, name: &str) -> Result<PageView, Error> {
        let id = Identifier::normalize(name)?;
        let page = self.store.read(&id)?;
        let rendered = self.render_pipeline.render(&page)?;
        Ok(PageView {
            markdown: page.body,
            frontmatter_toml: Self::to_toml(&page.frontmatter),
            rendered_html: rendered.html,
        })
    }

    pub fn render(&self, name: &str) -> Result<String, Error> {
        let id = Identifier::normalize(name)?;
        let page = self.store.read(&id)?;
        Ok(self.render_pipeline.render(&page)?.html)
    }

    /// Absent/empty `markdown`/`frontmatter_toml` preserve the prior value,
    /// per spec.md §6.
    pub fn update(
        &self,
        name: &str,
        markdown: Option<&str>,
        frontmatter_toml: Option<&str>,
    ) -> Result<(), Error> {
        let id = Identifier::normalize(name)?;
        let prior = self.store.read(&id)?;

        let body = match markdown {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => prior.body,
        };
        let frontmatter = match frontmatter_toml {
            Some(t) if !t.trim().is_empty() => Self::parse_toml(t)?,
            _ => prior.frontmatter,
        };

        let text = compose_block(&frontmatter, &body);
        self.store.write(&id, text)?;
        self.enqueue_and_invalidate(&id)?;
        Ok(())
    }

    pub fn update_content(&self, name: &str, markdown: &str) -> Result<(), Error> {
        let id = Identifier::normalize(name)?;
        let prior = self.store.read(&id)?;
        let text = compose_block(&prior.frontmatter, markdown);
        self.store.write(&id, text)?;
        self.enqueue_and_invalidate(&id)?;
        Ok(())
    }

    /// `text` already includes its own frontmatter block (spec.md §6).
    pub fn update_whole(&self, name: &str, text: &str) -> Result<(), Error> {
        let id = Identifier::normalize(name)?;
        self.store.write(&id, text.to_string())?;
        self.enqueue_and_invalidate(&id)?;
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<(), Error> {
        let id = Identifier::normalize(name)?;
        self.store.delete(&id)?;
        self.enqueue_and_invalidate(&id)?;
        Ok(())
    }

    pub fn frontmatter_get(&self, name: &str) -> Result<serde_json::Value, Error> {
        let id = Identifier::normalize(name)?;
        let page = self.store.read(&id)?;
        Ok(page.frontmatter.to_json())
    }

    pub fn frontmatter_merge(
        &self,
        name: &str,
        overlay: serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        let id = Identifier::normalize(name)?;
        let page = self.store.read(&id)?;
        let merged = page.frontmatter.merge(&overlay.into());
        let text = compose_block(&merged, &page.body);
        self.store.write(&id, text)?;
        self.enqueue_and_invalidate(&id)?;
        Ok(merged.to_json())
    }

    pub fn frontmatter_replace(
        &self,
        name: &str,
        replacement: serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        let id = Identifier::normalize(name)?;
        let page = self.store.read(&id)?;
        let replacement: FrontmatterValue = replacement.into();
        let text = compose_block(&replacement, &page.body);
        self.store.write(&id, text)?;
        self.enqueue_and_invalidate(&id)?;
        Ok(replacement.to_json())
    }

    pub fn frontmatter_remove_key_at_path(
        &self,
        name: &str,
        path: &[PathSegment],
    ) -> Result<serde_json::Value, Error> {
        let id = Identifier::normalize(name)?;
        let page = self.store.read(&id)?;
        let components: Vec<PathComponent> = path.iter().map(PathComponent::from).collect();
        let updated = page.frontmatter.remove_path(&components);
        let text = compose_block(&updated, &page.body);
        self.store.write(&id, text)?;
        self.enqueue_and_invalidate(&id)?;
        Ok(updated.to_json())
    }

    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, Error> {
        if !self.text_index.is_ready() {
            return Ok(Vec::new());
        }
        let hits = self.text_index.search(query, limit)?;
        Ok(hits
            .into_iter()
            .map(|h| SearchResult {
                identifier: h.identifier.as_str().to_string(),
                title: h.title,
                fragment: h.fragment,
            })
            .collect())
    }
}
