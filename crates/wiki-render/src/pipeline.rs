//! Page render pipeline (C8): parse → template-expand → Markdown→HTML →
//! compose, with a render cache keyed by `(identifier, mod_time)`.
//!
//! Grounded on `crates/adapt/src/render/pipeline.rs`'s staged
//! render-to-writer shape and `crates/serve/src/ctx.rs::AppCtx`'s
//! optional-dependency builder (`set_x`/`with_x`), but returning
//! `NotInitialized` errors instead of `expect()`-panicking when a required
//! dependency hasn't been injected yet (spec.md §4.8).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use wiki_core::{Identifier, Page};
use wiki_template::TemplateEngine;

use crate::error::Error;
use crate::markdown::MarkdownRenderer;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub html: String,
    pub expanded_markdown: String,
    pub frontmatter_json: serde_json::Value,
    /// Set when template expansion failed. The page is still served: per
    /// spec.md §4.7/§7, a `TemplateError` is locally contained rather than
    /// failing the whole render, so `expanded_markdown`/`html` above fall
    /// back to the page's original, unexpanded body.
    pub template_error: Option<String>,
}

type CacheKey = (Identifier, DateTime<Utc>);

pub struct RenderPipeline {
    template_engine: Option<Arc<TemplateEngine>>,
    renderer: Option<Arc<dyn MarkdownRenderer>>,
    cache: RwLock<HashMap<CacheKey, RenderedPage>>,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self { template_engine: None, renderer: None, cache: RwLock::new(HashMap::new()) }
    }

    pub fn with_template_engine(mut self, engine: Arc<TemplateEngine>) -> Self {
        self.template_engine = Some(engine);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Render `page`, reusing a cached result if nothing has changed since
    /// it was last rendered (same identifier, same `mod_time`).
    pub fn render(&self, page: &Page) -> Result<RenderedPage, Error> {
        let key = page.cache_key();
        if let Some(cached) = self.cache.read().get(&key) {
            return Ok(cached.clone());
        }

        let engine = self
            .template_engine
            .as_ref()
            .ok_or(Error::NotInitialized("template engine"))?;
        let renderer = self.renderer.as_ref().ok_or(Error::NotInitialized("markdown renderer"))?;

        let frontmatter_json = page.frontmatter.to_json();
        // A `TemplateError` is locally contained (spec.md §4.7, §7): the
        // original template text is served as-is, with the error string
        // alongside it, rather than failing the whole render.
        let (expanded_markdown, template_error) = match engine.expand(&page.body, &frontmatter_json)
        {
            Ok(expanded) => (expanded, None),
            Err(e) => {
                tracing::warn!(identifier = %page.identifier, error = %e, "template expansion failed, serving raw body");
                (page.body.clone(), Some(e.to_string()))
            }
        };
        let html = renderer.render(&expanded_markdown);

        let rendered = RenderedPage { html, expanded_markdown, frontmatter_json, template_error };
        self.cache.write().insert(key, rendered.clone());
        Ok(rendered)
    }

    /// Drop any cached render for `id`, forcing the next `render` call to
    /// recompute regardless of `mod_time`. Used when a page is deleted so a
    /// stale cache entry cannot outlive the page it was rendered from.
    pub fn invalidate(&self, id: &Identifier) {
        self.cache.write().retain(|(cached_id, _), _| cached_id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::ComrakRenderer;
    use wiki_template::TemplateDataSource;

    struct EmptyDataSource;
    impl TemplateDataSource for EmptyDataSource {
        fn frontmatter_at(&self, _id: &Identifier, _path: &str) -> Vec<wiki_core::FrontmatterValue> {
            vec![]
        }
        fn identifiers_with_key(&self, _path: &str) -> Vec<Identifier> {
            vec![]
        }
        fn identifiers_with_value(&self, _path: &str, _value: &str) -> Vec<Identifier> {
            vec![]
        }
        fn identifiers_with_prefix(&self, _path: &str, _value_prefix: &str) -> Vec<Identifier> {
            vec![]
        }
    }

    fn page(body: &str) -> Page {
        Page::from_text(
            Identifier::normalize("garage").unwrap(),
            format!("+++\ntitle = \"Garage\"\n+++\n{body}"),
            Utc::now(),
        )
    }

    #[test]
    fn render_without_dependencies_returns_not_initialized() {
        let pipeline = RenderPipeline::new();
        let err = pipeline.render(&page("hello")).unwrap_err();
        assert!(matches!(err, Error::NotInitialized("template engine")));
    }

    #[test]
    fn render_without_renderer_but_with_engine_still_fails_cleanly() {
        let pipeline = RenderPipeline::new().with_template_engine(Arc::new(TemplateEngine::new(
            Arc::new(EmptyDataSource),
        )));
        let err = pipeline.render(&page("hello")).unwrap_err();
        assert!(matches!(err, Error::NotInitialized("markdown renderer")));
    }

    #[test]
    fn fully_wired_pipeline_produces_html_and_frontmatter_json() {
        let pipeline = RenderPipeline::new()
            .with_template_engine(Arc::new(TemplateEngine::new(Arc::new(EmptyDataSource))))
            .with_renderer(Arc::new(ComrakRenderer::new()));

        let rendered = pipeline.render(&page("# Hello\n")).unwrap();
        assert!(rendered.html.contains("<h1>"));
        assert_eq!(rendered.frontmatter_json["title"], "Garage");
    }

    #[test]
    fn template_error_is_contained_and_the_page_still_serves() {
        let pipeline = RenderPipeline::new()
            .with_template_engine(Arc::new(TemplateEngine::new(Arc::new(EmptyDataSource))))
            .with_renderer(Arc::new(ComrakRenderer::new()));

        // Unclosed block helper: a template compile error, not a missing
        // dependency. The page must still render rather than erroring out.
        let broken = page("{{#if unclosed}}oops\n");
        let rendered = pipeline.render(&broken).unwrap();
        assert!(rendered.template_error.is_some());
        assert_eq!(rendered.expanded_markdown, broken.body);
        assert!(rendered.html.contains("oops"));
    }

    #[test]
    fn template_error_still_forwards_the_raw_body_to_the_renderer() {
        use crate::markdown::MockMarkdownRenderer;

        let mut renderer = MockMarkdownRenderer::new();
        renderer
            .expect_render()
            .withf(|markdown| markdown == "{{#if unclosed}}oops\n")
            .times(1)
            .returning(|markdown| format!("<p>{markdown}</p>"));

        let pipeline = RenderPipeline::new()
            .with_template_engine(Arc::new(TemplateEngine::new(Arc::new(EmptyDataSource))))
            .with_renderer(Arc::new(renderer));

        let rendered = pipeline.render(&page("{{#if unclosed}}oops\n")).unwrap();
        assert!(rendered.template_error.is_some());
    }

    #[test]
    fn identical_mod_time_hits_the_cache() {
        let pipeline = RenderPipeline::new()
            .with_template_engine(Arc::new(TemplateEngine::new(Arc::new(EmptyDataSource))))
            .with_renderer(Arc::new(ComrakRenderer::new()));

        let p = page("hello\n");
        let first = pipeline.render(&p).unwrap();
        let second = pipeline.render(&p).unwrap();
        assert_eq!(first, second);
    }
}
