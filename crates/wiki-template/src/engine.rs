//! Sandboxed template expansion (C7).
//!
//! Grounded on `crates/adapt/src/render/template.rs`'s `TemplateEngine`
//! trait and `HbsEngine` wrapping `handlebars::Handlebars`. Handlebars's
//! default escaping (`{{x}}`) versus raw (`{{{x}}}`) directly satisfies
//! spec.md §4.7's escaping requirement. Registering no file/network/process
//! helpers — only the five query helpers below plus
//! `handlebars_misc_helpers`'s pure string/math/json helpers — satisfies
//! the sandboxing requirement without any extra enforcement machinery.

use std::sync::Arc;

use handlebars::Handlebars;
use serde::Serialize;

use crate::data_source::TemplateDataSource;
use crate::error::Error;
use crate::helpers::{
    FrontmatterOfHelper, IdentifiersWithHelper, IdentifiersWithKeyHelper,
    IdentifiersWithPrefixHelper, InventoryContentsOfHelper, LinkToHelper,
};

pub struct TemplateEngine {
    hbs: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new(data_source: Arc<dyn TemplateDataSource>) -> Self {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(false);

        handlebars_misc_helpers::register(&mut hbs);

        hbs.register_helper("IdentifiersWith", Box::new(IdentifiersWithHelper(data_source.clone())));
        hbs.register_helper(
            "IdentifiersWithKey",
            Box::new(IdentifiersWithKeyHelper(data_source.clone())),
        );
        hbs.register_helper(
            "IdentifiersWithPrefix",
            Box::new(IdentifiersWithPrefixHelper(data_source.clone())),
        );
        hbs.register_helper("FrontmatterOf", Box::new(FrontmatterOfHelper(data_source.clone())));
        hbs.register_helper(
            "InventoryContentsOf",
            Box::new(InventoryContentsOfHelper(data_source.clone())),
        );
        hbs.register_helper("LinkTo", Box::new(LinkToHelper(data_source)));

        Self { hbs }
    }

    /// Expand `template` against `context`, running it through no helpers
    /// beyond the ones registered in [`TemplateEngine::new`].
    pub fn expand<T: Serialize>(&self, template: &str, context: &T) -> Result<String, Error> {
        Ok(self.hbs.render_template(template, context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiki_core::{FrontmatterValue, Identifier};

    struct FakeDataSource;

    impl TemplateDataSource for FakeDataSource {
        fn frontmatter_at(&self, id: &Identifier, path: &str) -> Vec<FrontmatterValue> {
            if id.as_str() == "garage" && path == "title" {
                vec![FrontmatterValue::String("Garage".to_string())]
            } else {
                vec![]
            }
        }

        fn identifiers_with_key(&self, path: &str) -> Vec<Identifier> {
            if path == "inventory.container" {
                vec![Identifier::normalize("garage").unwrap()]
            } else {
                vec![]
            }
        }

        fn identifiers_with_value(&self, _path: &str, _value: &str) -> Vec<Identifier> {
            vec![]
        }

        fn identifiers_with_prefix(&self, _path: &str, _value_prefix: &str) -> Vec<Identifier> {
            vec![]
        }
    }

    #[test]
    fn expands_plain_context_values_with_escaping() {
        let engine = TemplateEngine::new(Arc::new(FakeDataSource));
        let out = engine.expand("Hello {{name}}", &json!({"name": "<script>"})).unwrap();
        assert_eq!(out, "Hello &lt;script&gt;");
    }

    #[test]
    fn raw_triple_brace_skips_escaping() {
        let engine = TemplateEngine::new(Arc::new(FakeDataSource));
        let out = engine.expand("{{{name}}}", &json!({"name": "<b>x</b>"})).unwrap();
        assert_eq!(out, "<b>x</b>");
    }

    #[test]
    fn link_to_helper_uses_the_target_pages_title() {
        let engine = TemplateEngine::new(Arc::new(FakeDataSource));
        let out = engine.expand("{{LinkTo \"garage\"}}", &json!({})).unwrap();
        assert_eq!(out, "[Garage](/garage)");
    }

    #[test]
    fn frontmatter_of_helper_reads_through_the_data_source() {
        let engine = TemplateEngine::new(Arc::new(FakeDataSource));
        let out = engine.expand("{{FrontmatterOf \"garage\" \"title\"}}", &json!({})).unwrap();
        assert_eq!(out, "Garage");
    }

    #[test]
    fn range_over_identifiers_with_key_expands_one_entry_per_match() {
        let engine = TemplateEngine::new(Arc::new(FakeDataSource));
        let out = engine
            .expand(
                "{{#each (IdentifiersWithKey \"inventory.container\")}}- {{LinkTo this}}\n{{/each}}",
                &json!({}),
            )
            .unwrap();
        assert_eq!(out, "- [Garage](/garage)\n");
    }

    #[test]
    fn identifiers_with_key_helper_queries_the_data_source_exactly_once() {
        use crate::data_source::MockTemplateDataSource;

        let mut mock = MockTemplateDataSource::new();
        mock.expect_identifiers_with_key()
            .withf(|path| path == "inventory.container")
            .times(1)
            .returning(|_| vec![Identifier::normalize("garage").unwrap()]);

        let engine = TemplateEngine::new(Arc::new(mock));
        let out = engine
            .expand("{{#each (IdentifiersWithKey \"inventory.container\")}}{{this}}\n{{/each}}", &json!({}))
            .unwrap();
        assert_eq!(out, "garage\n");
    }
}
