//! Custom Handlebars helpers backed by a [`TemplateDataSource`].
//!
//! Each helper is a thin `HelperDef` wrapping one data-source query; none of
//! them accept a block body or do anything beyond translate arguments into
//! a query and the result into JSON, matching Handlebars's default
//! auto-escaping for `{{x}}` use (raw `{{{x}}}` opts out, same as any other
//! helper result) per spec.md §4.7.

use std::sync::Arc;

use handlebars::{Context, Handlebars, Helper, HelperDef, RenderContext, RenderErrorReason, ScopedJson};
use wiki_core::Identifier;

use crate::data_source::TemplateDataSource;

fn string_param<'a>(h: &'a Helper, index: usize, name: &'static str) -> Result<&'a str, handlebars::RenderError> {
    h.param(index)
        .and_then(|p| p.value().as_str())
        .ok_or_else(|| RenderErrorReason::ParamNotFoundForIndex(name, index).into())
}

fn identifiers_json(ids: Vec<Identifier>) -> serde_json::Value {
    serde_json::Value::Array(
        ids.into_iter().map(|id| serde_json::Value::String(id.into_string())).collect(),
    )
}

pub struct IdentifiersWithHelper(pub Arc<dyn TemplateDataSource>);

impl HelperDef for IdentifiersWithHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, handlebars::RenderError> {
        let path = string_param(h, 0, "IdentifiersWith:path")?;
        let value = string_param(h, 1, "IdentifiersWith:value")?;
        let ids = self.0.identifiers_with_value(path, value);
        Ok(ScopedJson::Derived(identifiers_json(ids)))
    }
}

pub struct IdentifiersWithKeyHelper(pub Arc<dyn TemplateDataSource>);

impl HelperDef for IdentifiersWithKeyHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, handlebars::RenderError> {
        let path = string_param(h, 0, "IdentifiersWithKey:path")?;
        let ids = self.0.identifiers_with_key(path);
        Ok(ScopedJson::Derived(identifiers_json(ids)))
    }
}

pub struct IdentifiersWithPrefixHelper(pub Arc<dyn TemplateDataSource>);

impl HelperDef for IdentifiersWithPrefixHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, handlebars::RenderError> {
        let path = string_param(h, 0, "IdentifiersWithPrefix:path")?;
        let value_prefix = string_param(h, 1, "IdentifiersWithPrefix:valuePrefix")?;
        let ids = self.0.identifiers_with_prefix(path, value_prefix);
        Ok(ScopedJson::Derived(identifiers_json(ids)))
    }
}

pub struct InventoryContentsOfHelper(pub Arc<dyn TemplateDataSource>);

impl HelperDef for InventoryContentsOfHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, handlebars::RenderError> {
        let raw_id = string_param(h, 0, "InventoryContentsOf:containerIdentifier")?;
        let id = Identifier::normalize(raw_id)
            .map_err(|_| RenderErrorReason::Other(format!("{raw_id:?} is not a valid identifier")))?;
        let ids = self.0.inventory_contents_of(&id);
        Ok(ScopedJson::Derived(identifiers_json(ids)))
    }
}

pub struct FrontmatterOfHelper(pub Arc<dyn TemplateDataSource>);

impl HelperDef for FrontmatterOfHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, handlebars::RenderError> {
        let raw_id = string_param(h, 0, "FrontmatterOf:identifier")?;
        let path = string_param(h, 1, "FrontmatterOf:path")?;
        let id = Identifier::normalize(raw_id)
            .map_err(|_| RenderErrorReason::Other(format!("{raw_id:?} is not a valid identifier")))?;
        let value = self.0.frontmatter_at(&id, path).into_iter().next();
        Ok(ScopedJson::Derived(
            value.map(|v| v.to_json()).unwrap_or(serde_json::Value::Null),
        ))
    }
}

pub struct LinkToHelper(pub Arc<dyn TemplateDataSource>);

impl HelperDef for LinkToHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, handlebars::RenderError> {
        let raw_id = string_param(h, 0, "LinkTo:identifier")?;
        let id = Identifier::normalize(raw_id)
            .map_err(|_| RenderErrorReason::Other(format!("{raw_id:?} is not a valid identifier")))?;
        let title = self
            .0
            .frontmatter_at(&id, "title")
            .into_iter()
            .next()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| id.as_str().to_string());
        Ok(ScopedJson::Derived(serde_json::Value::String(format!(
            "[{title}](/{})",
            id.as_str()
        ))))
    }
}
