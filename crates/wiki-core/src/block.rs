//! Frontmatter block parsing and composition (C8's first stage).
//!
//! Grounded on `crates/serve/src/indexer.rs::upsert_front_matter_db`, which
//! tries YAML then falls back to hand-rolled TOML parsing when the first
//! engine rejects the block. This module generalizes that "try, then fall
//! back" shape: `+++`/TOML is preferred, `---`/YAML is accepted for read
//! compatibility, and the writer always emits `+++` (spec.md §6).

use crate::frontmatter::FrontmatterValue;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBlock {
    pub frontmatter: FrontmatterValue,
    pub body: String,
    /// Set when a frontmatter block was present but malformed. Parsing
    /// tolerates this: frontmatter falls back to an empty map and `body`
    /// keeps the original text unsplit, but the caller can surface the
    /// error to the renderer.
    pub error: Option<String>,
}

enum Delim {
    Toml,
    Yaml,
}

/// Split `text` into frontmatter and body, parsing whichever delimiter
/// (`+++`/TOML or `---`/YAML) opens the first line.
///
/// The closing delimiter is the *first* line after the opening one that
/// matches the same marker exactly; later occurrences of that marker inside
/// the body (e.g. a markdown horizontal rule written as `---`) are body
/// content and do not confuse the parser.
pub fn parse(text: &str) -> ParsedBlock {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = text.split('\n');
    let Some(first_line) = lines.next() else {
        return ParsedBlock {
            frontmatter: FrontmatterValue::empty_map(),
            body: String::new(),
            error: None,
        };
    };

    let delim = match first_line.trim_end_matches('\r') {
        "+++" => Some(Delim::Toml),
        "---" => Some(Delim::Yaml),
        _ => None,
    };

    let Some(delim) = delim else {
        return ParsedBlock {
            frontmatter: FrontmatterValue::empty_map(),
            body: text.to_string(),
            error: None,
        };
    };

    let marker = match delim {
        Delim::Toml => "+++",
        Delim::Yaml => "---",
    };

    let rest: Vec<&str> = lines.collect();
    let Some(close_idx) = rest.iter().position(|l| l.trim_end_matches('\r') == marker) else {
        return ParsedBlock {
            frontmatter: FrontmatterValue::empty_map(),
            body: text.to_string(),
            error: Some("unterminated frontmatter block".to_string()),
        };
    };

    let fm_src = rest[..close_idx].join("\n");
    let body = rest[close_idx + 1..].join("\n");

    match delim {
        Delim::Toml => match toml::from_str::<toml::Value>(&fm_src) {
            Ok(v) => ParsedBlock { frontmatter: v.into(), body, error: None },
            Err(e) => ParsedBlock {
                frontmatter: FrontmatterValue::empty_map(),
                body: text.to_string(),
                error: Some(e.to_string()),
            },
        },
        Delim::Yaml => match serde_yml::from_str::<serde_yml::Value>(&fm_src) {
            Ok(v) => ParsedBlock { frontmatter: v.into(), body, error: None },
            Err(e) => ParsedBlock {
                frontmatter: FrontmatterValue::empty_map(),
                body: text.to_string(),
                error: Some(e.to_string()),
            },
        },
    }
}

/// Compose a page's source text from frontmatter and body. Always writes a
/// `+++` (TOML) block, even when the page was originally read as `---`.
pub fn compose(frontmatter: &FrontmatterValue, body: &str) -> String {
    let table = match toml::Value::from(frontmatter) {
        toml::Value::Table(t) => t,
        _ => toml::map::Map::new(),
    };
    let fm_src = toml::to_string(&toml::Value::Table(table)).unwrap_or_default();
    format!("+++\n{fm_src}+++\n{body}")
}
