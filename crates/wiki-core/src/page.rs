//! The page value type and its version history entries.
//!
//! Follows the teacher's builder-style value object
//! (`crates/domain/src/doc.rs::Document`): plain public fields assembled by
//! the store (C2), consumed by every other component.

use chrono::{DateTime, Utc};

use crate::block;
use crate::frontmatter::FrontmatterValue;
use crate::identifier::Identifier;

/// A page as stored on disk: raw source text plus the parsed frontmatter
/// and body derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub identifier: Identifier,
    /// The full on-disk source, frontmatter block and body together.
    pub text: String,
    pub frontmatter: FrontmatterValue,
    pub body: String,
    pub mod_time: DateTime<Utc>,
    pub deleted: bool,
}

impl Page {
    /// Build a `Page` from its identifier, raw source text, and last
    /// modification time, parsing the frontmatter block eagerly.
    pub fn from_text(identifier: Identifier, text: String, mod_time: DateTime<Utc>) -> Self {
        let parsed = block::parse(&text);
        Page {
            identifier,
            text,
            frontmatter: parsed.frontmatter,
            body: parsed.body,
            mod_time,
            deleted: false,
        }
    }

    /// Cache key for the render pipeline: `(identifier, mod_time)`.
    pub fn cache_key(&self) -> (Identifier, DateTime<Utc>) {
        (self.identifier.clone(), self.mod_time)
    }
}

/// A single entry in a page's append-only version history.
#[derive(Debug, Clone, PartialEq)]
pub struct Version {
    pub text: String,
    pub mod_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_parses_frontmatter_and_body() {
        let id = Identifier::normalize("garage").unwrap();
        let page = Page::from_text(
            id.clone(),
            "+++\ntitle = \"Garage\"\n+++\nhello\n".to_string(),
            Utc::now(),
        );
        assert_eq!(page.identifier, id);
        assert_eq!(page.body, "hello\n");
        assert_eq!(
            page.frontmatter.as_map().unwrap().get("title").unwrap().as_str(),
            Some("Garage")
        );
    }

    #[test]
    fn cache_key_uses_identifier_and_mod_time() {
        let id = Identifier::normalize("garage").unwrap();
        let now = Utc::now();
        let page = Page::from_text(id.clone(), "no frontmatter\n".to_string(), now);
        assert_eq!(page.cache_key(), (id, now));
    }
}
