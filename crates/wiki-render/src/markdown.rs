//! Injected Markdown→HTML rendering seam.
//!
//! `comrak` is the teacher's markdown engine of choice; this crate injects
//! it as the default implementation of a trait so tests (and, in
//! principle, an alternate renderer) can supply something else.

#[cfg_attr(test, mockall::automock)]
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

pub struct ComrakRenderer {
    options: comrak::Options,
}

impl ComrakRenderer {
    pub fn new() -> Self {
        let mut options = comrak::Options::default();
        options.extension.table = true;
        options.extension.strikethrough = true;
        options.extension.autolink = true;
        options.render.unsafe_ = false;
        Self { options }
    }
}

impl Default for ComrakRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer for ComrakRenderer {
    fn render(&self, markdown: &str) -> String {
        comrak::markdown_to_html(markdown, &self.options)
    }
}
