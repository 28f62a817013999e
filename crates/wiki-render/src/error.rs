use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Returned when `render` is called before a required dependency
    /// (template engine or markdown renderer) has been injected, per
    /// spec.md §4.8. Never a panic.
    #[error("render pipeline missing required dependency: {0}")]
    NotInitialized(&'static str),
}
