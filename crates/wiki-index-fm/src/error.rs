use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A frontmatter value that is not a string, bool, list, or map was
    /// encountered while indexing. Number/null values have no indexable
    /// string form.
    #[error("value at {0:?} has a type that cannot be indexed")]
    InvalidValueType(String),
}
