use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] wiki_core::Error),

    #[error("page not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("temp file could not be persisted: {0}")]
    Persist(#[from] tempfile::PersistError),
}
