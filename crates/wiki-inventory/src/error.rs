use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] wiki_store::Error),

    #[error(transparent)]
    Coordinator(#[from] wiki_coordinator::Error),

    #[error(transparent)]
    Core(#[from] wiki_core::Error),

    #[error("{0:?} is not a container (no inventory.items list)")]
    NotAContainer(String),
}
