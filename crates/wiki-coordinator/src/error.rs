use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] wiki_store::Error),

    #[error(transparent)]
    FmIndex(#[from] wiki_index_fm::Error),

    #[error(transparent)]
    TextIndex(#[from] wiki_index_text::Error),

    #[error(transparent)]
    Jobs(#[from] wiki_jobs::Error),
}
