//! Error kinds for the external-interface layer.
//!
//! Wraps every lower layer via `#[from]`, the same layering the teacher uses
//! between `serve::Error` and `adapt::Error`; `to_status` is the HTTP-side
//! analogue of `serve::Error::to_status`.

use http::StatusCode;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] wiki_core::Error),

    #[error(transparent)]
    Store(#[from] wiki_store::Error),

    #[error(transparent)]
    FmIndex(#[from] wiki_index_fm::Error),

    #[error(transparent)]
    TextIndex(#[from] wiki_index_text::Error),

    #[error(transparent)]
    Coordinator(#[from] wiki_coordinator::Error),

    #[error(transparent)]
    Render(#[from] wiki_render::Error),

    #[error("invalid frontmatter: {0}")]
    FrontmatterParse(String),
}

impl Error {
    /// Maps this crate's error kinds onto spec.md §7's taxonomy: identifier
    /// and parse failures are client mistakes, everything else the caller
    /// couldn't have prevented.
    pub fn to_status(&self) -> StatusCode {
        match self {
            Error::Core(wiki_core::Error::InvalidIdentifier(_)) => StatusCode::BAD_REQUEST,
            Error::Core(wiki_core::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::Core(wiki_core::Error::AlreadyExists(_)) => StatusCode::CONFLICT,
            Error::Store(wiki_store::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::FrontmatterParse(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
