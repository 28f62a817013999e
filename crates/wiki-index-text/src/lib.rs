//! Tantivy-backed full-text index with snippet extraction (C4).

pub mod error;
mod index;

pub use error::Error;
pub use index::{SearchHit, TextIndex};
