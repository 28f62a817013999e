//! Filesystem-backed page store (C2): atomic commit, per-identifier write
//! serialization, append-only version history, and tombstoned soft-delete.

pub mod error;
mod locks;
mod store;

pub use error::Error;
pub use store::{FsPageStore, PageStore};
