//! External interfaces (spec.md §6): the RPC-contract-shaped `WikiService`,
//! its `TemplateDataSource` implementation, and a thin Axum HTTP surface.
//!
//! The contract fixes request/response shapes, not a transport, so the
//! `router` module is deliberately the smallest possible adapter over
//! [`WikiService`] rather than where any business logic lives.

mod data_source;
pub mod error;
mod router;
mod service;

pub use data_source::WikiDataSource;
pub use error::Error;
pub use router::build_router;
pub use service::{PageView, PathSegment, SearchResult, WikiService};
