//! Inventory domain layer (C9): containers and items expressed through
//! frontmatter conventions, plus the scheduled normalization job that keeps
//! the two ways of recording that relationship (an item's own
//! `inventory.container`, and a container's `inventory.items` list) from
//! drifting apart.

pub mod error;
pub mod normalize;
pub mod service;

pub use error::Error;
pub use normalize::{Anomaly, Normalizer, AUDIT_REPORT_IDENTIFIER};
pub use service::{ContentsEntry, InventoryService};
