//! Per-identifier write serialization.
//!
//! A fixed table of stripes rather than a growing per-identifier map: the
//! structural analogue of the teacher's single-writer discipline in
//! `domain::reactive::queue::Inner`, sized once at store construction.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::{Mutex, MutexGuard};

use wiki_core::Identifier;

pub struct WriteLocks {
    stripes: Vec<Mutex<()>>,
}

impl WriteLocks {
    pub fn new(stripe_count: usize) -> Self {
        let stripe_count = stripe_count.max(1);
        let mut stripes = Vec::with_capacity(stripe_count);
        stripes.resize_with(stripe_count, || Mutex::new(()));
        Self { stripes }
    }

    pub fn lock_for(&self, id: &Identifier) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        id.as_str().hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.stripes.len();
        self.stripes[idx].lock()
    }
}
