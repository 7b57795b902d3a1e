//! Pool of transient Data instances
//!
//! Archives wrap every container item in a Data while streaming it. The
//! cache keeps a bounded number of instances per class so those wrappers are
//! reused instead of allocated per item.

use std::collections::HashMap;
use std::ptr::NonNull;

use crate::data::{Data, DataClass};
use crate::registry::Field;

/// Per-archive pool of Data instances, keyed by class
pub struct DataCache {
    pools: HashMap<DataClass, Vec<Box<dyn Data>>>,
    capacity: usize,
    hits: usize,
    misses: usize,
}

impl DataCache {
    /// Cache keeping at most `capacity` instances per class
    pub fn new(capacity: usize) -> Self {
        Self {
            pools: HashMap::new(),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    /// A pooled instance of `class`, or a new one from `create`
    pub fn take(&mut self, class: DataClass, create: fn() -> Box<dyn Data>) -> Box<dyn Data> {
        match self.pools.get_mut(&class).and_then(Vec::pop) {
            Some(data) => {
                self.hits += 1;
                data
            }
            None => {
                self.misses += 1;
                create()
            }
        }
    }

    /// Return an instance; it is disconnected and reset before pooling
    pub fn give(&mut self, mut data: Box<dyn Data>) {
        data.reset();
        let pool = self.pools.entry(data.data_class()).or_default();
        if pool.len() < self.capacity {
            pool.push(data);
        }
    }

    /// A pooled instance connected to `field` inside `instance`
    ///
    /// # Safety
    /// Same contract as [`Field::bind_raw`].
    pub(crate) unsafe fn bind(&mut self, field: &Field, instance: NonNull<u8>) -> Box<dyn Data> {
        let mut data = self.take(field.data_class(), field.creator());
        data.connect(instance.add(field.offset()));
        data
    }

    /// Pooled instances across all classes
    pub fn len(&self) -> usize {
        self.pools.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(hits, misses)` of [`take`](Self::take) since creation
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.pools.clear();
    }
}

impl std::fmt::Debug for DataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCache")
            .field("pooled", &self.len())
            .field("capacity", &self.capacity)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}
