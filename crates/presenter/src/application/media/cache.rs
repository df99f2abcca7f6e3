//! Bounded, least-recently-used cache of opened media resources.

use std::collections::VecDeque;
use std::sync::Arc;

use whiskers_domain::ResourceId;

use crate::ports::outbound::MediaResource;

pub struct ResourceCache {
    capacity: usize,
    /// Front is least recently used
    entries: VecDeque<Arc<dyn MediaResource>>,
}

impl ResourceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    fn position(&self, id: &ResourceId) -> Option<usize> {
        self.entries.iter().position(|r| r.id() == id)
    }

    /// Looks up `id` and marks it most recently used.
    pub fn get(&mut self, id: &ResourceId) -> Option<Arc<dyn MediaResource>> {
        let index = self.position(id)?;
        let resource = self.entries.remove(index)?;
        self.entries.push_back(Arc::clone(&resource));
        Some(resource)
    }

    /// Caches `resource`, returning whatever had to make room for it.
    /// With zero capacity nothing is cached.
    pub fn insert(&mut self, resource: Arc<dyn MediaResource>) -> Vec<Arc<dyn MediaResource>> {
        if self.capacity == 0 {
            return Vec::new();
        }
        let mut evicted = Vec::new();
        if let Some(index) = self.position(resource.id()) {
            if let Some(old) = self.entries.remove(index) {
                if !Arc::ptr_eq(&old, &resource) {
                    evicted.push(old);
                }
            }
        }
        while self.entries.len() >= self.capacity {
            match self.entries.pop_front() {
                Some(old) => evicted.push(old),
                None => break,
            }
        }
        self.entries.push_back(resource);
        evicted
    }

    pub fn remove(&mut self, id: &ResourceId) -> Option<Arc<dyn MediaResource>> {
        let index = self.position(id)?;
        self.entries.remove(index)
    }

    pub fn holds(&self, resource: &Arc<dyn MediaResource>) -> bool {
        self.entries.iter().any(|r| Arc::ptr_eq(r, resource))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn MediaResource>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Arc<dyn MediaResource>> {
        self.entries.drain(..).collect()
    }
}
